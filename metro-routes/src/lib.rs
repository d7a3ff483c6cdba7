//! Metro route acquisition and cache engine.
//!
//! The operator publishes fares and routes only through a server-rendered
//! form. This crate bootstraps a session against that form, turns each
//! `(from, to)` response into a structured `Route`, and memoizes routes
//! so each pair is fetched at most once, optionally persisted across
//! restarts.

pub mod cache;
pub mod config;
pub mod domain;
pub mod engine;
pub mod extract;
pub mod fares;
pub mod orchestrator;
pub mod snapshot;
pub mod stations;
pub mod web;
