//! Domain types for the metro route engine.
//!
//! Stations are validated at construction, so anything holding a
//! `Station` can trust it is a real, canonically named stop and never the
//! interchange marker.

mod error;
mod route;
mod station;

pub use error::RouteError;
pub use route::{Route, RouteKey, Waypoint};
pub use station::{INTERCHANGE_ID, INTERCHANGE_NAME, InvalidStation, Station, canonical_name};
