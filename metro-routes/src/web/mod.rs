//! Web layer for the route engine.
//!
//! Provides JSON endpoints for listing stations, looking up routes and
//! starting warm-ups.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
