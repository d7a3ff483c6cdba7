//! Application state for the web layer.

use std::sync::Arc;

use crate::engine::RouteEngine;
use crate::fares::{FareFormClient, RouteSource};

/// Shared application state.
pub struct AppState<S = FareFormClient> {
    /// The route engine, shared with background warm-ups
    pub engine: Arc<RouteEngine<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<S: RouteSource> AppState<S> {
    pub fn new(engine: Arc<RouteEngine<S>>) -> Self {
        Self { engine }
    }
}
