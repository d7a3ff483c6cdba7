//! Pair-level route lookup errors.
//!
//! These are what callers of the engine see for a single `(from, to)`
//! request. Failures local to one leg or field never surface here; they
//! are absorbed by the extractor.

use std::sync::Arc;

use crate::fares::FetchError;

/// Errors from looking up a route for one station pair.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RouteError {
    /// Name is not in the station catalog
    #[error("unknown station: {0}")]
    UnknownStation(String),

    /// Origin and destination are the same station
    #[error("origin and destination are both {0}")]
    SameStation(String),

    /// Upstream round trip failed; shared by every coalesced waiter
    #[error("route unavailable: {0}")]
    Fetch(#[from] Arc<FetchError>),
}

impl RouteError {
    /// Whether retrying the same request later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RouteError::Fetch(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = RouteError::UnknownStation("NOWHERE".into());
        assert_eq!(err.to_string(), "unknown station: NOWHERE");

        let err = RouteError::SameStation("ITO".into());
        assert_eq!(err.to_string(), "origin and destination are both ITO");

        let err = RouteError::Fetch(Arc::new(FetchError::Api {
            status: 500,
            message: "Internal Server Error".into(),
        }));
        assert_eq!(
            err.to_string(),
            "route unavailable: upstream error 500: Internal Server Error"
        );
    }

    #[test]
    fn only_fetch_errors_are_retryable() {
        assert!(!RouteError::UnknownStation("X".into()).is_retryable());
        assert!(!RouteError::SameStation("X".into()).is_retryable());
        assert!(RouteError::Fetch(Arc::new(FetchError::Closed)).is_retryable());
    }
}
