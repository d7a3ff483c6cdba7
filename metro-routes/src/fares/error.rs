//! Fare form client error types.

/// Errors while bootstrapping the session from the landing page.
///
/// Any of these is fatal: without a station list and form state there is
/// nothing to query.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// HTTP request failed or the client could not be built
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A configured header value is not valid
    #[error("invalid header value for {0}")]
    InvalidHeader(&'static str),

    /// Landing page returned a non-success status
    #[error("landing page returned status {status}")]
    Status { status: u16 },

    /// The station selection control was not found
    #[error("station list <select id=\"{0}\"> not found on landing page")]
    MissingStationList(String),

    /// The station selection control held no usable stations
    #[error("station list contained no stations")]
    NoStations,

    /// None of the configured hidden form fields were present
    #[error("no form-state fields found on landing page")]
    NoFormState,
}

/// Errors from a single route round trip.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream returned a non-success status
    #[error("upstream error {status}: {message}")]
    Api { status: u16, message: String },

    /// Request limiter was closed
    #[error("request limiter closed")]
    Closed,
}

impl FetchError {
    /// HTTP status reported by upstream, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Api { status, .. } => Some(*status),
            FetchError::Http(e) => e.status().map(|s| s.as_u16()),
            FetchError::Closed => None,
        }
    }
}
