//! Fare form client.
//!
//! This module owns the HTTP session against the upstream fare page.
//!
//! Key characteristics of the upstream:
//! - There is no API; routes come back as server-rendered HTML
//! - Every post must echo hidden form state captured from the landing page
//! - There is no batch query, so each `(from, to)` pair is one round trip

mod client;
mod error;
mod form;
pub mod mock;

pub use client::{DEFAULT_FARES_URL, FareFormClient, FareFormConfig, RouteSource};
pub use error::{BootstrapError, FetchError};
pub use form::{FormState, LandingPage, parse_landing_page};
pub use mock::MockFareSource;
