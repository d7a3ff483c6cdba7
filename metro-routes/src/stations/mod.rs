//! Station catalog and name normalization.
//!
//! The catalog is built once from the fare form's station list and maps
//! canonical names to stations. Route pages sometimes spell stations
//! differently; the alias table bridges those variants.

mod aliases;
mod catalog;

pub use aliases::{STATION_ALIASES, normalize_leg_name};
pub use catalog::StationCatalog;
