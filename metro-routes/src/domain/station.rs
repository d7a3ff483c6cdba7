//! Station types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name reserved for the interchange marker in a route's path.
pub const INTERCHANGE_NAME: &str = "INTERCHANGE";

/// External identifier the upstream form uses for the interchange marker.
pub const INTERCHANGE_ID: i32 = -1;

/// Error returned when constructing an invalid station.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid station: {reason}")]
pub struct InvalidStation {
    reason: &'static str,
}

/// Canonicalize a station name: trim, collapse inner whitespace, uppercase.
///
/// # Examples
///
/// ```
/// use metro_routes::domain::canonical_name;
///
/// assert_eq!(canonical_name("  Rajiv   chowk \n"), "RAJIV CHOWK");
/// ```
pub fn canonical_name(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// A real stop on the network, as listed by the upstream fare form.
///
/// The name is always canonical and never the interchange marker; the
/// external id is the value the upstream form expects for this station.
///
/// # Examples
///
/// ```
/// use metro_routes::domain::Station;
///
/// let ito = Station::new("ito", 12).unwrap();
/// assert_eq!(ito.name(), "ITO");
/// assert_eq!(ito.external_id(), 12);
///
/// assert!(Station::new("   ", 3).is_err());
/// assert!(Station::new("Interchange", 4).is_err());
/// assert!(Station::new("ITO", -1).is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawStation", into = "RawStation")]
pub struct Station {
    name: String,
    external_id: i32,
}

impl Station {
    /// Create a station, canonicalizing the name.
    pub fn new(name: &str, external_id: i32) -> Result<Self, InvalidStation> {
        let name = canonical_name(name);

        if name.is_empty() {
            return Err(InvalidStation {
                reason: "name must not be empty",
            });
        }

        if name == INTERCHANGE_NAME {
            return Err(InvalidStation {
                reason: "name is reserved for the interchange marker",
            });
        }

        if external_id == INTERCHANGE_ID {
            return Err(InvalidStation {
                reason: "external id is reserved for the interchange marker",
            });
        }

        Ok(Self { name, external_id })
    }

    /// Canonical (uppercase) name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier the upstream form uses for this station.
    pub fn external_id(&self) -> i32 {
        self.external_id
    }
}

impl fmt::Debug for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Station({}#{})", self.name, self.external_id)
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Unvalidated wire form, so deserialized stations go through `Station::new`.
#[derive(Serialize, Deserialize)]
struct RawStation {
    name: String,
    external_id: i32,
}

impl TryFrom<RawStation> for Station {
    type Error = InvalidStation;

    fn try_from(raw: RawStation) -> Result<Self, Self::Error> {
        Station::new(&raw.name, raw.external_id)
    }
}

impl From<Station> for RawStation {
    fn from(station: Station) -> Self {
        RawStation {
            name: station.name,
            external_id: station.external_id,
        }
    }
}
