//! Routes between stations.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::station::Station;

/// One entry in a route's ordered path.
///
/// `Interchange` marks a platform or line change between the stations
/// either side of it; it is never a route endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Waypoint {
    Station(Station),
    Interchange,
}

impl Waypoint {
    /// Whether this entry is the interchange marker.
    pub fn is_interchange(&self) -> bool {
        matches!(self, Waypoint::Interchange)
    }

    /// The station, if this entry is one.
    pub fn station(&self) -> Option<&Station> {
        match self {
            Waypoint::Station(s) => Some(s),
            Waypoint::Interchange => None,
        }
    }
}

/// Cache key for a route: ordered `(from, to)` canonical names.
///
/// Not symmetric: `(A, B)` and `(B, A)` are distinct keys.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteKey {
    pub from: String,
    pub to: String,
}

impl RouteKey {
    pub fn new(from: &Station, to: &Station) -> Self {
        Self {
            from: from.name().to_string(),
            to: to.name().to_string(),
        }
    }
}

impl fmt::Debug for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RouteKey({} -> {})", self.from, self.to)
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// A route as reported by the upstream fare form.
///
/// Fields that could not be extracted are zero. A route whose fares, time
/// and counts are all zero is a failed or partial extraction, not a free
/// journey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub from: Station,
    pub to: Station,
    pub normal_fare: u32,
    pub concessional_fare: u32,
    /// Journey time in minutes.
    pub time_mins: u32,
    pub station_count: u32,
    pub interchange_count: u32,
    /// Ordered path with interchange markers between segments.
    pub legs: Vec<Waypoint>,
}

impl Route {
    /// Create a route with no extracted data yet.
    pub fn empty(from: Station, to: Station) -> Self {
        Self {
            from,
            to,
            normal_fare: 0,
            concessional_fare: 0,
            time_mins: 0,
            station_count: 0,
            interchange_count: 0,
            legs: Vec::new(),
        }
    }

    pub fn key(&self) -> RouteKey {
        RouteKey::new(&self.from, &self.to)
    }

    /// Real stations along the path, in order.
    pub fn stations(&self) -> impl Iterator<Item = &Station> {
        self.legs.iter().filter_map(Waypoint::station)
    }

    /// Number of interchange markers in the path.
    pub fn interchanges_in_path(&self) -> usize {
        self.legs.iter().filter(|w| w.is_interchange()).count()
    }

    /// True when no fare, time or count could be extracted.
    pub fn is_unpopulated(&self) -> bool {
        self.normal_fare == 0
            && self.concessional_fare == 0
            && self.time_mins == 0
            && self.station_count == 0
            && self.interchange_count == 0
    }
}
