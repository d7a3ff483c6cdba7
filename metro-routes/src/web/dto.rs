//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::domain::{Route, Waypoint};
use crate::orchestrator::BatchReport;

/// Query for a single route.
#[derive(Debug, Deserialize)]
pub struct RouteQuery {
    /// Origin station name
    pub from: String,

    /// Destination station name
    pub to: String,
}

/// Query for a warm-up batch.
#[derive(Debug, Deserialize)]
pub struct WarmQuery {
    /// Restrict the batch to routes from this station
    pub from: Option<String>,
}

/// Every known station.
#[derive(Debug, Serialize)]
pub struct StationsResponse {
    pub stations: Vec<String>,
}

/// A route between two stations.
#[derive(Debug, Serialize)]
pub struct RouteResponse {
    pub from: String,
    pub to: String,
    pub normal_fare: u32,
    pub concessional_fare: u32,
    pub time_mins: u32,
    pub station_count: u32,
    pub interchange_count: u32,

    /// Ordered path
    pub legs: Vec<LegDto>,

    /// True when nothing useful could be extracted for this pair
    pub unpopulated: bool,
}

/// One entry in a route's path.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LegDto {
    Station { name: String, id: i32 },
    Interchange,
}

impl From<&Waypoint> for LegDto {
    fn from(waypoint: &Waypoint) -> Self {
        match waypoint {
            Waypoint::Station(s) => LegDto::Station {
                name: s.name().to_string(),
                id: s.external_id(),
            },
            Waypoint::Interchange => LegDto::Interchange,
        }
    }
}

impl RouteResponse {
    pub fn from_route(route: &Route) -> Self {
        Self {
            from: route.from.name().to_string(),
            to: route.to.name().to_string(),
            normal_fare: route.normal_fare,
            concessional_fare: route.concessional_fare,
            time_mins: route.time_mins,
            station_count: route.station_count,
            interchange_count: route.interchange_count,
            legs: route.legs.iter().map(LegDto::from).collect(),
            unpopulated: route.is_unpopulated(),
        }
    }
}

/// Acknowledgement for an accepted warm-up.
#[derive(Debug, Serialize)]
pub struct WarmAccepted {
    /// Station the batch starts from, or `None` for every pair
    pub from: Option<String>,
}

/// Summary of a finished batch, as logged by background warm-ups.
#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub requested: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub aborted: usize,
}

impl From<&BatchReport> for BatchSummary {
    fn from(report: &BatchReport) -> Self {
        Self {
            requested: report.requested,
            succeeded: report.succeeded,
            failed: report.failed.len(),
            aborted: report.aborted,
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
