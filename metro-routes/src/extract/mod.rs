//! Route page extraction.
//!
//! Turns one fare form response into a `Route`. Extraction never fails as
//! a whole: a missing fare block, an unparsable metadata item or an
//! unknown station name zeroes or skips just that piece and is reported
//! as an `ExtractionIssue`. Partial data is more useful than none for a
//! transit lookup.
//!
//! Extraction is pure: identical HTML always yields the identical route.

mod fields;
mod legs;

use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::domain::{Route, Station};
use crate::stations::StationCatalog;

pub use fields::MetadataField;
pub use legs::{LegNode, parse_list, resolve_legs};

static STATION_LIST: LazyLock<Selector> = LazyLock::new(|| css("div.fr_stations ul"));

/// Parse a CSS selector literal.
pub(crate) fn css(selector: &str) -> Selector {
    // Only called with literals, which are checked by the tests below
    Selector::parse(selector).expect("static selector literal is valid CSS")
}

/// A piece of a route page that could not be extracted.
///
/// Non-fatal: the route is still produced with the piece zeroed or skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionIssue {
    #[error("fare block missing")]
    FareMissing,

    #[error("fares unparsable: normal {normal:?}, concessional {concessional:?}")]
    FareUnparsable {
        normal: String,
        concessional: String,
    },

    #[error("station list missing")]
    StationListMissing,

    #[error("unknown station in path: {0:?}")]
    UnknownLegStation(String),

    #[error("no station in path resolved")]
    NoResolvedLegs,

    #[error("{0} missing")]
    MetadataMissing(MetadataField),

    #[error("{field} unparsable: {text:?}")]
    MetadataUnparsable { field: MetadataField, text: String },
}

/// An extracted route and anything that went wrong extracting it.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub route: Route,
    pub issues: Vec<ExtractionIssue>,
}

impl Extraction {
    pub fn is_complete(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Extract the route `from -> to` from a fare form response.
pub fn extract_route(
    html: &str,
    from: &Station,
    to: &Station,
    catalog: &StationCatalog,
) -> Extraction {
    let document = Html::parse_document(html);
    let mut issues = Vec::new();
    let mut route = Route::empty(from.clone(), to.clone());

    let (normal, concessional) = fields::extract_fares(&document, &mut issues);
    route.normal_fare = normal;
    route.concessional_fare = concessional;

    match document.select(&STATION_LIST).next() {
        Some(list) => {
            let tree = parse_list(list);
            resolve_legs(&tree, catalog, &mut route.legs, &mut issues);
            if route.stations().next().is_none() {
                issues.push(ExtractionIssue::NoResolvedLegs);
            }
        }
        None => issues.push(ExtractionIssue::StationListMissing),
    }

    let [time, stations, interchanges] = fields::extract_metadata(&document, &mut issues);
    route.time_mins = time;
    route.station_count = stations;
    route.interchange_count = interchanges;

    // A route without a path reads as a failed extraction, whatever else parsed
    if route.stations().next().is_none() {
        route = Route::empty(from.clone(), to.clone());
    }

    Extraction { route, issues }
}
