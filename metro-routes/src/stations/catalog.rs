//! Station catalog.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::warn;

use crate::domain::{Station, canonical_name};

use super::aliases::normalize_leg_name;

/// Canonical station list captured at bootstrap.
///
/// Provides exact, case-normalized name → station and external id → name
/// lookups. Immutable once built; a new bootstrap builds a new catalog.
#[derive(Debug, Clone, Default)]
pub struct StationCatalog {
    stations: Vec<Station>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<i32, usize>,
}

impl StationCatalog {
    /// Build a catalog, keeping the first station for any repeated name
    /// or external id.
    pub fn from_stations(stations: impl IntoIterator<Item = Station>) -> Self {
        let mut catalog = Self::default();

        for station in stations {
            if let Some(&existing) = catalog.by_id.get(&station.external_id()) {
                warn!(
                    station = %station,
                    kept = %catalog.stations[existing],
                    id = station.external_id(),
                    "Duplicate station id, keeping first"
                );
                continue;
            }

            let idx = catalog.stations.len();
            match catalog.by_name.entry(station.name().to_string()) {
                Entry::Occupied(_) => {
                    warn!(station = %station, "Duplicate station name, keeping first");
                    continue;
                }
                Entry::Vacant(slot) => {
                    slot.insert(idx);
                }
            }
            catalog.by_id.insert(station.external_id(), idx);
            catalog.stations.push(station);
        }

        catalog
    }

    /// Look up a station by name. Matching is exact after trimming and
    /// uppercasing; fuzzy matching is the caller's job.
    pub fn by_name(&self, name: &str) -> Option<&Station> {
        self.by_name
            .get(&canonical_name(name))
            .map(|&idx| &self.stations[idx])
    }

    /// Look up a station name by its external id.
    pub fn name_of(&self, external_id: i32) -> Option<&str> {
        self.by_id
            .get(&external_id)
            .map(|&idx| self.stations[idx].name())
    }

    /// Resolve a station name as printed in a route page, applying the
    /// alias table before lookup.
    pub fn resolve_leg(&self, raw: &str) -> Option<&Station> {
        self.by_name
            .get(&normalize_leg_name(raw))
            .map(|&idx| &self.stations[idx])
    }

    /// All stations, in bootstrap order.
    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    /// All station names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stations.iter().map(|s| s.name().to_string()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(name: &str, id: i32) -> Station {
        Station::new(name, id).unwrap()
    }

    fn catalog() -> StationCatalog {
        StationCatalog::from_stations(vec![
            station("Yamuna Bank", 7),
            station("ITO", 12),
            station("Kashmiri Gate", 3),
        ])
    }

    #[test]
    fn lookup_is_case_normalized() {
        let catalog = catalog();
        assert_eq!(catalog.by_name("yamuna bank").unwrap().external_id(), 7);
        assert_eq!(catalog.by_name("  ITO ").unwrap().external_id(), 12);
        assert!(catalog.by_name("YAMUNA").is_none());
    }

    #[test]
    fn lookup_by_id() {
        let catalog = catalog();
        assert_eq!(catalog.name_of(3), Some("KASHMIRI GATE"));
        assert_eq!(catalog.name_of(99), None);
    }

    #[test]
    fn interchange_is_never_found() {
        assert!(catalog().by_name("INTERCHANGE").is_none());
        assert!(catalog().name_of(-1).is_none());
    }

    #[test]
    fn resolve_leg_uses_aliases() {
        let catalog = catalog();
        assert_eq!(catalog.resolve_leg("Kashmere Gate").unwrap().name(), "KASHMIRI GATE");
        assert!(catalog.by_name("Kashmere Gate").is_none());
    }

    #[test]
    fn duplicates_keep_first() {
        let catalog = StationCatalog::from_stations(vec![
            station("ITO", 12),
            station("ito", 13),
            station("Mandi House", 12),
            station("Mandi House", 14),
        ]);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.by_name("ITO").unwrap().external_id(), 12);
        assert_eq!(catalog.by_name("MANDI HOUSE").unwrap().external_id(), 14);
        assert_eq!(catalog.name_of(12), Some("ITO"));
    }

    #[test]
    fn names_are_sorted() {
        assert_eq!(catalog().names(), vec!["ITO", "KASHMIRI GATE", "YAMUNA BANK"]);
    }
}
