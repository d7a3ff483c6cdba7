//! The route engine.
//!
//! One engine is built at startup and shared by handle with whatever
//! serves users. It owns the station catalog, the route cache and the
//! orchestrator, and exposes name-based lookups.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::{PersistenceConfig, RouteCache, SaveOutcome};
use crate::config::EngineConfig;
use crate::domain::{Route, RouteError, Station};
use crate::fares::{BootstrapError, FareFormClient, RouteSource};
use crate::orchestrator::{BatchReport, FetchOrchestrator};
use crate::snapshot::{self, Snapshot, SnapshotError};
use crate::stations::StationCatalog;

/// Errors starting the engine. All are fatal.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("bootstrap failed: {0}")]
    Bootstrap(#[from] BootstrapError),

    #[error("snapshot failed: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Route lookups over a cached upstream.
pub struct RouteEngine<S = FareFormClient> {
    cache: RouteCache<S>,
    orchestrator: FetchOrchestrator,
}

impl RouteEngine<FareFormClient> {
    /// Start the engine.
    ///
    /// With persistence enabled and a snapshot on disk, resumes from the
    /// snapshot instead of bootstrapping. Otherwise bootstraps from the
    /// landing page, and with persistence enabled saves straight away.
    /// An unreadable snapshot is logged and replaced by a fresh bootstrap.
    pub async fn start(config: &EngineConfig) -> Result<Self, EngineError> {
        let persistence = config.persistence();

        if let Some(p) = &persistence {
            match snapshot::read(&p.path).await {
                Ok(Some(snapshot)) => return Self::resume(config, p.clone(), snapshot).await,
                Ok(None) => {}
                Err(e) => warn!(
                    path = %p.path.display(),
                    error = %e,
                    "Ignoring unreadable snapshot, bootstrapping instead"
                ),
            }
        }

        let (client, stations) = FareFormClient::connect(config.fares.clone()).await?;
        let catalog = StationCatalog::from_stations(stations);
        let engine = Self::new(client, catalog, config.orchestrator(), persistence);

        if let SaveOutcome::Written { .. } = engine.cache.flush().await? {
            info!("Saved initial snapshot");
        }

        Ok(engine)
    }

    async fn resume(
        config: &EngineConfig,
        persistence: PersistenceConfig,
        snapshot: Snapshot,
    ) -> Result<Self, EngineError> {
        let client = FareFormClient::resume(config.fares.clone(), snapshot.form)?;
        let catalog = StationCatalog::from_stations(snapshot.stations);
        if catalog.is_empty() {
            return Err(BootstrapError::NoStations.into());
        }

        let engine = Self::new(client, catalog, config.orchestrator(), Some(persistence));
        let restored = engine.cache.restore(snapshot.routes).await;

        info!(
            saved_at = %snapshot.saved_at,
            stations = engine.cache.catalog().len(),
            routes = restored,
            "Resumed from snapshot"
        );

        Ok(engine)
    }
}

impl<S: RouteSource> RouteEngine<S> {
    /// Build an engine from an already bootstrapped source and catalog.
    pub fn new(
        source: S,
        catalog: StationCatalog,
        orchestrator: FetchOrchestrator,
        persistence: Option<PersistenceConfig>,
    ) -> Self {
        let mut cache = RouteCache::new(source, Arc::new(catalog));
        if let Some(p) = persistence {
            cache = cache.with_persistence(p);
        }
        Self {
            cache,
            orchestrator,
        }
    }

    /// All known station names, sorted.
    pub fn list_station_names(&self) -> Vec<String> {
        self.cache.catalog().names()
    }

    /// Look up a station by exact (case-insensitive) name.
    pub fn station(&self, name: &str) -> Result<&Station, RouteError> {
        self.cache
            .catalog()
            .by_name(name)
            .ok_or_else(|| RouteError::UnknownStation(name.trim().to_string()))
    }

    /// Get the route between two named stations.
    pub async fn get_route(&self, from: &str, to: &str) -> Result<Arc<Route>, RouteError> {
        let from = self.station(from)?;
        let to = self.station(to)?;

        let route = self.cache.get(from, to).await?;

        if let Err(e) = self.cache.autosave().await {
            warn!(error = %e, "Autosave failed");
        }

        Ok(route)
    }

    /// Fetch every missing pair, then save.
    pub async fn warm_all(&self) -> BatchReport {
        let report = self.cache.warm_all(&self.orchestrator).await;
        self.flush_after_batch().await;
        report
    }

    /// Fetch every missing pair from one named station, then save.
    pub async fn warm_from(&self, from: &str) -> Result<BatchReport, RouteError> {
        let from = self.station(from)?;
        let report = self.cache.warm_from(from, &self.orchestrator).await;
        self.flush_after_batch().await;
        Ok(report)
    }

    async fn flush_after_batch(&self) {
        if let Err(e) = self.cache.flush().await {
            warn!(error = %e, "Failed to save snapshot after batch");
        }
    }

    /// Save the snapshot, subject to the flush threshold unless forced.
    pub async fn save(&self, force: bool) -> Result<SaveOutcome, SnapshotError> {
        if force {
            self.cache.flush().await
        } else {
            self.cache.autosave().await
        }
    }

    /// Number of cached routes.
    pub fn cached_routes(&self) -> usize {
        self.cache.len()
    }

    pub fn cache(&self) -> &RouteCache<S> {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fares::MockFareSource;
    use crate::fares::mock::simple_route_html;
    use tempfile::tempdir;

    fn catalog() -> StationCatalog {
        StationCatalog::from_stations(
            ["YAMUNA BANK", "INDRAPRASTHA", "ITO"]
                .iter()
                .enumerate()
                .map(|(i, n)| Station::new(n, i as i32 + 1).unwrap()),
        )
    }

    fn engine(persistence: Option<PersistenceConfig>) -> RouteEngine<MockFareSource> {
        let source =
            MockFareSource::new().with_fallback(simple_route_html(&["Yamuna Bank", "ITO"]));
        RouteEngine::new(source, catalog(), FetchOrchestrator::new(2), persistence)
    }

    #[test]
    fn lists_station_names() {
        assert_eq!(
            engine(None).list_station_names(),
            vec!["INDRAPRASTHA", "ITO", "YAMUNA BANK"]
        );
    }

    #[tokio::test]
    async fn get_route_by_name() {
        let engine = engine(None);
        let route = engine.get_route("yamuna bank", "ito").await.unwrap();

        assert_eq!(route.from.name(), "YAMUNA BANK");
        assert_eq!(route.to.name(), "ITO");
        assert_eq!(engine.cached_routes(), 1);
    }

    #[tokio::test]
    async fn unknown_station_is_distinct_from_fetch_failure() {
        let engine = engine(None);

        let err = engine.get_route("Atlantis", "ITO").await.unwrap_err();
        assert!(matches!(err, RouteError::UnknownStation(ref n) if n == "Atlantis"));
        assert!(!err.is_retryable());

        let err = engine.get_route("INTERCHANGE", "ITO").await.unwrap_err();
        assert!(matches!(err, RouteError::UnknownStation(_)));

        assert_eq!(engine.cache().source().call_count(), 0);
    }

    #[tokio::test]
    async fn warm_from_unknown_station_fails() {
        let err = engine(None).warm_from("Atlantis").await.unwrap_err();
        assert!(matches!(err, RouteError::UnknownStation(_)));
    }

    #[tokio::test]
    async fn warm_all_saves_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("routes.snapshot");
        let engine = engine(Some(PersistenceConfig::new(&path).with_flush_threshold(1000)));

        let report = engine.warm_all().await;
        assert_eq!(report.succeeded, 6);

        let snapshot = snapshot::read(&path).await.unwrap().unwrap();
        assert_eq!(snapshot.routes.len(), 6);
        assert_eq!(snapshot.stations.len(), 3);
        assert!(!snapshot.form.is_empty());
    }

    #[tokio::test]
    async fn save_without_persistence_is_disabled() {
        let engine = engine(None);
        assert_eq!(engine.save(true).await.unwrap(), SaveOutcome::Disabled);
    }
}
