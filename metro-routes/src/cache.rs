//! Route cache.
//!
//! Routes are memoized by ordered station pair. Entries are write-once and
//! never expire: the network is assumed static for the process lifetime.
//!
//! Concurrent lookups of the same missing pair are coalesced into one
//! upstream fetch. The cache registers the in-flight fetch for the key
//! before it starts and every other caller awaits that same fetch; the
//! registry lock is never held across the network call.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use moka::future::Cache as MokaCache;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{Route, RouteError, RouteKey, Station};
use crate::extract::extract_route;
use crate::fares::{FetchError, RouteSource};
use crate::orchestrator::{BatchReport, FetchOrchestrator};
use crate::snapshot::{self, Snapshot, SnapshotError};
use crate::stations::StationCatalog;

/// Default number of new fetches before an autosave writes.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 50;

/// Where and how often the cache persists itself.
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Snapshot file path.
    pub path: PathBuf,

    /// New fetches required before an unforced save writes.
    pub flush_threshold: usize,
}

impl PersistenceConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
        }
    }

    pub fn with_flush_threshold(mut self, n: usize) -> Self {
        self.flush_threshold = n.max(1);
        self
    }
}

/// What a save attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Snapshot written with this many routes.
    Written { routes: usize },
    /// Not enough new fetches since the last save.
    NotDue { pending: usize },
    /// Another save was already running.
    Busy,
    /// No persistence configured.
    Disabled,
}

/// Memoizing route cache over a `RouteSource`.
pub struct RouteCache<S> {
    source: S,
    catalog: Arc<StationCatalog>,
    routes: MokaCache<RouteKey, Arc<Route>>,
    persistence: Option<PersistenceConfig>,

    /// Upstream fetches stored since the last snapshot was written.
    fetches_since_save: AtomicUsize,

    /// Serializes snapshot writes.
    save_lock: Mutex<()>,
}

impl<S: RouteSource> RouteCache<S> {
    /// Create an empty cache.
    pub fn new(source: S, catalog: Arc<StationCatalog>) -> Self {
        Self {
            source,
            catalog,
            routes: MokaCache::builder().build(),
            persistence: None,
            fetches_since_save: AtomicUsize::new(0),
            save_lock: Mutex::new(()),
        }
    }

    /// Enable autosave to the given snapshot.
    pub fn with_persistence(mut self, persistence: PersistenceConfig) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Get the route `from -> to`, fetching it on a miss.
    ///
    /// At most one upstream fetch runs per key; concurrent callers for the
    /// same key share its result. A failed fetch stores nothing, so a later
    /// call retries.
    pub async fn get(&self, from: &Station, to: &Station) -> Result<Arc<Route>, RouteError> {
        if from == to {
            return Err(RouteError::SameStation(from.name().to_string()));
        }

        let key = RouteKey::new(from, to);
        let mut fetched = false;
        let route = self
            .routes
            .try_get_with(key, async {
                fetched = true;
                self.fetch(from, to).await
            })
            .await
            .map_err(RouteError::Fetch)?;

        // Counted only once the route is in the map, so a save never
        // clears a fetch its snapshot copy missed
        if fetched {
            self.fetches_since_save.fetch_add(1, Ordering::SeqCst);
        }
        Ok(route)
    }

    /// Get a route only if it is already cached.
    pub async fn get_cached(&self, from: &Station, to: &Station) -> Option<Arc<Route>> {
        self.routes.get(&RouteKey::new(from, to)).await
    }

    pub fn contains(&self, key: &RouteKey) -> bool {
        self.routes.contains_key(key)
    }

    async fn fetch(&self, from: &Station, to: &Station) -> Result<Arc<Route>, FetchError> {
        debug!(from = %from, to = %to, "Fetching route");

        let html = self.source.fetch_route(from, to).await.inspect_err(|e| {
            warn!(from = %from, to = %to, error = %e, "Route fetch failed");
        })?;

        let extraction = extract_route(&html, from, to, &self.catalog);
        for issue in &extraction.issues {
            warn!(from = %from, to = %to, issue = %issue, "Partial route extraction");
        }

        Ok(Arc::new(extraction.route))
    }

    /// Fetch every missing ordered pair of catalog stations.
    pub async fn warm_all(&self, orchestrator: &FetchOrchestrator) -> BatchReport {
        let stations = self.catalog.stations();
        let pairs: Vec<(Station, Station)> = stations
            .iter()
            .flat_map(|from| stations.iter().map(move |to| (from, to)))
            .filter(|(from, to)| from != to && !self.contains(&RouteKey::new(from, to)))
            .map(|(from, to)| (from.clone(), to.clone()))
            .collect();

        info!(pairs = pairs.len(), "Warming full route cache");
        orchestrator.run(self, pairs).await
    }

    /// Fetch every missing pair starting at `from`.
    pub async fn warm_from(&self, from: &Station, orchestrator: &FetchOrchestrator) -> BatchReport {
        let pairs: Vec<(Station, Station)> = self
            .catalog
            .stations()
            .iter()
            .filter(|to| *to != from && !self.contains(&RouteKey::new(from, to)))
            .map(|to| (from.clone(), to.clone()))
            .collect();

        info!(from = %from, pairs = pairs.len(), "Warming routes from station");
        orchestrator.run(self, pairs).await
    }

    /// Number of cached routes.
    pub fn len(&self) -> usize {
        self.routes.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetches stored since the last written snapshot.
    pub fn pending_fetches(&self) -> usize {
        self.fetches_since_save.load(Ordering::SeqCst)
    }

    /// Copy of every cached route, sorted by key.
    pub fn routes(&self) -> Vec<Route> {
        let mut routes: Vec<(RouteKey, Route)> = self
            .routes
            .iter()
            .map(|(key, route)| ((*key).clone(), (*route).clone()))
            .collect();
        routes.sort_by(|a, b| a.0.cmp(&b.0));
        routes.into_iter().map(|(_, route)| route).collect()
    }

    pub fn catalog(&self) -> &Arc<StationCatalog> {
        &self.catalog
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Build the snapshot of the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            saved_at: Utc::now(),
            form: self.source.form_state().clone(),
            stations: self.catalog.stations().to_vec(),
            routes: self.routes(),
        }
    }

    /// Save a snapshot to `path`.
    ///
    /// Unless `force` is set, writes only when at least `threshold` fetches
    /// have been stored since the last write, and skips if another save is
    /// running. A forced save waits for a running save and then writes.
    /// The map is copied before the write, so concurrent fetches never
    /// produce a torn snapshot.
    pub async fn save(
        &self,
        path: &Path,
        threshold: usize,
        force: bool,
    ) -> Result<SaveOutcome, SnapshotError> {
        let _guard = if force {
            self.save_lock.lock().await
        } else {
            match self.save_lock.try_lock() {
                Ok(guard) => guard,
                Err(_) => return Ok(SaveOutcome::Busy),
            }
        };

        let pending = self.pending_fetches();
        if !force && pending < threshold {
            return Ok(SaveOutcome::NotDue { pending });
        }

        let snapshot = self.snapshot();
        let routes = snapshot.routes.len();
        snapshot::write(path, &snapshot).await?;

        // Fetches that landed after the copy stay pending
        self.fetches_since_save.fetch_sub(pending, Ordering::SeqCst);

        info!(path = %path.display(), routes, "Wrote route snapshot");
        Ok(SaveOutcome::Written { routes })
    }

    /// Save to the configured snapshot, subject to the flush threshold.
    pub async fn autosave(&self) -> Result<SaveOutcome, SnapshotError> {
        match &self.persistence {
            Some(p) => self.save(&p.path, p.flush_threshold, false).await,
            None => Ok(SaveOutcome::Disabled),
        }
    }

    /// Save to the configured snapshot regardless of the threshold.
    pub async fn flush(&self) -> Result<SaveOutcome, SnapshotError> {
        match &self.persistence {
            Some(p) => self.save(&p.path, p.flush_threshold, true).await,
            None => Ok(SaveOutcome::Disabled),
        }
    }

    /// Insert previously saved routes. Existing entries are kept.
    ///
    /// Routes whose endpoints are not in the catalog are dropped.
    pub async fn restore(&self, routes: Vec<Route>) -> usize {
        let mut restored = 0;
        for route in routes {
            let known = self.catalog.by_name(route.from.name()) == Some(&route.from)
                && self.catalog.by_name(route.to.name()) == Some(&route.to);
            if !known {
                debug!(key = %route.key(), "Dropping snapshot route with unknown endpoint");
                continue;
            }

            let entry = self
                .routes
                .entry(route.key())
                .or_insert(Arc::new(route))
                .await;
            if entry.is_fresh() {
                restored += 1;
            }
        }
        restored
    }

    /// Load routes from a snapshot file into this cache.
    ///
    /// Returns the number of routes restored, or `None` if the file doesn't
    /// exist.
    pub async fn load(&self, path: &Path) -> Result<Option<usize>, SnapshotError> {
        let Some(snapshot) = snapshot::read(path).await? else {
            return Ok(None);
        };
        let restored = self.restore(snapshot.routes).await;
        info!(path = %path.display(), restored, "Loaded route snapshot");
        Ok(Some(restored))
    }
}
