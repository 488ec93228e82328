use crate::metrics::Metrics;
use crate::models::{Category, StoreSnapshot};
use crate::remote::{RemoteClient, RemoteResult};
use crate::state::{ConfigurationGate, StateChange};
use std::sync::{Arc, PoisonError, RwLock};

/// Process-wide holder for remote store data
///
/// Values are handed out as `Arc`s and replaced by swapping the pointer, so a reader
/// holds either the whole old value or the whole new one.
pub trait StoreCache: Send + Sync {
    /// Latest snapshot, or `None` before the first successful load
    fn snapshot(&self) -> Option<Arc<StoreSnapshot>>;

    /// Latest catalog; empty before the first successful load
    fn catalog(&self) -> Arc<Vec<Category>>;

    fn replace_snapshot(&self, snapshot: StoreSnapshot) -> Arc<StoreSnapshot>;

    fn replace_catalog(&self, catalog: Vec<Category>) -> Arc<Vec<Category>>;
}

/// In-memory [`StoreCache`]; lives until process exit
#[derive(Debug, Default)]
pub struct MemoryStoreCache {
    snapshot: RwLock<Option<Arc<StoreSnapshot>>>,
    catalog: RwLock<Arc<Vec<Category>>>,
}

impl MemoryStoreCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreCache for MemoryStoreCache {
    fn snapshot(&self) -> Option<Arc<StoreSnapshot>> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn catalog(&self) -> Arc<Vec<Category>> {
        Arc::clone(&self.catalog.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn replace_snapshot(&self, snapshot: StoreSnapshot) -> Arc<StoreSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&snapshot));
        snapshot
    }

    fn replace_catalog(&self, catalog: Vec<Category>) -> Arc<Vec<Category>> {
        let catalog = Arc::new(catalog);
        *self.catalog.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&catalog);
        catalog
    }
}

/// Which halves of a [`CacheStore::refresh`] swapped in new data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub snapshot: bool,
    pub catalog: bool,
}

impl RefreshOutcome {
    pub fn is_complete(&self) -> bool {
        self.snapshot && self.catalog
    }
}

/// Read-mostly cache of webstore data, refreshed from a [`RemoteClient`]
///
/// Snapshot and catalog are fetched independently and each is swapped on its own
/// success. A failed fetch keeps the previous value (stale but available).
pub struct CacheStore {
    remote: Arc<dyn RemoteClient>,
    cache: Arc<dyn StoreCache>,
    state: Arc<ConfigurationGate>,
    metrics: Arc<Metrics>,
}

impl CacheStore {
    pub fn new(
        remote: Arc<dyn RemoteClient>,
        cache: Arc<dyn StoreCache>,
        state: Arc<ConfigurationGate>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            remote,
            cache,
            state,
            metrics,
        }
    }

    /// Refresh snapshot and catalog concurrently
    pub async fn refresh(&self) -> RefreshOutcome {
        let (snapshot, catalog) = tokio::join!(self.refresh_snapshot(), self.refresh_catalog());
        RefreshOutcome { snapshot, catalog }
    }

    /// Refresh the store snapshot, keeping the old one on failure
    pub async fn refresh_snapshot(&self) -> bool {
        match self.load_snapshot().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(
                    "Failed to load store information: {}. Please check that your secret key is valid.",
                    e
                );
                false
            }
        }
    }

    /// Fetch and store the snapshot, returning the error to the caller
    pub async fn load_snapshot(&self) -> RemoteResult<Arc<StoreSnapshot>> {
        let result = self.remote.fetch_store_snapshot().await;
        self.metrics.record_refresh(result.is_ok());

        let snapshot = self.cache.replace_snapshot(result?);
        tracing::debug!(
            "Store snapshot refreshed: {} ({})",
            snapshot.store.name,
            snapshot.store.game_type
        );
        self.state.notify(StateChange::SnapshotRefreshed);
        Ok(snapshot)
    }

    /// Refresh the catalog, keeping the old one on failure
    pub async fn refresh_catalog(&self) -> bool {
        match self.remote.fetch_catalog().await {
            Ok(categories) => {
                self.metrics.record_refresh(true);
                let catalog = self.cache.replace_catalog(categories);
                tracing::debug!("Catalog refreshed: {} categories", catalog.len());
                self.state.notify(StateChange::CatalogRefreshed {
                    categories: catalog.len(),
                });
                true
            }
            Err(e) => {
                self.metrics.record_refresh(false);
                tracing::warn!(
                    "Failed to load store categories: {}. Please check that your secret key is valid.",
                    e
                );
                false
            }
        }
    }

    pub fn snapshot(&self) -> Option<Arc<StoreSnapshot>> {
        self.cache.snapshot()
    }

    pub fn catalog(&self) -> Arc<Vec<Category>> {
        self.cache.catalog()
    }
}
