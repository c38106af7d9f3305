use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::catalog::Catalog;
use crate::errors::StoreError;

/// Durable home of the catalog. Loaded once per process, saved once per run.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Returns an empty catalog when nothing has been stored yet.
    /// Unreadable or inconsistent contents are an error, never an empty catalog.
    async fn load(&self) -> Result<Catalog, StoreError>;

    /// Replaces the stored catalog atomically.
    async fn save(&self, catalog: &Catalog) -> Result<(), StoreError>;

    fn location(&self) -> String;
}

#[derive(Default)]
pub struct InMemoryCatalogStore {
    catalog: RwLock<Option<Catalog>>,
    saves: AtomicUsize,
}

impl InMemoryCatalogStore {
    pub fn with_catalog(catalog: Catalog) -> Self {
        Self { catalog: RwLock::new(Some(catalog)), saves: AtomicUsize::new(0) }
    }

    pub async fn snapshot(&self) -> Option<Catalog> {
        self.catalog.read().await.clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn load(&self) -> Result<Catalog, StoreError> {
        Ok(self.catalog.read().await.clone().unwrap_or_default())
    }

    async fn save(&self, catalog: &Catalog) -> Result<(), StoreError> {
        *self.catalog.write().await = Some(catalog.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_owned()
    }
}
