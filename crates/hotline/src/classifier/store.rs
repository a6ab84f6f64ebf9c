//! Shared catalog holder with wholesale replacement

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use super::{Catalog, CategoryRecord, Classifier, Outcome};
use crate::backend::{BackendClient, BackendError};

/// Holds the current catalog; readers get an immutable snapshot per pass
#[derive(Debug)]
pub struct CatalogStore {
    current: RwLock<Arc<Catalog>>,
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new(Catalog::builtin())
    }
}

impl CatalogStore {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    /// Catalog for one classification pass
    pub async fn snapshot(&self) -> Arc<Catalog> {
        self.current.read().await.clone()
    }

    /// Swap in a new catalog; in-flight passes keep their old snapshot
    pub async fn replace(&self, catalog: Catalog) {
        let count = catalog.len();
        *self.current.write().await = Arc::new(catalog);
        info!("Catalog replaced: {} active categories", count);
    }

    /// Replace from raw records; an empty active set falls back to the built-in table
    pub async fn replace_records(&self, records: Vec<CategoryRecord>) -> usize {
        let catalog = Catalog::new(records);
        let catalog = if catalog.is_empty() {
            warn!("Reference catalog is empty, using built-in categories");
            Catalog::builtin()
        } else {
            catalog
        };
        let count = catalog.len();
        self.replace(catalog).await;
        count
    }

    /// Fetch the category list from the backend and swap it in.
    ///
    /// On failure the current catalog stays untouched.
    pub async fn reload_from(&self, backend: &BackendClient) -> Result<usize, BackendError> {
        match backend.list_categories().await {
            Ok(records) => Ok(self.replace_records(records).await),
            Err(e) => {
                warn!("Catalog reload failed, keeping current catalog: {}", e);
                Err(e)
            }
        }
    }

    /// Classify against the current snapshot
    pub async fn classify(&self, text: &str) -> Outcome {
        let catalog = self.snapshot().await;
        Classifier::new(&catalog).classify(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_snapshot_survives_replace() {
        let store = CatalogStore::default();
        let before = store.snapshot().await;

        store.replace(Catalog::new(vec![])).await;

        assert_eq!(before.len(), 8);
        assert!(store.snapshot().await.is_empty());
        assert!(store.classify("опалення").await.needs_operator);
    }

    #[test]
    fn test_empty_records_fall_back_to_builtin() {
        let store = CatalogStore::new(Catalog::new(vec![]));

        let count = tokio_test::block_on(store.replace_records(vec![]));

        assert_eq!(count, 8);
        let outcome = tokio_test::block_on(store.classify("немає опалення"));
        assert_eq!(outcome.subtype, "відсутність опалення");
    }
}
