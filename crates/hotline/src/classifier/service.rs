//! Backend-first classification with local fallback

use std::sync::Arc;

use tracing::{debug, warn};

use super::{CatalogStore, Outcome};
use crate::backend::BackendClient;

/// Classifies through the backend when it is reachable, locally otherwise
#[derive(Debug, Clone)]
pub struct ClassificationService {
    backend: Option<Arc<BackendClient>>,
    catalog: Arc<CatalogStore>,
}

impl ClassificationService {
    pub fn new(backend: Option<Arc<BackendClient>>, catalog: Arc<CatalogStore>) -> Self {
        Self { backend, catalog }
    }

    /// Local-only service over the given catalog
    pub fn local(catalog: Arc<CatalogStore>) -> Self {
        Self::new(None, catalog)
    }

    pub fn catalog(&self) -> &Arc<CatalogStore> {
        &self.catalog
    }

    pub fn backend(&self) -> Option<&Arc<BackendClient>> {
        self.backend.as_ref()
    }

    pub async fn classify(&self, text: &str) -> Outcome {
        if let Some(backend) = self.backend.as_ref().filter(|b| b.is_connected()) {
            match backend.classify(text).await {
                Ok(outcome) => {
                    debug!("Backend classified request as '{}'", outcome.subtype);
                    return outcome;
                }
                Err(e) => warn!("Backend classification failed, using local classifier: {}", e),
            }
        }

        self.catalog.classify(text).await
    }
}
