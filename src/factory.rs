//! Construction of decorated tier backends

use std::sync::Arc;

use crate::authoritative_backend::AuthoritativeBackend;
use crate::backend::{StorageBackend, StorageKind};
use crate::cache_backend::{CacheBackend, CacheClient};
use crate::clock::Clock;
use crate::config::StoreConfig;
use crate::error::StorageResult;
use crate::observed::ObservedBackend;
use crate::repository::EntityRepository;
use crate::snapshot_backend::SnapshotBackend;

/// Builds one backend per requested tier, always wrapped in [`ObservedBackend`].
///
/// Holds only long-lived shared handles; every call builds a fresh backend.
#[derive(Clone)]
pub struct StorageFactory {
    config: StoreConfig,
    cache_client: Arc<dyn CacheClient>,
    repository: Arc<dyn EntityRepository>,
    clock: Arc<dyn Clock>,
}

impl StorageFactory {
    pub fn new(
        config: StoreConfig,
        cache_client: Arc<dyn CacheClient>,
        repository: Arc<dyn EntityRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            cache_client,
            repository,
            clock,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Create the backend for `kind`
    pub async fn create_backend(&self, kind: StorageKind) -> StorageResult<Arc<dyn StorageBackend>> {
        let backend: Arc<dyn StorageBackend> = match kind {
            StorageKind::Cache => Arc::new(ObservedBackend::new(CacheBackend::new(
                Arc::clone(&self.cache_client),
                &self.config.cache,
            ))),
            StorageKind::Snapshot => Arc::new(ObservedBackend::new(
                SnapshotBackend::open(&self.config.snapshot, Arc::clone(&self.clock)).await?,
            )),
            StorageKind::Authoritative => Arc::new(ObservedBackend::new(AuthoritativeBackend::new(
                Arc::clone(&self.repository),
                &self.config.authoritative,
            ))),
        };
        Ok(backend)
    }

    /// Create a backend from its textual name; unknown names are `InvalidArgument`
    pub async fn create_backend_named(&self, name: &str) -> StorageResult<Arc<dyn StorageBackend>> {
        self.create_backend(name.parse()?).await
    }
}
