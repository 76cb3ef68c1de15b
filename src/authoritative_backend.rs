//! Authoritative tier
//!
//! Source of truth. Never expires data; every fault propagates with tier context.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{StorageBackend, StorageKind, ensure_key, with_deadline};
use crate::config::AuthoritativeTierConfig;
use crate::entity::Entity;
use crate::error::{StorageError, StorageResult};
use crate::repository::EntityRepository;

/// Authoritative tier backend over an [`EntityRepository`]
pub struct AuthoritativeBackend {
    repository: Arc<dyn EntityRepository>,
    timeout: Duration,
}

impl AuthoritativeBackend {
    pub fn new(repository: Arc<dyn EntityRepository>, config: &AuthoritativeTierConfig) -> Self {
        Self {
            repository,
            timeout: config.timeout,
        }
    }
}

#[async_trait]
impl StorageBackend for AuthoritativeBackend {
    fn kind(&self) -> StorageKind {
        StorageKind::Authoritative
    }

    async fn fetch(&self, key: &str) -> StorageResult<Option<Entity>> {
        ensure_key(key)?;
        with_deadline(StorageKind::Authoritative, self.timeout, async {
            self.repository
                .find_by_id(key)
                .await
                .map_err(|e| StorageError::backend(StorageKind::Authoritative, e))
        })
        .await
    }

    /// Existence check, then a description-only update or a full insert.
    async fn put(&self, entity: &Entity) -> StorageResult<()> {
        entity.ensure_storable()?;
        with_deadline(StorageKind::Authoritative, self.timeout, async {
            let existing = self
                .repository
                .find_by_id(&entity.id)
                .await
                .map_err(|e| StorageError::backend(StorageKind::Authoritative, e))?;
            let written = if existing.is_some() {
                self.repository
                    .update_description(&entity.id, &entity.description)
                    .await
            } else {
                self.repository.insert(entity).await
            };
            written.map_err(|e| StorageError::backend(StorageKind::Authoritative, e))
        })
        .await
    }
}
