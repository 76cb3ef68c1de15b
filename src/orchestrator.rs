//! Entity-level read-through / write-through service
//!
//! The orchestrator composes the three tiers, fastest first:
//! - lookup: Cache, then Snapshot, then Authoritative, backfilling faster
//!   tiers with whatever a slower tier returned
//! - create and edit: fan the entity out to every tier concurrently
//!
//! Lookups never fail; any tier fault degrades to "not found" and is logged.
//! Writes report the first tier failure after every leg has finished. There
//! is no rollback of legs that did succeed.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::backend::{StorageBackend, StorageKind};
use crate::clock::Clock;
use crate::entity::{Entity, Role};
use crate::error::{ServiceError, StorageResult};
use crate::factory::StorageFactory;

/// Tiered entity service
#[derive(Clone)]
pub struct TieredOrchestrator {
    cache: Arc<dyn StorageBackend>,
    snapshot: Arc<dyn StorageBackend>,
    authoritative: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
}

impl TieredOrchestrator {
    /// Acquire one backend per tier from `factory`, in tier order
    pub async fn new(factory: &StorageFactory) -> StorageResult<Self> {
        let cache = factory.create_backend(StorageKind::Cache).await?;
        let snapshot = factory.create_backend(StorageKind::Snapshot).await?;
        let authoritative = factory.create_backend(StorageKind::Authoritative).await?;
        Ok(Self::from_backends(
            cache,
            snapshot,
            authoritative,
            factory.clock(),
        ))
    }

    /// Assemble from already-built backends
    pub fn from_backends(
        cache: Arc<dyn StorageBackend>,
        snapshot: Arc<dyn StorageBackend>,
        authoritative: Arc<dyn StorageBackend>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cache,
            snapshot,
            authoritative,
            clock,
        }
    }

    /// Find an entity by id, backfilling faster tiers on a slower-tier hit.
    ///
    /// Returns `None` when no tier holds the entity or when any tier fails.
    pub async fn lookup(&self, id: &str) -> Option<Entity> {
        match self.read_through(id).await {
            Ok(found) => found,
            Err(e) => {
                warn!(id, error = %e, "lookup degraded to not found");
                None
            }
        }
    }

    async fn read_through(&self, id: &str) -> StorageResult<Option<Entity>> {
        if let Some(entity) = self.cache.fetch(id).await? {
            return Ok(Some(entity));
        }

        if let Some(entity) = self.snapshot.fetch(id).await? {
            debug!("Backfilling cache from snapshot for id: {}", id);
            self.cache.put(&entity).await?;
            return Ok(Some(entity));
        }

        let Some(entity) = self.authoritative.fetch(id).await? else {
            debug!("Entity not found in any tier: {}", id);
            return Ok(None);
        };

        debug!("Backfilling cache and snapshot from authoritative for id: {}", id);
        fan_out(&[&self.cache, &self.snapshot], &entity).await?;
        Ok(Some(entity))
    }

    /// Create a new entity and write it through to every tier.
    ///
    /// `role` is "admin" (any case) for [`Role::Admin`], anything else for
    /// [`Role::User`]. Both arguments must be non-empty.
    pub async fn create(&self, role: &str, description: &str) -> Result<Entity, ServiceError> {
        if role.is_empty() {
            return Err(ServiceError::Validation("role is required".to_owned()));
        }
        if description.is_empty() {
            return Err(ServiceError::Validation("description is required".to_owned()));
        }

        let entity = Entity::create(Role::from_request(role), description, self.clock.now());

        if let Err(e) = fan_out(&self.all_tiers(), &entity).await {
            error!(id = %entity.id, error = %e, "create write-through failed");
            return Err(e.into());
        }
        Ok(entity)
    }

    /// Update an entity's description and write it through to every tier.
    ///
    /// An empty or missing description leaves the field unchanged; the
    /// write-through still happens.
    pub async fn edit(&self, id: &str, description: Option<&str>) -> Result<Entity, ServiceError> {
        let Some(mut entity) = self.lookup(id).await else {
            return Err(ServiceError::NotFound);
        };

        if let Some(description) = description.filter(|d| !d.is_empty()) {
            entity.description = description.to_owned();
        }

        if let Err(e) = fan_out(&self.all_tiers(), &entity).await {
            error!(id = %entity.id, error = %e, "edit write-through failed");
            return Err(e.into());
        }
        Ok(entity)
    }

    fn all_tiers(&self) -> [&Arc<dyn StorageBackend>; 3] {
        [&self.cache, &self.snapshot, &self.authoritative]
    }
}

/// Write `entity` to every tier concurrently, wait for all legs, and report
/// the first failure in tier order.
async fn fan_out(tiers: &[&Arc<dyn StorageBackend>], entity: &Entity) -> StorageResult<()> {
    join_all(tiers.iter().map(|tier| tier.put(entity)))
        .await
        .into_iter()
        .collect()
}
