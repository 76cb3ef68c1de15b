//! Authoritative-tier drivers
//!
//! An [`EntityRepository`] speaks the database's native operations: point
//! lookup by id, insert, and a description-only update. The
//! [`AuthoritativeBackend`](crate::AuthoritativeBackend) composes them into
//! the storage contract.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::entity::Entity;
use crate::error::BoxError;

/// Native operations of the authoritative store
#[async_trait]
pub trait EntityRepository: Send + Sync + 'static {
    /// Exact-id point lookup
    async fn find_by_id(&self, id: &str) -> Result<Option<Entity>, BoxError>;

    /// Insert a new entity. Inserting an id that already exists is an error.
    async fn insert(&self, entity: &Entity) -> Result<(), BoxError>;

    /// Overwrite the description of `id`. A missing id matches nothing and is not an error.
    async fn update_description(&self, id: &str, description: &str) -> Result<(), BoxError>;
}

/// Repository kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryEntityRepository {
    entities: RwLock<HashMap<String, Entity>>,
}

impl InMemoryEntityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entities
    pub async fn len(&self) -> usize {
        self.entities.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entities.read().await.is_empty()
    }
}

#[async_trait]
impl EntityRepository for InMemoryEntityRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Entity>, BoxError> {
        Ok(self.entities.read().await.get(id).cloned())
    }

    async fn insert(&self, entity: &Entity) -> Result<(), BoxError> {
        let mut entities = self.entities.write().await;
        if entities.contains_key(&entity.id) {
            return Err(format!("duplicate key: {}", entity.id).into());
        }
        entities.insert(entity.id.clone(), entity.clone());
        Ok(())
    }

    async fn update_description(&self, id: &str, description: &str) -> Result<(), BoxError> {
        if let Some(entity) = self.entities.write().await.get_mut(id) {
            entity.description = description.to_owned();
        }
        Ok(())
    }
}
