//! Cache tier
//!
//! Entities are stored as JSON under `{prefix}entity:{id}` with an absolute
//! expiry set on every write. The tier is never a hard dependency:
//! - transport or decode faults on `fetch` read as a miss
//! - transport faults on `put` are logged and swallowed
//!
//! Two clients are provided: [`RedisCacheClient`] for a shared Redis and
//! [`MemoryCacheClient`], an in-process Moka cache that honors the injected
//! [`Clock`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::backend::{StorageBackend, StorageKind, ensure_key, with_deadline};
use crate::clock::Clock;
use crate::config::{CacheTierConfig, RedisSettings};
use crate::entity::Entity;
use crate::error::{BoxError, StorageError, StorageResult};

/// Namespace placed in front of every entity id
pub const ENTITY_KEY_NAMESPACE: &str = "entity:";

/// Minimal key/value client the cache tier talks to
#[async_trait]
pub trait CacheClient: Send + Sync + 'static {
    /// Read the payload stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>, BoxError>;

    /// Store `value` under `key`, expiring `ttl` from now
    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), BoxError>;
}

/// Redis-backed cache client
#[derive(Clone)]
pub struct RedisCacheClient {
    redis: redis::aio::ConnectionManager,
}

impl RedisCacheClient {
    /// Connect using the given settings, bounded by `connect_timeout`
    pub async fn connect(settings: &RedisSettings) -> Result<Self, BoxError> {
        let client = redis::Client::open(settings.url())?;
        let redis = tokio::time::timeout(
            settings.connect_timeout,
            redis::aio::ConnectionManager::new(client),
        )
        .await??;
        Ok(Self { redis })
    }

    /// Wrap an existing connection manager
    pub fn from_manager(redis: redis::aio::ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl CacheClient for RedisCacheClient {
    async fn get(&self, key: &str) -> Result<Option<String>, BoxError> {
        let mut conn = self.redis.clone();
        Ok(conn.get::<_, Option<String>>(key).await?)
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), BoxError> {
        let mut conn = self.redis.clone();
        // Redis rejects a zero expiry
        let ttl_seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds).await?;
        Ok(())
    }
}

#[derive(Clone)]
struct MemoryEntry {
    payload: String,
    expires_at: DateTime<Utc>,
}

/// In-process cache client.
///
/// Moka bounds the capacity; expiry is checked against the injected clock so
/// it is exact to the millisecond.
#[derive(Clone)]
pub struct MemoryCacheClient {
    entries: Cache<String, Arc<MemoryEntry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCacheClient {
    pub fn new(max_capacity: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Cache::builder().max_capacity(max_capacity).build(),
            clock,
        }
    }
}

#[async_trait]
impl CacheClient for MemoryCacheClient {
    async fn get(&self, key: &str) -> Result<Option<String>, BoxError> {
        let Some(entry) = self.entries.get(key).await else {
            return Ok(None);
        };
        if self.clock.now() >= entry.expires_at {
            self.entries.invalidate(key).await;
            return Ok(None);
        }
        Ok(Some(entry.payload.clone()))
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), BoxError> {
        let expires_at = self.clock.now() + chrono::Duration::from_std(ttl)?;
        self.entries
            .insert(
                key.to_owned(),
                Arc::new(MemoryEntry {
                    payload: value,
                    expires_at,
                }),
            )
            .await;
        Ok(())
    }
}

/// Cache tier backend
pub struct CacheBackend {
    client: Arc<dyn CacheClient>,
    ttl: Duration,
    timeout: Duration,
    key_prefix: String,
}

impl CacheBackend {
    pub fn new(client: Arc<dyn CacheClient>, config: &CacheTierConfig) -> Self {
        Self {
            client,
            ttl: config.ttl,
            timeout: config.timeout,
            key_prefix: config.key_prefix.clone(),
        }
    }

    /// Build the cache key for an entity id
    pub fn format_key(&self, id: &str) -> String {
        format!("{}{}{}", self.key_prefix, ENTITY_KEY_NAMESPACE, id)
    }

    async fn try_put(&self, cache_key: &str, entity: &Entity) -> StorageResult<()> {
        let json = serde_json::to_string(entity)
            .map_err(|e| StorageError::backend(StorageKind::Cache, e))?;
        with_deadline(StorageKind::Cache, self.timeout, async {
            self.client
                .set_ex(cache_key, json, self.ttl)
                .await
                .map_err(|e| StorageError::backend(StorageKind::Cache, e))
        })
        .await
    }
}

#[async_trait]
impl StorageBackend for CacheBackend {
    fn kind(&self) -> StorageKind {
        StorageKind::Cache
    }

    async fn fetch(&self, key: &str) -> StorageResult<Option<Entity>> {
        ensure_key(key)?;
        let cache_key = self.format_key(key);

        let cached = with_deadline(StorageKind::Cache, self.timeout, async {
            self.client
                .get(&cache_key)
                .await
                .map_err(|e| StorageError::backend(StorageKind::Cache, e))
        })
        .await;

        let json = match cached {
            Ok(Some(json)) => json,
            Ok(None) => {
                debug!("Cache miss for key: {}", cache_key);
                return Ok(None);
            }
            Err(e) => {
                warn!("Cache GET error for key {}: {}. Treating as miss.", cache_key, e);
                return Ok(None);
            }
        };

        match serde_json::from_str::<Entity>(&json) {
            Ok(entity) => Ok(Some(entity)),
            Err(e) => {
                warn!(
                    "Failed to deserialize cached entity for key {}: {}. Treating as miss.",
                    cache_key, e
                );
                Ok(None)
            }
        }
    }

    async fn put(&self, entity: &Entity) -> StorageResult<()> {
        entity.ensure_storable()?;
        let cache_key = self.format_key(&entity.id);

        if let Err(e) = self.try_put(&cache_key, entity).await {
            warn!("Cache SETEX error for key {}: {}. Continuing.", cache_key, e);
        }
        Ok(())
    }
}
