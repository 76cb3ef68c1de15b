//! tierstore - Tiered entity storage
//!
//! This library fronts a small set of mutable entities with three tiers:
//! - Cache: Redis or in-process Moka cache, 10 minute absolute expiry (fastest)
//! - Snapshot: local JSON file, records stale after 30 minutes
//! - Authoritative: database repository, never expires (source of truth)
//!
//! The [`TieredOrchestrator`] offers one lookup/create/edit contract over all
//! of them:
//! - Read-through with backfill of faster tiers
//! - Concurrent write-through to every tier
//! - Per-tier failure policy (cache faults are contained, the others propagate)
//! - Every tier wrapped in a timing/logging decorator

mod authoritative_backend;
mod backend;
mod cache_backend;
mod clock;
mod config;
mod entity;
mod error;
mod factory;
mod observed;
mod orchestrator;
#[cfg(feature = "postgres")]
mod postgres;
mod repository;
mod snapshot_backend;

pub use authoritative_backend::AuthoritativeBackend;
pub use backend::{StorageBackend, StorageKind};
pub use cache_backend::{
    CacheBackend, CacheClient, ENTITY_KEY_NAMESPACE, MemoryCacheClient, RedisCacheClient,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    AuthoritativeTierConfig, CacheTierConfig, DatabaseSettings, RedisSettings,
    SnapshotTierConfig, StoreConfig,
};
pub use entity::{Entity, Role, generate_id, is_well_formed_id};
pub use error::{BoxError, ServiceError, StorageError, StorageResult};
pub use factory::StorageFactory;
pub use observed::ObservedBackend;
pub use orchestrator::TieredOrchestrator;
#[cfg(feature = "postgres")]
pub use postgres::PgEntityRepository;
pub use repository::{EntityRepository, InMemoryEntityRepository};
pub use snapshot_backend::SnapshotBackend;

// Re-export async_trait for implementors of the storage traits
pub use async_trait::async_trait;
