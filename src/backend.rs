//! Uniform storage contract implemented by every tier

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use crate::entity::Entity;
use crate::error::{StorageError, StorageResult};

/// Storage tiers, fastest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// Volatile low-latency cache (Redis or in-process)
    Cache,
    /// Durable local snapshot file
    Snapshot,
    /// Source of truth
    Authoritative,
}

impl StorageKind {
    /// All tiers in lookup order
    pub const ALL: [StorageKind; 3] = [Self::Cache, Self::Snapshot, Self::Authoritative];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Snapshot => "snapshot",
            Self::Authoritative => "authoritative",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cache" => Ok(Self::Cache),
            "snapshot" | "file" => Ok(Self::Snapshot),
            "authoritative" | "database" => Ok(Self::Authoritative),
            other => Err(StorageError::InvalidArgument(format!(
                "unknown storage kind: {other:?}"
            ))),
        }
    }
}

/// Fetch-by-key / store-by-key contract shared by all tiers and the
/// observability decorator.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Which tier this backend serves
    fn kind(&self) -> StorageKind;

    /// Return the entity stored under `key`, or `None` if missing or expired
    /// under this tier's policy. An empty key is `InvalidKey`.
    async fn fetch(&self, key: &str) -> StorageResult<Option<Entity>>;

    /// Upsert `entity` under its id.
    async fn put(&self, entity: &Entity) -> StorageResult<()>;
}

pub(crate) fn ensure_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey);
    }
    Ok(())
}

/// Run a tier call under `deadline`; expiry becomes a backend failure of `kind`.
pub(crate) async fn with_deadline<T, F>(
    kind: StorageKind,
    deadline: Duration,
    call: F,
) -> StorageResult<T>
where
    F: Future<Output = StorageResult<T>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(elapsed) => Err(StorageError::backend(kind, elapsed)),
    }
}
