//! Snapshot tier
//!
//! A single JSON file holding `(entity, storedAt)` records. Every write
//! rewrites the whole file, so writes to the same file are serialized behind
//! one lock per path, shared by every backend instance in the process.
//! Records older than the tier TTL stay on disk but read as absent.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use crate::backend::{StorageBackend, StorageKind, ensure_key, with_deadline};
use crate::clock::Clock;
use crate::config::SnapshotTierConfig;
use crate::entity::Entity;
use crate::error::{StorageError, StorageResult};

type StoreLock = Arc<RwLock<()>>;

static STORE_LOCKS: OnceLock<Mutex<HashMap<PathBuf, StoreLock>>> = OnceLock::new();

/// Lock guarding the snapshot file at `path`; the same path always yields the same lock
fn store_lock(path: &Path) -> StoreLock {
    let mut locks = STORE_LOCKS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    Arc::clone(locks.entry(path.to_path_buf()).or_default())
}

/// One persisted record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRecord {
    entity: Entity,
    stored_at: DateTime<Utc>,
}

/// Snapshot tier backend
pub struct SnapshotBackend {
    path: PathBuf,
    ttl: chrono::Duration,
    timeout: Duration,
    clock: Arc<dyn Clock>,
    lock: StoreLock,
}

impl SnapshotBackend {
    /// Open the snapshot file, creating it as an empty set if absent
    pub async fn open(config: &SnapshotTierConfig, clock: Arc<dyn Clock>) -> StorageResult<Self> {
        let ttl = chrono::Duration::from_std(config.ttl)
            .map_err(|e| StorageError::InvalidArgument(format!("snapshot ttl: {e}")))?;
        let io_err = |e: std::io::Error| StorageError::backend(StorageKind::Snapshot, e);

        if let Some(dir) = config.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(io_err)?;
        }

        let path = tokio::fs::canonicalize(&config.path)
            .await
            .unwrap_or_else(|_| config.path.clone());
        let lock = store_lock(&path);

        {
            let _guard = lock.write().await;
            if !tokio::fs::try_exists(&path).await.map_err(io_err)? {
                debug!("Initializing empty snapshot store at {}", path.display());
                tokio::fs::write(&path, "[]").await.map_err(io_err)?;
            }
        }

        // Canonical form once the file exists, so every instance shares one lock
        let path = tokio::fs::canonicalize(&path).await.map_err(io_err)?;
        let lock = store_lock(&path);

        Ok(Self {
            path,
            ttl,
            timeout: config.timeout,
            clock,
            lock,
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_fresh(&self, record: &SnapshotRecord, now: DateTime<Utc>) -> bool {
        now - record.stored_at < self.ttl
    }

    async fn load(&self) -> StorageResult<Vec<SnapshotRecord>> {
        let json = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| StorageError::backend(StorageKind::Snapshot, e))?;
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&json).map_err(|e| StorageError::backend(StorageKind::Snapshot, e))
    }

    /// Replace the file contents via a sibling temp file and rename
    async fn persist(&self, records: &[SnapshotRecord]) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| StorageError::backend(StorageKind::Snapshot, e))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| StorageError::backend(StorageKind::Snapshot, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StorageError::backend(StorageKind::Snapshot, e))
    }
}

#[async_trait]
impl StorageBackend for SnapshotBackend {
    fn kind(&self) -> StorageKind {
        StorageKind::Snapshot
    }

    async fn fetch(&self, key: &str) -> StorageResult<Option<Entity>> {
        ensure_key(key)?;

        with_deadline(StorageKind::Snapshot, self.timeout, async {
            let records = {
                let _guard = self.lock.read().await;
                self.load().await?
            };
            let now = self.clock.now();
            Ok::<_, StorageError>(records
                .into_iter()
                .find(|r| r.entity.id.eq_ignore_ascii_case(key) && self.is_fresh(r, now))
                .map(|r| r.entity))
        })
        .await
    }

    async fn put(&self, entity: &Entity) -> StorageResult<()> {
        entity.ensure_storable()?;

        with_deadline(StorageKind::Snapshot, self.timeout, async {
            let _guard = self.lock.write().await;
            let mut records = self.load().await?;
            records.retain(|r| !r.entity.id.eq_ignore_ascii_case(&entity.id));
            records.push(SnapshotRecord {
                entity: entity.clone(),
                stored_at: self.clock.now(),
            });
            self.persist(&records).await
        })
        .await
    }
}
