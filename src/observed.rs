//! Timing and logging decorator for storage backends
//!
//! [`ObservedBackend`] forwards every call to the wrapped backend unchanged
//! and emits one event per call with the tier, key, outcome and elapsed
//! milliseconds measured on a monotonic clock. Errors are logged and
//! returned as-is.

use async_trait::async_trait;
use std::time::Instant;
use tracing::{error, info};

use crate::backend::{StorageBackend, StorageKind};
use crate::entity::Entity;
use crate::error::StorageResult;

/// Decorator adding observability to any [`StorageBackend`]
pub struct ObservedBackend<B> {
    inner: B,
    tier: StorageKind,
}

impl<B: StorageBackend> ObservedBackend<B> {
    /// Wrap `inner`, tagging events with its tier
    pub fn new(inner: B) -> Self {
        let tier = inner.kind();
        Self { inner, tier }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[async_trait]
impl<B: StorageBackend> StorageBackend for ObservedBackend<B> {
    fn kind(&self) -> StorageKind {
        self.tier
    }

    async fn fetch(&self, key: &str) -> StorageResult<Option<Entity>> {
        let started = Instant::now();
        match self.inner.fetch(key).await {
            Ok(entity) => {
                info!(
                    tier = %self.tier,
                    key,
                    hit = entity.is_some(),
                    elapsed_ms = elapsed_ms(started),
                    "storage fetch"
                );
                Ok(entity)
            }
            Err(e) => {
                error!(
                    tier = %self.tier,
                    key,
                    error = %e,
                    elapsed_ms = elapsed_ms(started),
                    "storage fetch failed"
                );
                Err(e)
            }
        }
    }

    async fn put(&self, entity: &Entity) -> StorageResult<()> {
        let started = Instant::now();
        match self.inner.put(entity).await {
            Ok(()) => {
                info!(
                    tier = %self.tier,
                    id = %entity.id,
                    ok = true,
                    elapsed_ms = elapsed_ms(started),
                    "storage put"
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    tier = %self.tier,
                    id = %entity.id,
                    error = %e,
                    elapsed_ms = elapsed_ms(started),
                    "storage put failed"
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Role;
    use crate::error::StorageError;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend that answers from a fixed value and counts calls
    struct Scripted {
        stored: Option<Entity>,
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StorageBackend for Scripted {
        fn kind(&self) -> StorageKind {
            StorageKind::Snapshot
        }

        async fn fetch(&self, _key: &str) -> StorageResult<Option<Entity>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StorageError::backend(StorageKind::Snapshot, "disk full"));
            }
            Ok(self.stored.clone())
        }

        async fn put(&self, _entity: &Entity) -> StorageResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StorageError::backend(StorageKind::Snapshot, "disk full"));
            }
            Ok(())
        }
    }

    fn scripted(stored: Option<Entity>, fail: bool) -> ObservedBackend<Scripted> {
        ObservedBackend::new(Scripted {
            stored,
            fail,
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_forwards_results_unchanged() {
        let entity = Entity::create(Role::User, "x", Utc::now());
        let observed = scripted(Some(entity.clone()), false);

        assert_eq!(observed.kind(), StorageKind::Snapshot);
        assert_eq!(observed.fetch(&entity.id).await.unwrap(), Some(entity.clone()));
        observed.put(&entity).await.unwrap();
        assert_eq!(observed.inner().calls.load(Ordering::SeqCst), 2);

        let empty = scripted(None, false);
        assert!(empty.fetch("abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reraises_errors() {
        let entity = Entity::create(Role::User, "x", Utc::now());
        let observed = scripted(None, true);

        assert!(observed.fetch(&entity.id).await.unwrap_err().is_backend_failure());
        assert!(observed.put(&entity).await.unwrap_err().is_backend_failure());
        assert_eq!(observed.inner().calls.load(Ordering::SeqCst), 2);
    }
}
