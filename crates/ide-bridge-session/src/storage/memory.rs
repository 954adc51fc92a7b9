//! In-memory instance storage.

use std::sync::{
    RwLock,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use ide_bridge_core::{InstanceMap, InstanceStorage, StorageError};

/// In-memory storage implementation.
///
/// Useful for tests and for drivers that manage their own instances.
/// Data is lost on restart.
#[derive(Default)]
pub struct MemoryStorage {
    instances: RwLock<InstanceMap>,
    saves: AtomicUsize,
}

impl MemoryStorage {
    /// Create an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a storage pre-filled with `instances`.
    #[must_use]
    pub fn with_instances(instances: InstanceMap) -> Self {
        Self {
            instances: RwLock::new(instances),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of times the contents have been replaced.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InstanceStorage for MemoryStorage {
    async fn load(&self) -> Result<InstanceMap, StorageError> {
        Ok(self
            .instances
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .clone())
    }

    async fn save(&self, instances: &InstanceMap) -> Result<(), StorageError> {
        *self
            .instances
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))? = instances.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
