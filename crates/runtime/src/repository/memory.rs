//! In-memory checkpoint repository.

use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{BattleCheckpoint, CheckpointId, CheckpointRepository, RepositoryError, Result};

/// Keeps checkpoints for the lifetime of the process. Used by tests and by
/// runs that only need in-session rewind.
#[derive(Default)]
pub struct InMemoryCheckpointRepository {
    checkpoints: Mutex<BTreeMap<CheckpointId, BattleCheckpoint>>,
}

impl InMemoryCheckpointRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointRepository for InMemoryCheckpointRepository {
    fn save(&self, checkpoint: &BattleCheckpoint) -> Result<CheckpointId> {
        let id = checkpoint.id();
        self.checkpoints
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned)?
            .insert(id, checkpoint.clone());
        Ok(id)
    }

    fn load(&self, id: CheckpointId) -> Result<Option<BattleCheckpoint>> {
        let checkpoints = self
            .checkpoints
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(checkpoints.get(&id).cloned())
    }

    fn delete(&self, id: CheckpointId) -> Result<()> {
        self.checkpoints
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned)?
            .remove(&id);
        Ok(())
    }

    fn list(&self) -> Result<Vec<CheckpointId>> {
        let checkpoints = self
            .checkpoints
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(checkpoints.keys().copied().collect())
    }
}
