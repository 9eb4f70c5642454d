//! Checkpoint persistence for battles in progress.
//!
//! A checkpoint is the serializable half of a fight: the [`World`] and the
//! [`BattleState`]. Listeners, reaction handlers and controllers are runtime
//! wiring and are rebuilt on resume.
//!
//! [`World`]: tactics_core::World
//! [`BattleState`]: tactics_core::BattleState

mod checkpoint;
mod error;
mod file;
mod memory;

pub use checkpoint::{BattleCheckpoint, CheckpointId, state_digest};
pub use error::RepositoryError;
pub use file::FileCheckpointRepository;
pub use memory::InMemoryCheckpointRepository;

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Storage for battle checkpoints keyed by round and turn.
pub trait CheckpointRepository {
    fn save(&self, checkpoint: &BattleCheckpoint) -> Result<CheckpointId>;

    fn load(&self, id: CheckpointId) -> Result<Option<BattleCheckpoint>>;

    fn delete(&self, id: CheckpointId) -> Result<()>;

    /// Stored ids in ascending order.
    fn list(&self) -> Result<Vec<CheckpointId>>;

    /// The most recent checkpoint, if any.
    fn latest(&self) -> Result<Option<BattleCheckpoint>> {
        match self.list()?.last() {
            Some(&id) => self.load(id),
            None => Ok(None),
        }
    }
}
