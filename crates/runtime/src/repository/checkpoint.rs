use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tactics_core::{BattleState, World};

use super::{RepositoryError, Result};

/// Position in the turn sequence a checkpoint was taken at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CheckpointId {
    pub round: u32,
    pub turn: usize,
}

impl CheckpointId {
    pub fn of(battle: &BattleState) -> Self {
        Self {
            round: battle.round,
            turn: battle.turn_index,
        }
    }
}

impl fmt::Display for CheckpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.round, self.turn)
    }
}

/// Everything needed to resume a battle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleCheckpoint {
    pub world: World,
    pub battle: BattleState,
}

impl BattleCheckpoint {
    pub fn new(world: World, battle: BattleState) -> Self {
        Self { world, battle }
    }

    pub fn id(&self) -> CheckpointId {
        CheckpointId::of(&self.battle)
    }

    pub(crate) fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| RepositoryError::Serialization(e.to_string()))
    }

    pub(crate) fn decode(name: &str, bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| RepositoryError::CorruptedData {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Hex SHA-256 over the bincode encoding. Two replays that reach the same
/// state produce the same digest.
pub fn state_digest(checkpoint: &BattleCheckpoint) -> Result<String> {
    let bytes = checkpoint.encode()?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactics_core::state::{Entity, EntityKind, Position};
    use tactics_core::Grid;

    fn checkpoint(hp: i32) -> BattleCheckpoint {
        let mut world = World::new(Grid::new(4, 4));
        world
            .spawn(
                Entity::new("scout", EntityKind::Pc).with_hit_points(hp),
                Position::new(1, 1),
            )
            .unwrap();
        BattleCheckpoint::new(world, BattleState::default())
    }

    #[test]
    fn digest_is_stable_and_sensitive() {
        let a = state_digest(&checkpoint(10)).unwrap();
        assert_eq!(a, state_digest(&checkpoint(10)).unwrap());
        assert_eq!(a.len(), 64);
        assert_ne!(a, state_digest(&checkpoint(9)).unwrap());
    }

    #[test]
    fn ids_order_by_round_then_turn() {
        let early = CheckpointId { round: 1, turn: 3 };
        let late = CheckpointId { round: 2, turn: 0 };
        assert!(early < late);
        assert_eq!(late.to_string(), "2_0");
    }

    #[test]
    fn garbage_bytes_are_reported_as_corruption() {
        let err = BattleCheckpoint::decode("checkpoint_1_0.bin", b"nope").unwrap_err();
        assert!(matches!(err, RepositoryError::CorruptedData { .. }));
    }
}
