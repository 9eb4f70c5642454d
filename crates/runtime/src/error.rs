//! Unified error type surfaced by the runtime.
//!
//! Wraps battle, action, world and repository failures so the runner and the
//! binary can bubble them up with one `?`.
use std::fmt;

use tactics_core::{ActionError, BattleError, EntityId, ErrorSeverity, GameError};
use tactics_core::state::WorldError;
use thiserror::Error;

use crate::repository::RepositoryError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Battle(#[from] BattleError),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Content(#[from] anyhow::Error),

    #[error("{kind} turn controller not set")]
    ControllerNotSet { kind: ControllerKind },

    #[error("map has no spawn point named `{0}`")]
    UnknownSpawn(String),

    #[error("entity {0} is not placed on the map")]
    Unplaced(EntityId),
}

impl RuntimeError {
    /// Severity of the underlying core error, or `Fatal` for runtime plumbing.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Battle(e) => e.severity(),
            Self::Action(e) => e.severity(),
            Self::World(e) => e.severity(),
            Self::ControllerNotSet { .. } | Self::UnknownSpawn(_) | Self::Unplaced(_) => {
                ErrorSeverity::Validation
            }
            Self::Repository(_) | Self::Content(_) => ErrorSeverity::Fatal,
        }
    }
}

/// Which controller slot drives an entity.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ControllerKind {
    Player,
    Npc,
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ControllerKind::Player => "player",
            ControllerKind::Npc => "npc",
        };
        write!(f, "{}", label)
    }
}
