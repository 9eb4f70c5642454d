use crate::action::ActionError;
use crate::battle::BattlePhase;
use crate::error::{ErrorSeverity, GameError};
use crate::state::EntityId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BattleError {
    #[error("battle is {actual}, expected {expected}")]
    WrongPhase {
        expected: BattlePhase,
        actual: BattlePhase,
    },

    #[error("battle has no combatants")]
    NoCombatants,

    #[error("entity {0} not found")]
    UnknownEntity(EntityId),

    #[error(transparent)]
    Action(#[from] ActionError),
}

impl GameError for BattleError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::WrongPhase { .. } | Self::NoCombatants => ErrorSeverity::Validation,
            Self::UnknownEntity(_) => ErrorSeverity::Validation,
            Self::Action(e) => e.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::WrongPhase { .. } => "BATTLE_WRONG_PHASE",
            Self::NoCombatants => "BATTLE_NO_COMBATANTS",
            Self::UnknownEntity(_) => "BATTLE_UNKNOWN_ENTITY",
            Self::Action(e) => e.error_code(),
        }
    }
}
