//! Action building, resolution and application errors.
//!
//! Precondition failures surface as errors with a descriptive variant; they
//! never degrade into a silent no-op. Gameplay outcomes such as a miss or a
//! failed grapple are effects, not errors.

use crate::action::EffectTag;
use crate::battle::Resource;
use crate::content::ContentError;
use crate::error::{ErrorSeverity, GameError};
use crate::state::{EntityId, Position};
use crate::transaction::TransactionError;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("entity {0} not found")]
    EntityNotFound(EntityId),

    #[error("entity {0} is incapacitated")]
    Incapacitated(EntityId),

    #[error("entity {entity} has no {resource} remaining")]
    InsufficientResource { entity: EntityId, resource: Resource },

    #[error("target {target} is {distance_ft} ft away, range is {range_ft} ft")]
    OutOfRange {
        target: EntityId,
        distance_ft: u32,
        range_ft: u32,
    },

    #[error("invalid target {target}: {reason}")]
    InvalidTarget {
        target: EntityId,
        reason: &'static str,
    },

    #[error("entity {entity} cannot act: {reason}")]
    PreconditionViolation {
        entity: EntityId,
        reason: &'static str,
    },

    #[error("entity {entity} has no `{weapon}` equipped")]
    NotEquipped { entity: EntityId, weapon: String },

    #[error("entity {entity} is out of {ammunition}")]
    OutOfAmmunition { entity: EntityId, ammunition: String },

    #[error("entity {entity} does not know `{spell}`")]
    SpellNotKnown { entity: EntityId, spell: String },

    #[error("entity {entity} carries no `{item}`")]
    ItemMissing { entity: EntityId, item: String },

    #[error("invalid path step at {at}: {reason}")]
    InvalidPath {
        at: Position,
        reason: &'static str,
    },

    #[error("no interactable object at {0}")]
    NoObject(Position),

    #[error("parameter mismatch: expected {expected}")]
    InvalidParameter { expected: &'static str },

    #[error("no handler registered for {0} effects")]
    UnhandledEffect(EffectTag),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

impl GameError for ActionError {
    fn severity(&self) -> ErrorSeverity {
        use ActionError::*;
        match self {
            EntityNotFound(_) | InvalidParameter { .. } => ErrorSeverity::Validation,
            Incapacitated(_) | InsufficientResource { .. } | OutOfRange { .. } => {
                ErrorSeverity::Recoverable
            }
            InvalidTarget { .. } | PreconditionViolation { .. } | InvalidPath { .. } => {
                ErrorSeverity::Recoverable
            }
            NotEquipped { .. } | OutOfAmmunition { .. } | SpellNotKnown { .. } => {
                ErrorSeverity::Validation
            }
            ItemMissing { .. } | NoObject(_) => ErrorSeverity::Validation,
            UnhandledEffect(_) => ErrorSeverity::Internal,
            Content(e) => e.severity(),
            Transaction(e) => e.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        use ActionError::*;
        match self {
            EntityNotFound(_) => "ACTION_ENTITY_NOT_FOUND",
            Incapacitated(_) => "ACTION_INCAPACITATED",
            InsufficientResource { .. } => "ACTION_INSUFFICIENT_RESOURCE",
            OutOfRange { .. } => "ACTION_OUT_OF_RANGE",
            InvalidTarget { .. } => "ACTION_INVALID_TARGET",
            PreconditionViolation { .. } => "ACTION_PRECONDITION_VIOLATION",
            NotEquipped { .. } => "ACTION_NOT_EQUIPPED",
            OutOfAmmunition { .. } => "ACTION_OUT_OF_AMMUNITION",
            SpellNotKnown { .. } => "ACTION_SPELL_NOT_KNOWN",
            ItemMissing { .. } => "ACTION_ITEM_MISSING",
            InvalidPath { .. } => "ACTION_INVALID_PATH",
            NoObject(_) => "ACTION_NO_OBJECT",
            InvalidParameter { .. } => "ACTION_INVALID_PARAMETER",
            UnhandledEffect(_) => "ACTION_UNHANDLED_EFFECT",
            Content(e) => e.error_code(),
            Transaction(e) => e.error_code(),
        }
    }
}
