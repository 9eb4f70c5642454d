//! Deterministic rules engine for turn-based tactical combat.
//!
//! `tactics-core` defines the canonical rules (actions, battles, grid, world
//! state) as pure, synchronous APIs that the runtime and offline tools share.
//! All randomness flows through the [`DiceRoller`] carried by a [`Session`],
//! and all world mutation flows through [`ResolvedAction::apply`], which
//! records a [`Transaction`] that can be rolled back.
pub mod action;
pub mod battle;
pub mod config;
pub mod content;
pub mod dice;
pub mod error;
pub mod grid;
pub mod path;
pub mod session;
pub mod state;
pub mod transaction;

pub use action::{
    Action, ActionError, ActionKind, ApplyContext, Continuation, Effect, EffectHandler,
    EffectRegistry, EffectTag, Intent, ParameterRequest, ParameterValue, PendingAction,
    ResolvedAction, available_actions, can_perform,
};
pub use battle::{
    Battle, BattleEntityState, BattleError, BattleEvent, BattlePhase, BattleState, EventKind,
    ReactionHandler, ReactionTrigger, Resource,
};
pub use config::GameConfig;
pub use content::{ContentError, ContentRepository};
pub use dice::{DiceExpr, DiceRoller, DieRoll, PcgRng, RollMode, ScriptedDice};
pub use error::{ErrorSeverity, GameError};
pub use grid::{Cover, Grid, GridError, MapDefinition, MapLayout};
pub use path::PathFinder;
pub use session::Session;
pub use state::{Entity, EntityId, EntityKind, Faction, Position, Statuses, World};
pub use transaction::{Transaction, TransactionError};
