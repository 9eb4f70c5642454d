//! Action domain: parameter gathering, resolution and application.
//!
//! An action goes through three stages:
//!
//! 1. **Build** ([`ActionKind::build`]): a pull-based state machine asks for
//!    the parameters the kind needs and yields a complete [`Action`].
//! 2. **Resolve** ([`Action::resolve`]): rolls every die and checks every rule
//!    against a read-only world, producing a [`ResolvedAction`] holding an
//!    ordered list of [`Effect`]s.
//! 3. **Apply** ([`ResolvedAction::apply`]): routes each effect through the
//!    [`EffectRegistry`] and records every mutation in a transaction that is
//!    rolled back if any handler fails.
//!
//! [`can_perform`] and [`available_actions`] answer the cheaper question of
//! which kinds are worth offering right now.

mod advantage;
mod apply;
mod available;
mod effect;
mod error;
mod kind;
mod protocol;
mod resolve;

pub use advantage::{Advantage, AdvantageTag, AttackReach, evaluate as evaluate_advantage};
pub use apply::{
    ApplyContext, ContestHandler, DamageHandler, DoorHandler, EffectHandler, EffectRegistry,
    HealHandler, HelpHandler, HideHandler, InventoryHandler, MissHandler, MoveHandler,
    SlotHandler, StanceHandler,
};
pub use available::{available_actions, can_perform};
pub use effect::{
    ContestEffect, DamageEffect, DashEffect, DoorEffect, Effect, EffectTag, HealEffect,
    HelpEffect, HideEffect, ItemConsumedEffect, MissEffect, MoveEffect, SlotExpendedEffect,
    StandUpEffect,
};
pub use error::ActionError;
pub use kind::{Action, ActionKind, Intent};
pub use protocol::{
    AttackStage, Continuation, ItemStage, Maneuver, ParameterRequest, ParameterValue,
    PendingAction, SpellStage, Stage, drive,
};
pub use resolve::ResolvedAction;
