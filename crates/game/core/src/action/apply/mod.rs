//! Application: the only phase that mutates the world.
//!
//! Each [`Effect`] is routed to the [`EffectHandler`] registered for its tag.
//! Handlers write through the [`Transaction`] carried by [`ApplyContext`], so a
//! failing handler leaves the world exactly as it found it.

mod bookkeeping;
mod damage;
mod handlers;
mod movement;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::action::{Action, ActionError, Effect, EffectTag, ResolvedAction};
use crate::battle::{Battle, BattleEntityState, BattleEvent, BattleState};
use crate::config::GameConfig;
use crate::session::Session;
use crate::state::{EntityId, World};
use crate::transaction::Transaction;

pub use damage::DamageHandler;
pub use handlers::{
    ContestHandler, DoorHandler, HealHandler, HelpHandler, HideHandler, InventoryHandler,
    MissHandler, SlotHandler, StanceHandler,
};
pub use movement::MoveHandler;

/// Mutates the world for one family of effects.
pub trait EffectHandler: Send + Sync {
    /// Tags this handler is registered under.
    fn handles(&self) -> &'static [EffectTag];

    fn apply(&self, effect: &Effect, ctx: &mut ApplyContext<'_>) -> Result<(), ActionError>;
}

/// Tag-keyed handler table. Registering a tag twice replaces the earlier handler.
#[derive(Clone, Default)]
pub struct EffectRegistry {
    handlers: BTreeMap<EffectTag, Arc<dyn EffectHandler>>,
}

impl EffectRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Handlers for every built-in effect.
    pub fn standard() -> Self {
        Self::empty()
            .register(DamageHandler)
            .register(MoveHandler)
            .register(MissHandler)
            .register(StanceHandler)
            .register(HelpHandler)
            .register(HideHandler)
            .register(ContestHandler)
            .register(HealHandler)
            .register(InventoryHandler)
            .register(SlotHandler)
            .register(DoorHandler)
    }

    pub fn register(mut self, handler: impl EffectHandler + 'static) -> Self {
        let handler: Arc<dyn EffectHandler> = Arc::new(handler);
        for tag in handler.handles() {
            self.handlers.insert(*tag, Arc::clone(&handler));
        }
        self
    }

    pub fn handler(&self, tag: EffectTag) -> Option<&dyn EffectHandler> {
        self.handlers.get(&tag).map(|handler| handler.as_ref())
    }

    pub fn tags(&self) -> impl Iterator<Item = EffectTag> + '_ {
        self.handlers.keys().copied()
    }
}

impl fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

/// Everything a handler may touch while applying one resolved action.
pub struct ApplyContext<'a> {
    pub world: &'a mut World,
    pub battle: Option<&'a mut Battle>,
    pub session: &'a mut Session,
    pub tx: &'a mut Transaction,
    depth: u8,
}

impl<'a> ApplyContext<'a> {
    pub fn new(
        world: &'a mut World,
        battle: Option<&'a mut Battle>,
        session: &'a mut Session,
        tx: &'a mut Transaction,
    ) -> Self {
        Self {
            world,
            battle,
            session,
            tx,
            depth: 0,
        }
    }

    /// Nesting level of reaction cascades; 0 for the top-level action.
    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn battle_state(&self) -> Option<&BattleState> {
        self.battle.as_deref().map(Battle::state)
    }

    /// Ledger of `entity` while a battle is running.
    pub fn ledger_mut(&mut self, entity: EntityId) -> Option<&mut BattleEntityState> {
        self.battle
            .as_deref_mut()
            .map(Battle::state_mut)
            .filter(|state| state.is_active())
            .and_then(|state| state.ledger_mut(entity))
    }

    /// Publishes to the battle's bus. Outside a battle events go nowhere.
    pub fn publish(&mut self, event: BattleEvent) {
        if let Some(battle) = self.battle.as_deref_mut() {
            battle.publish(self.world, event);
        }
    }

    /// Applies every effect in order, then settles resource bookkeeping.
    pub fn run(&mut self, resolved: &ResolvedAction) -> Result<(), ActionError> {
        let registry = self.session.effects();
        for effect in &resolved.effects {
            let tag = effect.tag();
            let handler = registry
                .handler(tag)
                .ok_or(ActionError::UnhandledEffect(tag))?;
            handler.apply(effect, self)?;
        }
        bookkeeping::settle(self, resolved)
    }

    /// Resolves and applies a reaction inside a child transaction.
    ///
    /// A reaction that no longer resolves is dropped; a reaction that fails to
    /// apply fails the triggering action as well.
    pub fn cascade(&mut self, action: &Action) -> Result<(), ActionError> {
        if self.depth >= GameConfig::MAX_REACTION_DEPTH {
            warn!(
                target: "core::apply",
                source = %action.source,
                depth = self.depth,
                "reaction chain too deep, skipped"
            );
            return Ok(());
        }
        let battle = self.battle.as_deref().map(Battle::state);
        let resolved = match action.resolve(self.world, battle, self.session) {
            Ok(resolved) => resolved,
            Err(err) => {
                debug!(
                    target: "core::apply",
                    source = %action.source,
                    error = %err,
                    "reaction rejected"
                );
                return Ok(());
            }
        };

        let mut child = Transaction::new();
        let result = ApplyContext {
            world: &mut *self.world,
            battle: self.battle.as_deref_mut(),
            session: &mut *self.session,
            tx: &mut child,
            depth: self.depth + 1,
        }
        .run(&resolved);
        self.tx.nest(child);
        result
    }
}

impl ResolvedAction {
    /// Mutates the world. Consumes the resolution so it is applied at most once.
    ///
    /// On failure every recorded change is rolled back and the battle state is
    /// restored before the error is returned.
    pub fn apply(
        self,
        world: &mut World,
        mut battle: Option<&mut Battle>,
        session: &mut Session,
    ) -> Result<Transaction, ActionError> {
        let saved = battle.as_deref().map(|b| b.state().clone());
        let mut tx = Transaction::new();
        let result = ApplyContext::new(world, battle.as_deref_mut(), session, &mut tx).run(&self);

        match result {
            Ok(()) => {
                debug!(
                    target: "core::apply",
                    source = %self.action.source,
                    kind = %self.action.kind(),
                    changes = tx.len(),
                    "applied"
                );
                Ok(tx)
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback(world) {
                    error!(target: "core::apply", error = %rollback, "rollback failed");
                }
                if let (Some(battle), Some(state)) = (battle, saved) {
                    battle.restore_state(state);
                }
                warn!(
                    target: "core::apply",
                    source = %self.action.source,
                    error = %err,
                    "apply failed, rolled back"
                );
                Err(err)
            }
        }
    }
}
