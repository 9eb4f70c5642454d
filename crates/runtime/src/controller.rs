//! Turn controllers: where each combatant's decisions come from.
//!
//! The runner asks the controller registered for an entity's kind to play
//! out that entity's turn. Human input, scripted fixtures and the AI all plug
//! in through [`TurnController`].

use std::collections::VecDeque;

use tactics_core::battle::{DefaultReactions, SubscriptionId};
use tactics_core::{Action, Battle, EntityId, GameConfig, Session, World};
use tracing::debug;

use crate::error::Result;

pub trait TurnController {
    /// Plays out `entity`'s turn. The runner opens and closes the turn.
    fn take_turn(
        &mut self,
        battle: &mut Battle,
        world: &mut World,
        session: &mut Session,
        entity: EntityId,
    ) -> Result<()>;

    /// Registers the reaction handler for an entity this controller drives.
    /// Called once per entity, including late joiners.
    fn install(&mut self, battle: &mut Battle, entity: EntityId) {
        battle.set_reaction_handler(entity, DefaultReactions);
    }

    /// Hooks battle-wide listeners and returns their handles so the runner
    /// can drop them when the wiring changes. Called once per battle, and
    /// again after resuming or after a controller is swapped.
    fn attach(&mut self, _battle: &mut Battle, _config: &GameConfig) -> Vec<SubscriptionId> {
        Vec::new()
    }
}

/// Ends every turn immediately.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdleController;

impl TurnController for IdleController {
    fn take_turn(
        &mut self,
        _battle: &mut Battle,
        _world: &mut World,
        _session: &mut Session,
        entity: EntityId,
    ) -> Result<()> {
        debug!(target: "runtime::controller", entity = %entity, "idle turn");
        Ok(())
    }
}

/// Replays a fixed list of actions. On each turn it performs the queued
/// actions belonging to the acting entity, in order, and stops at the first
/// one that belongs to someone else.
#[derive(Clone, Debug, Default)]
pub struct ScriptedController {
    queue: VecDeque<Action>,
}

impl ScriptedController {
    pub fn new(actions: impl IntoIterator<Item = Action>) -> Self {
        Self {
            queue: actions.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl TurnController for ScriptedController {
    fn take_turn(
        &mut self,
        battle: &mut Battle,
        world: &mut World,
        session: &mut Session,
        entity: EntityId,
    ) -> Result<()> {
        while self.queue.front().is_some_and(|action| action.source == entity) {
            let Some(action) = self.queue.pop_front() else {
                break;
            };
            battle.perform(world, session, &action)?;
            if battle.battle_ends(world) {
                break;
            }
        }
        Ok(())
    }
}
