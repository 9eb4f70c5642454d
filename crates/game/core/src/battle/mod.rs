//! Battle engine: initiative, turn order, per-entity resource ledgers and
//! terminal detection.
//!
//! [`BattleState`] holds everything that must survive a checkpoint. [`Battle`]
//! wraps it with the runtime-only parts: the event bus and the reaction
//! handlers registered for each combatant.

mod error;
pub mod events;
mod ledger;
pub mod reaction;
pub mod targets;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::{debug, info};

pub use error::BattleError;
pub use events::{BattleEvent, EventBus, EventContext, EventKind, SubscriptionId};
pub use ledger::{BattleEntityState, Initiative, Resource, TargetEffect};
pub use reaction::{DefaultReactions, ReactionContext, ReactionHandler, ReactionTrigger};
pub use targets::{Relations, TargetQuery, are_hostile, valid_targets};

use crate::action::{Action, ActionError};
use crate::config::GameConfig;
use crate::content::ContentRepository;
use crate::dice::{DiceExpr, DiceRoller};
use crate::session::Session;
use crate::state::{DeathSaves, EntityId, EntityKind, Faction, Footprint, Position, Statuses, World};
use crate::transaction::Transaction;

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BattlePhase {
    #[default]
    NotStarted,
    Active,
    Ended,
}

/// Serializable battle progress.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BattleState {
    pub phase: BattlePhase,
    /// 1-based once started.
    pub round: u32,
    pub turn_index: usize,
    pub combat_order: Vec<EntityId>,
    pub ledgers: BTreeMap<EntityId, BattleEntityState>,
    /// Joined mid-round; admitted to the order on wraparound.
    pub pending: Vec<EntityId>,
    pub max_rounds: Option<u32>,
}

impl BattleState {
    pub fn ledger(&self, entity: EntityId) -> Option<&BattleEntityState> {
        self.ledgers.get(&entity)
    }

    pub fn ledger_mut(&mut self, entity: EntityId) -> Option<&mut BattleEntityState> {
        self.ledgers.get_mut(&entity)
    }

    pub fn is_member(&self, entity: EntityId) -> bool {
        self.ledgers.contains_key(&entity)
    }

    pub fn is_active(&self) -> bool {
        self.phase == BattlePhase::Active
    }

    /// Entity whose turn it is.
    pub fn current(&self) -> Option<EntityId> {
        if !self.is_active() {
            return None;
        }
        self.combat_order.get(self.turn_index).copied()
    }

    pub fn members(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.ledgers.keys().copied()
    }

    /// Groups with at least one conscious member.
    pub fn standing_groups(&self, world: &World) -> BTreeSet<Faction> {
        self.ledgers
            .iter()
            .filter(|(id, _)| world.entity(**id).is_some_and(|e| e.is_conscious()))
            .map(|(_, ledger)| ledger.group.clone())
            .collect()
    }

    fn sort_order(&mut self) {
        let ledgers = &self.ledgers;
        let initiative = |id: &EntityId| ledgers.get(id).map(|l| l.initiative).unwrap_or_default();
        self.combat_order
            .sort_by(|a, b| initiative(b).cmp(&initiative(a)).then(a.cmp(b)));
    }
}

pub struct Battle {
    state: BattleState,
    bus: EventBus,
    reactions: BTreeMap<EntityId, Box<dyn ReactionHandler>>,
}

impl Battle {
    pub fn new() -> Self {
        Self::from_state(BattleState::default())
    }

    pub fn with_max_rounds(mut self, max_rounds: Option<u32>) -> Self {
        self.state.max_rounds = max_rounds;
        self
    }

    /// Resumes from a checkpoint. Listeners and reaction handlers must be
    /// registered again.
    pub fn from_state(state: BattleState) -> Self {
        Self {
            state,
            bus: EventBus::new(),
            reactions: BTreeMap::new(),
        }
    }

    pub fn state(&self) -> &BattleState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut BattleState {
        &mut self.state
    }

    pub(crate) fn restore_state(&mut self, state: BattleState) {
        self.state = state;
    }

    pub fn subscribe(
        &mut self,
        kind: EventKind,
        listener: impl FnMut(&BattleEvent, &mut EventContext<'_>) + 'static,
    ) -> SubscriptionId {
        self.bus.subscribe(kind, listener)
    }

    pub fn subscribe_all(
        &mut self,
        listener: impl FnMut(&BattleEvent, &mut EventContext<'_>) + 'static,
    ) -> SubscriptionId {
        self.bus.subscribe_all(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.bus.listener_count(kind)
    }

    pub fn set_reaction_handler(
        &mut self,
        entity: EntityId,
        handler: impl ReactionHandler + 'static,
    ) {
        self.reactions.insert(entity, Box::new(handler));
    }

    // ===== membership =====

    /// Adds `entity` under its own faction.
    pub fn add(&mut self, world: &World, entity: EntityId) -> Result<(), BattleError> {
        let group = world
            .entity(entity)
            .ok_or(BattleError::UnknownEntity(entity))?
            .faction
            .clone();
        self.add_with_group(world, entity, group)
    }

    /// Adds `entity` to the battle under `group`. Before the battle starts it
    /// goes straight into the order; afterwards it waits for the next round.
    pub fn add_with_group(
        &mut self,
        world: &World,
        entity: EntityId,
        group: Faction,
    ) -> Result<(), BattleError> {
        if !world.entities.contains(entity) {
            return Err(BattleError::UnknownEntity(entity));
        }
        if self.state.is_member(entity) {
            return Ok(());
        }
        self.state.ledgers.insert(
            entity,
            BattleEntityState::new(group.clone(), Initiative::default()),
        );
        match self.state.phase {
            BattlePhase::NotStarted => self.state.combat_order.push(entity),
            _ => self.state.pending.push(entity),
        }
        info!(target: "core::battle", entity = %entity, group = %group, "joined battle");
        self.publish(world, BattleEvent::Joined { entity, group });
        Ok(())
    }

    // ===== lifecycle =====

    /// Rolls initiative for everyone and opens round 1.
    pub fn start(&mut self, world: &World, session: &mut Session) -> Result<(), BattleError> {
        self.expect_phase(BattlePhase::NotStarted)?;
        if self.state.combat_order.is_empty() {
            return Err(BattleError::NoCombatants);
        }
        let entrants = self.state.combat_order.clone();
        for entity in entrants {
            self.roll_initiative(world, session.dice(), entity)?;
        }
        self.state.sort_order();
        for &entity in &self.state.combat_order {
            let speed = world.entity(entity).map_or(0, |e| e.speed_ft);
            if let Some(ledger) = self.state.ledgers.get_mut(&entity) {
                ledger.reset(speed);
            }
        }
        self.state.phase = BattlePhase::Active;
        self.state.round = 1;
        self.state.turn_index = 0;
        info!(
            target: "core::battle",
            combatants = self.state.combat_order.len(),
            "battle started"
        );
        Ok(())
    }

    fn roll_initiative(
        &mut self,
        world: &World,
        dice: &mut dyn DiceRoller,
        entity: EntityId,
    ) -> Result<(), BattleError> {
        let e = world
            .entity(entity)
            .ok_or(BattleError::UnknownEntity(entity))?;
        let roll = DiceExpr::d20(e.initiative_modifier()).roll(dice);
        let initiative = Initiative::new(roll.result(), e.abilities.dexterity);
        if let Some(ledger) = self.state.ledgers.get_mut(&entity) {
            ledger.initiative = initiative;
        }
        debug!(target: "core::battle", entity = %entity, total = initiative.total, "initiative");
        self.publish(world, BattleEvent::Initiative { entity, initiative });
        Ok(())
    }

    fn expect_phase(&self, expected: BattlePhase) -> Result<(), BattleError> {
        if self.state.phase == expected {
            Ok(())
        } else {
            Err(BattleError::WrongPhase {
                expected,
                actual: self.state.phase,
            })
        }
    }

    /// Opens the current entity's turn: expires its help grants and
    /// turn-scoped statuses, refills its ledger and rolls a death save when
    /// it is dying.
    pub fn begin_turn(
        &mut self,
        world: &mut World,
        session: &mut Session,
    ) -> Result<EntityId, BattleError> {
        self.expect_phase(BattlePhase::Active)?;
        let entity = self.state.current().ok_or(BattleError::NoCombatants)?;
        let round = self.state.round;
        self.publish(world, BattleEvent::StartOfRound { entity, round });

        for ledger in self.state.ledgers.values_mut() {
            ledger.target_effects.remove(&entity);
        }

        let e = world
            .entity_mut(entity)
            .ok_or(BattleError::UnknownEntity(entity))?;
        e.set_statuses(e.statuses() - Statuses::TURN_SCOPED);
        let movement = if e.has_status(Statuses::GRAPPLED) {
            0
        } else {
            e.speed_ft
        };
        if let Some(ledger) = self.state.ledgers.get_mut(&entity) {
            ledger.reset(movement);
        }

        let dying = e.kind == EntityKind::Pc
            && e.is_unconscious()
            && !e.is_dead()
            && !e.has_status(Statuses::STABLE);
        if dying {
            self.death_save(world, session.dice(), entity)?;
        }
        debug!(target: "core::battle", entity = %entity, round, "turn begins");
        Ok(entity)
    }

    fn death_save(
        &mut self,
        world: &mut World,
        dice: &mut dyn DiceRoller,
        entity: EntityId,
    ) -> Result<(), BattleError> {
        let roll = DiceExpr::d20(0).roll(dice);
        let e = world
            .entity_mut(entity)
            .ok_or(BattleError::UnknownEntity(entity))?;
        let mut saves = e.death_saves();
        let mut follow_up = None;

        if roll.is_natural_20() {
            e.set_hit_points(1);
            e.set_statuses(e.statuses() - (Statuses::UNCONSCIOUS | Statuses::STABLE));
            saves = DeathSaves::default();
        } else {
            if roll.is_natural_1() {
                saves.failures += 2;
            } else if roll.result() >= 10 {
                saves.successes += 1;
            } else {
                saves.failures += 1;
            }
            if saves.is_dead() {
                e.set_statuses((e.statuses() | Statuses::DEAD) - Statuses::STABLE);
                follow_up = Some(BattleEvent::Died { entity });
            } else if saves.is_stable() {
                e.set_statuses(e.statuses() | Statuses::STABLE);
                follow_up = Some(BattleEvent::Stabilized { entity });
            }
        }
        e.set_death_saves(saves);
        info!(
            target: "core::battle",
            entity = %entity,
            roll = roll.result(),
            successes = saves.successes,
            failures = saves.failures,
            "death save"
        );
        self.publish(
            world,
            BattleEvent::DeathSave {
                entity,
                roll: roll.result(),
                saves,
            },
        );
        if let Some(event) = follow_up {
            self.publish(world, event);
        }
        Ok(())
    }

    /// Closes the current turn and advances the pointer. On wraparound the
    /// round counter grows and pending entrants roll initiative and join the
    /// order. Returns `true` once the battle has ended.
    pub fn end_turn(&mut self, world: &World, session: &mut Session) -> Result<bool, BattleError> {
        self.expect_phase(BattlePhase::Active)?;
        let entity = self.state.current().ok_or(BattleError::NoCombatants)?;
        let round = self.state.round;
        self.publish(world, BattleEvent::EndOfRound { entity, round });

        self.state.turn_index += 1;
        if self.state.turn_index >= self.state.combat_order.len() {
            self.state.turn_index = 0;
            self.state.round += 1;
            let pending = std::mem::take(&mut self.state.pending);
            for entrant in pending {
                self.roll_initiative(world, session.dice(), entrant)?;
                self.state.combat_order.push(entrant);
            }
            self.state.sort_order();
        }

        if self.battle_ends(world) {
            self.state.phase = BattlePhase::Ended;
            let winner = self.winner(world);
            info!(
                target: "core::battle",
                round = self.state.round,
                winner = winner.as_ref().map(Faction::as_str).unwrap_or("none"),
                "battle ended"
            );
            self.publish(
                world,
                BattleEvent::BattleEnd {
                    winner,
                    round: self.state.round,
                },
            );
            return Ok(true);
        }
        Ok(false)
    }

    /// Runs one full turn. `act` is skipped for entities that cannot act.
    pub fn run_turn<F>(
        &mut self,
        world: &mut World,
        session: &mut Session,
        act: F,
    ) -> Result<bool, BattleError>
    where
        F: FnOnce(&mut Battle, &mut World, &mut Session, EntityId) -> Result<(), BattleError>,
    {
        let entity = self.begin_turn(world, session)?;
        if world.entity(entity).is_some_and(|e| e.is_conscious()) {
            act(self, world, session, entity)?;
        }
        self.end_turn(world, session)
    }

    /// At most one group still has conscious members, or the round cap passed.
    pub fn battle_ends(&self, world: &World) -> bool {
        self.state.standing_groups(world).len() <= 1
            || self
                .state
                .max_rounds
                .is_some_and(|max| self.state.round > max)
    }

    fn winner(&self, world: &World) -> Option<Faction> {
        let groups = self.state.standing_groups(world);
        if groups.len() == 1 {
            groups.into_iter().next()
        } else {
            None
        }
    }

    // ===== events and reactions =====

    /// Delivers `event` and admits any entity a listener alerted.
    pub fn publish(&mut self, world: &World, event: BattleEvent) {
        let mut alerts = Vec::new();
        {
            let mut context = EventContext::new(world, &self.state, &mut alerts);
            self.bus.publish(&event, &mut context);
        }
        for entity in alerts {
            if let Err(err) = self.add(world, entity) {
                debug!(target: "core::battle", entity = %entity, error = %err, "alert ignored");
            }
        }
    }

    /// Offers `trigger` to `entity`'s reaction handler. The entity must be a
    /// conscious member with its reaction unspent.
    pub fn request_reaction(
        &mut self,
        world: &World,
        content: &ContentRepository,
        entity: EntityId,
        trigger: ReactionTrigger,
    ) -> Option<Action> {
        let ready = self
            .state
            .ledger(entity)
            .is_some_and(|l| l.has(Resource::Reaction))
            && world.entity(entity).is_some_and(|e| e.is_conscious());
        if !ready {
            return None;
        }
        let handler = self.reactions.get_mut(&entity)?;
        let context = ReactionContext {
            entity,
            trigger,
            world,
            battle: &self.state,
            content,
        };
        let action = handler.react(&context)?;
        debug!(target: "core::battle", entity = %entity, ?trigger, "reaction taken");
        Some(action.as_reaction())
    }

    /// Hostile members whose reach covers the mover at `from` but not at `to`.
    ///
    /// Disengaged movers provoke nothing.
    pub fn opportunity_attackers(
        &self,
        world: &World,
        content: &ContentRepository,
        mover: EntityId,
        from: Position,
        to: Position,
    ) -> Vec<EntityId> {
        let Some(moving) = world.entity(mover) else {
            return Vec::new();
        };
        if moving.has_status(Statuses::DISENGAGED) {
            return Vec::new();
        }
        let size = moving.token_size();
        let (before, after) = (Footprint::new(from, size), Footprint::new(to, size));

        self.state
            .ledgers
            .iter()
            .filter(|(id, ledger)| {
                **id != mover
                    && ledger.has(Resource::Reaction)
                    && targets::are_hostile(world, Some(&self.state), **id, mover)
            })
            .filter_map(|(&id, _)| {
                let attacker = world.entity(id).filter(|e| e.is_conscious())?;
                let reach = reaction::melee_reach_ft(attacker, content)?;
                let at = world.footprint(id)?;
                let feet = |f: Footprint| at.distance(f) * GameConfig::FEET_PER_SQUARE;
                let leaves = feet(before) <= reach && feet(after) > reach;
                (leaves && world.can_see(id, mover, None)).then_some(id)
            })
            .collect()
    }

    pub fn valid_targets(&self, world: &World, source: EntityId, query: &TargetQuery) -> Vec<EntityId> {
        targets::valid_targets(world, Some(&self.state), source, query)
    }

    /// Resolves and applies `action` in one step.
    pub fn perform(
        &mut self,
        world: &mut World,
        session: &mut Session,
        action: &Action,
    ) -> Result<Transaction, ActionError> {
        let resolved = action.resolve(world, Some(&self.state), session)?;
        resolved.apply(world, Some(self), session)
    }
}

impl Default for Battle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Battle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers: Vec<_> = self.reactions.keys().collect();
        f.debug_struct("Battle")
            .field("state", &self.state)
            .field("bus", &self.bus)
            .field("reactions", &handlers)
            .finish()
    }
}
