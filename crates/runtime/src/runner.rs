//! Battle orchestration.
//!
//! [`BattleRunner`] owns one fight: the world, the battle, the session and
//! the controllers. Each [`step`](BattleRunner::step) opens a turn, lets the
//! controller for the acting entity's kind play it, closes it and optionally
//! saves a checkpoint.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use tactics_core::battle::SubscriptionId;
use tactics_core::{
    Battle, BattleEvent, BattlePhase, EntityId, EntityKind, Faction, Session, World,
};
use tracing::{debug, info};

use crate::controller::TurnController;
use crate::error::{ControllerKind, Result, RuntimeError};
use crate::repository::{BattleCheckpoint, CheckpointId, CheckpointRepository};

/// Outcome of a finished (or abandoned) run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BattleSummary {
    pub winner: Option<Faction>,
    pub rounds: u32,
    pub turns: u32,
    /// Conscious combatants at the end, with their hit points.
    pub survivors: Vec<(EntityId, String, i32)>,
}

pub struct BattleRunner {
    world: World,
    battle: Battle,
    session: Session,
    player: Option<Box<dyn TurnController>>,
    npc: Option<Box<dyn TurnController>>,
    checkpoints: Option<Box<dyn CheckpointRepository>>,
    installed: BTreeSet<EntityId>,
    /// Listeners the current controllers hooked; `None` until wired.
    attached: Option<Vec<SubscriptionId>>,
    events: Rc<RefCell<Vec<BattleEvent>>>,
    turns: u32,
}

impl BattleRunner {
    /// A fresh battle over `world`. The round cap comes from the session's
    /// config.
    pub fn new(world: World, session: Session) -> Self {
        let battle = Battle::new().with_max_rounds(session.config().max_rounds);
        Self::with_battle(world, battle, session)
    }

    /// Picks a battle up where `checkpoint` left it. Controllers have to be
    /// set again; their listeners and reaction handlers are reinstalled on
    /// the next step.
    pub fn resume(checkpoint: BattleCheckpoint, session: Session) -> Self {
        let BattleCheckpoint { world, battle } = checkpoint;
        info!(
            target: "runtime::runner",
            round = battle.round,
            turn = battle.turn_index,
            "resuming battle"
        );
        Self::with_battle(world, Battle::from_state(battle), session)
    }

    fn with_battle(world: World, mut battle: Battle, session: Session) -> Self {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        battle.subscribe_all(move |event, _| {
            debug!(target: "runtime::events", kind = %event.kind(), "event");
            sink.borrow_mut().push(event.clone());
        });
        Self {
            world,
            battle,
            session,
            player: None,
            npc: None,
            checkpoints: None,
            installed: BTreeSet::new(),
            attached: None,
            events,
            turns: 0,
        }
    }

    pub fn set_player_controller(&mut self, controller: impl TurnController + 'static) {
        self.player = Some(Box::new(controller));
        self.reset_wiring();
    }

    pub fn set_npc_controller(&mut self, controller: impl TurnController + 'static) {
        self.npc = Some(Box::new(controller));
        self.reset_wiring();
    }

    /// Saves a checkpoint after every completed turn.
    pub fn with_checkpoints(mut self, repository: impl CheckpointRepository + 'static) -> Self {
        self.checkpoints = Some(Box::new(repository));
        self
    }

    /// Drops the listeners hooked by the previous controllers so the next
    /// step attaches the current ones exactly once.
    fn reset_wiring(&mut self) {
        self.installed.clear();
        for id in self.attached.take().unwrap_or_default() {
            self.battle.unsubscribe(id);
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn battle(&self) -> &Battle {
        &self.battle
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Every event published so far, in order.
    pub fn events(&self) -> Vec<BattleEvent> {
        self.events.borrow().clone()
    }

    pub fn is_over(&self) -> bool {
        self.battle.state().phase == BattlePhase::Ended
    }

    /// Enlists `entity` under its own faction. Only valid before [`start`](Self::start).
    pub fn add_combatant(&mut self, entity: EntityId) -> Result<()> {
        self.battle.add(&self.world, entity)?;
        Ok(())
    }

    /// Rolls initiative and opens round 1.
    pub fn start(&mut self) -> Result<()> {
        self.wire()?;
        self.battle.start(&self.world, &mut self.session)?;
        Ok(())
    }

    /// Plays one turn. Returns `true` once the battle has ended.
    pub fn step(&mut self) -> Result<bool> {
        self.wire()?;
        let entity = self.battle.begin_turn(&mut self.world, &mut self.session)?;
        let acting = self
            .world
            .entity(entity)
            .filter(|e| e.is_conscious())
            .map(|e| e.kind);

        if let Some(kind) = acting {
            let controller = match kind {
                EntityKind::Pc => self.player.as_deref_mut(),
                EntityKind::Npc => self.npc.as_deref_mut(),
            }
            .ok_or(RuntimeError::ControllerNotSet {
                kind: controller_kind(kind),
            })?;
            controller.take_turn(&mut self.battle, &mut self.world, &mut self.session, entity)?;
        } else {
            debug!(target: "runtime::runner", entity = %entity, "skipping downed combatant");
        }

        let ended = self.battle.end_turn(&self.world, &mut self.session)?;
        self.turns += 1;
        if let Some(repository) = &self.checkpoints {
            repository.save(&self.checkpoint())?;
        }
        Ok(ended)
    }

    /// Steps until the battle ends or `max_turns` turns have been played.
    pub fn run(&mut self, max_turns: Option<u32>) -> Result<BattleSummary> {
        if self.battle.state().phase == BattlePhase::NotStarted {
            self.start()?;
        }
        let mut played = 0;
        while !self.is_over() && max_turns.is_none_or(|max| played < max) {
            self.step()?;
            played += 1;
        }
        let summary = self.summary();
        info!(
            target: "runtime::runner",
            winner = summary.winner.as_ref().map(Faction::as_str).unwrap_or("none"),
            rounds = summary.rounds,
            turns = summary.turns,
            "run finished"
        );
        Ok(summary)
    }

    pub fn summary(&self) -> BattleSummary {
        let winner = self
            .events
            .borrow()
            .iter()
            .rev()
            .find_map(|event| match event {
                BattleEvent::BattleEnd { winner, .. } => Some(winner.clone()),
                _ => None,
            })
            .flatten();
        let survivors = self
            .battle
            .state()
            .members()
            .filter_map(|id| {
                let entity = self.world.entity(id)?;
                entity
                    .is_conscious()
                    .then(|| (id, entity.name.clone(), entity.hit_points()))
            })
            .collect();
        BattleSummary {
            winner,
            rounds: self.battle.state().round,
            turns: self.turns,
            survivors,
        }
    }

    pub fn checkpoint(&self) -> BattleCheckpoint {
        BattleCheckpoint::new(self.world.clone(), self.battle.state().clone())
    }

    /// Saves the current state to the configured repository, if any.
    pub fn save_checkpoint(&self) -> Result<Option<CheckpointId>> {
        match &self.checkpoints {
            Some(repository) => Ok(Some(repository.save(&self.checkpoint())?)),
            None => Ok(None),
        }
    }

    /// Attaches controller listeners once and installs reaction handlers for
    /// members that do not have one yet.
    fn wire(&mut self) -> Result<()> {
        if self.attached.is_none() {
            let config = self.session.config().clone();
            let mut hooked = Vec::new();
            for controller in [self.player.as_deref_mut(), self.npc.as_deref_mut()]
                .into_iter()
                .flatten()
            {
                hooked.extend(controller.attach(&mut self.battle, &config));
            }
            debug!(target: "runtime::runner", listeners = hooked.len(), "controllers attached");
            self.attached = Some(hooked);
        }

        let fresh: Vec<EntityId> = self
            .battle
            .state()
            .members()
            .filter(|id| !self.installed.contains(id))
            .collect();
        for entity in fresh {
            let Some(kind) = self.world.entity(entity).map(|e| e.kind) else {
                return Err(RuntimeError::Battle(tactics_core::BattleError::UnknownEntity(
                    entity,
                )));
            };
            let controller = match kind {
                EntityKind::Pc => self.player.as_deref_mut(),
                EntityKind::Npc => self.npc.as_deref_mut(),
            };
            if let Some(controller) = controller {
                controller.install(&mut self.battle, entity);
                self.installed.insert(entity);
            }
        }
        Ok(())
    }
}

fn controller_kind(kind: EntityKind) -> ControllerKind {
    match kind {
        EntityKind::Pc => ControllerKind::Player,
        EntityKind::Npc => ControllerKind::Npc,
    }
}
