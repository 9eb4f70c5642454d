//! Publish/subscribe registry for battlefield events.
//!
//! Listeners are keyed by [`EventKind`]. Any component holding the battle may
//! publish; listeners see the world read-only and can ask the battle to admit
//! newly alerted entities through [`EventContext::alert`].

use std::collections::HashMap;
use std::fmt;

use crate::battle::{BattleState, Initiative};
use crate::state::{DamageType, DeathSaves, EntityId, Faction, Position, World};

/// Symbolic event names.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EventKind {
    Joined,
    Initiative,
    StartOfRound,
    EndOfRound,
    Attacked,
    Miss,
    Move,
    OpportunityAttack,
    Unconscious,
    Died,
    Stabilized,
    DeathSave,
    Heal,
    Dash,
    Disengage,
    Dodge,
    Help,
    Hide,
    Grapple,
    Escape,
    Shove,
    Prone,
    StandUp,
    ItemUsed,
    DoorToggled,
    BattleEnd,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BattleEvent {
    Joined {
        entity: EntityId,
        group: Faction,
    },
    Initiative {
        entity: EntityId,
        initiative: Initiative,
    },
    StartOfRound {
        entity: EntityId,
        round: u32,
    },
    EndOfRound {
        entity: EntityId,
        round: u32,
    },
    Attacked {
        source: EntityId,
        target: EntityId,
        origin: String,
        damage: i32,
        damage_type: DamageType,
        critical: bool,
        sneak_attack: bool,
        /// Total of the attack roll, absent for saving-throw damage.
        attack_roll: Option<i32>,
    },
    Miss {
        source: EntityId,
        target: EntityId,
        origin: String,
        attack_roll: Option<i32>,
    },
    Move {
        mover: EntityId,
        /// Anchors actually walked, starting cell included.
        path: Vec<Position>,
    },
    OpportunityAttack {
        attacker: EntityId,
        mover: EntityId,
    },
    Unconscious {
        entity: EntityId,
    },
    Died {
        entity: EntityId,
    },
    Stabilized {
        entity: EntityId,
    },
    DeathSave {
        entity: EntityId,
        roll: i32,
        saves: DeathSaves,
    },
    Heal {
        source: EntityId,
        target: EntityId,
        amount: i32,
    },
    Dash {
        entity: EntityId,
    },
    Disengage {
        entity: EntityId,
    },
    Dodge {
        entity: EntityId,
    },
    Help {
        source: EntityId,
        target: EntityId,
    },
    Hide {
        entity: EntityId,
        success: bool,
    },
    Grapple {
        source: EntityId,
        target: EntityId,
        success: bool,
    },
    Escape {
        entity: EntityId,
        grappler: EntityId,
        success: bool,
    },
    Shove {
        source: EntityId,
        target: EntityId,
        success: bool,
    },
    Prone {
        entity: EntityId,
    },
    StandUp {
        entity: EntityId,
    },
    ItemUsed {
        entity: EntityId,
        item: String,
    },
    DoorToggled {
        entity: EntityId,
        position: Position,
        open: bool,
    },
    BattleEnd {
        winner: Option<Faction>,
        round: u32,
    },
}

impl BattleEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Joined { .. } => EventKind::Joined,
            Self::Initiative { .. } => EventKind::Initiative,
            Self::StartOfRound { .. } => EventKind::StartOfRound,
            Self::EndOfRound { .. } => EventKind::EndOfRound,
            Self::Attacked { .. } => EventKind::Attacked,
            Self::Miss { .. } => EventKind::Miss,
            Self::Move { .. } => EventKind::Move,
            Self::OpportunityAttack { .. } => EventKind::OpportunityAttack,
            Self::Unconscious { .. } => EventKind::Unconscious,
            Self::Died { .. } => EventKind::Died,
            Self::Stabilized { .. } => EventKind::Stabilized,
            Self::DeathSave { .. } => EventKind::DeathSave,
            Self::Heal { .. } => EventKind::Heal,
            Self::Dash { .. } => EventKind::Dash,
            Self::Disengage { .. } => EventKind::Disengage,
            Self::Dodge { .. } => EventKind::Dodge,
            Self::Help { .. } => EventKind::Help,
            Self::Hide { .. } => EventKind::Hide,
            Self::Grapple { .. } => EventKind::Grapple,
            Self::Escape { .. } => EventKind::Escape,
            Self::Shove { .. } => EventKind::Shove,
            Self::Prone { .. } => EventKind::Prone,
            Self::StandUp { .. } => EventKind::StandUp,
            Self::ItemUsed { .. } => EventKind::ItemUsed,
            Self::DoorToggled { .. } => EventKind::DoorToggled,
            Self::BattleEnd { .. } => EventKind::BattleEnd,
        }
    }
}

/// What a listener may look at while handling an event.
pub struct EventContext<'a> {
    pub world: &'a World,
    pub battle: &'a BattleState,
    alerts: &'a mut Vec<EntityId>,
}

impl<'a> EventContext<'a> {
    pub(crate) fn new(
        world: &'a World,
        battle: &'a BattleState,
        alerts: &'a mut Vec<EntityId>,
    ) -> Self {
        Self {
            world,
            battle,
            alerts,
        }
    }

    /// Asks the battle to admit `entity` once the event has been delivered.
    pub fn alert(&mut self, entity: EntityId) {
        if !self.battle.is_member(entity) && !self.alerts.contains(&entity) {
            self.alerts.push(entity);
        }
    }
}

pub type Listener = Box<dyn FnMut(&BattleEvent, &mut EventContext<'_>)>;

/// Handle returned by a subscription, used to remove it again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub struct EventBus {
    listeners: HashMap<EventKind, Vec<(SubscriptionId, Listener)>>,
    wildcard: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        kind: EventKind,
        listener: impl FnMut(&BattleEvent, &mut EventContext<'_>) + 'static,
    ) -> SubscriptionId {
        let id = self.next_subscription();
        self.listeners
            .entry(kind)
            .or_default()
            .push((id, Box::new(listener)));
        id
    }

    /// Receives every event regardless of kind.
    pub fn subscribe_all(
        &mut self,
        listener: impl FnMut(&BattleEvent, &mut EventContext<'_>) + 'static,
    ) -> SubscriptionId {
        let id = self.next_subscription();
        self.wildcard.push((id, Box::new(listener)));
        id
    }

    /// Drops one listener. Returns false if `id` was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.total();
        for listeners in self.listeners.values_mut() {
            listeners.retain(|(held, _)| *held != id);
        }
        self.wildcard.retain(|(held, _)| *held != id);
        self.total() < before
    }

    fn next_subscription(&mut self) -> SubscriptionId {
        self.next_id += 1;
        SubscriptionId(self.next_id)
    }

    fn total(&self) -> usize {
        self.listeners.values().map(Vec::len).sum::<usize>() + self.wildcard.len()
    }

    /// Delivers to kind-specific listeners first, then wildcard ones.
    pub fn publish(&mut self, event: &BattleEvent, context: &mut EventContext<'_>) {
        tracing::trace!(target: "core::events", kind = %event.kind(), "publish");
        if let Some(listeners) = self.listeners.get_mut(&event.kind()) {
            for (_, listener) in listeners.iter_mut() {
                listener(event, context);
            }
        }
        for (_, listener) in self.wildcard.iter_mut() {
            listener(event, context);
        }
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.get(&kind).map_or(0, Vec::len) + self.wildcard.len()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<_> = self.listeners.keys().collect();
        f.debug_struct("EventBus")
            .field("kinds", &kinds)
            .field("wildcard", &self.wildcard.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::grid::Grid;

    #[test]
    fn listeners_only_hear_their_kind() {
        let world = World::new(Grid::new(2, 2));
        let state = BattleState::default();
        let mut alerts = Vec::new();
        let mut bus = EventBus::new();
        let heard = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&heard);
        bus.subscribe(EventKind::Dodge, move |event, _| {
            sink.borrow_mut().push(event.kind());
        });
        let sink = Rc::clone(&heard);
        bus.subscribe_all(move |event, _| sink.borrow_mut().push(event.kind()));

        let mut context = EventContext::new(&world, &state, &mut alerts);
        bus.publish(
            &BattleEvent::Dodge {
                entity: EntityId(1),
            },
            &mut context,
        );
        bus.publish(
            &BattleEvent::Dash {
                entity: EntityId(1),
            },
            &mut context,
        );

        assert_eq!(
            *heard.borrow(),
            vec![EventKind::Dodge, EventKind::Dodge, EventKind::Dash]
        );
        assert_eq!(bus.listener_count(EventKind::Dodge), 2);
        assert_eq!(bus.listener_count(EventKind::Miss), 1);
    }

    #[test]
    fn unsubscribed_listeners_stop_hearing() {
        let world = World::new(Grid::new(2, 2));
        let state = BattleState::default();
        let mut alerts = Vec::new();
        let mut bus = EventBus::new();
        let heard = Rc::new(RefCell::new(0));

        let sink = Rc::clone(&heard);
        let id = bus.subscribe(EventKind::Dodge, move |_, _| *sink.borrow_mut() += 1);
        let sink = Rc::clone(&heard);
        let wildcard = bus.subscribe_all(move |_, _| *sink.borrow_mut() += 10);
        assert_ne!(id, wildcard);

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        let mut context = EventContext::new(&world, &state, &mut alerts);
        bus.publish(
            &BattleEvent::Dodge {
                entity: EntityId(1),
            },
            &mut context,
        );

        assert_eq!(*heard.borrow(), 10);
        assert_eq!(bus.listener_count(EventKind::Dodge), 1);
    }

    #[test]
    fn alerts_are_collected_once() {
        let world = World::new(Grid::new(2, 2));
        let state = BattleState::default();
        let mut alerts = Vec::new();
        let mut bus = EventBus::new();
        bus.subscribe(EventKind::Move, |_, context| {
            context.alert(EntityId(7));
            context.alert(EntityId(7));
        });
        let mut context = EventContext::new(&world, &state, &mut alerts);
        bus.publish(
            &BattleEvent::Move {
                mover: EntityId(1),
                path: Vec::new(),
            },
            &mut context,
        );
        assert_eq!(alerts, vec![EntityId(7)]);
    }

    #[test]
    fn kinds_use_snake_case_names() {
        assert_eq!(EventKind::StartOfRound.to_string(), "start_of_round");
        assert_eq!(
            "opportunity_attack".parse::<EventKind>().unwrap(),
            EventKind::OpportunityAttack
        );
    }
}
