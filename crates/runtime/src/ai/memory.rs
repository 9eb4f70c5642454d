use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use tactics_core::{EntityId, Position};

/// Memory shared between the movement listener and the controller that
/// reads it. Single-threaded: battles never run across threads.
pub type SharedMemory = Rc<RefCell<AiMemory>>;

/// Last-known enemy positions, per observer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AiMemory {
    sightings: BTreeMap<EntityId, BTreeMap<EntityId, Position>>,
}

impl AiMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedMemory {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn record(&mut self, observer: EntityId, enemy: EntityId, position: Position) {
        self.sightings
            .entry(observer)
            .or_default()
            .insert(enemy, position);
    }

    pub fn forget(&mut self, observer: EntityId, enemy: EntityId) {
        if let Some(known) = self.sightings.get_mut(&observer) {
            known.remove(&enemy);
        }
    }

    pub fn last_seen(&self, observer: EntityId, enemy: EntityId) -> Option<Position> {
        self.sightings.get(&observer)?.get(&enemy).copied()
    }

    /// Every enemy `observer` remembers, in id order.
    pub fn known(&self, observer: EntityId) -> Vec<(EntityId, Position)> {
        self.sightings
            .get(&observer)
            .map(|known| known.iter().map(|(&id, &at)| (id, at)).collect())
            .unwrap_or_default()
    }

    pub fn knows_any(&self, observer: EntityId) -> bool {
        self.sightings
            .get(&observer)
            .is_some_and(|known| !known.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sightings_are_kept_per_observer() {
        let mut memory = AiMemory::new();
        let (a, b, enemy) = (EntityId(1), EntityId(2), EntityId(9));
        memory.record(a, enemy, Position::new(3, 3));
        memory.record(a, enemy, Position::new(4, 3));

        assert_eq!(memory.last_seen(a, enemy), Some(Position::new(4, 3)));
        assert_eq!(memory.last_seen(b, enemy), None);
        assert!(!memory.knows_any(b));

        memory.forget(a, enemy);
        assert!(memory.known(a).is_empty());
    }
}
