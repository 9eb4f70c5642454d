use std::collections::BTreeMap;

use crate::state::{Entity, EntityId};

/// All combatants, keyed by id and iterated in id order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entities {
    entities: BTreeMap<EntityId, Entity>,
    next_id: u32,
}

impl Entities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a fresh id to `entity` and stores it.
    pub fn insert(&mut self, mut entity: Entity) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        entity.id = id;
        self.entities.insert(id, entity);
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    /// Entities that are neither dead nor unconscious.
    pub fn conscious(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values().filter(|e| e.is_conscious())
    }

    /// Different factions are hostile; unknown ids are not.
    pub fn factions_hostile(&self, a: EntityId, b: EntityId) -> bool {
        match (self.get(a), self.get(b)) {
            (Some(a), Some(b)) => a.faction != b.faction,
            _ => false,
        }
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Entity> {
        self.entities.values().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
