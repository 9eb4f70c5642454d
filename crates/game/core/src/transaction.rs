//! Rollback log for world mutations.
//!
//! Every gameplay mutation goes through a [`Transaction`] setter, which first
//! records the attribute's previous value and then writes the new one.
//! Cascading applies (a reaction triggered mid-apply) record into a child
//! transaction nested in the parent, so rolling back the parent unwinds the
//! cascade too. Rollback walks entries in reverse.

use crate::error::{ErrorSeverity, GameError};
use crate::grid::GridError;
use crate::state::{DeathSaves, Entity, EntityId, Position, Statuses, World};

/// Previous value of one entity attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Snapshot {
    HitPoints(i32),
    Statuses(Statuses),
    /// Anchor before a move.
    Position(Position),
    DeathSaves(DeathSaves),
    GrappledBy(Option<EntityId>),
    ItemCount { item: String, count: u32 },
    SpellSlots(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Entry {
    Entity { entity: EntityId, previous: Snapshot },
    Door { position: Position, was_open: bool },
    Child(Transaction),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    #[error("entity {0} not found")]
    EntityMissing(EntityId),

    #[error("invalid transaction state for {entity}: {reason}")]
    InvalidState {
        entity: EntityId,
        reason: &'static str,
    },

    #[error("door at {0} could not be restored")]
    InvalidDoorState(Position),

    #[error(transparent)]
    Grid(#[from] GridError),
}

impl GameError for TransactionError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::EntityMissing(_) => ErrorSeverity::Validation,
            Self::InvalidState { .. } | Self::InvalidDoorState(_) => ErrorSeverity::Fatal,
            Self::Grid(e) => e.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::EntityMissing(_) => "TX_ENTITY_MISSING",
            Self::InvalidState { .. } => "TX_INVALID_STATE",
            Self::InvalidDoorState(_) => "TX_INVALID_DOOR_STATE",
            Self::Grid(e) => e.error_code(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transaction {
    entries: Vec<Entry>,
}

fn entity_mut(world: &mut World, id: EntityId) -> Result<&mut Entity, TransactionError> {
    world
        .entity_mut(id)
        .ok_or(TransactionError::EntityMissing(id))
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of recorded entries, counting nested children as one each.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Attaches a child transaction. Empty children are dropped.
    pub fn nest(&mut self, child: Transaction) {
        if !child.is_empty() {
            self.entries.push(Entry::Child(child));
        }
    }

    fn record(&mut self, entity: EntityId, previous: Snapshot) {
        self.entries.push(Entry::Entity { entity, previous });
    }

    pub fn set_hit_points(
        &mut self,
        world: &mut World,
        id: EntityId,
        hit_points: i32,
    ) -> Result<(), TransactionError> {
        let entity = entity_mut(world, id)?;
        let previous = entity.hit_points();
        entity.set_hit_points(hit_points);
        self.record(id, Snapshot::HitPoints(previous));
        Ok(())
    }

    pub fn set_statuses(
        &mut self,
        world: &mut World,
        id: EntityId,
        statuses: Statuses,
    ) -> Result<(), TransactionError> {
        let entity = entity_mut(world, id)?;
        let previous = entity.statuses();
        entity.set_statuses(statuses);
        self.record(id, Snapshot::Statuses(previous));
        Ok(())
    }

    pub fn insert_status(
        &mut self,
        world: &mut World,
        id: EntityId,
        status: Statuses,
    ) -> Result<(), TransactionError> {
        let current = entity_mut(world, id)?.statuses();
        self.set_statuses(world, id, current | status)
    }

    pub fn remove_status(
        &mut self,
        world: &mut World,
        id: EntityId,
        status: Statuses,
    ) -> Result<(), TransactionError> {
        let current = entity_mut(world, id)?.statuses();
        if !current.intersects(status) {
            return Ok(());
        }
        self.set_statuses(world, id, current - status)
    }

    /// Moves the entity's footprint; grid failures leave nothing recorded.
    pub fn move_entity(
        &mut self,
        world: &mut World,
        id: EntityId,
        anchor: Position,
    ) -> Result<(), TransactionError> {
        let previous = world.grid.move_entity(id, anchor)?;
        self.record(id, Snapshot::Position(previous.anchor));
        Ok(())
    }

    pub fn set_death_saves(
        &mut self,
        world: &mut World,
        id: EntityId,
        saves: DeathSaves,
    ) -> Result<(), TransactionError> {
        let entity = entity_mut(world, id)?;
        let previous = entity.death_saves();
        entity.set_death_saves(saves);
        self.record(id, Snapshot::DeathSaves(previous));
        Ok(())
    }

    pub fn set_grappled_by(
        &mut self,
        world: &mut World,
        id: EntityId,
        grappler: Option<EntityId>,
    ) -> Result<(), TransactionError> {
        let entity = entity_mut(world, id)?;
        let previous = entity.grappled_by();
        entity.set_grappled_by(grappler);
        self.record(id, Snapshot::GrappledBy(previous));
        Ok(())
    }

    /// Adds `delta` to an item stack, refusing to go below zero.
    pub fn adjust_item(
        &mut self,
        world: &mut World,
        id: EntityId,
        item: &str,
        delta: i32,
    ) -> Result<(), TransactionError> {
        let entity = entity_mut(world, id)?;
        let count = entity.inventory().count(item);
        let updated = count.checked_add_signed(delta).ok_or(TransactionError::InvalidState {
            entity: id,
            reason: "item count would drop below zero",
        })?;
        entity.set_item_count(item, updated);
        self.record(
            id,
            Snapshot::ItemCount {
                item: item.to_owned(),
                count,
            },
        );
        Ok(())
    }

    /// Spends one slot at `level` (1-based).
    pub fn expend_slot(
        &mut self,
        world: &mut World,
        id: EntityId,
        level: u8,
    ) -> Result<(), TransactionError> {
        let entity = entity_mut(world, id)?;
        let previous = entity.spell_slots().to_vec();
        let mut slots = previous.clone();
        let slot = usize::from(level)
            .checked_sub(1)
            .and_then(|index| slots.get_mut(index))
            .filter(|remaining| **remaining > 0)
            .ok_or(TransactionError::InvalidState {
                entity: id,
                reason: "no spell slot remaining at that level",
            })?;
        *slot -= 1;
        entity.set_spell_slots(slots);
        self.record(id, Snapshot::SpellSlots(previous));
        Ok(())
    }

    pub fn set_door(
        &mut self,
        world: &mut World,
        position: Position,
        open: bool,
    ) -> Result<(), TransactionError> {
        let was_open = world.grid.set_door(position, open)?;
        self.entries.push(Entry::Door { position, was_open });
        Ok(())
    }

    /// Restores every recorded value, newest first.
    pub fn rollback(self, world: &mut World) -> Result<(), TransactionError> {
        for entry in self.entries.into_iter().rev() {
            match entry {
                Entry::Child(child) => child.rollback(world)?,
                Entry::Door { position, was_open } => {
                    world
                        .grid
                        .set_door(position, was_open)
                        .map_err(|_| TransactionError::InvalidDoorState(position))?;
                }
                Entry::Entity { entity, previous } => restore(world, entity, previous)?,
            }
        }
        Ok(())
    }
}

fn restore(world: &mut World, id: EntityId, previous: Snapshot) -> Result<(), TransactionError> {
    if let Snapshot::Position(anchor) = previous {
        return world
            .grid
            .move_entity(id, anchor)
            .map(|_| ())
            .map_err(|_| TransactionError::InvalidState {
                entity: id,
                reason: "previous position is no longer placeable",
            });
    }
    let entity = entity_mut(world, id)?;
    match previous {
        Snapshot::HitPoints(hp) => entity.set_hit_points(hp),
        Snapshot::Statuses(statuses) => entity.set_statuses(statuses),
        Snapshot::DeathSaves(saves) => entity.set_death_saves(saves),
        Snapshot::GrappledBy(grappler) => entity.set_grappled_by(grappler),
        Snapshot::ItemCount { item, count } => entity.set_item_count(&item, count),
        Snapshot::SpellSlots(slots) => entity.set_spell_slots(slots),
        Snapshot::Position(_) => {
            return Err(TransactionError::InvalidState {
                entity: id,
                reason: "position snapshot reached attribute restore",
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::state::EntityKind;

    fn world() -> (World, EntityId) {
        let mut world = World::new(Grid::new(4, 4));
        let id = world
            .spawn(
                Entity::new("hero", EntityKind::Pc)
                    .with_hit_points(12)
                    .with_item("potion", 2),
                Position::ORIGIN,
            )
            .unwrap();
        (world, id)
    }

    #[test]
    fn rollback_restores_in_reverse_including_children() {
        let (mut world, id) = world();
        let before = world.clone();

        let mut tx = Transaction::new();
        tx.set_hit_points(&mut world, id, 5).unwrap();
        tx.insert_status(&mut world, id, Statuses::PRONE).unwrap();
        tx.move_entity(&mut world, id, Position::new(2, 2)).unwrap();

        let mut child = Transaction::new();
        child.set_hit_points(&mut world, id, 1).unwrap();
        child.adjust_item(&mut world, id, "potion", -1).unwrap();
        tx.nest(child);
        tx.set_hit_points(&mut world, id, 0).unwrap();

        assert_eq!(world.entity(id).unwrap().inventory().count("potion"), 1);
        tx.rollback(&mut world).unwrap();
        assert_eq!(world, before);
    }

    #[test]
    fn item_counts_never_go_negative() {
        let (mut world, id) = world();
        let mut tx = Transaction::new();
        let err = tx.adjust_item(&mut world, id, "potion", -3).unwrap_err();
        assert!(matches!(err, TransactionError::InvalidState { .. }));
        assert_eq!(err.severity(), ErrorSeverity::Fatal);
        assert!(tx.is_empty());
    }

    #[test]
    fn empty_children_are_not_nested() {
        let mut tx = Transaction::new();
        tx.nest(Transaction::new());
        assert!(tx.is_empty());
    }

    #[test]
    fn missing_entities_are_reported() {
        let (mut world, _) = world();
        let mut tx = Transaction::new();
        assert_eq!(
            tx.set_hit_points(&mut world, EntityId(42), 3),
            Err(TransactionError::EntityMissing(EntityId(42)))
        );
    }
}
