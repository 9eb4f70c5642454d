//! Movement legality and cost.

use crate::config::GameConfig;
use crate::grid::Grid;
use crate::state::{Entities, EntityId, Footprint, Position};

/// Answers whether two entities are on opposing sides of a fight.
///
/// Supplied while a battle is running so hostile creatures block movement.
pub trait Allegiance {
    fn is_hostile(&self, entities: &Entities, a: EntityId, b: EntityId) -> bool;
}

impl Grid {
    fn mover_footprint(&self, entities: &Entities, mover: EntityId, anchor: Position) -> Footprint {
        let size = entities.get(mover).map(|e| e.token_size()).unwrap_or(1);
        Footprint::new(anchor, size)
    }

    /// True if `mover` may pass through a footprint anchored at `anchor`.
    ///
    /// Walls and impassable objects always block. With an allegiance supplied,
    /// living hostile creatures of comparable size block as well.
    pub fn is_passable(
        &self,
        entities: &Entities,
        mover: EntityId,
        anchor: Position,
        allegiance: Option<&dyn Allegiance>,
    ) -> bool {
        let mover_size = entities.get(mover).map(|e| e.size);
        self.mover_footprint(entities, mover, anchor).cells().all(|position| {
            let Some(cell) = self.cell(position) else {
                return false;
            };
            if self.is_wall(position) || cell.object.as_ref().is_some_and(|o| o.blocks_movement()) {
                return false;
            }
            let Some(allegiance) = allegiance else {
                return true;
            };
            !cell.occupants.iter().any(|&other| {
                other != mover
                    && allegiance.is_hostile(entities, mover, other)
                    && entities.get(other).is_some_and(|o| {
                        !o.is_dead() && mover_size.is_none_or(|size| size.is_comparable(o.size))
                    })
            })
        })
    }

    /// Passable, and no living creature other than `mover` would share a cell.
    pub fn is_placeable(
        &self,
        entities: &Entities,
        mover: EntityId,
        anchor: Position,
        allegiance: Option<&dyn Allegiance>,
    ) -> bool {
        self.is_passable(entities, mover, anchor, allegiance)
            && self
                .mover_footprint(entities, mover, anchor)
                .cells()
                .all(|position| !self.has_living_occupant(entities, position, mover))
    }

    fn has_living_occupant(&self, entities: &Entities, position: Position, except: EntityId) -> bool {
        self.occupants(position)
            .iter()
            .any(|&o| o != except && entities.get(o).is_some_and(|e| !e.is_dead()))
    }

    /// Steps charged for entering `anchor`: 2 when squeezing past another
    /// living creature, otherwise 1.
    pub fn step_cost(&self, entities: &Entities, mover: EntityId, anchor: Position) -> u32 {
        let crowded = self
            .mover_footprint(entities, mover, anchor)
            .cells()
            .any(|position| self.has_living_occupant(entities, position, mover));
        if crowded { 2 } else { 1 }
    }

    /// Total feet needed to walk `path`; the first element is the start cell.
    pub fn movement_cost_ft(&self, entities: &Entities, mover: EntityId, path: &[Position]) -> u32 {
        path.iter()
            .skip(1)
            .map(|&p| self.step_cost(entities, mover, p) * GameConfig::FEET_PER_SQUARE)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Entity, EntityKind, Size};

    struct ByName;

    impl Allegiance for ByName {
        fn is_hostile(&self, _: &Entities, a: EntityId, b: EntityId) -> bool {
            (a.0 % 2) != (b.0 % 2)
        }
    }

    fn setup() -> (Grid, Entities, EntityId, EntityId, EntityId) {
        let mut grid = Grid::new(5, 5);
        let mut entities = Entities::new();
        let hero = entities.insert(Entity::new("hero", EntityKind::Pc));
        let goblin = entities.insert(Entity::new("goblin", EntityKind::Npc));
        let ally = entities.insert(Entity::new("ally", EntityKind::Pc));
        grid.place(hero, Position::new(0, 0), 1).unwrap();
        grid.place(goblin, Position::new(2, 2), 1).unwrap();
        grid.place(ally, Position::new(1, 0), 1).unwrap();
        (grid, entities, hero, goblin, ally)
    }

    #[test]
    fn hostiles_block_only_with_allegiance() {
        let (grid, entities, hero, _, _) = setup();
        let at = Position::new(2, 2);
        assert!(grid.is_passable(&entities, hero, at, None));
        assert!(!grid.is_passable(&entities, hero, at, Some(&ByName)));
        assert!(!grid.is_placeable(&entities, hero, at, None));
    }

    #[test]
    fn allies_are_passable_but_not_placeable() {
        let (grid, entities, hero, _, _) = setup();
        let at = Position::new(1, 0);
        assert!(grid.is_passable(&entities, hero, at, Some(&ByName)));
        assert!(!grid.is_placeable(&entities, hero, at, Some(&ByName)));
        assert_eq!(grid.step_cost(&entities, hero, at), 2);
    }

    #[test]
    fn tiny_creatures_slip_past_large_hostiles() {
        let mut grid = Grid::new(5, 5);
        let mut entities = Entities::new();
        let rat = entities.insert(Entity::new("rat", EntityKind::Npc).with_size(Size::Tiny));
        let ogre = entities.insert(Entity::new("ogre", EntityKind::Npc).with_size(Size::Large));
        grid.place(rat, Position::new(0, 0), 1).unwrap();
        grid.place(ogre, Position::new(2, 2), 2).unwrap();
        assert!(grid.is_passable(&entities, rat, Position::new(3, 3), Some(&ByName)));
    }

    #[test]
    fn movement_cost_doubles_through_crowds() {
        let (grid, entities, hero, _, _) = setup();
        let path = [Position::new(0, 0), Position::new(1, 0), Position::new(2, 1)];
        assert_eq!(grid.movement_cost_ft(&entities, hero, &path), 15);
    }
}
