//! Spatial engine: terrain, occupancy, interactable objects.
//!
//! The grid is a dense row-major array of [`Cell`] records. Terrain is fixed
//! after construction; occupancy and door state change during play. Each
//! placed creature occupies a square [`Footprint`] whose side is its token
//! size, and the grid is the single owner of creature positions: every
//! placement or move rewrites all footprint cells in one step or not at all.

mod layout;
mod movement;
mod sight;

pub use layout::{LegendEntry, MapDefinition, MapError, MapLayout, NpcPlacement};
pub use movement::Allegiance;
pub use sight::{Cover, line_cells};

use std::collections::BTreeMap;

use arrayvec::ArrayVec;

use crate::config::GameConfig;
use crate::content::ObjectDefinition;
use crate::error::{ErrorSeverity, GameError};
use crate::state::{EntityId, Footprint, Position};

pub type Occupants = ArrayVec<EntityId, { GameConfig::MAX_OCCUPANTS_PER_TILE }>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Terrain {
    #[default]
    Floor,
    Wall,
}

/// Placed interactable object (door, crate, pillar ...).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapObject {
    pub kind: String,
    pub name: String,
    pub passable: bool,
    pub opaque: bool,
    pub cover: Cover,
    /// `Some(open)` for doors.
    pub door: Option<bool>,
}

impl MapObject {
    pub fn from_definition(kind: &str, definition: &ObjectDefinition) -> Self {
        Self {
            kind: kind.to_owned(),
            name: definition.name.clone(),
            passable: definition.passable,
            opaque: definition.opaque,
            cover: definition.cover,
            door: definition.door.then_some(false),
        }
    }

    pub fn is_door(&self) -> bool {
        self.door.is_some()
    }

    pub fn is_open(&self) -> bool {
        self.door == Some(true)
    }

    pub fn blocks_movement(&self) -> bool {
        !self.passable && !self.is_open()
    }

    pub fn blocks_sight(&self) -> bool {
        self.opaque && !self.is_open()
    }

    /// Cover granted to creatures behind this object. Open doors grant none.
    pub fn cover(&self) -> Cover {
        if self.is_open() {
            Cover::None
        } else {
            self.cover
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cell {
    pub terrain: Terrain,
    pub occupants: Occupants,
    pub object: Option<MapObject>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("position {0} is outside the map")]
    OutOfBounds(Position),

    #[error("position {0} is a wall")]
    Wall(Position),

    #[error("position {0} already holds the maximum number of occupants")]
    TileFull(Position),

    #[error("entity {0} is not placed on the grid")]
    NotPlaced(EntityId),

    #[error("entity {0} is already placed on the grid")]
    AlreadyPlaced(EntityId),

    #[error("no door at {0}")]
    NoDoor(Position),

    #[error("door at {0} is blocked by an occupant")]
    DoorBlocked(Position),
}

impl GameError for GridError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::OutOfBounds(_) | Self::Wall(_) | Self::TileFull(_) | Self::DoorBlocked(_) => {
                ErrorSeverity::Recoverable
            }
            Self::NoDoor(_) => ErrorSeverity::Validation,
            Self::NotPlaced(_) | Self::AlreadyPlaced(_) => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::OutOfBounds(_) => "GRID_OUT_OF_BOUNDS",
            Self::Wall(_) => "GRID_WALL",
            Self::TileFull(_) => "GRID_TILE_FULL",
            Self::NotPlaced(_) => "GRID_NOT_PLACED",
            Self::AlreadyPlaced(_) => "GRID_ALREADY_PLACED",
            Self::NoDoor(_) => "GRID_NO_DOOR",
            Self::DoorBlocked(_) => "GRID_DOOR_BLOCKED",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
    footprints: BTreeMap<EntityId, Footprint>,
}

impl Grid {
    /// An all-floor grid.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); (width * height) as usize],
            footprints: BTreeMap::new(),
        }
    }

    /// Builds terrain from rows of `#` (wall) and anything else (floor).
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len() as u32;
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as u32;
        let mut grid = Self::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, token) in row.chars().enumerate() {
                if token == '#' {
                    grid.set_terrain(Position::new(x as i32, y as i32), Terrain::Wall);
                }
            }
        }
        grid
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn in_bounds(&self, position: Position) -> bool {
        position.x >= 0
            && position.y >= 0
            && position.x < self.width as i32
            && position.y < self.height as i32
    }

    fn index(&self, position: Position) -> Option<usize> {
        self.in_bounds(position)
            .then(|| position.y as usize * self.width as usize + position.x as usize)
    }

    pub fn cell(&self, position: Position) -> Option<&Cell> {
        self.index(position).map(|i| &self.cells[i])
    }

    fn cell_mut(&mut self, position: Position) -> Option<&mut Cell> {
        self.index(position).map(|i| &mut self.cells[i])
    }

    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height as i32)
            .flat_map(move |y| (0..self.width as i32).map(move |x| Position::new(x, y)))
    }

    pub fn terrain(&self, position: Position) -> Option<Terrain> {
        self.cell(position).map(|c| c.terrain)
    }

    pub fn is_wall(&self, position: Position) -> bool {
        !matches!(self.terrain(position), Some(Terrain::Floor))
    }

    pub(crate) fn set_terrain(&mut self, position: Position, terrain: Terrain) {
        if let Some(cell) = self.cell_mut(position) {
            cell.terrain = terrain;
        }
    }

    // ===== objects =====

    pub fn object(&self, position: Position) -> Option<&MapObject> {
        self.cell(position).and_then(|c| c.object.as_ref())
    }

    pub fn objects(&self) -> impl Iterator<Item = (Position, &MapObject)> + '_ {
        self.positions()
            .filter_map(move |p| self.object(p).map(|object| (p, object)))
    }

    pub fn place_object(&mut self, position: Position, object: MapObject) -> Result<(), GridError> {
        let cell = self
            .cell_mut(position)
            .ok_or(GridError::OutOfBounds(position))?;
        cell.object = Some(object);
        Ok(())
    }

    /// Opens or closes the door at `position`, returning the previous state.
    pub(crate) fn set_door(&mut self, position: Position, open: bool) -> Result<bool, GridError> {
        let cell = self
            .cell_mut(position)
            .ok_or(GridError::OutOfBounds(position))?;
        if !open && !cell.occupants.is_empty() {
            return Err(GridError::DoorBlocked(position));
        }
        let door = cell
            .object
            .as_mut()
            .and_then(|o| o.door.as_mut())
            .ok_or(GridError::NoDoor(position))?;
        Ok(std::mem::replace(door, open))
    }

    // ===== occupancy =====

    pub fn occupants(&self, position: Position) -> &[EntityId] {
        self.cell(position).map(|c| c.occupants.as_slice()).unwrap_or(&[])
    }

    pub fn footprint(&self, entity: EntityId) -> Option<Footprint> {
        self.footprints.get(&entity).copied()
    }

    pub fn position_of(&self, entity: EntityId) -> Option<Position> {
        self.footprint(entity).map(|f| f.anchor)
    }

    pub fn placed(&self) -> impl Iterator<Item = (EntityId, Footprint)> + '_ {
        self.footprints.iter().map(|(&id, &f)| (id, f))
    }

    fn check_footprint(&self, entity: EntityId, footprint: Footprint) -> Result<(), GridError> {
        for position in footprint.cells() {
            let cell = self
                .cell(position)
                .ok_or(GridError::OutOfBounds(position))?;
            if cell.terrain == Terrain::Wall {
                return Err(GridError::Wall(position));
            }
            let others = cell.occupants.iter().filter(|&&o| o != entity).count();
            if others >= GameConfig::MAX_OCCUPANTS_PER_TILE {
                return Err(GridError::TileFull(position));
            }
        }
        Ok(())
    }

    /// Places an entity with the given token size at `anchor`.
    pub fn place(&mut self, entity: EntityId, anchor: Position, size: u32) -> Result<(), GridError> {
        if self.footprints.contains_key(&entity) {
            return Err(GridError::AlreadyPlaced(entity));
        }
        let footprint = Footprint::new(anchor, size.max(1));
        self.check_footprint(entity, footprint)?;
        self.stamp(entity, footprint);
        Ok(())
    }

    /// Moves an entity's whole footprint so its anchor lands on `anchor`.
    ///
    /// All destination cells are validated before any cell is touched.
    pub fn move_entity(&mut self, entity: EntityId, anchor: Position) -> Result<Footprint, GridError> {
        let current = self
            .footprint(entity)
            .ok_or(GridError::NotPlaced(entity))?;
        let target = current.at(anchor);
        self.check_footprint(entity, target)?;
        self.erase(entity, current);
        self.stamp(entity, target);
        Ok(current)
    }

    pub fn remove(&mut self, entity: EntityId) -> Option<Footprint> {
        let footprint = self.footprints.get(&entity).copied()?;
        self.erase(entity, footprint);
        Some(footprint)
    }

    fn stamp(&mut self, entity: EntityId, footprint: Footprint) {
        for position in footprint.cells() {
            if let Some(cell) = self.cell_mut(position) {
                cell.occupants.push(entity);
            }
        }
        self.footprints.insert(entity, footprint);
    }

    fn erase(&mut self, entity: EntityId, footprint: Footprint) {
        for position in footprint.cells() {
            if let Some(cell) = self.cell_mut(position) {
                cell.occupants.retain(|o| *o != entity);
            }
        }
        self.footprints.remove(&entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn large_creature_moves_whole_footprint() {
        let mut grid = Grid::new(6, 6);
        let ogre = EntityId(1);
        grid.place(ogre, Position::new(0, 0), 2).unwrap();
        assert_eq!(grid.occupants(Position::new(1, 1)), &[ogre]);

        grid.move_entity(ogre, Position::new(2, 1)).unwrap();
        assert!(grid.occupants(Position::new(0, 0)).is_empty());
        assert!(grid.occupants(Position::new(1, 1)).is_empty());
        for cell in [(2, 1), (3, 1), (2, 2), (3, 2)] {
            assert_eq!(grid.occupants(cell.into()), &[ogre]);
        }
        assert_eq!(grid.position_of(ogre), Some(Position::new(2, 1)));
    }

    #[test]
    fn rejected_move_leaves_footprint_untouched() {
        let mut grid = Grid::from_rows(&["....", "...#", "...."]);
        let ogre = EntityId(7);
        grid.place(ogre, Position::new(0, 0), 2).unwrap();

        let err = grid.move_entity(ogre, Position::new(2, 0)).unwrap_err();
        assert_eq!(err, GridError::Wall(Position::new(3, 1)));
        assert_eq!(grid.position_of(ogre), Some(Position::ORIGIN));
        assert_eq!(grid.occupants(Position::new(1, 1)), &[ogre]);

        let err = grid.move_entity(ogre, Position::new(3, 2)).unwrap_err();
        assert!(matches!(err, GridError::OutOfBounds(_)));
    }

    #[test]
    fn occupant_slots_are_bounded() {
        let mut grid = Grid::new(2, 2);
        for id in 0..GameConfig::MAX_OCCUPANTS_PER_TILE as u32 {
            grid.place(EntityId(id), Position::ORIGIN, 1).unwrap();
        }
        let err = grid.place(EntityId(99), Position::ORIGIN, 1).unwrap_err();
        assert_eq!(err, GridError::TileFull(Position::ORIGIN));
    }

    #[test]
    fn doors_toggle_and_refuse_to_close_on_occupants() {
        let mut grid = Grid::new(3, 1);
        let door = MapObject {
            kind: "door".into(),
            name: "door".into(),
            passable: false,
            opaque: true,
            cover: Cover::None,
            door: Some(false),
        };
        let at = Position::new(1, 0);
        grid.place_object(at, door).unwrap();
        assert!(grid.object(at).unwrap().blocks_movement());

        assert_eq!(grid.set_door(at, true), Ok(false));
        assert!(!grid.object(at).unwrap().blocks_sight());

        grid.place(EntityId(1), at, 1).unwrap();
        assert_eq!(grid.set_door(at, false), Err(GridError::DoorBlocked(at)));
        assert_eq!(grid.set_door(Position::ORIGIN, true), Err(GridError::NoDoor(Position::ORIGIN)));
    }
}
