use std::collections::BTreeMap;

use crate::config::GameConfig;
use crate::content::{ContentError, ContentRepository};
use crate::error::{ErrorSeverity, GameError};
use crate::grid::{Cover, Grid, GridError, MapError, MapLayout};
use crate::state::{Entities, Entity, EntityId, Faction, Footprint, Position};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Map(#[from] MapError),

    #[error(transparent)]
    Content(#[from] ContentError),
}

impl GameError for WorldError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Grid(e) => e.severity(),
            Self::Map(e) => e.severity(),
            Self::Content(e) => e.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Grid(e) => e.error_code(),
            Self::Map(e) => e.error_code(),
            Self::Content(e) => e.error_code(),
        }
    }
}

/// Everything physical about a fight: the combatants and the map they stand on.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct World {
    pub entities: Entities,
    pub grid: Grid,
}

impl World {
    pub fn new(grid: Grid) -> Self {
        Self {
            entities: Entities::new(),
            grid,
        }
    }

    /// Builds the grid from a parsed layout and spawns its NPCs.
    ///
    /// Returns the world together with the named spawn points for player
    /// characters.
    pub fn from_layout(
        layout: MapLayout,
        content: &ContentRepository,
    ) -> Result<(Self, BTreeMap<String, Position>), WorldError> {
        let mut world = Self::new(layout.grid);
        for placement in layout.npcs {
            let mut npc = content.npc_template(&placement.template)?.instantiate();
            if let Some(name) = placement.name {
                npc.name = name;
            }
            if let Some(group) = placement.group {
                npc.faction = Faction::new(group);
            }
            if let Some(hp) = placement.hit_points {
                npc = npc.with_hit_points(hp);
            }
            world.spawn(npc, placement.position)?;
        }
        Ok((world, layout.spawn_points))
    }

    /// Stores `entity` and places its footprint at `anchor`.
    pub fn spawn(&mut self, entity: Entity, anchor: Position) -> Result<EntityId, WorldError> {
        let size = entity.token_size();
        let id = self.entities.insert(entity);
        if let Err(err) = self.grid.place(id, anchor, size) {
            self.entities.remove(id);
            return Err(err.into());
        }
        Ok(id)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Direct access for setup and battle bookkeeping. Gameplay mutations go
    /// through a transaction instead.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn position_of(&self, id: EntityId) -> Option<Position> {
        self.grid.position_of(id)
    }

    pub fn footprint(&self, id: EntityId) -> Option<Footprint> {
        self.grid.footprint(id)
    }

    /// Squares between the closest cells of two entities.
    pub fn distance_squares(&self, a: EntityId, b: EntityId) -> Option<u32> {
        Some(self.footprint(a)?.distance(self.footprint(b)?))
    }

    /// Distance in feet, the unit ranges are quoted in.
    pub fn distance_ft(&self, a: EntityId, b: EntityId) -> Option<u32> {
        self.distance_squares(a, b)
            .map(|squares| squares * GameConfig::FEET_PER_SQUARE)
    }

    pub fn can_see(&self, observer: EntityId, target: EntityId, max_distance: Option<u32>) -> bool {
        if observer == target {
            return true;
        }
        match (self.footprint(observer), self.footprint(target)) {
            (Some(a), Some(b)) => self.grid.footprints_see(a, b, max_distance),
            _ => false,
        }
    }

    pub fn cover(&self, attacker: EntityId, target: EntityId) -> Cover {
        self.grid.cover_between(&self.entities, attacker, target)
    }

    /// Faction-based hostility, used when no battle assigns groups.
    pub fn factions_hostile(&self, a: EntityId, b: EntityId) -> bool {
        self.entities.factions_hostile(a, b)
    }
}
