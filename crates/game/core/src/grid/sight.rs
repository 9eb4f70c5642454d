//! Line of sight and cover.
//!
//! Both walk the cells of a Bresenham line between two cell centres. Sight is
//! blocked by walls and closed opaque objects on intermediate cells; the
//! endpoints themselves never block. Cover takes the worst obstruction found
//! on a line, and between two footprints the attacker gets the best line.

use crate::grid::Grid;
use crate::state::{Entities, EntityId, Footprint, Position};

/// Armor-class bonus granted by obstructions.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Cover {
    #[default]
    None,
    Half,
    ThreeQuarters,
}

impl Cover {
    pub const fn armor_class_bonus(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Half => 2,
            Self::ThreeQuarters => 5,
        }
    }
}

/// Cells on the digital line from `from` to `to`, both endpoints included.
pub fn line_cells(from: Position, to: Position) -> Vec<Position> {
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (from.x, from.y);
    let mut cells = Vec::with_capacity((dx.max(-dy) + 1) as usize);

    loop {
        cells.push(Position::new(x, y));
        if x == to.x && y == to.y {
            break;
        }
        let doubled = 2 * err;
        if doubled >= dy {
            err += dy;
            x += sx;
        }
        if doubled <= dx {
            err += dx;
            y += sy;
        }
    }
    cells
}

impl Grid {
    fn blocks_sight(&self, position: Position) -> bool {
        self.is_wall(position) || self.object(position).is_some_and(|o| o.blocks_sight())
    }

    /// Intermediate cells of the line, or `None` when the line is blocked or
    /// longer than `max_distance` samples.
    fn clear_line(&self, from: Position, to: Position, max_distance: Option<u32>) -> Option<Vec<Position>> {
        if let Some(max) = max_distance {
            if from.chebyshev(to) > max {
                return None;
            }
        }
        let cells = line_cells(from, to);
        let inner = if cells.len() > 2 {
            cells[1..cells.len() - 1].to_vec()
        } else {
            Vec::new()
        };
        if inner.iter().any(|&p| self.blocks_sight(p)) {
            return None;
        }
        Some(inner)
    }

    /// Cell-to-cell line of sight. A cell always sees itself.
    pub fn line_of_sight(&self, from: Position, to: Position, max_distance: Option<u32>) -> bool {
        from == to || self.clear_line(from, to, max_distance).is_some()
    }

    /// True if any cell of `a` sees any cell of `b`.
    pub fn footprints_see(&self, a: Footprint, b: Footprint, max_distance: Option<u32>) -> bool {
        a.cells()
            .any(|from| b.cells().any(|to| self.line_of_sight(from, to, max_distance)))
    }

    /// Cover along one line, or `None` when sight is blocked.
    ///
    /// Living creatures other than those in `ignore` count as half cover.
    pub fn line_cover(
        &self,
        entities: &Entities,
        from: Position,
        to: Position,
        ignore: &[EntityId],
    ) -> Option<Cover> {
        let inner = self.clear_line(from, to, None)?;
        let cover = inner
            .into_iter()
            .map(|position| {
                let object = self.object(position).map(|o| o.cover()).unwrap_or_default();
                let creature = self
                    .occupants(position)
                    .iter()
                    .filter(|id| !ignore.contains(id))
                    .any(|&id| entities.get(id).is_some_and(|e| !e.is_dead()));
                if creature {
                    object.max(Cover::Half)
                } else {
                    object
                }
            })
            .max()
            .unwrap_or_default();
        Some(cover)
    }

    /// Cover the target enjoys against the attacker: the least obstructed line
    /// between any attacker cell and any target cell wins. With no clear line
    /// at all the result is [`Cover::None`]; visibility is handled separately.
    pub fn cover_between(&self, entities: &Entities, attacker: EntityId, target: EntityId) -> Cover {
        let (Some(from), Some(to)) = (self.footprint(attacker), self.footprint(target)) else {
            return Cover::None;
        };
        let ignore = [attacker, target];
        from.cells()
            .flat_map(|a| {
                to.cells()
                    .filter_map(move |b| self.line_cover(entities, a, b, &ignore))
                    .collect::<Vec<_>>()
            })
            .min()
            .unwrap_or_default()
    }
}
