//! Grid pathfinding.
//!
//! A request runs in two passes:
//!
//! 1. **Forward**: Dijkstra over 8-connected passable cells with uniform step
//!    weight, producing a [`DistanceField`] from the source.
//! 2. **Backward**: from the destination, repeatedly step to the unvisited
//!    neighbour minimising `distance + euclid(neighbour, source) / 1e6`, then
//!    reverse.
//!
//! The backward tie-break favours cells geometrically closer to the source.
//! It is not a strict shortest-subpath reconstruction and must stay this way:
//! replays depend on the exact cells it picks.

mod queue;

pub use queue::IndexedHeap;

use std::cmp::Reverse;
use std::collections::HashSet;

use crate::grid::{Allegiance, Grid};
use crate::state::{Entities, EntityId, Position};

/// Divisor applied to the euclidean tie-break term.
const TIE_BREAK_SCALE: f64 = 1_000_000.0;

/// Step distances from a source cell. Unreached cells have no entry.
#[derive(Clone, Debug)]
pub struct DistanceField {
    width: u32,
    source: Position,
    distances: Vec<Option<u32>>,
}

impl DistanceField {
    pub fn source(&self) -> Position {
        self.source
    }

    pub fn distance(&self, position: Position) -> Option<u32> {
        if position.x < 0 || position.y < 0 || position.x >= self.width as i32 {
            return None;
        }
        let index = position.y as usize * self.width as usize + position.x as usize;
        self.distances.get(index).copied().flatten()
    }

    pub fn is_reachable(&self, position: Position) -> bool {
        self.distance(position).is_some()
    }

    /// Reached cells in row-major order.
    pub fn reached(&self) -> impl Iterator<Item = (Position, u32)> + '_ {
        let width = self.width as usize;
        self.distances.iter().enumerate().filter_map(move |(i, d)| {
            d.map(|d| (Position::new((i % width) as i32, (i / width) as i32), d))
        })
    }
}

/// Path queries for one mover over one grid snapshot.
pub struct PathFinder<'a> {
    grid: &'a Grid,
    entities: &'a Entities,
    allegiance: Option<&'a dyn Allegiance>,
}

impl<'a> PathFinder<'a> {
    pub fn new(grid: &'a Grid, entities: &'a Entities) -> Self {
        Self {
            grid,
            entities,
            allegiance: None,
        }
    }

    /// Makes living hostile creatures impassable.
    pub fn with_allegiance(mut self, allegiance: &'a dyn Allegiance) -> Self {
        self.allegiance = Some(allegiance);
        self
    }

    /// Forward pass. `max_distance` caps how many steps from the source are explored.
    pub fn distance_field(
        &self,
        mover: EntityId,
        source: Position,
        max_distance: Option<u32>,
    ) -> DistanceField {
        let width = self.grid.width();
        let mut field = DistanceField {
            width,
            source,
            distances: vec![None; (width * self.grid.height()) as usize],
        };
        if !self.grid.in_bounds(source) {
            return field;
        }

        let slot = |p: Position| p.y as usize * width as usize + p.x as usize;
        let mut frontier = IndexedHeap::new();
        field.distances[slot(source)] = Some(0);
        frontier.push(source, Reverse(0u32));

        while let Some((current, Reverse(distance))) = frontier.pop() {
            if field.distances[slot(current)].is_some_and(|best| best < distance) {
                continue;
            }
            let next = distance + 1;
            if max_distance.is_some_and(|max| next > max) {
                continue;
            }
            for neighbor in current.neighbors() {
                if !self.grid.in_bounds(neighbor) {
                    continue;
                }
                if field.distances[slot(neighbor)].is_some_and(|best| best <= next) {
                    continue;
                }
                if !self
                    .grid
                    .is_passable(self.entities, mover, neighbor, self.allegiance)
                {
                    continue;
                }
                field.distances[slot(neighbor)] = Some(next);
                frontier.push(neighbor, Reverse(next));
            }
        }
        field
    }

    /// Cells from `source` to `destination` inclusive, or `None` if unreachable.
    pub fn find_path(
        &self,
        mover: EntityId,
        source: Position,
        destination: Position,
        max_distance: Option<u32>,
    ) -> Option<Vec<Position>> {
        let field = self.distance_field(mover, source, max_distance);
        self.reconstruct(&field, destination)
    }

    /// Backward pass over an existing field.
    pub fn reconstruct(&self, field: &DistanceField, destination: Position) -> Option<Vec<Position>> {
        field.distance(destination)?;
        let source = field.source();
        let mut path = vec![destination];
        let mut visited = HashSet::from([destination]);
        let mut current = destination;
        let guard = (self.grid.width() * self.grid.height()) as usize;

        while current != source {
            if path.len() > guard {
                return None;
            }
            let next = current
                .neighbors()
                .filter(|n| !visited.contains(n))
                .filter_map(|n| {
                    let distance = field.distance(n)?;
                    Some((n, f64::from(distance) + n.euclidean(source) / TIE_BREAK_SCALE))
                })
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(n, _)| n)?;
            visited.insert(next);
            path.push(next);
            current = next;
        }

        path.reverse();
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Entity, EntityKind};

    fn walker(grid: &mut Grid, entities: &mut Entities, at: Position) -> EntityId {
        let id = entities.insert(Entity::new("walker", EntityKind::Pc));
        grid.place(id, at, 1).unwrap();
        id
    }

    #[test]
    fn diagonal_neighbour_is_one_step() {
        let mut grid = Grid::new(4, 4);
        let mut entities = Entities::new();
        let id = walker(&mut grid, &mut entities, Position::ORIGIN);
        let finder = PathFinder::new(&grid, &entities);
        let path = finder
            .find_path(id, Position::new(0, 0), Position::new(1, 1), None)
            .unwrap();
        assert_eq!(path, vec![Position::new(0, 0), Position::new(1, 1)]);
        assert_eq!(grid.movement_cost_ft(&entities, id, &path), 5);
    }

    #[test]
    fn routes_around_walls() {
        let mut grid = Grid::from_rows(&["....", ".##.", "...."]);
        let mut entities = Entities::new();
        let id = walker(&mut grid, &mut entities, Position::new(0, 1));
        let finder = PathFinder::new(&grid, &entities);
        let path = finder
            .find_path(id, Position::new(0, 1), Position::new(3, 1), None)
            .unwrap();
        assert_eq!(path.first(), Some(&Position::new(0, 1)));
        assert_eq!(path.last(), Some(&Position::new(3, 1)));
        assert_eq!(path.len(), 4);
        for pair in path.windows(2) {
            assert!(pair[0].is_adjacent(pair[1]));
            assert!(!grid.is_wall(pair[1]));
        }
    }

    #[test]
    fn unreachable_destination_is_absent() {
        let mut grid = Grid::from_rows(&["..#..", "..#..", "..#.."]);
        let mut entities = Entities::new();
        let id = walker(&mut grid, &mut entities, Position::ORIGIN);
        let finder = PathFinder::new(&grid, &entities);
        assert!(finder
            .find_path(id, Position::ORIGIN, Position::new(4, 0), None)
            .is_none());
    }

    #[test]
    fn max_distance_bounds_the_search() {
        let mut grid = Grid::new(8, 1);
        let mut entities = Entities::new();
        let id = walker(&mut grid, &mut entities, Position::ORIGIN);
        let finder = PathFinder::new(&grid, &entities);
        assert!(finder
            .find_path(id, Position::ORIGIN, Position::new(3, 0), Some(3))
            .is_some());
        assert!(finder
            .find_path(id, Position::ORIGIN, Position::new(4, 0), Some(3))
            .is_none());
    }

    #[test]
    fn tie_break_prefers_cells_nearer_the_source() {
        // Both (1,0) and (1,1) are one step from the source on the way to (2,0);
        // the euclidean tie-break picks the straight cell.
        let mut grid = Grid::new(3, 2);
        let mut entities = Entities::new();
        let id = walker(&mut grid, &mut entities, Position::ORIGIN);
        let finder = PathFinder::new(&grid, &entities);
        let path = finder
            .find_path(id, Position::ORIGIN, Position::new(2, 0), None)
            .unwrap();
        assert_eq!(
            path,
            vec![Position::new(0, 0), Position::new(1, 0), Position::new(2, 0)]
        );
    }
}
