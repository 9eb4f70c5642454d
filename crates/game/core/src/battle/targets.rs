//! Hostility and valid-target queries.

use bitflags::bitflags;

use crate::battle::BattleState;
use crate::config::GameConfig;
use crate::grid::Allegiance;
use crate::state::{Entities, EntityId, World};

bitflags! {
    /// Which relationships a target query accepts.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Relations: u8 {
        const SELF    = 1 << 0;
        const ALLIES  = 1 << 1;
        const ENEMIES = 1 << 2;
    }
}

/// Battle groups decide hostility when both entities joined the battle;
/// otherwise their factions do.
pub fn are_hostile(world: &World, battle: Option<&BattleState>, a: EntityId, b: EntityId) -> bool {
    if a == b {
        return false;
    }
    if let Some(battle) = battle
        && let (Some(la), Some(lb)) = (battle.ledger(a), battle.ledger(b))
    {
        return la.group != lb.group;
    }
    world.factions_hostile(a, b)
}

impl Allegiance for BattleState {
    /// Groups decide between members; anyone outside the battle falls back
    /// to factions.
    fn is_hostile(&self, entities: &Entities, a: EntityId, b: EntityId) -> bool {
        if a == b {
            return false;
        }
        match (self.ledger(a), self.ledger(b)) {
            (Some(la), Some(lb)) => la.group != lb.group,
            _ => entities.factions_hostile(a, b),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetQuery {
    pub relations: Relations,
    pub range_ft: u32,
    pub ignore_los: bool,
    /// Sight sampling cap in squares.
    pub sight_range: Option<u32>,
}

impl TargetQuery {
    pub fn enemies(range_ft: u32) -> Self {
        Self {
            relations: Relations::ENEMIES,
            range_ft,
            ignore_los: false,
            sight_range: None,
        }
    }

    pub fn allies(range_ft: u32) -> Self {
        Self {
            relations: Relations::SELF | Relations::ALLIES,
            ..Self::enemies(range_ft)
        }
    }

    pub fn melee() -> Self {
        Self::enemies(GameConfig::MELEE_REACH_FT)
    }

    pub fn ignoring_los(mut self) -> Self {
        self.ignore_los = true;
        self
    }

    pub fn with_sight_range(mut self, sight_range: Option<u32>) -> Self {
        self.sight_range = sight_range;
        self
    }
}

/// Placed, living entities matching `query` as seen from `source`, in id order.
pub fn valid_targets(
    world: &World,
    battle: Option<&BattleState>,
    source: EntityId,
    query: &TargetQuery,
) -> Vec<EntityId> {
    world
        .entities
        .iter()
        .filter(|candidate| !candidate.is_dead())
        .filter(|candidate| {
            let relation = if candidate.id == source {
                Relations::SELF
            } else if are_hostile(world, battle, source, candidate.id) {
                Relations::ENEMIES
            } else {
                Relations::ALLIES
            };
            query.relations.contains(relation)
        })
        .filter(|candidate| {
            world
                .distance_ft(source, candidate.id)
                .is_some_and(|distance| distance <= query.range_ft)
        })
        .filter(|candidate| {
            query.ignore_los || world.can_see(source, candidate.id, query.sight_range)
        })
        .map(|candidate| candidate.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::state::{Entity, EntityKind, Position, Statuses};

    fn world() -> (World, EntityId, EntityId, EntityId, EntityId) {
        let mut world = World::new(Grid::from_rows(&[".....", "..#..", "....."]));
        let hero = world
            .spawn(
                Entity::new("hero", EntityKind::Pc).with_faction("party"),
                Position::new(0, 1),
            )
            .unwrap();
        let ally = world
            .spawn(
                Entity::new("ally", EntityKind::Pc).with_faction("party"),
                Position::new(1, 1),
            )
            .unwrap();
        let hidden = world
            .spawn(
                Entity::new("hidden", EntityKind::Npc).with_faction("monsters"),
                Position::new(3, 1),
            )
            .unwrap();
        let corpse = world
            .spawn(
                Entity::new("corpse", EntityKind::Npc)
                    .with_faction("monsters")
                    .with_status(Statuses::DEAD),
                Position::new(0, 0),
            )
            .unwrap();
        (world, hero, ally, hidden, corpse)
    }

    #[test]
    fn filters_dead_out_of_sight_and_relation() {
        let (world, hero, ally, hidden, _) = world();
        let query = TargetQuery::enemies(60);
        assert!(valid_targets(&world, None, hero, &query).is_empty());
        assert_eq!(
            valid_targets(&world, None, hero, &query.ignoring_los()),
            vec![hidden]
        );
        assert_eq!(
            valid_targets(&world, None, hero, &TargetQuery::allies(5)),
            vec![hero, ally]
        );
    }

    #[test]
    fn range_is_measured_in_feet() {
        let (world, hero, _, hidden, _) = world();
        let query = TargetQuery::enemies(10).ignoring_los();
        assert!(valid_targets(&world, None, hero, &query).is_empty());
        let query = TargetQuery::enemies(15).ignoring_los();
        assert_eq!(valid_targets(&world, None, hero, &query), vec![hidden]);
    }

    #[test]
    fn factions_decide_without_a_battle() {
        let (world, hero, ally, hidden, _) = world();
        assert!(!are_hostile(&world, None, hero, ally));
        assert!(are_hostile(&world, None, hero, hidden));
        assert!(!are_hostile(&world, None, hero, hero));
    }

    #[test]
    fn outsiders_fall_back_to_factions_for_movement() {
        let (world, hero, ally, hidden, _) = world();
        let state = BattleState::default();
        assert!(state.is_hostile(&world.entities, hero, hidden));
        assert!(!state.is_hostile(&world.entities, hero, ally));
        assert!(!state.is_hostile(&world.entities, hero, hero));
    }
}
