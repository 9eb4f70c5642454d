//! Advantage and disadvantage on attack rolls.
//!
//! Each applicable circumstance contributes a tag. Tags on both sides cancel
//! out entirely no matter how many there are; otherwise one side wins.

use crate::battle::{BattleState, TargetEffect, are_hostile};
use crate::config::GameConfig;
use crate::dice::RollMode;
use crate::state::{EntityId, Statuses, World};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum AdvantageTag {
    // advantage
    AttackerHidden,
    TargetProneAdjacent,
    TargetUnconscious,
    TargetHelped,
    // disadvantage
    TargetDodging,
    AttackerProne,
    TargetProneAtRange,
    HostileAdjacentToRangedAttacker,
    LongRange,
    TargetNotVisible,
}

impl AdvantageTag {
    pub fn is_advantage(self) -> bool {
        matches!(
            self,
            Self::AttackerHidden
                | Self::TargetProneAdjacent
                | Self::TargetUnconscious
                | Self::TargetHelped
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Advantage {
    tags: Vec<AdvantageTag>,
}

impl Advantage {
    pub fn tags(&self) -> &[AdvantageTag] {
        &self.tags
    }

    pub fn has(&self, tag: AdvantageTag) -> bool {
        self.tags.contains(&tag)
    }

    /// +1, 0 or -1.
    pub fn balance(&self) -> i8 {
        let advantage = self.tags.iter().any(|t| t.is_advantage());
        let disadvantage = self.tags.iter().any(|t| !t.is_advantage());
        match (advantage, disadvantage) {
            (true, false) => 1,
            (false, true) => -1,
            _ => 0,
        }
    }

    pub fn mode(&self) -> RollMode {
        RollMode::from_balance(self.balance())
    }
}

/// How the attack reaches its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttackReach {
    pub ranged: bool,
    /// Attacks beyond this distance are at long range.
    pub normal_range_ft: u32,
}

pub fn evaluate(
    world: &World,
    battle: Option<&BattleState>,
    attacker: EntityId,
    target: EntityId,
    reach: AttackReach,
    sight_range: Option<u32>,
) -> Advantage {
    let mut tags = Vec::new();
    let (Some(source), Some(defender)) = (world.entity(attacker), world.entity(target)) else {
        return Advantage { tags };
    };
    let distance = world.distance_ft(attacker, target).unwrap_or(u32::MAX);

    if source.has_status(Statuses::HIDDEN) {
        tags.push(AdvantageTag::AttackerHidden);
    }
    if defender.has_status(Statuses::PRONE) {
        if distance <= GameConfig::MELEE_REACH_FT {
            tags.push(AdvantageTag::TargetProneAdjacent);
        } else {
            tags.push(AdvantageTag::TargetProneAtRange);
        }
    }
    if defender.is_unconscious() {
        tags.push(AdvantageTag::TargetUnconscious);
    }
    let helped = battle.and_then(|b| b.ledger(target)).is_some_and(|ledger| {
        ledger.target_effects.iter().any(|(&helper, effect)| {
            *effect == TargetEffect::Helped
                && helper != attacker
                && !are_hostile(world, battle, helper, attacker)
        })
    });
    if helped {
        tags.push(AdvantageTag::TargetHelped);
    }

    if defender.has_status(Statuses::DODGE) && defender.is_conscious() {
        tags.push(AdvantageTag::TargetDodging);
    }
    if source.has_status(Statuses::PRONE) {
        tags.push(AdvantageTag::AttackerProne);
    }
    if reach.ranged {
        let engaged = world.entities.conscious().any(|other| {
            other.id != attacker
                && are_hostile(world, battle, attacker, other.id)
                && world
                    .distance_ft(attacker, other.id)
                    .is_some_and(|d| d <= GameConfig::ENGAGED_RANGE_FT)
        });
        if engaged {
            tags.push(AdvantageTag::HostileAdjacentToRangedAttacker);
        }
        if distance > reach.normal_range_ft {
            tags.push(AdvantageTag::LongRange);
        }
    }
    if !world.can_see(attacker, target, sight_range) {
        tags.push(AdvantageTag::TargetNotVisible);
    }

    Advantage { tags }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::state::{Entity, EntityKind, Position};

    const MELEE: AttackReach = AttackReach {
        ranged: false,
        normal_range_ft: 5,
    };

    fn pair(attacker: Statuses, target: Statuses, gap: i32) -> (World, EntityId, EntityId) {
        let mut world = World::new(Grid::new(10, 3));
        let a = world
            .spawn(
                Entity::new("a", EntityKind::Pc)
                    .with_faction("party")
                    .with_status(attacker),
                Position::new(0, 1),
            )
            .unwrap();
        let b = world
            .spawn(
                Entity::new("b", EntityKind::Npc)
                    .with_faction("monsters")
                    .with_status(target),
                Position::new(gap, 1),
            )
            .unwrap();
        (world, a, b)
    }

    #[test]
    fn opposing_tags_cancel() {
        let (world, a, b) = pair(Statuses::HIDDEN, Statuses::DODGE, 1);
        let advantage = evaluate(&world, None, a, b, MELEE, None);
        assert!(advantage.has(AdvantageTag::AttackerHidden));
        assert!(advantage.has(AdvantageTag::TargetDodging));
        assert_eq!(advantage.mode(), RollMode::Normal);
    }

    #[test]
    fn prone_depends_on_distance() {
        let (world, a, b) = pair(Statuses::empty(), Statuses::PRONE, 1);
        assert_eq!(evaluate(&world, None, a, b, MELEE, None).mode(), RollMode::Advantage);

        let (world, a, b) = pair(Statuses::empty(), Statuses::PRONE, 4);
        let bow = AttackReach {
            ranged: true,
            normal_range_ft: 80,
        };
        let advantage = evaluate(&world, None, a, b, bow, None);
        assert_eq!(advantage.tags(), &[AdvantageTag::TargetProneAtRange]);
        assert_eq!(advantage.mode(), RollMode::Disadvantage);
    }

    #[test]
    fn ranged_attacks_suffer_when_engaged_or_far() {
        let (world, a, b) = pair(Statuses::empty(), Statuses::empty(), 1);
        let bow = AttackReach {
            ranged: true,
            normal_range_ft: 80,
        };
        let advantage = evaluate(&world, None, a, b, bow, None);
        assert!(advantage.has(AdvantageTag::HostileAdjacentToRangedAttacker));

        let (world, a, b) = pair(Statuses::empty(), Statuses::empty(), 7);
        let sling = AttackReach {
            ranged: true,
            normal_range_ft: 30,
        };
        let advantage = evaluate(&world, None, a, b, sling, None);
        assert_eq!(advantage.tags(), &[AdvantageTag::LongRange]);
    }
}
