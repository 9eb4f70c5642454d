//! Static legality checks used to offer actions as choices.
//!
//! These predicates look at resources, statuses and whether any target exists.
//! They never roll dice; passing them does not guarantee that `resolve` will
//! accept every parameter choice.

use crate::action::ActionKind;
use crate::battle::{BattleEntityState, BattleState, Resource, TargetQuery, valid_targets};
use crate::content::{CastingTime, ContentRepository};
use crate::state::{Entity, EntityId, Statuses, World};

/// Kinds `entity` could start right now.
pub fn available_actions(
    entity: EntityId,
    world: &World,
    battle: Option<&BattleState>,
    content: &ContentRepository,
) -> Vec<ActionKind> {
    ActionKind::ALL
        .into_iter()
        .filter(|kind| can_perform(*kind, entity, world, battle, content))
        .collect()
}

pub fn can_perform(
    kind: ActionKind,
    entity: EntityId,
    world: &World,
    battle: Option<&BattleState>,
    content: &ContentRepository,
) -> bool {
    let Some(actor) = world.entity(entity).filter(|e| e.is_conscious()) else {
        return false;
    };
    if world.position_of(entity).is_none() {
        return false;
    }
    let ledger = battle
        .filter(|b| b.is_active())
        .and_then(|b| b.ledger(entity));
    let has = |resource| ledger.is_none_or(|l: &BattleEntityState| l.has(resource));
    let any_target = |query: TargetQuery| !valid_targets(world, battle, entity, &query).is_empty();

    match kind {
        ActionKind::Attack => {
            let in_routine = ledger.is_some_and(|l| l.multiattack.is_some());
            (has(Resource::Action) || in_routine)
                && actor.equipped.iter().any(|name| {
                    content.weapon(name).is_ok_and(|weapon| {
                        let armed = weapon
                            .ammunition
                            .as_ref()
                            .is_none_or(|ammo| actor.inventory().count(ammo) > 0);
                        armed && any_target(TargetQuery::enemies(weapon.max_range_ft()))
                    })
                })
        }
        ActionKind::Move => {
            !actor.has_status(Statuses::GRAPPLED) && has(Resource::Movement)
        }
        ActionKind::Dash | ActionKind::Disengage | ActionKind::Dodge | ActionKind::Hide => {
            has(Resource::Action)
        }
        ActionKind::Help => {
            battle.is_some_and(|b| b.is_member(entity))
                && has(Resource::Action)
                && any_target(TargetQuery::melee())
        }
        ActionKind::Grapple | ActionKind::Shove => {
            has(Resource::Action) && any_target(TargetQuery::melee())
        }
        ActionKind::EscapeGrapple => {
            actor.has_status(Statuses::GRAPPLED) && has(Resource::Action)
        }
        ActionKind::StandUp => {
            actor.has_status(Statuses::PRONE)
                && ledger.is_none_or(|l| l.movement_ft >= actor.speed_ft / 2)
        }
        ActionKind::DropProne => !actor.has_status(Statuses::PRONE),
        ActionKind::CastSpell => can_cast_any(actor, ledger, content),
        ActionKind::UseItem => {
            has(Resource::Action)
                && actor
                    .inventory()
                    .iter()
                    .any(|(item, count)| count > 0 && content.has_item(item))
        }
        ActionKind::Interact => {
            (has(Resource::FreeObjectInteraction) || has(Resource::Action))
                && next_to_door(world, entity)
        }
    }
}

fn can_cast_any(
    caster: &Entity,
    ledger: Option<&BattleEntityState>,
    content: &ContentRepository,
) -> bool {
    let Some(profile) = &caster.profiles.spellcaster else {
        return false;
    };
    let has = |resource| ledger.is_none_or(|l| l.has(resource));
    profile.spells.iter().any(|name| {
        content.spell(name).is_ok_and(|spell| {
            let timing = match spell.casting_time {
                CastingTime::Action => has(Resource::Action),
                CastingTime::BonusAction => has(Resource::BonusAction),
                CastingTime::Reaction => false,
            };
            timing && (spell.level == 0 || caster.slots_at(spell.level) > 0)
        })
    })
}

fn next_to_door(world: &World, entity: EntityId) -> bool {
    let Some(footprint) = world.footprint(entity) else {
        return false;
    };
    world.grid.objects().any(|(position, object)| {
        object.is_door() && footprint.cells().any(|cell| cell.chebyshev(position) <= 1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::state::{EntityKind, Position};

    #[test]
    fn prone_entity_can_stand_but_not_drop() {
        let mut world = World::new(Grid::new(4, 4));
        let id = world
            .spawn(
                Entity::new("rogue", EntityKind::Pc).with_status(Statuses::PRONE),
                Position::new(1, 1),
            )
            .unwrap();
        let content = ContentRepository::default();
        let kinds = available_actions(id, &world, None, &content);
        assert!(kinds.contains(&ActionKind::StandUp));
        assert!(!kinds.contains(&ActionKind::DropProne));
        assert!(!kinds.contains(&ActionKind::EscapeGrapple));
        assert!(!kinds.contains(&ActionKind::Attack));
    }

    #[test]
    fn unconscious_entity_has_no_options() {
        let mut world = World::new(Grid::new(4, 4));
        let id = world
            .spawn(
                Entity::new("rogue", EntityKind::Pc).with_status(Statuses::UNCONSCIOUS),
                Position::new(0, 0),
            )
            .unwrap();
        assert!(available_actions(id, &world, None, &ContentRepository::default()).is_empty());
    }
}
