//! Secondary bookkeeping run once all effects of an action have landed:
//! resource counters, ammunition, multiattack routines, hidden status and
//! help grants.

use crate::action::apply::ApplyContext;
use crate::action::{Action, ActionError, Intent, ResolvedAction};
use crate::battle::{Resource, TargetEffect, are_hostile};
use crate::content::CastingTime;
use crate::state::{EntityId, MultiattackGroup, Statuses, World};

pub(super) fn settle(ctx: &mut ApplyContext<'_>, resolved: &ResolvedAction) -> Result<(), ActionError> {
    let action = &resolved.action;
    let source = action.source;

    match &action.intent {
        Intent::Attack { weapon, target } => {
            let ammunition = ctx.session.content().weapon(weapon)?.ammunition.clone();
            if let Some(ammunition) = ammunition {
                ctx.tx.adjust_item(ctx.world, source, &ammunition, -1)?;
            }
            ctx.tx.remove_status(ctx.world, source, Statuses::HIDDEN)?;
            dismiss_help(ctx, source, *target);
        }
        Intent::CastSpell { target, .. } => {
            ctx.tx.remove_status(ctx.world, source, Statuses::HIDDEN)?;
            if resolved.effects.iter().any(|e| e.is_hit() || e.is_miss()) {
                dismiss_help(ctx, source, *target);
            }
        }
        _ => {}
    }

    let sneak_attack = resolved
        .effects
        .iter()
        .filter_map(|effect| effect.as_damage())
        .any(|damage| damage.sneak_attack);
    let cost = cost_of(ctx, action)?;
    let routine = match &action.intent {
        Intent::Attack { weapon, .. } if !action.as_reaction => Some(weapon.as_str()),
        _ => None,
    };
    let profile = ctx
        .world
        .entity(source)
        .and_then(|entity| entity.profiles.multiattack.clone());

    let Some(ledger) = ctx.ledger_mut(source) else {
        return Ok(());
    };
    if sneak_attack {
        ledger.sneak_attack_used = true;
    }
    match routine {
        Some(weapon) => {
            let remaining = match ledger.multiattack.take() {
                Some(groups) if contains(&groups, weapon) => groups,
                _ => {
                    ledger.spend(Resource::Action);
                    profile.map(|p| p.groups).unwrap_or_default()
                }
            };
            ledger.multiattack = advance_routine(remaining, weapon);
        }
        None => {
            if let Some(resource) = cost {
                ledger.spend(resource);
            }
        }
    }
    Ok(())
}

/// The counter a non-attack action draws from, if any.
fn cost_of(ctx: &mut ApplyContext<'_>, action: &Action) -> Result<Option<Resource>, ActionError> {
    if action.as_reaction {
        return Ok(Some(Resource::Reaction));
    }
    let resource = match &action.intent {
        Intent::Move { .. } | Intent::StandUp | Intent::DropProne => None,
        Intent::CastSpell { spell, .. } => match ctx.session.content().spell(spell)?.casting_time {
            CastingTime::Action => Some(Resource::Action),
            CastingTime::BonusAction => Some(Resource::BonusAction),
            CastingTime::Reaction => Some(Resource::Reaction),
        },
        Intent::Interact { .. } => {
            let free = ctx
                .battle_state()
                .and_then(|state| state.ledger(action.source))
                .is_some_and(|ledger| ledger.has(Resource::FreeObjectInteraction));
            Some(if free {
                Resource::FreeObjectInteraction
            } else {
                Resource::Action
            })
        }
        _ => Some(Resource::Action),
    };
    Ok(resource)
}

fn contains(groups: &[MultiattackGroup], weapon: &str) -> bool {
    groups.iter().any(|g| g.attacks.iter().any(|w| w == weapon))
}

/// Keeps the routines that include `weapon`, minus one use of it.
fn advance_routine(groups: Vec<MultiattackGroup>, weapon: &str) -> Option<Vec<MultiattackGroup>> {
    let remaining: Vec<MultiattackGroup> = groups
        .into_iter()
        .filter_map(|mut group| {
            let index = group.attacks.iter().position(|w| w == weapon)?;
            group.attacks.remove(index);
            (!group.attacks.is_empty()).then_some(group)
        })
        .collect();
    (!remaining.is_empty()).then_some(remaining)
}

/// An attack by an ally of the helper uses up the help grant.
fn dismiss_help(ctx: &mut ApplyContext<'_>, attacker: EntityId, target: EntityId) {
    let world: &World = ctx.world;
    let Some(state) = ctx.battle_state() else {
        return;
    };
    let Some(ledger) = state.ledger(target) else {
        return;
    };
    let spent: Vec<EntityId> = ledger
        .target_effects
        .iter()
        .filter(|(helper, effect)| {
            **effect == TargetEffect::Helped
                && **helper != attacker
                && !are_hostile(world, Some(state), **helper, attacker)
        })
        .map(|(helper, _)| *helper)
        .collect();
    if let Some(ledger) = ctx.ledger_mut(target) {
        for helper in spent {
            ledger.target_effects.remove(&helper);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(name: &str, attacks: &[&str]) -> MultiattackGroup {
        MultiattackGroup {
            name: name.into(),
            attacks: attacks.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn routine_narrows_to_groups_with_the_weapon() {
        let groups = vec![
            group("claws", &["claw", "claw", "bite"]),
            group("bow", &["longbow", "longbow"]),
        ];
        let after = advance_routine(groups, "claw").unwrap();
        assert_eq!(after, vec![group("claws", &["claw", "bite"])]);

        let after = advance_routine(after, "bite").unwrap();
        assert_eq!(after, vec![group("claws", &["claw"])]);
        assert_eq!(advance_routine(after, "claw"), None);
    }

    #[test]
    fn routine_ends_when_weapon_is_absent() {
        assert_eq!(advance_routine(vec![group("bow", &["longbow"])], "dagger"), None);
        assert!(!contains(&[group("bow", &["longbow"])], "dagger"));
    }
}
