use tracing::info;

use crate::action::apply::{ApplyContext, EffectHandler};
use crate::action::{ActionError, DamageEffect, Effect, EffectTag};
use crate::battle::{BattleEvent, ReactionTrigger};
use crate::state::{DeathSaves, EntityId, EntityKind, Statuses};

/// Hit point loss, dying and death.
///
/// NPCs die at 0 hp. A character drops unconscious instead, unless the damage
/// left over after reaching 0 is at least its maximum hp. Damage taken while
/// already down counts as a failed death save, two on a critical hit.
#[derive(Clone, Copy, Debug, Default)]
pub struct DamageHandler;

impl EffectHandler for DamageHandler {
    fn handles(&self) -> &'static [EffectTag] {
        &[EffectTag::Damage, EffectTag::SpellDamage]
    }

    fn apply(&self, effect: &Effect, ctx: &mut ApplyContext<'_>) -> Result<(), ActionError> {
        let Some(damage) = effect.as_damage() else {
            return Ok(());
        };
        let target = damage.target;
        let entity = ctx
            .world
            .entity(target)
            .ok_or(ActionError::EntityNotFound(target))?;
        let (kind, was_down) = (entity.kind, !entity.is_conscious());
        let (hit_points, max_hit_points) = (entity.hit_points(), entity.max_hit_points);
        let saves = entity.death_saves();

        ctx.tx
            .remove_status(ctx.world, target, Statuses::HIDDEN)?;
        ctx.publish(BattleEvent::Attacked {
            source: damage.source,
            target,
            origin: damage.origin.clone(),
            damage: damage.amount,
            damage_type: damage.damage_type,
            critical: damage.critical,
            sneak_attack: damage.sneak_attack,
            attack_roll: damage.attack_roll.as_ref().map(|roll| roll.result()),
        });

        if damage.amount <= 0 {
            return Ok(());
        }

        if was_down {
            if kind == EntityKind::Pc {
                let failures = if damage.critical { 2 } else { 1 };
                let saves = DeathSaves {
                    failures: (saves.failures + failures).min(DeathSaves::LIMIT),
                    ..saves
                };
                ctx.tx.set_death_saves(ctx.world, target, saves)?;
                ctx.tx.remove_status(ctx.world, target, Statuses::STABLE)?;
                if saves.is_dead() {
                    kill(ctx, target)?;
                }
            }
            return Ok(());
        }

        let remaining = hit_points - damage.amount;
        ctx.tx
            .set_hit_points(ctx.world, target, remaining.max(0))?;
        if remaining > 0 {
            offer_reaction(ctx, damage)?;
            return Ok(());
        }

        if kind == EntityKind::Npc || -remaining >= max_hit_points {
            kill(ctx, target)
        } else {
            knock_out(ctx, target)
        }
    }
}

fn kill(ctx: &mut ApplyContext<'_>, target: EntityId) -> Result<(), ActionError> {
    let statuses = ctx
        .world
        .entity(target)
        .map(|entity| entity.statuses())
        .ok_or(ActionError::EntityNotFound(target))?;
    let statuses = (statuses - Statuses::STABLE - Statuses::HIDDEN) | Statuses::DEAD | Statuses::PRONE;
    ctx.tx.set_statuses(ctx.world, target, statuses)?;
    release_grapples(ctx, target)?;
    info!(target: "core::apply", entity = %target, "died");
    ctx.publish(BattleEvent::Died { entity: target });
    Ok(())
}

fn knock_out(ctx: &mut ApplyContext<'_>, target: EntityId) -> Result<(), ActionError> {
    ctx.tx
        .insert_status(ctx.world, target, Statuses::UNCONSCIOUS | Statuses::PRONE)?;
    ctx.tx.remove_status(
        ctx.world,
        target,
        Statuses::STABLE | Statuses::HIDDEN | Statuses::DODGE,
    )?;
    ctx.tx
        .set_death_saves(ctx.world, target, DeathSaves::default())?;
    release_grapples(ctx, target)?;
    info!(target: "core::apply", entity = %target, "unconscious");
    ctx.publish(BattleEvent::Unconscious { entity: target });
    Ok(())
}

/// A creature that drops lets go of everyone it was holding.
fn release_grapples(ctx: &mut ApplyContext<'_>, grappler: EntityId) -> Result<(), ActionError> {
    let held: Vec<EntityId> = ctx
        .world
        .entities
        .iter()
        .filter(|entity| entity.grappled_by() == Some(grappler))
        .map(|entity| entity.id)
        .collect();
    for id in held {
        ctx.tx.set_grappled_by(ctx.world, id, None)?;
        ctx.tx.remove_status(ctx.world, id, Statuses::GRAPPLED)?;
    }
    Ok(())
}

fn offer_reaction(ctx: &mut ApplyContext<'_>, damage: &DamageEffect) -> Result<(), ActionError> {
    let Some(battle) = ctx.battle.as_deref_mut() else {
        return Ok(());
    };
    let trigger = ReactionTrigger::Damaged {
        attacker: damage.source,
    };
    let reaction =
        battle.request_reaction(ctx.world, ctx.session.content(), damage.target, trigger);
    match reaction {
        Some(action) => ctx.cascade(&action),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::content::ContentRepository;
    use crate::dice::{DieRoll, RollMode};
    use crate::grid::{Cover, Grid};
    use crate::session::Session;
    use crate::state::{DamageType, Entity, Position, World};
    use crate::transaction::Transaction;

    fn hit(source: EntityId, target: EntityId, amount: i32, critical: bool) -> Effect {
        Effect::Damage(DamageEffect {
            source,
            target,
            origin: "club".into(),
            attack_roll: Some(DieRoll::flat(15)),
            save_roll: None,
            damage_roll: DieRoll::flat(amount),
            amount,
            damage_type: DamageType::Bludgeoning,
            critical,
            sneak_attack: false,
            mode: RollMode::Normal,
            cover: Cover::None,
        })
    }

    fn world_with(kind: EntityKind, hit_points: i32) -> (World, EntityId, EntityId) {
        let mut world = World::new(Grid::new(6, 6));
        let attacker = world
            .spawn(
                Entity::new("brute", EntityKind::Npc).with_faction("monsters"),
                Position::new(0, 0),
            )
            .unwrap();
        let victim = world
            .spawn(
                Entity::new("victim", kind)
                    .with_faction("heroes")
                    .with_hit_points(hit_points),
                Position::new(1, 0),
            )
            .unwrap();
        (world, attacker, victim)
    }

    fn apply(world: &mut World, effect: &Effect) -> Transaction {
        let mut session = Session::new(Arc::new(ContentRepository::default()));
        let mut tx = Transaction::new();
        let mut ctx = ApplyContext::new(world, None, &mut session, &mut tx);
        DamageHandler.apply(effect, &mut ctx).unwrap();
        tx
    }

    #[test]
    fn npc_dies_at_zero() {
        let (mut world, attacker, victim) = world_with(EntityKind::Npc, 7);
        apply(&mut world, &hit(attacker, victim, 7, false));
        let victim = world.entity(victim).unwrap();
        assert_eq!(victim.hit_points(), 0);
        assert!(victim.is_dead());
    }

    #[test]
    fn character_drops_unconscious_unless_overkill() {
        let (mut world, attacker, victim) = world_with(EntityKind::Pc, 10);
        apply(&mut world, &hit(attacker, victim, 12, false));
        let down = world.entity(victim).unwrap();
        assert!(down.is_unconscious() && !down.is_dead());

        let (mut world, attacker, victim) = world_with(EntityKind::Pc, 10);
        apply(&mut world, &hit(attacker, victim, 20, false));
        assert!(world.entity(victim).unwrap().is_dead());
    }

    #[test]
    fn critical_on_a_downed_character_counts_two_failures() {
        let (mut world, attacker, victim) = world_with(EntityKind::Pc, 4);
        apply(&mut world, &hit(attacker, victim, 5, false));
        apply(&mut world, &hit(attacker, victim, 3, true));
        assert_eq!(world.entity(victim).unwrap().death_saves().failures, 2);
        apply(&mut world, &hit(attacker, victim, 1, false));
        assert!(world.entity(victim).unwrap().is_dead());
    }

    #[test]
    fn rollback_restores_hit_points_and_statuses() {
        let (mut world, attacker, victim) = world_with(EntityKind::Pc, 4);
        let before = world.entity(victim).cloned().unwrap();
        let tx = apply(&mut world, &hit(attacker, victim, 6, false));
        tx.rollback(&mut world).unwrap();
        assert_eq!(world.entity(victim), Some(&before));
    }
}
