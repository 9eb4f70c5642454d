use crate::action::ActionError;
use crate::action::advantage::{self, AttackReach};
use crate::action::effect::{DamageEffect, Effect, HealEffect, MissEffect, SlotExpendedEffect};
use crate::action::resolve::Resolver;
use crate::action::resolve::attack::roll_damage;
use crate::battle::Resource;
use crate::config::GameConfig;
use crate::content::{CastingTime, SpellEffect, SpellTarget};
use crate::dice::{DiceExpr, RollMode};
use crate::grid::Cover;
use crate::state::EntityId;

pub(super) fn resolve(
    r: &mut Resolver<'_>,
    source: EntityId,
    spell_name: &str,
    target: EntityId,
    as_reaction: bool,
) -> Result<Vec<Effect>, ActionError> {
    let caster = r.actor(source)?;
    let profile = caster
        .profiles
        .spellcaster
        .as_ref()
        .filter(|profile| profile.spells.iter().any(|s| s == spell_name))
        .ok_or_else(|| ActionError::SpellNotKnown {
            entity: source,
            spell: spell_name.to_owned(),
        })?;
    let spell = r.content.spell(spell_name)?;

    if spell.level > 0 && caster.slots_at(spell.level) == 0 {
        return Err(ActionError::PreconditionViolation {
            entity: source,
            reason: "no spell slot remaining at that level",
        });
    }
    match (spell.casting_time, as_reaction) {
        (CastingTime::Reaction, false) => {
            return Err(ActionError::PreconditionViolation {
                entity: source,
                reason: "spell can only be cast as a reaction",
            });
        }
        (CastingTime::Action, false) => r.require(source, Resource::Action)?,
        (CastingTime::BonusAction, false) => r.require(source, Resource::BonusAction)?,
        (_, true) => {}
    }

    let recipient = match spell.target {
        SpellTarget::Enemy => r.other(source, target)?,
        SpellTarget::Ally => {
            let recipient = r.living(target)?;
            if r.hostile(source, target) {
                return Err(ActionError::InvalidTarget {
                    target,
                    reason: "spell only affects allies",
                });
            }
            recipient
        }
    };
    r.within(source, target, spell.range_ft)?;
    if source != target && !r.can_see(source, target) {
        return Err(ActionError::InvalidTarget {
            target,
            reason: "target is not visible",
        });
    }

    let mut effects = Vec::new();
    if spell.level > 0 {
        effects.push(Effect::SlotExpended(SlotExpendedEffect {
            entity: source,
            level: spell.level,
        }));
    }

    let casting = caster.ability_modifier(profile.ability);
    match &spell.effect {
        SpellEffect::Attack {
            damage,
            damage_type,
        } => {
            let reach = AttackReach {
                ranged: spell.range_ft > GameConfig::MELEE_REACH_FT,
                normal_range_ft: spell.range_ft,
            };
            let mode = advantage::evaluate(
                r.world,
                r.battle,
                source,
                target,
                reach,
                r.config.sight_range,
            )
            .mode();
            let cover = r.world.cover(source, target);
            let attack_roll =
                DiceExpr::d20(casting + caster.proficiency_bonus).roll_with(r.dice, mode);
            let armor_class = recipient.armor_class + cover.armor_class_bonus();
            let hit = attack_roll.is_natural_20()
                || (!attack_roll.is_natural_1() && attack_roll.result() >= armor_class);
            if hit {
                let critical = attack_roll.is_natural_20();
                let damage_roll = roll_damage(damage, r.dice, critical);
                effects.push(Effect::SpellDamage(DamageEffect {
                    source,
                    target,
                    origin: spell.name.clone(),
                    attack_roll: Some(attack_roll),
                    save_roll: None,
                    amount: recipient.scale_damage(damage_roll.result(), *damage_type),
                    damage_roll,
                    damage_type: *damage_type,
                    critical,
                    sneak_attack: false,
                    mode,
                    cover,
                }));
            } else {
                effects.push(Effect::SpellMiss(MissEffect {
                    source,
                    target,
                    origin: spell.name.clone(),
                    attack_roll: Some(attack_roll),
                    save_roll: None,
                    mode,
                    cover,
                }));
            }
        }
        SpellEffect::Save {
            ability,
            damage,
            damage_type,
            half_on_success,
        } => {
            let dc = 8 + caster.proficiency_bonus + casting;
            let save_roll = DiceExpr::d20(recipient.ability_modifier(*ability)).roll(r.dice);
            let saved = save_roll.result() >= dc;
            if saved && !half_on_success {
                effects.push(Effect::SpellMiss(MissEffect {
                    source,
                    target,
                    origin: spell.name.clone(),
                    attack_roll: None,
                    save_roll: Some(save_roll),
                    mode: RollMode::Normal,
                    cover: Cover::None,
                }));
            } else {
                let damage_roll = damage.roll(r.dice);
                let raw = if saved {
                    damage_roll.result() / 2
                } else {
                    damage_roll.result()
                };
                effects.push(Effect::SpellDamage(DamageEffect {
                    source,
                    target,
                    origin: spell.name.clone(),
                    attack_roll: None,
                    save_roll: Some(save_roll),
                    damage_roll,
                    amount: recipient.scale_damage(raw, *damage_type),
                    damage_type: *damage_type,
                    critical: false,
                    sneak_attack: false,
                    mode: RollMode::Normal,
                    cover: Cover::None,
                }));
            }
        }
        SpellEffect::Heal { amount } => {
            let roll = amount.plus(casting).roll(r.dice);
            effects.push(Effect::Heal(HealEffect {
                source,
                target,
                origin: spell.name.clone(),
                amount: roll.result().max(0),
                roll,
            }));
        }
    }
    Ok(effects)
}
