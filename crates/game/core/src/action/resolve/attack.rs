use crate::action::ActionError;
use crate::action::advantage::{self, AttackReach};
use crate::action::effect::{DamageEffect, Effect, MissEffect};
use crate::action::resolve::Resolver;
use crate::battle::Resource;
use crate::config::GameConfig;
use crate::content::{BonusCondition, WeaponDefinition};
use crate::dice::{DiceExpr, DiceRoller, DieRoll, RollMode};
use crate::state::{Entity, EntityId};

pub(super) fn resolve(
    r: &mut Resolver<'_>,
    source: EntityId,
    weapon_name: &str,
    target: EntityId,
    as_reaction: bool,
) -> Result<Vec<Effect>, ActionError> {
    let attacker = r.actor(source)?;
    if !attacker.equipped.iter().any(|w| w == weapon_name) {
        return Err(ActionError::NotEquipped {
            entity: source,
            weapon: weapon_name.to_owned(),
        });
    }
    let weapon = r.content.weapon(weapon_name)?;
    let defender = r.other(source, target)?;
    if !as_reaction {
        require_attack(r, source, weapon_name)?;
    }
    r.within(source, target, weapon.max_range_ft())?;
    if let Some(ammunition) = &weapon.ammunition
        && attacker.inventory().count(ammunition) == 0
    {
        return Err(ActionError::OutOfAmmunition {
            entity: source,
            ammunition: ammunition.clone(),
        });
    }

    let reach = AttackReach {
        ranged: weapon.is_ranged(),
        normal_range_ft: weapon.range_ft,
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
    let modifier = attacker.ability_modifier(weapon.ability_for(attacker));
    let attack_roll = DiceExpr::d20(modifier + attacker.proficiency_bonus + weapon.attack_bonus)
        .roll_with(r.dice, mode);

    let armor_class = defender.armor_class + cover.armor_class_bonus();
    let hit = attack_roll.is_natural_20()
        || (!attack_roll.is_natural_1() && attack_roll.result() >= armor_class);
    if !hit {
        return Ok(vec![Effect::Miss(MissEffect {
            source,
            target,
            origin: weapon.name.clone(),
            attack_roll: Some(attack_roll),
            save_roll: None,
            mode,
            cover,
        })]);
    }

    let critical = attack_roll.is_natural_20();
    let mut damage_roll = roll_damage(&weapon.damage.plus(modifier), r.dice, critical);
    let sneak_attack = sneak_attack_applies(r, attacker, weapon, target, mode);
    if sneak_attack && let Some(profile) = &attacker.profiles.sneak_attack {
        damage_roll = damage_roll + roll_damage(&profile.dice, r.dice, critical);
    }
    let mut amount = defender.scale_damage(damage_roll.result(), weapon.damage_type);

    let bonus = weapon.bonus_damage.as_ref().filter(|bonus| match bonus.when {
        BonusCondition::Always => true,
        BonusCondition::TargetSizeAtLeast(size) => defender.size >= size,
        BonusCondition::OnCritical => critical,
    });
    if let Some(bonus) = bonus {
        let extra = roll_damage(&bonus.dice, r.dice, critical);
        amount += defender.scale_damage(extra.result(), bonus.damage_type);
        damage_roll = damage_roll + extra;
    }

    Ok(vec![Effect::Damage(DamageEffect {
        source,
        target,
        origin: weapon.name.clone(),
        attack_roll: Some(attack_roll),
        save_roll: None,
        damage_roll,
        amount,
        damage_type: weapon.damage_type,
        critical,
        sneak_attack,
        mode,
        cover,
    })])
}

/// Critical hits roll every damage die twice.
pub(super) fn roll_damage(expr: &DiceExpr, dice: &mut dyn DiceRoller, critical: bool) -> DieRoll {
    if critical {
        expr.roll_critical(dice)
    } else {
        expr.roll(dice)
    }
}

/// An attack is paid for by the action, unless a multiattack routine already
/// under way still has this weapon in it.
fn require_attack(r: &Resolver<'_>, source: EntityId, weapon: &str) -> Result<(), ActionError> {
    let in_routine = r
        .ledger(source)
        .and_then(|ledger| ledger.multiattack.as_ref())
        .is_some_and(|groups| {
            groups
                .iter()
                .any(|group| group.attacks.iter().any(|w| w == weapon))
        });
    if in_routine {
        return Ok(());
    }
    r.require(source, Resource::Action)
}

/// Finesse or ranged weapon, once per turn, with advantage or an ally of the
/// attacker next to the target, and never at disadvantage.
fn sneak_attack_applies(
    r: &Resolver<'_>,
    attacker: &Entity,
    weapon: &WeaponDefinition,
    target: EntityId,
    mode: RollMode,
) -> bool {
    if attacker.profiles.sneak_attack.is_none() || !(weapon.finesse || weapon.is_ranged()) {
        return false;
    }
    if r.ledger(attacker.id).is_some_and(|l| l.sneak_attack_used) {
        return false;
    }
    match mode {
        RollMode::Advantage => true,
        RollMode::Disadvantage => false,
        RollMode::Normal => r.world.entities.conscious().any(|ally| {
            ally.id != attacker.id
                && ally.id != target
                && !r.hostile(attacker.id, ally.id)
                && r
                    .world
                    .distance_ft(ally.id, target)
                    .is_some_and(|d| d <= GameConfig::MELEE_REACH_FT)
        }),
    }
}
