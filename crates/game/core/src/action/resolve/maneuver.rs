//! Actions that need no weapon: stances, help, hiding, contests, standing up
//! and interacting with objects.

use crate::action::ActionError;
use crate::action::effect::{
    ContestEffect, DashEffect, DoorEffect, Effect, HelpEffect, HideEffect, StandUpEffect,
};
use crate::action::resolve::Resolver;
use crate::battle::Resource;
use crate::config::GameConfig;
use crate::dice::DiceExpr;
use crate::state::{Ability, EntityId, Position, Statuses};

pub(super) fn dash(r: &mut Resolver<'_>, source: EntityId) -> Result<Vec<Effect>, ActionError> {
    let entity = r.actor(source)?;
    r.require(source, Resource::Action)?;
    Ok(vec![Effect::Dash(DashEffect {
        entity: source,
        extra_ft: entity.speed_ft,
    })])
}

pub(super) fn disengage(r: &mut Resolver<'_>, source: EntityId) -> Result<Vec<Effect>, ActionError> {
    r.actor(source)?;
    r.require(source, Resource::Action)?;
    Ok(vec![Effect::Disengage(source)])
}

pub(super) fn dodge(r: &mut Resolver<'_>, source: EntityId) -> Result<Vec<Effect>, ActionError> {
    r.actor(source)?;
    r.require(source, Resource::Action)?;
    Ok(vec![Effect::Dodge(source)])
}

/// Distracts an adjacent enemy so the helper's allies attack it with advantage.
pub(super) fn help(
    r: &mut Resolver<'_>,
    source: EntityId,
    target: EntityId,
) -> Result<Vec<Effect>, ActionError> {
    r.actor(source)?;
    if r.battle.is_none_or(|battle| !battle.is_member(source)) {
        return Err(ActionError::PreconditionViolation {
            entity: source,
            reason: "help is only available in battle",
        });
    }
    r.require(source, Resource::Action)?;
    r.other(source, target)?;
    if !r.hostile(source, target) {
        return Err(ActionError::InvalidTarget {
            target,
            reason: "help targets an enemy",
        });
    }
    r.within(source, target, GameConfig::MELEE_REACH_FT)?;
    Ok(vec![Effect::Help(HelpEffect { source, target })])
}

/// Stealth against the best passive perception among hostile observers.
/// With nobody watching the attempt always succeeds.
pub(super) fn hide(r: &mut Resolver<'_>, source: EntityId) -> Result<Vec<Effect>, ActionError> {
    let hider = r.actor(source)?;
    r.require(source, Resource::Action)?;
    let dc = r
        .world
        .entities
        .conscious()
        .filter(|observer| r.hostile(source, observer.id) && r.can_see(observer.id, source))
        .map(|observer| observer.passive_perception())
        .max();
    let stealth = DiceExpr::d20(hider.ability_modifier(Ability::Dexterity)).roll(r.dice);
    let success = dc.is_none_or(|dc| stealth.result() >= dc);
    Ok(vec![Effect::Hide(HideEffect {
        entity: source,
        stealth,
        dc,
        success,
    })])
}

/// Athletics against the defender's better of athletics and acrobatics.
/// Ties go to the defender.
fn contest(
    r: &mut Resolver<'_>,
    source: EntityId,
    target: EntityId,
    source_bonus: i32,
    target_bonus: i32,
) -> (ContestEffect, bool) {
    let source_roll = DiceExpr::d20(source_bonus).roll(r.dice);
    let target_roll = DiceExpr::d20(target_bonus).roll(r.dice);
    let success = source_roll.result() > target_roll.result();
    (
        ContestEffect {
            source,
            target,
            source_roll,
            target_roll,
        },
        success,
    )
}

fn adjacent_contest(
    r: &mut Resolver<'_>,
    source: EntityId,
    target: EntityId,
) -> Result<(ContestEffect, bool), ActionError> {
    let attacker = r.actor(source)?;
    r.require(source, Resource::Action)?;
    let defender = r.other(source, target)?;
    if attacker.size.steps_from(defender.size) > 1 && defender.size > attacker.size {
        return Err(ActionError::InvalidTarget {
            target,
            reason: "target is more than one size larger",
        });
    }
    r.within(source, target, GameConfig::MELEE_REACH_FT)?;
    Ok(contest(
        r,
        source,
        target,
        attacker.athletics(),
        defender.contest_defense(),
    ))
}

pub(super) fn grapple(
    r: &mut Resolver<'_>,
    source: EntityId,
    target: EntityId,
) -> Result<Vec<Effect>, ActionError> {
    if r
        .world
        .entity(target)
        .is_some_and(|t| t.grappled_by() == Some(source))
    {
        return Err(ActionError::InvalidTarget {
            target,
            reason: "target is already grappled",
        });
    }
    let (effect, success) = adjacent_contest(r, source, target)?;
    Ok(vec![if success {
        Effect::GrappleSuccess(effect)
    } else {
        Effect::GrappleFailure(effect)
    }])
}

pub(super) fn shove(
    r: &mut Resolver<'_>,
    source: EntityId,
    target: EntityId,
) -> Result<Vec<Effect>, ActionError> {
    let (effect, success) = adjacent_contest(r, source, target)?;
    Ok(vec![if success {
        Effect::ShoveSuccess(effect)
    } else {
        Effect::ShoveFailure(effect)
    }])
}

/// The grappled creature contests against its grappler's athletics.
pub(super) fn escape(r: &mut Resolver<'_>, source: EntityId) -> Result<Vec<Effect>, ActionError> {
    let escaper = r.actor(source)?;
    let grappler_id = escaper
        .grappled_by()
        .filter(|_| escaper.has_status(Statuses::GRAPPLED))
        .ok_or(ActionError::PreconditionViolation {
            entity: source,
            reason: "not grappled",
        })?;
    r.require(source, Resource::Action)?;
    let grappler = r
        .world
        .entity(grappler_id)
        .ok_or(ActionError::EntityNotFound(grappler_id))?;
    let (effect, success) = contest(
        r,
        source,
        grappler_id,
        escaper.contest_defense(),
        grappler.athletics(),
    );
    Ok(vec![if success {
        Effect::EscapeSuccess(effect)
    } else {
        Effect::EscapeFailure(effect)
    }])
}

/// Costs half the entity's speed in movement.
pub(super) fn stand_up(r: &mut Resolver<'_>, source: EntityId) -> Result<Vec<Effect>, ActionError> {
    let entity = r.actor(source)?;
    if !entity.has_status(Statuses::PRONE) {
        return Err(ActionError::PreconditionViolation {
            entity: source,
            reason: "not prone",
        });
    }
    let cost_ft = entity.speed_ft / 2;
    if let Some(ledger) = r.ledger(source)
        && ledger.movement_ft < cost_ft
    {
        return Err(ActionError::InsufficientResource {
            entity: source,
            resource: Resource::Movement,
        });
    }
    Ok(vec![Effect::StandUp(StandUpEffect {
        entity: source,
        cost_ft,
    })])
}

pub(super) fn drop_prone(r: &mut Resolver<'_>, source: EntityId) -> Result<Vec<Effect>, ActionError> {
    let entity = r.actor(source)?;
    if entity.has_status(Statuses::PRONE) {
        return Err(ActionError::PreconditionViolation {
            entity: source,
            reason: "already prone",
        });
    }
    Ok(vec![Effect::DropProne(source)])
}

/// Opens or closes an adjacent door. Uses the free object interaction when
/// available, otherwise the action.
pub(super) fn interact(
    r: &mut Resolver<'_>,
    source: EntityId,
    object: Position,
) -> Result<Vec<Effect>, ActionError> {
    r.actor(source)?;
    if r.require(source, Resource::FreeObjectInteraction).is_err() {
        r.require(source, Resource::Action)?;
    }
    let door = r
        .world
        .grid
        .object(object)
        .filter(|o| o.is_door())
        .ok_or(ActionError::NoObject(object))?;
    let footprint = r
        .world
        .footprint(source)
        .ok_or(ActionError::EntityNotFound(source))?;
    if !footprint.cells().any(|cell| cell.chebyshev(object) <= 1) {
        return Err(ActionError::OutOfRange {
            target: source,
            distance_ft: footprint
                .cells()
                .map(|cell| cell.chebyshev(object))
                .min()
                .unwrap_or(0)
                * GameConfig::FEET_PER_SQUARE,
            range_ft: GameConfig::MELEE_REACH_FT,
        });
    }
    let open = !door.is_open();
    if !open && !r.world.grid.occupants(object).is_empty() {
        return Err(ActionError::PreconditionViolation {
            entity: source,
            reason: "doorway is blocked",
        });
    }
    Ok(vec![Effect::DoorToggled(DoorEffect {
        entity: source,
        position: object,
        open,
    })])
}
