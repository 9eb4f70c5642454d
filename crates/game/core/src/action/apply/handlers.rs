//! Handlers for the effects that do not need a module of their own.

use crate::action::apply::{ApplyContext, EffectHandler};
use crate::action::{ActionError, Effect, EffectTag};
use crate::battle::{BattleEvent, TargetEffect};
use crate::state::{DeathSaves, Statuses};

#[derive(Clone, Copy, Debug, Default)]
pub struct MissHandler;

impl EffectHandler for MissHandler {
    fn handles(&self) -> &'static [EffectTag] {
        &[EffectTag::Miss, EffectTag::SpellMiss]
    }

    fn apply(&self, effect: &Effect, ctx: &mut ApplyContext<'_>) -> Result<(), ActionError> {
        if let Effect::Miss(miss) | Effect::SpellMiss(miss) = effect {
            ctx.publish(BattleEvent::Miss {
                source: miss.source,
                target: miss.target,
                origin: miss.origin.clone(),
                attack_roll: miss.attack_roll.as_ref().map(|roll| roll.result()),
            });
        }
        Ok(())
    }
}

/// Dash, disengage, dodge, standing up and dropping prone.
#[derive(Clone, Copy, Debug, Default)]
pub struct StanceHandler;

impl EffectHandler for StanceHandler {
    fn handles(&self) -> &'static [EffectTag] {
        &[
            EffectTag::Dash,
            EffectTag::Disengage,
            EffectTag::Dodge,
            EffectTag::StandUp,
            EffectTag::DropProne,
        ]
    }

    fn apply(&self, effect: &Effect, ctx: &mut ApplyContext<'_>) -> Result<(), ActionError> {
        match effect {
            Effect::Dash(dash) => {
                if let Some(ledger) = ctx.ledger_mut(dash.entity) {
                    ledger.movement_ft += dash.extra_ft;
                }
                ctx.publish(BattleEvent::Dash {
                    entity: dash.entity,
                });
            }
            Effect::Disengage(entity) => {
                ctx.tx
                    .insert_status(ctx.world, *entity, Statuses::DISENGAGED)?;
                ctx.publish(BattleEvent::Disengage { entity: *entity });
            }
            Effect::Dodge(entity) => {
                ctx.tx.insert_status(ctx.world, *entity, Statuses::DODGE)?;
                ctx.publish(BattleEvent::Dodge { entity: *entity });
            }
            Effect::StandUp(stand) => {
                ctx.tx
                    .remove_status(ctx.world, stand.entity, Statuses::PRONE)?;
                if let Some(ledger) = ctx.ledger_mut(stand.entity) {
                    ledger.spend_movement(stand.cost_ft);
                }
                ctx.publish(BattleEvent::StandUp {
                    entity: stand.entity,
                });
            }
            Effect::DropProne(entity) => {
                ctx.tx.insert_status(ctx.world, *entity, Statuses::PRONE)?;
                ctx.publish(BattleEvent::Prone { entity: *entity });
            }
            _ => {}
        }
        Ok(())
    }
}

/// Records the grant on the target's ledger, keyed by the helper.
#[derive(Clone, Copy, Debug, Default)]
pub struct HelpHandler;

impl EffectHandler for HelpHandler {
    fn handles(&self) -> &'static [EffectTag] {
        &[EffectTag::Help]
    }

    fn apply(&self, effect: &Effect, ctx: &mut ApplyContext<'_>) -> Result<(), ActionError> {
        let Effect::Help(help) = effect else {
            return Ok(());
        };
        if let Some(ledger) = ctx.ledger_mut(help.target) {
            ledger.target_effects.insert(help.source, TargetEffect::Helped);
        }
        ctx.publish(BattleEvent::Help {
            source: help.source,
            target: help.target,
        });
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct HideHandler;

impl EffectHandler for HideHandler {
    fn handles(&self) -> &'static [EffectTag] {
        &[EffectTag::Hide]
    }

    fn apply(&self, effect: &Effect, ctx: &mut ApplyContext<'_>) -> Result<(), ActionError> {
        let Effect::Hide(hide) = effect else {
            return Ok(());
        };
        if hide.success {
            ctx.tx
                .insert_status(ctx.world, hide.entity, Statuses::HIDDEN)?;
        }
        ctx.publish(BattleEvent::Hide {
            entity: hide.entity,
            success: hide.success,
        });
        Ok(())
    }
}

/// Grapple, escape and shove outcomes.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContestHandler;

impl EffectHandler for ContestHandler {
    fn handles(&self) -> &'static [EffectTag] {
        &[
            EffectTag::GrappleSuccess,
            EffectTag::GrappleFailure,
            EffectTag::EscapeSuccess,
            EffectTag::EscapeFailure,
            EffectTag::ShoveSuccess,
            EffectTag::ShoveFailure,
        ]
    }

    fn apply(&self, effect: &Effect, ctx: &mut ApplyContext<'_>) -> Result<(), ActionError> {
        match effect {
            Effect::GrappleSuccess(c) => {
                ctx.tx.insert_status(ctx.world, c.target, Statuses::GRAPPLED)?;
                ctx.tx.set_grappled_by(ctx.world, c.target, Some(c.source))?;
                ctx.publish(BattleEvent::Grapple {
                    source: c.source,
                    target: c.target,
                    success: true,
                });
            }
            Effect::GrappleFailure(c) => ctx.publish(BattleEvent::Grapple {
                source: c.source,
                target: c.target,
                success: false,
            }),
            Effect::EscapeSuccess(c) => {
                ctx.tx.remove_status(ctx.world, c.source, Statuses::GRAPPLED)?;
                ctx.tx.set_grappled_by(ctx.world, c.source, None)?;
                ctx.publish(BattleEvent::Escape {
                    entity: c.source,
                    grappler: c.target,
                    success: true,
                });
            }
            Effect::EscapeFailure(c) => ctx.publish(BattleEvent::Escape {
                entity: c.source,
                grappler: c.target,
                success: false,
            }),
            Effect::ShoveSuccess(c) => {
                ctx.tx.insert_status(ctx.world, c.target, Statuses::PRONE)?;
                ctx.publish(BattleEvent::Shove {
                    source: c.source,
                    target: c.target,
                    success: true,
                });
                ctx.publish(BattleEvent::Prone { entity: c.target });
            }
            Effect::ShoveFailure(c) => ctx.publish(BattleEvent::Shove {
                source: c.source,
                target: c.target,
                success: false,
            }),
            _ => {}
        }
        Ok(())
    }
}

/// Healing is capped at maximum hp. Any healing wakes a dying creature.
#[derive(Clone, Copy, Debug, Default)]
pub struct HealHandler;

impl EffectHandler for HealHandler {
    fn handles(&self) -> &'static [EffectTag] {
        &[EffectTag::Heal]
    }

    fn apply(&self, effect: &Effect, ctx: &mut ApplyContext<'_>) -> Result<(), ActionError> {
        let Effect::Heal(heal) = effect else {
            return Ok(());
        };
        let target = ctx
            .world
            .entity(heal.target)
            .ok_or(ActionError::EntityNotFound(heal.target))?;
        if target.is_dead() {
            return Ok(());
        }
        let (current, max, down) = (
            target.hit_points(),
            target.max_hit_points,
            target.is_unconscious(),
        );
        let healed = (current + heal.amount).min(max);
        ctx.tx.set_hit_points(ctx.world, heal.target, healed)?;
        if down && healed > 0 {
            ctx.tx.remove_status(
                ctx.world,
                heal.target,
                Statuses::UNCONSCIOUS | Statuses::STABLE,
            )?;
            ctx.tx
                .set_death_saves(ctx.world, heal.target, DeathSaves::default())?;
        }
        ctx.publish(BattleEvent::Heal {
            source: heal.source,
            target: heal.target,
            amount: healed - current,
        });
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct InventoryHandler;

impl EffectHandler for InventoryHandler {
    fn handles(&self) -> &'static [EffectTag] {
        &[EffectTag::ItemConsumed]
    }

    fn apply(&self, effect: &Effect, ctx: &mut ApplyContext<'_>) -> Result<(), ActionError> {
        let Effect::ItemConsumed(used) = effect else {
            return Ok(());
        };
        ctx.tx.adjust_item(ctx.world, used.entity, &used.item, -1)?;
        ctx.publish(BattleEvent::ItemUsed {
            entity: used.entity,
            item: used.item.clone(),
        });
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SlotHandler;

impl EffectHandler for SlotHandler {
    fn handles(&self) -> &'static [EffectTag] {
        &[EffectTag::SlotExpended]
    }

    fn apply(&self, effect: &Effect, ctx: &mut ApplyContext<'_>) -> Result<(), ActionError> {
        if let Effect::SlotExpended(slot) = effect {
            ctx.tx.expend_slot(ctx.world, slot.entity, slot.level)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DoorHandler;

impl EffectHandler for DoorHandler {
    fn handles(&self) -> &'static [EffectTag] {
        &[EffectTag::DoorToggled]
    }

    fn apply(&self, effect: &Effect, ctx: &mut ApplyContext<'_>) -> Result<(), ActionError> {
        let Effect::DoorToggled(door) = effect else {
            return Ok(());
        };
        ctx.tx.set_door(ctx.world, door.position, door.open)?;
        ctx.publish(BattleEvent::DoorToggled {
            entity: door.entity,
            position: door.position,
            open: door.open,
        });
        Ok(())
    }
}
