use tracing::debug;

use crate::action::apply::{ApplyContext, EffectHandler};
use crate::action::{ActionError, Effect, EffectTag, MoveEffect};
use crate::battle::{BattleEvent, ReactionTrigger};
use crate::state::{EntityId, Position};

/// Walks the path one step at a time so opportunity attacks land mid-move.
///
/// If a reaction drops the mover, the walk stops where it was hit and the
/// movement already spent is the only movement paid.
#[derive(Clone, Copy, Debug, Default)]
pub struct MoveHandler;

impl EffectHandler for MoveHandler {
    fn handles(&self) -> &'static [EffectTag] {
        &[EffectTag::Move]
    }

    fn apply(&self, effect: &Effect, ctx: &mut ApplyContext<'_>) -> Result<(), ActionError> {
        let Effect::Move(MoveEffect { mover, path, cost_ft }) = effect else {
            return Ok(());
        };
        let mover = *mover;
        let mut walked: Vec<Position> = Vec::with_capacity(path.len());
        walked.extend(path.first().copied());

        for pair in path.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            provoke(ctx, mover, from, to)?;
            let standing = ctx
                .world
                .entity(mover)
                .is_some_and(|entity| entity.is_conscious());
            if !standing {
                debug!(target: "core::apply", entity = %mover, at = %from, "movement cut short");
                break;
            }
            ctx.tx.move_entity(ctx.world, mover, to)?;
            walked.push(to);
        }

        let spent = if walked.len() == path.len() {
            *cost_ft
        } else {
            ctx.world
                .grid
                .movement_cost_ft(&ctx.world.entities, mover, &walked)
        };
        if let Some(ledger) = ctx.ledger_mut(mover) {
            ledger.spend_movement(spent);
        }
        if walked.len() > 1 {
            ctx.publish(BattleEvent::Move {
                mover,
                path: walked,
            });
        }
        Ok(())
    }
}

/// Offers an opportunity attack to everyone whose reach the step leaves.
fn provoke(
    ctx: &mut ApplyContext<'_>,
    mover: EntityId,
    from: Position,
    to: Position,
) -> Result<(), ActionError> {
    let Some(battle) = ctx.battle.as_deref() else {
        return Ok(());
    };
    let attackers =
        battle.opportunity_attackers(ctx.world, ctx.session.content(), mover, from, to);
    for attacker in attackers {
        let still_up = ctx
            .world
            .entity(mover)
            .is_some_and(|entity| entity.is_conscious());
        if !still_up {
            break;
        }
        let Some(battle) = ctx.battle.as_deref_mut() else {
            break;
        };
        let trigger = ReactionTrigger::OpportunityAttack { mover };
        let Some(action) =
            battle.request_reaction(ctx.world, ctx.session.content(), attacker, trigger)
        else {
            continue;
        };
        ctx.publish(BattleEvent::OpportunityAttack { attacker, mover });
        ctx.cascade(&action)?;
    }
    Ok(())
}
