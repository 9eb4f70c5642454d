//! Battlefield listener feeding [`AiMemory`](super::AiMemory).

use tactics_core::battle::{EventContext, are_hostile};
use tactics_core::state::Footprint;
use tactics_core::{BattleEvent, EntityId, EntityKind, Position};
use tracing::debug;

use super::SharedMemory;

/// Builds a `Move` listener.
///
/// For every cell the mover walked through, each other conscious entity with
/// line of sight to it remembers where the mover was. An NPC outside the
/// battle that spots a hostile combatant this way is alerted and joins at the
/// next round.
pub fn movement_listener(
    memory: SharedMemory,
    sight_range: Option<u32>,
) -> impl FnMut(&BattleEvent, &mut EventContext<'_>) + 'static {
    move |event, ctx| {
        let BattleEvent::Move { mover, path } = event else {
            return;
        };
        let Some(size) = ctx.world.entity(*mover).map(|e| e.token_size()) else {
            return;
        };
        let mover_in_battle = ctx.battle.is_member(*mover)
            && ctx.world.entity(*mover).is_some_and(|e| e.is_conscious());

        let observers: Vec<(EntityId, Footprint, bool)> = ctx
            .world
            .entities
            .conscious()
            .filter(|e| e.id != *mover)
            .filter_map(|e| {
                let footprint = ctx.world.footprint(e.id)?;
                Some((e.id, footprint, e.kind == EntityKind::Npc))
            })
            .collect();

        for (observer, footprint, is_npc) in observers {
            if !are_hostile(ctx.world, Some(ctx.battle), observer, *mover) {
                continue;
            }
            let last_seen: Option<Position> = path
                .iter()
                .rev()
                .copied()
                .find(|&step| {
                    ctx.world
                        .grid
                        .footprints_see(footprint, Footprint::new(step, size), sight_range)
                });
            let Some(step) = last_seen else {
                continue;
            };
            memory.borrow_mut().record(observer, *mover, step);

            if is_npc && mover_in_battle && !ctx.battle.is_member(observer) {
                debug!(
                    target: "runtime::ai",
                    observer = %observer,
                    mover = %mover,
                    at = %step,
                    "spotted combatant"
                );
                ctx.alert(observer);
            }
        }
    }
}
