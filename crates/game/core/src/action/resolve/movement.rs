use crate::action::ActionError;
use crate::action::effect::{Effect, MoveEffect};
use crate::action::resolve::Resolver;
use crate::battle::Resource;
use crate::grid::Allegiance;
use crate::state::{EntityId, Position, Statuses};

/// Validates a walk along `path`; the first cell must be the mover's anchor.
pub(super) fn resolve(
    r: &mut Resolver<'_>,
    source: EntityId,
    path: &[Position],
) -> Result<Vec<Effect>, ActionError> {
    let mover = r.actor(source)?;
    if mover.has_status(Statuses::GRAPPLED) {
        return Err(ActionError::PreconditionViolation {
            entity: source,
            reason: "grappled creatures cannot move",
        });
    }
    let anchor = r
        .world
        .position_of(source)
        .ok_or(ActionError::EntityNotFound(source))?;
    let (Some(&start), Some(&end)) = (path.first(), path.last()) else {
        return Err(ActionError::InvalidPath {
            at: anchor,
            reason: "path is empty",
        });
    };
    if start != anchor {
        return Err(ActionError::InvalidPath {
            at: start,
            reason: "path does not start at the mover",
        });
    }
    if path.len() < 2 {
        return Err(ActionError::InvalidPath {
            at: start,
            reason: "path has no steps",
        });
    }

    let grid = &r.world.grid;
    let entities = &r.world.entities;
    let allegiance = r.battle.map(|battle| battle as &dyn Allegiance);
    for pair in path.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        if !from.is_adjacent(to) {
            return Err(ActionError::InvalidPath {
                at: to,
                reason: "steps must be adjacent",
            });
        }
        if !grid.is_passable(entities, source, to, allegiance) {
            return Err(ActionError::InvalidPath {
                at: to,
                reason: "cell is not passable",
            });
        }
    }
    if !grid.is_placeable(entities, source, end, allegiance) {
        return Err(ActionError::InvalidPath {
            at: end,
            reason: "destination is occupied",
        });
    }

    let cost_ft = grid.movement_cost_ft(entities, source, path);
    if let Some(ledger) = r.ledger(source)
        && ledger.movement_ft < cost_ft
    {
        return Err(ActionError::InsufficientResource {
            entity: source,
            resource: Resource::Movement,
        });
    }

    Ok(vec![Effect::Move(MoveEffect {
        mover: source,
        path: path.to_vec(),
        cost_ft,
    })])
}
