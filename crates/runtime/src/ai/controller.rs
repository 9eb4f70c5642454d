//! Heuristic combat AI.
//!
//! Each tick runs a four-way [`Selector`]: attack, approach any known enemy
//! (seen now or remembered), investigate a lead that cannot be approached,
//! or dodge. The controller keeps ticking
//! until a tick fails, the entity drops, the battle ends or the per-turn
//! action cap is reached.

use std::collections::BTreeSet;

use tactics_core::battle::{
    DefaultReactions, ReactionContext, ReactionHandler, ReactionTrigger, SubscriptionId,
    TargetQuery, are_hostile,
};
use tactics_core::content::{CastingTime, SpellEffect, SpellTarget};
use tactics_core::grid::Allegiance;
use tactics_core::state::Footprint;
use tactics_core::{
    Action, ActionError, Battle, BattleEntityState, BattleState, EntityId, GameConfig, Intent,
    PathFinder, Position, Resource, Session, World,
};
use tracing::{debug, warn};

use super::behavior::{Behavior, Selector, Status};
use super::listener::movement_listener;
use super::memory::{AiMemory, SharedMemory};
use crate::controller::TurnController;
use crate::error::Result;

/// Blackboard for one AI turn.
pub struct AiContext<'a> {
    pub entity: EntityId,
    pub battle: &'a mut Battle,
    pub world: &'a mut World,
    pub session: &'a mut Session,
    pub memory: &'a SharedMemory,
    pub sight_range: Option<u32>,
}

impl AiContext<'_> {
    fn ledger(&self) -> Option<&BattleEntityState> {
        self.battle.state().ledger(self.entity)
    }

    fn has(&self, resource: Resource) -> bool {
        self.ledger().is_some_and(|ledger| ledger.has(resource))
    }

    fn movement_ft(&self) -> u32 {
        self.ledger().map_or(0, |ledger| ledger.movement_ft)
    }

    /// Still this entity's turn and still standing.
    pub fn can_act(&self) -> bool {
        self.battle.state().current() == Some(self.entity)
            && !self.battle.battle_ends(self.world)
            && self
                .world
                .entity(self.entity)
                .is_some_and(|e| e.is_conscious())
    }

    fn is_enemy(&self, other: EntityId) -> bool {
        are_hostile(self.world, Some(self.battle.state()), self.entity, other)
    }

    /// Conscious hostiles in line of sight, in id order.
    pub fn visible_enemies(&self) -> Vec<EntityId> {
        self.world
            .entities
            .conscious()
            .map(|e| e.id)
            .filter(|&id| self.is_enemy(id))
            .filter(|&id| self.world.can_see(self.entity, id, self.sight_range))
            .collect()
    }

    /// Direct sight scan of the whole map; refreshes memory with every
    /// enemy currently visible.
    pub fn observe_enemies(&mut self) {
        let seen: Vec<(EntityId, Position)> = self
            .visible_enemies()
            .into_iter()
            .filter_map(|id| Some((id, self.world.position_of(id)?)))
            .collect();
        let mut memory = self.memory.borrow_mut();
        for (enemy, position) in seen {
            memory.record(self.entity, enemy, position);
        }
        for (enemy, _) in memory.known(self.entity) {
            if self.world.entity(enemy).is_none_or(|e| e.is_dead()) {
                memory.forget(self.entity, enemy);
            }
        }
    }

    /// Remembered positions of enemies not in sight right now, nearest first.
    pub fn remembered_leads(&self) -> Vec<(EntityId, Position)> {
        let Some(here) = self.world.position_of(self.entity) else {
            return Vec::new();
        };
        let visible: BTreeSet<EntityId> = self.visible_enemies().into_iter().collect();
        let mut leads: Vec<(EntityId, Position)> = self
            .memory
            .borrow()
            .known(self.entity)
            .into_iter()
            .filter(|(enemy, _)| !visible.contains(enemy))
            .collect();
        leads.sort_by_key(|&(enemy, at)| (here.chebyshev(at), enemy));
        leads
    }

    fn perform(&mut self, intent: Intent) -> std::result::Result<(), ActionError> {
        let action = Action::new(self.entity, intent);
        self.battle
            .perform(self.world, self.session, &action)
            .map(|_| ())
    }

    /// Attack intents this entity can produce, each with its reach in feet.
    fn attack_options(&self) -> Vec<(u32, AttackOption)> {
        let Some(entity) = self.world.entity(self.entity) else {
            return Vec::new();
        };
        let content = self.session.content();
        let mut options: Vec<(u32, AttackOption)> = entity
            .equipped
            .iter()
            .filter_map(|name| {
                let weapon = content.weapon(name).ok()?;
                Some((weapon.range_ft, AttackOption::Weapon(name.clone())))
            })
            .collect();

        if let Some(caster) = &entity.profiles.spellcaster {
            for name in &caster.spells {
                let Ok(spell) = content.spell(name) else {
                    continue;
                };
                let offensive = spell.target == SpellTarget::Enemy
                    && spell.casting_time == CastingTime::Action
                    && !matches!(spell.effect, SpellEffect::Heal { .. });
                let castable = spell.level == 0 || entity.slots_at(spell.level) > 0;
                if offensive && castable {
                    options.push((spell.range_ft, AttackOption::Spell(name.clone())));
                }
            }
        }
        options
    }

    /// Walks toward the closest of `destinations`, clamped to the movement
    /// left this turn. With `dash`, an exhausted mover spends its action on a
    /// dash first.
    fn move_toward(&mut self, destinations: &BTreeSet<Position>, dash: bool) -> Status {
        let Some(path) = self.plan_path(destinations) else {
            return Status::Failure;
        };
        if path.len() <= 1 {
            return Status::Failure;
        }

        if dash && self.movement_ft() < GameConfig::FEET_PER_SQUARE && self.has(Resource::Action) {
            if let Err(err) = self.perform(Intent::Dash) {
                warn!(target: "runtime::ai", entity = %self.entity, error = %err, "dash rejected");
                return Status::Failure;
            }
        }

        let clamped = clamp_path(self.world, self.battle.state(), self.entity, &path, self.movement_ft());
        if clamped.len() <= 1 {
            debug!(target: "runtime::ai", entity = %self.entity, "no progress possible");
            return Status::Failure;
        }
        match self.perform(Intent::Move { path: clamped }) {
            Ok(()) => Status::Success,
            Err(err) => {
                warn!(target: "runtime::ai", entity = %self.entity, error = %err, "move rejected");
                Status::Failure
            }
        }
    }

    fn plan_path(&self, destinations: &BTreeSet<Position>) -> Option<Vec<Position>> {
        let start = self.world.position_of(self.entity)?;
        let battle: &dyn Allegiance = self.battle.state();
        let finder = PathFinder::new(&self.world.grid, &self.world.entities).with_allegiance(battle);
        let field = finder.distance_field(self.entity, start, None);
        let (destination, _) = destinations
            .iter()
            .filter(|&&cell| {
                self.world
                    .grid
                    .is_placeable(&self.world.entities, self.entity, cell, Some(battle))
            })
            .filter_map(|&cell| Some((cell, field.distance(cell)?)))
            .min_by_key(|&(cell, distance)| (distance, cell))?;
        finder.reconstruct(&field, destination)
    }
}

#[derive(Clone, Debug)]
enum AttackOption {
    Weapon(String),
    Spell(String),
}

impl AttackOption {
    fn intent(&self, target: EntityId) -> Intent {
        match self {
            Self::Weapon(weapon) => Intent::Attack {
                weapon: weapon.clone(),
                target,
            },
            Self::Spell(spell) => Intent::CastSpell {
                spell: spell.clone(),
                target,
            },
        }
    }
}

/// Longest prefix of `path` that fits in `budget_ft` and ends on a cell the
/// mover may stop in.
fn clamp_path(
    world: &World,
    battle: &BattleState,
    mover: EntityId,
    path: &[Position],
    budget_ft: u32,
) -> Vec<Position> {
    let mut clamped = Vec::with_capacity(path.len());
    clamped.extend(path.first().copied());
    let mut spent = 0;
    for &cell in path.iter().skip(1) {
        spent += world.grid.step_cost(&world.entities, mover, cell) * GameConfig::FEET_PER_SQUARE;
        if spent > budget_ft {
            break;
        }
        clamped.push(cell);
    }
    while clamped.len() > 1
        && clamped.last().is_some_and(|&end| {
            !world
                .grid
                .is_placeable(&world.entities, mover, end, Some(battle as &dyn Allegiance))
        })
    {
        clamped.pop();
    }
    clamped
}

/// Anchors from which a `size` mover would stand next to `target`.
fn cells_adjacent_to(world: &World, target: Footprint, size: u32) -> BTreeSet<Position> {
    let reach = size as i32;
    let span = target.size as i32;
    let mut cells = BTreeSet::new();
    for y in target.anchor.y - reach..=target.anchor.y + span {
        for x in target.anchor.x - reach..=target.anchor.x + span {
            let anchor = Position::new(x, y);
            if world.grid.in_bounds(anchor) && Footprint::new(anchor, size).distance(target) == 1 {
                cells.insert(anchor);
            }
        }
    }
    cells
}

/// Hits the weakest enemy reachable by the first option that has one.
struct AttackNode;

impl<'a> Behavior<AiContext<'a>> for AttackNode {
    fn tick(&self, ctx: &mut AiContext<'a>) -> Status {
        for (range_ft, option) in ctx.attack_options() {
            let query = TargetQuery::enemies(range_ft).with_sight_range(ctx.sight_range);
            let target = ctx
                .battle
                .valid_targets(ctx.world, ctx.entity, &query)
                .into_iter()
                .filter_map(|id| {
                    let enemy = ctx.world.entity(id)?;
                    enemy.is_conscious().then(|| (enemy.hit_points(), id))
                })
                .min();
            let Some((_, target)) = target else {
                continue;
            };
            match ctx.perform(option.intent(target)) {
                Ok(()) => return Status::Success,
                Err(err) => {
                    debug!(
                        target: "runtime::ai",
                        entity = %ctx.entity,
                        option = ?option,
                        error = %err,
                        "attack option skipped"
                    );
                }
            }
        }
        Status::Failure
    }
}

/// Closes to melee with the nearest known enemy, dashing if needed. A
/// remembered enemy is approached where it was last seen.
struct ApproachNode;

impl<'a> Behavior<AiContext<'a>> for ApproachNode {
    fn tick(&self, ctx: &mut AiContext<'a>) -> Status {
        let Some(size) = ctx.world.entity(ctx.entity).map(|e| e.token_size()) else {
            return Status::Failure;
        };
        let mut targets: Vec<Footprint> = ctx
            .visible_enemies()
            .into_iter()
            .filter_map(|enemy| ctx.world.footprint(enemy))
            .collect();
        let here = ctx.world.position_of(ctx.entity);
        for (enemy, at) in ctx.remembered_leads() {
            // standing beside the sighting without seeing anyone: stale
            if here.is_some_and(|here| here.chebyshev(at) <= 1) {
                ctx.memory.borrow_mut().forget(ctx.entity, enemy);
                continue;
            }
            let span = ctx.world.entity(enemy).map_or(1, |e| e.token_size());
            targets.push(Footprint::new(at, span));
        }
        let destinations: BTreeSet<Position> = targets
            .into_iter()
            .flat_map(|footprint| cells_adjacent_to(ctx.world, footprint, size))
            .collect();
        if destinations.is_empty() {
            return Status::Failure;
        }
        ctx.move_toward(&destinations, true)
    }
}

/// Fallback for leads the approach could not use: walks onto or beside the
/// last sighting and drops leads that turn out stale.
struct InvestigateNode;

impl<'a> Behavior<AiContext<'a>> for InvestigateNode {
    fn tick(&self, ctx: &mut AiContext<'a>) -> Status {
        let Some(here) = ctx.world.position_of(ctx.entity) else {
            return Status::Failure;
        };
        for (enemy, at) in ctx.remembered_leads() {
            if here.chebyshev(at) <= 1 {
                ctx.memory.borrow_mut().forget(ctx.entity, enemy);
                continue;
            }
            let destinations: BTreeSet<Position> =
                std::iter::once(at).chain(at.neighbors()).collect();
            let status = ctx.move_toward(&destinations, false);
            if status.is_success() {
                let arrived = ctx
                    .world
                    .position_of(ctx.entity)
                    .is_some_and(|now| now.chebyshev(at) <= 1);
                if arrived {
                    ctx.memory.borrow_mut().forget(ctx.entity, enemy);
                }
            }
            return status;
        }
        Status::Failure
    }
}

struct DodgeNode;

impl<'a> Behavior<AiContext<'a>> for DodgeNode {
    fn tick(&self, ctx: &mut AiContext<'a>) -> Status {
        if !ctx.has(Resource::Action) {
            return Status::Failure;
        }
        ctx.perform(Intent::Dodge).is_ok().into()
    }
}

fn decision_tree<'a>() -> Selector<AiContext<'a>> {
    let children: Vec<Box<dyn Behavior<AiContext<'a>>>> = vec![
        Box::new(AttackNode),
        Box::new(ApproachNode),
        Box::new(InvestigateNode),
        Box::new(DodgeNode),
    ];
    Selector::new(children)
}

/// Drives every entity it is installed for with the heuristic above.
///
/// One controller keeps one memory; give each side its own controller so
/// they do not share what they have seen.
#[derive(Default)]
pub struct AiController {
    memory: SharedMemory,
}

impl AiController {
    pub fn new() -> Self {
        Self {
            memory: AiMemory::shared(),
        }
    }

    pub fn memory(&self) -> &SharedMemory {
        &self.memory
    }
}

impl TurnController for AiController {
    fn attach(&mut self, battle: &mut Battle, config: &GameConfig) -> Vec<SubscriptionId> {
        vec![battle.subscribe(
            tactics_core::EventKind::Move,
            movement_listener(self.memory.clone(), config.sight_range),
        )]
    }

    fn install(&mut self, battle: &mut Battle, entity: EntityId) {
        battle.set_reaction_handler(
            entity,
            AiReactions {
                memory: self.memory.clone(),
                fallback: DefaultReactions,
            },
        );
    }

    fn take_turn(
        &mut self,
        battle: &mut Battle,
        world: &mut World,
        session: &mut Session,
        entity: EntityId,
    ) -> Result<()> {
        let limit = session.config().ai_actions_per_turn;
        let sight_range = session.config().sight_range;
        let tree = decision_tree();
        let mut ctx = AiContext {
            entity,
            battle,
            world,
            session,
            memory: &self.memory,
            sight_range,
        };

        for tick in 0..limit {
            if !ctx.can_act() {
                break;
            }
            ctx.observe_enemies();
            if tree.tick(&mut ctx).is_failure() {
                debug!(target: "runtime::ai", entity = %entity, tick, "nothing left to do");
                break;
            }
        }
        Ok(())
    }
}

/// Remembers who hurt us, then reacts like [`DefaultReactions`].
pub struct AiReactions {
    memory: SharedMemory,
    fallback: DefaultReactions,
}

impl ReactionHandler for AiReactions {
    fn react(&mut self, context: &ReactionContext<'_>) -> Option<Action> {
        if let ReactionTrigger::Damaged { attacker } = context.trigger
            && let Some(at) = context.world.position_of(attacker)
        {
            self.memory
                .borrow_mut()
                .record(context.entity, attacker, at);
        }
        self.fallback.react(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactics_core::state::{Entity, EntityKind};
    use tactics_core::Grid;

    fn walker() -> (World, EntityId) {
        let mut world = World::new(Grid::from_rows(&["......", "......", "......"]));
        let id = world
            .spawn(Entity::new("walker", EntityKind::Npc), Position::new(0, 1))
            .unwrap();
        (world, id)
    }

    #[test]
    fn clamp_respects_the_budget() {
        let (world, id) = walker();
        let path: Vec<Position> = (0..6).map(|x| Position::new(x, 1)).collect();
        let clamped = clamp_path(&world, &BattleState::default(), id, &path, 15);
        assert_eq!(clamped.len(), 4);
        assert_eq!(clamped.last(), Some(&Position::new(3, 1)));

        let stuck = clamp_path(&world, &BattleState::default(), id, &path, 0);
        assert_eq!(stuck, vec![Position::new(0, 1)]);
    }

    #[test]
    fn adjacent_cells_ring_the_target() {
        let (world, _) = walker();
        let ring = cells_adjacent_to(&world, Footprint::new(Position::new(3, 1), 1), 1);
        assert_eq!(ring.len(), 8);
        assert!(!ring.contains(&Position::new(3, 1)));
        assert!(ring.contains(&Position::new(2, 0)));
    }
}
