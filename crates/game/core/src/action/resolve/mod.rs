//! Resolution: every die is rolled and every rule is checked here, producing
//! an ordered list of effects. Nothing in this module mutates the world.

mod attack;
mod item;
mod maneuver;
mod movement;
mod spell;

use tracing::debug;

use crate::action::{Action, ActionError, Effect, Intent};
use crate::battle::{BattleEntityState, BattleState, Resource, are_hostile};
use crate::config::GameConfig;
use crate::content::ContentRepository;
use crate::dice::DiceRoller;
use crate::session::Session;
use crate::state::{Entity, EntityId, World};

/// An action together with the effects its resolution produced.
///
/// Applying consumes the value, so a resolution is applied at most once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedAction {
    pub(crate) action: Action,
    pub(crate) effects: Vec<Effect>,
}

impl ResolvedAction {
    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn is_hit(&self) -> bool {
        self.effects.iter().any(Effect::is_hit)
    }
}

impl Action {
    /// Rolls dice and evaluates legality against the current world.
    ///
    /// Given identical dice state the returned effects are identical.
    pub fn resolve(
        &self,
        world: &World,
        battle: Option<&BattleState>,
        session: &mut Session,
    ) -> Result<ResolvedAction, ActionError> {
        let (content, config, dice) = session.split();
        let mut resolver = Resolver {
            world,
            battle,
            content,
            config,
            dice,
        };
        let effects = resolver.resolve(self)?;
        debug!(
            target: "core::resolve",
            source = %self.source,
            kind = %self.kind(),
            effects = effects.len(),
            "resolved"
        );
        Ok(ResolvedAction {
            action: self.clone(),
            effects,
        })
    }
}

pub(crate) struct Resolver<'a> {
    pub world: &'a World,
    pub battle: Option<&'a BattleState>,
    pub content: &'a ContentRepository,
    pub config: &'a GameConfig,
    pub dice: &'a mut dyn DiceRoller,
}

impl<'a> Resolver<'a> {
    fn resolve(&mut self, action: &Action) -> Result<Vec<Effect>, ActionError> {
        let source = action.source;
        self.actor(source)?;
        if action.as_reaction {
            if !matches!(action.intent, Intent::Attack { .. } | Intent::CastSpell { .. }) {
                return Err(ActionError::PreconditionViolation {
                    entity: source,
                    reason: "only attacks and spells can be taken as reactions",
                });
            }
            self.require(source, Resource::Reaction)?;
        }

        match &action.intent {
            Intent::Attack { weapon, target } => {
                attack::resolve(self, source, weapon, *target, action.as_reaction)
            }
            Intent::Move { path } => movement::resolve(self, source, path),
            Intent::Dash => maneuver::dash(self, source),
            Intent::Disengage => maneuver::disengage(self, source),
            Intent::Dodge => maneuver::dodge(self, source),
            Intent::Help { target } => maneuver::help(self, source, *target),
            Intent::Hide => maneuver::hide(self, source),
            Intent::Grapple { target } => maneuver::grapple(self, source, *target),
            Intent::EscapeGrapple => maneuver::escape(self, source),
            Intent::Shove { target } => maneuver::shove(self, source, *target),
            Intent::StandUp => maneuver::stand_up(self, source),
            Intent::DropProne => maneuver::drop_prone(self, source),
            Intent::CastSpell { spell, target } => {
                spell::resolve(self, source, spell, *target, action.as_reaction)
            }
            Intent::UseItem { item, target } => item::resolve(self, source, item, *target),
            Intent::Interact { object } => maneuver::interact(self, source, *object),
        }
    }

    /// A conscious entity able to act.
    pub fn actor(&self, id: EntityId) -> Result<&'a Entity, ActionError> {
        let entity = self
            .world
            .entity(id)
            .ok_or(ActionError::EntityNotFound(id))?;
        if !entity.is_conscious() {
            return Err(ActionError::Incapacitated(id));
        }
        Ok(entity)
    }

    /// A living, placed entity other than `source`.
    pub fn other(&self, source: EntityId, target: EntityId) -> Result<&'a Entity, ActionError> {
        if source == target {
            return Err(ActionError::InvalidTarget {
                target,
                reason: "cannot target itself",
            });
        }
        self.living(target)
    }

    pub fn living(&self, target: EntityId) -> Result<&'a Entity, ActionError> {
        let entity = self
            .world
            .entity(target)
            .ok_or(ActionError::EntityNotFound(target))?;
        if entity.is_dead() {
            return Err(ActionError::InvalidTarget {
                target,
                reason: "target is dead",
            });
        }
        if self.world.position_of(target).is_none() {
            return Err(ActionError::InvalidTarget {
                target,
                reason: "target is not on the map",
            });
        }
        Ok(entity)
    }

    /// Ledger of `entity` while a battle is running and it takes part.
    pub fn ledger(&self, entity: EntityId) -> Option<&'a BattleEntityState> {
        self.battle
            .filter(|battle| battle.is_active())
            .and_then(|battle| battle.ledger(entity))
    }

    /// Outside a running battle resources are unlimited.
    pub fn require(&self, entity: EntityId, resource: Resource) -> Result<(), ActionError> {
        match self.ledger(entity) {
            Some(ledger) if !ledger.has(resource) => {
                Err(ActionError::InsufficientResource { entity, resource })
            }
            _ => Ok(()),
        }
    }

    pub fn distance_ft(&self, a: EntityId, b: EntityId) -> Result<u32, ActionError> {
        self.world
            .distance_ft(a, b)
            .ok_or(ActionError::InvalidTarget {
                target: b,
                reason: "target is not on the map",
            })
    }

    pub fn within(&self, source: EntityId, target: EntityId, range_ft: u32) -> Result<u32, ActionError> {
        let distance_ft = self.distance_ft(source, target)?;
        if distance_ft > range_ft {
            return Err(ActionError::OutOfRange {
                target,
                distance_ft,
                range_ft,
            });
        }
        Ok(distance_ft)
    }

    pub fn hostile(&self, a: EntityId, b: EntityId) -> bool {
        are_hostile(self.world, self.battle, a, b)
    }

    pub fn can_see(&self, observer: EntityId, target: EntityId) -> bool {
        self.world
            .can_see(observer, target, self.config.sight_range)
    }
}
