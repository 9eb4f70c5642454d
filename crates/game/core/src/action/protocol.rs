//! Pull-based parameter protocol.
//!
//! [`ActionKind::build`] starts an action for a source entity. While the
//! result is [`Continuation::Pending`], the caller asks the pending action
//! for its [`ParameterRequest`], picks a [`ParameterValue`] (from a UI, an AI
//! or a test script) and feeds it to [`PendingAction::advance`]. Supplying
//! `None` cancels. The state machine holds no references, so a pending action
//! can be stored and resumed later.

use crate::action::{Action, ActionError, ActionKind, Intent};
use crate::battle::{BattleState, Relations, TargetQuery, valid_targets};
use crate::config::GameConfig;
use crate::content::{CastingTime, ContentRepository, SpellTarget};
use crate::state::{EntityId, Position, World};

/// What the caller must supply next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParameterRequest {
    SelectTarget {
        relations: Relations,
        range_ft: u32,
        ignore_los: bool,
        /// Targets satisfying the filters right now.
        options: Vec<EntityId>,
    },
    SelectWeapon {
        options: Vec<String>,
    },
    SelectSpell {
        options: Vec<String>,
    },
    SelectItem {
        options: Vec<String>,
    },
    /// A path of anchor cells starting at the mover. `budget_ft` is the
    /// movement left when a battle is running.
    MovementPath {
        budget_ft: Option<u32>,
    },
    SelectObject {
        options: Vec<Position>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParameterValue {
    Target(EntityId),
    Weapon(String),
    Spell(String),
    Item(String),
    Path(Vec<Position>),
    Object(Position),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttackStage {
    AwaitingWeapon,
    AwaitingTarget { weapon: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpellStage {
    AwaitingSpell,
    AwaitingTarget { spell: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemStage {
    AwaitingItem,
    AwaitingTarget { item: String },
}

/// Single-target maneuvers against an adjacent enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Maneuver {
    Help,
    Grapple,
    Shove,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    Attack(AttackStage),
    Spell(SpellStage),
    Item(ItemStage),
    Maneuver(Maneuver),
    Move,
    Interact,
}

impl Stage {
    fn expected(&self) -> &'static str {
        match self {
            Self::Attack(AttackStage::AwaitingWeapon) => "weapon",
            Self::Spell(SpellStage::AwaitingSpell) => "spell",
            Self::Item(ItemStage::AwaitingItem) => "item",
            Self::Attack(AttackStage::AwaitingTarget { .. })
            | Self::Spell(SpellStage::AwaitingTarget { .. })
            | Self::Item(ItemStage::AwaitingTarget { .. })
            | Self::Maneuver(_) => "target",
            Self::Move => "path",
            Self::Interact => "object",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingAction {
    pub source: EntityId,
    pub as_reaction: bool,
    pub stage: Stage,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Continuation {
    Pending(PendingAction),
    Ready(Action),
    Cancelled,
}

impl ActionKind {
    /// Starts the parameter protocol. Kinds without parameters are ready at once.
    pub fn build(self, source: EntityId) -> Continuation {
        let pending = |stage| {
            Continuation::Pending(PendingAction {
                source,
                as_reaction: false,
                stage,
            })
        };
        let ready = |intent| Continuation::Ready(Action::new(source, intent));
        match self {
            Self::Attack => pending(Stage::Attack(AttackStage::AwaitingWeapon)),
            Self::CastSpell => pending(Stage::Spell(SpellStage::AwaitingSpell)),
            Self::UseItem => pending(Stage::Item(ItemStage::AwaitingItem)),
            Self::Help => pending(Stage::Maneuver(Maneuver::Help)),
            Self::Grapple => pending(Stage::Maneuver(Maneuver::Grapple)),
            Self::Shove => pending(Stage::Maneuver(Maneuver::Shove)),
            Self::Move => pending(Stage::Move),
            Self::Interact => pending(Stage::Interact),
            Self::Dash => ready(Intent::Dash),
            Self::Disengage => ready(Intent::Disengage),
            Self::Dodge => ready(Intent::Dodge),
            Self::Hide => ready(Intent::Hide),
            Self::EscapeGrapple => ready(Intent::EscapeGrapple),
            Self::StandUp => ready(Intent::StandUp),
            Self::DropProne => ready(Intent::DropProne),
        }
    }
}

impl PendingAction {
    pub fn as_reaction(mut self) -> Self {
        self.as_reaction = true;
        self
    }

    /// Describes the parameter this stage waits for, with the currently
    /// legal options filled in.
    pub fn request(
        &self,
        world: &World,
        battle: Option<&BattleState>,
        content: &ContentRepository,
        config: &GameConfig,
    ) -> Result<ParameterRequest, ActionError> {
        let source = world
            .entity(self.source)
            .ok_or(ActionError::EntityNotFound(self.source))?;
        let select_target = |query: TargetQuery| {
            let query = query.with_sight_range(config.sight_range);
            ParameterRequest::SelectTarget {
                relations: query.relations,
                range_ft: query.range_ft,
                ignore_los: query.ignore_los,
                options: valid_targets(world, battle, self.source, &query),
            }
        };

        let request = match &self.stage {
            Stage::Attack(AttackStage::AwaitingWeapon) => ParameterRequest::SelectWeapon {
                options: source
                    .equipped
                    .iter()
                    .filter(|name| content.weapon(name).is_ok())
                    .cloned()
                    .collect(),
            },
            Stage::Attack(AttackStage::AwaitingTarget { weapon }) => {
                let weapon = content.weapon(weapon)?;
                select_target(TargetQuery::enemies(weapon.max_range_ft()))
            }
            Stage::Spell(SpellStage::AwaitingSpell) => {
                let known = source
                    .profiles
                    .spellcaster
                    .as_ref()
                    .map(|profile| profile.spells.as_slice())
                    .unwrap_or_default();
                let mut options = Vec::new();
                for name in known {
                    let spell = content.spell(name)?;
                    let timing_ok =
                        self.as_reaction == (spell.casting_time == CastingTime::Reaction);
                    if timing_ok && source.slots_at(spell.level) > 0 {
                        options.push(name.clone());
                    }
                }
                ParameterRequest::SelectSpell { options }
            }
            Stage::Spell(SpellStage::AwaitingTarget { spell }) => {
                let spell = content.spell(spell)?;
                select_target(match spell.target {
                    SpellTarget::Enemy => TargetQuery::enemies(spell.range_ft),
                    SpellTarget::Ally => TargetQuery::allies(spell.range_ft),
                })
            }
            Stage::Item(ItemStage::AwaitingItem) => ParameterRequest::SelectItem {
                options: source
                    .inventory()
                    .iter()
                    .filter(|(name, count)| *count > 0 && content.has_item(name))
                    .map(|(name, _)| name.to_owned())
                    .collect(),
            },
            Stage::Item(ItemStage::AwaitingTarget { item }) => {
                let item = content.item(item)?;
                select_target(TargetQuery::allies(item.range_ft))
            }
            Stage::Maneuver(_) => select_target(TargetQuery::melee()),
            Stage::Move => ParameterRequest::MovementPath {
                budget_ft: battle
                    .filter(|b| b.is_active())
                    .and_then(|b| b.ledger(self.source))
                    .map(|ledger| ledger.movement_ft),
            },
            Stage::Interact => ParameterRequest::SelectObject {
                options: adjacent_doors(world, self.source),
            },
        };
        Ok(request)
    }

    /// Feeds one value into the state machine. `None` cancels.
    pub fn advance(self, value: Option<ParameterValue>) -> Result<Continuation, ActionError> {
        let Some(value) = value else {
            return Ok(Continuation::Cancelled);
        };
        let expected = self.stage.expected();
        let source = self.source;
        let as_reaction = self.as_reaction;
        let ready = |intent| {
            let mut action = Action::new(source, intent);
            action.as_reaction = as_reaction;
            Ok(Continuation::Ready(action))
        };
        let next = |stage| {
            Ok(Continuation::Pending(PendingAction {
                source,
                as_reaction,
                stage,
            }))
        };

        match (self.stage, value) {
            (Stage::Attack(AttackStage::AwaitingWeapon), ParameterValue::Weapon(weapon)) => {
                next(Stage::Attack(AttackStage::AwaitingTarget { weapon }))
            }
            (
                Stage::Attack(AttackStage::AwaitingTarget { weapon }),
                ParameterValue::Target(target),
            ) => ready(Intent::Attack { weapon, target }),
            (Stage::Spell(SpellStage::AwaitingSpell), ParameterValue::Spell(spell)) => {
                next(Stage::Spell(SpellStage::AwaitingTarget { spell }))
            }
            (Stage::Spell(SpellStage::AwaitingTarget { spell }), ParameterValue::Target(target)) => {
                ready(Intent::CastSpell { spell, target })
            }
            (Stage::Item(ItemStage::AwaitingItem), ParameterValue::Item(item)) => {
                next(Stage::Item(ItemStage::AwaitingTarget { item }))
            }
            (Stage::Item(ItemStage::AwaitingTarget { item }), ParameterValue::Target(target)) => {
                ready(Intent::UseItem { item, target })
            }
            (Stage::Maneuver(maneuver), ParameterValue::Target(target)) => ready(match maneuver {
                Maneuver::Help => Intent::Help { target },
                Maneuver::Grapple => Intent::Grapple { target },
                Maneuver::Shove => Intent::Shove { target },
            }),
            (Stage::Move, ParameterValue::Path(path)) => ready(Intent::Move { path }),
            (Stage::Interact, ParameterValue::Object(object)) => ready(Intent::Interact { object }),
            _ => Err(ActionError::InvalidParameter { expected }),
        }
    }
}

fn adjacent_doors(world: &World, source: EntityId) -> Vec<Position> {
    let Some(footprint) = world.footprint(source) else {
        return Vec::new();
    };
    world
        .grid
        .objects()
        .filter(|(position, object)| {
            object.is_door() && footprint.cells().any(|cell| cell.chebyshev(*position) <= 1)
        })
        .map(|(position, _)| position)
        .collect()
}

/// Runs the protocol to completion, asking `choose` for every parameter.
///
/// Returns `None` when `choose` cancels.
pub fn drive<F>(
    kind: ActionKind,
    source: EntityId,
    world: &World,
    battle: Option<&BattleState>,
    content: &ContentRepository,
    config: &GameConfig,
    mut choose: F,
) -> Result<Option<Action>, ActionError>
where
    F: FnMut(&ParameterRequest) -> Option<ParameterValue>,
{
    let mut node = kind.build(source);
    loop {
        node = match node {
            Continuation::Ready(action) => return Ok(Some(action)),
            Continuation::Cancelled => return Ok(None),
            Continuation::Pending(pending) => {
                let request = pending.request(world, battle, content, config)?;
                let value = choose(&request);
                pending.advance(value)?
            }
        };
    }
}
