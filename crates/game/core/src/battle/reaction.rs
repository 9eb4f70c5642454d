//! Reaction requests: opportunity attacks and damage reactions.

use crate::action::{Action, Intent};
use crate::battle::BattleState;
use crate::battle::targets::are_hostile;
use crate::content::{CastingTime, ContentRepository};
use crate::state::{Entity, EntityId, World};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReactionTrigger {
    /// `mover` is about to leave this entity's reach.
    OpportunityAttack { mover: EntityId },
    /// This entity just took damage from `attacker`.
    Damaged { attacker: EntityId },
}

pub struct ReactionContext<'a> {
    pub entity: EntityId,
    pub trigger: ReactionTrigger,
    pub world: &'a World,
    pub battle: &'a BattleState,
    pub content: &'a ContentRepository,
}

/// Decides whether an entity spends its reaction.
///
/// Returned actions are marked as reactions by the battle before resolution.
pub trait ReactionHandler {
    fn react(&mut self, context: &ReactionContext<'_>) -> Option<Action>;
}

impl<F> ReactionHandler for F
where
    F: FnMut(&ReactionContext<'_>) -> Option<Action>,
{
    fn react(&mut self, context: &ReactionContext<'_>) -> Option<Action> {
        self(context)
    }
}

/// Longest reach among the entity's equipped melee weapons.
pub fn melee_reach_ft(entity: &Entity, content: &ContentRepository) -> Option<u32> {
    entity
        .equipped
        .iter()
        .filter_map(|name| content.weapon(name).ok())
        .filter(|weapon| weapon.is_melee())
        .map(|weapon| weapon.range_ft)
        .max()
}

/// Always takes opportunity attacks with the longest-reach melee weapon and
/// answers damage with the first known reaction spell that can reach.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultReactions;

impl DefaultReactions {
    fn opportunity_attack(context: &ReactionContext<'_>, mover: EntityId) -> Option<Action> {
        let entity = context.world.entity(context.entity)?;
        let distance = context.world.distance_ft(context.entity, mover)?;
        let weapon = entity
            .equipped
            .iter()
            .filter_map(|name| Some((name, context.content.weapon(name).ok()?)))
            .filter(|(_, weapon)| weapon.is_melee() && weapon.range_ft >= distance)
            .max_by_key(|(_, weapon)| weapon.range_ft)?
            .0;
        Some(
            Action::new(
                context.entity,
                Intent::Attack {
                    weapon: weapon.clone(),
                    target: mover,
                },
            )
            .as_reaction(),
        )
    }

    fn retaliate(context: &ReactionContext<'_>, attacker: EntityId) -> Option<Action> {
        let entity = context.world.entity(context.entity)?;
        let profile = entity.profiles.spellcaster.as_ref()?;
        if !are_hostile(
            context.world,
            Some(context.battle),
            context.entity,
            attacker,
        ) || !context.world.can_see(context.entity, attacker, None)
        {
            return None;
        }
        let distance = context.world.distance_ft(context.entity, attacker)?;
        let spell = profile.spells.iter().find(|name| {
            context.content.spell(name).is_ok_and(|spell| {
                spell.casting_time == CastingTime::Reaction
                    && entity.slots_at(spell.level) > 0
                    && spell.range_ft >= distance
            })
        })?;
        Some(
            Action::new(
                context.entity,
                Intent::CastSpell {
                    spell: spell.clone(),
                    target: attacker,
                },
            )
            .as_reaction(),
        )
    }
}

impl ReactionHandler for DefaultReactions {
    fn react(&mut self, context: &ReactionContext<'_>) -> Option<Action> {
        match context.trigger {
            ReactionTrigger::OpportunityAttack { mover } => Self::opportunity_attack(context, mover),
            ReactionTrigger::Damaged { attacker } => Self::retaliate(context, attacker),
        }
    }
}
