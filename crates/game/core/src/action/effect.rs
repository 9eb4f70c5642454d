//! Effect records produced by `resolve` and consumed by `apply`.
//!
//! Effects carry every die that was rolled so a resolved action can be logged,
//! compared and replayed without touching the world.

use crate::dice::{DieRoll, RollMode};
use crate::grid::Cover;
use crate::state::{DamageType, EntityId, Position};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DamageEffect {
    pub source: EntityId,
    pub target: EntityId,
    /// Weapon or spell name.
    pub origin: String,
    pub attack_roll: Option<DieRoll>,
    pub save_roll: Option<DieRoll>,
    pub damage_roll: DieRoll,
    /// Final damage after resistances and vulnerabilities.
    pub amount: i32,
    pub damage_type: DamageType,
    pub critical: bool,
    pub sneak_attack: bool,
    pub mode: RollMode,
    pub cover: Cover,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MissEffect {
    pub source: EntityId,
    pub target: EntityId,
    pub origin: String,
    pub attack_roll: Option<DieRoll>,
    pub save_roll: Option<DieRoll>,
    pub mode: RollMode,
    pub cover: Cover,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveEffect {
    pub mover: EntityId,
    /// Anchor cells starting with the current one.
    pub path: Vec<Position>,
    pub cost_ft: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DashEffect {
    pub entity: EntityId,
    pub extra_ft: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HelpEffect {
    pub source: EntityId,
    pub target: EntityId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HideEffect {
    pub entity: EntityId,
    pub stealth: DieRoll,
    /// Best passive perception among observers, if anyone could see.
    pub dc: Option<i32>,
    pub success: bool,
}

/// Opposed check: grapple, escape, shove.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContestEffect {
    pub source: EntityId,
    pub target: EntityId,
    pub source_roll: DieRoll,
    pub target_roll: DieRoll,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StandUpEffect {
    pub entity: EntityId,
    pub cost_ft: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HealEffect {
    pub source: EntityId,
    pub target: EntityId,
    /// Spell or item name.
    pub origin: String,
    pub roll: DieRoll,
    pub amount: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemConsumedEffect {
    pub entity: EntityId,
    pub item: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotExpendedEffect {
    pub entity: EntityId,
    pub level: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DoorEffect {
    pub entity: EntityId,
    pub position: Position,
    pub open: bool,
}

/// Closed set of effects. [`EffectTag`] names the variant for handler lookup.
#[derive(Clone, Debug, PartialEq, Eq, strum::EnumDiscriminants)]
#[strum_discriminants(name(EffectTag), derive(Hash, PartialOrd, Ord, strum::Display, strum::EnumIter))]
pub enum Effect {
    Damage(DamageEffect),
    Miss(MissEffect),
    Move(MoveEffect),
    Dash(DashEffect),
    Disengage(EntityId),
    Dodge(EntityId),
    Help(HelpEffect),
    Hide(HideEffect),
    GrappleSuccess(ContestEffect),
    GrappleFailure(ContestEffect),
    EscapeSuccess(ContestEffect),
    EscapeFailure(ContestEffect),
    ShoveSuccess(ContestEffect),
    ShoveFailure(ContestEffect),
    StandUp(StandUpEffect),
    DropProne(EntityId),
    SpellDamage(DamageEffect),
    SpellMiss(MissEffect),
    Heal(HealEffect),
    ItemConsumed(ItemConsumedEffect),
    SlotExpended(SlotExpendedEffect),
    DoorToggled(DoorEffect),
}

impl Effect {
    pub fn tag(&self) -> EffectTag {
        EffectTag::from(self)
    }

    /// Damage record for hits, whether from a weapon or a spell.
    pub fn as_damage(&self) -> Option<&DamageEffect> {
        match self {
            Self::Damage(d) | Self::SpellDamage(d) => Some(d),
            _ => None,
        }
    }

    pub fn is_hit(&self) -> bool {
        self.as_damage().is_some()
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss(_) | Self::SpellMiss(_))
    }
}
