//! Action kinds and fully parameterized actions.

use crate::state::{EntityId, Position};

/// Every action an entity can choose.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ActionKind {
    Attack,
    Move,
    Dash,
    Disengage,
    Dodge,
    Help,
    Hide,
    Grapple,
    EscapeGrapple,
    Shove,
    StandUp,
    DropProne,
    CastSpell,
    UseItem,
    Interact,
}

impl ActionKind {
    pub const ALL: [ActionKind; 15] = [
        Self::Attack,
        Self::Move,
        Self::Dash,
        Self::Disengage,
        Self::Dodge,
        Self::Help,
        Self::Hide,
        Self::Grapple,
        Self::EscapeGrapple,
        Self::Shove,
        Self::StandUp,
        Self::DropProne,
        Self::CastSpell,
        Self::UseItem,
        Self::Interact,
    ];
}

/// What the source wants to do, with every parameter filled in.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Intent {
    Attack { weapon: String, target: EntityId },
    /// Anchor cells starting with the current one.
    Move { path: Vec<Position> },
    Dash,
    Disengage,
    Dodge,
    Help { target: EntityId },
    Hide,
    Grapple { target: EntityId },
    EscapeGrapple,
    Shove { target: EntityId },
    StandUp,
    DropProne,
    CastSpell { spell: String, target: EntityId },
    UseItem { item: String, target: EntityId },
    Interact { object: Position },
}

impl Intent {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Attack { .. } => ActionKind::Attack,
            Self::Move { .. } => ActionKind::Move,
            Self::Dash => ActionKind::Dash,
            Self::Disengage => ActionKind::Disengage,
            Self::Dodge => ActionKind::Dodge,
            Self::Help { .. } => ActionKind::Help,
            Self::Hide => ActionKind::Hide,
            Self::Grapple { .. } => ActionKind::Grapple,
            Self::EscapeGrapple => ActionKind::EscapeGrapple,
            Self::Shove { .. } => ActionKind::Shove,
            Self::StandUp => ActionKind::StandUp,
            Self::DropProne => ActionKind::DropProne,
            Self::CastSpell { .. } => ActionKind::CastSpell,
            Self::UseItem { .. } => ActionKind::UseItem,
            Self::Interact { .. } => ActionKind::Interact,
        }
    }

    /// Entity the intent is aimed at, if any.
    pub fn target(&self) -> Option<EntityId> {
        match self {
            Self::Attack { target, .. }
            | Self::Help { target }
            | Self::Grapple { target }
            | Self::Shove { target }
            | Self::CastSpell { target, .. }
            | Self::UseItem { target, .. } => Some(*target),
            _ => None,
        }
    }
}

/// A fully parameterized action, ready for [`Action::resolve`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Action {
    pub source: EntityId,
    pub intent: Intent,
    /// Paid with the reaction instead of the action.
    pub as_reaction: bool,
}

impl Action {
    pub fn new(source: EntityId, intent: Intent) -> Self {
        Self {
            source,
            intent,
            as_reaction: false,
        }
    }

    pub fn as_reaction(mut self) -> Self {
        self.as_reaction = true;
        self
    }

    pub fn kind(&self) -> ActionKind {
        self.intent.kind()
    }
}
