/// Game configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GameConfig {
    /// Battles end once the round counter exceeds this cap. `None` means no cap.
    pub max_rounds: Option<u32>,
    /// Upper bound on actions a single AI turn may commit before yielding.
    pub ai_actions_per_turn: u32,
    /// Maximum line-of-sight sample distance in squares. `None` scans the full line.
    pub sight_range: Option<u32>,
}

impl GameConfig {
    // ===== compile-time constants =====
    pub const FEET_PER_SQUARE: u32 = 5;
    pub const MAX_OCCUPANTS_PER_TILE: usize = 4;
    /// Default melee reach for creatures without a reach weapon.
    pub const MELEE_REACH_FT: u32 = 5;
    /// Conscious hostiles within this distance impose disadvantage on ranged attacks.
    pub const ENGAGED_RANGE_FT: u32 = 5;
    /// Maximum depth of cascading reactions inside one apply.
    pub const MAX_REACTION_DEPTH: u8 = 4;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_AI_ACTIONS_PER_TURN: u32 = 8;

    pub fn new() -> Self {
        Self {
            max_rounds: None,
            ai_actions_per_turn: Self::DEFAULT_AI_ACTIONS_PER_TURN,
            sight_range: None,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = Some(max_rounds);
        self
    }

    pub fn with_sight_range(mut self, squares: u32) -> Self {
        self.sight_range = Some(squares);
        self
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new()
    }
}
