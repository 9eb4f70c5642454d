//! Per-battle, per-entity resource ledger.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::state::{EntityId, Faction, MultiattackGroup};

/// Spendable per-turn resources.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Resource {
    Action,
    BonusAction,
    Reaction,
    FreeObjectInteraction,
    Movement,
}

/// Initiative as `(total, dexterity)`, ordered lexicographically.
///
/// Equivalent to `total + dexterity / 100` as long as dexterity stays below 100.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Initiative {
    pub total: i32,
    pub dexterity: i32,
}

impl Initiative {
    pub const fn new(total: i32, dexterity: i32) -> Self {
        Self { total, dexterity }
    }

    /// Fractional form, for display.
    pub fn value(&self) -> f64 {
        f64::from(self.total) + f64::from(self.dexterity) / 100.0
    }
}

impl PartialOrd for Initiative {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Initiative {
    fn cmp(&self, other: &Self) -> Ordering {
        self.total
            .cmp(&other.total)
            .then(self.dexterity.cmp(&other.dexterity))
    }
}

/// Effects one entity maintains on another, keyed by the source on the target's ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum TargetEffect {
    /// The next attack by an ally of the helper against this target has advantage.
    Helped,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BattleEntityState {
    pub group: Faction,
    pub initiative: Initiative,
    pub action: u8,
    pub bonus_action: u8,
    pub reaction: u8,
    pub free_object_interaction: u8,
    pub movement_ft: u32,
    /// Remaining attacks of the multiattack routine chosen this turn.
    pub multiattack: Option<Vec<MultiattackGroup>>,
    pub target_effects: BTreeMap<EntityId, TargetEffect>,
    pub sneak_attack_used: bool,
}

impl BattleEntityState {
    pub fn new(group: Faction, initiative: Initiative) -> Self {
        Self {
            group,
            initiative,
            action: 0,
            bonus_action: 0,
            reaction: 0,
            free_object_interaction: 0,
            movement_ft: 0,
            multiattack: None,
            target_effects: BTreeMap::new(),
            sneak_attack_used: false,
        }
    }

    /// Restores every per-turn resource to its maximum.
    pub fn reset(&mut self, movement_ft: u32) {
        self.action = 1;
        self.bonus_action = 1;
        self.reaction = 1;
        self.free_object_interaction = 1;
        self.movement_ft = movement_ft;
        self.multiattack = None;
        self.sneak_attack_used = false;
    }

    pub fn remaining(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Action => u32::from(self.action),
            Resource::BonusAction => u32::from(self.bonus_action),
            Resource::Reaction => u32::from(self.reaction),
            Resource::FreeObjectInteraction => u32::from(self.free_object_interaction),
            Resource::Movement => self.movement_ft,
        }
    }

    pub fn has(&self, resource: Resource) -> bool {
        self.remaining(resource) > 0
    }

    /// Spends one unit (or all movement). Counters saturate at zero.
    pub fn spend(&mut self, resource: Resource) -> bool {
        let counter = match resource {
            Resource::Action => &mut self.action,
            Resource::BonusAction => &mut self.bonus_action,
            Resource::Reaction => &mut self.reaction,
            Resource::FreeObjectInteraction => &mut self.free_object_interaction,
            Resource::Movement => {
                let had = self.movement_ft > 0;
                self.movement_ft = 0;
                return had;
            }
        };
        let had = *counter > 0;
        *counter = counter.saturating_sub(1);
        had
    }

    pub fn spend_movement(&mut self, feet: u32) {
        self.movement_ft = self.movement_ft.saturating_sub(feet);
    }

    pub fn is_helped_by(&self, helper: EntityId) -> bool {
        self.target_effects.get(&helper) == Some(&TargetEffect::Helped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spending_never_drops_below_zero() {
        let mut ledger = BattleEntityState::new(Faction::new("party"), Initiative::default());
        ledger.reset(30);
        assert!(ledger.spend(Resource::Action));
        assert_eq!(ledger.action, 0);
        assert!(!ledger.spend(Resource::Action));
        assert_eq!(ledger.action, 0);
        ledger.spend_movement(45);
        assert_eq!(ledger.movement_ft, 0);
    }

    #[test]
    fn initiative_breaks_ties_on_dexterity() {
        let quick = Initiative::new(15, 3);
        let slow = Initiative::new(15, 1);
        assert!(quick > slow);
        assert!(Initiative::new(16, -1) > quick);
        assert!((quick.value() - 15.03).abs() < 1e-9);
    }
}
