//! Combatant records.
//!
//! An [`Entity`] carries everything the rules need about one creature except
//! its position, which the grid owns. Attributes that actions mutate
//! (hit points, statuses, inventory, death saves, grapple links, spell slots)
//! are private and only change through [`crate::transaction::Transaction`]
//! setters or battle bookkeeping, so every mutation can be rolled back.

use std::collections::BTreeMap;
use std::fmt;

use bitflags::bitflags;

use crate::dice::DiceExpr;
use crate::state::EntityId;

/// The six ability scores.
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
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbilityScores {
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
}

impl AbilityScores {
    pub const fn uniform(score: i32) -> Self {
        Self {
            strength: score,
            dexterity: score,
            constitution: score,
            intelligence: score,
            wisdom: score,
            charisma: score,
        }
    }

    pub fn score(&self, ability: Ability) -> i32 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    /// `floor((score - 10) / 2)`.
    pub fn modifier(&self, ability: Ability) -> i32 {
        (self.score(ability) - 10).div_euclid(2)
    }
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self::uniform(10)
    }
}

/// Creature size category.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
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
pub enum Size {
    Tiny,
    Small,
    #[default]
    Medium,
    Large,
    Huge,
    Gargantuan,
}

impl Size {
    /// Side length of the occupied footprint in cells.
    pub const fn token_size(self) -> u32 {
        match self {
            Self::Tiny | Self::Small | Self::Medium => 1,
            Self::Large => 2,
            Self::Huge => 3,
            Self::Gargantuan => 4,
        }
    }

    /// Number of categories between two sizes.
    pub fn steps_from(self, other: Size) -> u8 {
        (self as u8).abs_diff(other as u8)
    }

    /// Sizes fewer than two steps apart block each other's movement.
    pub fn is_comparable(self, other: Size) -> bool {
        self.steps_from(other) < 2
    }
}

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
pub enum DamageType {
    Slashing,
    Piercing,
    Bludgeoning,
    Fire,
    Cold,
    Lightning,
    Thunder,
    Acid,
    Poison,
    Necrotic,
    Radiant,
    Force,
    Psychic,
}

bitflags! {
    /// Conditions currently affecting an entity.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Statuses: u16 {
        const DEAD        = 1 << 0;
        const UNCONSCIOUS = 1 << 1;
        /// Unconscious but no longer rolling death saves.
        const STABLE      = 1 << 2;
        const PRONE       = 1 << 3;
        const DODGE       = 1 << 4;
        const DISENGAGED  = 1 << 5;
        const HIDDEN      = 1 << 6;
        const GRAPPLED    = 1 << 7;
    }
}

impl Statuses {
    /// Statuses cleared at the start of the owner's turn.
    pub const TURN_SCOPED: Statuses = Statuses::DODGE.union(Statuses::DISENGAGED);
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EntityKind {
    /// Player character: drops unconscious at 0 hp and rolls death saves.
    Pc,
    /// Non-player character: dies at 0 hp.
    #[default]
    Npc,
}

/// Allegiance tag. Entities of different factions are hostile to each other.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Faction(String);

impl Faction {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Faction {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeathSaves {
    pub successes: u8,
    pub failures: u8,
}

impl DeathSaves {
    pub const LIMIT: u8 = 3;

    pub fn is_stable(&self) -> bool {
        self.successes >= Self::LIMIT
    }

    pub fn is_dead(&self) -> bool {
        self.failures >= Self::LIMIT
    }
}

/// Counted item stacks keyed by item name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Inventory(BTreeMap<String, u32>);

impl Inventory {
    pub fn count(&self, item: &str) -> u32 {
        self.0.get(item).copied().unwrap_or(0)
    }

    pub fn set(&mut self, item: impl Into<String>, count: u32) {
        let item = item.into();
        if count == 0 {
            self.0.remove(&item);
        } else {
            self.0.insert(item, count);
        }
    }

    pub fn add(&mut self, item: impl Into<String>, count: u32) {
        let item = item.into();
        let total = self.count(&item) + count;
        self.set(item, total);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(name, &count)| (name.as_str(), count))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One named group of attacks usable with a single action.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MultiattackGroup {
    pub name: String,
    /// Weapon names, repeated once per attack.
    pub attacks: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MultiattackProfile {
    pub groups: Vec<MultiattackGroup>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SneakAttackProfile {
    pub dice: DiceExpr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpellcasterProfile {
    pub ability: Ability,
    pub spells: Vec<String>,
    /// Maximum slots per spell level, index 0 is level 1.
    pub slots: Vec<u8>,
}

/// Optional class-feature components.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Profiles {
    pub multiattack: Option<MultiattackProfile>,
    pub sneak_attack: Option<SneakAttackProfile>,
    pub spellcaster: Option<SpellcasterProfile>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub kind: EntityKind,
    pub faction: Faction,
    pub abilities: AbilityScores,
    pub max_hit_points: i32,
    pub armor_class: i32,
    pub speed_ft: u32,
    pub size: Size,
    pub proficiency_bonus: i32,
    pub resistances: Vec<DamageType>,
    pub vulnerabilities: Vec<DamageType>,
    /// Weapon names this entity can attack with.
    pub equipped: Vec<String>,
    pub profiles: Profiles,
    hit_points: i32,
    statuses: Statuses,
    inventory: Inventory,
    death_saves: DeathSaves,
    grappled_by: Option<EntityId>,
    /// Remaining slots per spell level, index 0 is level 1.
    spell_slots: Vec<u8>,
}

impl Entity {
    pub fn new(name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id: EntityId::default(),
            name: name.into(),
            kind,
            faction: Faction::default(),
            abilities: AbilityScores::default(),
            max_hit_points: 1,
            armor_class: 10,
            speed_ft: 30,
            size: Size::Medium,
            proficiency_bonus: 2,
            resistances: Vec::new(),
            vulnerabilities: Vec::new(),
            equipped: Vec::new(),
            profiles: Profiles::default(),
            hit_points: 1,
            statuses: Statuses::empty(),
            inventory: Inventory::default(),
            death_saves: DeathSaves::default(),
            grappled_by: None,
            spell_slots: Vec::new(),
        }
    }

    // ===== builder =====

    pub fn with_faction(mut self, faction: impl Into<Faction>) -> Self {
        self.faction = faction.into();
        self
    }

    pub fn with_abilities(mut self, abilities: AbilityScores) -> Self {
        self.abilities = abilities;
        self
    }

    /// Sets both current and maximum hit points.
    pub fn with_hit_points(mut self, hit_points: i32) -> Self {
        self.max_hit_points = hit_points;
        self.hit_points = hit_points;
        self
    }

    pub fn with_armor_class(mut self, armor_class: i32) -> Self {
        self.armor_class = armor_class;
        self
    }

    pub fn with_speed(mut self, speed_ft: u32) -> Self {
        self.speed_ft = speed_ft;
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    pub fn with_proficiency(mut self, bonus: i32) -> Self {
        self.proficiency_bonus = bonus;
        self
    }

    pub fn with_weapon(mut self, weapon: impl Into<String>) -> Self {
        self.equipped.push(weapon.into());
        self
    }

    pub fn with_item(mut self, item: impl Into<String>, count: u32) -> Self {
        self.inventory.add(item, count);
        self
    }

    pub fn with_status(mut self, status: Statuses) -> Self {
        self.statuses.insert(status);
        self
    }

    pub fn with_resistance(mut self, damage_type: DamageType) -> Self {
        self.resistances.push(damage_type);
        self
    }

    pub fn with_vulnerability(mut self, damage_type: DamageType) -> Self {
        self.vulnerabilities.push(damage_type);
        self
    }

    pub fn with_multiattack(mut self, profile: MultiattackProfile) -> Self {
        self.profiles.multiattack = Some(profile);
        self
    }

    pub fn with_sneak_attack(mut self, dice: DiceExpr) -> Self {
        self.profiles.sneak_attack = Some(SneakAttackProfile { dice });
        self
    }

    /// Installs a spellcaster profile with all slots available.
    pub fn with_spellcasting(mut self, profile: SpellcasterProfile) -> Self {
        self.spell_slots = profile.slots.clone();
        self.profiles.spellcaster = Some(profile);
        self
    }

    // ===== queries =====

    pub fn hit_points(&self) -> i32 {
        self.hit_points
    }

    pub fn statuses(&self) -> Statuses {
        self.statuses
    }

    pub fn has_status(&self, status: Statuses) -> bool {
        self.statuses.contains(status)
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn death_saves(&self) -> DeathSaves {
        self.death_saves
    }

    pub fn grappled_by(&self) -> Option<EntityId> {
        self.grappled_by
    }

    pub fn spell_slots(&self) -> &[u8] {
        &self.spell_slots
    }

    /// Remaining slots at `level` (1-based). Cantrips always report available.
    pub fn slots_at(&self, level: u8) -> u8 {
        if level == 0 {
            return u8::MAX;
        }
        self.spell_slots
            .get(usize::from(level) - 1)
            .copied()
            .unwrap_or(0)
    }

    pub fn is_dead(&self) -> bool {
        self.statuses.contains(Statuses::DEAD)
    }

    pub fn is_unconscious(&self) -> bool {
        self.statuses.contains(Statuses::UNCONSCIOUS)
    }

    /// Alive and awake.
    pub fn is_conscious(&self) -> bool {
        !self.statuses.intersects(Statuses::DEAD | Statuses::UNCONSCIOUS)
    }

    pub fn token_size(&self) -> u32 {
        self.size.token_size()
    }

    pub fn ability_modifier(&self, ability: Ability) -> i32 {
        self.abilities.modifier(ability)
    }

    pub fn passive_perception(&self) -> i32 {
        10 + self.ability_modifier(Ability::Wisdom)
    }

    /// Athletics bonus used for grapple and shove contests.
    pub fn athletics(&self) -> i32 {
        self.ability_modifier(Ability::Strength) + self.proficiency_bonus
    }

    /// Better of athletics and acrobatics, used to resist or escape.
    pub fn contest_defense(&self) -> i32 {
        self.ability_modifier(Ability::Strength)
            .max(self.ability_modifier(Ability::Dexterity))
            + self.proficiency_bonus
    }

    pub fn initiative_modifier(&self) -> i32 {
        self.ability_modifier(Ability::Dexterity)
    }

    pub fn is_resistant(&self, damage_type: DamageType) -> bool {
        self.resistances.contains(&damage_type)
    }

    pub fn is_vulnerable(&self, damage_type: DamageType) -> bool {
        self.vulnerabilities.contains(&damage_type)
    }

    /// Final damage after resistance (half, rounded down) or vulnerability (double).
    pub fn scale_damage(&self, amount: i32, damage_type: DamageType) -> i32 {
        let amount = amount.max(0);
        match (
            self.is_resistant(damage_type),
            self.is_vulnerable(damage_type),
        ) {
            (true, false) => amount / 2,
            (false, true) => amount * 2,
            _ => amount,
        }
    }

    // ===== crate-private mutators (used by Transaction and battle bookkeeping) =====

    pub(crate) fn set_hit_points(&mut self, hit_points: i32) {
        self.hit_points = hit_points;
    }

    pub(crate) fn set_statuses(&mut self, statuses: Statuses) {
        self.statuses = statuses;
    }

    pub(crate) fn set_death_saves(&mut self, saves: DeathSaves) {
        self.death_saves = saves;
    }

    pub(crate) fn set_grappled_by(&mut self, grappler: Option<EntityId>) {
        self.grappled_by = grappler;
    }

    pub(crate) fn set_item_count(&mut self, item: &str, count: u32) {
        self.inventory.set(item, count);
    }

    pub(crate) fn set_spell_slots(&mut self, slots: Vec<u8>) {
        self.spell_slots = slots;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ability_modifier_rounds_toward_negative_infinity() {
        let scores = AbilityScores {
            strength: 9,
            dexterity: 16,
            constitution: 10,
            intelligence: 1,
            wisdom: 11,
            charisma: 20,
        };
        assert_eq!(scores.modifier(Ability::Strength), -1);
        assert_eq!(scores.modifier(Ability::Dexterity), 3);
        assert_eq!(scores.modifier(Ability::Intelligence), -5);
        assert_eq!(scores.modifier(Ability::Wisdom), 0);
        assert_eq!(scores.modifier(Ability::Charisma), 5);
    }

    #[test]
    fn resistance_halves_rounding_down_and_vulnerability_doubles() {
        let entity = Entity::new("ooze", EntityKind::Npc)
            .with_resistance(DamageType::Slashing)
            .with_vulnerability(DamageType::Fire);
        assert_eq!(entity.scale_damage(7, DamageType::Slashing), 3);
        assert_eq!(entity.scale_damage(7, DamageType::Fire), 14);
        assert_eq!(entity.scale_damage(7, DamageType::Cold), 7);
    }

    #[test]
    fn size_steps_decide_comparability() {
        assert!(Size::Medium.is_comparable(Size::Large));
        assert!(!Size::Small.is_comparable(Size::Large));
        assert_eq!(Size::Huge.token_size(), 3);
        assert_eq!("large".parse::<Size>().unwrap(), Size::Large);
    }

    #[test]
    fn consciousness_tracks_statuses() {
        let entity = Entity::new("hero", EntityKind::Pc).with_status(Statuses::UNCONSCIOUS);
        assert!(!entity.is_conscious());
        assert!(!entity.is_dead());
        assert!(Entity::new("hero", EntityKind::Pc).is_conscious());
    }
}
