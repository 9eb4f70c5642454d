//! Content definitions shared by every component.
//!
//! A [`ContentRepository`] is built once (normally by `tactics-content` from
//! RON files) and injected through [`crate::session::Session`]. Lookups by
//! name fail with [`ContentError`], which is fatal: a dangling reference means
//! the data files are corrupt.

use std::collections::BTreeMap;

use crate::dice::DiceExpr;
use crate::error::{ErrorSeverity, GameError};
use crate::grid::Cover;
use crate::state::{
    Ability, AbilityScores, DamageType, Entity, EntityKind, MultiattackProfile, Size,
    SpellcasterProfile,
};

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
pub enum WeaponKind {
    #[default]
    Melee,
    Ranged,
}

/// When a weapon's extra damage applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BonusCondition {
    Always,
    /// Target is at least this size.
    TargetSizeAtLeast(Size),
    OnCritical,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BonusDamage {
    pub dice: DiceExpr,
    pub damage_type: DamageType,
    pub when: BonusCondition,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeaponDefinition {
    pub name: String,
    pub kind: WeaponKind,
    pub damage: DiceExpr,
    pub damage_type: DamageType,
    /// Reach for melee weapons, normal range for ranged ones.
    pub range_ft: u32,
    /// Long range; attacks beyond `range_ft` up to this have disadvantage.
    #[cfg_attr(feature = "serde", serde(default))]
    pub long_range_ft: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub finesse: bool,
    /// Item consumed per attack, if any.
    #[cfg_attr(feature = "serde", serde(default))]
    pub ammunition: Option<String>,
    /// Magic bonus added to attack rolls.
    #[cfg_attr(feature = "serde", serde(default))]
    pub attack_bonus: i32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub bonus_damage: Option<BonusDamage>,
}

impl WeaponDefinition {
    pub fn is_melee(&self) -> bool {
        self.kind == WeaponKind::Melee
    }

    pub fn is_ranged(&self) -> bool {
        self.kind == WeaponKind::Ranged
    }

    /// Farthest distance at which the weapon can attack at all.
    pub fn max_range_ft(&self) -> u32 {
        self.long_range_ft.unwrap_or(self.range_ft).max(self.range_ft)
    }

    /// Ability that drives attack and damage for `wielder`.
    pub fn ability_for(&self, wielder: &Entity) -> Ability {
        match (self.kind, self.finesse) {
            (WeaponKind::Ranged, _) => Ability::Dexterity,
            (WeaponKind::Melee, true)
                if wielder.ability_modifier(Ability::Dexterity)
                    > wielder.ability_modifier(Ability::Strength) =>
            {
                Ability::Dexterity
            }
            _ => Ability::Strength,
        }
    }
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
pub enum CastingTime {
    #[default]
    Action,
    BonusAction,
    /// Only castable as a reaction to taking damage.
    Reaction,
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
pub enum SpellTarget {
    #[default]
    Enemy,
    /// Self or an ally.
    Ally,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SpellEffect {
    /// Spell attack roll against armor class.
    Attack {
        damage: DiceExpr,
        damage_type: DamageType,
    },
    /// Target rolls a saving throw against the caster's DC.
    Save {
        ability: Ability,
        damage: DiceExpr,
        damage_type: DamageType,
        half_on_success: bool,
    },
    Heal {
        amount: DiceExpr,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpellDefinition {
    pub name: String,
    /// 0 for cantrips.
    pub level: u8,
    pub range_ft: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub casting_time: CastingTime,
    #[cfg_attr(feature = "serde", serde(default))]
    pub target: SpellTarget,
    pub effect: SpellEffect,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ItemEffect {
    Heal { amount: DiceExpr },
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemDefinition {
    pub name: String,
    /// Distance at which the item can be administered.
    pub range_ft: u32,
    pub effect: ItemEffect,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectDefinition {
    pub name: String,
    pub passable: bool,
    pub opaque: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub cover: Cover,
    #[cfg_attr(feature = "serde", serde(default))]
    pub door: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NpcTemplate {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub abilities: AbilityScores,
    pub hit_points: i32,
    pub armor_class: i32,
    pub speed_ft: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub size: Size,
    pub faction: String,
    #[cfg_attr(feature = "serde", serde(default = "default_proficiency"))]
    pub proficiency_bonus: i32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub weapons: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub inventory: BTreeMap<String, u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub resistances: Vec<DamageType>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub vulnerabilities: Vec<DamageType>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub multiattack: Option<MultiattackProfile>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub sneak_attack: Option<DiceExpr>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub spellcaster: Option<SpellcasterProfile>,
}

#[cfg(feature = "serde")]
fn default_proficiency() -> i32 {
    2
}

impl NpcTemplate {
    /// A plain medium humanoid with 10 in every ability.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            abilities: AbilityScores::default(),
            hit_points: 7,
            armor_class: 12,
            speed_ft: 30,
            size: Size::Medium,
            faction: "monsters".into(),
            proficiency_bonus: 2,
            weapons: Vec::new(),
            inventory: BTreeMap::new(),
            resistances: Vec::new(),
            vulnerabilities: Vec::new(),
            multiattack: None,
            sneak_attack: None,
            spellcaster: None,
        }
    }

    /// Builds an NPC entity. The id is assigned on insertion.
    pub fn instantiate(&self) -> Entity {
        let mut entity = Entity::new(self.name.clone(), EntityKind::Npc)
            .with_faction(self.faction.as_str())
            .with_abilities(self.abilities)
            .with_hit_points(self.hit_points)
            .with_armor_class(self.armor_class)
            .with_speed(self.speed_ft)
            .with_size(self.size)
            .with_proficiency(self.proficiency_bonus);
        entity.equipped = self.weapons.clone();
        entity.resistances = self.resistances.clone();
        entity.vulnerabilities = self.vulnerabilities.clone();
        for (item, &count) in &self.inventory {
            entity = entity.with_item(item.clone(), count);
        }
        if let Some(profile) = &self.multiattack {
            entity = entity.with_multiattack(profile.clone());
        }
        if let Some(dice) = &self.sneak_attack {
            entity = entity.with_sneak_attack(dice.clone());
        }
        if let Some(profile) = &self.spellcaster {
            entity = entity.with_spellcasting(profile.clone());
        }
        entity
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{name}`")]
pub struct ContentError {
    pub kind: &'static str,
    pub name: String,
}

impl GameError for ContentError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        "CONTENT_UNKNOWN_REFERENCE"
    }
}

/// Every catalog the rules consult, keyed by name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentRepository {
    weapons: BTreeMap<String, WeaponDefinition>,
    spells: BTreeMap<String, SpellDefinition>,
    items: BTreeMap<String, ItemDefinition>,
    objects: BTreeMap<String, ObjectDefinition>,
    npcs: BTreeMap<String, NpcTemplate>,
}

fn lookup<'a, T>(
    map: &'a BTreeMap<String, T>,
    kind: &'static str,
    name: &str,
) -> Result<&'a T, ContentError> {
    map.get(name).ok_or_else(|| ContentError {
        kind,
        name: name.to_owned(),
    })
}

impl ContentRepository {
    pub fn builder() -> ContentBuilder {
        ContentBuilder::default()
    }

    pub fn weapon(&self, name: &str) -> Result<&WeaponDefinition, ContentError> {
        lookup(&self.weapons, "weapon", name)
    }

    pub fn spell(&self, name: &str) -> Result<&SpellDefinition, ContentError> {
        lookup(&self.spells, "spell", name)
    }

    pub fn item(&self, name: &str) -> Result<&ItemDefinition, ContentError> {
        lookup(&self.items, "item", name)
    }

    pub fn object(&self, name: &str) -> Option<&ObjectDefinition> {
        self.objects.get(name)
    }

    pub fn npc(&self, name: &str) -> Option<&NpcTemplate> {
        self.npcs.get(name)
    }

    pub fn npc_template(&self, name: &str) -> Result<&NpcTemplate, ContentError> {
        lookup(&self.npcs, "npc", name)
    }

    pub fn has_item(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn weapon_names(&self) -> impl Iterator<Item = &str> {
        self.weapons.keys().map(String::as_str)
    }

    pub fn npc_names(&self) -> impl Iterator<Item = &str> {
        self.npcs.keys().map(String::as_str)
    }
}

#[derive(Debug, Default)]
pub struct ContentBuilder {
    repository: ContentRepository,
}

impl ContentBuilder {
    pub fn weapon(mut self, key: impl Into<String>, weapon: WeaponDefinition) -> Self {
        self.repository.weapons.insert(key.into(), weapon);
        self
    }

    pub fn spell(mut self, key: impl Into<String>, spell: SpellDefinition) -> Self {
        self.repository.spells.insert(key.into(), spell);
        self
    }

    pub fn item(mut self, key: impl Into<String>, item: ItemDefinition) -> Self {
        self.repository.items.insert(key.into(), item);
        self
    }

    pub fn object(mut self, key: impl Into<String>, object: ObjectDefinition) -> Self {
        self.repository.objects.insert(key.into(), object);
        self
    }

    pub fn npc(mut self, key: impl Into<String>, template: NpcTemplate) -> Self {
        self.repository.npcs.insert(key.into(), template);
        self
    }

    pub fn build(self) -> ContentRepository {
        self.repository
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rapier() -> WeaponDefinition {
        WeaponDefinition {
            name: "Rapier".into(),
            kind: WeaponKind::Melee,
            damage: "1d8".parse().unwrap(),
            damage_type: DamageType::Piercing,
            range_ft: 5,
            long_range_ft: None,
            finesse: true,
            ammunition: None,
            attack_bonus: 0,
            bonus_damage: None,
        }
    }

    #[test]
    fn finesse_weapons_use_the_better_ability() {
        let nimble = Entity::new("rogue", EntityKind::Pc).with_abilities(AbilityScores {
            dexterity: 16,
            ..AbilityScores::default()
        });
        let strong = Entity::new("fighter", EntityKind::Pc).with_abilities(AbilityScores {
            strength: 16,
            ..AbilityScores::default()
        });
        assert_eq!(rapier().ability_for(&nimble), Ability::Dexterity);
        assert_eq!(rapier().ability_for(&strong), Ability::Strength);
    }

    #[test]
    fn unknown_references_are_fatal() {
        let content = ContentRepository::builder().weapon("rapier", rapier()).build();
        assert!(content.weapon("rapier").is_ok());
        let err = content.weapon("halberd").unwrap_err();
        assert_eq!(err.to_string(), "unknown weapon `halberd`");
        assert_eq!(err.severity(), ErrorSeverity::Fatal);
    }

    #[test]
    fn templates_instantiate_npcs() {
        let mut template = NpcTemplate::named("Goblin");
        template.weapons = vec!["scimitar".into()];
        template.inventory.insert("arrow".into(), 10);
        let goblin = template.instantiate();
        assert_eq!(goblin.kind, EntityKind::Npc);
        assert_eq!(goblin.faction.as_str(), "monsters");
        assert_eq!(goblin.hit_points(), 7);
        assert_eq!(goblin.inventory().count("arrow"), 10);
    }
}
