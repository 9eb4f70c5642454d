//! Catalog loaders for weapons, spells, items, objects and NPC templates.
//!
//! Every catalog file is a RON list of `(key, definition)` pairs:
//!
//! ```ron
//! [
//!     ("longsword", (
//!         name: "Longsword",
//!         kind: melee,
//!         damage: "1d8",
//!         damage_type: slashing,
//!         range_ft: 5,
//!     )),
//! ]
//! ```
//!
//! Keys are what maps, templates and entities refer to; they must be unique
//! within a file.

use std::collections::BTreeSet;
use std::path::Path;

use serde::de::DeserializeOwned;
use tactics_core::content::{
    ItemDefinition, NpcTemplate, ObjectDefinition, SpellDefinition, WeaponDefinition,
};
use tracing::debug;

use crate::loaders::{LoadResult, read_file};

pub(crate) fn parse_catalog<T: DeserializeOwned>(
    content: &str,
    label: &str,
) -> LoadResult<Vec<(String, T)>> {
    let entries: Vec<(String, T)> = ron::from_str(content)
        .map_err(|e| anyhow::anyhow!("Failed to parse {} catalog RON: {}", label, e))?;

    let mut seen = BTreeSet::new();
    for (key, _) in &entries {
        if !seen.insert(key.as_str()) {
            anyhow::bail!("Duplicate {} key '{}'", label, key);
        }
    }
    debug!(target: "content::catalog", kind = label, count = entries.len(), "catalog parsed");
    Ok(entries)
}

fn load_catalog<T: DeserializeOwned>(path: &Path, label: &str) -> LoadResult<Vec<(String, T)>> {
    let content = read_file(path)?;
    parse_catalog(&content, label)
        .map_err(|e| anyhow::anyhow!("{} (in {})", e, path.display()))
}

/// Loader for weapon catalogs.
pub struct WeaponLoader;

impl WeaponLoader {
    pub fn load(path: &Path) -> LoadResult<Vec<(String, WeaponDefinition)>> {
        let weapons: Vec<(String, WeaponDefinition)> = load_catalog(path, "weapon")?;
        for (key, weapon) in &weapons {
            if weapon.long_range_ft.is_some_and(|long| long < weapon.range_ft) {
                anyhow::bail!("Weapon '{}' has a long range shorter than its normal range", key);
            }
        }
        Ok(weapons)
    }
}

/// Loader for spell catalogs.
pub struct SpellLoader;

impl SpellLoader {
    pub fn load(path: &Path) -> LoadResult<Vec<(String, SpellDefinition)>> {
        load_catalog(path, "spell")
    }
}

/// Loader for consumable item catalogs.
pub struct ItemLoader;

impl ItemLoader {
    pub fn load(path: &Path) -> LoadResult<Vec<(String, ItemDefinition)>> {
        load_catalog(path, "item")
    }
}

/// Loader for map object catalogs (doors, pillars, crates).
pub struct ObjectLoader;

impl ObjectLoader {
    pub fn load(path: &Path) -> LoadResult<Vec<(String, ObjectDefinition)>> {
        load_catalog(path, "object")
    }
}

/// Loader for NPC template catalogs.
pub struct NpcLoader;

impl NpcLoader {
    pub fn load(path: &Path) -> LoadResult<Vec<(String, NpcTemplate)>> {
        let npcs: Vec<(String, NpcTemplate)> = load_catalog(path, "npc")?;
        for (key, npc) in &npcs {
            if npc.hit_points <= 0 {
                anyhow::bail!("NPC '{}' must have positive hit points", key);
            }
        }
        Ok(npcs)
    }
}

#[cfg(test)]
mod tests {
    use tactics_core::content::{SpellEffect, WeaponKind};
    use tactics_core::state::{Ability, DamageType};

    use super::*;

    #[test]
    fn parses_weapon_entries() {
        let source = r#"[
            ("shortbow", (
                name: "Shortbow",
                kind: ranged,
                damage: "1d6",
                damage_type: piercing,
                range_ft: 80,
                long_range_ft: Some(320),
                ammunition: Some("arrow"),
            )),
        ]"#;

        let weapons: Vec<(String, WeaponDefinition)> = parse_catalog(source, "weapon").unwrap();
        let (key, bow) = &weapons[0];
        assert_eq!(key, "shortbow");
        assert_eq!(bow.kind, WeaponKind::Ranged);
        assert_eq!(bow.damage.to_string(), "1d6");
        assert_eq!(bow.damage_type, DamageType::Piercing);
        assert_eq!(bow.max_range_ft(), 320);
        assert!(!bow.finesse);
    }

    #[test]
    fn parses_save_spells() {
        let source = r#"[
            ("burning_hands", (
                name: "Burning Hands",
                level: 1,
                range_ft: 15,
                effect: save(
                    ability: dexterity,
                    damage: "3d6",
                    damage_type: fire,
                    half_on_success: true,
                ),
            )),
        ]"#;

        let spells: Vec<(String, SpellDefinition)> = parse_catalog(source, "spell").unwrap();
        assert!(matches!(
            spells[0].1.effect,
            SpellEffect::Save {
                ability: Ability::Dexterity,
                half_on_success: true,
                ..
            }
        ));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let source = r#"[
            ("crate", (name: "Crate", passable: false, opaque: false)),
            ("crate", (name: "Barrel", passable: false, opaque: false)),
        ]"#;

        let err = parse_catalog::<ObjectDefinition>(source, "object").unwrap_err();
        assert!(err.to_string().contains("Duplicate object key 'crate'"));
    }

    #[test]
    fn malformed_dice_are_rejected() {
        let source = r#"[
            ("club", (
                name: "Club",
                kind: melee,
                damage: "d",
                damage_type: bludgeoning,
                range_ft: 5,
            )),
        ]"#;

        assert!(parse_catalog::<WeaponDefinition>(source, "weapon").is_err());
    }
}
