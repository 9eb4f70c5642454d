//! Content factory for building the content repository from data files.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tactics_core::content::{NpcTemplate, SpellDefinition, WeaponDefinition};
use tactics_core::{ContentRepository, GameConfig, MapDefinition, MapLayout};
use tracing::info;

use crate::loaders::{
    ConfigLoader, ItemLoader, LoadResult, MapLoader, NpcLoader, ObjectLoader, PartyLoader,
    PartyMember, SpellLoader, WeaponLoader,
};

/// Content factory that loads all game content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── config.toml
/// ├── weapons.ron
/// ├── spells.ron
/// ├── items.ron
/// ├── objects.ron
/// ├── npcs.ron
/// ├── party.ron
/// └── maps/
///     ├── crossroads.toml
///     └── guard_post.toml
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    /// Creates a new content factory pointing to a data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load game configuration from `config.toml`, or defaults if absent.
    pub fn load_config(&self) -> LoadResult<GameConfig> {
        let path = self.data_dir.join("config.toml");
        if !path.exists() {
            return Ok(GameConfig::default());
        }
        ConfigLoader::load(&path)
    }

    /// Load every catalog and check references between them.
    pub fn load_repository(&self) -> LoadResult<ContentRepository> {
        let weapons = WeaponLoader::load(&self.data_dir.join("weapons.ron"))?;
        let spells = SpellLoader::load(&self.data_dir.join("spells.ron"))?;
        let items = ItemLoader::load(&self.data_dir.join("items.ron"))?;
        let objects = ObjectLoader::load(&self.data_dir.join("objects.ron"))?;
        let npcs = NpcLoader::load(&self.data_dir.join("npcs.ron"))?;

        {
            let references =
                References::new(&weapons, &spells, items.iter().map(|(key, _)| key));
            for (key, template) in &npcs {
                references.check(key, template)?;
            }
        }

        info!(
            target: "content::factory",
            weapons = weapons.len(),
            spells = spells.len(),
            items = items.len(),
            objects = objects.len(),
            npcs = npcs.len(),
            "content loaded"
        );

        let mut builder = ContentRepository::builder();
        for (key, weapon) in weapons {
            builder = builder.weapon(key, weapon);
        }
        for (key, spell) in spells {
            builder = builder.spell(key, spell);
        }
        for (key, item) in items {
            builder = builder.item(key, item);
        }
        for (key, object) in objects {
            builder = builder.object(key, object);
        }
        for (key, npc) in npcs {
            builder = builder.npc(key, npc);
        }
        Ok(builder.build())
    }

    /// Load the player party from `party.ron`, checked against `content`.
    pub fn load_party(&self, content: &ContentRepository) -> LoadResult<Vec<PartyMember>> {
        let party = PartyLoader::load(&self.data_dir.join("party.ron"))?;
        for member in &party {
            check_template(content, &member.spawn, &member.template)?;
        }
        Ok(party)
    }

    /// Load a map definition from `maps/{map_name}.toml`.
    pub fn load_map(&self, map_name: &str) -> LoadResult<MapDefinition> {
        MapLoader::load(&self.map_path(map_name))
    }

    /// Load a map and resolve its tokens against `content`.
    pub fn load_layout(&self, map_name: &str, content: &ContentRepository) -> LoadResult<MapLayout> {
        MapLoader::load_layout(&self.map_path(map_name), content)
    }

    fn map_path(&self, map_name: &str) -> PathBuf {
        self.data_dir.join("maps").join(format!("{}.toml", map_name))
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Names a template may refer to.
struct References<'a> {
    weapons: BTreeSet<&'a str>,
    spells: BTreeSet<&'a str>,
    stock: BTreeSet<&'a str>,
}

impl<'a> References<'a> {
    fn new(
        weapons: &'a [(String, WeaponDefinition)],
        spells: &'a [(String, SpellDefinition)],
        items: impl Iterator<Item = &'a String>,
    ) -> Self {
        // Ammunition is stock too, even though it is not a usable item.
        let ammunition = weapons
            .iter()
            .filter_map(|(_, weapon)| weapon.ammunition.as_deref());
        Self {
            weapons: weapons.iter().map(|(key, _)| key.as_str()).collect(),
            spells: spells.iter().map(|(key, _)| key.as_str()).collect(),
            stock: items.map(String::as_str).chain(ammunition).collect(),
        }
    }

    fn check(&self, owner: &str, template: &NpcTemplate) -> LoadResult<()> {
        let multiattack = template
            .multiattack
            .iter()
            .flat_map(|profile| &profile.groups)
            .flat_map(|group| &group.attacks);
        for weapon in template.weapons.iter().chain(multiattack) {
            if !self.weapons.contains(weapon.as_str()) {
                anyhow::bail!("'{}' refers to unknown weapon '{}'", owner, weapon);
            }
        }
        for spell in template.spellcaster.iter().flat_map(|caster| &caster.spells) {
            if !self.spells.contains(spell.as_str()) {
                anyhow::bail!("'{}' refers to unknown spell '{}'", owner, spell);
            }
        }
        for item in template.inventory.keys() {
            if !self.stock.contains(item.as_str()) {
                anyhow::bail!("'{}' carries unknown item '{}'", owner, item);
            }
        }
        Ok(())
    }
}

fn check_template(content: &ContentRepository, owner: &str, template: &NpcTemplate) -> LoadResult<()> {
    for weapon in &template.weapons {
        content
            .weapon(weapon)
            .map_err(|e| anyhow::anyhow!("'{}': {}", owner, e))?;
    }
    for spell in template.spellcaster.iter().flat_map(|caster| &caster.spells) {
        content
            .spell(spell)
            .map_err(|e| anyhow::anyhow!("'{}': {}", owner, e))?;
    }
    Ok(())
}
