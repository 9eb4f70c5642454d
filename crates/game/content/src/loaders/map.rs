//! Map layout loader.
//!
//! Maps are TOML documents with a base terrain layer, an optional meta layer
//! for NPCs and spawn points, and a legend keyed by single characters:
//!
//! ```toml
//! name = "guard_post"
//! base = [
//!     "#######",
//!     "#..D..#",
//!     "#######",
//! ]
//! meta = [
//!     ".......",
//!     ".p...g.",
//!     ".......",
//! ]
//!
//! [legend.D]
//! object = "door"
//! open = false
//!
//! [legend.g]
//! npc = "goblin"
//!
//! [legend.p]
//! spawn = "player"
//! ```
//!
//! Token validation against content happens in [`MapLoader::load_layout`].

use std::path::Path;

use tactics_core::{ContentRepository, MapDefinition, MapLayout};
use tracing::debug;

use crate::loaders::{LoadResult, read_file};

/// Loader for map data from TOML files.
pub struct MapLoader;

impl MapLoader {
    /// Load the raw map definition without checking it against content.
    pub fn load(path: &Path) -> LoadResult<MapDefinition> {
        let content = read_file(path)?;
        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("{} (in {})", e, path.display()))
    }

    pub fn parse(content: &str) -> LoadResult<MapDefinition> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse map TOML: {}", e))
    }

    /// Load a map and resolve every token against `content`.
    ///
    /// Unknown tokens and dangling object/NPC references are fatal.
    pub fn load_layout(path: &Path, content: &ContentRepository) -> LoadResult<MapLayout> {
        let definition = Self::load(path)?;
        let layout = definition
            .parse(content)
            .map_err(|e| anyhow::anyhow!("Invalid map '{}': {}", definition.name, e))?;
        debug!(
            target: "content::map",
            map = %layout.name,
            width = layout.grid.width(),
            height = layout.grid.height(),
            npcs = layout.npcs.len(),
            "map loaded"
        );
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOM: &str = r######"
name = "cell"
base = [
    "#####",
    "#.D.#",
    "#####",
]
meta = [
    ".....",
    ".p.g.",
    ".....",
]

[legend.D]
object = "door"
open = true

[legend.g]
npc = "goblin"
group = "raiders"
hp = 3

[legend.p]
spawn = "hero"
"######;

    #[test]
    fn parses_layers_and_legend() {
        let map = MapLoader::parse(ROOM).unwrap();

        assert_eq!(map.name, "cell");
        assert_eq!(map.base.len(), 3);
        assert_eq!(map.meta[1], ".p.g.");
        let goblin = &map.legend["g"];
        assert_eq!(goblin.npc.as_deref(), Some("goblin"));
        assert_eq!(goblin.group.as_deref(), Some("raiders"));
        assert_eq!(goblin.hp, Some(3));
        assert_eq!(map.legend["D"].open, Some(true));
    }

    #[test]
    fn meta_layer_is_optional() {
        let map = MapLoader::parse("name = \"bare\"\nbase = [\"...\"]\n").unwrap();
        assert!(map.meta.is_empty());
        assert!(map.legend.is_empty());
    }
}
