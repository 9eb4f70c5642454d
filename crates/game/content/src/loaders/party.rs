//! Player party loader.
//!
//! The party file lists player characters and the map spawn point each one
//! starts on. Characters reuse the NPC template shape:
//!
//! ```ron
//! [
//!     (spawn: "front", template: (
//!         name: "Bree",
//!         hit_points: 24,
//!         armor_class: 16,
//!         speed_ft: 30,
//!         faction: "party",
//!         weapons: ["longsword"],
//!     )),
//! ]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tactics_core::content::NpcTemplate;
use tactics_core::{Entity, EntityKind};

use crate::loaders::{LoadResult, read_file};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyMember {
    /// Name of the map spawn point.
    pub spawn: String,
    pub template: NpcTemplate,
}

impl PartyMember {
    /// Builds the player character entity.
    pub fn instantiate(&self) -> Entity {
        let mut entity = self.template.instantiate();
        entity.kind = EntityKind::Pc;
        entity
    }
}

/// Loader for the player party from RON files.
pub struct PartyLoader;

impl PartyLoader {
    pub fn load(path: &Path) -> LoadResult<Vec<PartyMember>> {
        let content = read_file(path)?;
        Self::parse(&content).map_err(|e| anyhow::anyhow!("{} (in {})", e, path.display()))
    }

    pub fn parse(content: &str) -> LoadResult<Vec<PartyMember>> {
        let party: Vec<PartyMember> = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse party RON: {}", e))?;
        if party.is_empty() {
            anyhow::bail!("Party must have at least one member");
        }
        Ok(party)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn members_become_player_characters() {
        let party = PartyLoader::parse(
            r#"[
                (spawn: "front", template: (
                    name: "Bree",
                    hit_points: 24,
                    armor_class: 16,
                    speed_ft: 30,
                    faction: "party",
                    weapons: ["longsword"],
                )),
            ]"#,
        )
        .unwrap();

        let bree = party[0].instantiate();
        assert_eq!(party[0].spawn, "front");
        assert_eq!(bree.kind, EntityKind::Pc);
        assert_eq!(bree.faction.as_str(), "party");
        assert_eq!(bree.hit_points(), 24);
        assert_eq!(bree.equipped, vec!["longsword".to_owned()]);
    }

    #[test]
    fn empty_party_is_rejected() {
        assert!(PartyLoader::parse("[]").is_err());
    }
}
