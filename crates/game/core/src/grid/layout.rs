//! Map definitions: a base terrain layer, an optional meta layer and a legend.
//!
//! ```text
//! base = ["#######",      meta = [".......",
//!         "#..D..#",              ".g...p.",
//!         "#######"]              "......."]
//! ```
//!
//! `#` is wall and `.` floor. Every other base token must name a legend
//! entry with an `object`; every non-`.` meta token must name a legend entry
//! with an `npc` or a `spawn`. Anything else is rejected.

use std::collections::BTreeMap;

use crate::content::ContentRepository;
use crate::error::{ErrorSeverity, GameError};
use crate::grid::{Grid, MapObject, Terrain};
use crate::state::Position;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LegendEntry {
    #[cfg_attr(feature = "serde", serde(default))]
    pub object: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub npc: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub spawn: Option<String>,
    /// Initial door state.
    #[cfg_attr(feature = "serde", serde(default))]
    pub open: Option<bool>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub group: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub hp: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapDefinition {
    pub name: String,
    pub base: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub meta: Vec<String>,
    /// Keys are single-character tokens.
    #[cfg_attr(feature = "serde", serde(default))]
    pub legend: BTreeMap<String, LegendEntry>,
}

/// An NPC to instantiate from a template once the grid exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NpcPlacement {
    pub template: String,
    pub position: Position,
    pub name: Option<String>,
    pub group: Option<String>,
    pub hit_points: Option<i32>,
}

/// Result of parsing a [`MapDefinition`].
#[derive(Clone, Debug)]
pub struct MapLayout {
    pub name: String,
    pub grid: Grid,
    pub npcs: Vec<NpcPlacement>,
    pub spawn_points: BTreeMap<String, Position>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("map has no rows")]
    Empty,

    #[error("row {row} has width {found}, expected {expected}")]
    Ragged { row: usize, expected: usize, found: usize },

    #[error("meta layer is {found_height} rows, base layer is {expected_height}")]
    MetaMismatch {
        expected_height: usize,
        found_height: usize,
    },

    #[error("unknown token `{token}` at {position}")]
    UnknownToken { token: char, position: Position },

    #[error("token `{token}` refers to unknown {kind} `{name}`")]
    UnknownType {
        token: char,
        kind: &'static str,
        name: String,
    },

    #[error("legend key `{0}` must be a single character")]
    InvalidLegendKey(String),
}

impl GameError for MapError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Empty => "MAP_EMPTY",
            Self::Ragged { .. } => "MAP_RAGGED",
            Self::MetaMismatch { .. } => "MAP_META_MISMATCH",
            Self::UnknownToken { .. } => "MAP_UNKNOWN_TOKEN",
            Self::UnknownType { .. } => "MAP_UNKNOWN_TYPE",
            Self::InvalidLegendKey(_) => "MAP_INVALID_LEGEND_KEY",
        }
    }
}

impl MapDefinition {
    fn legend_by_token(&self) -> Result<BTreeMap<char, &LegendEntry>, MapError> {
        self.legend
            .iter()
            .map(|(key, entry)| {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(token), None) => Ok((token, entry)),
                    _ => Err(MapError::InvalidLegendKey(key.clone())),
                }
            })
            .collect()
    }

    fn width(&self) -> Result<usize, MapError> {
        let width = self.base.first().ok_or(MapError::Empty)?.chars().count();
        for (row, line) in self.base.iter().chain(self.meta.iter()).enumerate() {
            let found = line.chars().count();
            if found != width {
                return Err(MapError::Ragged {
                    row: row % self.base.len(),
                    expected: width,
                    found,
                });
            }
        }
        Ok(width)
    }

    /// Validates every token against the legend and content, then builds the grid.
    pub fn parse(&self, content: &ContentRepository) -> Result<MapLayout, MapError> {
        let width = self.width()?;
        if !self.meta.is_empty() && self.meta.len() != self.base.len() {
            return Err(MapError::MetaMismatch {
                expected_height: self.base.len(),
                found_height: self.meta.len(),
            });
        }
        let legend = self.legend_by_token()?;
        let mut grid = Grid::new(width as u32, self.base.len() as u32);

        for (y, row) in self.base.iter().enumerate() {
            for (x, token) in row.chars().enumerate() {
                let position = Position::new(x as i32, y as i32);
                match token {
                    '.' | ' ' => {}
                    '#' => grid.set_terrain(position, Terrain::Wall),
                    _ => {
                        let kind = legend
                            .get(&token)
                            .and_then(|entry| entry.object.as_deref())
                            .ok_or(MapError::UnknownToken { token, position })?;
                        let definition =
                            content.object(kind).ok_or_else(|| MapError::UnknownType {
                                token,
                                kind: "object",
                                name: kind.to_owned(),
                            })?;
                        let mut object = MapObject::from_definition(kind, definition);
                        let entry = legend[&token];
                        if let Some(name) = &entry.name {
                            object.name = name.clone();
                        }
                        if let (Some(open), Some(door)) = (entry.open, object.door.as_mut()) {
                            *door = open;
                        }
                        // Bounds were established from the rows themselves.
                        let _ = grid.place_object(position, object);
                    }
                }
            }
        }

        let mut npcs = Vec::new();
        let mut spawn_points = BTreeMap::new();
        for (y, row) in self.meta.iter().enumerate() {
            for (x, token) in row.chars().enumerate() {
                if matches!(token, '.' | ' ') {
                    continue;
                }
                let position = Position::new(x as i32, y as i32);
                let entry = legend
                    .get(&token)
                    .filter(|e| e.npc.is_some() || e.spawn.is_some())
                    .ok_or(MapError::UnknownToken { token, position })?;
                if let Some(template) = &entry.npc {
                    if content.npc(template).is_none() {
                        return Err(MapError::UnknownType {
                            token,
                            kind: "npc",
                            name: template.clone(),
                        });
                    }
                    npcs.push(NpcPlacement {
                        template: template.clone(),
                        position,
                        name: entry.name.clone(),
                        group: entry.group.clone(),
                        hit_points: entry.hp,
                    });
                }
                if let Some(spawn) = &entry.spawn {
                    spawn_points.insert(spawn.clone(), position);
                }
            }
        }

        Ok(MapLayout {
            name: self.name.clone(),
            grid,
            npcs,
            spawn_points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{NpcTemplate, ObjectDefinition};
    use crate::grid::Cover;

    fn content() -> ContentRepository {
        ContentRepository::builder()
            .object(
                "door",
                ObjectDefinition {
                    name: "wooden door".into(),
                    passable: false,
                    opaque: true,
                    cover: Cover::None,
                    door: true,
                },
            )
            .npc("goblin", NpcTemplate::named("Goblin"))
            .build()
    }

    fn definition() -> MapDefinition {
        let mut legend = BTreeMap::new();
        legend.insert(
            "D".to_owned(),
            LegendEntry {
                object: Some("door".into()),
                open: Some(true),
                ..LegendEntry::default()
            },
        );
        legend.insert(
            "g".to_owned(),
            LegendEntry {
                npc: Some("goblin".into()),
                group: Some("raiders".into()),
                ..LegendEntry::default()
            },
        );
        legend.insert(
            "A".to_owned(),
            LegendEntry {
                spawn: Some("party".into()),
                ..LegendEntry::default()
            },
        );
        MapDefinition {
            name: "hall".into(),
            base: vec!["#####".into(), "#.D.#".into(), "#####".into()],
            meta: vec![".....".into(), ".g.A.".into(), ".....".into()],
            legend,
        }
    }

    #[test]
    fn parses_terrain_objects_npcs_and_spawns() {
        let layout = definition().parse(&content()).unwrap();
        assert_eq!(layout.grid.width(), 5);
        assert!(layout.grid.is_wall(Position::new(0, 0)));
        let door = layout.grid.object(Position::new(2, 1)).unwrap();
        assert!(door.is_open());
        assert_eq!(layout.npcs.len(), 1);
        assert_eq!(layout.npcs[0].position, Position::new(1, 1));
        assert_eq!(layout.npcs[0].group.as_deref(), Some("raiders"));
        assert_eq!(layout.spawn_points["party"], Position::new(3, 1));
    }

    #[test]
    fn unknown_tokens_are_fatal() {
        let mut map = definition();
        map.base[1] = "#.X.#".into();
        let err = map.parse(&content()).unwrap_err();
        assert_eq!(
            err,
            MapError::UnknownToken {
                token: 'X',
                position: Position::new(2, 1)
            }
        );
        assert_eq!(err.severity(), ErrorSeverity::Fatal);
    }

    #[test]
    fn legend_entries_must_reference_known_content() {
        let mut map = definition();
        map.legend.get_mut("g").unwrap().npc = Some("dragon".into());
        assert!(matches!(
            map.parse(&content()),
            Err(MapError::UnknownType { kind: "npc", .. })
        ));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let mut map = definition();
        map.base[2] = "####".into();
        assert!(matches!(map.parse(&content()), Err(MapError::Ragged { .. })));
    }
}
