use std::fs;
use std::path::{Path, PathBuf};

use tactics_content::ContentFactory;
use tactics_core::grid::Terrain;
use tactics_core::{Position, World};

fn shipped_data() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../data")
}

/// Copies the shipped catalogs into a scratch directory so single files can be broken.
fn scratch_copy() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for file in [
        "config.toml",
        "weapons.ron",
        "spells.ron",
        "items.ron",
        "objects.ron",
        "npcs.ron",
        "party.ron",
    ] {
        fs::copy(shipped_data().join(file), dir.path().join(file)).unwrap();
    }
    fs::create_dir(dir.path().join("maps")).unwrap();
    dir
}

#[test]
fn shipped_content_loads() {
    let factory = ContentFactory::new(shipped_data());

    let config = factory.load_config().unwrap();
    assert_eq!(config.max_rounds, Some(20));

    let content = factory.load_repository().unwrap();
    assert!(content.weapon("longsword").is_ok());
    assert!(content.spell("hellish_rebuke").is_ok());
    assert!(content.has_item("healing_potion"));
    assert!(content.object("door").is_some());
    assert!(content.npc("goblin").is_some());

    let party = factory.load_party(&content).unwrap();
    assert_eq!(party.len(), 3);
}

#[test]
fn shipped_maps_place_every_party_member() {
    let factory = ContentFactory::new(shipped_data());
    let content = factory.load_repository().unwrap();
    let party = factory.load_party(&content).unwrap();

    for map in ["guard_post", "crossroads"] {
        let layout = factory.load_layout(map, &content).unwrap();
        assert_eq!(layout.name, map);
        assert!(!layout.npcs.is_empty());

        let (world, spawns) = World::from_layout(layout, &content).unwrap();
        for member in &party {
            let spawn = spawns[&member.spawn];
            assert!(world.grid.occupants(spawn).is_empty(), "{map}: {spawn}");
        }
    }
}

#[test]
fn guard_post_door_starts_closed() {
    let factory = ContentFactory::new(shipped_data());
    let content = factory.load_repository().unwrap();
    let layout = factory.load_layout("guard_post", &content).unwrap();

    let door = Position::new(5, 2);
    assert_eq!(layout.grid.terrain(door), Some(Terrain::Floor));
    let object = layout.grid.object(door).unwrap();
    assert!(object.is_door());
    assert!(!object.is_open());
    assert!(object.blocks_sight());
}

#[test]
fn dangling_weapon_reference_is_fatal() {
    let dir = scratch_copy();
    fs::write(
        dir.path().join("npcs.ron"),
        r#"[
            ("kobold", (
                name: "Kobold",
                hit_points: 5,
                armor_class: 12,
                speed_ft: 30,
                faction: "kobolds",
                weapons: ["sling"],
            )),
        ]"#,
    )
    .unwrap();

    let err = ContentFactory::new(dir.path()).load_repository().unwrap_err();
    assert!(err.to_string().contains("unknown weapon 'sling'"), "{err}");
}

#[test]
fn unknown_map_token_is_fatal() {
    let dir = scratch_copy();
    fs::write(
        dir.path().join("maps/broken.toml"),
        "name = \"broken\"\nbase = [\"#.?.#\"]\n",
    )
    .unwrap();
    let factory = ContentFactory::new(dir.path());
    let content = factory.load_repository().unwrap();

    assert!(factory.load_map("broken").is_ok());
    let err = factory.load_layout("broken", &content).unwrap_err();
    assert!(err.to_string().contains("unknown token `?`"), "{err}");
}

#[test]
fn missing_catalog_names_the_file() {
    let dir = scratch_copy();
    fs::remove_file(dir.path().join("spells.ron")).unwrap();

    let err = ContentFactory::new(dir.path()).load_repository().unwrap_err();
    assert!(err.to_string().contains("spells.ron"), "{err}");
}
