#![allow(dead_code)]

use std::sync::Arc;

use tactics_core::content::{WeaponDefinition, WeaponKind};
use tactics_core::state::{AbilityScores, DamageType, Entity, EntityId, EntityKind, Position};
use tactics_core::{ContentRepository, Grid, ScriptedDice, Session, World};
use tactics_runtime::{BattleRunner, TurnController};

fn melee(name: &str, damage: &str) -> WeaponDefinition {
    WeaponDefinition {
        name: name.into(),
        kind: WeaponKind::Melee,
        damage: damage.parse().expect("valid dice expression"),
        damage_type: DamageType::Slashing,
        range_ft: 5,
        long_range_ft: None,
        finesse: false,
        ammunition: None,
        attack_bonus: 0,
        bonus_damage: None,
    }
}

pub fn content() -> Arc<ContentRepository> {
    Arc::new(
        ContentRepository::builder()
            .weapon("longsword", melee("longsword", "1d8"))
            .weapon("scimitar", melee("scimitar", "1d6"))
            .build(),
    )
}

/// Forced faces first, then a seeded fallback.
pub fn session(faces: impl IntoIterator<Item = u32>) -> Session {
    Session::new(content()).with_dice(ScriptedDice::new(faces).with_fallback_seed(17))
}

pub fn fighter() -> Entity {
    Entity::new("fighter", EntityKind::Pc)
        .with_faction("heroes")
        .with_abilities(AbilityScores {
            strength: 16,
            ..AbilityScores::default()
        })
        .with_hit_points(20)
        .with_armor_class(16)
        .with_weapon("longsword")
}

pub fn goblin() -> Entity {
    Entity::new("goblin", EntityKind::Npc)
        .with_faction("monsters")
        .with_hit_points(7)
        .with_armor_class(13)
        .with_weapon("scimitar")
}

pub fn place(world: &mut World, entity: Entity, at: (i32, i32)) -> EntityId {
    world.spawn(entity, Position::from(at)).expect("free cell")
}

pub fn open_room(width: u32, height: u32) -> World {
    World::new(Grid::new(width, height))
}

pub fn walled(rows: &[&str]) -> World {
    World::new(Grid::from_rows(rows))
}

/// Enlists `members` in order and starts the battle.
pub fn runner(
    world: World,
    members: &[EntityId],
    session: Session,
    player: impl TurnController + 'static,
    npc: impl TurnController + 'static,
) -> BattleRunner {
    let mut runner = BattleRunner::new(world, session);
    runner.set_player_controller(player);
    runner.set_npc_controller(npc);
    for &id in members {
        runner.add_combatant(id).expect("known entity");
    }
    runner.start().expect("battle starts");
    runner
}
