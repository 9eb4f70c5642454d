#![allow(dead_code)]

use std::sync::Arc;

use tactics_core::content::{
    CastingTime, ItemDefinition, ItemEffect, SpellDefinition, SpellEffect, SpellTarget,
    WeaponDefinition, WeaponKind,
};
use tactics_core::state::{
    Ability, AbilityScores, DamageType, Entity, EntityId, EntityKind, Position, SpellcasterProfile,
    World,
};
use tactics_core::{ContentRepository, DiceExpr, Grid, ScriptedDice, Session};

pub fn dice(expr: &str) -> DiceExpr {
    expr.parse().expect("valid dice expression")
}

fn melee(name: &str, damage: &str, damage_type: DamageType) -> WeaponDefinition {
    WeaponDefinition {
        name: name.into(),
        kind: WeaponKind::Melee,
        damage: dice(damage),
        damage_type,
        range_ft: 5,
        long_range_ft: None,
        finesse: false,
        ammunition: None,
        attack_bonus: 0,
        bonus_damage: None,
    }
}

pub fn content() -> Arc<ContentRepository> {
    let shortbow = WeaponDefinition {
        kind: WeaponKind::Ranged,
        range_ft: 80,
        long_range_ft: Some(320),
        ammunition: Some("arrow".into()),
        ..melee("shortbow", "1d6", DamageType::Piercing)
    };
    let rebuke = SpellDefinition {
        name: "hellish_rebuke".into(),
        level: 1,
        range_ft: 60,
        casting_time: CastingTime::Reaction,
        target: SpellTarget::Enemy,
        effect: SpellEffect::Save {
            ability: Ability::Dexterity,
            damage: dice("2d10"),
            damage_type: DamageType::Fire,
            half_on_success: true,
        },
    };
    let potion = ItemDefinition {
        name: "healing_potion".into(),
        range_ft: 5,
        effect: ItemEffect::Heal {
            amount: dice("2d4+2"),
        },
    };
    Arc::new(
        ContentRepository::builder()
            .weapon("longsword", melee("longsword", "1d8", DamageType::Slashing))
            .weapon("scimitar", melee("scimitar", "1d6", DamageType::Slashing))
            .weapon("shortbow", shortbow)
            .spell("hellish_rebuke", rebuke)
            .item("healing_potion", potion)
            .build(),
    )
}

pub fn session(faces: impl IntoIterator<Item = u32>) -> Session {
    Session::new(content()).with_dice(ScriptedDice::new(faces))
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

pub fn wizard() -> Entity {
    Entity::new("wizard", EntityKind::Pc)
        .with_faction("heroes")
        .with_hit_points(10)
        .with_armor_class(10)
        .with_spellcasting(SpellcasterProfile {
            ability: Ability::Intelligence,
            spells: vec!["hellish_rebuke".into()],
            slots: vec![1],
        })
}

/// Open 8x5 room with `a` at (1,1) and `b` right next to it at (2,1).
pub fn duel(a: Entity, b: Entity) -> (World, EntityId, EntityId) {
    let mut world = World::new(Grid::new(8, 5));
    let a = world.spawn(a, Position::new(1, 1)).expect("free cell");
    let b = world.spawn(b, Position::new(2, 1)).expect("free cell");
    (world, a, b)
}
