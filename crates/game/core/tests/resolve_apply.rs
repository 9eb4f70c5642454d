mod common;

use common::{content, duel, fighter, goblin, session};
use tactics_core::action::{
    ApplyContext, Continuation, DamageHandler, EffectHandler, ParameterRequest, ParameterValue,
    drive,
};
use tactics_core::state::{EntityId, Position, Statuses};
use tactics_core::{
    Action, ActionError, ActionKind, Effect, EffectRegistry, EffectTag, GameConfig, Intent,
    ScriptedDice, Session,
};

fn attack(source: EntityId, target: EntityId, weapon: &str) -> Action {
    Action::new(
        source,
        Intent::Attack {
            weapon: weapon.into(),
            target,
        },
    )
}

#[test]
fn natural_twenty_always_hits_and_doubles_dice() {
    let (world, hero, gob) = duel(fighter(), goblin().with_armor_class(30));
    let mut session = session([20, 1, 1]);

    let resolved = attack(hero, gob, "longsword")
        .resolve(&world, None, &mut session)
        .unwrap();

    assert!(resolved.is_hit());
    let damage = resolved.effects()[0].as_damage().unwrap();
    assert!(damage.critical);
    // two d8 showing 1, plus the strength modifier
    assert_eq!(damage.amount, 5);
}

#[test]
fn natural_one_always_misses() {
    let (world, hero, gob) = duel(fighter(), goblin().with_armor_class(1));
    let mut session = session([1]);

    let resolved = attack(hero, gob, "longsword")
        .resolve(&world, None, &mut session)
        .unwrap();

    assert!(!resolved.is_hit());
    assert!(matches!(resolved.effects(), [Effect::Miss(_)]));
}

#[test]
fn resolve_is_repeatable_with_the_same_seed() {
    let (world, hero, gob) = duel(fighter(), goblin());
    let action = attack(hero, gob, "longsword");

    let first = action
        .resolve(&world, None, &mut Session::new(content()).with_seed(42))
        .unwrap();
    let second = action
        .resolve(&world, None, &mut Session::new(content()).with_seed(42))
        .unwrap();

    assert_eq!(first, second);
}

#[test]
fn scripted_miss_then_kill() {
    let (mut world, hero, gob) = duel(fighter(), goblin());
    let mut session = session([1, 19, 4]);

    let first = attack(hero, gob, "longsword")
        .resolve(&world, None, &mut session)
        .unwrap();
    assert!(!first.is_hit());
    first.apply(&mut world, None, &mut session).unwrap();
    assert_eq!(world.entity(gob).unwrap().hit_points(), 7);

    let second = attack(hero, gob, "longsword")
        .resolve(&world, None, &mut session)
        .unwrap();
    assert_eq!(second.effects()[0].as_damage().unwrap().amount, 7);
    second.apply(&mut world, None, &mut session).unwrap();

    let gob = world.entity(gob).unwrap();
    assert_eq!(gob.hit_points(), 0);
    assert!(gob.is_dead());
}

#[test]
fn out_of_reach_attack_is_rejected() {
    let (mut world, hero, gob) = duel(fighter(), goblin());
    world.grid.move_entity(gob, Position::new(5, 3)).unwrap();

    let err = attack(hero, gob, "longsword")
        .resolve(&world, None, &mut Session::new(content()))
        .unwrap_err();

    assert!(matches!(err, ActionError::OutOfRange { range_ft: 5, .. }));
}

#[test]
fn ranged_attacks_spend_ammunition() {
    let archer = fighter().with_weapon("shortbow").with_item("arrow", 1);
    let (mut world, hero, gob) = duel(archer, goblin().with_hit_points(50));
    let mut session = Session::new(content()).with_seed(3);

    let resolved = attack(hero, gob, "shortbow")
        .resolve(&world, None, &mut session)
        .unwrap();
    resolved.apply(&mut world, None, &mut session).unwrap();
    assert_eq!(world.entity(hero).unwrap().inventory().count("arrow"), 0);

    let err = attack(hero, gob, "shortbow")
        .resolve(&world, None, &mut session)
        .unwrap_err();
    assert!(matches!(err, ActionError::OutOfAmmunition { .. }));
}

#[test]
fn attacking_reveals_a_hidden_attacker() {
    let (mut world, hero, gob) = duel(fighter().with_status(Statuses::HIDDEN), goblin());
    let mut session = session([1]);

    let resolved = attack(hero, gob, "longsword")
        .resolve(&world, None, &mut session)
        .unwrap();
    resolved.apply(&mut world, None, &mut session).unwrap();

    assert!(!world.entity(hero).unwrap().has_status(Statuses::HIDDEN));
}

#[test]
fn potion_is_consumed_and_healing_is_capped() {
    let (mut world, hero, _) = duel(fighter().with_item("healing_potion", 2), goblin());
    let mut session = Session::new(content()).with_seed(9);

    let action = Action::new(
        hero,
        Intent::UseItem {
            item: "healing_potion".into(),
            target: hero,
        },
    );
    action
        .resolve(&world, None, &mut session)
        .unwrap()
        .apply(&mut world, None, &mut session)
        .unwrap();

    let hero = world.entity(hero).unwrap();
    assert_eq!(hero.inventory().count("healing_potion"), 1);
    assert_eq!(hero.hit_points(), hero.max_hit_points);
}

/// Applies damage, then fails.
struct Brittle;

impl EffectHandler for Brittle {
    fn handles(&self) -> &'static [EffectTag] {
        &[EffectTag::Damage]
    }

    fn apply(&self, effect: &Effect, ctx: &mut ApplyContext<'_>) -> Result<(), ActionError> {
        DamageHandler.apply(effect, ctx)?;
        Err(ActionError::PreconditionViolation {
            entity: EntityId(0),
            reason: "brittle handler",
        })
    }
}

#[test]
fn failed_apply_rolls_back_every_change() {
    let (mut world, hero, gob) = duel(fighter(), goblin());
    let before = world.clone();
    let mut session = Session::new(content())
        .with_dice(ScriptedDice::new([19, 2]))
        .with_effects(EffectRegistry::standard().register(Brittle));

    let resolved = attack(hero, gob, "longsword")
        .resolve(&world, None, &mut session)
        .unwrap();
    let err = resolved.apply(&mut world, None, &mut session).unwrap_err();

    assert!(matches!(err, ActionError::PreconditionViolation { .. }));
    assert_eq!(world, before);
}

#[test]
fn missing_handler_is_reported() {
    let (mut world, hero, _) = duel(fighter(), goblin());
    let mut session = Session::new(content()).with_effects(EffectRegistry::empty());

    let resolved = Action::new(hero, Intent::Dodge)
        .resolve(&world, None, &mut session)
        .unwrap();
    let err = resolved.apply(&mut world, None, &mut session).unwrap_err();

    assert_eq!(err, ActionError::UnhandledEffect(EffectTag::Dodge));
    assert!(!world.entity(hero).unwrap().has_status(Statuses::DODGE));
}

#[test]
fn protocol_drives_attack_to_completion() {
    let (world, hero, gob) = duel(fighter(), goblin());
    let content = content();

    let action = drive(
        ActionKind::Attack,
        hero,
        &world,
        None,
        &content,
        &GameConfig::default(),
        |request| match request {
            ParameterRequest::SelectWeapon { options } => {
                options.first().cloned().map(ParameterValue::Weapon)
            }
            ParameterRequest::SelectTarget { options, .. } => {
                options.first().copied().map(ParameterValue::Target)
            }
            _ => None,
        },
    )
    .unwrap();

    assert_eq!(action, Some(attack(hero, gob, "longsword")));
}

#[test]
fn protocol_can_be_cancelled_midway() {
    let (world, hero, _) = duel(fighter(), goblin());
    let content = content();
    let mut asked = 0;

    let action = drive(
        ActionKind::Attack,
        hero,
        &world,
        None,
        &content,
        &GameConfig::default(),
        |_| {
            asked += 1;
            None
        },
    )
    .unwrap();

    assert_eq!(action, None);
    assert_eq!(asked, 1);
    assert!(matches!(
        ActionKind::Hide.build(hero),
        Continuation::Ready(Action { intent: Intent::Hide, .. })
    ));
}
