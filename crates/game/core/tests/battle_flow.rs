mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use common::{content, duel, fighter, goblin, wizard};
use tactics_core::action::{ApplyContext, EffectHandler, StanceHandler};
use tactics_core::battle::DefaultReactions;
use tactics_core::grid::Allegiance;
use tactics_core::state::{EntityId, Faction, Position, World};
use tactics_core::{
    Action, ActionError, Battle, BattleEvent, BattlePhase, BattleState, Effect, EffectRegistry,
    EffectTag, EventKind, Intent, Resource, ScriptedDice, Session,
};

fn scripted(faces: impl IntoIterator<Item = u32>) -> Session {
    Session::new(content()).with_dice(ScriptedDice::new(faces))
}

fn battle_of(world: &World, members: &[EntityId], session: &mut Session) -> Battle {
    let mut battle = Battle::new();
    for &id in members {
        battle.add(world, id).unwrap();
    }
    battle.start(world, session).unwrap();
    battle
}

fn walk(mover: EntityId, cells: &[(i32, i32)]) -> Action {
    Action::new(
        mover,
        Intent::Move {
            path: cells.iter().map(|&cell| Position::from(cell)).collect(),
        },
    )
}

fn count_events(battle: &mut Battle, kind: EventKind) -> Rc<Cell<u32>> {
    let seen = Rc::new(Cell::new(0));
    let counter = Rc::clone(&seen);
    battle.subscribe(kind, move |_, _| counter.set(counter.get() + 1));
    seen
}

#[test]
fn dodge_costs_exactly_one_action() {
    let (mut world, hero, gob) = duel(fighter(), goblin());
    let mut session = Session::new(content()).with_seed(1);
    let mut battle = battle_of(&world, &[hero, gob], &mut session);

    let current = battle.begin_turn(&mut world, &mut session).unwrap();
    let before = battle.state().ledger(current).unwrap().clone();
    battle
        .perform(&mut world, &mut session, &Action::new(current, Intent::Dodge))
        .unwrap();

    let after = battle.state().ledger(current).unwrap();
    assert_eq!(after.action, before.action - 1);
    assert_eq!(after.bonus_action, before.bonus_action);
    assert_eq!(after.reaction, before.reaction);
    assert_eq!(after.movement_ft, before.movement_ft);

    let again = battle.perform(&mut world, &mut session, &Action::new(current, Intent::Dodge));
    assert_eq!(
        again.unwrap_err(),
        ActionError::InsufficientResource {
            entity: current,
            resource: Resource::Action,
        }
    );
}

#[test]
fn battle_ends_when_the_last_enemy_falls() {
    let (mut world, hero, gob) = duel(fighter(), goblin());
    // initiative 15 and 5, then a hit for 4 + 3
    let mut session = scripted([15, 5, 19, 4]);
    let mut battle = battle_of(&world, &[hero, gob], &mut session);
    let ended = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&ended);
    battle.subscribe(EventKind::BattleEnd, move |event, _| {
        if let BattleEvent::BattleEnd { winner, .. } = event {
            *sink.borrow_mut() = Some(winner.clone());
        }
    });

    assert_eq!(battle.begin_turn(&mut world, &mut session).unwrap(), hero);
    let attack = Action::new(
        hero,
        Intent::Attack {
            weapon: "longsword".into(),
            target: gob,
        },
    );
    battle.perform(&mut world, &mut session, &attack).unwrap();
    assert!(world.entity(gob).unwrap().is_dead());

    assert!(battle.end_turn(&world, &mut session).unwrap());
    assert_eq!(battle.state().phase, BattlePhase::Ended);
    assert_eq!(*ended.borrow(), Some(Some(Faction::new("heroes"))));
}

#[test]
fn leaving_reach_provokes_exactly_one_opportunity_attack() {
    let (mut world, hero, gob) = duel(fighter(), goblin());
    // goblin acts first; the fighter's swing comes up 1
    let mut session = scripted([5, 15, 1]);
    let mut battle = battle_of(&world, &[hero, gob], &mut session);
    battle.set_reaction_handler(hero, DefaultReactions);
    let provoked = count_events(&mut battle, EventKind::OpportunityAttack);

    assert_eq!(battle.begin_turn(&mut world, &mut session).unwrap(), gob);
    battle
        .perform(&mut world, &mut session, &walk(gob, &[(2, 1), (3, 1), (4, 1)]))
        .unwrap();

    assert_eq!(provoked.get(), 1);
    assert_eq!(world.position_of(gob), Some(Position::new(4, 1)));
    assert_eq!(battle.state().ledger(hero).unwrap().reaction, 0);
    assert_eq!(battle.state().ledger(gob).unwrap().movement_ft, 20);
}

#[test]
fn mover_dropped_by_an_opportunity_attack_stops_where_it_was_hit() {
    let (mut world, hero, gob) = duel(fighter(), goblin().with_hit_points(1));
    // goblin first; the fighter hits for 4 + 3
    let mut session = scripted([5, 15, 19, 4]);
    let mut battle = battle_of(&world, &[hero, gob], &mut session);
    battle.set_reaction_handler(hero, DefaultReactions);
    let provoked = count_events(&mut battle, EventKind::OpportunityAttack);

    assert_eq!(battle.begin_turn(&mut world, &mut session).unwrap(), gob);
    battle
        .perform(&mut world, &mut session, &walk(gob, &[(2, 1), (3, 1), (4, 1)]))
        .unwrap();

    assert_eq!(provoked.get(), 1);
    assert!(world.entity(gob).unwrap().is_dead());
    assert_eq!(world.position_of(gob), Some(Position::new(2, 1)));
}

#[test]
fn mover_that_survives_the_swing_finishes_its_path() {
    let (mut world, hero, gob) = duel(fighter(), goblin());
    // goblin first; the fighter hits for 1 + 3
    let mut session = scripted([5, 15, 19, 1]);
    let mut battle = battle_of(&world, &[hero, gob], &mut session);
    battle.set_reaction_handler(hero, DefaultReactions);

    battle.begin_turn(&mut world, &mut session).unwrap();
    battle
        .perform(&mut world, &mut session, &walk(gob, &[(2, 1), (3, 1), (4, 1)]))
        .unwrap();

    let goblin = world.entity(gob).unwrap();
    assert_eq!(goblin.hit_points(), 3);
    assert!(!goblin.is_dead());
    assert_eq!(world.position_of(gob), Some(Position::new(4, 1)));
}

#[test]
fn hostile_bystanders_block_movement_during_a_battle() {
    let (mut world, hero, gob) = duel(fighter(), goblin());
    let orc = world
        .spawn(goblin().with_faction("raiders"), Position::new(1, 3))
        .unwrap();
    let squire = world.spawn(fighter(), Position::new(3, 3)).unwrap();
    let mut session = Session::new(content()).with_seed(2);
    let battle = battle_of(&world, &[hero, gob], &mut session);
    let allegiance: &dyn Allegiance = battle.state();

    assert!(!battle.state().is_member(orc));
    assert!(!battle.state().is_member(squire));
    assert!(allegiance.is_hostile(&world.entities, hero, orc));
    assert!(!world.grid.is_passable(
        &world.entities,
        hero,
        Position::new(1, 3),
        Some(allegiance)
    ));
    assert!(world.grid.is_passable(
        &world.entities,
        hero,
        Position::new(3, 3),
        Some(allegiance)
    ));
}

#[test]
fn staying_in_reach_or_disengaging_provokes_nothing() {
    let (mut world, hero, gob) = duel(fighter(), goblin());
    let mut session = scripted([5, 15]);
    let mut battle = battle_of(&world, &[hero, gob], &mut session);
    battle.set_reaction_handler(hero, DefaultReactions);
    let provoked = count_events(&mut battle, EventKind::OpportunityAttack);

    battle.begin_turn(&mut world, &mut session).unwrap();
    battle
        .perform(&mut world, &mut session, &walk(gob, &[(2, 1), (2, 2)]))
        .unwrap();
    battle
        .perform(&mut world, &mut session, &Action::new(gob, Intent::Disengage))
        .unwrap();
    battle
        .perform(&mut world, &mut session, &walk(gob, &[(2, 2), (3, 2), (4, 2)]))
        .unwrap();

    assert_eq!(provoked.get(), 0);
    assert_eq!(battle.state().ledger(hero).unwrap().reaction, 1);
}

#[test]
fn damage_triggers_a_reaction_spell() {
    let (mut world, wiz, gob) = duel(wizard(), goblin());
    // initiative, scimitar hit for 2, failed save, 2d10 fire
    let mut session = scripted([5, 15, 15, 2, 1, 5, 5]);
    let mut battle = battle_of(&world, &[wiz, gob], &mut session);
    battle.set_reaction_handler(wiz, DefaultReactions);

    assert_eq!(battle.begin_turn(&mut world, &mut session).unwrap(), gob);
    let attack = Action::new(
        gob,
        Intent::Attack {
            weapon: "scimitar".into(),
            target: wiz,
        },
    );
    let tx = battle.perform(&mut world, &mut session, &attack).unwrap();

    assert!(!tx.is_empty());
    assert_eq!(world.entity(wiz).unwrap().hit_points(), 8);
    assert_eq!(world.entity(wiz).unwrap().slots_at(1), 0);
    assert!(world.entity(gob).unwrap().is_dead());
    assert_eq!(battle.state().ledger(wiz).unwrap().reaction, 0);
    assert!(battle.battle_ends(&world));
}

/// Grants the dash, then fails.
struct BrokenDash;

impl EffectHandler for BrokenDash {
    fn handles(&self) -> &'static [EffectTag] {
        &[EffectTag::Dash]
    }

    fn apply(&self, effect: &Effect, ctx: &mut ApplyContext<'_>) -> Result<(), ActionError> {
        StanceHandler.apply(effect, ctx)?;
        Err(ActionError::PreconditionViolation {
            entity: EntityId(0),
            reason: "broken dash",
        })
    }
}

#[test]
fn failed_apply_restores_the_ledger() {
    let (mut world, hero, gob) = duel(fighter(), goblin());
    let mut session = Session::new(content())
        .with_seed(4)
        .with_effects(EffectRegistry::standard().register(BrokenDash));
    let mut battle = battle_of(&world, &[hero, gob], &mut session);
    let current = battle.begin_turn(&mut world, &mut session).unwrap();
    let before = battle.state().clone();

    let result = battle.perform(&mut world, &mut session, &Action::new(current, Intent::Dash));

    assert!(result.is_err());
    assert_eq!(battle.state(), &before);
}

#[test]
fn battle_state_survives_a_checkpoint() {
    let (world, hero, gob) = duel(fighter(), goblin());
    let mut session = Session::new(content()).with_seed(11);
    let battle = battle_of(&world, &[hero, gob], &mut session);

    let bytes = bincode::serialize(battle.state()).unwrap();
    let restored: BattleState = bincode::deserialize(&bytes).unwrap();
    assert_eq!(&restored, battle.state());

    let json = serde_json::to_string(&world).unwrap();
    let reloaded: World = serde_json::from_str(&json).unwrap();
    assert_eq!(reloaded, world);
}
