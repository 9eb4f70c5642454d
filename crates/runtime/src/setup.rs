//! Builds a ready-to-run battle from a data directory.

use std::sync::Arc;

use tactics_content::ContentFactory;
use tactics_core::{EntityId, EntityKind, Session, World};
use tracing::info;

use crate::error::{Result, RuntimeError};
use crate::runner::BattleRunner;

/// Loads content, places the party on `map` and enlists the opening
/// combatants: the party plus every NPC that can already see one of them.
/// When no NPC can, all of them are enlisted so the fight still has two
/// sides.
pub fn prepare_battle(factory: &ContentFactory, map: &str, seed: u64) -> Result<BattleRunner> {
    let config = factory.load_config()?;
    let content = Arc::new(factory.load_repository()?);
    let party = factory.load_party(&content)?;
    let layout = factory.load_layout(map, &content)?;
    let (mut world, spawns) = World::from_layout(layout, &content)?;

    let mut heroes = Vec::with_capacity(party.len());
    for member in &party {
        let anchor = *spawns
            .get(&member.spawn)
            .ok_or_else(|| RuntimeError::UnknownSpawn(member.spawn.clone()))?;
        heroes.push(world.spawn(member.instantiate(), anchor)?);
    }

    let sight_range = config.sight_range;
    let npcs: Vec<EntityId> = world
        .entities
        .conscious()
        .filter(|e| e.kind == EntityKind::Npc)
        .map(|e| e.id)
        .collect();
    let mut alerted: Vec<EntityId> = npcs
        .iter()
        .copied()
        .filter(|&npc| {
            heroes
                .iter()
                .any(|&hero| world.can_see(npc, hero, sight_range))
        })
        .collect();
    if alerted.is_empty() {
        alerted = npcs;
    }

    info!(
        target: "runtime::setup",
        map,
        seed,
        party = heroes.len(),
        npcs = alerted.len(),
        "battle prepared"
    );

    let session = Session::new(content).with_seed(seed).with_config(config);
    let mut runner = BattleRunner::new(world, session);
    for id in heroes.into_iter().chain(alerted) {
        runner.add_combatant(id)?;
    }
    Ok(runner)
}
