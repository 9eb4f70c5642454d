//! Headless skirmish: loads a map, lets the AI play both sides and prints
//! the outcome.
use anyhow::Result;
use tactics_content::ContentFactory;
use tactics_runtime::{
    AiController, FileCheckpointRepository, RuntimeConfig, prepare_battle, setup_logging,
    state_digest,
};

/// Hard stop for battles without a round cap.
const MAX_TURNS: u32 = 2_000;

fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();
    setup_logging();

    let config = RuntimeConfig::from_env();
    tracing::info!(
        data_dir = %config.data_dir.display(),
        map = %config.map,
        seed = config.seed,
        "starting skirmish"
    );

    let factory = ContentFactory::new(&config.data_dir);
    let mut runner = prepare_battle(&factory, &config.map, config.seed)?;
    runner.set_player_controller(AiController::new());
    runner.set_npc_controller(AiController::new());

    let save_dir = config
        .save_dir
        .join(format!("{}_{}", config.map, config.seed));
    let repository = if config.checkpoints {
        let repository = FileCheckpointRepository::new(&save_dir)?;
        runner = runner.with_checkpoints(FileCheckpointRepository::new(&save_dir)?);
        Some(repository)
    } else {
        None
    };

    let summary = runner.run(Some(MAX_TURNS))?;
    let final_state = runner.checkpoint();

    match &summary.winner {
        Some(faction) => println!("{} win after {} rounds", faction, summary.rounds),
        None => println!("no winner after {} rounds", summary.rounds),
    }
    for (id, name, hp) in &summary.survivors {
        println!("  {} {} ({} hp)", id, name, hp);
    }
    println!("state digest: {}", state_digest(&final_state)?);

    if let Some(repository) = repository {
        let path = repository.export_json(&final_state, "final")?;
        println!("battle exported to {}", path.display());
    }
    Ok(())
}
