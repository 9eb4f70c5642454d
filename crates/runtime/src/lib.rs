//! Headless orchestration for tactical battles.
//!
//! This crate drives [`tactics_core`] battles to completion: turn controllers
//! decide what each combatant does, the AI controller plays NPCs (and the
//! party, when nobody is at the keyboard), and checkpoints persist progress.
//!
//! - [`runner`] owns one battle and steps it turn by turn
//! - [`controller`] defines where decisions come from
//! - [`ai`] is the heuristic controller and its memory
//! - [`repository`] stores and restores checkpoints
//! - [`setup`] builds a battle from a data directory
pub mod ai;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod repository;
pub mod runner;
pub mod setup;

pub use ai::{AiController, AiMemory, SharedMemory};
pub use config::RuntimeConfig;
pub use controller::{IdleController, ScriptedController, TurnController};
pub use error::{ControllerKind, Result, RuntimeError};
pub use logging::setup_logging;
pub use repository::{
    BattleCheckpoint, CheckpointId, CheckpointRepository, FileCheckpointRepository,
    InMemoryCheckpointRepository, RepositoryError, state_digest,
};
pub use runner::{BattleRunner, BattleSummary};
pub use setup::prepare_battle;
