//! Heuristic AI for NPCs and autopiloted party members.
//!
//! - [`behavior`] holds the selector/sequence primitives.
//! - [`memory`] tracks where each entity last saw its enemies.
//! - [`listener`] feeds that memory from movement events.
//! - [`controller`] turns it all into actions, one tick at a time.

pub mod behavior;
pub mod controller;
pub mod listener;
pub mod memory;

pub use behavior::{Behavior, Selector, Sequence, Status};
pub use controller::{AiContext, AiController, AiReactions};
pub use listener::movement_listener;
pub use memory::{AiMemory, SharedMemory};
