//! World state: combatants and their attributes.

mod common;
mod entities;
mod entity;
mod world;

pub use common::{EntityId, Footprint, Position};
pub use entities::Entities;
pub use entity::{
    Ability, AbilityScores, DamageType, DeathSaves, Entity, EntityKind, Faction, Inventory,
    MultiattackGroup, MultiattackProfile, Profiles, Size, SneakAttackProfile, SpellcasterProfile,
    Statuses,
};
pub use world::{World, WorldError};
