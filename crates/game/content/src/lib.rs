//! Data-driven content definitions and loaders.
//!
//! This crate reads the static content of a skirmish from RON/TOML data files:
//! - Weapon, spell, item and object catalogs (RON)
//! - NPC templates and the player party (RON)
//! - Map layouts (TOML)
//! - Game configuration (TOML)
//!
//! Everything lands in core types ([`tactics_core::ContentRepository`],
//! [`tactics_core::MapDefinition`], [`tactics_core::GameConfig`]); this crate
//! adds no rules of its own beyond cross-reference validation.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{
    ConfigLoader, ContentFactory, ItemLoader, LoadResult, MapLoader, NpcLoader, ObjectLoader,
    PartyLoader, PartyMember, SpellLoader, WeaponLoader,
};
