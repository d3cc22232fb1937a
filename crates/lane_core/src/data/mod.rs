//! Data structures for the card catalog.
//!
//! This module contains pure data structures that define cards. All structs
//! are designed to be deserialized from RON files; the built-in catalog is
//! used when no file is supplied.
//!
//! **Note:** The simulation never touches the file system during a tick.
//! Loading happens once, before a match is created.

mod card_data;
mod catalog;

pub use card_data::{
    CardData, CardKind, CardRole, CardTraits, DeathExplosion, SpawnRule, SpellData, SpellTarget,
    StatusKind, StatusPayload,
};
pub use catalog::CardCatalog;
