//! # Lane Core
//!
//! Deterministic simulation core for a two-sided lane-combat card battler.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No IO inside the tick loop
//! - No unseeded randomness
//! - No floating-point math (uses fixed-point)
//!
//! A match is therefore a pure function of its seed, config, catalog, frame
//! deltas and card plays, which is what replays and the determinism tests
//! rely on.
//!
//! ## Crate Structure
//!
//! - [`arena`] - Arena geometry: river, bridges, lanes, slots, deploy zones
//! - [`data`] - Card definitions and the catalog
//! - [`components`] / [`entities`] - Tagged entities and their store
//! - [`targeting`] / [`combat`] - Target selection, attacks, spells, deaths
//! - [`pathfinding`] / [`movement`] - River-crossing router and movement
//! - [`economy`] / [`deck`] - Elixir and hand management
//! - [`ai`] - Heuristic AI opponent
//! - [`simulation`] - Match controller and tick loop
//! - [`snapshot`] / [`replay`] - Read-only views and recorded matches

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod arena;
pub mod combat;
pub mod components;
pub mod config;
pub mod data;
pub mod deck;
pub mod economy;
pub mod entities;
pub mod error;
pub mod factions;
pub mod math;
pub mod movement;
pub mod pathfinding;
pub mod player_facade;
pub mod replay;
pub mod rng;
pub mod simulation;
pub mod snapshot;
pub mod targeting;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ai::{AiOpponent, Difficulty, DifficultyProfile};
    pub use crate::arena::{BridgeId, Lane, RiverZone};
    pub use crate::components::*;
    pub use crate::config::MatchConfig;
    pub use crate::data::{CardCatalog, CardData, CardKind, CardRole};
    pub use crate::economy::PlayerEconomy;
    pub use crate::entities::EntityStore;
    pub use crate::error::{GameError, Result};
    pub use crate::factions::{PerSide, Side};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::player_facade::{PlayerFacade, SideController};
    pub use crate::replay::{Replay, ReplayPlayer, ReplayRecorder};
    pub use crate::simulation::{
        MatchPhase, PlayOutcome, RejectReason, Simulation, TickEvents,
    };
    pub use crate::snapshot::{MatchResult, MatchSnapshot};
}
