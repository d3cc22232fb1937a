//! Test fixtures and helpers.
//!
//! Match builders that skip the countdown, custom catalogs and position
//! shorthands for consistent testing.

use fixed::types::I32F32;
use lane_core::ai::Difficulty;
use lane_core::components::{Entity, EntityId, Unit};
use lane_core::config::MatchConfig;
use lane_core::data::{CardCatalog, CardData, CardKind, CardRole, CardTraits};
use lane_core::factions::Side;
use lane_core::math::{Fixed, Vec2Fixed};
use lane_core::simulation::{MatchPhase, Simulation};

/// Standard frame delta used by fixtures.
pub const FRAME: f64 = 0.1;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Integer world position.
#[must_use]
pub fn pos(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::from_ints(x, y)
}

/// The standard frame delta.
#[must_use]
pub fn frame() -> Fixed {
    fixed_f(FRAME)
}

/// Config with no countdown, so matches start in `Playing`.
#[must_use]
pub fn quick_config() -> MatchConfig {
    MatchConfig {
        countdown_steps: 0,
        ..MatchConfig::default()
    }
}

/// A default-catalog match that is already in `Playing`.
///
/// # Panics
///
/// Panics if the default config fails validation.
#[must_use]
pub fn playing_match(seed: u64) -> Simulation {
    let sim = Simulation::new(quick_config(), CardCatalog::default_catalog(), seed)
        .expect("default config is valid");
    assert_eq!(sim.phase(), MatchPhase::Playing);
    sim
}

/// A match with the given sides under AI control, already in `Playing`.
#[must_use]
pub fn ai_match(seed: u64, player: Option<Difficulty>, opponent: Option<Difficulty>) -> Simulation {
    let mut sim = playing_match(seed);
    sim.set_ai(Side::Player, player);
    sim.set_ai(Side::Opponent, opponent);
    sim
}

/// Advance `sim` by `frames` standard frames.
pub fn run_frames(sim: &mut Simulation, frames: usize) {
    for _ in 0..frames {
        sim.tick(frame());
    }
}

/// A plain melee troop definition for custom catalogs.
#[must_use]
pub fn simple_troop(id: &str, cost: u32, health: u32, damage: u32) -> CardData {
    CardData {
        id: id.to_string(),
        name: id.to_string(),
        kind: CardKind::Troop,
        role: CardRole::Melee,
        cost,
        health,
        damage,
        speed: fixed(45),
        range: fixed(20),
        attack_rate: fixed(1),
        radius: fixed(8),
        sight: fixed(110),
        count: 1,
        traits: CardTraits::default(),
        spell: None,
    }
}

/// Default catalog plus extra cards.
///
/// # Panics
///
/// Panics if an extra card collides with a default id or fails validation.
#[must_use]
pub fn catalog_with(extra: Vec<CardData>) -> CardCatalog {
    let mut cards: Vec<CardData> = CardCatalog::default_catalog().iter().cloned().collect();
    cards.extend(extra);
    CardCatalog::from_cards(cards).expect("extended catalog is valid")
}

/// Drop a unit straight into the store, bypassing the hand and elixir.
///
/// # Panics
///
/// Panics if the card is not in the simulation's catalog.
pub fn place_unit(sim: &mut Simulation, card: &str, side: Side, at: Vec2Fixed) -> EntityId {
    let unit = {
        let card = sim.catalog().get(card).expect("card exists");
        Unit::from_card(card, side, at)
    };
    sim.store_mut().insert(Entity::Unit(unit))
}

/// Id of a side's structure at `slot_position`.
///
/// # Panics
///
/// Panics if no structure stands there.
#[must_use]
pub fn structure_at(sim: &Simulation, slot_position: Vec2Fixed) -> EntityId {
    sim.store()
        .iter_sorted()
        .find(|(_, entity)| entity.as_structure().is_some() && entity.position() == slot_position)
        .map(|(id, _)| id)
        .expect("structure at slot")
}
