//! Match configuration.
//!
//! Every tunable of a match lives in [`MatchConfig`]. Defaults are built in;
//! a RON file can override any subset of fields.
//!
//! # Example RON
//!
//! ```ron
//! (
//!     regulation_seconds: 120.0,
//!     decks: (
//!         player: ["knight", "archers", "giant", "musketeer", "fireball"],
//!         opponent: ["giant", "prince", "archers", "goblins", "poison"],
//!     ),
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::arena::{Lane, SlotKind, StructureSlot};
use crate::components::{Health, Structure, StructureKind};
use crate::data::CardCatalog;
use crate::error::{GameError, Result};
use crate::factions::PerSide;
use crate::math::{fixed_decimal, Fixed};

/// Fewest cards a deck may hold.
pub const MIN_DECK_SIZE: usize = 5;
/// Largest hand a side may hold.
pub const MAX_HAND_SIZE: usize = 4;

/// Stats of one fixed structure slot kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotStats {
    /// Maximum health.
    pub health: u32,
    /// Damage per hit.
    pub damage: u32,
    /// Attack range.
    #[serde(with = "fixed_decimal")]
    pub range: Fixed,
    /// Seconds between attacks.
    #[serde(with = "fixed_decimal")]
    pub attack_rate: Fixed,
    /// Body radius.
    #[serde(with = "fixed_decimal")]
    pub radius: Fixed,
}

/// Stats for the six slot structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureStats {
    /// Primary structure.
    pub king: SlotStats,
    /// Lane towers.
    pub tower: SlotStats,
}

impl Default for StructureStats {
    fn default() -> Self {
        Self {
            king: SlotStats {
                health: 2400,
                damage: 50,
                range: Fixed::from_num(140),
                attack_rate: Fixed::from_num(1),
                radius: Fixed::from_num(28),
            },
            tower: SlotStats {
                health: 1400,
                damage: 50,
                range: Fixed::from_num(150),
                attack_rate: Fixed::from_num(0.8),
                radius: Fixed::from_num(22),
            },
        }
    }
}

impl StructureStats {
    /// Stats for a slot kind.
    #[must_use]
    pub const fn for_kind(&self, kind: SlotKind) -> &SlotStats {
        match kind {
            SlotKind::King => &self.king,
            SlotKind::Tower => &self.tower,
        }
    }

    /// Instantiate the structure standing in `slot`.
    #[must_use]
    pub fn build(&self, slot: StructureSlot) -> Structure {
        let stats = self.for_kind(slot.kind);
        Structure {
            side: slot.side,
            kind: StructureKind::from(slot.kind),
            card_id: None,
            position: slot.position,
            radius: stats.radius,
            health: Health::new(stats.health),
            damage: stats.damage,
            range: stats.range,
            attack_rate: stats.attack_rate,
            attack_cooldown: Fixed::ZERO,
            target: None,
            lane: Lane::of(slot.position.x),
            destroyed: false,
            spawner: None,
            lifetime: None,
        }
    }
}

/// All tunables of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Number of countdown steps before play starts.
    pub countdown_steps: u32,
    /// Seconds per countdown step.
    #[serde(with = "fixed_decimal")]
    pub countdown_step_seconds: Fixed,
    /// Regulation duration in seconds.
    #[serde(with = "fixed_decimal")]
    pub regulation_seconds: Fixed,
    /// Overtime duration in seconds.
    #[serde(with = "fixed_decimal")]
    pub overtime_seconds: Fixed,
    /// Largest frame delta a single tick integrates.
    #[serde(with = "fixed_decimal")]
    pub max_tick_delta: Fixed,
    /// Elixir each side starts with.
    #[serde(with = "fixed_decimal")]
    pub starting_elixir: Fixed,
    /// Elixir cap.
    #[serde(with = "fixed_decimal")]
    pub max_elixir: Fixed,
    /// Seconds to regenerate one elixir in regulation.
    #[serde(with = "fixed_decimal")]
    pub elixir_regen_seconds: Fixed,
    /// Regeneration multiplier during overtime.
    #[serde(with = "fixed_decimal")]
    pub overtime_regen_multiplier: Fixed,
    /// Cards held in hand.
    pub hand_size: usize,
    /// Maximum random offset applied to each spawned troop.
    #[serde(with = "fixed_decimal")]
    pub spawn_jitter: Fixed,
    /// Slot structure stats.
    pub structures: StructureStats,
    /// Deck list per side.
    pub decks: PerSide<Vec<String>>,
}

fn deck(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| (*id).to_string()).collect()
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            countdown_steps: 3,
            countdown_step_seconds: Fixed::from_num(1),
            regulation_seconds: Fixed::from_num(180),
            overtime_seconds: Fixed::from_num(60),
            max_tick_delta: Fixed::from_num(0.1),
            starting_elixir: Fixed::from_num(5),
            max_elixir: Fixed::from_num(10),
            elixir_regen_seconds: Fixed::from_num(2.8),
            overtime_regen_multiplier: Fixed::from_num(2),
            hand_size: MAX_HAND_SIZE,
            spawn_jitter: Fixed::from_num(10),
            structures: StructureStats::default(),
            decks: PerSide::new(
                deck(&[
                    "knight", "archers", "giant", "musketeer", "fireball", "zap", "guards",
                    "cannon",
                ]),
                deck(&[
                    "giant",
                    "prince",
                    "archers",
                    "goblins",
                    "fireball",
                    "poison",
                    "goblin_hut",
                    "musketeer",
                ]),
            ),
        }
    }
}

impl MatchConfig {
    /// Parse a config from RON; missing fields take their defaults.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| GameError::DataParseError {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Load a config from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| GameError::Io {
            path: path.display().to_string(),
            source,
        })?;
        ron::from_str(&text).map_err(|e| GameError::DataParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Serialize as pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize config: {e}")))
    }

    /// Check ranges and that both decks are playable with `catalog`.
    pub fn validate(&self, catalog: &CardCatalog) -> Result<()> {
        let positive = [
            ("countdown_step_seconds", self.countdown_step_seconds),
            ("regulation_seconds", self.regulation_seconds),
            ("max_tick_delta", self.max_tick_delta),
            ("max_elixir", self.max_elixir),
            ("elixir_regen_seconds", self.elixir_regen_seconds),
            ("overtime_regen_multiplier", self.overtime_regen_multiplier),
        ];
        for (name, value) in positive {
            if value <= Fixed::ZERO {
                return Err(GameError::InvalidConfig(format!("{name} must be positive")));
            }
        }
        if self.overtime_seconds < Fixed::ZERO || self.spawn_jitter < Fixed::ZERO {
            return Err(GameError::InvalidConfig(
                "overtime_seconds and spawn_jitter must not be negative".to_string(),
            ));
        }
        if self.starting_elixir < Fixed::ZERO || self.starting_elixir > self.max_elixir {
            return Err(GameError::InvalidConfig(
                "starting_elixir must lie in [0, max_elixir]".to_string(),
            ));
        }
        if self.hand_size == 0 || self.hand_size > MAX_HAND_SIZE {
            return Err(GameError::InvalidConfig(format!(
                "hand_size must be 1..={MAX_HAND_SIZE}"
            )));
        }
        for deck in [&self.decks.player, &self.decks.opponent] {
            catalog.validate_deck(deck, MIN_DECK_SIZE.max(self.hand_size + 1))?;
        }
        Ok(())
    }
}
