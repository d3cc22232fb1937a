//! Elixir economy.
//!
//! Each side holds a single regenerating resource. Regeneration is continuous
//! (fixed-point per tick) and clamped to the cap; overtime multiplies the
//! rate. Spending is all-or-nothing.

use serde::{Deserialize, Serialize};

use crate::config::MatchConfig;
use crate::math::{clamp_fixed, fixed_serde, Fixed};

/// One side's elixir state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerEconomy {
    /// Current elixir.
    #[serde(with = "fixed_serde")]
    elixir: Fixed,
    /// Cap.
    #[serde(with = "fixed_serde")]
    max: Fixed,
    /// Elixir per second in regulation.
    #[serde(with = "fixed_serde")]
    regen_per_second: Fixed,
    /// Rate multiplier applied during overtime.
    #[serde(with = "fixed_serde")]
    overtime_multiplier: Fixed,
}

impl PlayerEconomy {
    /// Create an economy holding `elixir`, clamped to `[0, max]`.
    #[must_use]
    pub fn new(
        elixir: Fixed,
        max: Fixed,
        regen_per_second: Fixed,
        overtime_multiplier: Fixed,
    ) -> Self {
        Self {
            elixir: clamp_fixed(elixir, Fixed::ZERO, max),
            max,
            regen_per_second,
            overtime_multiplier,
        }
    }

    /// Economy at match start.
    #[must_use]
    pub fn from_config(config: &MatchConfig) -> Self {
        Self::new(
            config.starting_elixir,
            config.max_elixir,
            Fixed::ONE / config.elixir_regen_seconds,
            config.overtime_regen_multiplier,
        )
    }

    /// Current elixir.
    #[must_use]
    pub const fn elixir(&self) -> Fixed {
        self.elixir
    }

    /// Elixir cap.
    #[must_use]
    pub const fn max(&self) -> Fixed {
        self.max
    }

    /// Whole elixir points available.
    #[must_use]
    pub fn whole(&self) -> u32 {
        self.elixir.saturating_to_num::<u32>()
    }

    /// Regeneration rate in elixir per second.
    #[must_use]
    pub fn regen_rate(&self, overtime: bool) -> Fixed {
        if overtime {
            self.regen_per_second * self.overtime_multiplier
        } else {
            self.regen_per_second
        }
    }

    /// Regenerate for `dt` seconds.
    pub fn regenerate(&mut self, dt: Fixed, overtime: bool) {
        let gained = self.regen_rate(overtime) * dt;
        self.elixir = clamp_fixed(self.elixir + gained, Fixed::ZERO, self.max);
    }

    /// Whether `cost` can be paid now.
    #[must_use]
    pub fn can_afford(&self, cost: u32) -> bool {
        self.elixir >= Fixed::from_num(cost)
    }

    /// Pay `cost`; returns `false` and changes nothing when unaffordable.
    pub fn spend(&mut self, cost: u32) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        self.elixir -= Fixed::from_num(cost);
        true
    }

    /// Set elixir directly, clamped to `[0, max]`.
    pub fn set_elixir(&mut self, elixir: Fixed) {
        self.elixir = clamp_fixed(elixir, Fixed::ZERO, self.max);
    }
}

impl Default for PlayerEconomy {
    fn default() -> Self {
        Self::from_config(&MatchConfig::default())
    }
}
