//! The two sides of a match.

use serde::{Deserialize, Serialize};

/// Identifier for the two competing sides.
///
/// `Player` holds the bottom half of the arena (large y), `Opponent` the top
/// half. Either side can be driven by a human or by the AI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    /// Bottom half, traditionally the human player.
    Player,
    /// Top half, traditionally the AI opponent.
    Opponent,
}

impl Side {
    /// Both sides, in index order.
    pub const BOTH: [Self; 2] = [Self::Player, Self::Opponent];

    /// The other side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Opponent,
            Self::Opponent => Self::Player,
        }
    }

    /// Stable index for per-side arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Player => 0,
            Self::Opponent => 1,
        }
    }

    /// Get the display name for this side.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Player => "Player",
            Self::Opponent => "Opponent",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A value held once per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PerSide<T> {
    /// Value for [`Side::Player`].
    pub player: T,
    /// Value for [`Side::Opponent`].
    pub opponent: T,
}

impl<T> PerSide<T> {
    /// Create from both values.
    #[must_use]
    pub const fn new(player: T, opponent: T) -> Self {
        Self { player, opponent }
    }

    /// Borrow the value for a side.
    #[must_use]
    pub const fn get(&self, side: Side) -> &T {
        match side {
            Side::Player => &self.player,
            Side::Opponent => &self.opponent,
        }
    }

    /// Mutably borrow the value for a side.
    pub fn get_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::Player => &mut self.player,
            Side::Opponent => &mut self.opponent,
        }
    }
}

impl<T: Clone> PerSide<T> {
    /// Same value for both sides.
    #[must_use]
    pub fn splat(value: T) -> Self {
        Self {
            player: value.clone(),
            opponent: value,
        }
    }
}
