//! Static arena geometry.
//!
//! The arena is a 400 x 640 rectangle with y growing downward. A horizontal
//! river band splits it into the opponent's half (top) and the player's half
//! (bottom); the band can only be occupied inside one of the two bridge
//! corridors. Everything here is fixed for the lifetime of a match.

use serde::{Deserialize, Serialize};

use crate::factions::Side;
use crate::math::{clamp_fixed, Fixed, Vec2Fixed};

/// Arena width in world units.
pub const ARENA_WIDTH: Fixed = Fixed::const_from_int(400);
/// Arena height in world units.
pub const ARENA_HEIGHT: Fixed = Fixed::const_from_int(640);

/// Top edge of the river band.
pub const RIVER_TOP: Fixed = Fixed::const_from_int(304);
/// Bottom edge of the river band.
pub const RIVER_BOTTOM: Fixed = Fixed::const_from_int(336);
/// Arena midline, the centre of the river band.
pub const MIDLINE: Fixed = Fixed::const_from_int(320);

/// Lanes left of this x are the left lane.
pub const LEFT_LANE_MAX_X: Fixed = Fixed::const_from_int(133);
/// Lanes right of this x are the right lane.
pub const RIGHT_LANE_MIN_X: Fixed = Fixed::const_from_int(267);

/// Minimum clearance between a deployed troop or building and the river.
pub const DEPLOY_RIVER_CLEARANCE: Fixed = Fixed::const_from_int(8);

/// Vertical position of a point relative to the river band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiverZone {
    /// Opponent half (y above the band).
    Above,
    /// Inside the river band.
    InRiver,
    /// Player half (y below the band).
    Below,
}

impl RiverZone {
    /// Classify a y coordinate.
    #[must_use]
    pub fn of(y: Fixed) -> Self {
        if y < RIVER_TOP {
            Self::Above
        } else if y > RIVER_BOTTOM {
            Self::Below
        } else {
            Self::InRiver
        }
    }

    /// The half a side deploys into.
    #[must_use]
    pub const fn home_of(side: Side) -> Self {
        match side {
            Side::Player => Self::Below,
            Side::Opponent => Self::Above,
        }
    }

    /// The bank on the other side of the river. `InRiver` has no opposite.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Above => Self::Below,
            Self::Below => Self::Above,
            Self::InRiver => Self::InRiver,
        }
    }
}

/// One of the three lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Lane {
    /// x < 133.
    Left,
    /// 133 <= x <= 267.
    Center,
    /// x > 267.
    Right,
}

impl Lane {
    /// All lanes in index order.
    pub const ALL: [Self; 3] = [Self::Left, Self::Center, Self::Right];

    /// Lane containing an x coordinate.
    #[must_use]
    pub fn of(x: Fixed) -> Self {
        if x < LEFT_LANE_MAX_X {
            Self::Left
        } else if x > RIGHT_LANE_MIN_X {
            Self::Right
        } else {
            Self::Center
        }
    }

    /// Stable index for per-lane arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Center => 1,
            Self::Right => 2,
        }
    }

    /// Representative x for deploying into this lane.
    #[must_use]
    pub fn deploy_x(self) -> Fixed {
        match self {
            Self::Left => BridgeId::Left.center_x(),
            Self::Center => ARENA_WIDTH / Fixed::from_num(2),
            Self::Right => BridgeId::Right.center_x(),
        }
    }
}

/// The two bridges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BridgeId {
    /// x in [64, 112].
    Left,
    /// x in [288, 336].
    Right,
}

impl BridgeId {
    /// Both bridges.
    pub const ALL: [Self; 2] = [Self::Left, Self::Right];

    /// Lowest legal x on the bridge.
    #[must_use]
    pub const fn min_x(self) -> Fixed {
        match self {
            Self::Left => Fixed::const_from_int(64),
            Self::Right => Fixed::const_from_int(288),
        }
    }

    /// Highest legal x on the bridge.
    #[must_use]
    pub const fn max_x(self) -> Fixed {
        match self {
            Self::Left => Fixed::const_from_int(112),
            Self::Right => Fixed::const_from_int(336),
        }
    }

    /// Centre of the corridor.
    #[must_use]
    pub const fn center_x(self) -> Fixed {
        match self {
            Self::Left => Fixed::const_from_int(88),
            Self::Right => Fixed::const_from_int(312),
        }
    }

    /// Whether an x coordinate lies inside the corridor.
    #[must_use]
    pub fn contains_x(self, x: Fixed) -> bool {
        x >= self.min_x() && x <= self.max_x()
    }

    /// The bridge whose corridor contains `x`, if any.
    #[must_use]
    pub fn containing(x: Fixed) -> Option<Self> {
        Self::ALL.into_iter().find(|bridge| bridge.contains_x(x))
    }

    /// The bridge whose centre is closest to `x` (left wins exact ties).
    #[must_use]
    pub fn nearest(x: Fixed) -> Self {
        let left = (x - Self::Left.center_x()).abs();
        let right = (x - Self::Right.center_x()).abs();
        if right < left {
            Self::Right
        } else {
            Self::Left
        }
    }
}

/// Whether a point is in the river band outside both bridge corridors.
#[must_use]
pub fn is_off_bridge_in_river(position: Vec2Fixed) -> bool {
    RiverZone::of(position.y) == RiverZone::InRiver && BridgeId::containing(position.x).is_none()
}

/// Clamp a point into the arena rectangle.
#[must_use]
pub fn clamp_to_arena(position: Vec2Fixed) -> Vec2Fixed {
    Vec2Fixed::new(
        clamp_fixed(position.x, Fixed::ZERO, ARENA_WIDTH),
        clamp_fixed(position.y, Fixed::ZERO, ARENA_HEIGHT),
    )
}

/// Clamp a point into a side's deploy zone (its own half, clear of the river).
#[must_use]
pub fn clamp_to_deploy_zone(side: Side, position: Vec2Fixed) -> Vec2Fixed {
    let position = clamp_to_arena(position);
    let y = match side {
        Side::Player => clamp_fixed(
            position.y,
            RIVER_BOTTOM + DEPLOY_RIVER_CLEARANCE,
            ARENA_HEIGHT,
        ),
        Side::Opponent => clamp_fixed(position.y, Fixed::ZERO, RIVER_TOP - DEPLOY_RIVER_CLEARANCE),
    };
    Vec2Fixed::new(position.x, y)
}

/// Unit vector y component pointing from a side's half toward the enemy half.
#[must_use]
pub fn forward_y(side: Side) -> Fixed {
    match side {
        Side::Player => -Fixed::ONE,
        Side::Opponent => Fixed::ONE,
    }
}

/// Whether a point is past the midline into the half owned by `defender`.
#[must_use]
pub fn is_in_half_of(defender: Side, position: Vec2Fixed) -> bool {
    match defender {
        Side::Player => position.y > MIDLINE,
        Side::Opponent => position.y < MIDLINE,
    }
}

/// Kind of fixed structure slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotKind {
    /// Primary structure.
    King,
    /// Lane defense tower.
    Tower,
}

/// One of the six fixed structure slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureSlot {
    /// Owning side.
    pub side: Side,
    /// King or tower.
    pub kind: SlotKind,
    /// Centre of the structure.
    pub position: Vec2Fixed,
}

/// Position of a side's king.
#[must_use]
pub fn king_position(side: Side) -> Vec2Fixed {
    match side {
        Side::Player => Vec2Fixed::from_ints(200, 592),
        Side::Opponent => Vec2Fixed::from_ints(200, 48),
    }
}

/// The six structure slots, kings first.
#[must_use]
pub fn structure_slots() -> [StructureSlot; 6] {
    let tower = |side, x, y| StructureSlot {
        side,
        kind: SlotKind::Tower,
        position: Vec2Fixed::from_ints(x, y),
    };
    let king = |side| StructureSlot {
        side,
        kind: SlotKind::King,
        position: king_position(side),
    };
    [
        king(Side::Player),
        king(Side::Opponent),
        tower(Side::Player, 88, 512),
        tower(Side::Player, 312, 512),
        tower(Side::Opponent, 88, 128),
        tower(Side::Opponent, 312, 128),
    ]
}
