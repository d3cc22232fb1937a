//! River-crossing router.
//!
//! The arena has exactly one obstacle: the river band, passable only inside
//! the two bridge corridors. Instead of a navigation mesh, each unit carries
//! at most one transient waypoint that steers it onto a bridge and through
//! to the far bank.
//!
//! # Hysteresis
//!
//! Entry waypoints sit [`ENTRY_INSET`] inside the band and exit waypoints
//! [`EXIT_MARGIN`] past the far bank. [`ARRIVAL_EPSILON`] is smaller than both,
//! so arriving at a waypoint always leaves the unit in a definite band state.
//! The centre-lane bridge choice ignores distance differences smaller than
//! [`BRIDGE_HYSTERESIS`], and the chosen bridge stays committed until the
//! waypoint clears.

use crate::arena::{BridgeId, Lane, RiverZone, MIDLINE, RIVER_BOTTOM, RIVER_TOP};
use crate::components::Navigation;
use crate::math::{Fixed, Vec2Fixed};

/// Depth of an entry waypoint inside the band.
pub const ENTRY_INSET: Fixed = Fixed::const_from_int(4);
/// Distance of an exit waypoint past the far bank.
pub const EXIT_MARGIN: Fixed = Fixed::const_from_int(6);
/// A waypoint counts as reached within this distance.
pub const ARRIVAL_EPSILON: Fixed = Fixed::const_from_int(3);
/// Centre-lane distance difference below which the bridge choice sticks.
pub const BRIDGE_HYSTERESIS: Fixed = Fixed::const_from_int(8);

/// Whether a unit at `position` must cross to reach `target`.
///
/// A target inside the band (on a bridge) counts as the far side for a unit
/// outside the band.
#[must_use]
pub fn needs_crossing(position: Vec2Fixed, target: Vec2Fixed) -> bool {
    let here = RiverZone::of(position.y);
    here != RiverZone::InRiver && RiverZone::of(target.y) != here
}

/// Bridge a target in the band stands on (or is closest to).
#[must_use]
pub fn bridge_of(target: Vec2Fixed) -> BridgeId {
    BridgeId::containing(target.x).unwrap_or_else(|| BridgeId::nearest(target.x))
}

/// Bridge a crossing toward `target` must use.
///
/// A target inside the band can only be reached over its own bridge.
#[must_use]
pub fn crossing_bridge(
    lane: Lane,
    x: Fixed,
    target: Vec2Fixed,
    committed: Option<BridgeId>,
) -> BridgeId {
    if RiverZone::of(target.y) == RiverZone::InRiver {
        bridge_of(target)
    } else {
        choose_bridge(lane, x, committed)
    }
}

/// Pick the bridge for a crossing.
#[must_use]
pub fn choose_bridge(lane: Lane, x: Fixed, committed: Option<BridgeId>) -> BridgeId {
    match lane {
        Lane::Left => BridgeId::Left,
        Lane::Right => BridgeId::Right,
        Lane::Center => {
            let left = (x - BridgeId::Left.center_x()).abs();
            let right = (x - BridgeId::Right.center_x()).abs();
            if (left - right).abs() < BRIDGE_HYSTERESIS {
                committed.unwrap_or(BridgeId::Left)
            } else if left < right {
                BridgeId::Left
            } else {
                BridgeId::Right
            }
        }
    }
}

/// Waypoint just inside the band on the near bank of `bridge`.
#[must_use]
pub fn entry_point(bridge: BridgeId, from: RiverZone) -> Vec2Fixed {
    let y = match from {
        RiverZone::Above => RIVER_TOP + ENTRY_INSET,
        _ => RIVER_BOTTOM - ENTRY_INSET,
    };
    Vec2Fixed::new(bridge.center_x(), y)
}

/// Waypoint just past the bank on the `toward` side of `bridge`.
#[must_use]
pub fn exit_point(bridge: BridgeId, toward: RiverZone) -> Vec2Fixed {
    let y = match toward {
        RiverZone::Above => RIVER_TOP - EXIT_MARGIN,
        _ => RIVER_BOTTOM + EXIT_MARGIN,
    };
    Vec2Fixed::new(bridge.center_x(), y)
}

/// Resolve this tick's movement goal and update the waypoint state.
///
/// Priority: correction out of an illegal river position, then holding still
/// when the target is in reach, then the active waypoint, then the target.
pub fn resolve_goal(
    nav: &mut Navigation,
    position: Vec2Fixed,
    lane: Lane,
    target: Option<Vec2Fixed>,
    target_in_reach: bool,
) -> Option<Vec2Fixed> {
    let zone = RiverZone::of(position.y);
    let on_bridge = BridgeId::containing(position.x);

    // Off-bridge inside the band: head sideways to the nearest bridge.
    if zone == RiverZone::InRiver && on_bridge.is_none() {
        if nav.waypoint.is_none() {
            let bridge = BridgeId::nearest(position.x);
            nav.bridge = Some(bridge);
            nav.waypoint = Some(Vec2Fixed::new(bridge.center_x(), position.y));
        }
        nav.destination = nav.waypoint;
        return nav.destination;
    }

    if target_in_reach {
        nav.destination = None;
        return None;
    }

    if let Some(waypoint) = nav.waypoint {
        if position.distance(waypoint) <= ARRIVAL_EPSILON {
            advance_waypoint(nav, position, zone, on_bridge, target);
        } else if zone != RiverZone::InRiver
            && !target.is_some_and(|t| needs_crossing(position, t) && crossing_still_valid(nav, t))
        {
            clear(nav);
        }
    }

    if nav.waypoint.is_none() {
        if let (RiverZone::InRiver, Some(bridge), Some(target)) = (zone, on_bridge, target) {
            set_river_waypoint(nav, position, bridge, target);
        }
    }

    if nav.waypoint.is_none() && zone != RiverZone::InRiver {
        if let Some(target) = target.filter(|t| needs_crossing(position, *t)) {
            let bridge = crossing_bridge(lane, position.x, target, nav.bridge);
            nav.bridge = Some(bridge);
            nav.waypoint = Some(entry_point(bridge, zone));
            tracing::trace!(?bridge, ?target, "Crossing planned");
        }
    }

    nav.destination = nav.waypoint.or(target);
    nav.destination
}

fn advance_waypoint(
    nav: &mut Navigation,
    position: Vec2Fixed,
    zone: RiverZone,
    on_bridge: Option<BridgeId>,
    target: Option<Vec2Fixed>,
) {
    nav.waypoint = None;
    match (zone, on_bridge, target) {
        (RiverZone::InRiver, Some(bridge), Some(target)) => {
            set_river_waypoint(nav, position, bridge, target);
        }
        _ => clear(nav),
    }
}

/// A committed crossing toward a target on a bridge must use that bridge.
fn crossing_still_valid(nav: &Navigation, target: Vec2Fixed) -> bool {
    RiverZone::of(target.y) != RiverZone::InRiver || nav.bridge == Some(bridge_of(target))
}

/// Waypoint for a unit standing on `bridge`.
///
/// Push through toward a target on a bank. A target on the same bridge is
/// approached directly. A target on the other bridge means backing out to
/// the nearer bank so the next crossing can use the right bridge.
fn set_river_waypoint(nav: &mut Navigation, position: Vec2Fixed, bridge: BridgeId, target: Vec2Fixed) {
    let target_zone = RiverZone::of(target.y);
    let exit = if target_zone == RiverZone::InRiver {
        if bridge_of(target) == bridge {
            clear(nav);
            return;
        }
        let bank = if position.y <= MIDLINE {
            RiverZone::Above
        } else {
            RiverZone::Below
        };
        nav.bridge = Some(bridge);
        exit_point(bridge, bank)
    } else {
        let bridge = nav.bridge.unwrap_or(bridge);
        nav.bridge = Some(bridge);
        exit_point(bridge, target_zone)
    };

    if position.distance(exit) <= ARRIVAL_EPSILON {
        clear(nav);
    } else {
        nav.waypoint = Some(exit);
    }
}

fn clear(nav: &mut Navigation) {
    nav.waypoint = None;
    nav.bridge = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(x: i32, y: i32) -> Vec2Fixed {
        Vec2Fixed::from_ints(x, y)
    }

    #[test]
    fn test_same_side_goes_direct() {
        let mut nav = Navigation::default();
        let goal = resolve_goal(&mut nav, pos(100, 500), Lane::Left, Some(pos(120, 400)), false);
        assert_eq!(goal, Some(pos(120, 400)));
        assert!(nav.waypoint.is_none());
    }

    #[test]
    fn test_crossing_enters_lane_bridge() {
        let mut nav = Navigation::default();
        let goal = resolve_goal(&mut nav, pos(300, 500), Lane::Right, Some(pos(312, 128)), false);
        let expected = Vec2Fixed::new(Fixed::from_num(312), RIVER_BOTTOM - ENTRY_INSET);
        assert_eq!(goal, Some(expected));
        assert_eq!(nav.bridge, Some(BridgeId::Right));
    }

    #[test]
    fn test_in_reach_holds_position() {
        let mut nav = Navigation::default();
        let goal = resolve_goal(&mut nav, pos(300, 500), Lane::Right, Some(pos(312, 128)), true);
        assert_eq!(goal, None);
    }

    #[test]
    fn test_entry_arrival_pushes_through() {
        let mut nav = Navigation::default();
        let target = Some(pos(88, 128));
        resolve_goal(&mut nav, pos(88, 400), Lane::Left, target, false);
        let entry = nav.waypoint.expect("entry waypoint");
        let goal = resolve_goal(&mut nav, entry, Lane::Left, target, false);
        assert_eq!(
            goal,
            Some(Vec2Fixed::new(Fixed::from_num(88), RIVER_TOP - EXIT_MARGIN))
        );

        let exit = nav.waypoint.expect("exit waypoint");
        let goal = resolve_goal(&mut nav, exit, Lane::Left, target, false);
        assert_eq!(goal, target);
        assert!(nav.waypoint.is_none());
        assert!(nav.bridge.is_none());
    }

    #[test]
    fn test_illegal_position_is_corrected_to_nearest_bridge() {
        let mut nav = Navigation::default();
        let goal = resolve_goal(&mut nav, pos(150, 320), Lane::Center, Some(pos(200, 48)), true);
        assert_eq!(goal, Some(pos(88, 320)));
    }

    #[test]
    fn test_on_bridge_without_waypoint_pushes_through() {
        let mut nav = Navigation::default();
        let goal = resolve_goal(&mut nav, pos(300, 320), Lane::Right, Some(pos(312, 512)), false);
        assert_eq!(
            goal,
            Some(Vec2Fixed::new(Fixed::from_num(312), RIVER_BOTTOM + EXIT_MARGIN))
        );
    }

    #[test]
    fn test_target_on_bridge_counts_as_far_side() {
        assert!(needs_crossing(pos(88, 400), pos(88, 320)));
        assert!(!needs_crossing(pos(88, 320), pos(88, 400)));
        assert!(!needs_crossing(pos(88, 400), pos(200, 500)));
    }

    #[test]
    fn test_centre_lane_choice_has_dead_zone() {
        let x = Fixed::from_num(203);
        assert_eq!(choose_bridge(Lane::Center, x, None), BridgeId::Left);
        assert_eq!(choose_bridge(Lane::Center, x, Some(BridgeId::Right)), BridgeId::Right);
        assert_eq!(choose_bridge(Lane::Center, Fixed::from_num(250), None), BridgeId::Right);
        assert_eq!(choose_bridge(Lane::Left, Fixed::from_num(250), None), BridgeId::Left);
    }

    #[test]
    fn test_stale_entry_waypoint_is_dropped() {
        let mut nav = Navigation::default();
        resolve_goal(&mut nav, pos(88, 400), Lane::Left, Some(pos(88, 128)), false);
        assert!(nav.waypoint.is_some());
        let goal = resolve_goal(&mut nav, pos(88, 400), Lane::Left, Some(pos(90, 450)), false);
        assert_eq!(goal, Some(pos(90, 450)));
        assert!(nav.waypoint.is_none());
    }

    #[test]
    fn test_target_on_other_bridge_uses_its_bridge() {
        let mut nav = Navigation::default();
        let goal = resolve_goal(&mut nav, pos(312, 400), Lane::Right, Some(pos(88, 320)), false);
        assert_eq!(goal, Some(entry_point(BridgeId::Left, RiverZone::Below)));
        assert_eq!(nav.bridge, Some(BridgeId::Left));

        let entry = nav.waypoint.expect("entry waypoint");
        let goal = resolve_goal(&mut nav, entry, Lane::Right, Some(pos(88, 320)), false);
        assert_eq!(goal, Some(pos(88, 320)));
        assert!(nav.waypoint.is_none());
    }

    #[test]
    fn test_unit_on_wrong_bridge_backs_out_and_reroutes() {
        let mut nav = Navigation::default();
        let target = Some(pos(88, 320));
        let goal = resolve_goal(&mut nav, pos(288, 318), Lane::Right, target, false);
        let bank = exit_point(BridgeId::Right, RiverZone::Above);
        assert_eq!(goal, Some(bank));

        let goal = resolve_goal(&mut nav, bank, Lane::Right, target, false);
        assert_eq!(goal, Some(entry_point(BridgeId::Left, RiverZone::Above)));
        assert_eq!(nav.bridge, Some(BridgeId::Left));
    }

    #[test]
    fn test_entry_toward_wrong_bridge_is_replanned() {
        let mut nav = Navigation::default();
        resolve_goal(&mut nav, pos(312, 400), Lane::Right, Some(pos(312, 128)), false);
        assert_eq!(nav.bridge, Some(BridgeId::Right));
        let goal = resolve_goal(&mut nav, pos(300, 390), Lane::Right, Some(pos(88, 320)), false);
        assert_eq!(goal, Some(entry_point(BridgeId::Left, RiverZone::Below)));
    }
}
