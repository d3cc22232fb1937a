//! Unit movement.
//!
//! Moves every live unit toward the goal chosen by the router, at card speed
//! scaled by statuses. Positions are clamped to the arena, and a step that
//! would carry a unit from a legal position into the river band off-bridge is
//! pulled back to the bank (or into the bridge corridor).

use crate::arena::{clamp_to_arena, is_off_bridge_in_river, BridgeId, RiverZone, RIVER_BOTTOM, RIVER_TOP};
use crate::entities::EntityStore;
use crate::math::{clamp_fixed, Fixed, Vec2Fixed};
use crate::pathfinding::resolve_goal;
use crate::targeting::{in_reach, is_valid_target};

/// Keep a step out of the river unless it stays inside a bridge corridor.
#[must_use]
pub fn constrain_step(from: Vec2Fixed, to: Vec2Fixed) -> Vec2Fixed {
    if is_off_bridge_in_river(from) {
        return to;
    }
    let from_zone = RiverZone::of(from.y);
    let to_zone = RiverZone::of(to.y);
    let jumped = from_zone != RiverZone::InRiver && to_zone == from_zone.opposite();
    if !is_off_bridge_in_river(to) && !jumped {
        return to;
    }
    match from_zone {
        RiverZone::InRiver => match BridgeId::containing(from.x) {
            Some(bridge) => Vec2Fixed::new(clamp_fixed(to.x, bridge.min_x(), bridge.max_x()), to.y),
            None => from,
        },
        RiverZone::Above => Vec2Fixed::new(to.x, RIVER_TOP - Fixed::DELTA),
        RiverZone::Below => Vec2Fixed::new(to.x, RIVER_BOTTOM + Fixed::DELTA),
    }
}

/// One movement step toward `goal`.
#[must_use]
pub fn step_towards(from: Vec2Fixed, goal: Vec2Fixed, max_step: Fixed) -> Vec2Fixed {
    let next = clamp_to_arena(from.move_towards(goal, max_step));
    constrain_step(from, next)
}

/// Route and move every live unit for `dt` seconds.
pub fn move_units(store: &mut EntityStore, dt: Fixed) {
    for id in store.unit_ids() {
        let Some(unit) = store.unit(id) else {
            continue;
        };
        if unit.health.is_dead() {
            continue;
        }
        let target = unit
            .target
            .filter(|&target| is_valid_target(store, unit.side, target))
            .and_then(|target| store.get(target))
            .map(|entity| (entity.position(), entity.radius()));
        let reach = target.is_some_and(|(position, radius)| {
            in_reach(unit.position, unit.stats.range, position, radius)
        });
        let max_step = unit.stats.speed * unit.statuses.speed_multiplier() * dt;

        let Some(unit) = store.unit_mut(id) else {
            continue;
        };
        let goal = resolve_goal(
            &mut unit.nav,
            unit.position,
            unit.lane,
            target.map(|(position, _)| position),
            reach,
        );
        if let Some(goal) = goal {
            unit.position = step_towards(unit.position, goal, max_step);
        }
    }
}
