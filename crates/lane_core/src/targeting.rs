//! Target acquisition.
//!
//! Targets are weak references (entity ids) re-validated every tick. A unit
//! scores every legal enemy and keeps the best one; ties go to the lowest id
//! because candidates are walked in ascending id order and only a strictly
//! better score replaces the current pick.
//!
//! # Priority
//!
//! | Candidate | Base | Distance penalty | Same lane | Primary |
//! |-----------|------|------------------|-----------|---------|
//! | Unit      | 100  | `d / 10`         | +20       | -       |
//! | Structure | 50   | `d / 20`         | +30       | +40     |
//!
//! A side's primary structure is not a legal target while any of that side's
//! towers stands (the front gate).

use crate::arena::Lane;
use crate::components::{Entity, EntityId, Structure, StructureKind};
use crate::entities::EntityStore;
use crate::factions::Side;
use crate::math::{Fixed, Vec2Fixed};

const UNIT_BASE: Fixed = Fixed::const_from_int(100);
const UNIT_DISTANCE_DIVISOR: Fixed = Fixed::const_from_int(10);
const UNIT_LANE_BONUS: Fixed = Fixed::const_from_int(20);
const STRUCTURE_BASE: Fixed = Fixed::const_from_int(50);
const STRUCTURE_DISTANCE_DIVISOR: Fixed = Fixed::const_from_int(20);
const STRUCTURE_LANE_BONUS: Fixed = Fixed::const_from_int(30);
const PRIMARY_BONUS: Fixed = Fixed::const_from_int(40);

/// Priority of an enemy unit seen from `from`.
#[must_use]
pub fn unit_priority(from: Vec2Fixed, from_lane: Lane, enemy: Vec2Fixed) -> Fixed {
    let mut score = UNIT_BASE - from.distance(enemy) / UNIT_DISTANCE_DIVISOR;
    if Lane::of(enemy.x) == from_lane {
        score += UNIT_LANE_BONUS;
    }
    score
}

/// Priority of an enemy structure seen from `from`.
#[must_use]
pub fn structure_priority(from: Vec2Fixed, from_lane: Lane, structure: &Structure) -> Fixed {
    let mut score =
        STRUCTURE_BASE - from.distance(structure.position) / STRUCTURE_DISTANCE_DIVISOR;
    if structure.lane == from_lane {
        score += STRUCTURE_LANE_BONUS;
    }
    if structure.is_primary() {
        score += PRIMARY_BONUS;
    }
    score
}

/// Whether a structure may be targeted under the front gate.
#[must_use]
pub fn is_exposed(store: &EntityStore, structure: &Structure) -> bool {
    structure.kind != StructureKind::King || !store.has_live_tower(structure.side)
}

/// Whether `target` is a legal target for an attacker of side `attacker`.
#[must_use]
pub fn is_valid_target(store: &EntityStore, attacker: Side, target: EntityId) -> bool {
    match store.get(target) {
        Some(Entity::Unit(unit)) => unit.side != attacker && !unit.health.is_dead(),
        Some(Entity::Structure(structure)) => {
            structure.side != attacker && structure.is_alive() && is_exposed(store, structure)
        }
        _ => false,
    }
}

/// Whether a target edge is within `range` of `from`.
#[must_use]
pub fn in_reach(from: Vec2Fixed, range: Fixed, target: Vec2Fixed, target_radius: Fixed) -> bool {
    let reach = range + target_radius;
    from.distance_squared(target) <= reach * reach
}

/// Whether the attacker's current target is within reach.
#[must_use]
pub fn target_in_reach(
    store: &EntityStore,
    from: Vec2Fixed,
    range: Fixed,
    target: Option<EntityId>,
) -> bool {
    target
        .and_then(|id| store.get(id))
        .is_some_and(|entity| in_reach(from, range, entity.position(), entity.radius()))
}

/// Highest-priority legal enemy for a unit.
#[must_use]
pub fn acquire_target(
    store: &EntityStore,
    side: Side,
    position: Vec2Fixed,
    lane: Lane,
) -> Option<EntityId> {
    let mut best: Option<(EntityId, Fixed)> = None;
    for (id, entity) in store.iter_sorted() {
        let score = match entity {
            Entity::Unit(unit) if unit.side != side && !unit.health.is_dead() => {
                unit_priority(position, lane, unit.position)
            }
            Entity::Structure(structure)
                if structure.side != side
                    && structure.is_alive()
                    && is_exposed(store, structure) =>
            {
                structure_priority(position, lane, structure)
            }
            _ => continue,
        };
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((id, score));
        }
    }
    best.map(|(id, _)| id)
}

/// Highest-priority enemy unit inside a structure's reach.
#[must_use]
pub fn acquire_structure_target(store: &EntityStore, structure: &Structure) -> Option<EntityId> {
    let mut best: Option<(EntityId, Fixed)> = None;
    for (id, unit) in store.units_of(structure.side.opponent()) {
        if !in_reach(structure.position, structure.range, unit.position, unit.stats.radius) {
            continue;
        }
        let score = unit_priority(structure.position, structure.lane, unit.position);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((id, score));
        }
    }
    best.map(|(id, _)| id)
}

/// Whether an enemy unit is inside `sight` of `position`.
#[must_use]
pub fn enemy_unit_in_sight(
    store: &EntityStore,
    side: Side,
    position: Vec2Fixed,
    sight: Fixed,
) -> bool {
    store
        .units_of(side.opponent())
        .any(|(_, unit)| position.distance_squared(unit.position) <= sight * sight)
}

/// Re-validate and, where needed, re-acquire targets for every unit and
/// attacking structure. Returns the ids whose target changed.
pub fn update_targets(store: &mut EntityStore) -> Vec<EntityId> {
    let mut retargeted = Vec::new();

    for id in store.unit_ids() {
        let Some(unit) = store.unit(id) else {
            continue;
        };
        if unit.health.is_dead() {
            continue;
        }
        let (side, position, lane, sight, current) =
            (unit.side, unit.position, unit.lane, unit.stats.sight, unit.target);

        let keep = current.filter(|&target| {
            if !is_valid_target(store, side, target) {
                return false;
            }
            let on_structure = matches!(store.get(target), Some(Entity::Structure(_)));
            !(on_structure && enemy_unit_in_sight(store, side, position, sight))
        });
        let next = match keep {
            Some(target) => Some(target),
            None => acquire_target(store, side, position, lane),
        };
        if next != current {
            tracing::trace!(unit = id, ?current, ?next, "Unit retargeted");
            retargeted.push(id);
            if let Some(unit) = store.unit_mut(id) {
                unit.target = next;
            }
        }
    }

    for id in store.structure_ids() {
        let Some(structure) = store.structure(id) else {
            continue;
        };
        if !structure.is_alive() || !structure.attacks() {
            continue;
        }
        let current = structure.target;
        let still_valid = current.is_some_and(|target| {
            is_valid_target(store, structure.side, target)
                && store.unit(target).is_some_and(|unit| {
                    in_reach(
                        structure.position,
                        structure.range,
                        unit.position,
                        unit.stats.radius,
                    )
                })
        });
        let next = if still_valid {
            current
        } else {
            acquire_structure_target(store, structure)
        };
        if next != current {
            retargeted.push(id);
            if let Some(structure) = store.structure_mut(id) {
                structure.target = next;
            }
        }
    }

    retargeted
}
