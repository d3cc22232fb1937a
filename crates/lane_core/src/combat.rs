//! Combat resolution: attacks, spell areas, statuses and deaths.
//!
//! Damage always lands in the same order: shield first, then health,
//! saturating at zero. A hit never removes anything by itself; entities at
//! zero health are collected by [`resolve_deaths`], which handles revival,
//! death explosions and structure destruction in ascending id order.

use serde::{Deserialize, Serialize};

use crate::components::{AreaEffect, Entity, EntityId, StructureKind};
use crate::data::SpellTarget;
use crate::entities::EntityStore;
use crate::factions::Side;
use crate::math::{Fixed, Vec2Fixed};
use crate::targeting::{in_reach, is_exposed, is_valid_target};

/// A single application of damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageEvent {
    /// Attacker, area effect or exploding unit, if still known.
    pub source: Option<EntityId>,
    /// Entity that was hit.
    pub target: EntityId,
    /// Damage soaked by the shield.
    pub shield_absorbed: u32,
    /// Health actually removed.
    pub health_lost: u32,
}

/// A unit healed by a spell pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealEvent {
    /// Area effect that healed.
    pub source: EntityId,
    /// Unit healed.
    pub target: EntityId,
    /// Health restored.
    pub amount: u32,
}

/// What was removed or destroyed during death resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Death {
    /// A unit was removed.
    Unit {
        /// Former id.
        id: EntityId,
        /// Owning side.
        side: Side,
        /// Card it was spawned from.
        card_id: String,
        /// Where it died.
        position: Vec2Fixed,
    },
    /// A structure was destroyed.
    Structure {
        /// Id (kept in the store unless it was a building).
        id: EntityId,
        /// Owning side.
        side: Side,
        /// King, tower or building.
        kind: StructureKind,
    },
}

/// Outcome of one call to [`resolve_deaths`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeathReport {
    /// Removed units and destroyed structures, in resolution order.
    pub deaths: Vec<Death>,
    /// Units that revived instead of dying.
    pub revivals: Vec<EntityId>,
    /// Damage dealt by death explosions.
    pub explosion_damage: Vec<DamageEvent>,
    /// Side whose king fell; resolution stops there.
    pub king_destroyed: Option<Side>,
}

/// Apply `damage` to an entity: shield first, then health.
pub fn deal_damage(
    store: &mut EntityStore,
    target: EntityId,
    damage: u32,
    source: Option<EntityId>,
) -> Option<DamageEvent> {
    let (shield_absorbed, health_lost) = match store.get_mut(target)? {
        Entity::Unit(unit) => unit.take_hit(damage),
        Entity::Structure(structure) if !structure.destroyed => {
            (0, structure.health.apply_damage(damage))
        }
        _ => return None,
    };
    Some(DamageEvent {
        source,
        target,
        shield_absorbed,
        health_lost,
    })
}

/// Enemies of `side` inside `radius` of `center` (body radius included),
/// units and front-gate-exposed structures, in id order.
#[must_use]
pub fn enemies_in_radius(
    store: &EntityStore,
    side: Side,
    center: Vec2Fixed,
    radius: Fixed,
) -> Vec<EntityId> {
    store
        .iter_sorted()
        .filter(|(_, entity)| entity.side() != side && entity.is_alive())
        .filter(|(_, entity)| match entity {
            Entity::Structure(structure) => is_exposed(store, structure),
            _ => true,
        })
        .filter(|(_, entity)| in_reach(center, radius, entity.position(), entity.radius()))
        .map(|(id, _)| id)
        .collect()
}

/// Tick cooldowns and execute every attack that is ready.
pub fn resolve_attacks(store: &mut EntityStore, dt: Fixed) -> Vec<DamageEvent> {
    let mut events = Vec::new();

    for id in store.sorted_ids() {
        let Some(entity) = store.get_mut(id) else {
            continue;
        };
        match entity {
            Entity::Unit(unit) => {
                unit.attack_cooldown = (unit.attack_cooldown - dt).max(Fixed::ZERO);
            }
            Entity::Structure(structure) => {
                structure.attack_cooldown = (structure.attack_cooldown - dt).max(Fixed::ZERO);
            }
            _ => continue,
        }

        let Some(entity) = store.get(id) else {
            continue;
        };
        if !entity.is_alive() {
            continue;
        }
        let attack = match entity {
            Entity::Unit(unit) => {
                if unit.statuses.is_disabled()
                    || unit.stats.damage == 0
                    || unit.attack_cooldown > Fixed::ZERO
                {
                    continue;
                }
                let charging = unit.stats.charge_multiplier > 1 && !unit.has_charged;
                Attack {
                    side: unit.side,
                    position: unit.position,
                    target: unit.target,
                    range: unit.stats.range,
                    damage: if charging {
                        unit.stats.damage.saturating_mul(unit.stats.charge_multiplier)
                    } else {
                        unit.stats.damage
                    },
                    splash_radius: unit.stats.splash_radius,
                    cooldown: unit.stats.attack_rate / unit.statuses.rage_multiplier(),
                    charging,
                }
            }
            Entity::Structure(structure) => {
                if !structure.attacks() || structure.attack_cooldown > Fixed::ZERO {
                    continue;
                }
                Attack {
                    side: structure.side,
                    position: structure.position,
                    target: structure.target,
                    range: structure.range,
                    damage: structure.damage,
                    splash_radius: Fixed::ZERO,
                    cooldown: structure.attack_rate,
                    charging: false,
                }
            }
            _ => continue,
        };

        let Some(target) = attack.target else {
            continue;
        };
        if !is_valid_target(store, attack.side, target) {
            continue;
        }
        let Some((target_pos, target_radius)) =
            store.get(target).map(|t| (t.position(), t.radius()))
        else {
            continue;
        };
        if !in_reach(attack.position, attack.range, target_pos, target_radius) {
            continue;
        }

        events.extend(deal_damage(store, target, attack.damage, Some(id)));
        if attack.splash_radius > Fixed::ZERO {
            for other in enemies_in_radius(store, attack.side, target_pos, attack.splash_radius) {
                if other != target {
                    events.extend(deal_damage(store, other, attack.damage, Some(id)));
                }
            }
        }

        match store.get_mut(id) {
            Some(Entity::Unit(unit)) => {
                unit.attack_cooldown = attack.cooldown;
                if attack.charging {
                    unit.has_charged = true;
                }
            }
            Some(Entity::Structure(structure)) => structure.attack_cooldown = attack.cooldown,
            _ => {}
        }
    }

    events
}

struct Attack {
    side: Side,
    position: Vec2Fixed,
    target: Option<EntityId>,
    range: Fixed,
    damage: u32,
    splash_radius: Fixed,
    cooldown: Fixed,
    charging: bool,
}

/// Move projectiles; arrivals are replaced by their area effect.
///
/// Returns the ids of the area effects created.
pub fn advance_projectiles(store: &mut EntityStore, dt: Fixed) -> Vec<EntityId> {
    let mut arrived = Vec::new();
    for id in store.sorted_ids() {
        let Some(Entity::Projectile(projectile)) = store.get_mut(id) else {
            continue;
        };
        projectile.position = projectile
            .position
            .move_towards(projectile.destination, projectile.speed * dt);
        if projectile.position == projectile.destination {
            arrived.push(id);
        }
    }

    let mut created = Vec::new();
    for id in arrived {
        if let Some(Entity::Projectile(projectile)) = store.remove(id) {
            let effect = AreaEffect {
                side: projectile.side,
                card_id: projectile.card_id,
                center: projectile.destination,
                payload: projectile.payload,
                remaining: projectile.payload.duration,
                pulse_timer: Fixed::ZERO,
            };
            created.push(store.insert(Entity::AreaEffect(effect)));
        }
    }
    created
}

/// Pulse lingering effects, resolve instant ones, drop expired ones.
pub fn pulse_area_effects(
    store: &mut EntityStore,
    dt: Fixed,
) -> (Vec<DamageEvent>, Vec<HealEvent>) {
    let mut damage = Vec::new();
    let mut heals = Vec::new();

    for id in store.sorted_ids() {
        let Some(Entity::AreaEffect(effect)) = store.get(id) else {
            continue;
        };
        let effect = effect.clone();

        if effect.pulse_timer <= Fixed::ZERO {
            apply_pulse(store, id, &effect, &mut damage, &mut heals);
        }

        if effect.is_instant() {
            store.remove(id);
            continue;
        }
        let mut expired = false;
        if let Some(Entity::AreaEffect(live)) = store.get_mut(id) {
            if live.pulse_timer <= Fixed::ZERO {
                live.pulse_timer += live.payload.pulse_interval;
            }
            live.pulse_timer -= dt;
            live.remaining -= dt;
            expired = live.remaining <= Fixed::ZERO;
        }
        if expired {
            store.remove(id);
        }
    }

    (damage, heals)
}

fn apply_pulse(
    store: &mut EntityStore,
    effect_id: EntityId,
    effect: &AreaEffect,
    damage: &mut Vec<DamageEvent>,
    heals: &mut Vec<HealEvent>,
) {
    let payload = effect.payload;
    match payload.affects {
        SpellTarget::Enemies => {
            for target in enemies_in_radius(store, effect.side, effect.center, payload.radius) {
                if payload.damage > 0 {
                    damage.extend(deal_damage(store, target, payload.damage, Some(effect_id)));
                }
                if let (Some(status), Some(unit)) = (payload.status, store.unit_mut(target)) {
                    unit.statuses.apply(&status);
                }
            }
        }
        SpellTarget::Allies => {
            let allies: Vec<EntityId> = store
                .units_of(effect.side)
                .filter(|(_, unit)| {
                    in_reach(effect.center, payload.radius, unit.position, unit.stats.radius)
                })
                .map(|(id, _)| id)
                .collect();
            for target in allies {
                let Some(unit) = store.unit_mut(target) else {
                    continue;
                };
                if payload.heal > 0 {
                    let amount = unit.health.heal(payload.heal);
                    if amount > 0 {
                        heals.push(HealEvent {
                            source: effect_id,
                            target,
                            amount,
                        });
                    }
                }
                if let Some(status) = payload.status {
                    unit.statuses.apply(&status);
                }
            }
        }
    }
}

/// Advance unit statuses; poison damage is applied through the shield.
pub fn tick_statuses(store: &mut EntityStore, dt: Fixed) -> Vec<DamageEvent> {
    let mut events = Vec::new();
    for id in store.unit_ids() {
        let poison = match store.unit_mut(id) {
            Some(unit) if !unit.health.is_dead() => unit.statuses.tick(dt),
            _ => continue,
        };
        if poison > 0 {
            events.extend(deal_damage(store, id, poison, None));
        }
    }
    events
}

/// Collect everything at zero health until nothing else dies.
///
/// Units revive once when their card allows it; otherwise they are removed
/// and their death explosion (if any) hits nearby enemies, which may chain.
/// Structures are flagged destroyed (buildings are removed). A fallen king
/// stops resolution after the current batch: the rest of the batch is still
/// removed, but without revivals or explosions.
pub fn resolve_deaths(store: &mut EntityStore) -> DeathReport {
    let mut report = DeathReport::default();

    loop {
        let dead: Vec<EntityId> = store
            .iter_sorted()
            .filter(|(_, entity)| match entity {
                Entity::Unit(unit) => unit.health.is_dead(),
                Entity::Structure(structure) => {
                    !structure.destroyed && structure.health.is_dead()
                }
                _ => false,
            })
            .map(|(id, _)| id)
            .collect();
        if dead.is_empty() {
            break;
        }

        for id in dead {
            let finishing = report.king_destroyed.is_some();
            match store.get_mut(id) {
                Some(Entity::Unit(unit)) if !finishing && unit.can_revive() => {
                    let restored =
                        (u64::from(unit.health.max) * u64::from(unit.stats.revive_percent) / 100)
                            .max(1);
                    unit.health.current = u32::try_from(restored).unwrap_or(unit.health.max);
                    unit.has_revived = true;
                    unit.statuses.clear();
                    unit.target = None;
                    tracing::debug!(unit = id, health = unit.health.current, "Unit revived");
                    report.revivals.push(id);
                }
                Some(Entity::Unit(_)) => {
                    let Some(Entity::Unit(unit)) = store.remove(id) else {
                        continue;
                    };
                    tracing::debug!(unit = id, card = %unit.card_id, side = %unit.side, "Unit died");
                    if let Some(explosion) = unit.death_explosion.filter(|_| !finishing) {
                        for target in
                            enemies_in_radius(store, unit.side, unit.position, explosion.radius)
                        {
                            report.explosion_damage.extend(deal_damage(
                                store,
                                target,
                                explosion.damage,
                                Some(id),
                            ));
                        }
                    }
                    report.deaths.push(Death::Unit {
                        id,
                        side: unit.side,
                        card_id: unit.card_id,
                        position: unit.position,
                    });
                }
                Some(Entity::Structure(structure)) => {
                    structure.destroyed = true;
                    structure.target = None;
                    structure.spawner = None;
                    let (side, kind) = (structure.side, structure.kind);
                    if kind == StructureKind::Building {
                        store.remove(id);
                    }
                    tracing::debug!(structure = id, ?kind, %side, "Structure destroyed");
                    report.deaths.push(Death::Structure { id, side, kind });
                    if kind == StructureKind::King && !finishing {
                        report.king_destroyed = Some(side);
                    }
                }
                _ => {}
            }
        }
        if report.king_destroyed.is_some() {
            break;
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Projectile, Structure, Unit};
    use crate::data::CardCatalog;

    fn spawn(store: &mut EntityStore, card: &str, side: Side, x: i32, y: i32) -> EntityId {
        let catalog = CardCatalog::default_catalog();
        let card = catalog.get(card).expect("card exists");
        store.insert(Entity::Unit(Unit::from_card(
            card,
            side,
            Vec2Fixed::from_ints(x, y),
        )))
    }

    fn aim(store: &mut EntityStore, attacker: EntityId, target: EntityId) {
        if let Some(unit) = store.unit_mut(attacker) {
            unit.target = Some(target);
        }
    }

    #[test]
    fn test_shield_then_health_then_death() {
        let mut store = EntityStore::new();
        let victim = spawn(&mut store, "knight", Side::Opponent, 100, 100);
        if let Some(unit) = store.unit_mut(victim) {
            unit.health = crate::components::Health { current: 50, max: 50 };
            unit.shield = crate::components::Shield::new(30);
        }
        let event = deal_damage(&mut store, victim, 80, None).expect("hit");
        assert_eq!((event.shield_absorbed, event.health_lost), (30, 50));
        let unit = store.unit(victim).expect("still present until resolution");
        assert_eq!(unit.shield.current, 0);
        assert_eq!(unit.health.current, 0);

        let report = resolve_deaths(&mut store);
        assert_eq!(report.deaths.len(), 1);
        assert!(!store.contains(victim));
    }

    #[test]
    fn test_charge_applies_once() {
        let mut store = EntityStore::new();
        let prince = spawn(&mut store, "prince", Side::Player, 100, 120);
        let golem = spawn(&mut store, "golem", Side::Opponent, 100, 100);
        aim(&mut store, prince, golem);

        let first = resolve_attacks(&mut store, Fixed::from_num(0.1));
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].health_lost, 440);

        let mut later = Vec::new();
        for _ in 0..20 {
            later.extend(resolve_attacks(&mut store, Fixed::from_num(0.1)));
        }
        assert!(!later.is_empty());
        assert!(later.iter().all(|event| event.health_lost == 220));
    }

    #[test]
    fn test_disabled_units_hold_fire() {
        let mut store = EntityStore::new();
        let knight = spawn(&mut store, "knight", Side::Player, 100, 120);
        let enemy = spawn(&mut store, "knight", Side::Opponent, 100, 100);
        aim(&mut store, knight, enemy);
        if let Some(unit) = store.unit_mut(knight) {
            unit.statuses.apply(&crate::data::StatusPayload {
                kind: crate::data::StatusKind::Stunned,
                duration: Fixed::from_num(1),
                strength: Fixed::ONE,
            });
        }
        assert!(resolve_attacks(&mut store, Fixed::from_num(0.1)).is_empty());
    }

    #[test]
    fn test_splash_hits_neighbours() {
        let mut store = EntityStore::new();
        let valkyrie = spawn(&mut store, "valkyrie", Side::Player, 100, 120);
        let a = spawn(&mut store, "goblins", Side::Opponent, 100, 100);
        let b = spawn(&mut store, "goblins", Side::Opponent, 120, 100);
        let far = spawn(&mut store, "goblins", Side::Opponent, 300, 100);
        aim(&mut store, valkyrie, a);
        let events = resolve_attacks(&mut store, Fixed::from_num(0.1));
        let hit: Vec<_> = events.iter().map(|e| e.target).collect();
        assert_eq!(hit, vec![a, b]);
        assert!(!hit.contains(&far));
    }

    #[test]
    fn test_revival_happens_once() {
        let mut store = EntityStore::new();
        let phoenix = spawn(&mut store, "phoenix", Side::Player, 100, 500);
        deal_damage(&mut store, phoenix, 10_000, None);
        let report = resolve_deaths(&mut store);
        assert_eq!(report.revivals, vec![phoenix]);
        let unit = store.unit(phoenix).expect("revived");
        assert_eq!(unit.health.current, 350);
        assert!(unit.has_revived);

        deal_damage(&mut store, phoenix, 10_000, None);
        let report = resolve_deaths(&mut store);
        assert!(report.revivals.is_empty());
        assert!(!store.contains(phoenix));
    }

    #[test]
    fn test_death_explosion_hits_enemies_once_and_chains() {
        let mut store = EntityStore::new();
        let golem = spawn(&mut store, "golem", Side::Opponent, 200, 200);
        let near = spawn(&mut store, "goblins", Side::Player, 220, 200);
        let friend = spawn(&mut store, "knight", Side::Opponent, 210, 200);
        deal_damage(&mut store, golem, 10_000, None);

        let report = resolve_deaths(&mut store);
        assert_eq!(report.explosion_damage.len(), 1);
        assert_eq!(report.explosion_damage[0].target, near);
        assert!(!store.contains(near), "goblin killed by the blast");
        assert_eq!(report.deaths.len(), 2);
        assert_eq!(store.unit(friend).map(|u| u.health.current), Some(660));
    }

    #[test]
    fn test_king_destruction_stops_resolution() {
        let mut store = EntityStore::new();
        let stats = crate::config::StructureStats::default();
        let king = store.insert(Entity::Structure(Structure {
            health: crate::components::Health { current: 0, max: 2400 },
            ..stats.build(crate::arena::structure_slots()[1])
        }));
        let report = resolve_deaths(&mut store);
        assert_eq!(report.king_destroyed, Some(Side::Opponent));
        assert!(store.structure(king).is_some_and(|s| s.destroyed));
    }

    #[test]
    fn test_king_fall_still_clears_the_batch() {
        let mut store = EntityStore::new();
        let stats = crate::config::StructureStats::default();
        let king = store.insert(Entity::Structure(Structure {
            health: crate::components::Health { current: 0, max: 2400 },
            ..stats.build(crate::arena::structure_slots()[1])
        }));
        let knight = spawn(&mut store, "knight", Side::Player, 200, 100);
        let golem = spawn(&mut store, "golem", Side::Opponent, 210, 110);
        for id in [knight, golem] {
            if let Some(unit) = store.unit_mut(id) {
                unit.health.current = 0;
            }
        }

        let report = resolve_deaths(&mut store);
        assert_eq!(report.king_destroyed, Some(Side::Opponent));
        assert!(store.structure(king).is_some_and(|s| s.destroyed));
        assert!(store.unit(knight).is_none());
        assert!(store.unit(golem).is_none());
        assert!(report.explosion_damage.is_empty());
        let unit_deaths = report
            .deaths
            .iter()
            .filter(|death| matches!(death, Death::Unit { .. }))
            .count();
        assert_eq!(unit_deaths, 2);
    }

    #[test]
    fn test_instant_spell_lands_on_first_advance() {
        let mut store = EntityStore::new();
        let catalog = CardCatalog::default_catalog();
        let mut zap = catalog.get("zap").and_then(|c| c.spell).expect("spell");
        zap.projectile_speed = Fixed::ZERO;
        store.insert(Entity::Projectile(Projectile {
            side: Side::Player,
            card_id: "zap".to_string(),
            origin: Vec2Fixed::from_ints(100, 100),
            position: Vec2Fixed::from_ints(100, 100),
            destination: Vec2Fixed::from_ints(100, 100),
            speed: zap.projectile_speed,
            payload: zap,
        }));

        let created = advance_projectiles(&mut store, Fixed::from_num(0.1));
        assert_eq!(created.len(), 1);
    }

    #[test]
    fn test_projectile_resolves_into_instant_area() {
        let mut store = EntityStore::new();
        let catalog = CardCatalog::default_catalog();
        let fireball = catalog.get("fireball").and_then(|c| c.spell).expect("spell");
        let enemy = spawn(&mut store, "knight", Side::Opponent, 100, 100);
        store.insert(Entity::Projectile(Projectile {
            side: Side::Player,
            card_id: "fireball".to_string(),
            origin: Vec2Fixed::from_ints(100, 130),
            position: Vec2Fixed::from_ints(100, 130),
            destination: Vec2Fixed::from_ints(100, 100),
            speed: fireball.projectile_speed,
            payload: fireball,
        }));

        let created = advance_projectiles(&mut store, Fixed::from_num(0.1));
        assert_eq!(created.len(), 1);
        let (damage, _) = pulse_area_effects(&mut store, Fixed::from_num(0.1));
        assert_eq!(damage.len(), 1);
        assert_eq!(store.unit(enemy).map(|u| u.health.current), Some(660 - 325));
        assert!(!store.contains(created[0]));
    }

    #[test]
    fn test_lingering_heal_pulses_allies() {
        let mut store = EntityStore::new();
        let catalog = CardCatalog::default_catalog();
        let heal = catalog.get("heal").and_then(|c| c.spell).expect("spell");
        let ally = spawn(&mut store, "knight", Side::Player, 100, 400);
        if let Some(unit) = store.unit_mut(ally) {
            unit.health.current = 100;
        }
        let effect = store.insert(Entity::AreaEffect(AreaEffect {
            side: Side::Player,
            card_id: "heal".to_string(),
            center: Vec2Fixed::from_ints(100, 400),
            payload: heal,
            remaining: heal.duration,
            pulse_timer: Fixed::ZERO,
        }));
        let mut healed = 0;
        for _ in 0..40 {
            healed += pulse_area_effects(&mut store, Fixed::from_num(0.1)).1.len();
        }
        assert_eq!(healed, 4);
        assert_eq!(store.unit(ally).map(|u| u.health.current), Some(500));
        assert!(!store.contains(effect));
    }
}
