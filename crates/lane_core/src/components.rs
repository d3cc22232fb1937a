//! Entity component definitions.
//!
//! Components are plain data. Behaviour lives in the systems modules
//! ([`crate::targeting`], [`crate::combat`], [`crate::movement`]) which read
//! and mutate these structs through the [`crate::entities::EntityStore`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::arena::{BridgeId, Lane, SlotKind};
use crate::data::{CardData, DeathExplosion, SpellData, StatusKind, StatusPayload};
use crate::factions::Side;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// Unique identifier for entities. Never reused within a match.
pub type EntityId = u64;

/// Seconds between poison damage pulses.
pub const POISON_PULSE: Fixed = Fixed::const_from_int(1);

/// Health component for damageable entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Health {
    /// Current health points.
    pub current: u32,
    /// Maximum health points.
    pub max: u32,
}

impl Health {
    /// Create new health component at full health.
    #[must_use]
    pub const fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Check if entity is dead (health == 0).
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.current == 0
    }

    /// Apply damage, returning actual damage dealt.
    /// Uses saturating subtraction to prevent underflow.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let actual = amount.min(self.current);
        self.current = self.current.saturating_sub(actual);
        actual
    }

    /// Heal the entity, returning actual amount healed.
    pub fn heal(&mut self, amount: u32) -> u32 {
        let headroom = self.max.saturating_sub(self.current);
        let actual = amount.min(headroom);
        self.current = self.current.saturating_add(actual);
        actual
    }

    /// Current health as a fraction of max in `[0, 1]`.
    #[must_use]
    pub fn fraction(&self) -> Fixed {
        if self.max == 0 {
            Fixed::ZERO
        } else {
            Fixed::from_num(self.current) / Fixed::from_num(self.max)
        }
    }
}

/// Damage-absorbing shield granted on spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Shield {
    /// Remaining shield points.
    pub current: u32,
    /// Shield points originally granted.
    pub granted: u32,
}

impl Shield {
    /// A full shield.
    #[must_use]
    pub const fn new(granted: u32) -> Self {
        Self {
            current: granted,
            granted,
        }
    }

    /// Absorb up to `damage`; returns the damage left over for health.
    pub fn absorb(&mut self, damage: u32) -> u32 {
        let absorbed = damage.min(self.current);
        self.current -= absorbed;
        damage - absorbed
    }
}

/// One active status on a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusEffect {
    /// Seconds until the status wears off.
    #[serde(with = "fixed_serde")]
    pub remaining: Fixed,
    /// Magnitude, see [`StatusKind`].
    #[serde(with = "fixed_serde")]
    pub strength: Fixed,
    /// Seconds until the next periodic pulse (poison).
    #[serde(with = "fixed_serde")]
    pub pulse_timer: Fixed,
}

/// Active statuses keyed by kind, ordered for deterministic iteration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StatusEffects {
    active: BTreeMap<StatusKind, StatusEffect>,
}

impl StatusEffects {
    /// Apply or refresh a status. A refresh keeps the longer duration, the
    /// stronger magnitude and the running pulse timer.
    pub fn apply(&mut self, payload: &StatusPayload) {
        self.active
            .entry(payload.kind)
            .and_modify(|effect| {
                effect.remaining = effect.remaining.max(payload.duration);
                effect.strength = effect.strength.max(payload.strength);
            })
            .or_insert(StatusEffect {
                remaining: payload.duration,
                strength: payload.strength,
                pulse_timer: POISON_PULSE,
            });
    }

    /// The active effect of `kind`, if any.
    #[must_use]
    pub fn get(&self, kind: StatusKind) -> Option<&StatusEffect> {
        self.active.get(&kind)
    }

    /// Whether a status of `kind` is active.
    #[must_use]
    pub fn has(&self, kind: StatusKind) -> bool {
        self.active.contains_key(&kind)
    }

    /// Stunned or frozen: no movement, no attacks.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.has(StatusKind::Stunned) || self.has(StatusKind::Frozen)
    }

    /// Multiplier on movement speed.
    #[must_use]
    pub fn speed_multiplier(&self) -> Fixed {
        if self.is_disabled() {
            return Fixed::ZERO;
        }
        match self.get(StatusKind::Slowed) {
            Some(slow) if slow.strength > Fixed::ZERO && slow.strength < Fixed::ONE => {
                slow.strength
            }
            Some(_) => Fixed::ONE / Fixed::from_num(2),
            None => Fixed::ONE,
        }
    }

    /// Divisor on attack cooldown (1 when not raged).
    #[must_use]
    pub fn rage_multiplier(&self) -> Fixed {
        match self.get(StatusKind::Raged) {
            Some(rage) if rage.strength > Fixed::ONE => rage.strength,
            _ => Fixed::ONE,
        }
    }

    /// Advance all timers by `dt`, dropping expired statuses.
    ///
    /// Returns the poison damage due this step.
    pub fn tick(&mut self, dt: Fixed) -> u32 {
        let mut poison = 0u32;
        if let Some(effect) = self.active.get_mut(&StatusKind::Poisoned) {
            effect.pulse_timer -= dt;
            while effect.pulse_timer <= Fixed::ZERO && effect.remaining > Fixed::ZERO {
                poison = poison.saturating_add(effect.strength.saturating_to_num::<u32>());
                effect.pulse_timer += POISON_PULSE;
            }
        }
        for effect in self.active.values_mut() {
            effect.remaining -= dt;
        }
        self.active.retain(|_, effect| effect.remaining > Fixed::ZERO);
        poison
    }

    /// Remove every status.
    pub fn clear(&mut self) {
        self.active.clear();
    }

    /// Active statuses in kind order.
    pub fn iter(&self) -> impl Iterator<Item = (StatusKind, &StatusEffect)> {
        self.active.iter().map(|(kind, effect)| (*kind, effect))
    }

    /// Number of active statuses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether no status is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

/// Cached per-unit combat stats, copied from the card on spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitStats {
    /// Damage per hit.
    pub damage: u32,
    /// Movement speed in units per second.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Attack range measured to the target's edge.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,
    /// Seconds between attacks.
    #[serde(with = "fixed_serde")]
    pub attack_rate: Fixed,
    /// Body radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Distraction radius.
    #[serde(with = "fixed_serde")]
    pub sight: Fixed,
    /// Splash radius around the target (0 is single target).
    #[serde(with = "fixed_serde")]
    pub splash_radius: Fixed,
    /// First-hit multiplier (0 or 1 disables).
    pub charge_multiplier: u32,
    /// Revival fraction in percent (0 disables).
    pub revive_percent: u32,
}

impl UnitStats {
    /// Stats from a card definition.
    #[must_use]
    pub fn from_card(card: &CardData) -> Self {
        Self {
            damage: card.damage,
            speed: card.speed,
            range: card.range,
            attack_rate: card.attack_rate,
            radius: card.radius,
            sight: card.sight,
            splash_radius: card.traits.splash_radius,
            charge_multiplier: card.traits.charge_multiplier,
            revive_percent: card.traits.revive_percent,
        }
    }
}

/// Navigation state for the river router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Navigation {
    /// Movement goal resolved this tick, if any.
    pub destination: Option<Vec2Fixed>,
    /// Transient crossing waypoint.
    pub waypoint: Option<Vec2Fixed>,
    /// Bridge committed to for the active crossing.
    pub bridge: Option<BridgeId>,
}

/// A mobile troop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    /// Owning side.
    pub side: Side,
    /// Card this unit was spawned from.
    pub card_id: String,
    /// World position.
    pub position: Vec2Fixed,
    /// Cached combat stats.
    pub stats: UnitStats,
    /// Health.
    pub health: Health,
    /// Shield, absorbed before health.
    pub shield: Shield,
    /// Explosion on death.
    pub death_explosion: Option<DeathExplosion>,
    /// Router state.
    pub nav: Navigation,
    /// Current target, re-validated every tick.
    pub target: Option<EntityId>,
    /// Lane the unit was deployed into.
    pub lane: Lane,
    /// Active statuses.
    pub statuses: StatusEffects,
    /// Revival already used.
    pub has_revived: bool,
    /// Charge hit already delivered.
    pub has_charged: bool,
    /// Seconds until the next attack is allowed.
    #[serde(with = "fixed_serde")]
    pub attack_cooldown: Fixed,
}

impl Unit {
    /// Spawn a fresh unit from a card.
    #[must_use]
    pub fn from_card(card: &CardData, side: Side, position: Vec2Fixed) -> Self {
        Self {
            side,
            card_id: card.id.clone(),
            position,
            stats: UnitStats::from_card(card),
            health: Health::new(card.health),
            shield: Shield::new(card.traits.shield),
            death_explosion: card.traits.death_explosion,
            nav: Navigation::default(),
            target: None,
            lane: Lane::of(position.x),
            statuses: StatusEffects::default(),
            has_revived: false,
            has_charged: false,
            attack_cooldown: Fixed::ZERO,
        }
    }

    /// Apply a hit: shield first, then health. Returns `(absorbed, health_lost)`.
    pub fn take_hit(&mut self, damage: u32) -> (u32, u32) {
        let remainder = self.shield.absorb(damage);
        let lost = self.health.apply_damage(remainder);
        (damage - remainder, lost)
    }

    /// Whether the unit can still revive on death.
    #[must_use]
    pub const fn can_revive(&self) -> bool {
        self.stats.revive_percent > 0 && !self.has_revived
    }
}

/// Kind of structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureKind {
    /// Primary structure; destroying it wins the match.
    King,
    /// Lane defense tower; worth one crown.
    Tower,
    /// Card-placed building; worth nothing.
    Building,
}

impl From<SlotKind> for StructureKind {
    fn from(kind: SlotKind) -> Self {
        match kind {
            SlotKind::King => Self::King,
            SlotKind::Tower => Self::Tower,
        }
    }
}

/// Periodic unit production on a building.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpawnerTimer {
    /// Card id of the produced troop.
    pub card_id: String,
    /// Seconds between spawns.
    #[serde(with = "fixed_serde")]
    pub interval: Fixed,
    /// Seconds until the next spawn.
    #[serde(with = "fixed_serde")]
    pub remaining: Fixed,
    /// Units per spawn.
    pub count: u32,
}

/// A stationary structure: a slot king/tower or a placed building.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Structure {
    /// Owning side.
    pub side: Side,
    /// King, tower or building.
    pub kind: StructureKind,
    /// Card id for placed buildings.
    pub card_id: Option<String>,
    /// World position.
    pub position: Vec2Fixed,
    /// Body radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Health.
    pub health: Health,
    /// Damage per hit (0 for non-attacking).
    pub damage: u32,
    /// Attack range.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,
    /// Seconds between attacks.
    #[serde(with = "fixed_serde")]
    pub attack_rate: Fixed,
    /// Seconds until the next attack is allowed.
    #[serde(with = "fixed_serde")]
    pub attack_cooldown: Fixed,
    /// Current target (enemy units only).
    pub target: Option<EntityId>,
    /// Lane of the structure.
    pub lane: Lane,
    /// Set when health reaches zero; destroyed structures stay for display.
    pub destroyed: bool,
    /// Unit production, if any.
    pub spawner: Option<SpawnerTimer>,
    /// Seconds until a building expires.
    #[serde(default, with = "option_fixed")]
    pub lifetime: Option<Fixed>,
}

impl Structure {
    /// Whether this is the side's primary structure.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.kind == StructureKind::King
    }

    /// Not destroyed and health above zero.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.destroyed && !self.health.is_dead()
    }

    /// Whether this structure can attack.
    #[must_use]
    pub fn attacks(&self) -> bool {
        self.damage > 0 && self.attack_rate > Fixed::ZERO
    }

    /// Build a placed building from its card.
    #[must_use]
    pub fn building(card: &CardData, side: Side, position: Vec2Fixed) -> Self {
        let spawner = card.traits.spawns.as_ref().map(|rule| SpawnerTimer {
            card_id: rule.card.clone(),
            interval: rule.interval,
            remaining: rule.interval,
            count: rule.count.max(1),
        });
        let lifetime = (card.traits.lifetime > Fixed::ZERO).then_some(card.traits.lifetime);
        Self {
            side,
            kind: StructureKind::Building,
            card_id: Some(card.id.clone()),
            position,
            radius: card.radius,
            health: Health::new(card.health),
            damage: card.damage,
            range: card.range,
            attack_rate: card.attack_rate,
            attack_cooldown: Fixed::ZERO,
            target: None,
            lane: Lane::of(position.x),
            destroyed: false,
            spawner,
            lifetime,
        }
    }
}

mod option_fixed {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &Option<Fixed>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.map(Fixed::to_bits).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Fixed>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<i64>::deserialize(deserializer)?.map(Fixed::from_bits))
    }
}

/// A spell in flight from the caster's king toward its target point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Projectile {
    /// Casting side.
    pub side: Side,
    /// Spell card id.
    pub card_id: String,
    /// Launch point.
    pub origin: Vec2Fixed,
    /// Current position.
    pub position: Vec2Fixed,
    /// Point where the payload resolves.
    pub destination: Vec2Fixed,
    /// Units per second.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// What resolves on arrival.
    pub payload: SpellData,
}

/// A resolved spell area, instant or lingering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AreaEffect {
    /// Casting side.
    pub side: Side,
    /// Spell card id.
    pub card_id: String,
    /// Centre of the area.
    pub center: Vec2Fixed,
    /// What each pulse applies.
    pub payload: SpellData,
    /// Seconds of lingering left.
    #[serde(with = "fixed_serde")]
    pub remaining: Fixed,
    /// Seconds until the next pulse.
    #[serde(with = "fixed_serde")]
    pub pulse_timer: Fixed,
}

impl AreaEffect {
    /// Whether the effect resolves once and disappears.
    #[must_use]
    pub fn is_instant(&self) -> bool {
        self.payload.duration <= Fixed::ZERO
    }
}

/// Tagged entity variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Entity {
    /// Mobile troop.
    Unit(Unit),
    /// King, tower or building.
    Structure(Structure),
    /// Spell in flight.
    Projectile(Projectile),
    /// Resolved spell area.
    AreaEffect(AreaEffect),
}

impl Entity {
    /// Owning side.
    #[must_use]
    pub fn side(&self) -> Side {
        match self {
            Self::Unit(unit) => unit.side,
            Self::Structure(structure) => structure.side,
            Self::Projectile(projectile) => projectile.side,
            Self::AreaEffect(effect) => effect.side,
        }
    }

    /// World position.
    #[must_use]
    pub fn position(&self) -> Vec2Fixed {
        match self {
            Self::Unit(unit) => unit.position,
            Self::Structure(structure) => structure.position,
            Self::Projectile(projectile) => projectile.position,
            Self::AreaEffect(effect) => effect.center,
        }
    }

    /// Body radius for reach checks (0 for spells).
    #[must_use]
    pub fn radius(&self) -> Fixed {
        match self {
            Self::Unit(unit) => unit.stats.radius,
            Self::Structure(structure) => structure.radius,
            Self::Projectile(_) | Self::AreaEffect(_) => Fixed::ZERO,
        }
    }

    /// Health, for damageable entities.
    #[must_use]
    pub fn health(&self) -> Option<Health> {
        match self {
            Self::Unit(unit) => Some(unit.health),
            Self::Structure(structure) => Some(structure.health),
            Self::Projectile(_) | Self::AreaEffect(_) => None,
        }
    }

    /// Damageable and not yet dead or destroyed.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        match self {
            Self::Unit(unit) => !unit.health.is_dead(),
            Self::Structure(structure) => structure.is_alive(),
            Self::Projectile(_) | Self::AreaEffect(_) => false,
        }
    }

    /// Borrow as a unit.
    #[must_use]
    pub fn as_unit(&self) -> Option<&Unit> {
        match self {
            Self::Unit(unit) => Some(unit),
            _ => None,
        }
    }

    /// Mutably borrow as a unit.
    pub fn as_unit_mut(&mut self) -> Option<&mut Unit> {
        match self {
            Self::Unit(unit) => Some(unit),
            _ => None,
        }
    }

    /// Borrow as a structure.
    #[must_use]
    pub fn as_structure(&self) -> Option<&Structure> {
        match self {
            Self::Structure(structure) => Some(structure),
            _ => None,
        }
    }

    /// Mutably borrow as a structure.
    pub fn as_structure_mut(&mut self) -> Option<&mut Structure> {
        match self {
            Self::Structure(structure) => Some(structure),
            _ => None,
        }
    }

    /// Short tag for logs and snapshots.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Unit(_) => "unit",
            Self::Structure(_) => "structure",
            Self::Projectile(_) => "projectile",
            Self::AreaEffect(_) => "area_effect",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CardCatalog;

    fn status(kind: StatusKind, duration: f64, strength: f64) -> StatusPayload {
        StatusPayload {
            kind,
            duration: Fixed::from_num(duration),
            strength: Fixed::from_num(strength),
        }
    }

    #[test]
    fn test_health_saturates() {
        let mut health = Health::new(100);
        assert_eq!(health.apply_damage(150), 100);
        assert!(health.is_dead());
        assert_eq!(health.heal(30), 30);
        assert_eq!(health.heal(500), 70);
    }

    #[test]
    fn test_shield_absorbs_before_health() {
        let catalog = CardCatalog::default_catalog();
        let card = catalog.get("guards").expect("guards exist");
        let mut unit = Unit::from_card(card, Side::Player, Vec2Fixed::from_ints(100, 500));
        assert_eq!(unit.shield.current, 150);

        assert_eq!(unit.take_hit(100), (100, 0));
        assert_eq!(unit.shield.current, 50);
        assert_eq!(unit.health.current, 90);

        assert_eq!(unit.take_hit(80), (50, 30));
        assert_eq!(unit.shield.current, 0);
        assert_eq!(unit.health.current, 60);
    }

    #[test]
    fn test_status_refresh_keeps_longest() {
        let mut statuses = StatusEffects::default();
        statuses.apply(&status(StatusKind::Slowed, 2.0, 0.5));
        statuses.apply(&status(StatusKind::Slowed, 1.0, 0.5));
        let slow = statuses.get(StatusKind::Slowed).expect("slowed");
        assert_eq!(slow.remaining, Fixed::from_num(2));
        assert_eq!(statuses.speed_multiplier(), Fixed::from_num(0.5));
    }

    #[test]
    fn test_disabled_units_do_not_move() {
        let mut statuses = StatusEffects::default();
        statuses.apply(&status(StatusKind::Frozen, 1.0, 1.0));
        assert!(statuses.is_disabled());
        assert_eq!(statuses.speed_multiplier(), Fixed::ZERO);
        statuses.tick(Fixed::from_num(1));
        assert!(statuses.is_empty());
    }

    #[test]
    fn test_poison_pulses_once_per_second() {
        let mut statuses = StatusEffects::default();
        statuses.apply(&status(StatusKind::Poisoned, 2.5, 60.0));
        let half = Fixed::from_num(0.5);
        let mut total = 0;
        for _ in 0..5 {
            total += statuses.tick(half);
        }
        assert_eq!(total, 120);
        assert!(!statuses.has(StatusKind::Poisoned));
    }

    #[test]
    fn test_rage_divides_cooldown() {
        let mut statuses = StatusEffects::default();
        assert_eq!(statuses.rage_multiplier(), Fixed::ONE);
        statuses.apply(&status(StatusKind::Raged, 1.0, 1.4));
        assert_eq!(statuses.rage_multiplier(), Fixed::from_num(1.4));
    }
}
