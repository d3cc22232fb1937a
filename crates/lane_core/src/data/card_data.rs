//! Card data structures for data-driven card definitions.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_decimal, Fixed};

/// What a card instantiates when played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardKind {
    /// One or more mobile units.
    Troop,
    /// A projectile that resolves into an area effect.
    Spell,
    /// A stationary structure.
    Building,
}

/// Tactical role, used by the AI to pick cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardRole {
    /// High health, soaks damage.
    Tank,
    /// Single-target melee fighter.
    Melee,
    /// Attacks from range.
    Ranged,
    /// Several cheap units.
    Swarm,
    /// Area spell.
    Spell,
    /// Defensive building that attacks.
    Defense,
    /// Building that produces units.
    Spawner,
}

/// Timed condition applied to units by spells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatusKind {
    /// Movement speed multiplied by `strength` (0.5 halves it).
    Slowed,
    /// Cannot move or attack.
    Stunned,
    /// Cannot move or attack.
    Frozen,
    /// Takes `strength` damage per second.
    Poisoned,
    /// Attack cooldown divided by `strength`.
    Raged,
}

/// Which side a spell's payload lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SpellTarget {
    /// Damage and debuffs, applied to the caster's enemies.
    #[default]
    Enemies,
    /// Heals and buffs, applied to the caster's own units.
    Allies,
}

/// A status carried by a spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusPayload {
    /// Which status.
    pub kind: StatusKind,
    /// Seconds the status lasts once applied.
    #[serde(with = "fixed_decimal")]
    pub duration: Fixed,
    /// Magnitude; meaning depends on `kind`.
    #[serde(default, with = "fixed_decimal")]
    pub strength: Fixed,
}

/// Spell payload: what lands where the projectile arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpellData {
    /// Damage per pulse to each enemy in the radius.
    #[serde(default)]
    pub damage: u32,
    /// Healing per pulse to each ally in the radius.
    #[serde(default)]
    pub heal: u32,
    /// Status applied per pulse.
    #[serde(default)]
    pub status: Option<StatusPayload>,
    /// Effect radius.
    #[serde(with = "fixed_decimal")]
    pub radius: Fixed,
    /// Lingering duration in seconds (0 resolves once).
    #[serde(default, with = "fixed_decimal")]
    pub duration: Fixed,
    /// Seconds between pulses of a lingering effect.
    #[serde(default, with = "fixed_decimal")]
    pub pulse_interval: Fixed,
    /// Which side is affected.
    #[serde(default)]
    pub affects: SpellTarget,
    /// Projectile travel speed in units per second. Zero lands at the next
    /// projectile step.
    #[serde(with = "fixed_decimal")]
    pub projectile_speed: Fixed,
}

/// Damage dealt around a unit when it dies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeathExplosion {
    /// Damage to each enemy inside the radius.
    pub damage: u32,
    /// Explosion radius.
    #[serde(with = "fixed_decimal")]
    pub radius: Fixed,
}

/// Periodic unit production by a building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnRule {
    /// Card id of the produced troop.
    pub card: String,
    /// Seconds between spawns.
    #[serde(with = "fixed_decimal")]
    pub interval: Fixed,
    /// Units per spawn.
    #[serde(default = "default_count")]
    pub count: u32,
}

/// Special-rule flags. All default to "off".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardTraits {
    /// Shield granted on spawn, absorbed before health.
    #[serde(default)]
    pub shield: u32,
    /// Explosion when the unit is destroyed.
    #[serde(default)]
    pub death_explosion: Option<DeathExplosion>,
    /// One-time revival at this percent of max health (0 disables).
    #[serde(default)]
    pub revive_percent: u32,
    /// First-hit multiplier (0 or 1 disables).
    #[serde(default)]
    pub charge_multiplier: u32,
    /// Radius around the target hit by each attack (0 is single target).
    #[serde(default, with = "fixed_decimal")]
    pub splash_radius: Fixed,
    /// Unit production for buildings.
    #[serde(default)]
    pub spawns: Option<SpawnRule>,
    /// Seconds a building stands before expiring (0 is permanent).
    #[serde(default, with = "fixed_decimal")]
    pub lifetime: Fixed,
}

/// Data-driven card definition.
///
/// # Example RON
///
/// ```ron
/// (
///     id: "knight",
///     name: "Knight",
///     kind: Troop,
///     role: Melee,
///     cost: 3,
///     health: 660,
///     damage: 75,
///     speed: 45.0,
///     range: 20.0,
///     attack_rate: 1.2,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardData {
    /// Unique string identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// What the card instantiates.
    pub kind: CardKind,
    /// Tactical role for the AI.
    pub role: CardRole,
    /// Elixir cost.
    pub cost: u32,
    /// Maximum health of each unit or building.
    #[serde(default)]
    pub health: u32,
    /// Damage per hit.
    #[serde(default)]
    pub damage: u32,
    /// Movement speed in units per second.
    #[serde(default, with = "fixed_decimal")]
    pub speed: Fixed,
    /// Attack range measured to the target's edge.
    #[serde(default, with = "fixed_decimal")]
    pub range: Fixed,
    /// Seconds between attacks.
    #[serde(default, with = "fixed_decimal")]
    pub attack_rate: Fixed,
    /// Body radius.
    #[serde(default = "default_radius", with = "fixed_decimal")]
    pub radius: Fixed,
    /// Radius in which enemy units distract this unit from a structure.
    #[serde(default = "default_sight", with = "fixed_decimal")]
    pub sight: Fixed,
    /// Units spawned per play.
    #[serde(default = "default_count")]
    pub count: u32,
    /// Special rules.
    #[serde(default)]
    pub traits: CardTraits,
    /// Spell payload (spells only).
    #[serde(default)]
    pub spell: Option<SpellData>,
}

const fn default_count() -> u32 {
    1
}

fn default_radius() -> Fixed {
    Fixed::from_num(8)
}

fn default_sight() -> Fixed {
    Fixed::from_num(110)
}

impl CardData {
    /// Whether this card attacks at range.
    #[must_use]
    pub fn is_ranged(&self) -> bool {
        self.role == CardRole::Ranged || self.range >= Fixed::from_num(60)
    }

    /// Whether this card deals damage on attack.
    #[must_use]
    pub fn attacks(&self) -> bool {
        self.damage > 0 && self.attack_rate > Fixed::ZERO
    }

    /// Whether this is a damaging spell usable on enemy clusters.
    #[must_use]
    pub fn is_damage_spell(&self) -> bool {
        self.spell
            .as_ref()
            .is_some_and(|spell| spell.affects == SpellTarget::Enemies && spell.damage > 0)
    }

    /// Whether the AI may deploy this card to stop a push.
    #[must_use]
    pub fn is_defender(&self) -> bool {
        matches!(self.kind, CardKind::Troop | CardKind::Building)
    }
}
