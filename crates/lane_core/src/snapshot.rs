//! Read-only match views for rendering and tooling.
//!
//! Snapshots convert fixed-point state to plain `f64` world coordinates at
//! the boundary; nothing here feeds back into the simulation.

use serde::{Deserialize, Serialize};

use crate::components::{Entity, EntityId, StructureKind};
use crate::data::StatusKind;
use crate::factions::{PerSide, Side};
use crate::math::{Fixed, Vec2Fixed};
use crate::simulation::{MatchPhase, Simulation};

fn to_f64(value: Fixed) -> f64 {
    value.to_num::<f64>()
}

fn point(position: Vec2Fixed) -> [f64; 2] {
    [to_f64(position.x), to_f64(position.y)]
}

/// What kind of entity a snapshot row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Troop.
    Unit,
    /// King, tower or building.
    Structure(StructureKind),
    /// Spell in flight.
    Projectile,
    /// Resolved spell area.
    AreaEffect,
}

/// One entity as the renderer sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Entity id.
    pub id: EntityId,
    /// Entity kind.
    pub kind: EntityKind,
    /// Owning side.
    pub side: Side,
    /// Card id, if the entity came from a card.
    pub card_id: Option<String>,
    /// World position.
    pub position: [f64; 2],
    /// Body or effect radius.
    pub radius: f64,
    /// Current health.
    pub health: Option<u32>,
    /// Maximum health.
    pub max_health: Option<u32>,
    /// Remaining shield.
    pub shield: u32,
    /// Active statuses.
    pub statuses: Vec<StatusKind>,
    /// Current target.
    pub target: Option<EntityId>,
    /// Destroyed structures stay visible as rubble.
    pub destroyed: bool,
}

impl EntitySnapshot {
    fn capture(id: EntityId, entity: &Entity) -> Self {
        let health = entity.health();
        let mut snapshot = Self {
            id,
            kind: EntityKind::Unit,
            side: entity.side(),
            card_id: None,
            position: point(entity.position()),
            radius: to_f64(entity.radius()),
            health: health.map(|h| h.current),
            max_health: health.map(|h| h.max),
            shield: 0,
            statuses: Vec::new(),
            target: None,
            destroyed: false,
        };
        match entity {
            Entity::Unit(unit) => {
                snapshot.card_id = Some(unit.card_id.clone());
                snapshot.shield = unit.shield.current;
                snapshot.statuses = unit.statuses.iter().map(|(kind, _)| kind).collect();
                snapshot.target = unit.target;
            }
            Entity::Structure(structure) => {
                snapshot.kind = EntityKind::Structure(structure.kind);
                snapshot.card_id.clone_from(&structure.card_id);
                snapshot.target = structure.target;
                snapshot.destroyed = structure.destroyed;
            }
            Entity::Projectile(projectile) => {
                snapshot.kind = EntityKind::Projectile;
                snapshot.card_id = Some(projectile.card_id.clone());
            }
            Entity::AreaEffect(effect) => {
                snapshot.kind = EntityKind::AreaEffect;
                snapshot.card_id = Some(effect.card_id.clone());
            }
        }
        snapshot
    }
}

/// One side's visible resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideSnapshot {
    /// Current elixir.
    pub elixir: f64,
    /// Whole elixir available to spend.
    pub whole_elixir: u32,
    /// Crowns held.
    pub crowns: u8,
    /// Cards in hand, in slot order.
    pub hand: Vec<String>,
    /// Next card to be drawn.
    pub next_card: Option<String>,
}

/// Full render-facing view of a match at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    /// Tick number.
    pub tick: u64,
    /// Seconds of play.
    pub clock: f64,
    /// Countdown seconds remaining.
    pub countdown: f64,
    /// Seconds left in the current phase (regulation or overtime).
    pub time_remaining: f64,
    /// Current phase.
    pub phase: MatchPhase,
    /// Whether the clock is frozen.
    pub paused: bool,
    /// Per-side resources.
    pub sides: PerSide<SideSnapshot>,
    /// Entities in id order.
    pub entities: Vec<EntitySnapshot>,
    /// Winner once ended.
    pub winner: Option<Side>,
}

impl MatchSnapshot {
    /// Capture the current state of `sim`.
    #[must_use]
    pub fn capture(sim: &Simulation) -> Self {
        let side = |side: Side| {
            let deck = sim.deck(side);
            let economy = sim.economy(side);
            SideSnapshot {
                elixir: to_f64(economy.elixir()),
                whole_elixir: economy.whole(),
                crowns: sim.crowns(side),
                hand: deck.hand().to_vec(),
                next_card: deck.next_card().map(str::to_string),
            }
        };
        let config = sim.config();
        let phase_end = match sim.phase() {
            MatchPhase::Overtime => config.regulation_seconds + config.overtime_seconds,
            MatchPhase::Ended => sim.clock(),
            _ => config.regulation_seconds,
        };
        Self {
            tick: sim.tick_count(),
            clock: to_f64(sim.clock()),
            countdown: to_f64(sim.state().countdown),
            time_remaining: to_f64((phase_end - sim.clock()).max(Fixed::ZERO)),
            phase: sim.phase(),
            paused: sim.is_paused(),
            sides: PerSide::new(side(Side::Player), side(Side::Opponent)),
            entities: sim
                .store()
                .iter_sorted()
                .map(|(id, entity)| EntitySnapshot::capture(id, entity))
                .collect(),
            winner: sim.winner(),
        }
    }

    /// Live structures of a side with their health, for HUDs.
    pub fn structures(&self, side: Side) -> impl Iterator<Item = &EntitySnapshot> {
        self.entities.iter().filter(move |e| {
            e.side == side && matches!(e.kind, EntityKind::Structure(_)) && !e.destroyed
        })
    }
}

/// Terminal outcome of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Winner, or `None` on a draw.
    pub winner: Option<Side>,
    /// Final crowns.
    pub crowns: PerSide<u8>,
    /// Tick at which the match ended.
    pub tick: u64,
    /// Whether the match went to overtime.
    pub overtime: bool,
    /// Whether a king fell.
    pub king_destroyed: bool,
}

impl MatchResult {
    /// Summarise an ended match.
    #[must_use]
    pub fn from_simulation(sim: &Simulation) -> Self {
        let crowns = PerSide::new(sim.crowns(Side::Player), sim.crowns(Side::Opponent));
        let king_destroyed = sim
            .store()
            .iter_sorted()
            .filter_map(|(_, entity)| entity.as_structure())
            .any(|s| s.kind == StructureKind::King && s.destroyed);
        Self {
            winner: sim.winner(),
            crowns,
            tick: sim.tick_count(),
            overtime: sim.state().overtime,
            king_destroyed,
        }
    }

    /// Whether the match was drawn.
    #[must_use]
    pub const fn is_draw(&self) -> bool {
        self.winner.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::data::CardCatalog;

    #[test]
    fn test_snapshot_lists_slot_structures() {
        let mut sim = Simulation::new(MatchConfig::default(), CardCatalog::default_catalog(), 9)
            .expect("valid");
        for _ in 0..31 {
            sim.tick(Fixed::from_num(0.1));
        }
        let snapshot = sim.snapshot();
        assert_eq!(snapshot.phase, MatchPhase::Playing);
        assert_eq!(snapshot.structures(Side::Player).count(), 3);
        assert_eq!(snapshot.structures(Side::Opponent).count(), 3);
        assert_eq!(snapshot.sides.player.hand.len(), 4);
        assert!(snapshot.sides.player.next_card.is_some());
        assert!(snapshot.time_remaining > 179.0);

        let json = serde_json::to_string(&snapshot);
        assert!(json.is_ok());
    }

    #[test]
    fn test_no_result_while_running() {
        let sim = Simulation::new(MatchConfig::default(), CardCatalog::default_catalog(), 9)
            .expect("valid");
        assert!(sim.result().is_none());
    }
}
