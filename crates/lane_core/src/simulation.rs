//! Match controller and tick loop.
//!
//! [`Simulation`] owns every piece of match state and advances it one frame
//! at a time. Subsystems are plain functions over the [`EntityStore`]; the
//! controller calls them in a fixed order and folds their outputs into
//! [`TickEvents`] for the render layer.
//!
//! # Determinism
//!
//! A match is a pure function of its seed, config, catalog, frame deltas and
//! card plays:
//! - all math is fixed-point ([`Fixed`]);
//! - every random draw comes from a seeded stream (spawn jitter, each deck,
//!   each AI);
//! - entities are always visited in ascending id order.
//!
//! # Example
//!
//! ```
//! use lane_core::config::MatchConfig;
//! use lane_core::data::CardCatalog;
//! use lane_core::factions::Side;
//! use lane_core::math::Fixed;
//! use lane_core::simulation::{MatchPhase, Simulation};
//!
//! let mut sim = Simulation::new(MatchConfig::default(), CardCatalog::default_catalog(), 42)
//!     .expect("default config is valid");
//! for _ in 0..40 {
//!     sim.tick(Fixed::from_num(0.1));
//! }
//! assert_eq!(sim.phase(), MatchPhase::Playing);
//! assert_eq!(sim.hand(Side::Player).len(), 4);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::ai::{AiBranch, AiOpponent, AiView, Difficulty};
use crate::arena::{
    clamp_to_arena, clamp_to_deploy_zone, forward_y, king_position, structure_slots,
};
use crate::combat::{
    advance_projectiles, pulse_area_effects, resolve_attacks, resolve_deaths, tick_statuses,
    DamageEvent, Death, DeathReport, HealEvent,
};
use crate::components::{Entity, EntityId, Projectile, Structure, StructureKind, Unit};
use crate::config::MatchConfig;
use crate::data::{CardCatalog, CardData, CardKind};
use crate::deck::Deck;
use crate::economy::PlayerEconomy;
use crate::entities::EntityStore;
use crate::error::{GameError, Result};
use crate::factions::{PerSide, Side};
use crate::math::{clamp_fixed, fixed_serde, Fixed, Vec2Fixed};
use crate::movement::move_units;
use crate::rng::{self, derive_seed, MatchRng};
use crate::snapshot::{MatchResult, MatchSnapshot};
use crate::targeting::update_targets;

/// Spacing between troops of one play.
const FORMATION_SPACING: Fixed = Fixed::const_from_int(16);
/// Troops per formation row.
const FORMATION_COLUMNS: u32 = 3;
/// Gap between a spawner building's edge and its spawned troops.
const SPAWN_CLEARANCE: Fixed = Fixed::const_from_int(10);

/// Match lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchPhase {
    /// Pre-match countdown; no plays accepted.
    Countdown,
    /// Regulation time.
    Playing,
    /// Sudden-death overtime with faster regeneration.
    Overtime,
    /// Terminal.
    Ended,
}

impl MatchPhase {
    /// Whether cards may be played.
    #[must_use]
    pub const fn accepts_plays(self) -> bool {
        matches!(self, Self::Playing | Self::Overtime)
    }
}

/// Everything about a match except its entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchState {
    /// Seconds of play since the countdown ended.
    #[serde(with = "fixed_serde")]
    pub clock: Fixed,
    /// Countdown seconds remaining.
    #[serde(with = "fixed_serde")]
    pub countdown: Fixed,
    /// Current phase.
    pub phase: MatchPhase,
    /// Elixir per side.
    pub economies: PerSide<PlayerEconomy>,
    /// Crowns per side.
    pub crowns: PerSide<u8>,
    /// Deck per side.
    pub decks: PerSide<Deck>,
    /// Winner once ended; `None` while running or on a draw.
    pub winner: Option<Side>,
    /// Paused matches ignore ticks.
    pub paused: bool,
    /// Set once the match enters overtime.
    pub overtime: bool,
}

/// Why a play was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// The match is in countdown or already over.
    NotPlaying(MatchPhase),
    /// The card is not in the side's hand.
    NotInHand,
    /// The catalog has no such card.
    UnknownCard,
    /// Not enough elixir.
    InsufficientElixir {
        /// Card cost.
        cost: u32,
        /// Whole elixir available.
        available: u32,
    },
}

/// Result of [`Simulation::play_card`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayOutcome {
    /// The card was played.
    Accepted {
        /// Entities created by the play.
        spawned: Vec<EntityId>,
    },
    /// The play was ignored; nothing changed.
    Rejected(RejectReason),
}

impl PlayOutcome {
    /// Whether the play went through.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// A card play made during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayEvent {
    /// Side that played.
    pub side: Side,
    /// Card played.
    pub card_id: String,
    /// Requested position.
    pub position: Vec2Fixed,
    /// Entities created.
    pub spawned: Vec<EntityId>,
    /// AI branch that chose the play; `None` for a queued combo follow-up.
    pub branch: Option<AiBranch>,
}

/// A crown awarded for a destroyed structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrownEvent {
    /// Side receiving the crown.
    pub side: Side,
    /// Crowns held after the award.
    pub total: u8,
    /// Structure whose destruction earned it.
    pub structure: EntityId,
}

/// A phase transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseChange {
    /// Previous phase.
    pub from: MatchPhase,
    /// New phase.
    pub to: MatchPhase,
}

/// Events generated during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Attack, spell, poison and explosion damage, in resolution order.
    pub damage: Vec<DamageEvent>,
    /// Healing from spells.
    pub heals: Vec<HealEvent>,
    /// Units removed and structures destroyed.
    pub deaths: Vec<Death>,
    /// Units that revived instead of dying.
    pub revivals: Vec<EntityId>,
    /// Crowns awarded.
    pub crowns: Vec<CrownEvent>,
    /// AI plays made this tick.
    pub plays: Vec<PlayEvent>,
    /// Units produced by spawner buildings.
    pub spawned: Vec<EntityId>,
    /// Buildings removed at the end of their lifetime.
    pub expired: Vec<EntityId>,
    /// Phase transitions.
    pub phase_changes: Vec<PhaseChange>,
}

/// The match simulation.
///
/// # Tick order
///
/// 1. Clock advance (delta clamped to `max_tick_delta`)
/// 2. Elixir regeneration
/// 3. Building lifetimes and spawner timers
/// 4. Routing and movement
/// 5. Targeting and attacks
/// 6. Projectiles, area effects and status ticks
/// 7. Death resolution and crowns
/// 8. AI pending plays and decisions
/// 9. Regulation and overtime checks
///
/// A fallen king ends the match and skips the rest of the tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    config: MatchConfig,
    catalog: CardCatalog,
    seed: u64,
    tick: u64,
    store: EntityStore,
    state: MatchState,
    ai: PerSide<Option<AiOpponent>>,
    jitter: MatchRng,
}

impl Simulation {
    /// Create a match in the countdown phase.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is out of range or a deck references
    /// cards the catalog does not define.
    pub fn new(config: MatchConfig, catalog: CardCatalog, seed: u64) -> Result<Self> {
        config.validate(&catalog)?;
        let pool: Vec<String> = catalog.iter().map(|card| card.id.clone()).collect();
        let deck = |side: Side| {
            Deck::new(
                config.decks.get(side).clone(),
                pool.clone(),
                config.hand_size,
                derive_seed(seed, &format!("deck.{side}")),
            )
        };
        let economy = PlayerEconomy::from_config(&config);
        let state = MatchState {
            clock: Fixed::ZERO,
            countdown: config.countdown_step_seconds * Fixed::from_num(config.countdown_steps),
            phase: MatchPhase::Countdown,
            economies: PerSide::splat(economy),
            crowns: PerSide::splat(0),
            decks: PerSide::new(deck(Side::Player), deck(Side::Opponent)),
            winner: None,
            paused: false,
            overtime: false,
        };
        let mut sim = Self {
            jitter: rng::stream(seed, "spawn"),
            config,
            catalog,
            seed,
            tick: 0,
            store: EntityStore::new(),
            state,
            ai: PerSide::splat(None),
        };
        if sim.state.countdown <= Fixed::ZERO {
            let mut events = TickEvents::default();
            sim.begin(&mut events);
        }
        Ok(sim)
    }

    /// Builder: hand `side` to an AI of the given difficulty.
    #[must_use]
    pub fn with_ai(mut self, side: Side, difficulty: Difficulty) -> Self {
        self.set_ai(side, Some(difficulty));
        self
    }

    /// Put `side` under AI control, or back under external control.
    pub fn set_ai(&mut self, side: Side, difficulty: Option<Difficulty>) {
        *self.ai.get_mut(side) = difficulty.map(|d| AiOpponent::new(side, d, self.seed));
    }

    /// Match seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Ticks processed (paused and ended ticks excluded).
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Match tunables.
    #[must_use]
    pub const fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Card definitions.
    #[must_use]
    pub const fn catalog(&self) -> &CardCatalog {
        &self.catalog
    }

    /// Live entities.
    #[must_use]
    pub const fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Mutable entity access for scenario setup.
    pub fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    /// Match state.
    #[must_use]
    pub const fn state(&self) -> &MatchState {
        &self.state
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> MatchPhase {
        self.state.phase
    }

    /// Seconds of play so far.
    #[must_use]
    pub const fn clock(&self) -> Fixed {
        self.state.clock
    }

    /// Whether the match has ended.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.state.phase == MatchPhase::Ended
    }

    /// Winner of an ended match (`None` on a draw or while running).
    #[must_use]
    pub const fn winner(&self) -> Option<Side> {
        self.state.winner
    }

    /// Crowns held by a side.
    #[must_use]
    pub const fn crowns(&self, side: Side) -> u8 {
        *self.state.crowns.get(side)
    }

    /// A side's economy.
    #[must_use]
    pub const fn economy(&self, side: Side) -> &PlayerEconomy {
        self.state.economies.get(side)
    }

    /// A side's current elixir.
    #[must_use]
    pub const fn elixir(&self, side: Side) -> Fixed {
        self.state.economies.get(side).elixir()
    }

    /// Overwrite a side's elixir (clamped to the cap).
    pub fn set_elixir(&mut self, side: Side, elixir: Fixed) {
        self.state.economies.get_mut(side).set_elixir(elixir);
    }

    /// A side's deck.
    #[must_use]
    pub const fn deck(&self, side: Side) -> &Deck {
        self.state.decks.get(side)
    }

    /// Cards in a side's hand.
    #[must_use]
    pub fn hand(&self, side: Side) -> &[String] {
        self.state.decks.get(side).hand()
    }

    /// The AI controlling `side`, if any.
    #[must_use]
    pub const fn ai(&self, side: Side) -> Option<&AiOpponent> {
        self.ai.get(side).as_ref()
    }

    /// Freeze the clock. Plays are still accepted.
    pub fn pause(&mut self) {
        if !self.state.paused {
            tracing::info!(tick = self.tick, "Match paused");
        }
        self.state.paused = true;
    }

    /// Unfreeze the clock.
    pub fn resume(&mut self) {
        if self.state.paused {
            tracing::info!(tick = self.tick, "Match resumed");
        }
        self.state.paused = false;
    }

    /// Whether the clock is frozen.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.state.paused
    }

    /// Drop the match without producing a result.
    pub fn abandon(self) {
        tracing::debug!(tick = self.tick, "Match abandoned");
    }

    /// Read-only view for rendering.
    #[must_use]
    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot::capture(self)
    }

    /// Final result once the match has ended.
    #[must_use]
    pub fn result(&self) -> Option<MatchResult> {
        self.is_over().then(|| MatchResult::from_simulation(self))
    }

    /// Advance the match by one frame of `dt` seconds.
    ///
    /// Ticks are no-ops while paused or after the match ended.
    pub fn tick(&mut self, dt: Fixed) -> TickEvents {
        let mut events = TickEvents::default();
        if self.state.paused || self.state.phase == MatchPhase::Ended {
            return events;
        }

        // 1. Clock
        let dt = clamp_fixed(dt, Fixed::ZERO, self.config.max_tick_delta);
        self.tick += 1;
        if self.state.phase == MatchPhase::Countdown {
            self.state.countdown -= dt;
            if self.state.countdown <= Fixed::ZERO {
                self.begin(&mut events);
            }
            return events;
        }
        self.state.clock += dt;
        let overtime = self.state.phase == MatchPhase::Overtime;

        // 2. Economy
        for side in Side::BOTH {
            self.state.economies.get_mut(side).regenerate(dt, overtime);
        }

        // 3. Buildings
        self.run_buildings(dt, &mut events);

        // 4. Movement
        move_units(&mut self.store, dt);

        // 5. Targeting and attacks
        update_targets(&mut self.store);
        events.damage.extend(resolve_attacks(&mut self.store, dt));

        // 6. Projectiles, areas, statuses
        if !self.king_down() {
            advance_projectiles(&mut self.store, dt);
            let (damage, heals) = pulse_area_effects(&mut self.store, dt);
            events.damage.extend(damage);
            events.heals.extend(heals);
            events.damage.extend(tick_statuses(&mut self.store, dt));
        }

        // 7. Deaths and crowns
        let report = resolve_deaths(&mut self.store);
        self.apply_deaths(report, &mut events);
        if self.state.phase == MatchPhase::Ended {
            return events;
        }

        // 8. AI
        self.run_ai(&mut events);

        // 9. Regulation and overtime
        self.check_clock(&mut events);

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::trace!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        events
    }

    /// Play a card for `side` at `position`.
    ///
    /// Illegal plays change nothing and come back as
    /// [`PlayOutcome::Rejected`].
    pub fn play_card(&mut self, side: Side, card_id: &str, position: Vec2Fixed) -> PlayOutcome {
        match self.try_play(side, card_id, position) {
            Ok(spawned) => {
                tracing::debug!(%side, card = card_id, ?spawned, "Card played");
                PlayOutcome::Accepted { spawned }
            }
            Err(reason) => {
                tracing::debug!(%side, card = card_id, ?reason, "Play rejected");
                PlayOutcome::Rejected(reason)
            }
        }
    }

    fn try_play(
        &mut self,
        side: Side,
        card_id: &str,
        position: Vec2Fixed,
    ) -> std::result::Result<Vec<EntityId>, RejectReason> {
        if !self.state.phase.accepts_plays() {
            return Err(RejectReason::NotPlaying(self.state.phase));
        }
        if !self.state.decks.get(side).in_hand(card_id) {
            return Err(RejectReason::NotInHand);
        }
        let card = self.catalog.get(card_id).ok_or(RejectReason::UnknownCard)?;
        let economy = self.state.economies.get_mut(side);
        if !economy.spend(card.cost) {
            return Err(RejectReason::InsufficientElixir {
                cost: card.cost,
                available: economy.whole(),
            });
        }

        let spawned = match card.kind {
            CardKind::Troop => {
                let anchor = clamp_to_deploy_zone(side, position);
                spawn_troops(
                    &mut self.store,
                    &mut self.jitter,
                    self.config.spawn_jitter,
                    card,
                    side,
                    anchor,
                    card.count,
                )
            }
            CardKind::Spell => cast_spell(&mut self.store, card, side, position)
                .into_iter()
                .collect(),
            CardKind::Building => {
                let at = clamp_to_deploy_zone(side, position);
                let building = Structure::building(card, side, at);
                vec![self.store.insert(Entity::Structure(building))]
            }
        };

        let deck = self.state.decks.get_mut(side);
        deck.take(card_id);
        deck.refill();
        Ok(spawned)
    }

    /// Countdown over: slot structures, starting elixir, opening hands.
    fn begin(&mut self, events: &mut TickEvents) {
        for slot in structure_slots() {
            let structure = self.config.structures.build(slot);
            self.store.insert(Entity::Structure(structure));
        }
        for side in Side::BOTH {
            self.state
                .economies
                .get_mut(side)
                .set_elixir(self.config.starting_elixir);
            self.state.decks.get_mut(side).deal();
        }
        self.state.countdown = Fixed::ZERO;
        self.set_phase(MatchPhase::Playing, events);
    }

    fn run_buildings(&mut self, dt: Fixed, events: &mut TickEvents) {
        for id in self.store.structure_ids() {
            let Some(structure) = self.store.structure_mut(id) else {
                continue;
            };
            if !structure.is_alive() {
                continue;
            }
            if let Some(lifetime) = structure.lifetime.as_mut() {
                *lifetime -= dt;
                if *lifetime <= Fixed::ZERO {
                    self.store.remove(id);
                    tracing::debug!(structure = id, "Building expired");
                    events.expired.push(id);
                    continue;
                }
            }

            let side = structure.side;
            let anchor = Vec2Fixed::new(
                structure.position.x,
                structure.position.y + forward_y(side) * (structure.radius + SPAWN_CLEARANCE),
            );
            let mut waves = Vec::new();
            if let Some(spawner) = structure.spawner.as_mut() {
                spawner.remaining -= dt;
                while spawner.remaining <= Fixed::ZERO && spawner.interval > Fixed::ZERO {
                    spawner.remaining += spawner.interval;
                    waves.push((spawner.card_id.clone(), spawner.count));
                }
            }

            for (card_id, count) in waves {
                let Some(card) = self.catalog.get(&card_id) else {
                    continue;
                };
                events.spawned.extend(spawn_troops(
                    &mut self.store,
                    &mut self.jitter,
                    self.config.spawn_jitter,
                    card,
                    side,
                    anchor,
                    count,
                ));
            }
        }
    }

    fn king_down(&self) -> bool {
        self.store
            .iter_sorted()
            .filter_map(|(_, entity)| entity.as_structure())
            .any(|s| s.kind == StructureKind::King && !s.destroyed && s.health.is_dead())
    }

    fn apply_deaths(&mut self, report: DeathReport, events: &mut TickEvents) {
        for death in &report.deaths {
            let Death::Structure { id, side, kind } = *death else {
                continue;
            };
            let attacker = side.opponent();
            let crowns = self.state.crowns.get_mut(attacker);
            match kind {
                StructureKind::Tower => *crowns = (*crowns + 1).min(3),
                StructureKind::King => *crowns = 3,
                StructureKind::Building => continue,
            }
            let total = *crowns;
            tracing::info!(side = %attacker, total, structure = id, "Crown awarded");
            events.crowns.push(CrownEvent {
                side: attacker,
                total,
                structure: id,
            });
        }

        events.damage.extend(report.explosion_damage);
        events.revivals.extend(report.revivals);
        events.deaths.extend(report.deaths);

        if let Some(fallen) = report.king_destroyed {
            self.finish(Some(fallen.opponent()), events);
        }
    }

    fn run_ai(&mut self, events: &mut TickEvents) {
        let now = self.state.clock;
        for side in Side::BOTH {
            let Some(mut ai) = self.ai.get_mut(side).take() else {
                continue;
            };

            for play in ai.take_due(now) {
                let outcome = self.play_card(side, &play.intent.card_id, play.intent.position);
                match outcome {
                    PlayOutcome::Accepted { spawned } => events.plays.push(PlayEvent {
                        side,
                        card_id: play.intent.card_id.clone(),
                        position: play.intent.position,
                        spawned,
                        branch: None,
                    }),
                    PlayOutcome::Rejected(RejectReason::InsufficientElixir { .. }) => {
                        ai.requeue(play);
                    }
                    PlayOutcome::Rejected(_) => {}
                }
            }

            let decision = {
                let economy = self.state.economies.get(side);
                let view = AiView {
                    store: &self.store,
                    catalog: &self.catalog,
                    hand: self.state.decks.get(side).hand(),
                    elixir: economy.elixir(),
                    max_elixir: economy.max(),
                };
                ai.update(now, &view)
            };
            if let Some(decision) = decision {
                let intent = decision.play;
                if let PlayOutcome::Accepted { spawned } =
                    self.play_card(side, &intent.card_id, intent.position)
                {
                    events.plays.push(PlayEvent {
                        side,
                        card_id: intent.card_id,
                        position: intent.position,
                        spawned,
                        branch: Some(decision.branch),
                    });
                }
            }

            *self.ai.get_mut(side) = Some(ai);
        }
    }

    fn check_clock(&mut self, events: &mut TickEvents) {
        let player = self.crowns(Side::Player);
        let opponent = self.crowns(Side::Opponent);
        let leader = match player.cmp(&opponent) {
            std::cmp::Ordering::Greater => Some(Side::Player),
            std::cmp::Ordering::Less => Some(Side::Opponent),
            std::cmp::Ordering::Equal => None,
        };

        match self.state.phase {
            MatchPhase::Playing if self.state.clock >= self.config.regulation_seconds => {
                if leader.is_some() {
                    self.finish(leader, events);
                } else {
                    self.set_phase(MatchPhase::Overtime, events);
                }
            }
            MatchPhase::Overtime => {
                let limit = self.config.regulation_seconds + self.config.overtime_seconds;
                if leader.is_some() || self.state.clock >= limit {
                    self.finish(leader, events);
                }
            }
            _ => {}
        }
    }

    fn set_phase(&mut self, to: MatchPhase, events: &mut TickEvents) {
        let from = self.state.phase;
        if from == to {
            return;
        }
        self.state.phase = to;
        if to == MatchPhase::Overtime {
            self.state.overtime = true;
        }
        tracing::info!(?from, ?to, clock = %self.state.clock, "Match phase changed");
        events.phase_changes.push(PhaseChange { from, to });
    }

    fn finish(&mut self, winner: Option<Side>, events: &mut TickEvents) {
        self.state.winner = winner;
        self.set_phase(MatchPhase::Ended, events);
        tracing::info!(
            winner = ?winner,
            player_crowns = self.crowns(Side::Player),
            opponent_crowns = self.crowns(Side::Opponent),
            tick = self.tick,
            "Match ended"
        );
    }

    /// Hash of the full match state, for determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.state.clock.to_bits().hash(&mut hasher);
        self.state.countdown.to_bits().hash(&mut hasher);
        self.state.phase.hash(&mut hasher);
        self.state.winner.hash(&mut hasher);
        self.state.crowns.hash(&mut hasher);
        self.state.economies.hash(&mut hasher);
        for side in Side::BOTH {
            let deck = self.state.decks.get(side);
            deck.hand().hash(&mut hasher);
            deck.draw_pile().hash(&mut hasher);
            if let Some(ai) = self.ai.get(side) {
                ai.state().hash(&mut hasher);
            }
        }

        self.store.len().hash(&mut hasher);
        self.store.next_id().hash(&mut hasher);
        for (id, entity) in self.store.iter_sorted() {
            id.hash(&mut hasher);
            entity.hash(&mut hasher);
        }

        hasher.finish()
    }

    /// Serialize the whole match to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize simulation: {e}")))
    }

    /// Restore a match from [`Simulation::serialize`] output.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| {
            GameError::InvalidState(format!("Failed to deserialize simulation: {e}"))
        })
    }
}

/// Offset of troop `index` of `count` from the formation anchor.
///
/// Rows of up to three, centred on the anchor; later rows trail behind.
fn formation_offset(side: Side, index: u32, count: u32) -> Vec2Fixed {
    if count <= 1 {
        return Vec2Fixed::ZERO;
    }
    let columns = count.min(FORMATION_COLUMNS);
    let row = index / columns;
    let column = index % columns;
    let in_row = columns.min(count - row * columns);
    let half = FORMATION_SPACING / Fixed::from_num(2);
    let x = Fixed::from_num(2 * i64::from(column) - (i64::from(in_row) - 1)) * half;
    let y = -forward_y(side) * FORMATION_SPACING * Fixed::from_num(row);
    Vec2Fixed::new(x, y)
}

fn spawn_troops(
    store: &mut EntityStore,
    jitter_rng: &mut MatchRng,
    jitter: Fixed,
    card: &CardData,
    side: Side,
    anchor: Vec2Fixed,
    count: u32,
) -> Vec<EntityId> {
    let count = count.max(1);
    (0..count)
        .map(|index| {
            let offset = formation_offset(side, index, count);
            let mut placed = anchor + offset;
            if count > 1 {
                placed.x += rng::symmetric(jitter_rng, jitter);
                placed.y += rng::symmetric(jitter_rng, jitter);
            }
            let position = clamp_to_deploy_zone(side, placed);
            store.insert(Entity::Unit(Unit::from_card(card, side, position)))
        })
        .collect()
}

fn cast_spell(
    store: &mut EntityStore,
    card: &CardData,
    side: Side,
    target: Vec2Fixed,
) -> Option<EntityId> {
    let payload = card.spell?;
    let destination = clamp_to_arena(target);
    let origin = if payload.projectile_speed > Fixed::ZERO {
        king_position(side)
    } else {
        destination
    };
    Some(store.insert(Entity::Projectile(Projectile {
        side,
        card_id: card.id.clone(),
        origin,
        position: origin,
        destination,
        speed: payload.projectile_speed,
        payload,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(seed: u64) -> Simulation {
        let mut sim = Simulation::new(MatchConfig::default(), CardCatalog::default_catalog(), seed)
            .expect("valid");
        for _ in 0..30 {
            sim.tick(Fixed::from_num(0.1));
        }
        sim
    }

    #[test]
    fn test_countdown_then_playing() {
        let mut sim = Simulation::new(MatchConfig::default(), CardCatalog::default_catalog(), 1)
            .expect("valid");
        assert_eq!(sim.phase(), MatchPhase::Countdown);
        assert!(sim.store().is_empty());
        let mut changes = Vec::new();
        for _ in 0..35 {
            changes.extend(sim.tick(Fixed::from_num(0.1)).phase_changes);
        }
        assert_eq!(sim.phase(), MatchPhase::Playing);
        assert_eq!(
            changes,
            vec![PhaseChange {
                from: MatchPhase::Countdown,
                to: MatchPhase::Playing
            }]
        );
        assert_eq!(sim.store().len(), 6);
        assert_eq!(sim.elixir(Side::Player), Fixed::from_num(5));
    }

    #[test]
    fn test_plays_rejected_during_countdown() {
        let mut sim = Simulation::new(MatchConfig::default(), CardCatalog::default_catalog(), 1)
            .expect("valid");
        let outcome = sim.play_card(Side::Player, "knight", Vec2Fixed::from_ints(88, 500));
        assert_eq!(
            outcome,
            PlayOutcome::Rejected(RejectReason::NotPlaying(MatchPhase::Countdown))
        );
    }

    #[test]
    fn test_card_not_in_hand_is_rejected() {
        let mut sim = start(3);
        let missing = sim
            .deck(Side::Player)
            .cards()
            .iter()
            .find(|card| !sim.deck(Side::Player).in_hand(card))
            .cloned()
            .expect("deck larger than hand");
        let elixir = sim.elixir(Side::Player);
        let outcome = sim.play_card(Side::Player, &missing, Vec2Fixed::from_ints(88, 500));
        assert_eq!(outcome, PlayOutcome::Rejected(RejectReason::NotInHand));
        assert_eq!(sim.elixir(Side::Player), elixir);
    }

    #[test]
    fn test_troop_play_spawns_in_deploy_zone() {
        let mut sim = start(4);
        sim.set_elixir(Side::Player, Fixed::from_num(10));
        let card = sim.hand(Side::Player)[0].clone();
        let outcome = sim.play_card(Side::Player, &card, Vec2Fixed::from_ints(200, 100));
        let PlayOutcome::Accepted { spawned } = outcome else {
            panic!("play accepted");
        };
        assert!(!spawned.is_empty());
        for id in spawned {
            let entity = sim.store().get(id).expect("spawned");
            if entity.as_unit().is_some() || entity.as_structure().is_some() {
                assert!(entity.position().y >= Fixed::from_num(344));
            }
        }
        assert_eq!(sim.hand(Side::Player).len(), 4);
    }

    #[test]
    fn test_single_troop_lands_on_play_point_without_jitter() {
        let catalog = CardCatalog::default_catalog();
        let mut store = EntityStore::new();
        let mut jitter = rng::stream(7, "jitter");
        let untouched = jitter.clone();
        let knight = catalog.require("knight").expect("knight");
        let anchor = Vec2Fixed::from_ints(200, 500);

        let ten = Fixed::from_num(10);
        let spawned = spawn_troops(&mut store, &mut jitter, ten, knight, Side::Player, anchor, 1);
        assert_eq!(spawned.len(), 1);
        assert_eq!(store.get(spawned[0]).map(Entity::position), Some(anchor));
        assert_eq!(jitter, untouched);

        let guards = catalog.require("guards").expect("guards");
        let squad = spawn_troops(&mut store, &mut jitter, ten, guards, Side::Player, anchor, 3);
        assert_eq!(squad.len(), 3);
        assert_ne!(jitter, untouched);
    }

    #[test]
    fn test_formation_is_centred() {
        let a = formation_offset(Side::Player, 0, 3);
        let c = formation_offset(Side::Player, 2, 3);
        assert_eq!(a.x, -c.x);
        assert_eq!(formation_offset(Side::Player, 1, 3), Vec2Fixed::ZERO);
        let back = formation_offset(Side::Player, 3, 4);
        assert_eq!(back, Vec2Fixed::from_ints(0, 16));
    }

    #[test]
    fn test_pause_freezes_clock() {
        let mut sim = start(5);
        let clock = sim.clock();
        sim.pause();
        sim.tick(Fixed::from_num(0.1));
        assert_eq!(sim.clock(), clock);
        sim.resume();
        sim.tick(Fixed::from_num(0.1));
        assert_eq!(sim.clock(), clock + Fixed::from_num(0.1));
    }

    #[test]
    fn test_delta_is_clamped() {
        let mut sim = start(6);
        let clock = sim.clock();
        sim.tick(Fixed::from_num(5));
        assert_eq!(sim.clock(), clock + Fixed::from_num(0.1));
    }

    #[test]
    fn test_serialization_round_trip_preserves_hash() {
        let mut sim = start(7).with_ai(Side::Opponent, Difficulty::Medium);
        for _ in 0..50 {
            sim.tick(Fixed::from_num(0.1));
        }
        let bytes = sim.serialize().expect("serializes");
        let restored = Simulation::deserialize(&bytes).expect("deserializes");
        assert_eq!(restored.state_hash(), sim.state_hash());
    }
}
