//! Heuristic AI opponent.
//!
//! The AI reads the board and answers with play intents; it never touches the
//! entity store. Every intent goes through the same `play_card` entry point
//! a human uses, so an unaffordable or stale intent is simply rejected.
//!
//! # Decision cycle
//!
//! On its own jittered cadence the AI:
//! 1. buckets enemy threat by lane (`health fraction x damage`, doubled past
//!    the midline into its own half);
//! 2. defends the most threatened lane when threat exceeds `40 x accuracy`,
//!    optionally queueing an area spell when it also exceeds `80 x accuracy`;
//! 3. attacks the lane of the weakest enemy tower when elixir reaches the
//!    profile threshold (or on a small opportunistic roll), optionally pairing
//!    a tank with a ranged follow-up;
//! 4. dumps the cheapest card when elixir is about to overflow.
//!
//! Follow-up plays sit in a pending queue checked every tick.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::arena::{
    clamp_to_deploy_zone, forward_y, is_in_half_of, structure_slots, Lane, SlotKind, MIDLINE,
};
use crate::components::StructureKind;
use crate::data::{CardCatalog, CardData, CardKind, CardRole};
use crate::entities::EntityStore;
use crate::error::GameError;
use crate::factions::Side;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::rng::{self, MatchRng};

/// Seconds a pending play may be overdue before it is dropped.
pub const PENDING_TIMEOUT: Fixed = Fixed::const_from_int(3);
/// Delay before a defensive combo spell.
pub const DEFENSIVE_COMBO_DELAY: Fixed = Fixed::lit("0.5");
/// Delay before the ranged card that follows a tank.
pub const OFFENSIVE_COMBO_DELAY: Fixed = Fixed::const_from_int(1);
/// Chance of an offensive play below the elixir threshold.
pub const OPPORTUNISTIC_CHANCE: Fixed = Fixed::lit("0.05");

const DEFENSE_THREAT: Fixed = Fixed::const_from_int(40);
const SPELL_THREAT: Fixed = Fixed::const_from_int(80);
const PAST_MIDLINE_MULTIPLIER: Fixed = Fixed::const_from_int(2);
const HIGH_THREAT_DELAY_FACTOR: Fixed = Fixed::lit("0.6");
const OVERFLOW_MARGIN: Fixed = Fixed::lit("0.5");
const DELAY_JITTER_LOW: Fixed = Fixed::lit("0.75");
const DELAY_JITTER_HIGH: Fixed = Fixed::lit("1.25");
/// How far in front of its own towers the AI drops defenders.
const DEFENSE_OFFSET: Fixed = Fixed::const_from_int(40);
/// Spacing between a tank and the ranged card queued behind it.
const SUPPORT_OFFSET: Fixed = Fixed::const_from_int(40);
/// Largest placement error at zero accuracy.
const PLACEMENT_ERROR: Fixed = Fixed::const_from_int(40);
/// Distance from the midline at which offensive troops are dropped.
const BRIDGE_APPROACH: Fixed = Fixed::const_from_int(40);

/// Difficulty tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    /// Slow and sloppy.
    Easy,
    /// Default opponent.
    #[default]
    Medium,
    /// Fast, accurate, combo-happy.
    Hard,
}

impl Difficulty {
    /// All tiers.
    pub const ALL: [Self; 3] = [Self::Easy, Self::Medium, Self::Hard];

    /// Fixed tuning for this tier.
    #[must_use]
    pub fn profile(self) -> DifficultyProfile {
        let (delay, accuracy, combo, threshold) = match self {
            Self::Easy => (3.0, 0.5, 0.1, 8),
            Self::Medium => (2.0, 0.7, 0.3, 7),
            Self::Hard => (1.2, 0.9, 0.6, 6),
        };
        DifficultyProfile {
            decision_delay: Fixed::from_num(delay),
            accuracy: Fixed::from_num(accuracy),
            combo_probability: Fixed::from_num(combo),
            elixir_threshold: threshold,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Difficulty {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(GameError::InvalidConfig(format!("unknown difficulty '{other}'"))),
        }
    }
}

/// Tuning of one difficulty tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DifficultyProfile {
    /// Base seconds between decisions.
    #[serde(with = "fixed_serde")]
    pub decision_delay: Fixed,
    /// Scales thresholds, tank preference and placement precision.
    #[serde(with = "fixed_serde")]
    pub accuracy: Fixed,
    /// Chance to follow a play with a combo card.
    #[serde(with = "fixed_serde")]
    pub combo_probability: Fixed,
    /// Elixir at which the AI goes on the offensive.
    pub elixir_threshold: u32,
}

impl DifficultyProfile {
    /// Lane threat above which the AI defends.
    #[must_use]
    pub fn defense_threshold(&self) -> Fixed {
        DEFENSE_THREAT * self.accuracy
    }

    /// Lane threat above which a defensive spell may be queued.
    #[must_use]
    pub fn spell_threshold(&self) -> Fixed {
        SPELL_THREAT * self.accuracy
    }
}

/// A card play the AI wants to make.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayIntent {
    /// Card to play.
    pub card_id: String,
    /// Deployment point.
    pub position: Vec2Fixed,
}

/// A deferred play, realised once `due` has passed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingPlay {
    /// What to play.
    pub intent: PlayIntent,
    /// Match time at which the play becomes due.
    #[serde(with = "fixed_serde")]
    pub due: Fixed,
}

/// Which branch produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiBranch {
    /// Answering a threatened lane.
    Defensive,
    /// Pushing the weakest enemy lane.
    Offensive,
    /// Spending elixir before it caps.
    Overflow,
}

/// Outcome of one decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiDecision {
    /// Branch taken.
    pub branch: AiBranch,
    /// Play to make now.
    pub play: PlayIntent,
}

/// Mutable AI bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AiState {
    /// Match time of the last evaluation.
    #[serde(with = "fixed_serde")]
    pub last_decision_time: Fixed,
    /// Seconds until the next evaluation.
    #[serde(with = "fixed_serde")]
    pub decision_delay: Fixed,
    /// Threat per lane from the last evaluation.
    pub lane_threat: [ThreatValue; 3],
    /// Tuning.
    pub profile: DifficultyProfile,
    /// Deferred combo plays.
    pub pending: VecDeque<PendingPlay>,
}

/// Serializable wrapper for a threat score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThreatValue(#[serde(with = "fixed_serde")] pub Fixed);

/// What the AI may look at when deciding.
#[derive(Debug, Clone, Copy)]
pub struct AiView<'a> {
    /// Live entities.
    pub store: &'a EntityStore,
    /// Card definitions.
    pub catalog: &'a CardCatalog,
    /// Cards in the AI's hand.
    pub hand: &'a [String],
    /// Current elixir.
    pub elixir: Fixed,
    /// Elixir cap.
    pub max_elixir: Fixed,
}

/// AI opponent driving one side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiOpponent {
    side: Side,
    difficulty: Difficulty,
    state: AiState,
    rng: MatchRng,
}

impl AiOpponent {
    /// Create an AI for `side`, seeded from the match seed.
    #[must_use]
    pub fn new(side: Side, difficulty: Difficulty, seed: u64) -> Self {
        let profile = difficulty.profile();
        Self {
            side,
            difficulty,
            state: AiState {
                last_decision_time: Fixed::ZERO,
                decision_delay: profile.decision_delay,
                lane_threat: [ThreatValue::default(); 3],
                profile,
                pending: VecDeque::new(),
            },
            rng: rng::stream(seed, &format!("ai.{}", side.display_name())),
        }
    }

    /// Side this AI plays.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Difficulty tier.
    #[must_use]
    pub const fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Read-only state.
    #[must_use]
    pub const fn state(&self) -> &AiState {
        &self.state
    }

    /// Remove and return pending plays that are due at `now`.
    ///
    /// Plays more than [`PENDING_TIMEOUT`] overdue are dropped.
    pub fn take_due(&mut self, now: Fixed) -> Vec<PendingPlay> {
        let mut due = Vec::new();
        let mut waiting = VecDeque::with_capacity(self.state.pending.len());
        for play in self.state.pending.drain(..) {
            if play.due > now {
                waiting.push_back(play);
            } else if now - play.due > PENDING_TIMEOUT {
                tracing::debug!(side = %self.side, card = %play.intent.card_id, "Pending play expired");
            } else {
                due.push(play);
            }
        }
        self.state.pending = waiting;
        due
    }

    /// Put back a due play that could not be made yet.
    pub fn requeue(&mut self, play: PendingPlay) {
        self.state.pending.push_back(play);
    }

    /// Whether a decision is due at `now`.
    #[must_use]
    pub fn decision_due(&self, now: Fixed) -> bool {
        now - self.state.last_decision_time >= self.state.decision_delay
    }

    /// Evaluate the board if the decision timer has elapsed.
    pub fn update(&mut self, now: Fixed, view: &AiView<'_>) -> Option<AiDecision> {
        if !self.decision_due(now) {
            return None;
        }
        self.evaluate(now, view)
    }

    /// Evaluate the board now, regardless of the timer.
    pub fn evaluate(&mut self, now: Fixed, view: &AiView<'_>) -> Option<AiDecision> {
        let threat = lane_threat(view.store, self.side);
        self.state.lane_threat = threat.map(ThreatValue);
        let (lane, max_threat) = most_threatened(&threat);
        let profile = self.state.profile;
        let high_threat = max_threat > profile.defense_threshold();

        let decision = self
            .defend(now, view, lane, max_threat)
            .or_else(|| self.attack(now, view))
            .or_else(|| self.overflow(view));

        self.state.last_decision_time = now;
        let mut delay = profile.decision_delay
            * rng::between(&mut self.rng, DELAY_JITTER_LOW, DELAY_JITTER_HIGH);
        if high_threat {
            delay *= HIGH_THREAT_DELAY_FACTOR;
        }
        self.state.decision_delay = delay;

        if let Some(decision) = &decision {
            tracing::debug!(
                side = %self.side,
                branch = ?decision.branch,
                card = %decision.play.card_id,
                threat = %max_threat,
                "AI decision"
            );
        }
        decision
    }

    fn defend(
        &mut self,
        now: Fixed,
        view: &AiView<'_>,
        lane: Lane,
        max_threat: Fixed,
    ) -> Option<AiDecision> {
        let profile = self.state.profile;
        if max_threat <= profile.defense_threshold() {
            return None;
        }
        let affordable = affordable_cards(view, Fixed::ZERO);
        let defenders: Vec<&CardData> = affordable.iter().copied().filter(|c| c.is_defender()).collect();

        let prefer_tank = rng::unit(&mut self.rng) < profile.accuracy;
        let pick = prefer_tank
            .then(|| defenders.iter().find(|c| c.role == CardRole::Tank))
            .flatten()
            .or_else(|| defenders.iter().find(|c| c.is_ranged() && c.kind == CardKind::Troop))
            .or_else(|| defenders.first())
            .copied()?;

        let anchor = defense_anchor(self.side, lane);
        let position = self.aim(anchor);

        if max_threat > profile.spell_threshold()
            && rng::unit(&mut self.rng) < profile.combo_probability
        {
            let budget = Fixed::from_num(pick.cost);
            let spell = affordable_cards(view, budget)
                .into_iter()
                .filter(|c| c.is_damage_spell() && c.id != pick.id)
                .max_by_key(|c| c.cost);
            if let Some(spell) = spell {
                let radius = spell.spell.as_ref().map_or(Fixed::ZERO, |s| s.radius);
                if let Some(center) = densest_cluster(view.store, self.side, radius) {
                    self.state.pending.push_back(PendingPlay {
                        intent: PlayIntent {
                            card_id: spell.id.clone(),
                            position: center,
                        },
                        due: now + DEFENSIVE_COMBO_DELAY,
                    });
                }
            }
        }

        Some(AiDecision {
            branch: AiBranch::Defensive,
            play: PlayIntent {
                card_id: pick.id.clone(),
                position,
            },
        })
    }

    fn attack(&mut self, now: Fixed, view: &AiView<'_>) -> Option<AiDecision> {
        let profile = self.state.profile;
        let eager = view.elixir >= Fixed::from_num(profile.elixir_threshold);
        if !eager && rng::unit(&mut self.rng) >= OPPORTUNISTIC_CHANCE {
            return None;
        }

        let lane = weakest_enemy_lane(view.store, self.side);
        let anchor = attack_anchor(self.side, lane);
        let troops: Vec<&CardData> = affordable_cards(view, Fixed::ZERO)
            .into_iter()
            .filter(|c| c.kind == CardKind::Troop)
            .collect();

        if rng::unit(&mut self.rng) < profile.combo_probability {
            let tank = troops.iter().find(|c| c.role == CardRole::Tank);
            let ranged = troops.iter().find(|c| c.is_ranged());
            if let (Some(tank), Some(ranged)) = (tank, ranged) {
                let joint = Fixed::from_num(tank.cost + ranged.cost);
                if joint <= view.elixir {
                    let behind = Vec2Fixed::new(
                        anchor.x,
                        anchor.y - forward_y(self.side) * SUPPORT_OFFSET,
                    );
                    self.state.pending.push_back(PendingPlay {
                        intent: PlayIntent {
                            card_id: ranged.id.clone(),
                            position: clamp_to_deploy_zone(self.side, behind),
                        },
                        due: now + OFFENSIVE_COMBO_DELAY,
                    });
                    return Some(AiDecision {
                        branch: AiBranch::Offensive,
                        play: PlayIntent {
                            card_id: tank.id.clone(),
                            position: anchor,
                        },
                    });
                }
            }
        }

        // Reversed so the earliest hand slot wins a cost tie.
        let pick = troops.iter().rev().copied().max_by_key(|c| c.cost)?;
        Some(AiDecision {
            branch: AiBranch::Offensive,
            play: PlayIntent {
                card_id: pick.id.clone(),
                position: anchor,
            },
        })
    }

    fn overflow(&mut self, view: &AiView<'_>) -> Option<AiDecision> {
        if view.elixir < view.max_elixir - OVERFLOW_MARGIN {
            return None;
        }
        let pick = affordable_cards(view, Fixed::ZERO)
            .into_iter()
            .min_by_key(|c| c.cost)?;
        let lane = weakest_enemy_lane(view.store, self.side);
        let position = match (pick.kind, pick.spell.as_ref()) {
            (CardKind::Spell, Some(spell)) => densest_cluster(view.store, self.side, spell.radius)
                .unwrap_or_else(|| enemy_tower_position(view.store, self.side, lane)),
            (CardKind::Building, _) => defense_anchor(self.side, Lane::Center),
            _ => attack_anchor(self.side, lane),
        };
        Some(AiDecision {
            branch: AiBranch::Overflow,
            play: PlayIntent {
                card_id: pick.id.clone(),
                position,
            },
        })
    }

    fn aim(&mut self, anchor: Vec2Fixed) -> Vec2Fixed {
        let error = PLACEMENT_ERROR * (Fixed::ONE - self.state.profile.accuracy);
        let x = anchor.x + rng::symmetric(&mut self.rng, error);
        let y = anchor.y + rng::symmetric(&mut self.rng, error);
        clamp_to_deploy_zone(self.side, Vec2Fixed::new(x, y))
    }
}

/// Hand cards costing at most `elixir - reserved`, in hand order.
fn affordable_cards<'a>(view: &AiView<'a>, reserved: Fixed) -> Vec<&'a CardData> {
    let budget = view.elixir - reserved;
    view.hand
        .iter()
        .filter_map(|id| view.catalog.get(id))
        .filter(|card| Fixed::from_num(card.cost) <= budget)
        .collect()
}

/// Threat per lane from enemy units, seen by `side`.
#[must_use]
pub fn lane_threat(store: &EntityStore, side: Side) -> [Fixed; 3] {
    let mut threat = [Fixed::ZERO; 3];
    for (_, unit) in store.units_of(side.opponent()) {
        let multiplier = if is_in_half_of(side, unit.position) {
            PAST_MIDLINE_MULTIPLIER
        } else {
            Fixed::ONE
        };
        let score = unit.health.fraction() * Fixed::from_num(unit.stats.damage) * multiplier;
        threat[Lane::of(unit.position.x).index()] += score;
    }
    threat
}

/// The lane with the highest threat (first lane wins ties).
#[must_use]
pub fn most_threatened(threat: &[Fixed; 3]) -> (Lane, Fixed) {
    let mut best = (Lane::Left, threat[0]);
    for lane in Lane::ALL {
        if threat[lane.index()] > best.1 {
            best = (lane, threat[lane.index()]);
        }
    }
    best
}

/// Position of the enemy unit with the most enemy neighbours within `radius`.
#[must_use]
pub fn densest_cluster(store: &EntityStore, side: Side, radius: Fixed) -> Option<Vec2Fixed> {
    let enemies: Vec<Vec2Fixed> = store
        .units_of(side.opponent())
        .map(|(_, unit)| unit.position)
        .collect();
    let radius_sq = radius * radius;
    let mut best: Option<(Vec2Fixed, usize)> = None;
    for &center in &enemies {
        let count = enemies
            .iter()
            .filter(|other| center.distance_squared(**other) <= radius_sq)
            .count();
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((center, count));
        }
    }
    best.map(|(center, _)| center)
}

/// Lane whose enemy tower has the lowest health; centre once no tower stands.
#[must_use]
pub fn weakest_enemy_lane(store: &EntityStore, side: Side) -> Lane {
    store
        .structures_of(side.opponent())
        .filter(|(_, s)| s.kind == StructureKind::Tower)
        .min_by_key(|(_, s)| s.health.current)
        .map_or(Lane::Center, |(_, s)| s.lane)
}

fn enemy_tower_position(store: &EntityStore, side: Side, lane: Lane) -> Vec2Fixed {
    store
        .structures_of(side.opponent())
        .find(|(_, s)| s.lane == lane && s.kind != StructureKind::Building)
        .map_or_else(|| crate::arena::king_position(side.opponent()), |(_, s)| s.position)
}

/// Where the AI drops defenders for `lane`: in front of its own tower row.
#[must_use]
pub fn defense_anchor(side: Side, lane: Lane) -> Vec2Fixed {
    let tower_y = structure_slots()
        .into_iter()
        .find(|slot| slot.side == side && slot.kind == SlotKind::Tower)
        .map_or(MIDLINE, |slot| slot.position.y);
    let y = tower_y + forward_y(side) * DEFENSE_OFFSET;
    clamp_to_deploy_zone(side, Vec2Fixed::new(lane.deploy_x(), y))
}

/// Where the AI drops attackers for `lane`: at the bridge approach.
#[must_use]
pub fn attack_anchor(side: Side, lane: Lane) -> Vec2Fixed {
    let y = MIDLINE - forward_y(side) * BRIDGE_APPROACH;
    clamp_to_deploy_zone(side, Vec2Fixed::new(lane.deploy_x(), y))
}
