//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a match produces identical results
//! given identical inputs.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism the harness guards against:
//!
//! - **Floating-point math**: the core uses fixed-point arithmetic via
//!   [`lane_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: the entity store is always walked in
//!   sorted id order.
//!
//! - **Unseeded randomness**: spawn jitter, decks and AI each draw from a
//!   stream derived from the match seed.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual subsystems (router, combat, deck)
//! 2. **Property tests**: random seeds and frame deltas stay deterministic
//! 3. **Integration tests**: full AI-vs-AI matches are reproducible
//! 4. **Parallel tests**: matches on different threads all agree

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use lane_core::math::Fixed;
use lane_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Distinct hashes (1 for a deterministic match).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run agreed, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine several times and compare final hashes.
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();
        for _ in 0..ticks {
            step(&mut state);
        }
        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a match twice with fixed `dt` frames and compare the final hashes.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64, dt: Fixed) -> bool
where
    F: Fn() -> Simulation,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim| {
            sim.tick(dt);
        },
        Simulation::state_hash,
    )
    .is_deterministic
}

/// Run `num_sims` matches on scoped threads and collect their final hashes.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_simulations<F>(
    setup_fn: F,
    num_sims: usize,
    num_ticks: u64,
    dt: Fixed,
) -> DeterminismResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.tick(dt);
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two runs tick by tick and report the first diverging tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64, dt: Fixed) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.tick(dt);
        sim2.tick(dt);

        if sim1.state_hash() != sim2.state_hash() {
            tracing::warn!(tick, "Simulations diverged");
            return Some(tick);
        }
    }

    None
}

/// Whether a serialize/deserialize round trip mid-match preserves the hash,
/// and the restored match keeps evolving identically.
pub fn verify_serialization_determinism<F>(setup_fn: F, num_ticks: u64, dt: Fixed) -> bool
where
    F: Fn() -> Simulation,
{
    let mut sim = setup_fn();
    for _ in 0..num_ticks {
        sim.tick(dt);
    }

    let Ok(bytes) = sim.serialize() else {
        return false;
    };
    let Ok(mut restored) = Simulation::deserialize(&bytes) else {
        return false;
    };
    if restored.state_hash() != sim.state_hash() {
        return false;
    }

    for _ in 0..num_ticks {
        sim.tick(dt);
        restored.tick(dt);
    }
    restored.state_hash() == sim.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for match inputs.
pub mod strategies {
    use lane_core::arena::{ARENA_HEIGHT, ARENA_WIDTH};
    use lane_core::factions::Side;
    use lane_core::math::{Fixed, Vec2Fixed};
    use proptest::prelude::*;

    /// Any match seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }

    /// Frame delta between 0 and 0.25 s, in milliseconds granularity.
    ///
    /// Values above the 0.1 s clamp are included on purpose.
    pub fn arb_frame_delta() -> impl Strategy<Value = Fixed> {
        (0i32..=250).prop_map(|ms| Fixed::from_num(ms) / Fixed::from_num(1000))
    }

    /// A list of frame deltas.
    pub fn arb_frames(len: usize) -> impl Strategy<Value = Vec<Fixed>> {
        prop::collection::vec(arb_frame_delta(), len)
    }

    /// Any point in (or slightly outside) the arena.
    pub fn arb_position() -> impl Strategy<Value = Vec2Fixed> {
        let width: i32 = ARENA_WIDTH.to_num();
        let height: i32 = ARENA_HEIGHT.to_num();
        (-20..width + 20, -20..height + 20).prop_map(|(x, y)| Vec2Fixed::from_ints(x, y))
    }

    /// Either side.
    pub fn arb_side() -> impl Strategy<Value = Side> {
        prop_oneof![Just(Side::Player), Just(Side::Opponent)]
    }

    /// A scripted play: (frame index, side, hand slot, position).
    pub fn arb_play(frames: usize) -> impl Strategy<Value = (usize, Side, usize, Vec2Fixed)> {
        (0..frames.max(1), arb_side(), 0usize..4, arb_position())
    }
}
