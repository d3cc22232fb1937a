//! Property tests over random seeds, frame deltas and scripted plays.

use lane_core::ai::Difficulty;
use lane_core::arena::{is_off_bridge_in_river, ARENA_HEIGHT, ARENA_WIDTH};
use lane_core::components::EntityId;
use lane_core::factions::Side;
use lane_core::math::{Fixed, Vec2Fixed};
use lane_core::simulation::Simulation;
use lane_test_utils::determinism::strategies::{arb_frames, arb_play, arb_seed};
use lane_test_utils::fixtures::{ai_match, playing_match};
use lane_test_utils::proptest::prelude::*;

const FRAMES: usize = 300;

type Play = (usize, Side, usize, Vec2Fixed);

/// Drive `sim` through `frames`, applying `plays` and checking invariants
/// after every tick.
fn check_invariants(mut sim: Simulation, frames: &[Fixed], plays: &[Play]) -> Result<(), TestCaseError> {
    let mut in_river: Vec<EntityId> = Vec::new();

    for (index, dt) in frames.iter().enumerate() {
        for (_, side, slot, position) in plays.iter().filter(|play| play.0 == index) {
            let hand = sim.hand(*side);
            if let Some(card) = hand.get(*slot % hand.len().max(1)).cloned() {
                let _ = sim.play_card(*side, &card, *position);
            }
        }
        sim.tick(*dt);

        for side in Side::BOTH {
            let elixir = sim.elixir(side);
            let max = sim.economy(side).max();
            prop_assert!(elixir >= Fixed::ZERO && elixir <= max, "elixir {elixir} out of range");
            prop_assert!(sim.hand(side).len() <= sim.config().hand_size);
            prop_assert!(sim.crowns(side) <= 3);
        }

        let mut now_in_river = Vec::new();
        for side in Side::BOTH {
            for (id, unit) in sim.store().units_of(side) {
                let p = unit.position;
                prop_assert!(p.x >= Fixed::ZERO && p.x <= ARENA_WIDTH, "unit {id} left the arena");
                prop_assert!(p.y >= Fixed::ZERO && p.y <= ARENA_HEIGHT, "unit {id} left the arena");
                if is_off_bridge_in_river(p) {
                    prop_assert!(!in_river.contains(&id), "unit {id} stuck in the river");
                    now_in_river.push(id);
                }
            }
        }
        in_river = now_in_river;

        if sim.is_over() {
            prop_assert!(sim.result().is_some());
            break;
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Scripted plays from both sides never break the match invariants.
    #[test]
    fn prop_scripted_plays_keep_invariants(
        seed in arb_seed(),
        frames in arb_frames(FRAMES),
        plays in prop::collection::vec(arb_play(FRAMES), 0..40),
    ) {
        check_invariants(playing_match(seed), &frames, &plays)?;
    }

    /// Two AIs and arbitrary frame pacing never break the match invariants.
    #[test]
    fn prop_ai_matches_keep_invariants(
        seed in arb_seed(),
        frames in arb_frames(FRAMES),
    ) {
        let sim = ai_match(seed, Some(Difficulty::Medium), Some(Difficulty::Hard));
        check_invariants(sim, &frames, &[])?;
    }

    /// Rejected plays leave elixir and hand untouched.
    #[test]
    fn prop_rejected_plays_are_side_effect_free(
        seed in arb_seed(),
        play in arb_play(1),
    ) {
        let (_, side, _, position) = play;
        let mut sim = playing_match(seed);
        let before_hand = sim.hand(side).to_vec();
        let before_elixir = sim.elixir(side);
        let outcome = sim.play_card(side, "not_a_card", position);
        prop_assert!(!outcome.is_accepted());
        prop_assert_eq!(sim.hand(side), before_hand.as_slice());
        prop_assert_eq!(sim.elixir(side), before_elixir);
    }
}
