//! End-to-end match scenarios driven through the public controller API.

use lane_core::ai::{AiBranch, Difficulty};
use lane_core::combat::Death;
use lane_core::components::{Entity, Structure, StructureKind};
use lane_core::config::MatchConfig;
use lane_core::data::CardCatalog;
use lane_core::factions::{PerSide, Side};
use lane_core::math::Fixed;
use lane_core::simulation::{MatchPhase, PlayOutcome, RejectReason, Simulation};
use lane_test_utils::fixtures::{
    ai_match, catalog_with, fixed, frame, place_unit, playing_match, pos, quick_config,
    run_frames, simple_troop, structure_at,
};

fn deck(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| (*id).to_string()).collect()
}

/// Make sure `card` is in `side`'s hand by cycling the other cards through.
fn bring_to_hand(sim: &mut Simulation, side: Side, card: &str) {
    for _ in 0..8 {
        if sim.deck(side).in_hand(card) {
            return;
        }
        let other = sim
            .hand(side)
            .iter()
            .find(|held| held.as_str() != card)
            .cloned()
            .expect("hand has another card");
        sim.set_elixir(side, fixed(10));
        let at = if side == Side::Player { pos(200, 600) } else { pos(200, 40) };
        assert!(sim.play_card(side, &other, at).is_accepted());
    }
    panic!("{card} never reached the hand");
}

#[test]
fn cost_six_card_spends_and_refills() {
    let catalog = catalog_with(vec![simple_troop("champion", 6, 1200, 150)]);
    let mut config = quick_config();
    config.decks = PerSide::new(
        deck(&["champion", "knight", "archers", "zap", "giant"]),
        config.decks.opponent.clone(),
    );
    let mut sim = Simulation::new(config, catalog, 5).expect("valid");
    bring_to_hand(&mut sim, Side::Player, "champion");

    sim.set_elixir(Side::Player, fixed(10));
    let outcome = sim.play_card(Side::Player, "champion", pos(88, 450));
    assert!(outcome.is_accepted());
    assert_eq!(sim.elixir(Side::Player), fixed(4));
    assert_eq!(sim.hand(Side::Player).len(), 4);
    assert!(!sim.deck(Side::Player).in_hand("champion"));
}

#[test]
fn unaffordable_play_changes_nothing() {
    let mut sim = playing_match(8);
    sim.set_elixir(Side::Player, fixed(1));
    let hand = sim.hand(Side::Player).to_vec();
    let card = hand
        .iter()
        .find(|c| sim.catalog().get(c).is_some_and(|d| d.cost > 1))
        .cloned()
        .expect("a card costing more than 1");
    let entities = sim.store().len();
    let outcome = sim.play_card(Side::Player, &card, pos(88, 450));
    assert!(matches!(
        outcome,
        PlayOutcome::Rejected(RejectReason::InsufficientElixir { available: 1, .. })
    ));
    assert_eq!(sim.hand(Side::Player), hand.as_slice());
    assert_eq!(sim.store().len(), entities);
    assert_eq!(sim.elixir(Side::Player), fixed(1));
}

#[test]
fn shield_absorbs_first_then_unit_dies() {
    let mut bearer = simple_troop("bearer", 2, 50, 0);
    bearer.traits.shield = 30;
    let catalog = catalog_with(vec![bearer, simple_troop("hammer", 3, 500, 80)]);
    let mut sim = Simulation::new(quick_config(), catalog, 2).expect("valid");

    let target = place_unit(&mut sim, "bearer", Side::Player, pos(200, 390));
    let attacker = place_unit(&mut sim, "hammer", Side::Opponent, pos(200, 370));

    let events = sim.tick(frame());
    let hit = events
        .damage
        .iter()
        .find(|event| event.target == target && event.source == Some(attacker))
        .expect("hammer hit the bearer");
    assert_eq!(hit.shield_absorbed, 30);
    assert_eq!(hit.health_lost, 50);
    assert!(events
        .deaths
        .iter()
        .any(|death| matches!(death, Death::Unit { id, .. } if *id == target)));
    assert!(sim.store().get(target).is_none());
}

#[test]
fn king_is_not_targeted_while_a_tower_stands() {
    let mut sim = playing_match(11);
    let king = structure_at(&sim, pos(200, 48));
    let giant = place_unit(&mut sim, "giant", Side::Player, pos(200, 120));
    for _ in 0..20 {
        sim.tick(frame());
        if let Some(unit) = sim.store().unit(giant) {
            assert_ne!(unit.target, Some(king));
        }
    }
}

#[test]
fn king_destruction_ends_match_with_three_crowns() {
    let mut sim = playing_match(12);
    let king = structure_at(&sim, pos(200, 48));
    if let Some(structure) = sim.store_mut().structure_mut(king) {
        structure.health.current = 0;
    }
    let events = sim.tick(frame());
    assert_eq!(sim.phase(), MatchPhase::Ended);
    assert_eq!(sim.crowns(Side::Player), 3);
    assert_eq!(sim.winner(), Some(Side::Player));
    assert!(events.phase_changes.iter().any(|c| c.to == MatchPhase::Ended));

    let result = sim.result().expect("ended");
    assert!(result.king_destroyed);
    assert!(!result.overtime);

    let hash = sim.state_hash();
    sim.tick(frame());
    assert_eq!(sim.state_hash(), hash, "ticks after the end are no-ops");
}

#[test]
fn tied_regulation_goes_to_overtime_with_faster_regen() {
    let config = MatchConfig {
        regulation_seconds: fixed(2),
        ..quick_config()
    };
    let mut sim = Simulation::new(config, CardCatalog::default_catalog(), 13).expect("valid");
    for slot in [pos(88, 512), pos(88, 128)] {
        let id = structure_at(&sim, slot);
        if let Some(structure) = sim.store_mut().structure_mut(id) {
            structure.health.current = 0;
        }
    }
    let events = sim.tick(frame());
    assert_eq!(events.crowns.len(), 2);
    assert_eq!(sim.crowns(Side::Player), 1);
    assert_eq!(sim.crowns(Side::Opponent), 1);

    let mut entered = false;
    for _ in 0..30 {
        let events = sim.tick(frame());
        if events.phase_changes.iter().any(|c| c.to == MatchPhase::Overtime) {
            entered = true;
            break;
        }
    }
    assert!(entered);
    assert_eq!(sim.phase(), MatchPhase::Overtime);
    let economy = sim.economy(Side::Player);
    assert!(economy.regen_rate(true) > economy.regen_rate(false));

    sim.set_elixir(Side::Player, Fixed::ZERO);
    run_frames(&mut sim, 10);
    assert!(sim.elixir(Side::Player) > fixed(1) / fixed(2));

    // Sudden death: the next crown ends it.
    let tower = structure_at(&sim, pos(312, 128));
    if let Some(structure) = sim.store_mut().structure_mut(tower) {
        structure.health.current = 0;
    }
    sim.tick(frame());
    assert_eq!(sim.phase(), MatchPhase::Ended);
    assert_eq!(sim.winner(), Some(Side::Player));
    assert!(sim.result().is_some_and(|r| r.overtime));
}

#[test]
fn regulation_leader_wins_without_overtime() {
    let config = MatchConfig {
        regulation_seconds: fixed(1),
        ..quick_config()
    };
    let mut sim = Simulation::new(config, CardCatalog::default_catalog(), 14).expect("valid");
    let tower = structure_at(&sim, pos(88, 512));
    if let Some(structure) = sim.store_mut().structure_mut(tower) {
        structure.health.current = 0;
    }
    run_frames(&mut sim, 15);
    assert_eq!(sim.phase(), MatchPhase::Ended);
    assert_eq!(sim.winner(), Some(Side::Opponent));
}

#[test]
fn overtime_expiry_on_equal_crowns_is_a_draw() {
    let config = MatchConfig {
        regulation_seconds: fixed(1),
        overtime_seconds: fixed(1),
        ..quick_config()
    };
    let mut sim = Simulation::new(config, CardCatalog::default_catalog(), 15).expect("valid");
    run_frames(&mut sim, 25);
    assert_eq!(sim.phase(), MatchPhase::Ended);
    let result = sim.result().expect("ended");
    assert!(result.is_draw());
    assert_eq!(result.crowns, PerSide::new(0, 0));
}

#[test]
fn hard_ai_answers_a_threatened_lane() {
    let mut sim = ai_match(16, None, Some(Difficulty::Hard));
    place_unit(&mut sim, "knight", Side::Player, pos(300, 250));
    place_unit(&mut sim, "knight", Side::Player, pos(310, 260));

    let mut defended = false;
    for _ in 0..15 {
        let events = sim.tick(frame());
        if events
            .plays
            .iter()
            .any(|p| p.side == Side::Opponent && p.branch == Some(AiBranch::Defensive))
        {
            defended = true;
            break;
        }
    }
    assert!(defended, "hard AI defends within one decision cycle");
}

#[test]
fn spawner_produces_troops_and_buildings_expire() {
    let mut sim = playing_match(17);
    let (hut, cannon) = {
        let catalog = sim.catalog();
        let hut = Structure::building(
            catalog.get("goblin_hut").expect("hut"),
            Side::Player,
            pos(200, 560),
        );
        let cannon = Structure::building(
            catalog.get("cannon").expect("cannon"),
            Side::Player,
            pos(120, 560),
        );
        (hut, cannon)
    };
    sim.store_mut().insert(Entity::Structure(hut));
    let cannon = sim.store_mut().insert(Entity::Structure(cannon));

    let mut spawned = Vec::new();
    let mut expired = Vec::new();
    for _ in 0..310 {
        let events = sim.tick(frame());
        spawned.extend(events.spawned);
        expired.extend(events.expired);
    }
    assert!(spawned.len() >= 5, "one spawn every five seconds");
    assert!(expired.contains(&cannon));
    assert!(sim.store().get(cannon).is_none());
}

#[test]
fn destroyed_buildings_award_no_crown() {
    let mut sim = playing_match(18);
    let cannon = {
        let card = sim.catalog().get("cannon").expect("cannon").clone();
        Structure::building(&card, Side::Opponent, pos(200, 200))
    };
    let id = sim.store_mut().insert(Entity::Structure(cannon));
    if let Some(structure) = sim.store_mut().structure_mut(id) {
        structure.health.current = 0;
    }
    let events = sim.tick(frame());
    assert!(events.deaths.iter().any(|d| matches!(
        d,
        Death::Structure { kind: StructureKind::Building, .. }
    )));
    assert!(events.crowns.is_empty());
    assert_eq!(sim.crowns(Side::Player), 0);
}

#[test]
fn ai_vs_ai_match_finishes() {
    let mut sim = ai_match(19, Some(Difficulty::Hard), Some(Difficulty::Easy));
    let mut plays = 0;
    for _ in 0..2_500 {
        plays += sim.tick(frame()).plays.len();
        if sim.is_over() {
            break;
        }
    }
    assert!(plays > 10);
    assert!(sim.is_over(), "regulation plus overtime fits in 2500 frames");
}
