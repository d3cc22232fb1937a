//! Simulation benchmarks for lane_core.
//!
//! Run with: `cargo bench -p lane_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use lane_core::ai::Difficulty;
use lane_core::config::MatchConfig;
use lane_core::data::CardCatalog;
use lane_core::factions::Side;
use lane_core::math::Fixed;
use lane_core::simulation::Simulation;

fn ai_match(seed: u64) -> Simulation {
    let config = MatchConfig {
        countdown_steps: 0,
        ..MatchConfig::default()
    };
    let mut sim = Simulation::new(config, CardCatalog::default_catalog(), seed)
        .expect("default config is valid");
    sim.set_ai(Side::Player, Some(Difficulty::Hard));
    sim.set_ai(Side::Opponent, Some(Difficulty::Medium));
    sim
}

/// Ticks of a busy mid-match board and a full AI-vs-AI match.
pub fn simulation_benchmark(c: &mut Criterion) {
    let dt = Fixed::from_num(0.1);

    let mut warm = ai_match(7);
    for _ in 0..600 {
        warm.tick(dt);
    }
    c.bench_function("tick_mid_match", |b| {
        b.iter_batched(
            || warm.clone(),
            |mut sim| {
                black_box(sim.tick(dt));
            },
            BatchSize::SmallInput,
        );
    });

    c.bench_function("state_hash", |b| b.iter(|| black_box(warm.state_hash())));

    let mut group = c.benchmark_group("full_match");
    group.sample_size(10);
    group.bench_function("ai_vs_ai", |b| {
        b.iter(|| {
            let mut sim = ai_match(black_box(11));
            while !sim.is_over() {
                sim.tick(dt);
            }
            black_box(sim.result())
        });
    });
    group.finish();
}

criterion_group!(benches, simulation_benchmark);
criterion_main!(benches);
