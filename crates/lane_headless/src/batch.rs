//! Batch match runner for balance testing.
//!
//! Runs many seeded matches in parallel using rayon and aggregates the
//! outcomes. Each match owns its simulation, so workers share nothing but
//! the progress counter.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::runner::{run_match, MatchReport, MatchSetup, RunOptions, RunnerError, RunnerResult};

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of matches to run.
    pub game_count: u32,
    /// Maximum parallel matches (0 = use rayon default).
    pub parallel_games: u32,
    /// Seed of the first match; match `i` uses `seed_start + i`.
    pub seed_start: u64,
    /// Directory for `batch_results.json` and replays.
    pub output_dir: PathBuf,
    /// Also save one replay per match.
    pub save_replays: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            game_count: 100,
            parallel_games: 0,
            seed_start: 0,
            output_dir: PathBuf::from("results"),
            save_replays: false,
        }
    }
}

impl BatchConfig {
    /// Config for `game_count` matches.
    pub fn new(game_count: u32) -> Self {
        Self {
            game_count,
            ..Default::default()
        }
    }

    /// Set output directory
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }
}

/// Error during a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Match index.
    pub game_index: u32,
    /// Seed used.
    pub seed: u64,
    /// Error message.
    pub message: String,
}

/// Aggregate outcome counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Matches that produced a report.
    pub total_games: u32,
    /// Wins for the bottom side.
    pub player_wins: u32,
    /// Wins for the top side.
    pub opponent_wins: u32,
    /// Drawn matches.
    pub draws: u32,
    /// Matches stopped by the tick limit.
    pub unfinished: u32,
    /// Matches that reached overtime.
    pub overtime_games: u32,
    /// Matches decided by a king kill.
    pub king_kills: u32,
    /// Mean match length in ticks.
    pub average_ticks: f64,
    /// Total plays per card id across both sides.
    pub card_plays: BTreeMap<String, u32>,
}

impl BatchSummary {
    /// Aggregate a set of reports.
    pub fn from_games(games: &[MatchReport]) -> Self {
        let mut summary = Self {
            total_games: u32::try_from(games.len()).unwrap_or(u32::MAX),
            ..Self::default()
        };
        let mut ticks = 0u64;
        for game in games {
            ticks += game.ticks;
            match game.outcome() {
                "player" => summary.player_wins += 1,
                "opponent" => summary.opponent_wins += 1,
                "draw" => summary.draws += 1,
                _ => summary.unfinished += 1,
            }
            if let Some(result) = &game.result {
                summary.overtime_games += u32::from(result.overtime);
                summary.king_kills += u32::from(result.king_destroyed);
            }
            for stats in [&game.sides.player, &game.sides.opponent] {
                for (card, count) in &stats.cards {
                    *summary.card_plays.entry(card.clone()).or_insert(0) += count;
                }
            }
        }
        if !games.is_empty() {
            summary.average_ticks = ticks as f64 / games.len() as f64;
        }
        summary
    }

    /// Fraction of reported matches the player side won.
    pub fn player_win_rate(&self) -> f64 {
        if self.total_games == 0 {
            return 0.0;
        }
        f64::from(self.player_wins) / f64::from(self.total_games)
    }
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Per-match reports, in seed order.
    pub games: Vec<MatchReport>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Wall-clock runtime.
    pub duration_seconds: f64,
    /// Matches that failed to run.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to a JSON file, creating parent directories.
    ///
    /// # Errors
    /// Returns an error if encoding or writing fails.
    pub fn save(&self, path: &Path) -> RunnerResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| RunnerError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        crate::runner::write_json(self, path)
    }

    /// Load results from a JSON file.
    ///
    /// # Errors
    /// Returns an error if reading or decoding fails.
    pub fn load(path: &Path) -> RunnerResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| RunnerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}

fn run_one(setup: &MatchSetup, config: &BatchConfig, seed: u64) -> RunnerResult<MatchReport> {
    let (report, replay) = run_match(setup, seed, RunOptions::default(), &mut std::io::sink())?;
    if config.save_replays {
        let path = config
            .output_dir
            .join("replays")
            .join(format!("match_{seed}.replay"));
        crate::runner::save_replay(&replay, &path)?;
    }
    Ok(report)
}

/// Run a batch of matches.
pub fn run_batch(setup: &MatchSetup, config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    let completed = AtomicU32::new(0);

    info!(games = config.game_count, seed = config.seed_start, "Starting batch run");

    if config.parallel_games > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let results: Vec<Result<MatchReport, BatchError>> = (0..config.game_count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            match run_one(setup, &config, seed) {
                Ok(report) => {
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if done % 10 == 0 {
                        debug!("Progress: {}/{}", done, config.game_count);
                    }
                    Ok(report)
                }
                Err(e) => {
                    warn!("Match {} failed: {}", i, e);
                    Err(BatchError {
                        game_index: i,
                        seed,
                        message: e.to_string(),
                    })
                }
            }
        })
        .collect();

    let (games, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let games: Vec<MatchReport> = games.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} matches in {:.1}s ({:.1} matches/sec)",
        games.len(),
        duration_seconds,
        games.len() as f64 / duration_seconds.max(f64::EPSILON)
    );

    BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Run the same seed `runs` times and return the shared final hash.
///
/// # Errors
/// Returns [`RunnerError::NonDeterministic`] if any run disagrees.
pub fn verify_determinism(setup: &MatchSetup, seed: u64, runs: u32) -> RunnerResult<u64> {
    let hashes: Vec<u64> = (0..runs.max(1))
        .into_par_iter()
        .map(|_| -> RunnerResult<u64> {
            let mut sim = setup.simulation(seed)?;
            while !sim.is_over() && sim.tick_count() < setup.max_ticks {
                sim.tick(setup.frame);
            }
            Ok(sim.state_hash())
        })
        .collect::<RunnerResult<_>>()?;

    let mut unique = hashes.clone();
    unique.sort_unstable();
    unique.dedup();
    if unique.len() != 1 {
        return Err(RunnerError::NonDeterministic {
            seed,
            runs,
            unique: unique.len(),
        });
    }
    info!(seed, runs, hash = unique[0], "Determinism verified");
    Ok(unique[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_core::ai::Difficulty;
    use lane_core::math::Fixed;

    fn short_setup() -> MatchSetup {
        let mut setup = MatchSetup::with_ai(Some(Difficulty::Medium), Some(Difficulty::Medium));
        setup.config.countdown_steps = 0;
        setup.config.regulation_seconds = Fixed::from_num(20);
        setup.config.overtime_seconds = Fixed::from_num(5);
        setup
    }

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new(500)
            .with_output(PathBuf::from("/tmp/results"))
            .with_seed(12345);

        assert_eq!(config.game_count, 500);
        assert_eq!(config.seed_start, 12345);
        assert!(!config.save_replays);
    }

    #[test]
    fn test_run_batch_small() {
        let results = run_batch(&short_setup(), BatchConfig::new(6));

        assert_eq!(results.games.len(), 6);
        assert!(results.errors.is_empty());
        assert_eq!(results.summary.total_games, 6);
        let s = &results.summary;
        assert_eq!(s.player_wins + s.opponent_wins + s.draws + s.unfinished, 6);
        let seeds: Vec<u64> = results.games.iter().map(|g| g.seed).collect();
        assert_eq!(seeds, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_summary_of_nothing() {
        let summary = BatchSummary::from_games(&[]);
        assert_eq!(summary.total_games, 0);
        assert_eq!(summary.player_win_rate(), 0.0);
    }

    #[test]
    fn test_verify_determinism() {
        let hash = verify_determinism(&short_setup(), 12345, 3).unwrap();
        let again = verify_determinism(&short_setup(), 12345, 2).unwrap();
        assert_eq!(hash, again);
    }

    #[test]
    fn test_batch_results_save_load() {
        let results = run_batch(&short_setup(), BatchConfig::new(3).with_seed(40));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("results.json");

        results.save(&path).unwrap();
        assert!(path.exists());

        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.games.len(), 3);
        assert_eq!(loaded.config.seed_start, 40);
        assert_eq!(loaded.summary.total_games, results.summary.total_games);
        assert_eq!(loaded.summary.card_plays, results.summary.card_plays);
    }
}
