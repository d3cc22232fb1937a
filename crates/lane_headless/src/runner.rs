//! Single-match runner.
//!
//! Loads a [`MatchSetup`] (config, catalog and AI difficulties), plays one
//! seeded match to the end while recording a [`Replay`], and summarises it
//! as a [`MatchReport`].

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use lane_core::ai::{AiBranch, Difficulty};
use lane_core::combat::Death;
use lane_core::config::MatchConfig;
use lane_core::data::CardCatalog;
use lane_core::error::GameError;
use lane_core::factions::{PerSide, Side};
use lane_core::math::{fixed_decimal, Fixed};
use lane_core::replay::{Replay, ReplayRecorder};
use lane_core::simulation::Simulation;
use lane_core::snapshot::MatchResult;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Errors surfaced by the headless tools.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The simulation core rejected data, config or a replay.
    #[error(transparent)]
    Game(#[from] GameError),

    /// Reading or writing an output file failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Writing to stdout failed.
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    /// JSON encoding failed.
    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Determinism verification found differing runs.
    #[error("Seed {seed} is non-deterministic: {unique} distinct final hashes over {runs} runs")]
    NonDeterministic {
        /// Seed under test.
        seed: u64,
        /// Runs performed.
        runs: u32,
        /// Distinct hashes seen.
        unique: usize,
    },
}

/// Result alias for the headless crate.
pub type RunnerResult<T> = std::result::Result<T, RunnerError>;

/// Controller of one side: a built-in AI tier, or nobody.
///
/// Parses from `easy`, `medium`, `hard` or `none`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideControl(pub Option<Difficulty>);

impl FromStr for SideControl {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("none") {
            return Ok(Self(None));
        }
        s.parse().map(|difficulty| Self(Some(difficulty)))
    }
}

/// Everything a match needs besides its seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSetup {
    /// Match tunables.
    pub config: MatchConfig,
    /// Card definitions.
    pub catalog: CardCatalog,
    /// AI controlling each side.
    pub difficulties: PerSide<Option<Difficulty>>,
    /// Seconds per frame.
    #[serde(with = "fixed_decimal")]
    pub frame: Fixed,
    /// Hard stop for matches that never end.
    pub max_ticks: u64,
}

impl Default for MatchSetup {
    fn default() -> Self {
        Self {
            config: MatchConfig::default(),
            catalog: CardCatalog::default_catalog(),
            difficulties: PerSide::splat(Some(Difficulty::Medium)),
            frame: Fixed::from_num(0.1),
            max_ticks: 10_000,
        }
    }
}

impl MatchSetup {
    /// Default setup with the given AI tiers.
    #[must_use]
    pub fn with_ai(player: Option<Difficulty>, opponent: Option<Difficulty>) -> Self {
        Self {
            difficulties: PerSide::new(player, opponent),
            ..Self::default()
        }
    }

    /// Replace the built-in config and catalog with RON files where given.
    ///
    /// # Errors
    /// Returns an error if a file cannot be read, parsed or validated.
    pub fn load_data(
        mut self,
        config: Option<&Path>,
        catalog: Option<&Path>,
    ) -> RunnerResult<Self> {
        if let Some(path) = catalog {
            self.catalog = CardCatalog::load(path)?;
            info!(path = %path.display(), cards = self.catalog.len(), "Loaded card catalog");
        }
        if let Some(path) = config {
            self.config = MatchConfig::load(path)?;
            info!(path = %path.display(), "Loaded match config");
        }
        self.config.validate(&self.catalog)?;
        Ok(self)
    }

    /// Fresh simulation for `seed`.
    ///
    /// # Errors
    /// Returns an error if the config does not validate against the catalog.
    pub fn simulation(&self, seed: u64) -> RunnerResult<Simulation> {
        let mut sim = Simulation::new(self.config.clone(), self.catalog.clone(), seed)?;
        for side in Side::BOTH {
            sim.set_ai(side, *self.difficulties.get(side));
        }
        Ok(sim)
    }
}

/// Per-side play counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideStats {
    /// Cards played.
    pub plays: u32,
    /// Elixir spent.
    pub elixir_spent: u32,
    /// Plays per card id.
    pub cards: BTreeMap<String, u32>,
    /// AI decisions per branch name.
    pub branches: BTreeMap<String, u32>,
    /// Enemy units destroyed.
    pub kills: u32,
}

/// Summary of one finished (or abandoned) match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    /// Match seed.
    pub seed: u64,
    /// Ticks simulated.
    pub ticks: u64,
    /// Simulated seconds of play.
    pub clock_seconds: f64,
    /// Final result; `None` if `max_ticks` was hit first.
    pub result: Option<MatchResult>,
    /// Per-side counters.
    pub sides: PerSide<SideStats>,
    /// Final state hash.
    pub final_hash: u64,
}

impl MatchReport {
    /// Winner label for summaries: `player`, `opponent`, `draw` or `unfinished`.
    #[must_use]
    pub fn outcome(&self) -> &'static str {
        match &self.result {
            Some(result) => match result.winner {
                Some(Side::Player) => "player",
                Some(Side::Opponent) => "opponent",
                None => "draw",
            },
            None => "unfinished",
        }
    }
}

/// Knobs for [`run_match`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Emit a JSON snapshot line every this many ticks.
    pub snapshot_every: Option<u64>,
}

fn branch_name(branch: AiBranch) -> &'static str {
    match branch {
        AiBranch::Defensive => "defensive",
        AiBranch::Offensive => "offensive",
        AiBranch::Overflow => "overflow",
    }
}

/// Play one match to completion, recording it.
///
/// Snapshots, when requested, are written to `out` as JSON lines.
///
/// # Errors
/// Returns an error if the setup is invalid or `out` cannot be written.
pub fn run_match<W: Write>(
    setup: &MatchSetup,
    seed: u64,
    options: RunOptions,
    out: &mut W,
) -> RunnerResult<(MatchReport, Replay)> {
    let mut recorder = ReplayRecorder::new(
        setup.config.clone(),
        setup.catalog.clone(),
        seed,
        setup.difficulties,
    )?;
    let mut sides: PerSide<SideStats> = PerSide::default();

    while !recorder.simulation().is_over() && recorder.simulation().tick_count() < setup.max_ticks {
        let events = recorder.tick(setup.frame);

        for play in &events.plays {
            let stats = sides.get_mut(play.side);
            stats.plays += 1;
            stats.elixir_spent += setup.catalog.get(&play.card_id).map_or(0, |c| c.cost);
            *stats.cards.entry(play.card_id.clone()).or_insert(0) += 1;
            if let Some(branch) = play.branch {
                *stats.branches.entry(branch_name(branch).to_string()).or_insert(0) += 1;
            }
        }
        for death in &events.deaths {
            if let Death::Unit { side, .. } = death {
                sides.get_mut(side.opponent()).kills += 1;
            }
        }

        let tick = recorder.simulation().tick_count();
        if let Some(every) = options.snapshot_every.filter(|n| *n > 0) {
            if tick % every == 0 || recorder.simulation().is_over() {
                serde_json::to_writer(&mut *out, &recorder.simulation().snapshot())?;
                writeln!(out)?;
            }
        }
    }

    let (replay, sim) = recorder.finish();
    let report = MatchReport {
        seed,
        ticks: sim.tick_count(),
        clock_seconds: sim.clock().to_num(),
        result: sim.result(),
        sides,
        final_hash: sim.state_hash(),
    };
    debug!(seed, ticks = report.ticks, outcome = report.outcome(), "Match finished");
    Ok((report, replay))
}

/// Save a replay, wrapping failures with the path.
///
/// # Errors
/// Returns an error if the replay cannot be encoded or written.
pub fn save_replay(replay: &Replay, path: &Path) -> RunnerResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| RunnerError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    replay.save(path)?;
    Ok(())
}

/// Write any serializable value as pretty JSON to `path`.
///
/// # Errors
/// Returns an error if encoding or writing fails.
pub fn write_json<T: Serialize>(value: &T, path: &Path) -> RunnerResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).map_err(|source| RunnerError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_setup() -> MatchSetup {
        let mut setup = MatchSetup::with_ai(Some(Difficulty::Hard), Some(Difficulty::Easy));
        setup.config.countdown_steps = 0;
        setup.config.regulation_seconds = Fixed::from_num(30);
        setup.config.overtime_seconds = Fixed::from_num(10);
        setup
    }

    #[test]
    fn test_side_control_parsing() {
        assert_eq!("none".parse::<SideControl>().unwrap(), SideControl(None));
        assert_eq!(
            "Hard".parse::<SideControl>().unwrap(),
            SideControl(Some(Difficulty::Hard))
        );
        assert!("brutal".parse::<SideControl>().is_err());
    }

    #[test]
    fn test_run_match_finishes_and_counts_plays() {
        let (report, replay) = run_match(&quick_setup(), 3, RunOptions::default(), &mut Vec::new())
            .unwrap();
        assert!(report.result.is_some());
        assert!(report.sides.player.plays > 0);
        assert_eq!(replay.final_hash, report.final_hash);
        assert_eq!(replay.frame_count() as u64, report.ticks);
    }

    #[test]
    fn test_snapshots_are_json_lines() {
        let mut out = Vec::new();
        let options = RunOptions {
            snapshot_every: Some(50),
        };
        let (report, _) = run_match(&quick_setup(), 4, options, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines.len() as u64 >= report.ticks / 50);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value.get("tick").is_some());
        }
    }

    #[test]
    fn test_max_ticks_leaves_match_unfinished() {
        let mut setup = quick_setup();
        setup.max_ticks = 20;
        let (report, _) = run_match(&setup, 5, RunOptions::default(), &mut std::io::sink()).unwrap();
        assert_eq!(report.ticks, 20);
        assert_eq!(report.outcome(), "unfinished");
    }
}
