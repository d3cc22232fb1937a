//! Headless lane-combat match runner.
//!
//! # Usage
//!
//! ```bash
//! # Run a single AI-vs-AI match and print its report
//! cargo run -p lane_headless -- run --seed 42
//!
//! # Run a balance batch
//! cargo run -p lane_headless -- batch --count 1000 --output results/
//!
//! # Check that a seed reproduces
//! cargo run -p lane_headless -- verify --seed 12345 --runs 5
//!
//! # Re-run a replay and compare its final hash
//! cargo run -p lane_headless -- replay --file results/match.replay --verify
//!
//! # Dump the built-in card catalog as RON
//! cargo run -p lane_headless -- catalog
//! ```
//!
//! Logs go to stderr (`RUST_LOG` or `--verbose`); stdout carries JSON.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lane_core::config::MatchConfig;
use lane_core::data::CardCatalog;
use lane_core::replay::{Replay, ReplayPlayer};
use lane_core::snapshot::MatchResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lane_headless::batch::{run_batch, verify_determinism, BatchConfig};
use lane_headless::runner::{
    run_match, save_replay, MatchSetup, RunOptions, RunnerError, RunnerResult, SideControl,
};

#[derive(Parser)]
#[command(name = "lane_headless")]
#[command(about = "Headless lane-combat match runner for AI testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that starts matches.
#[derive(clap::Args, Clone)]
struct SetupArgs {
    /// Player (bottom) controller: easy, medium, hard or none
    #[arg(long, default_value = "medium")]
    player: SideControl,

    /// Opponent (top) controller: easy, medium, hard or none
    #[arg(long, default_value = "medium")]
    opponent: SideControl,

    /// Match config RON file (built-in defaults otherwise)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Card catalog RON file (built-in catalog otherwise)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Stop matches after this many ticks
    #[arg(long, default_value = "10000")]
    max_ticks: u64,
}

impl SetupArgs {
    fn build(&self) -> RunnerResult<MatchSetup> {
        let mut setup = MatchSetup::with_ai(self.player.0, self.opponent.0);
        setup.max_ticks = self.max_ticks;
        setup.load_data(self.config.as_deref(), self.catalog.as_deref())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single match and print its report as JSON
    Run {
        #[command(flatten)]
        setup: SetupArgs,

        /// Match seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Print a snapshot line every N ticks
        #[arg(long)]
        snapshots: Option<u64>,

        /// Save the replay to this file
        #[arg(long)]
        replay_out: Option<PathBuf>,
    },

    /// Run a batch of matches for balance testing
    Batch {
        #[command(flatten)]
        setup: SetupArgs,

        /// Number of matches to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel matches (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Starting seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Save a replay per match under <output>/replays
        #[arg(long)]
        replays: bool,
    },

    /// Verify determinism by running the same seed multiple times
    Verify {
        #[command(flatten)]
        setup: SetupArgs,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },

    /// Replay a recorded match
    Replay {
        /// Replay file path
        #[arg(short, long)]
        file: PathBuf,

        /// Verify the replay reproduces its recorded hash
        #[arg(long)]
        verify: bool,

        /// Print a snapshot line every N ticks while replaying
        #[arg(long)]
        snapshots: Option<u64>,
    },

    /// Print the built-in card catalog (or match config) as RON
    Catalog {
        /// Print the default match config instead
        #[arg(long)]
        config: bool,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs to stderr; stdout is for JSON
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(true),
        )
        .init();

    let outcome = match cli.command {
        Commands::Run {
            setup,
            seed,
            snapshots,
            replay_out,
        } => cmd_run(&setup, seed, snapshots, replay_out.as_deref()),
        Commands::Batch {
            setup,
            count,
            parallel,
            output,
            seed,
            replays,
        } => cmd_batch(&setup, count, parallel, output, seed, replays),
        Commands::Verify { setup, seed, runs } => cmd_verify(&setup, seed, runs),
        Commands::Replay {
            file,
            verify,
            snapshots,
        } => cmd_replay(&file, verify, snapshots),
        Commands::Catalog { config, output } => cmd_catalog(config, output.as_deref()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("FATAL: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Run a single match
fn cmd_run(
    args: &SetupArgs,
    seed: u64,
    snapshots: Option<u64>,
    replay_out: Option<&Path>,
) -> RunnerResult<()> {
    let setup = args.build()?;
    tracing::info!(seed, player = ?args.player.0, opponent = ?args.opponent.0, "Starting match");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let options = RunOptions {
        snapshot_every: snapshots,
    };
    let (report, replay) = run_match(&setup, seed, options, &mut out)?;

    if let Some(path) = replay_out {
        save_replay(&replay, path)?;
    }

    serde_json::to_writer_pretty(&mut out, &report)?;
    writeln!(out)?;
    tracing::info!(
        outcome = report.outcome(),
        ticks = report.ticks,
        hash = report.final_hash,
        "Match complete"
    );
    Ok(())
}

/// Run a batch of matches
fn cmd_batch(
    args: &SetupArgs,
    count: u32,
    parallel: u32,
    output: PathBuf,
    seed: u64,
    replays: bool,
) -> RunnerResult<()> {
    let setup = args.build()?;
    let config = BatchConfig {
        game_count: count,
        parallel_games: parallel,
        seed_start: seed,
        output_dir: output.clone(),
        save_replays: replays,
    };

    let results = run_batch(&setup, config);
    let results_path = output.join("batch_results.json");
    results.save(&results_path)?;

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Matches played: {}", summary.total_games);
    if !results.errors.is_empty() {
        eprintln!("Matches failed: {}", results.errors.len());
    }
    eprintln!(
        "Player {} / Opponent {} / Draw {} / Unfinished {}",
        summary.player_wins, summary.opponent_wins, summary.draws, summary.unfinished
    );
    eprintln!("Player win rate: {:.1}%", summary.player_win_rate() * 100.0);
    eprintln!("Overtime: {}  King kills: {}", summary.overtime_games, summary.king_kills);
    eprintln!("Average length: {:.0} ticks", summary.average_ticks);
    eprintln!("Results: {}", results_path.display());

    serde_json::to_writer_pretty(io::stdout().lock(), summary)?;
    println!();
    Ok(())
}

/// Verify that a seed reproduces
fn cmd_verify(args: &SetupArgs, seed: u64, runs: u32) -> RunnerResult<()> {
    let setup = args.build()?;
    let hash = verify_determinism(&setup, seed, runs)?;
    println!("{}", serde_json::json!({ "seed": seed, "runs": runs, "hash": hash }));
    Ok(())
}

/// Replay a recorded match
fn cmd_replay(file: &Path, verify: bool, snapshots: Option<u64>) -> RunnerResult<()> {
    let replay = Replay::load(file)?;
    tracing::info!(
        path = %file.display(),
        frames = replay.frame_count(),
        seed = replay.seed,
        "Loaded replay"
    );

    let sim = if verify {
        replay.verify()?
    } else {
        let every = snapshots.filter(|n| *n > 0);
        let stdout = io::stdout();
        let mut out = stdout.lock();
        let mut player = ReplayPlayer::new(replay.clone())?;
        while player.advance().is_some() {
            let sim = player.simulation();
            if every.is_some_and(|n| sim.tick_count() % n == 0) {
                serde_json::to_writer(&mut out, &sim.snapshot())?;
                writeln!(out)?;
            }
        }
        player.into_simulation()
    };

    let result: Option<MatchResult> = sim.result();
    println!(
        "{}",
        serde_json::json!({
            "verified": verify,
            "tick": sim.tick_count(),
            "hash": sim.state_hash(),
            "expected_hash": replay.final_hash,
            "result": result,
        })
    );
    Ok(())
}

/// Dump built-in data as RON
fn cmd_catalog(config: bool, output: Option<&Path>) -> RunnerResult<()> {
    let text = if config {
        MatchConfig::default().to_ron_string()?
    } else {
        CardCatalog::default_catalog().to_ron_string()?
    };
    match output {
        Some(path) => {
            std::fs::write(path, text).map_err(|source| RunnerError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            tracing::info!(path = %path.display(), "Wrote RON data");
        }
        None => println!("{text}"),
    }
    Ok(())
}
