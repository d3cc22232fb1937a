//! Headless match runner for AI testing and CI verification.
//!
//! Plays lane-combat matches without any rendering:
//!
//! - **AI testing**: two built-in AIs play seeded matches to completion
//! - **Balance batches**: many seeds in parallel, aggregated into JSON
//! - **Replay verification**: re-run a recorded match and compare hashes
//!
//! # Output
//!
//! - **stdout**: JSON (snapshot lines, reports, summaries)
//! - **stderr**: logs (human-readable)
//!
//! # Example
//!
//! ```bash
//! # One AI-vs-AI match with a snapshot every second of game time
//! cargo run -p lane_headless -- run --seed 7 --player hard --snapshots 10
//!
//! # Balance batch
//! cargo run -p lane_headless -- batch --count 200 --output results/
//!
//! # Verify a recorded replay
//! cargo run -p lane_headless -- replay --file match.replay --verify
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod runner;

pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults, BatchSummary};
pub use runner::{
    run_match, MatchReport, MatchSetup, RunOptions, RunnerError, RunnerResult, SideControl,
};
