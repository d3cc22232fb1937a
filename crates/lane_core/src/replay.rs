//! Replay recording and verification.
//!
//! A replay stores everything a match is a function of: seed, config,
//! catalog, AI difficulties, every frame delta and every accepted human play.
//! Re-running those inputs must reproduce the recorded final state hash.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ai::Difficulty;
use crate::config::MatchConfig;
use crate::data::CardCatalog;
use crate::error::{GameError, Result};
use crate::factions::{PerSide, Side};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::simulation::{PlayOutcome, Simulation, TickEvents};

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// One recorded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Delta passed to [`Simulation::tick`].
    #[serde(with = "fixed_serde")]
    pub dt: Fixed,
}

/// A card play, applied before the frame it is tagged with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedPlay {
    /// Index of the frame the play precedes.
    pub frame: u64,
    /// Side that played.
    pub side: Side,
    /// Card played.
    pub card_id: String,
    /// Requested position.
    pub position: Vec2Fixed,
}

/// Complete replay data structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Match seed.
    pub seed: u64,
    /// Match tunables.
    pub config: MatchConfig,
    /// Card definitions.
    pub catalog: CardCatalog,
    /// AI difficulty per side (`None` for externally driven sides).
    pub difficulties: PerSide<Option<Difficulty>>,
    /// Frame deltas in order.
    pub frames: Vec<Frame>,
    /// Accepted external plays in order.
    pub plays: Vec<RecordedPlay>,
    /// Tick count when recording stopped.
    pub final_tick: u64,
    /// State hash when recording stopped.
    pub final_hash: u64,
}

impl Replay {
    /// Start an empty replay.
    #[must_use]
    pub fn new(
        seed: u64,
        config: MatchConfig,
        catalog: CardCatalog,
        difficulties: PerSide<Option<Difficulty>>,
    ) -> Self {
        Self {
            version: REPLAY_VERSION,
            seed,
            config,
            catalog,
            difficulties,
            frames: Vec::new(),
            plays: Vec::new(),
            final_tick: 0,
            final_hash: 0,
        }
    }

    /// Record a play made before the next frame.
    pub fn record_play(&mut self, side: Side, card_id: &str, position: Vec2Fixed) {
        self.plays.push(RecordedPlay {
            frame: self.frames.len() as u64,
            side,
            card_id: card_id.to_string(),
            position,
        });
    }

    /// Record a frame delta.
    pub fn record_frame(&mut self, dt: Fixed) {
        self.frames.push(Frame { dt });
    }

    /// Stamp the end state.
    pub fn finalize(&mut self, final_tick: u64, final_hash: u64) {
        self.final_tick = final_tick;
        self.final_hash = final_hash;
    }

    /// Number of recorded frames.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Sum of recorded deltas (before clamping).
    #[must_use]
    pub fn duration(&self) -> Fixed {
        self.frames.iter().map(|f| f.dt).sum()
    }

    /// Encode to bytes.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize replay: {e}")))
    }

    /// Decode from bytes, checking the format version.
    ///
    /// # Errors
    /// Returns an error on malformed input or a version mismatch.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let replay: Self = bincode::deserialize(bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(GameError::InvalidState(format!(
                "Replay version mismatch: expected {}, got {}",
                REPLAY_VERSION, replay.version
            )));
        }

        Ok(replay)
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_bytes()?).map_err(|source| GameError::Io {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!(path = %path.display(), frames = self.frames.len(), "Saved replay");
        Ok(())
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if file reading or decoding fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| GameError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    /// Fresh simulation configured like the recorded one.
    ///
    /// # Errors
    /// Returns an error if the stored config, catalog or plays are invalid.
    pub fn start(&self) -> Result<Simulation> {
        if let Some(play) = self.plays.iter().find(|p| !self.catalog.contains(&p.card_id)) {
            return Err(GameError::UnknownCard(play.card_id.clone()));
        }
        let mut sim = Simulation::new(self.config.clone(), self.catalog.clone(), self.seed)?;
        for side in Side::BOTH {
            sim.set_ai(side, *self.difficulties.get(side));
        }
        Ok(sim)
    }

    /// Re-run every frame and return the final simulation.
    ///
    /// # Errors
    /// Returns an error if the replay cannot be started.
    pub fn run(&self) -> Result<Simulation> {
        let mut player = ReplayPlayer::new(self.clone())?;
        while player.advance().is_some() {}
        Ok(player.into_simulation())
    }

    /// Re-run and compare against the recorded final hash.
    ///
    /// # Errors
    /// Returns [`GameError::ReplayDesync`] if the re-run diverges.
    pub fn verify(&self) -> Result<Simulation> {
        let sim = self.run()?;
        let actual = sim.state_hash();
        if sim.tick_count() != self.final_tick || actual != self.final_hash {
            return Err(GameError::ReplayDesync {
                tick: sim.tick_count(),
                expected: self.final_hash,
                actual,
            });
        }
        tracing::debug!(tick = sim.tick_count(), hash = actual, "Replay verified");
        Ok(sim)
    }
}

/// Runs a match while recording its inputs.
#[derive(Debug)]
pub struct ReplayRecorder {
    sim: Simulation,
    replay: Replay,
}

impl ReplayRecorder {
    /// Start recording a new match.
    ///
    /// # Errors
    /// Returns an error if the config does not validate against the catalog.
    pub fn new(
        config: MatchConfig,
        catalog: CardCatalog,
        seed: u64,
        difficulties: PerSide<Option<Difficulty>>,
    ) -> Result<Self> {
        let replay = Replay::new(seed, config, catalog, difficulties);
        let sim = replay.start()?;
        Ok(Self { sim, replay })
    }

    /// The match being recorded.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Play a card; accepted plays are recorded.
    pub fn play_card(&mut self, side: Side, card_id: &str, position: Vec2Fixed) -> PlayOutcome {
        let outcome = self.sim.play_card(side, card_id, position);
        if outcome.is_accepted() {
            self.replay.record_play(side, card_id, position);
        }
        outcome
    }

    /// Advance one frame and record it.
    pub fn tick(&mut self, dt: Fixed) -> TickEvents {
        self.replay.record_frame(dt);
        self.sim.tick(dt)
    }

    /// Stop recording.
    #[must_use]
    pub fn finish(mut self) -> (Replay, Simulation) {
        self.replay
            .finalize(self.sim.tick_count(), self.sim.state_hash());
        (self.replay, self.sim)
    }
}

/// Replay playback controller.
#[derive(Debug)]
pub struct ReplayPlayer {
    replay: Replay,
    sim: Simulation,
    frame: usize,
    play_index: usize,
}

impl ReplayPlayer {
    /// Prepare playback from the start.
    ///
    /// # Errors
    /// Returns an error if the replay cannot be started.
    pub fn new(replay: Replay) -> Result<Self> {
        let sim = replay.start()?;
        Ok(Self {
            replay,
            sim,
            frame: 0,
            play_index: 0,
        })
    }

    /// Apply the next frame's plays and tick. `None` once every frame ran.
    pub fn advance(&mut self) -> Option<TickEvents> {
        let dt = self.replay.frames.get(self.frame)?.dt;
        let frame = self.frame as u64;
        while let Some(play) = self.replay.plays.get(self.play_index) {
            if play.frame > frame {
                break;
            }
            let outcome = self.sim.play_card(play.side, &play.card_id, play.position);
            if !outcome.is_accepted() {
                tracing::warn!(frame, card = %play.card_id, "Recorded play was rejected");
            }
            self.play_index += 1;
        }
        self.frame += 1;
        Some(self.sim.tick(dt))
    }

    /// Current playback state.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Frames played so far.
    #[must_use]
    pub const fn frame(&self) -> usize {
        self.frame
    }

    /// Whether every frame has been played.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.frame >= self.replay.frames.len()
    }

    /// Finish playback and take the simulation.
    #[must_use]
    pub fn into_simulation(self) -> Simulation {
        self.sim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(seed: u64) -> Replay {
        let mut recorder = ReplayRecorder::new(
            MatchConfig::default(),
            CardCatalog::default_catalog(),
            seed,
            PerSide::new(None, Some(Difficulty::Hard)),
        )
        .expect("valid");
        let dt = Fixed::from_num(0.1);
        for frame in 0..300 {
            if frame % 40 == 35 {
                let card = recorder.simulation().hand(Side::Player)[0].clone();
                recorder.play_card(Side::Player, &card, Vec2Fixed::from_ints(312, 420));
            }
            recorder.tick(dt);
        }
        recorder.finish().0
    }

    #[test]
    fn test_replay_verifies() {
        let replay = record(77);
        assert_eq!(replay.frame_count(), 300);
        assert!(!replay.plays.is_empty());
        let sim = replay.verify().expect("replay matches");
        assert_eq!(sim.state_hash(), replay.final_hash);
    }

    #[test]
    fn test_tampered_replay_desyncs() {
        let mut replay = record(78);
        replay.plays.clear();
        assert!(matches!(
            replay.verify(),
            Err(GameError::ReplayDesync { .. })
        ));
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut replay = record(79);
        replay.version = REPLAY_VERSION + 1;
        let bytes = replay.to_bytes().expect("serializes");
        assert!(Replay::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_unknown_card_in_replay() {
        let mut replay = record(80);
        replay.plays.push(RecordedPlay {
            frame: 0,
            side: Side::Player,
            card_id: "dragon".to_string(),
            position: Vec2Fixed::from_ints(88, 500),
        });
        assert!(matches!(replay.start(), Err(GameError::UnknownCard(_))));
    }
}
