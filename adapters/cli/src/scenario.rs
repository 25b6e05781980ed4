//! TOML description of a simulated session.

use std::{fs, path::Path, time::Duration};

use anyhow::{ensure, Context, Result};
use glyph_rain_core::{
    Alphabet, Casing, Difficulty, RoundSettings, Speed, Surface, LATIN_ALPHABET,
};
use serde::Deserialize;

const DEFAULT_WORDS: [&str; 16] = [
    "apple", "river", "stone", "cloud", "ember", "frost", "grove", "harbor", "island", "lantern",
    "meadow", "nectar", "orbit", "pepper", "quartz", "willow",
];

/// Everything the simulator needs to play a session.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Scenario {
    /// Rounds to play back to back.
    pub(crate) rounds: u32,
    /// Seed every random source is derived from.
    pub(crate) seed: u64,
    pub(crate) difficulty: Difficulty,
    pub(crate) speed: Speed,
    /// Share of spawns drawn from the whole alphabet.
    pub(crate) noise_level: f32,
    /// Letters noise glyphs are drawn from.
    pub(crate) alphabet: String,
    pub(crate) casing: Casing,
    /// Candidate words for every round.
    pub(crate) words: Vec<String>,
    pub(crate) surface: SurfaceSize,
    pub(crate) player: PlayerProfile,
    /// Simulated frame length in milliseconds.
    pub(crate) frame_ms: u64,
    /// Frames after which an unfinished round is abandoned.
    pub(crate) max_frames: u64,
    /// Finished rounds kept in the session history.
    pub(crate) history: usize,
}

/// Play-field dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SurfaceSize {
    pub(crate) width: f32,
    pub(crate) height: f32,
}

/// Behaviour of the scripted player.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct PlayerProfile {
    /// Delay between two taps in milliseconds.
    pub(crate) reaction_ms: u64,
    /// Probability that a tap lands on a glyph the active word does not need.
    pub(crate) mistake_rate: f64,
}

impl Scenario {
    /// Reads and validates a scenario file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario file {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid scenario file {}", path.display()))
    }

    /// Parses and validates scenario TOML.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let scenario: Self =
            toml::from_str(contents).context("failed to parse scenario toml contents")?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Rejects values the simulation cannot run with.
    pub(crate) fn validate(&self) -> Result<()> {
        ensure!(
            self.words.iter().any(|word| !word.trim().is_empty()),
            "scenario needs at least one non-empty word"
        );
        ensure!(self.frame_ms > 0, "frame_ms must be positive");
        ensure!(
            self.surface.width > 0.0 && self.surface.height > 0.0,
            "surface must have a positive width and height"
        );
        ensure!(
            (0.0..=1.0).contains(&self.player.mistake_rate),
            "player.mistake_rate must lie within 0.0..=1.0, got {}",
            self.player.mistake_rate
        );
        Ok(())
    }

    /// Round settings the runtime reads every frame.
    pub(crate) fn settings(&self) -> RoundSettings {
        RoundSettings {
            difficulty: self.difficulty,
            speed: self.speed,
            noise_level: self.noise_level,
            alphabet: Alphabet::new(&self.alphabet, self.casing),
        }
    }

    pub(crate) fn surface(&self) -> Surface {
        Surface::new(self.surface.width, self.surface.height)
    }

    pub(crate) fn frame(&self) -> Duration {
        Duration::from_millis(self.frame_ms)
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            rounds: 3,
            seed: 0x6a09_e667_f3bc_c908,
            difficulty: Difficulty::default(),
            speed: Speed::default(),
            noise_level: RoundSettings::default().noise_level,
            alphabet: LATIN_ALPHABET.to_owned(),
            casing: Casing::default(),
            words: DEFAULT_WORDS.iter().map(|word| (*word).to_owned()).collect(),
            surface: SurfaceSize::default(),
            player: PlayerProfile::default(),
            frame_ms: 16,
            max_frames: 30_000,
            history: 20,
        }
    }
}

impl Default for SurfaceSize {
    fn default() -> Self {
        Self {
            width: 480.0,
            height: 720.0,
        }
    }
}

impl Default for PlayerProfile {
    fn default() -> Self {
        Self {
            reaction_ms: 250,
            mistake_rate: 0.05,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let scenario = Scenario::parse("").expect("defaults are valid");
        assert_eq!(scenario, Scenario::default());
    }

    #[test]
    fn partial_file_overrides_selected_fields() {
        let scenario = Scenario::parse(
            r#"
                rounds = 1
                difficulty = "hard"
                speed = "fast"
                casing = "lower"
                words = ["cat", "dog"]

                [player]
                mistake_rate = 0.0
            "#,
        )
        .expect("scenario parses");

        assert_eq!(scenario.rounds, 1);
        assert_eq!(scenario.difficulty, Difficulty::Hard);
        assert_eq!(scenario.speed, Speed::Fast);
        assert_eq!(scenario.casing, Casing::Lower);
        assert_eq!(scenario.words, vec!["cat".to_owned(), "dog".to_owned()]);
        assert_eq!(scenario.player.reaction_ms, 250);
        assert_eq!(scenario.surface, SurfaceSize::default());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(Scenario::parse("words = [\"\", \"  \"]").is_err());
        assert!(Scenario::parse("frame_ms = 0").is_err());
        assert!(Scenario::parse("[player]\nmistake_rate = 1.5").is_err());
        assert!(Scenario::parse("unknown = 1").is_err());
    }
}
