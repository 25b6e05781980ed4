#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawn scheduler that emits bursts of falling glyphs.

use std::time::Duration;

use glam::Vec2;
use glyph_rain_core::{Surface, TuningProfile};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Smallest burst emitted when the field is well below its target.
pub const MIN_BURST: usize = 3;
/// Largest burst emitted in a single scheduling event.
pub const MAX_BURST: usize = 4;

const MIN_JITTER: f32 = 0.8;
const MAX_JITTER: f32 = 1.4;
const DEFAULT_HORIZONTAL_MARGIN: f32 = 24.0;
const DEFAULT_SPAWN_OFFSET: f32 = 32.0;
const DEFAULT_RNG_SEED: u64 = 0xbb67_ae85_84ca_a73b;

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
    horizontal_margin: f32,
    spawn_offset: f32,
}

impl Config {
    /// Creates a configuration using the provided seed and default geometry.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self {
            rng_seed,
            horizontal_margin: DEFAULT_HORIZONTAL_MARGIN,
            spawn_offset: DEFAULT_SPAWN_OFFSET,
        }
    }

    /// Overrides the distance kept between spawned glyphs and the side edges.
    #[must_use]
    pub const fn with_horizontal_margin(mut self, horizontal_margin: f32) -> Self {
        self.horizontal_margin = horizontal_margin;
        self
    }

    /// Overrides how far above the top edge glyphs appear.
    #[must_use]
    pub const fn with_spawn_offset(mut self, spawn_offset: f32) -> Self {
        self.spawn_offset = spawn_offset;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_RNG_SEED)
    }
}

/// Occupancy of the play-field at the moment the scheduler runs.
#[derive(Clone, Copy, Debug)]
pub struct FieldState {
    /// Glyphs currently falling.
    pub active: usize,
    /// Additional glyphs the pool can hand out.
    pub available: usize,
    /// Render surface the glyphs fall across.
    pub surface: Surface,
}

/// Request to place a single glyph on the field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnRequest {
    /// Character carried by the glyph, in display casing.
    pub glyph: char,
    /// Starting position above the top edge.
    pub position: Vec2,
    /// Falling speed in pixels per second.
    pub velocity: f32,
}

/// Pure system that decides when and how many glyphs enter the field.
#[derive(Debug)]
pub struct Spawning {
    config: Config,
    accumulator: Duration,
    rng: ChaCha8Rng,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            accumulator: Duration::ZERO,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Zeroes the spawn timer.
    pub fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
    }

    /// Time accumulated towards the next spawn event.
    #[must_use]
    pub const fn accumulated(&self) -> Duration {
        self.accumulator
    }

    /// Advances the spawn timer and emits a burst once the interval elapsed.
    ///
    /// `pick_glyph` supplies the character for each unit of the burst; a
    /// `None` ends the burst early.
    pub fn handle<F>(
        &mut self,
        dt: Duration,
        profile: &TuningProfile,
        field: FieldState,
        mut pick_glyph: F,
        out: &mut Vec<SpawnRequest>,
    ) where
        F: FnMut() -> Option<char>,
    {
        self.accumulator = self.accumulator.saturating_add(dt);
        if self.accumulator < profile.spawn_interval() {
            return;
        }
        self.accumulator = Duration::ZERO;

        let burst = self.resolve_burst(profile, field);
        for _ in 0..burst {
            let Some(glyph) = pick_glyph() else {
                break;
            };
            let position = self.spawn_position(field.surface);
            let velocity = profile.drop_speed() * self.rng.gen_range(MIN_JITTER..=MAX_JITTER);
            out.push(SpawnRequest {
                glyph,
                position,
                velocity,
            });
        }
    }

    fn resolve_burst(&mut self, profile: &TuningProfile, field: FieldState) -> usize {
        let deficit = profile
            .target_active_glyphs()
            .saturating_sub(field.active);
        if deficit == 0 {
            return 0;
        }

        let available = field
            .available
            .min(profile.max_active_glyphs().saturating_sub(field.active));
        if available == 0 {
            return 0;
        }

        let base = if deficit >= MIN_BURST {
            self.rng.gen_range(MIN_BURST..=MAX_BURST)
        } else {
            deficit
        };
        available.min(MAX_BURST.min(deficit.max(base)))
    }

    fn spawn_position(&mut self, surface: Surface) -> Vec2 {
        let margin = self.config.horizontal_margin;
        let width = surface.width();
        let x = if width > margin * 2.0 {
            self.rng.gen_range(margin..=width - margin)
        } else {
            width / 2.0
        };
        Vec2::new(x, -self.config.spawn_offset)
    }
}

impl Default for Spawning {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glyph_rain_core::{Difficulty, Speed};

    #[test]
    fn small_deficit_spawns_exactly_the_deficit() {
        let mut spawning = Spawning::default();
        let profile = TuningProfile::resolve(Difficulty::Standard, Speed::Normal);
        let field = FieldState {
            active: profile.target_active_glyphs() - 2,
            available: 32,
            surface: Surface::new(400.0, 600.0),
        };
        assert_eq!(spawning.resolve_burst(&profile, field), 2);
    }

    #[test]
    fn full_field_spawns_nothing() {
        let mut spawning = Spawning::default();
        let profile = TuningProfile::resolve(Difficulty::Easy, Speed::Slow);
        let field = FieldState {
            active: profile.target_active_glyphs(),
            available: 32,
            surface: Surface::new(400.0, 600.0),
        };
        assert_eq!(spawning.resolve_burst(&profile, field), 0);
    }

    #[test]
    fn narrow_surface_spawns_at_center() {
        let mut spawning = Spawning::default();
        let position = spawning.spawn_position(Surface::new(30.0, 100.0));
        assert_eq!(position, Vec2::new(15.0, -DEFAULT_SPAWN_OFFSET));
    }
}
