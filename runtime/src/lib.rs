#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frame-driven composition of the Glyph Rain systems.
//!
//! [`RoundRuntime`] owns the glyph pool, the fairness regulator and the spawn
//! scheduler. The host drives it with [`RoundRuntime::tick`] once per frame
//! and forwards taps through [`RoundRuntime::collect`]; round bookkeeping is
//! delegated back to the host through [`RoundHost`].

mod history;
mod host;

use std::time::Duration;

use glyph_rain_core::{
    CollectResult, Difficulty, FallingGlyph, GlyphId, RoundPhase, RoundSettings, RoundView, Speed,
    Surface, TuningProfile,
};
use glyph_rain_system_fairness::{FairnessConfig, FairnessRegulator, FairnessVerdict};
use glyph_rain_system_glyph_pool::{GlyphPool, PoolConfig};
use glyph_rain_system_spawning::{
    Config as SpawnConfig, FieldState, SpawnRequest, Spawning,
};

pub use history::{HistorySummary, SessionHistory};
pub use host::EngineHost;

const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_OVERSHOOT: f32 = 40.0;

/// Round-level collaborator the runtime reports to.
///
/// Every call is synchronous and happens inside [`RoundRuntime::tick`] or
/// [`RoundRuntime::collect`].
pub trait RoundHost {
    /// Current round state.
    fn round(&self) -> RoundView<'_>;

    /// Offers a collected glyph to the active word.
    fn glyph_collected(&mut self, glyph: char) -> CollectResult;

    /// Reports a glyph that fell past the bottom edge.
    fn glyph_missed(&mut self);

    /// Reports that needed glyphs stayed off the field for too long.
    fn fairness_nudge(&mut self);
}

/// Configuration for every system owned by the runtime.
#[derive(Clone, Copy, Debug)]
pub struct RuntimeConfig {
    pool: PoolConfig,
    fairness: FairnessConfig,
    spawning: SpawnConfig,
    cleanup_interval: Duration,
    overshoot: f32,
}

impl RuntimeConfig {
    /// Creates a configuration from per-system settings.
    #[must_use]
    pub const fn new(pool: PoolConfig, fairness: FairnessConfig, spawning: SpawnConfig) -> Self {
        Self {
            pool,
            fairness,
            spawning,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            overshoot: DEFAULT_OVERSHOOT,
        }
    }

    /// Overrides how often vacant pool slots are trimmed.
    #[must_use]
    pub const fn with_cleanup_interval(mut self, cleanup_interval: Duration) -> Self {
        self.cleanup_interval = cleanup_interval;
        self
    }

    /// Overrides how far below the bottom edge a glyph may fall before it counts as missed.
    #[must_use]
    pub const fn with_overshoot(mut self, overshoot: f32) -> Self {
        self.overshoot = overshoot;
        self
    }

    /// Interval between pool trims.
    #[must_use]
    pub const fn cleanup_interval(&self) -> Duration {
        self.cleanup_interval
    }

    /// Distance below the bottom edge at which glyphs are missed.
    #[must_use]
    pub const fn overshoot(&self) -> f32 {
        self.overshoot
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new(
            PoolConfig::default(),
            FairnessConfig::default(),
            SpawnConfig::default(),
        )
    }
}

/// Summary of the work performed by a single tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Glyphs placed on the field.
    pub spawned: usize,
    /// Glyphs that fell past the bottom edge and were reported to the host.
    pub missed: usize,
    /// Whether the host received a fairness nudge.
    pub nudged: bool,
}

/// Owns the falling glyphs of one play-field and drives them every frame.
#[derive(Debug)]
pub struct RoundRuntime {
    config: RuntimeConfig,
    pool: GlyphPool,
    regulator: FairnessRegulator,
    spawning: Spawning,
    profile: TuningProfile,
    tuning: Option<(Difficulty, Speed)>,
    round: Option<u64>,
    active_word: Option<usize>,
    cleanup_elapsed: Duration,
    requests: Vec<SpawnRequest>,
    fallen: Vec<GlyphId>,
}

impl RoundRuntime {
    /// Creates a runtime with an empty field.
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            pool: GlyphPool::new(config.pool),
            regulator: FairnessRegulator::new(config.fairness),
            spawning: Spawning::new(config.spawning),
            profile: TuningProfile::resolve(Difficulty::default(), Speed::default()),
            tuning: None,
            round: None,
            active_word: None,
            cleanup_elapsed: Duration::ZERO,
            requests: Vec::new(),
            fallen: Vec::new(),
        }
    }

    /// Advances the field by `dt`.
    ///
    /// Nothing moves unless the host's round is playing. Glyphs that fall
    /// past the bottom edge are reported through [`RoundHost::glyph_missed`]
    /// until the round stops playing.
    pub fn tick<H: RoundHost>(
        &mut self,
        dt: Duration,
        settings: &RoundSettings,
        surface: Surface,
        host: &mut H,
    ) -> TickReport {
        let mut report = TickReport::default();
        {
            let view = host.round();
            if view.phase() != RoundPhase::Playing {
                return report;
            }
            self.sync_round(&view, settings);
            self.regulator.refresh_needed(&view);
        }

        self.regulator.advance(dt);
        self.cleanup_elapsed = self.cleanup_elapsed.saturating_add(dt);

        report.spawned = self.spawn(dt, settings, surface);
        report.missed = self.fall(dt, surface, host);

        if host.round().phase() != RoundPhase::Playing {
            return report;
        }

        let verdict = self.regulator.check(visible_glyphs(&self.pool));
        if verdict == FairnessVerdict::Nudge {
            report.nudged = true;
            host.fairness_nudge();
        }

        if self.cleanup_elapsed >= self.config.cleanup_interval {
            self.cleanup_elapsed = Duration::ZERO;
            let _ = self.pool.trim();
        }

        report
    }

    /// Offers the tapped glyph to the host.
    ///
    /// Returns `None` when the glyph already left the field or the round is
    /// not playing. A matched glyph is removed; a mismatched one keeps falling.
    pub fn collect<H: RoundHost>(&mut self, id: GlyphId, host: &mut H) -> Option<CollectResult> {
        if host.round().phase() != RoundPhase::Playing {
            return None;
        }
        let glyph = self.pool.get(id)?.glyph();

        let result = host.glyph_collected(glyph);
        if result.matched {
            if let Err(error) = self.pool.release(id) {
                log::warn!("collected glyph could not be released: {error}");
            }
            self.regulator.reset();
        }
        Some(result)
    }

    /// Clears the field and every timer.
    pub fn discard_round(&mut self) {
        let released = self.pool.release_all();
        self.spawning.reset();
        self.regulator.reset();
        self.cleanup_elapsed = Duration::ZERO;
        if released > 0 {
            log::debug!("discarded {released} falling glyphs");
        }
    }

    /// Glyphs currently on the field.
    pub fn glyphs(&self) -> impl Iterator<Item = &FallingGlyph> {
        self.pool.iter_active()
    }

    /// Pool backing the field.
    #[must_use]
    pub const fn pool(&self) -> &GlyphPool {
        &self.pool
    }

    /// Regulator biasing the spawned characters.
    #[must_use]
    pub const fn regulator(&self) -> &FairnessRegulator {
        &self.regulator
    }

    /// Tuning profile applied by the most recent tick.
    #[must_use]
    pub const fn profile(&self) -> &TuningProfile {
        &self.profile
    }

    fn sync_round(&mut self, view: &RoundView<'_>, settings: &RoundSettings) {
        let round = Some(view.round());
        if self.round != round {
            if self.round.is_some() {
                log::debug!("round {} replaced, clearing the field", view.round());
            }
            self.discard_round();
            self.round = round;
            self.active_word = view.active_index();
        } else if self.active_word != view.active_index() {
            self.active_word = view.active_index();
            self.regulator.reset();
        }

        let tuning = (settings.difficulty, settings.speed);
        if self.tuning != Some(tuning) {
            self.tuning = Some(tuning);
            self.profile = settings.tuning();
            log::debug!(
                "tuning set to {:?}/{:?}: {:?}",
                settings.difficulty,
                settings.speed,
                self.profile
            );
        }
    }

    fn spawn(&mut self, dt: Duration, settings: &RoundSettings, surface: Surface) -> usize {
        let field = FieldState {
            active: self.pool.active_count(),
            available: self.pool.available(),
            surface,
        };
        let noise_level = settings.clamped_noise_level();
        let alphabet = &settings.alphabet;
        let regulator = &mut self.regulator;
        self.requests.clear();
        self.spawning.handle(
            dt,
            &self.profile,
            field,
            || regulator.pick(alphabet, noise_level),
            &mut self.requests,
        );

        let mut spawned = 0;
        for request in self.requests.drain(..) {
            match self
                .pool
                .acquire(request.glyph, request.position, request.velocity)
            {
                Ok(_) => spawned += 1,
                Err(error) => log::warn!("skipping spawn of {:?}: {error}", request.glyph),
            }
        }
        spawned
    }

    fn fall<H: RoundHost>(&mut self, dt: Duration, surface: Surface, host: &mut H) -> usize {
        let floor = surface.height() + self.config.overshoot;
        self.fallen.clear();
        for glyph in self.pool.iter_active_mut() {
            glyph.advance(dt);
            if glyph.position().y > floor {
                self.fallen.push(glyph.id());
            }
        }

        let mut missed = 0;
        let mut playing = true;
        for id in self.fallen.drain(..) {
            if self.pool.release(id).is_err() || !playing {
                continue;
            }
            missed += 1;
            host.glyph_missed();
            playing = host.round().phase() == RoundPhase::Playing;
        }
        missed
    }
}

/// Characters of the glyphs that already crossed the top edge.
fn visible_glyphs(pool: &GlyphPool) -> impl Iterator<Item = char> + '_ {
    pool.iter_active()
        .filter(|glyph| glyph.position().y >= 0.0)
        .map(FallingGlyph::glyph)
}

impl Default for RoundRuntime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use glyph_rain_core::WordSlot;

    struct StaticHost {
        slots: Vec<WordSlot>,
        phase: RoundPhase,
        misses: usize,
    }

    impl RoundHost for StaticHost {
        fn round(&self) -> RoundView<'_> {
            RoundView::new(self.phase, 100, &self.slots, Some(0), 1)
        }

        fn glyph_collected(&mut self, _glyph: char) -> CollectResult {
            CollectResult::REJECTED
        }

        fn glyph_missed(&mut self) {
            self.misses += 1;
        }

        fn fairness_nudge(&mut self) {}
    }

    #[test]
    fn tuning_follows_settings() {
        let mut runtime = RoundRuntime::default();
        let mut host = StaticHost {
            slots: vec![WordSlot::new("cat")],
            phase: RoundPhase::Playing,
            misses: 0,
        };
        let settings = RoundSettings {
            difficulty: Difficulty::Hard,
            speed: Speed::Fast,
            ..RoundSettings::default()
        };

        let _ = runtime.tick(
            Duration::from_millis(16),
            &settings,
            Surface::new(320.0, 480.0),
            &mut host,
        );

        assert_eq!(
            *runtime.profile(),
            TuningProfile::resolve(Difficulty::Hard, Speed::Fast)
        );
        assert_eq!(host.misses, 0);
    }

    #[test]
    fn glyphs_above_the_top_edge_are_not_visible() {
        let mut pool = GlyphPool::default();
        let _ = pool.acquire('C', Vec2::new(40.0, -32.0), 90.0).expect("room");
        let _ = pool.acquire('A', Vec2::new(80.0, 0.0), 90.0).expect("room");
        let _ = pool.acquire('T', Vec2::new(120.0, 300.0), 90.0).expect("room");

        let visible: Vec<char> = visible_glyphs(&pool).collect();
        assert_eq!(visible, vec!['A', 'T']);
    }

    #[test]
    fn config_overrides_apply() {
        let config = RuntimeConfig::default()
            .with_cleanup_interval(Duration::from_secs(3))
            .with_overshoot(12.0);
        assert_eq!(config.cleanup_interval(), Duration::from_secs(3));
        assert_eq!(config.overshoot(), 12.0);
    }
}
