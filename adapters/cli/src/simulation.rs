//! Scripted player driving the runtime through whole rounds.

use std::time::Duration;

use anyhow::{bail, Result};
use glyph_rain_core::{
    glyphs_match, Command, Difficulty, Event, GlyphId, RoundPhase, RoundResult, Speed,
    WordOutcome,
};
use glyph_rain_runtime::{
    EngineHost, HistorySummary, RoundHost, RoundRuntime, RuntimeConfig, SessionHistory,
};
use glyph_rain_system_fairness::FairnessConfig;
use glyph_rain_system_glyph_pool::PoolConfig;
use glyph_rain_system_spawning::Config as SpawnConfig;
use glyph_rain_world::{query, MatchConfig, WordMatchEngine};
use rand::{seq::IteratorRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::scenario::{PlayerProfile, Scenario};

const WORDS_PER_ROUND: usize = 5;
const STARTING_CREDITS: u32 = 100;

/// Outcome of a simulated session.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct SimulationReport {
    pub(crate) seed: u64,
    pub(crate) difficulty: Difficulty,
    pub(crate) speed: Speed,
    pub(crate) rounds: Vec<RoundReport>,
    pub(crate) summary: HistorySummary,
}

/// Outcome of one simulated round.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub(crate) struct RoundReport {
    pub(crate) round: u64,
    /// `None` when the round was abandoned after the frame limit.
    pub(crate) result: Option<RoundResult>,
    pub(crate) words: Vec<WordOutcome>,
    pub(crate) credits_remaining: u32,
    pub(crate) frames: u64,
    pub(crate) spawned: usize,
    pub(crate) missed: usize,
    pub(crate) collected: usize,
    pub(crate) mistakes: usize,
    pub(crate) nudges: u64,
}

/// Plays every round of the scenario and reports the results.
pub(crate) fn run(scenario: &Scenario) -> Result<SimulationReport> {
    scenario.validate()?;

    let seed = scenario.seed;
    let settings = scenario.settings();
    let surface = scenario.surface();
    let frame = scenario.frame();

    let mut runtime = RoundRuntime::new(RuntimeConfig::new(
        PoolConfig::default(),
        FairnessConfig::default().with_seed(seed),
        SpawnConfig::new(seed.wrapping_add(1)),
    ));
    let engine = WordMatchEngine::new(
        MatchConfig::new(WORDS_PER_ROUND, STARTING_CREDITS, seed.wrapping_add(2)),
        SessionHistory::new(scenario.history),
    );
    let mut host = EngineHost::new(engine);
    let mut player = Player::new(scenario.player, seed.wrapping_add(3));
    let mut rounds = Vec::new();

    for _ in 0..scenario.rounds {
        let recent = host.engine().sink().recent_words();
        host.apply(Command::StartRound {
            pool: scenario.words.clone(),
            recent,
        });
        for event in host.drain_events() {
            if let Event::CommandRejected { error } = event {
                bail!("round could not start: {error}");
            }
        }

        let nudges_before = host.nudges();
        let mut report = RoundReport {
            round: query::round_view(host.engine()).round(),
            ..RoundReport::default()
        };

        while report.frames < scenario.max_frames {
            let tick = runtime.tick(frame, &settings, surface, &mut host);
            report.frames += 1;
            report.spawned += tick.spawned;
            report.missed += tick.missed;

            if let Some(id) = player.choose(frame, &runtime, &host) {
                match runtime.collect(id, &mut host) {
                    Some(result) if result.matched => report.collected += 1,
                    Some(_) => report.mistakes += 1,
                    None => {}
                }
            }
            if query::phase(host.engine()).is_terminal() {
                break;
            }
        }

        report.result = end_round(&mut runtime, &mut host, report.frames);
        report.words = query::slots(host.engine())
            .iter()
            .map(|slot| WordOutcome {
                word: slot.word().to_owned(),
                found: slot.is_found(),
            })
            .collect();
        report.credits_remaining = query::credits(host.engine());
        report.nudges = host.nudges() - nudges_before;
        let _ = host.drain_events();

        log::info!(
            "round {} ended as {:?} after {} frames",
            report.round,
            report.result,
            report.frames
        );
        rounds.push(report);
    }

    Ok(SimulationReport {
        seed,
        difficulty: scenario.difficulty,
        speed: scenario.speed,
        rounds,
        summary: host.engine().sink().summary(),
    })
}

/// Reads the final result and clears the field, abandoning an unfinished round.
fn end_round(
    runtime: &mut RoundRuntime,
    host: &mut EngineHost<SessionHistory>,
    frames: u64,
) -> Option<RoundResult> {
    let result = match query::phase(host.engine()) {
        RoundPhase::Won => Some(RoundResult::Won),
        RoundPhase::Lost => Some(RoundResult::Lost),
        _ => {
            log::warn!(
                "round {} unfinished after {frames} frames, abandoning",
                query::round_view(host.engine()).round()
            );
            host.apply(Command::Abandon);
            None
        }
    };
    runtime.discard_round();
    result
}

/// Taps the lowest glyph the active word needs, once per reaction time.
struct Player {
    reaction: Duration,
    mistake_rate: f64,
    cooldown: Duration,
    rng: ChaCha8Rng,
}

impl Player {
    fn new(profile: PlayerProfile, seed: u64) -> Self {
        Self {
            reaction: Duration::from_millis(profile.reaction_ms),
            mistake_rate: profile.mistake_rate,
            cooldown: Duration::ZERO,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn choose<H: RoundHost>(
        &mut self,
        dt: Duration,
        runtime: &RoundRuntime,
        host: &H,
    ) -> Option<GlyphId> {
        self.cooldown = self.cooldown.saturating_sub(dt);
        if !self.cooldown.is_zero() {
            return None;
        }

        let expected = host.round().active_word()?.next_expected()?;
        let visible = runtime.glyphs().filter(|glyph| glyph.position().y >= 0.0);
        let choice = if self.rng.gen_bool(self.mistake_rate) {
            visible
                .filter(|glyph| !glyphs_match(glyph.glyph(), expected))
                .choose(&mut self.rng)
        } else {
            visible
                .filter(|glyph| glyphs_match(glyph.glyph(), expected))
                .max_by(|left, right| left.position().y.total_cmp(&right.position().y))
        };

        let id = choice?.id();
        self.cooldown = self.reaction;
        Some(id)
    }
}
