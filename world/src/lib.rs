#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative round state for Glyph Rain.
//!
//! [`WordMatchEngine`] owns credits, word slots and the active word. Every
//! mutation goes through one of its operations (or [`apply`] with a
//! [`Command`]) and is reported as [`Event`] values. Finished rounds are
//! handed to the engine's [`SessionSink`].

use std::time::SystemTime;

use glyph_rain_core::{
    fold_case, CollectResult, Command, Event, RoundAction, RoundError, RoundPhase, RoundResult,
    SessionSink, SessionSnapshot, WordOutcome, WordSlot,
};
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;

const DEFAULT_WORDS_PER_ROUND: usize = 5;
const DEFAULT_STARTING_CREDITS: u32 = 100;
const DEFAULT_RNG_SEED: u64 = 0x3c6e_f372_fe94_f82b;

/// Round sizing and seeding parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchConfig {
    words_per_round: usize,
    starting_credits: u32,
    rng_seed: u64,
}

impl MatchConfig {
    /// Creates a configuration with explicit values.
    ///
    /// Rounds always start with at least one credit.
    #[must_use]
    pub const fn new(words_per_round: usize, starting_credits: u32, rng_seed: u64) -> Self {
        let starting_credits = if starting_credits == 0 {
            1
        } else {
            starting_credits
        };
        Self {
            words_per_round,
            starting_credits,
            rng_seed,
        }
    }

    /// Number of words sampled into each round.
    #[must_use]
    pub const fn words_per_round(&self) -> usize {
        self.words_per_round
    }

    /// Credits granted at round start.
    #[must_use]
    pub const fn starting_credits(&self) -> u32 {
        self.starting_credits
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_WORDS_PER_ROUND,
            DEFAULT_STARTING_CREDITS,
            DEFAULT_RNG_SEED,
        )
    }
}

/// Round state machine turning collected and missed glyphs into progress.
#[derive(Debug)]
pub struct WordMatchEngine<S> {
    config: MatchConfig,
    phase: RoundPhase,
    credits: u32,
    slots: Vec<WordSlot>,
    active: Option<usize>,
    round: u64,
    rng: ChaCha8Rng,
    sink: S,
}

impl<S: SessionSink> WordMatchEngine<S> {
    /// Creates an idle engine that reports finished rounds to `sink`.
    #[must_use]
    pub fn new(config: MatchConfig, sink: S) -> Self {
        Self {
            config,
            phase: RoundPhase::Idle,
            credits: config.starting_credits,
            slots: Vec::new(),
            active: None,
            round: 0,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            sink,
        }
    }

    /// Starts a new round with words sampled from `pool`.
    ///
    /// Every word missing from `recent` is preferred; recent words only
    /// fill the places fresh words cannot. Selected words keep their pool
    /// order.
    pub fn start_round(
        &mut self,
        pool: &[String],
        recent: &[String],
        out_events: &mut Vec<Event>,
    ) -> Result<(), RoundError> {
        let words = self.sample_words(pool, recent);
        if words.is_empty() {
            return Err(RoundError::EmptyWordPool);
        }
        self.begin(words, out_events);
        Ok(())
    }

    /// Replays the current word set with fresh credits and progress.
    pub fn restart(&mut self, out_events: &mut Vec<Event>) -> Result<(), RoundError> {
        if self.slots.is_empty() {
            return Err(RoundError::NoRoundToRestart);
        }
        let words = self
            .slots
            .iter()
            .map(|slot| slot.word().to_owned())
            .collect();
        self.begin(words, out_events);
        Ok(())
    }

    /// Offers a collected glyph to the active word.
    ///
    /// Outside [`RoundPhase::Playing`], without an active word, or when the
    /// glyph is not the next expected character, nothing changes and the
    /// result is [`CollectResult::REJECTED`]. Rejections never spend credits.
    pub fn collect_glyph(&mut self, glyph: char, out_events: &mut Vec<Event>) -> CollectResult {
        if self.phase != RoundPhase::Playing {
            log::debug!("ignoring glyph {glyph:?} while {:?}", self.phase);
            return CollectResult::REJECTED;
        }
        let Some(index) = self.active else {
            return CollectResult::REJECTED;
        };
        let Some(slot) = self.slots.get_mut(index) else {
            return CollectResult::REJECTED;
        };

        if !slot.extend(glyph) {
            out_events.push(Event::GlyphRejected { glyph });
            return CollectResult::REJECTED;
        }

        out_events.push(Event::GlyphAccepted {
            glyph,
            word: slot.word().to_owned(),
            matched: slot.progress().chars().count(),
        });
        if !slot.is_found() {
            return CollectResult {
                matched: true,
                completed_word: false,
                round_won: false,
            };
        }

        out_events.push(Event::WordCompleted {
            word: slot.word().to_owned(),
        });
        self.active = self.next_unfound(index);
        out_events.push(Event::ActiveWordChanged {
            word: self.active_word(),
        });

        let round_won = self.active.is_none();
        if round_won {
            self.finish(RoundResult::Won, out_events);
        }
        CollectResult {
            matched: true,
            completed_word: true,
            round_won,
        }
    }

    /// Spends one credit for a glyph that left the field uncollected.
    pub fn miss_glyph(&mut self, out_events: &mut Vec<Event>) -> Result<(), RoundError> {
        self.require_playing(RoundAction::Miss)?;
        self.credits = self.credits.saturating_sub(1);
        out_events.push(Event::CreditSpent {
            remaining: self.credits,
        });
        if self.credits == 0 {
            self.finish(RoundResult::Lost, out_events);
        }
        Ok(())
    }

    /// Makes the unfound slot at `index` the active word.
    pub fn select_word(
        &mut self,
        index: usize,
        out_events: &mut Vec<Event>,
    ) -> Result<(), RoundError> {
        self.require_playing(RoundAction::SelectWord)?;
        match self.slots.get(index) {
            Some(slot) if !slot.is_found() => {}
            _ => return Err(RoundError::UnknownWord { index }),
        }
        if self.active != Some(index) {
            self.active = Some(index);
            out_events.push(Event::ActiveWordChanged {
                word: self.active_word(),
            });
        }
        Ok(())
    }

    /// Freezes a playing round.
    pub fn pause(&mut self, out_events: &mut Vec<Event>) -> Result<(), RoundError> {
        self.require_playing(RoundAction::Pause)?;
        self.set_phase(RoundPhase::Paused, out_events);
        Ok(())
    }

    /// Unfreezes a paused round.
    pub fn resume(&mut self, out_events: &mut Vec<Event>) -> Result<(), RoundError> {
        if self.phase != RoundPhase::Paused {
            return Err(RoundError::InvalidTransition {
                action: RoundAction::Resume,
                phase: self.phase,
            });
        }
        self.set_phase(RoundPhase::Playing, out_events);
        Ok(())
    }

    /// Discards the current round without recording it.
    pub fn abandon(&mut self, out_events: &mut Vec<Event>) {
        if self.active.take().is_some() {
            out_events.push(Event::ActiveWordChanged { word: None });
        }
        self.set_phase(RoundPhase::Idle, out_events);
    }

    /// Session sink receiving finished rounds.
    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable access to the session sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    fn begin(&mut self, words: Vec<String>, out_events: &mut Vec<Event>) {
        self.slots = words.into_iter().map(WordSlot::new).collect();
        self.credits = self.config.starting_credits;
        self.round += 1;
        self.active = (!self.slots.is_empty()).then_some(0);

        let words: Vec<String> = self
            .slots
            .iter()
            .map(|slot| slot.word().to_owned())
            .collect();
        log::info!("round {} started with words {words:?}", self.round);
        out_events.push(Event::RoundStarted {
            round: self.round,
            words,
        });
        out_events.push(Event::ActiveWordChanged {
            word: self.active_word(),
        });
        self.set_phase(RoundPhase::Playing, out_events);
    }

    fn finish(&mut self, result: RoundResult, out_events: &mut Vec<Event>) {
        let phase = match result {
            RoundResult::Won => RoundPhase::Won,
            RoundResult::Lost => RoundPhase::Lost,
        };
        self.set_phase(phase, out_events);

        let snapshot = SessionSnapshot {
            round: self.round,
            result,
            words: self
                .slots
                .iter()
                .map(|slot| WordOutcome {
                    word: slot.word().to_owned(),
                    found: slot.is_found(),
                })
                .collect(),
            credits_remaining: self.credits,
            finished_at: SystemTime::now(),
        };
        log::info!(
            "round {} finished: {result:?} with {} credits left",
            self.round,
            self.credits
        );
        self.sink.record(snapshot.clone());
        out_events.push(Event::RoundFinished { snapshot });
    }

    fn set_phase(&mut self, to: RoundPhase, out_events: &mut Vec<Event>) {
        let from = self.phase;
        if from == to {
            return;
        }
        self.phase = to;
        out_events.push(Event::PhaseChanged { from, to });
    }

    fn require_playing(&self, action: RoundAction) -> Result<(), RoundError> {
        if self.phase == RoundPhase::Playing {
            Ok(())
        } else {
            Err(RoundError::InvalidTransition {
                action,
                phase: self.phase,
            })
        }
    }

    fn active_word(&self) -> Option<String> {
        self.active
            .and_then(|index| self.slots.get(index))
            .map(|slot| slot.word().to_owned())
    }

    fn next_unfound(&self, after: usize) -> Option<usize> {
        let len = self.slots.len();
        (1..=len)
            .map(|offset| (after + offset) % len)
            .find(|index| !self.slots[*index].is_found())
    }

    fn sample_words(&mut self, pool: &[String], recent: &[String]) -> Vec<String> {
        let mut candidates: Vec<(usize, &str)> = Vec::new();
        for (index, word) in pool.iter().enumerate() {
            let word = word.trim();
            if word.is_empty() || candidates.iter().any(|(_, seen)| same_word(seen, word)) {
                continue;
            }
            candidates.push((index, word));
        }

        let wanted = self.config.words_per_round;
        let (fresh, stale): (Vec<(usize, &str)>, Vec<(usize, &str)>) =
            candidates.into_iter().partition(|(_, word)| {
                !recent.iter().any(|seen| same_word(seen.trim(), word))
            });

        let mut chosen: Vec<(usize, &str)> = fresh
            .choose_multiple(&mut self.rng, wanted)
            .copied()
            .collect();
        let missing = wanted.saturating_sub(chosen.len());
        chosen.extend(stale.choose_multiple(&mut self.rng, missing).copied());
        chosen.sort_by_key(|(index, _)| *index);
        chosen
            .into_iter()
            .map(|(_, word)| word.to_owned())
            .collect()
    }
}

/// Applies the provided command to the engine, reporting rejections as events.
pub fn apply<S: SessionSink>(
    engine: &mut WordMatchEngine<S>,
    command: Command,
    out_events: &mut Vec<Event>,
) {
    let outcome = match command {
        Command::StartRound { pool, recent } => engine.start_round(&pool, &recent, out_events),
        Command::Restart => engine.restart(out_events),
        Command::CollectGlyph { glyph } => {
            let _ = engine.collect_glyph(glyph, out_events);
            Ok(())
        }
        Command::MissGlyph => engine.miss_glyph(out_events),
        Command::SelectWord { index } => engine.select_word(index, out_events),
        Command::Pause => engine.pause(out_events),
        Command::Resume => engine.resume(out_events),
        Command::Abandon => {
            engine.abandon(out_events);
            Ok(())
        }
    };

    if let Err(error) = outcome {
        log::debug!("round command rejected: {error}");
        out_events.push(Event::CommandRejected { error });
    }
}

fn same_word(left: &str, right: &str) -> bool {
    left.chars().map(fold_case).eq(right.chars().map(fold_case))
}

/// Query functions that provide read-only access to the round state.
pub mod query {
    use glyph_rain_core::{RoundPhase, RoundView, WordSlot};

    use super::WordMatchEngine;

    /// Captures the borrowed view systems consume every frame.
    #[must_use]
    pub fn round_view<S>(engine: &WordMatchEngine<S>) -> RoundView<'_> {
        RoundView::new(
            engine.phase,
            engine.credits,
            &engine.slots,
            engine.active,
            engine.round,
        )
    }

    /// Current phase of the round.
    #[must_use]
    pub fn phase<S>(engine: &WordMatchEngine<S>) -> RoundPhase {
        engine.phase
    }

    /// Credits remaining in the round.
    #[must_use]
    pub fn credits<S>(engine: &WordMatchEngine<S>) -> u32 {
        engine.credits
    }

    /// Word slots in round order.
    #[must_use]
    pub fn slots<S>(engine: &WordMatchEngine<S>) -> &[WordSlot] {
        &engine.slots
    }

    /// Slot the player is currently spelling.
    #[must_use]
    pub fn active_word<S>(engine: &WordMatchEngine<S>) -> Option<&WordSlot> {
        engine.active.and_then(|index| engine.slots.get(index))
    }
}
