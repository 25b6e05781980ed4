#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fairness regulator that decides which character the next spawn carries.
//!
//! The regulator keeps a weighted set of *needed* characters, the ones that
//! extend some unfound word, and biases spawns towards them the longer the
//! field goes without one. Escalation is soft first: periodic checks raise a
//! boost factor that occasionally doubles needed weights. Once the drought
//! threshold passes, the noise draw is suppressed entirely so the very next
//! spawn carries a needed character.

use std::time::Duration;

use glyph_rain_core::{fold_case, Alphabet, RoundView, MAX_NOISE_LEVEL};
use rand::{
    distributions::{Distribution, WeightedIndex},
    seq::SliceRandom,
    Rng, SeedableRng,
};
use rand_chacha::ChaCha8Rng;

const DEFAULT_DROUGHT_THRESHOLD: Duration = Duration::from_millis(6_000);
const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(2_500);
const DEFAULT_RNG_SEED: u64 = 0x6a09_e667_f3bc_c908;

const MIN_BOOST: f32 = 1.0;
const MAX_BOOST: f32 = 3.0;
const BOOST_STEP: f32 = 0.5;
const BOOST_DECAY: f32 = 0.9;

const ACTIVE_WORD_WEIGHT: u32 = 2;
const OTHER_WORD_WEIGHT: u32 = 1;
const DROUGHT_MULTIPLIER: f32 = 3.0;

/// Timing and seeding parameters for the regulator.
#[derive(Clone, Copy, Debug)]
pub struct FairnessConfig {
    drought_threshold: Duration,
    check_interval: Duration,
    rng_seed: u64,
}

impl FairnessConfig {
    /// Creates a configuration with explicit thresholds and seed.
    #[must_use]
    pub const fn new(drought_threshold: Duration, check_interval: Duration, rng_seed: u64) -> Self {
        Self {
            drought_threshold,
            check_interval,
            rng_seed,
        }
    }

    /// Time without a visible needed character after which spawns are forced.
    #[must_use]
    pub const fn drought_threshold(&self) -> Duration {
        self.drought_threshold
    }

    /// Cadence of the visibility re-evaluation.
    #[must_use]
    pub const fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// Returns a copy of the configuration using a different seed.
    #[must_use]
    pub const fn with_seed(mut self, rng_seed: u64) -> Self {
        self.rng_seed = rng_seed;
        self
    }
}

impl Default for FairnessConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_DROUGHT_THRESHOLD,
            DEFAULT_CHECK_INTERVAL,
            DEFAULT_RNG_SEED,
        )
    }
}

/// Result of a periodic fairness re-evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FairnessVerdict {
    /// The check interval has not elapsed yet.
    NotDue,
    /// A needed character is on the field, or nothing is needed.
    Satisfied,
    /// No needed character is visible but the drought threshold is not reached.
    Waiting,
    /// The drought threshold passed; the boost was raised and the host should be nudged.
    Nudge,
}

/// A character that extends some unfound word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NeededGlyph {
    glyph: char,
    key: char,
    weight: u32,
}

impl NeededGlyph {
    /// Character as written in the word list.
    #[must_use]
    pub const fn glyph(&self) -> char {
        self.glyph
    }

    /// Base sampling weight before escalation.
    #[must_use]
    pub const fn weight(&self) -> u32 {
        self.weight
    }
}

/// Pure state machine biasing spawns towards needed characters.
#[derive(Debug)]
pub struct FairnessRegulator {
    config: FairnessConfig,
    needed_elapsed: Duration,
    check_elapsed: Duration,
    boost_factor: f32,
    needed: Vec<NeededGlyph>,
    weights: Vec<f32>,
    rng: ChaCha8Rng,
}

impl FairnessRegulator {
    /// Creates a regulator in its reset state.
    #[must_use]
    pub fn new(config: FairnessConfig) -> Self {
        Self {
            config,
            needed_elapsed: Duration::ZERO,
            check_elapsed: Duration::ZERO,
            boost_factor: MIN_BOOST,
            needed: Vec::new(),
            weights: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Clears drought tracking and the boost factor.
    pub fn reset(&mut self) {
        self.needed_elapsed = Duration::ZERO;
        self.check_elapsed = Duration::ZERO;
        self.boost_factor = MIN_BOOST;
    }

    /// Recomputes the needed-character set from the round state.
    ///
    /// The active word's next character counts twice, every other unfound
    /// word's next character once. Characters that differ only by case share
    /// one entry whose weight is the sum.
    pub fn refresh_needed(&mut self, round: &RoundView<'_>) {
        self.needed.clear();
        let active = round.active_index();
        for (index, slot) in round.slots().iter().enumerate() {
            if slot.is_found() {
                continue;
            }
            let Some(glyph) = slot.next_expected() else {
                continue;
            };
            let weight = if Some(index) == active {
                ACTIVE_WORD_WEIGHT
            } else {
                OTHER_WORD_WEIGHT
            };
            let key = fold_case(glyph);
            match self.needed.iter_mut().find(|needed| needed.key == key) {
                Some(needed) => needed.weight += weight,
                None => self.needed.push(NeededGlyph { glyph, key, weight }),
            }
        }
    }

    /// Advances the drought and check timers.
    pub fn advance(&mut self, dt: Duration) {
        self.needed_elapsed = self.needed_elapsed.saturating_add(dt);
        self.check_elapsed = self.check_elapsed.saturating_add(dt);
    }

    /// Runs the periodic visibility check once the check interval elapsed.
    ///
    /// `visible` yields the characters currently on the field.
    pub fn check<I>(&mut self, visible: I) -> FairnessVerdict
    where
        I: IntoIterator<Item = char>,
    {
        if self.check_elapsed < self.config.check_interval {
            return FairnessVerdict::NotDue;
        }
        self.check_elapsed = Duration::ZERO;

        if self.needed.is_empty() {
            self.needed_elapsed = Duration::ZERO;
            return FairnessVerdict::Satisfied;
        }

        let on_field = visible
            .into_iter()
            .any(|glyph| self.is_needed(glyph));
        if on_field {
            self.needed_elapsed = Duration::ZERO;
            self.boost_factor = (self.boost_factor * BOOST_DECAY).max(MIN_BOOST);
            return FairnessVerdict::Satisfied;
        }

        if self.in_drought() {
            self.boost_factor = (self.boost_factor + BOOST_STEP).min(MAX_BOOST);
            log::info!(
                "needed glyphs absent for {:?}, boost raised to {:.2}",
                self.needed_elapsed,
                self.boost_factor
            );
            return FairnessVerdict::Nudge;
        }

        FairnessVerdict::Waiting
    }

    /// Chooses the character the next spawn carries, in display casing.
    ///
    /// Returns `None` only when nothing is needed and the alphabet is empty.
    pub fn pick(&mut self, alphabet: &Alphabet, noise_level: f32) -> Option<char> {
        if self.needed.is_empty() {
            return self.noise(alphabet);
        }

        let drought = self.in_drought();
        let noise_level = if noise_level.is_nan() {
            0.0
        } else {
            f64::from(noise_level.clamp(0.0, MAX_NOISE_LEVEL))
        };
        if !drought && self.rng.gen_bool(noise_level) {
            if let Some(glyph) = self.noise(alphabet) {
                return Some(glyph);
            }
        }

        let extra_chance = f64::from((self.boost_factor - MIN_BOOST).clamp(0.0, 1.0));
        self.weights.clear();
        for needed in &self.needed {
            let base = needed.weight as f32;
            let weight = if drought {
                base * DROUGHT_MULTIPLIER
            } else if extra_chance > 0.0 && self.rng.gen_bool(extra_chance) {
                base * 2.0
            } else {
                base
            };
            self.weights.push(weight);
        }

        let distribution = WeightedIndex::new(&self.weights).ok()?;
        let chosen = self.needed.get(distribution.sample(&mut self.rng))?;
        Some(alphabet.display(chosen.glyph))
    }

    /// Reports whether the glyph extends some unfound word.
    #[must_use]
    pub fn is_needed(&self, glyph: char) -> bool {
        let key = fold_case(glyph);
        self.needed.iter().any(|needed| needed.key == key)
    }

    /// Needed characters with their base weights.
    #[must_use]
    pub fn needed(&self) -> &[NeededGlyph] {
        &self.needed
    }

    /// Whether the drought threshold has been reached.
    #[must_use]
    pub fn in_drought(&self) -> bool {
        self.needed_elapsed >= self.config.drought_threshold
    }

    /// Time since a needed character was last confirmed on the field.
    #[must_use]
    pub const fn needed_elapsed(&self) -> Duration {
        self.needed_elapsed
    }

    /// Current soft-escalation factor in `1.0..=3.0`.
    #[must_use]
    pub const fn boost_factor(&self) -> f32 {
        self.boost_factor
    }

    fn noise(&mut self, alphabet: &Alphabet) -> Option<char> {
        alphabet
            .letters()
            .choose(&mut self.rng)
            .map(|glyph| alphabet.display(*glyph))
    }
}

impl Default for FairnessRegulator {
    fn default() -> Self {
        Self::new(FairnessConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glyph_rain_core::{Casing, RoundPhase, WordSlot};

    fn slots(words: &[&str]) -> Vec<WordSlot> {
        words.iter().map(|word| WordSlot::new(*word)).collect()
    }

    fn regulator_for(slots: &[WordSlot], active: Option<usize>) -> FairnessRegulator {
        let mut regulator = FairnessRegulator::default();
        let view = RoundView::new(RoundPhase::Playing, 100, slots, active, 1);
        regulator.refresh_needed(&view);
        regulator
    }

    #[test]
    fn active_word_counts_twice() {
        let slots = slots(&["cat", "cow", "dog"]);
        let regulator = regulator_for(&slots, Some(0));
        let needed: Vec<_> = regulator
            .needed()
            .iter()
            .map(|needed| (needed.glyph(), needed.weight()))
            .collect();
        assert_eq!(needed, vec![('c', 3), ('d', 1)]);
    }

    #[test]
    fn found_words_are_not_needed() {
        let mut slots = slots(&["ab", "cd"]);
        assert!(slots[0].extend('a'));
        assert!(slots[0].extend('b'));
        let regulator = regulator_for(&slots, Some(1));
        assert!(!regulator.is_needed('a'));
        assert!(regulator.is_needed('C'));
    }

    #[test]
    fn drought_suppresses_noise() {
        let slots = slots(&["zebra"]);
        let mut regulator = regulator_for(&slots, Some(0));
        regulator.advance(DEFAULT_DROUGHT_THRESHOLD);
        assert!(regulator.in_drought());

        let alphabet = Alphabet::new("abcdefghijklmnopqrstuvwxy", Casing::Upper);
        for _ in 0..200 {
            assert_eq!(regulator.pick(&alphabet, MAX_NOISE_LEVEL), Some('Z'));
        }
    }

    #[test]
    fn empty_needed_set_draws_noise() {
        let mut regulator = FairnessRegulator::default();
        let alphabet = Alphabet::new("q", Casing::Lower);
        assert_eq!(regulator.pick(&alphabet, 0.0), Some('q'));
        assert_eq!(regulator.pick(&Alphabet::new("", Casing::Lower), 0.0), None);
    }

    #[test]
    fn zero_noise_always_spawns_needed() {
        let slots = slots(&["xy", "ab"]);
        let mut regulator = regulator_for(&slots, Some(0));
        let alphabet = Alphabet::new("mnop", Casing::Preserve);
        for _ in 0..100 {
            let glyph = regulator.pick(&alphabet, 0.0).expect("needed glyph");
            assert!(glyph == 'x' || glyph == 'a', "unexpected glyph {glyph}");
        }
    }

    #[test]
    fn nan_noise_level_counts_as_no_noise() {
        let slots = slots(&["cat"]);
        let mut regulator = regulator_for(&slots, Some(0));
        let alphabet = Alphabet::new("mnop", Casing::Upper);
        for _ in 0..100 {
            assert_eq!(regulator.pick(&alphabet, f32::NAN), Some('C'));
        }
    }

    #[test]
    fn check_waits_for_interval() {
        let slots = slots(&["cat"]);
        let mut regulator = regulator_for(&slots, Some(0));
        regulator.advance(Duration::from_millis(2_000));
        assert_eq!(regulator.check(['x']), FairnessVerdict::NotDue);
        regulator.advance(Duration::from_millis(500));
        assert_eq!(regulator.check(['x']), FairnessVerdict::Waiting);
    }

    #[test]
    fn nudges_raise_boost_up_to_ceiling() {
        let slots = slots(&["cat"]);
        let mut regulator = regulator_for(&slots, Some(0));
        regulator.advance(DEFAULT_DROUGHT_THRESHOLD);
        for expected in [1.5, 2.0, 2.5, 3.0, 3.0] {
            regulator.advance(DEFAULT_CHECK_INTERVAL);
            assert_eq!(regulator.check(std::iter::empty()), FairnessVerdict::Nudge);
            assert!((regulator.boost_factor() - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn visible_needed_glyph_decays_boost_to_floor() {
        let slots = slots(&["cat"]);
        let mut regulator = regulator_for(&slots, Some(0));
        regulator.boost_factor = 1.05;
        regulator.advance(DEFAULT_CHECK_INTERVAL);
        assert_eq!(regulator.check(['C']), FairnessVerdict::Satisfied);
        assert_eq!(regulator.boost_factor(), MIN_BOOST);
        assert_eq!(regulator.needed_elapsed(), Duration::ZERO);
    }

    #[test]
    fn reset_restores_initial_state() {
        let slots = slots(&["cat"]);
        let mut regulator = regulator_for(&slots, Some(0));
        regulator.advance(DEFAULT_DROUGHT_THRESHOLD + DEFAULT_CHECK_INTERVAL);
        let _ = regulator.check(std::iter::empty());
        regulator.reset();
        assert_eq!(regulator.needed_elapsed(), Duration::ZERO);
        assert_eq!(regulator.boost_factor(), MIN_BOOST);
        assert!(!regulator.in_drought());
    }
}
