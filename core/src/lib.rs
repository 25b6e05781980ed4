#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Glyph Rain engine.
//!
//! This crate defines the vocabulary that connects the round state machine,
//! the pure per-frame systems, and whatever host drives them. The world
//! crate owns round state and mutates it in response to [`Command`] values,
//! broadcasting [`Event`] values as it goes. Systems never touch round state
//! directly: they read a borrowed [`RoundView`] once per frame and report
//! back through the [`SessionSink`] and host callbacks.

use std::time::{Duration, SystemTime};

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Highest noise level a round may be configured with.
pub const MAX_NOISE_LEVEL: f32 = 0.5;

/// Letters used when no language-specific alphabet is configured.
pub const LATIN_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz";

/// Difficulty tier selected for the round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Sparse field with generous spawn intervals.
    Easy,
    /// Baseline tuning.
    #[default]
    Standard,
    /// Crowded field with short spawn intervals.
    Hard,
}

impl Difficulty {
    const fn row(self) -> usize {
        match self {
            Self::Easy => 0,
            Self::Standard => 1,
            Self::Hard => 2,
        }
    }
}

/// Fall speed selected for the round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speed {
    /// Slow falling glyphs.
    Slow,
    /// Baseline falling speed.
    #[default]
    Normal,
    /// Fast falling glyphs.
    Fast,
}

impl Speed {
    const fn column(self) -> usize {
        match self {
            Self::Slow => 0,
            Self::Normal => 1,
            Self::Fast => 2,
        }
    }
}

/// Spawn and movement parameters derived from the selected difficulty and speed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TuningProfile {
    spawn_interval: Duration,
    drop_speed: f32,
    max_active_glyphs: usize,
    target_active_glyphs: usize,
}

const TUNING_TABLE: [[TuningProfile; 3]; 3] = [
    [
        TuningProfile::new(2_000, 55.0, 6, 4),
        TuningProfile::new(1_600, 70.0, 7, 5),
        TuningProfile::new(1_300, 90.0, 8, 6),
    ],
    [
        TuningProfile::new(1_600, 75.0, 8, 6),
        TuningProfile::new(1_300, 95.0, 10, 7),
        TuningProfile::new(1_050, 120.0, 12, 8),
    ],
    [
        TuningProfile::new(1_300, 95.0, 10, 7),
        TuningProfile::new(1_050, 125.0, 12, 9),
        TuningProfile::new(850, 155.0, 14, 10),
    ],
];

impl TuningProfile {
    const fn new(
        spawn_interval_ms: u64,
        drop_speed: f32,
        max_active_glyphs: usize,
        target_active_glyphs: usize,
    ) -> Self {
        Self {
            spawn_interval: Duration::from_millis(spawn_interval_ms),
            drop_speed,
            max_active_glyphs,
            target_active_glyphs,
        }
    }

    /// Looks up the fixed tuning entry for the provided difficulty and speed.
    #[must_use]
    pub const fn resolve(difficulty: Difficulty, speed: Speed) -> Self {
        TUNING_TABLE[difficulty.row()][speed.column()]
    }

    /// Time that must accumulate between two spawn bursts.
    #[must_use]
    pub const fn spawn_interval(&self) -> Duration {
        self.spawn_interval
    }

    /// Base falling speed in surface pixels per second.
    #[must_use]
    pub const fn drop_speed(&self) -> f32 {
        self.drop_speed
    }

    /// Hard ceiling on simultaneously falling glyphs.
    #[must_use]
    pub const fn max_active_glyphs(&self) -> usize {
        self.max_active_glyphs
    }

    /// Number of falling glyphs the scheduler tries to maintain.
    #[must_use]
    pub const fn target_active_glyphs(&self) -> usize {
        self.target_active_glyphs
    }
}

/// Casing rule used when a glyph is displayed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Casing {
    /// Glyphs are shown in upper case.
    #[default]
    Upper,
    /// Glyphs are shown in lower case.
    Lower,
    /// Glyphs are shown exactly as they appear in the word list.
    Preserve,
}

impl Casing {
    /// Converts a glyph into its displayed form.
    ///
    /// Characters whose case mapping expands into several characters are
    /// left untouched so a glyph always stays a single character.
    #[must_use]
    pub fn apply(self, glyph: char) -> char {
        match self {
            Self::Upper => single_char(glyph.to_uppercase()).unwrap_or(glyph),
            Self::Lower => single_char(glyph.to_lowercase()).unwrap_or(glyph),
            Self::Preserve => glyph,
        }
    }
}

fn single_char(mut mapped: impl Iterator<Item = char>) -> Option<char> {
    let first = mapped.next()?;
    mapped.next().is_none().then_some(first)
}

/// Folds a glyph into the form used for case-insensitive comparisons.
#[must_use]
pub fn fold_case(glyph: char) -> char {
    single_char(glyph.to_lowercase()).unwrap_or(glyph)
}

/// Reports whether two glyphs are equal ignoring case.
#[must_use]
pub fn glyphs_match(left: char, right: char) -> bool {
    fold_case(left) == fold_case(right)
}

/// Letters of the configured language together with its display casing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alphabet {
    letters: Vec<char>,
    casing: Casing,
}

impl Alphabet {
    /// Builds an alphabet from the provided letters.
    ///
    /// Whitespace is ignored and letters are de-duplicated after case folding.
    #[must_use]
    pub fn new(letters: &str, casing: Casing) -> Self {
        let mut folded: Vec<char> = Vec::new();
        for glyph in letters.chars().filter(|glyph| !glyph.is_whitespace()) {
            let glyph = fold_case(glyph);
            if !folded.contains(&glyph) {
                folded.push(glyph);
            }
        }
        Self {
            letters: folded,
            casing,
        }
    }

    /// Case-folded letters available for noise spawns.
    #[must_use]
    pub fn letters(&self) -> &[char] {
        &self.letters
    }

    /// Casing rule applied to displayed glyphs.
    #[must_use]
    pub const fn casing(&self) -> Casing {
        self.casing
    }

    /// Converts a glyph into the form shown on the play-field.
    #[must_use]
    pub fn display(&self, glyph: char) -> char {
        self.casing.apply(glyph)
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::new(LATIN_ALPHABET, Casing::Upper)
    }
}

/// Round configuration read by the runtime on every frame.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundSettings {
    /// Difficulty tier used to look up the tuning profile.
    pub difficulty: Difficulty,
    /// Fall speed used to look up the tuning profile.
    pub speed: Speed,
    /// Probability that a spawn ignores the needed letters, clamped to `0.0..=0.5`.
    pub noise_level: f32,
    /// Alphabet noise glyphs are drawn from.
    pub alphabet: Alphabet,
}

impl RoundSettings {
    /// Noise level clamped into the supported range.
    #[must_use]
    pub fn clamped_noise_level(&self) -> f32 {
        if self.noise_level.is_nan() {
            return 0.0;
        }
        self.noise_level.clamp(0.0, MAX_NOISE_LEVEL)
    }

    /// Tuning profile selected by the current difficulty and speed.
    #[must_use]
    pub const fn tuning(&self) -> TuningProfile {
        TuningProfile::resolve(self.difficulty, self.speed)
    }
}

impl Default for RoundSettings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            speed: Speed::default(),
            noise_level: 0.25,
            alphabet: Alphabet::default(),
        }
    }
}

/// Size of the render surface glyphs fall across, in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Surface {
    width: f32,
    height: f32,
}

impl Surface {
    /// Creates a surface description; negative dimensions are treated as zero.
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// Width of the surface.
    #[must_use]
    pub const fn width(&self) -> f32 {
        self.width
    }

    /// Height of the surface.
    #[must_use]
    pub const fn height(&self) -> f32 {
        self.height
    }
}

/// Lifecycle phase of a round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundPhase {
    /// No round has been started.
    #[default]
    Idle,
    /// Glyphs fall and input is accepted.
    Playing,
    /// Timers are frozen until the round resumes.
    Paused,
    /// Every word was completed.
    Won,
    /// Credits were exhausted.
    Lost,
}

impl RoundPhase {
    /// Reports whether the phase ends the round.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

/// Operations on the round state machine, used when reporting rejected transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RoundAction {
    /// Collecting a glyph.
    Collect,
    /// Spending a credit on a missed glyph.
    Miss,
    /// Pausing the round.
    Pause,
    /// Resuming the round.
    Resume,
    /// Switching the active word.
    SelectWord,
}

/// Generational handle identifying a falling glyph inside the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlyphId {
    slot: u32,
    serial: u64,
}

impl GlyphId {
    /// Creates a handle for the provided slot and acquisition serial.
    #[must_use]
    pub const fn new(slot: u32, serial: u64) -> Self {
        Self { slot, serial }
    }

    /// Index of the pool slot backing the glyph.
    #[must_use]
    pub const fn slot(&self) -> u32 {
        self.slot
    }

    /// Monotonic serial assigned when the glyph was acquired.
    #[must_use]
    pub const fn serial(&self) -> u64 {
        self.serial
    }
}

/// A single glyph falling across the play-field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FallingGlyph {
    id: GlyphId,
    glyph: char,
    position: Vec2,
    velocity: f32,
    age: Duration,
    active: bool,
}

impl FallingGlyph {
    /// Creates an active glyph at the provided position.
    #[must_use]
    pub const fn spawn(id: GlyphId, glyph: char, position: Vec2, velocity: f32) -> Self {
        Self {
            id,
            glyph,
            position,
            velocity,
            age: Duration::ZERO,
            active: true,
        }
    }

    /// Handle identifying the glyph.
    #[must_use]
    pub const fn id(&self) -> GlyphId {
        self.id
    }

    /// Character carried by the glyph, in display casing.
    #[must_use]
    pub const fn glyph(&self) -> char {
        self.glyph
    }

    /// Current position in surface pixels.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Falling speed in surface pixels per second.
    #[must_use]
    pub const fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Time elapsed since the glyph spawned.
    #[must_use]
    pub const fn age(&self) -> Duration {
        self.age
    }

    /// Whether the glyph is currently on the field.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Moves the glyph down by `velocity × dt`.
    pub fn advance(&mut self, dt: Duration) {
        self.position.y += self.velocity * dt.as_secs_f32();
        self.age = self.age.saturating_add(dt);
    }

    /// Marks the glyph as removed from the field.
    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

/// A target word and the prefix the player already collected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordSlot {
    word: String,
    progress: String,
    found: bool,
}

impl WordSlot {
    /// Creates an empty slot for the provided word.
    #[must_use]
    pub fn new(word: impl Into<String>) -> Self {
        let word = word.into();
        let found = word.is_empty();
        Self {
            word,
            progress: String::new(),
            found,
        }
    }

    /// Word the player must spell.
    #[must_use]
    pub fn word(&self) -> &str {
        &self.word
    }

    /// Prefix of [`Self::word`] matched so far.
    #[must_use]
    pub fn progress(&self) -> &str {
        &self.progress
    }

    /// Whether every character of the word was collected.
    #[must_use]
    pub const fn is_found(&self) -> bool {
        self.found
    }

    /// Next character required to extend the word, if any remain.
    #[must_use]
    pub fn next_expected(&self) -> Option<char> {
        self.word[self.progress.len()..].chars().next()
    }

    /// Appends the next character when `glyph` matches it, ignoring case.
    ///
    /// Progress always stores the word's own characters, keeping it a literal
    /// prefix of the word.
    pub fn extend(&mut self, glyph: char) -> bool {
        let Some(expected) = self.next_expected() else {
            return false;
        };
        if !glyphs_match(expected, glyph) {
            return false;
        }
        self.progress.push(expected);
        self.found = self.progress.len() == self.word.len();
        true
    }

    /// Clears collected progress.
    pub fn reset(&mut self) {
        self.progress.clear();
        self.found = self.word.is_empty();
    }
}

/// Read-only projection of the round state consumed by systems every frame.
#[derive(Clone, Copy, Debug)]
pub struct RoundView<'a> {
    phase: RoundPhase,
    credits: u32,
    slots: &'a [WordSlot],
    active: Option<usize>,
    round: u64,
}

impl<'a> RoundView<'a> {
    /// Captures a view over the provided round state.
    #[must_use]
    pub const fn new(
        phase: RoundPhase,
        credits: u32,
        slots: &'a [WordSlot],
        active: Option<usize>,
        round: u64,
    ) -> Self {
        Self {
            phase,
            credits,
            slots,
            active,
            round,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Remaining credits.
    #[must_use]
    pub const fn credits(&self) -> u32 {
        self.credits
    }

    /// Word slots in round order.
    #[must_use]
    pub const fn slots(&self) -> &'a [WordSlot] {
        self.slots
    }

    /// Index of the active slot.
    #[must_use]
    pub const fn active_index(&self) -> Option<usize> {
        self.active
    }

    /// Slot the player is currently spelling.
    #[must_use]
    pub fn active_word(&self) -> Option<&'a WordSlot> {
        self.active.and_then(|index| self.slots.get(index))
    }

    /// Serial of the round, incremented on every start or restart.
    #[must_use]
    pub const fn round(&self) -> u64 {
        self.round
    }
}

/// Outcome of offering a collected glyph to the round state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollectResult {
    /// The glyph extended the active word.
    pub matched: bool,
    /// The glyph completed the active word.
    pub completed_word: bool,
    /// The glyph completed the last unfound word.
    pub round_won: bool,
}

impl CollectResult {
    /// Result for a glyph that did not extend the active word.
    pub const REJECTED: Self = Self {
        matched: false,
        completed_word: false,
        round_won: false,
    };
}

/// Commands that express every permissible round mutation.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Starts a new round by sampling words from the pool.
    StartRound {
        /// Candidate words for the round.
        pool: Vec<String>,
        /// Words played recently, avoided where possible.
        recent: Vec<String>,
    },
    /// Replays the current word set from scratch.
    Restart,
    /// Offers a collected glyph to the active word.
    CollectGlyph {
        /// Character carried by the collected glyph.
        glyph: char,
    },
    /// Spends a credit for a glyph that left the field uncollected.
    MissGlyph,
    /// Makes the provided unfound slot the active word.
    SelectWord {
        /// Index of the slot to activate.
        index: usize,
    },
    /// Freezes the round.
    Pause,
    /// Unfreezes the round.
    Resume,
    /// Discards the round and returns to idle.
    Abandon,
}

/// Events broadcast by the round state machine after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A round started or restarted.
    RoundStarted {
        /// Serial assigned to the round.
        round: u64,
        /// Words selected for the round.
        words: Vec<String>,
    },
    /// The round moved between phases.
    PhaseChanged {
        /// Phase before the transition.
        from: RoundPhase,
        /// Phase after the transition.
        to: RoundPhase,
    },
    /// A glyph extended the active word.
    GlyphAccepted {
        /// Collected character.
        glyph: char,
        /// Word that was extended.
        word: String,
        /// Number of characters matched after the glyph.
        matched: usize,
    },
    /// A glyph did not extend the active word.
    GlyphRejected {
        /// Collected character.
        glyph: char,
    },
    /// A word was completed.
    WordCompleted {
        /// Completed word.
        word: String,
    },
    /// The active word changed.
    ActiveWordChanged {
        /// New active word, if any remain.
        word: Option<String>,
    },
    /// A credit was spent on a missed glyph.
    CreditSpent {
        /// Credits left after the miss.
        remaining: u32,
    },
    /// The round ended and a snapshot was recorded.
    RoundFinished {
        /// Snapshot handed to the session sink.
        snapshot: SessionSnapshot,
    },
    /// A command was rejected without changing state.
    CommandRejected {
        /// Reason for the rejection.
        error: RoundError,
    },
}

/// How a round ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundResult {
    /// Every word was completed.
    Won,
    /// Credits ran out.
    Lost,
}

/// Final state of one word at the end of a round.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordOutcome {
    /// The target word.
    pub word: String,
    /// Whether the player completed it.
    pub found: bool,
}

/// Immutable record of a finished round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Serial of the finished round.
    pub round: u64,
    /// How the round ended.
    pub result: RoundResult,
    /// Per-word outcomes in round order.
    pub words: Vec<WordOutcome>,
    /// Credits left when the round ended.
    pub credits_remaining: u32,
    /// Wall-clock time the round ended.
    pub finished_at: SystemTime,
}

/// Collaborator that receives a snapshot whenever a round is won or lost.
pub trait SessionSink {
    /// Stores the snapshot of a finished round.
    fn record(&mut self, snapshot: SessionSnapshot);
}

impl SessionSink for Vec<SessionSnapshot> {
    fn record(&mut self, snapshot: SessionSnapshot) {
        self.push(snapshot);
    }
}

/// Failures reported by the glyph pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// Every slot is occupied by a falling glyph.
    #[error("glyph pool exhausted at capacity {capacity}")]
    Exhausted {
        /// Maximum number of glyphs the pool holds.
        capacity: usize,
    },
    /// The handle refers to a glyph that was already released.
    #[error("glyph {id:?} was already released")]
    DoubleRelease {
        /// Stale handle.
        id: GlyphId,
    },
}

/// Rejections reported by the round state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RoundError {
    /// The operation is not available in the current phase.
    #[error("cannot {action:?} while the round is {phase:?}")]
    InvalidTransition {
        /// Operation that was attempted.
        action: RoundAction,
        /// Phase the round was in.
        phase: RoundPhase,
    },
    /// The word pool contained no usable words.
    #[error("word pool contains no usable words")]
    EmptyWordPool,
    /// Restart was requested before any round was started.
    #[error("no round has been started yet")]
    NoRoundToRestart,
    /// The requested slot does not exist or was already found.
    #[error("word slot {index} does not exist or is already found")]
    UnknownWord {
        /// Requested slot index.
        index: usize,
    },
}
