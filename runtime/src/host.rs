use glyph_rain_core::{CollectResult, Command, Event, RoundView, SessionSink};
use glyph_rain_world::{apply, query, WordMatchEngine};

use crate::RoundHost;

/// [`RoundHost`] backed by a [`WordMatchEngine`].
///
/// Events produced while the runtime calls back into the engine are buffered
/// until the caller drains them.
#[derive(Debug)]
pub struct EngineHost<S> {
    engine: WordMatchEngine<S>,
    events: Vec<Event>,
    nudges: u64,
}

impl<S: SessionSink> EngineHost<S> {
    /// Wraps the provided engine.
    #[must_use]
    pub fn new(engine: WordMatchEngine<S>) -> Self {
        Self {
            engine,
            events: Vec::new(),
            nudges: 0,
        }
    }

    /// Applies a command to the wrapped engine, buffering resulting events.
    pub fn apply(&mut self, command: Command) {
        apply(&mut self.engine, command, &mut self.events);
    }

    /// Wrapped engine.
    #[must_use]
    pub fn engine(&self) -> &WordMatchEngine<S> {
        &self.engine
    }

    /// Mutable access to the wrapped engine.
    pub fn engine_mut(&mut self) -> &mut WordMatchEngine<S> {
        &mut self.engine
    }

    /// Events buffered since the last drain.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Takes every buffered event.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Number of fairness nudges received.
    #[must_use]
    pub fn nudges(&self) -> u64 {
        self.nudges
    }
}

impl<S: SessionSink> RoundHost for EngineHost<S> {
    fn round(&self) -> RoundView<'_> {
        query::round_view(&self.engine)
    }

    fn glyph_collected(&mut self, glyph: char) -> CollectResult {
        self.engine.collect_glyph(glyph, &mut self.events)
    }

    fn glyph_missed(&mut self) {
        if let Err(error) = self.engine.miss_glyph(&mut self.events) {
            log::debug!("miss ignored: {error}");
        }
    }

    fn fairness_nudge(&mut self) {
        self.nudges += 1;
    }
}
