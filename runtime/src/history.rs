use std::collections::VecDeque;

use glyph_rain_core::{RoundResult, SessionSink, SessionSnapshot};
use serde::Serialize;

const DEFAULT_CAPACITY: usize = 20;

/// Bounded record of the most recently finished rounds.
#[derive(Clone, Debug)]
pub struct SessionHistory {
    capacity: usize,
    rounds: VecDeque<SessionSnapshot>,
}

/// Aggregate figures over the retained rounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HistorySummary {
    /// Rounds retained.
    pub rounds: usize,
    /// Retained rounds that were won.
    pub wins: usize,
    /// Retained rounds that were lost.
    pub losses: usize,
    /// Most credits left over by a won round.
    pub best_credits: Option<u32>,
}

impl SessionHistory {
    /// Creates a history keeping at most `capacity` rounds (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            rounds: VecDeque::with_capacity(capacity),
        }
    }

    /// Retained rounds, oldest first.
    pub fn rounds(&self) -> impl Iterator<Item = &SessionSnapshot> {
        self.rounds.iter()
    }

    /// Most recently finished round.
    #[must_use]
    pub fn latest(&self) -> Option<&SessionSnapshot> {
        self.rounds.back()
    }

    /// Number of retained rounds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    /// Whether no round finished yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    /// Words of the latest round, to be avoided when sampling the next one.
    #[must_use]
    pub fn recent_words(&self) -> Vec<String> {
        self.latest()
            .map(|snapshot| {
                snapshot
                    .words
                    .iter()
                    .map(|outcome| outcome.word.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Tallies the retained rounds.
    #[must_use]
    pub fn summary(&self) -> HistorySummary {
        self.rounds
            .iter()
            .fold(HistorySummary::default(), |mut summary, snapshot| {
                summary.rounds += 1;
                match snapshot.result {
                    RoundResult::Won => {
                        summary.wins += 1;
                        summary.best_credits = summary
                            .best_credits
                            .max(Some(snapshot.credits_remaining));
                    }
                    RoundResult::Lost => summary.losses += 1,
                }
                summary
            })
    }
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SessionSink for SessionHistory {
    fn record(&mut self, snapshot: SessionSnapshot) {
        if self.rounds.len() == self.capacity {
            let _ = self.rounds.pop_front();
        }
        self.rounds.push_back(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use glyph_rain_core::WordOutcome;

    use super::*;

    fn snapshot(round: u64, result: RoundResult, credits_remaining: u32) -> SessionSnapshot {
        SessionSnapshot {
            round,
            result,
            words: vec![WordOutcome {
                word: format!("word{round}"),
                found: result == RoundResult::Won,
            }],
            credits_remaining,
            finished_at: SystemTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn oldest_rounds_are_evicted() {
        let mut history = SessionHistory::new(2);
        history.record(snapshot(1, RoundResult::Won, 80));
        history.record(snapshot(2, RoundResult::Lost, 0));
        history.record(snapshot(3, RoundResult::Won, 95));

        let rounds: Vec<u64> = history.rounds().map(|snapshot| snapshot.round).collect();
        assert_eq!(rounds, vec![2, 3]);
        assert_eq!(history.recent_words(), vec!["word3".to_owned()]);
    }

    #[test]
    fn summary_counts_results() {
        let mut history = SessionHistory::default();
        assert_eq!(history.summary(), HistorySummary::default());

        history.record(snapshot(1, RoundResult::Won, 80));
        history.record(snapshot(2, RoundResult::Lost, 0));
        history.record(snapshot(3, RoundResult::Won, 95));

        assert_eq!(
            history.summary(),
            HistorySummary {
                rounds: 3,
                wins: 2,
                losses: 1,
                best_credits: Some(95),
            }
        );
    }
}
