//! Progress aggregation: practice streaks and rolling score averages

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use tracing::debug;

use crate::error::Result;
use crate::storage::Storage;
use crate::types::{AverageScores, Feedback, ProgressSnapshot, Session, SessionRecord, UserId};

/// How many sessions a snapshot lists in `recent_sessions`
pub const RECENT_SESSION_LIMIT: usize = 10;

/// Derives progress from a user's history. Calendar days are taken in a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct ProgressAggregator {
    offset: FixedOffset,
}

impl Default for ProgressAggregator {
    fn default() -> Self {
        Self::utc()
    }
}

impl ProgressAggregator {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    /// Today's date in this aggregator's offset
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }

    pub fn aggregate(&self, history: &[SessionRecord], as_of: NaiveDate) -> ProgressSnapshot {
        let practice_days: BTreeSet<NaiveDate> = history
            .iter()
            .map(|record| record.session.created_at.with_timezone(&self.offset).date_naive())
            .collect();

        ProgressSnapshot {
            current_streak: current_streak(&practice_days, as_of),
            total_sessions: history.len() as u32,
            average_scores: average_scores(history),
            recent_sessions: recent_sessions(history),
        }
    }
}

/// Aggregate with UTC calendar days
pub fn aggregate(history: &[SessionRecord], as_of: NaiveDate) -> ProgressSnapshot {
    ProgressAggregator::utc().aggregate(history, as_of)
}

/// Consecutive practice days ending today, or ending yesterday if today has no session yet
pub fn current_streak(practice_days: &BTreeSet<NaiveDate>, as_of: NaiveDate) -> u32 {
    let start = if practice_days.contains(&as_of) {
        Some(as_of)
    } else {
        as_of.pred_opt().filter(|day| practice_days.contains(day))
    };

    let mut streak = 0;
    let mut day = start;
    while let Some(current) = day.filter(|d| practice_days.contains(d)) {
        streak += 1;
        day = current.pred_opt();
    }
    streak
}

/// The newest sessions of an oldest-first history, newest first
pub fn recent_sessions(history: &[SessionRecord]) -> Vec<Session> {
    history
        .iter()
        .rev()
        .take(RECENT_SESSION_LIMIT)
        .map(|record| record.session.clone())
        .collect()
}

/// Per-dimension mean over every feedback report; zeros when there are none
pub fn average_scores(history: &[SessionRecord]) -> AverageScores {
    let reports: Vec<_> = history
        .iter()
        .filter_map(|record| record.feedback.as_ref())
        .collect();

    if reports.is_empty() {
        return AverageScores::default();
    }

    let n = reports.len() as f64;
    let mean = |score: fn(&Feedback) -> f64| {
        reports.iter().map(|f| score(f)).sum::<f64>() / n
    };

    AverageScores {
        clarity: mean(|f| f.clarity_score),
        confidence: mean(|f| f.confidence_score),
        empathy: mean(|f| f.empathy_score),
        pacing: mean(|f| f.pacing_score),
    }
}

/// Loads a user's history from storage and aggregates it
pub struct ProgressService {
    storage: Arc<Storage>,
    aggregator: ProgressAggregator,
}

impl ProgressService {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            storage,
            aggregator: ProgressAggregator::default(),
        }
    }

    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.aggregator = ProgressAggregator::new(offset);
        self
    }

    pub fn aggregator(&self) -> &ProgressAggregator {
        &self.aggregator
    }

    pub fn snapshot(&self, user_id: &UserId, as_of: NaiveDate) -> Result<ProgressSnapshot> {
        let history = self.storage.get_session_history(user_id)?;
        let snapshot = self.aggregator.aggregate(&history, as_of);
        debug!(
            "Progress for user {}: {} sessions, {} day streak",
            user_id, snapshot.total_sessions, snapshot.current_streak
        );
        Ok(snapshot)
    }
}
