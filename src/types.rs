//! Common Types and Constants
//!
//! Shared data structures used across the scoring, statistics and selection
//! modules.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

// ==================== Constants ====================

/// Default recency decay applied to individual attempts (per day)
pub const DEFAULT_DECAY_FACTOR: f64 = 0.1;

/// Default forgetting decay applied since the last practice (per day)
pub const DEFAULT_FORGETTING_DECAY_FACTOR: f64 = 0.05;

/// Default maximum number of attempts kept per question
pub const DEFAULT_HISTORY_CAP: usize = 50;

/// Default number of days a question may go unreviewed before it is forced up
pub const DEFAULT_FAIRNESS_WINDOW_DAYS: f64 = 14.0;

/// Default average mastery below which a group is a weak area
pub const DEFAULT_WEAK_AREA_THRESHOLD: f64 = 0.6;

/// Default average mastery at or above which a subject is a strong area
pub const DEFAULT_STRONG_AREA_THRESHOLD: f64 = 0.8;

/// Lowest grade on the learner-facing rating scale
pub const MIN_RATING: u8 = 1;

/// Highest grade on the learner-facing rating scale
pub const MAX_RATING: u8 = 5;

/// Milliseconds in one day
pub const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Numerical stability epsilon
pub const EPSILON: f64 = 1e-10;

// ==================== Question Identity ====================

/// Identity of one question: `(owner, subject, week, index)`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionId {
    pub owner_id: String,
    pub subject: String,
    pub week: String,
    pub index: u32,
}

impl QuestionId {
    pub fn new(
        owner_id: impl Into<String>,
        subject: impl Into<String>,
        week: impl Into<String>,
        index: u32,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            subject: subject.into(),
            week: week.into(),
            index,
        }
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.owner_id, self.subject, self.week, self.index
        )
    }
}

// ==================== Attempt History ====================

/// One practice attempt. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    /// Score in [0, 1]
    pub score: f64,
    /// Absolute instant the answer was submitted
    pub answered_at: DateTime<Utc>,
    /// Free-text answer given by the learner
    #[serde(default)]
    pub user_answer: String,
}

/// Attempts for one question, ascending by `answered_at`.
///
/// Only [`crate::score::ScoreCalculator::record_attempt`] produces longer
/// histories; entries are never reordered or edited.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<AttemptRecord>", into = "Vec<AttemptRecord>")]
pub struct QuestionHistory {
    attempts: VecDeque<AttemptRecord>,
}

impl QuestionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a history from stored attempts, checking range and ordering.
    pub fn from_attempts(attempts: Vec<AttemptRecord>) -> EngineResult<Self> {
        let mut previous: Option<DateTime<Utc>> = None;
        for (i, attempt) in attempts.iter().enumerate() {
            if !is_unit_score(attempt.score) {
                return Err(EngineError::Validation(format!(
                    "attempt {i} has score {} outside [0, 1]",
                    attempt.score
                )));
            }
            if let Some(prev) = previous {
                if attempt.answered_at < prev {
                    return Err(EngineError::Validation(format!(
                        "attempt {i} at {} precedes the previous attempt at {prev}",
                        attempt.answered_at
                    )));
                }
            }
            previous = Some(attempt.answered_at);
        }
        Ok(Self {
            attempts: attempts.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttemptRecord> {
        self.attempts.iter()
    }

    pub fn first(&self) -> Option<&AttemptRecord> {
        self.attempts.front()
    }

    pub fn last(&self) -> Option<&AttemptRecord> {
        self.attempts.back()
    }

    pub fn last_answered_at(&self) -> Option<DateTime<Utc>> {
        self.attempts.back().map(|a| a.answered_at)
    }

    /// Append without validation; callers check range and ordering first.
    pub(crate) fn push_unchecked(&mut self, attempt: AttemptRecord, cap: usize) {
        self.attempts.push_back(attempt);
        while self.attempts.len() > cap {
            self.attempts.pop_front();
        }
    }
}

impl TryFrom<Vec<AttemptRecord>> for QuestionHistory {
    type Error = EngineError;

    fn try_from(attempts: Vec<AttemptRecord>) -> Result<Self, Self::Error> {
        Self::from_attempts(attempts)
    }
}

impl From<QuestionHistory> for Vec<AttemptRecord> {
    fn from(history: QuestionHistory) -> Self {
        history.attempts.into()
    }
}

/// A question together with its attempt history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub id: QuestionId,
    #[serde(default)]
    pub history: QuestionHistory,
}

impl QuestionRecord {
    pub fn new(id: QuestionId, history: QuestionHistory) -> Self {
        Self { id, history }
    }
}

// ==================== Mastery ====================

/// Current belief about how well a question is known.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryEstimate {
    /// Mastery in [0, 1]; `None` when the question was never practiced
    pub value: Option<f64>,
    pub computed_at: DateTime<Utc>,
}

impl MasteryEstimate {
    pub fn never_practiced(computed_at: DateTime<Utc>) -> Self {
        Self {
            value: None,
            computed_at,
        }
    }

    pub fn is_practiced(&self) -> bool {
        self.value.is_some()
    }
}

// ==================== Statistics ====================

/// Grouping used by [`crate::stats::StatisticsAggregator::aggregate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupBy {
    Subject,
    SubjectWeek,
}

/// Key of one aggregated group. `week` is `None` for subject-level groups.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupKey {
    pub subject: String,
    pub week: Option<String>,
}

/// A `(subject, week)` pair flagged as weak.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeakArea {
    pub subject: String,
    pub week: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectWeekStats {
    pub total_questions: usize,
    pub practiced_questions: usize,
    /// Mean mastery of practiced questions; `None` when none were practiced
    pub average_score: Option<f64>,
    /// Whether this group itself is below the weak-area threshold
    pub is_weak: bool,
    pub weak_areas: BTreeSet<WeakArea>,
}

// ==================== Review Queue ====================

/// Why a question was placed in the review queue. Declaration order is band order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewReason {
    NeverPracticed,
    Overdue,
    LowMastery,
}

impl ReviewReason {
    pub fn band(&self) -> u8 {
        match self {
            ReviewReason::NeverPracticed => 0,
            ReviewReason::Overdue => 1,
            ReviewReason::LowMastery => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewReason::NeverPracticed => "NEVER_PRACTICED",
            ReviewReason::Overdue => "OVERDUE",
            ReviewReason::LowMastery => "LOW_MASTERY",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQueueEntry {
    pub question_id: QuestionId,
    /// Higher sorts first within a band; `+inf` for never-practiced questions,
    /// written as `null` in JSON
    #[serde(with = "unbounded_priority")]
    pub priority: f64,
    pub reason: ReviewReason,
    pub mastery: Option<f64>,
    pub days_since_last_practice: Option<f64>,
}

/// JSON has no infinity: `+inf` maps to `null` and back.
mod unbounded_priority {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(priority: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if priority.is_finite() {
            serializer.serialize_some(priority)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

/// True when `score` is a finite value in [0, 1].
pub fn is_unit_score(score: f64) -> bool {
    score.is_finite() && (0.0..=1.0).contains(&score)
}
