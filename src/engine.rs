//! Review Engine - single entry point over scoring, statistics and selection.
//!
//! Holds one validated [`EngineConfig`] and hands out the pure operations.
//! `submit_attempt` is the only method that talks to a collaborator, and
//! only through the [`HistoryStore`] seam.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::score::ScoreCalculator;
use crate::selector::{PracticeSelector, SelectionOptions};
use crate::stats::{practice_activity, PracticeActivity, StatisticsAggregator, StatisticsSummary};
use crate::store::{HistoryStore, StoreError};
use crate::types::{
    GroupBy, GroupKey, MasteryEstimate, QuestionHistory, QuestionId, QuestionRecord,
    ReviewQueueEntry, SubjectWeekStats,
};

#[derive(Debug, Clone)]
pub struct ReviewEngine {
    config: EngineConfig,
    calculator: ScoreCalculator,
    aggregator: StatisticsAggregator,
    selector: PracticeSelector,
}

impl ReviewEngine {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            calculator: ScoreCalculator::new(&config)?,
            aggregator: StatisticsAggregator::new(&config)?,
            selector: PracticeSelector::new(&config)?,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn record_attempt(
        &self,
        history: &QuestionHistory,
        score: f64,
        answered_at: DateTime<Utc>,
        user_answer: impl Into<String>,
    ) -> EngineResult<QuestionHistory> {
        self.calculator
            .record_attempt(history, score, answered_at, user_answer)
    }

    pub fn compute_mastery(
        &self,
        history: &QuestionHistory,
        now: DateTime<Utc>,
    ) -> EngineResult<MasteryEstimate> {
        self.calculator.compute_mastery(history, now)
    }

    /// Mastery of every question, paired with its identity, in input order.
    pub fn estimates(
        &self,
        records: &[QuestionRecord],
        now: DateTime<Utc>,
    ) -> EngineResult<Vec<(QuestionId, MasteryEstimate)>> {
        let estimates = self.calculator.batch_compute_mastery(records, now)?;
        Ok(records
            .iter()
            .map(|r| r.id.clone())
            .zip(estimates)
            .collect())
    }

    pub fn aggregate(
        &self,
        estimates: &[(QuestionId, MasteryEstimate)],
        group_by: GroupBy,
    ) -> BTreeMap<GroupKey, SubjectWeekStats> {
        self.aggregator.aggregate(estimates, group_by)
    }

    pub fn summarize(&self, estimates: &[(QuestionId, MasteryEstimate)]) -> StatisticsSummary {
        self.aggregator.summarize(estimates)
    }

    pub fn select_practice_set(
        &self,
        questions: &[QuestionRecord],
        now: DateTime<Utc>,
        options: &SelectionOptions,
    ) -> EngineResult<Vec<ReviewQueueEntry>> {
        self.selector.select_practice_set(questions, now, options)
    }

    pub fn practice_activity(
        &self,
        records: &[QuestionRecord],
        now: DateTime<Utc>,
    ) -> EngineResult<PracticeActivity> {
        practice_activity(records, now)
    }

    /// Load, validate, append and write back one attempt.
    ///
    /// Validation happens before the write, so a rejected attempt leaves the
    /// store untouched. A `VersionConflict` means another writer got there
    /// first; the caller decides whether to reload and retry.
    pub fn submit_attempt<S: HistoryStore + ?Sized>(
        &self,
        store: &S,
        id: &QuestionId,
        score: f64,
        answered_at: DateTime<Utc>,
        user_answer: impl Into<String>,
    ) -> Result<QuestionHistory, StoreError> {
        let current = store.load(id)?;
        let next = self
            .calculator
            .record_attempt(&current.history, score, answered_at, user_answer)?;

        match store.compare_and_swap(id, current.version, next.clone()) {
            Ok(version) => {
                debug!(question = %id, version, attempts = next.len(), "attempt stored");
                Ok(next)
            }
            Err(err) => {
                warn!(question = %id, error = %err, "attempt not stored");
                Err(err)
            }
        }
    }
}
