//! Score Calculator
//!
//! Turns a question's attempt history into a mastery estimate and validates
//! new attempts before they are appended.
//!
//! Mastery:
//! - M_base = Σ(s_i * w_i) / Σ(w_i), w_i = exp(-d * age_i)
//! - M = M_base * exp(-f * t_last), clamped to [0, 1]
//!
//! A single strong recent attempt can outweigh several weak old ones, and the
//! forgetting term still acts on a question with one old attempt.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::config::EngineConfig;
use crate::decay::{age_in_days, forgetting_projection, recency_weight};
use crate::error::{EngineError, EngineResult};
use crate::types::{
    is_unit_score, AttemptRecord, MasteryEstimate, QuestionHistory, QuestionRecord, EPSILON,
    MAX_RATING, MIN_RATING,
};

/// Map a learner grade on the 1..=5 scale onto [0, 1].
pub fn score_from_rating(rating: u8) -> EngineResult<f64> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(EngineError::Validation(format!(
            "rating must be between {MIN_RATING} and {MAX_RATING}, got {rating}"
        )));
    }
    Ok(f64::from(rating - MIN_RATING) / f64::from(MAX_RATING - MIN_RATING))
}

/// Days between the last attempt and `now`; `None` for an empty history.
pub fn days_since_last_practice(
    history: &QuestionHistory,
    now: DateTime<Utc>,
) -> EngineResult<Option<f64>> {
    let Some(last) = history.last_answered_at() else {
        return Ok(None);
    };
    let days = age_in_days(last, now);
    if days < 0.0 {
        return Err(EngineError::InvalidInput(format!(
            "last attempt at {last} lies after evaluation time {now}"
        )));
    }
    Ok(Some(days))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCalculator {
    decay_factor: f64,
    forgetting_decay_factor: f64,
    history_cap: usize,
}

impl ScoreCalculator {
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            decay_factor: config.decay_factor,
            forgetting_decay_factor: config.forgetting_decay_factor,
            history_cap: config.history_cap,
        })
    }

    pub fn history_cap(&self) -> usize {
        self.history_cap
    }

    /// Validate an attempt and return the history with it appended.
    ///
    /// The input history is never modified. When the result would exceed the
    /// history cap, the oldest attempts are evicted.
    ///
    /// # Errors
    /// `Validation` when `score` is outside [0, 1] or `answered_at` precedes
    /// the last recorded attempt. Equal timestamps are accepted.
    pub fn record_attempt(
        &self,
        history: &QuestionHistory,
        score: f64,
        answered_at: DateTime<Utc>,
        user_answer: impl Into<String>,
    ) -> EngineResult<QuestionHistory> {
        if !is_unit_score(score) {
            return Err(EngineError::Validation(format!(
                "score must be within [0, 1], got {score}"
            )));
        }
        if let Some(last) = history.last_answered_at() {
            if answered_at < last {
                return Err(EngineError::Validation(format!(
                    "attempt at {answered_at} precedes the last recorded attempt at {last}"
                )));
            }
        }

        let mut next = history.clone();
        next.push_unchecked(
            AttemptRecord {
                score,
                answered_at,
                user_answer: user_answer.into(),
            },
            self.history_cap,
        );

        if history.len() + 1 > next.len() {
            trace!(
                evicted = history.len() + 1 - next.len(),
                cap = self.history_cap,
                "history cap reached, oldest attempts evicted"
            );
        }

        Ok(next)
    }

    /// Current mastery for `history` as seen at `now`.
    ///
    /// # Errors
    /// `InvalidInput` when any attempt lies after `now`.
    pub fn compute_mastery(
        &self,
        history: &QuestionHistory,
        now: DateTime<Utc>,
    ) -> EngineResult<MasteryEstimate> {
        let Some(days_since_last) = days_since_last_practice(history, now)? else {
            return Ok(MasteryEstimate::never_practiced(now));
        };

        // Ages are measured relative to the newest attempt: the common factor
        // exp(-d * t_last) cancels in the weighted mean.
        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;
        for attempt in history.iter() {
            let age = age_in_days(attempt.answered_at, now);
            let relative_age = (age - days_since_last).max(0.0);
            let weight = recency_weight(relative_age, self.decay_factor)?;
            weighted_sum += attempt.score * weight;
            total_weight += weight;
        }

        let base_mastery = if total_weight > EPSILON {
            weighted_sum / total_weight
        } else {
            0.0
        };
        let value = forgetting_projection(
            base_mastery,
            days_since_last,
            self.forgetting_decay_factor,
        )?;

        debug!(
            attempts = history.len(),
            base_mastery,
            days_since_last,
            value,
            "mastery computed"
        );

        Ok(MasteryEstimate {
            value: Some(value),
            computed_at: now,
        })
    }

    /// Compute mastery for many questions in parallel, preserving input order.
    pub fn batch_compute_mastery(
        &self,
        records: &[QuestionRecord],
        now: DateTime<Utc>,
    ) -> EngineResult<Vec<MasteryEstimate>> {
        records
            .par_iter()
            .map(|record| {
                self.compute_mastery(&record.history, now).map_err(|err| match err {
                    EngineError::InvalidInput(msg) => {
                        EngineError::InvalidInput(format!("{}: {msg}", record.id))
                    }
                    other => other,
                })
            })
            .collect()
    }
}
