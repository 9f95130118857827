//! Practice Selector ("smart practice")
//!
//! Builds an ordered review queue from a question set and the current time.
//!
//! Bands, in queue order:
//! - NEVER_PRACTICED: no attempts yet, priority +inf
//! - OVERDUE: unreviewed for longer than the fairness window, regardless of
//!   mastery; priority = days since last practice
//! - LOW_MASTERY: everything else, priority = 1 - mastery
//!
//! Within a band: higher priority first, then longer since last practice,
//! then original input position. The overdue band guarantees that no
//! question is starved, independent of how the decay factors are tuned.

use std::cmp::Ordering;

use chrono::{DateTime, Datelike, Utc};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::sanitize::require_unit;
use crate::score::{days_since_last_practice, ScoreCalculator};
use crate::types::{QuestionRecord, ReviewQueueEntry, ReviewReason};

/// Queue ordering mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum PracticeOrder {
    /// Band and priority ordering
    #[default]
    Smart,
    /// Input order
    Sequential,
    /// Deterministic shuffle of the input order
    Shuffled { seed: u64 },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectionOptions {
    pub subject: Option<String>,
    pub week: Option<String>,
    /// Drop low-mastery questions above this mastery; never-practiced and
    /// overdue questions are always kept
    pub max_mastery: Option<f64>,
    pub limit: Option<usize>,
    pub order: PracticeOrder,
}

/// Seed that stays fixed for one UTC calendar day.
pub fn daily_seed(now: DateTime<Utc>) -> u64 {
    u64::try_from(now.date_naive().num_days_from_ce()).unwrap_or_default()
}

#[derive(Debug, Clone)]
struct Scored {
    position: usize,
    entry: ReviewQueueEntry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PracticeSelector {
    calculator: ScoreCalculator,
    fairness_window_days: f64,
}

impl PracticeSelector {
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        Ok(Self {
            calculator: ScoreCalculator::new(config)?,
            fairness_window_days: config.fairness_window_days,
        })
    }

    /// Ordered review queue for `questions` as seen at `now`.
    ///
    /// Pure: identical inputs always give the identical queue.
    ///
    /// # Errors
    /// `Validation` for a `max_mastery` outside [0, 1]; `InvalidInput` when a
    /// history contains an attempt after `now`.
    pub fn select_practice_set(
        &self,
        questions: &[QuestionRecord],
        now: DateTime<Utc>,
        options: &SelectionOptions,
    ) -> EngineResult<Vec<ReviewQueueEntry>> {
        if let Some(ceiling) = options.max_mastery {
            require_unit("maxMastery", ceiling)?;
        }

        let candidates: Vec<(usize, &QuestionRecord)> = questions
            .iter()
            .enumerate()
            .filter(|(_, q)| matches_filter(q, options))
            .collect();

        let scored: Vec<Scored> = candidates
            .par_iter()
            .map(|&(position, record)| self.score(position, record, now))
            .collect::<EngineResult<Vec<_>>>()?;

        let mut scored: Vec<Scored> = match options.max_mastery {
            Some(ceiling) => scored
                .into_iter()
                .filter(|s| within_ceiling(&s.entry, ceiling))
                .collect(),
            None => scored,
        };

        match options.order {
            PracticeOrder::Smart => scored.sort_by(compare_scored),
            PracticeOrder::Sequential => {}
            PracticeOrder::Shuffled { seed } => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                scored.shuffle(&mut rng);
            }
        }

        if let Some(limit) = options.limit {
            scored.truncate(limit);
        }

        debug!(
            candidates = candidates.len(),
            selected = scored.len(),
            order = ?options.order,
            "practice set selected"
        );

        Ok(scored.into_iter().map(|s| s.entry).collect())
    }

    fn score(
        &self,
        position: usize,
        record: &QuestionRecord,
        now: DateTime<Utc>,
    ) -> EngineResult<Scored> {
        let with_id = |err: EngineError| match err {
            EngineError::InvalidInput(msg) => {
                EngineError::InvalidInput(format!("{}: {msg}", record.id))
            }
            other => other,
        };

        let estimate = self
            .calculator
            .compute_mastery(&record.history, now)
            .map_err(with_id)?;
        let days_since = days_since_last_practice(&record.history, now).map_err(with_id)?;
        let (reason, priority) = self.classify(estimate.value, days_since);

        Ok(Scored {
            position,
            entry: ReviewQueueEntry {
                question_id: record.id.clone(),
                priority,
                reason,
                mastery: estimate.value,
                days_since_last_practice: days_since,
            },
        })
    }

    fn classify(&self, mastery: Option<f64>, days_since: Option<f64>) -> (ReviewReason, f64) {
        match (mastery, days_since) {
            (Some(_), Some(days)) if days > self.fairness_window_days => {
                (ReviewReason::Overdue, days)
            }
            (Some(value), _) => (ReviewReason::LowMastery, 1.0 - value),
            (None, _) => (ReviewReason::NeverPracticed, f64::INFINITY),
        }
    }
}

fn matches_filter(record: &QuestionRecord, options: &SelectionOptions) -> bool {
    let subject_ok = options
        .subject
        .as_deref()
        .map_or(true, |s| record.id.subject == s);
    let week_ok = options
        .week
        .as_deref()
        .map_or(true, |w| record.id.week == w);
    subject_ok && week_ok
}

fn within_ceiling(entry: &ReviewQueueEntry, ceiling: f64) -> bool {
    match entry.reason {
        ReviewReason::NeverPracticed | ReviewReason::Overdue => true,
        ReviewReason::LowMastery => entry.mastery.map_or(true, |m| m <= ceiling),
    }
}

fn compare_scored(a: &Scored, b: &Scored) -> Ordering {
    a.entry
        .reason
        .band()
        .cmp(&b.entry.reason.band())
        .then_with(|| b.entry.priority.total_cmp(&a.entry.priority))
        .then_with(|| {
            let da = a.entry.days_since_last_practice.unwrap_or(f64::INFINITY);
            let db = b.entry.days_since_last_practice.unwrap_or(f64::INFINITY);
            db.total_cmp(&da)
        })
        .then_with(|| a.position.cmp(&b.position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttemptRecord, QuestionHistory, QuestionId};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap()
    }

    fn question(subject: &str, week: &str, index: u32, attempts: &[(f64, i64)]) -> QuestionRecord {
        let attempts = attempts
            .iter()
            .map(|&(score, days_ago)| AttemptRecord {
                score,
                answered_at: now() - Duration::days(days_ago),
                user_answer: String::new(),
            })
            .collect();
        QuestionRecord::new(
            QuestionId::new("owner", subject, week, index),
            QuestionHistory::from_attempts(attempts).unwrap(),
        )
    }

    fn selector() -> PracticeSelector {
        PracticeSelector::new(&EngineConfig {
            fairness_window_days: 14.0,
            ..Default::default()
        })
        .unwrap()
    }

    fn indices(queue: &[ReviewQueueEntry]) -> Vec<u32> {
        queue.iter().map(|e| e.question_id.index).collect()
    }

    #[test]
    fn test_bands_order_never_overdue_low_mastery() {
        let questions = vec![
            question("bio", "1", 0, &[(0.2, 1)]),
            question("bio", "1", 1, &[(1.0, 30)]),
            question("bio", "1", 2, &[]),
        ];
        let queue = selector()
            .select_practice_set(&questions, now(), &SelectionOptions::default())
            .unwrap();

        assert_eq!(indices(&queue), vec![2, 1, 0]);
        assert_eq!(queue[0].reason, ReviewReason::NeverPracticed);
        assert!(queue[0].priority.is_infinite());
        assert_eq!(queue[1].reason, ReviewReason::Overdue);
        assert_eq!(queue[2].reason, ReviewReason::LowMastery);
    }

    #[test]
    fn test_low_mastery_sorted_lowest_first() {
        let questions = vec![
            question("bio", "1", 0, &[(0.9, 1)]),
            question("bio", "1", 1, &[(0.1, 1)]),
            question("bio", "1", 2, &[(0.5, 1)]),
        ];
        let queue = selector()
            .select_practice_set(&questions, now(), &SelectionOptions::default())
            .unwrap();
        assert_eq!(indices(&queue), vec![1, 2, 0]);
        assert!((queue[0].priority - (1.0 - queue[0].mastery.unwrap())).abs() < 1e-12);
    }

    #[test]
    fn test_overdue_band_ignores_high_mastery() {
        let questions = vec![
            question("bio", "1", 0, &[(0.0, 2)]),
            question("bio", "1", 1, &[(1.0, 20)]),
        ];
        let queue = selector()
            .select_practice_set(&questions, now(), &SelectionOptions::default())
            .unwrap();
        assert_eq!(queue[0].question_id.index, 1);
        assert_eq!(queue[0].reason, ReviewReason::Overdue);
    }

    #[test]
    fn test_overdue_band_most_stale_first() {
        let questions = vec![
            question("bio", "1", 0, &[(0.5, 20)]),
            question("bio", "1", 1, &[(0.5, 40)]),
        ];
        let queue = selector()
            .select_practice_set(&questions, now(), &SelectionOptions::default())
            .unwrap();
        assert_eq!(indices(&queue), vec![1, 0]);
    }

    #[test]
    fn test_ties_broken_by_input_position() {
        let questions = vec![
            question("bio", "1", 7, &[]),
            question("bio", "1", 3, &[]),
            question("chem", "1", 5, &[(0.4, 2)]),
            question("chem", "1", 1, &[(0.4, 2)]),
        ];
        let queue = selector()
            .select_practice_set(&questions, now(), &SelectionOptions::default())
            .unwrap();
        assert_eq!(indices(&queue), vec![7, 3, 5, 1]);
    }

    #[test]
    fn test_filters_apply_before_scoring() {
        let questions = vec![
            question("bio", "1", 0, &[]),
            question("bio", "2", 1, &[]),
            question("chem", "1", 2, &[]),
            // would fail scoring if it were not filtered out
            question("chem", "2", 3, &[(0.5, -3)]),
        ];
        let options = SelectionOptions {
            subject: Some("bio".into()),
            ..Default::default()
        };
        let queue = selector().select_practice_set(&questions, now(), &options).unwrap();
        assert_eq!(indices(&queue), vec![0, 1]);

        let options = SelectionOptions {
            week: Some("1".into()),
            ..Default::default()
        };
        let queue = selector().select_practice_set(&questions, now(), &options).unwrap();
        assert_eq!(indices(&queue), vec![0, 2]);
    }

    #[test]
    fn test_future_attempt_is_invalid_input() {
        let questions = vec![question("bio", "1", 0, &[(0.5, -1)])];
        let result = selector().select_practice_set(&questions, now(), &SelectionOptions::default());
        assert!(matches!(result, Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn test_limit_applies_after_sorting() {
        let questions = vec![
            question("bio", "1", 0, &[(0.9, 1)]),
            question("bio", "1", 1, &[(0.1, 1)]),
            question("bio", "1", 2, &[]),
        ];
        let options = SelectionOptions {
            limit: Some(2),
            ..Default::default()
        };
        let queue = selector().select_practice_set(&questions, now(), &options).unwrap();
        assert_eq!(indices(&queue), vec![2, 1]);
    }

    #[test]
    fn test_max_mastery_keeps_unpracticed_and_weak() {
        let questions = vec![
            question("bio", "1", 0, &[(0.95, 0)]),
            question("bio", "1", 1, &[(0.3, 0)]),
            question("bio", "1", 2, &[]),
        ];
        let options = SelectionOptions {
            max_mastery: Some(0.5),
            ..Default::default()
        };
        let queue = selector().select_practice_set(&questions, now(), &options).unwrap();
        assert_eq!(indices(&queue), vec![2, 1]);
    }

    #[test]
    fn test_max_mastery_never_drops_overdue_question() {
        let selector = PracticeSelector::new(&EngineConfig {
            fairness_window_days: 14.0,
            forgetting_decay_factor: 0.0,
            ..Default::default()
        })
        .unwrap();
        let questions = vec![
            question("bio", "1", 0, &[(0.9, 100)]),
            question("bio", "1", 1, &[(0.2, 1)]),
        ];
        let options = SelectionOptions {
            max_mastery: Some(0.5),
            ..Default::default()
        };

        let queue = selector.select_practice_set(&questions, now(), &options).unwrap();
        assert_eq!(indices(&queue), vec![0, 1]);
        assert_eq!(queue[0].reason, ReviewReason::Overdue);
        assert!(queue[0].mastery.unwrap() > 0.5);
    }

    #[test]
    fn test_max_mastery_out_of_range_rejected() {
        let options = SelectionOptions {
            max_mastery: Some(1.5),
            ..Default::default()
        };
        let result = selector().select_practice_set(&[], now(), &options);
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    #[test]
    fn test_sequential_order_keeps_input_order() {
        let questions = vec![
            question("bio", "1", 0, &[(0.9, 1)]),
            question("bio", "1", 1, &[]),
            question("bio", "1", 2, &[(0.1, 1)]),
        ];
        let options = SelectionOptions {
            order: PracticeOrder::Sequential,
            ..Default::default()
        };
        let queue = selector().select_practice_set(&questions, now(), &options).unwrap();
        assert_eq!(indices(&queue), vec![0, 1, 2]);
        assert_eq!(queue[1].reason, ReviewReason::NeverPracticed);
    }

    #[test]
    fn test_shuffled_order_is_deterministic_per_seed() {
        let questions: Vec<QuestionRecord> =
            (0..12).map(|i| question("bio", "1", i, &[])).collect();
        let options = SelectionOptions {
            order: PracticeOrder::Shuffled {
                seed: daily_seed(now()),
            },
            ..Default::default()
        };
        let first = selector().select_practice_set(&questions, now(), &options).unwrap();
        let second = selector().select_practice_set(&questions, now(), &options).unwrap();
        assert_eq!(first, second);

        let mut sorted = indices(&first);
        sorted.sort_unstable();
        assert_eq!(sorted, (0..12).collect::<Vec<u32>>());
    }

    #[test]
    fn test_daily_seed_changes_by_day_only() {
        let morning = Utc.with_ymd_and_hms(2024, 9, 1, 1, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2024, 9, 1, 23, 0, 0).unwrap();
        let next_day = Utc.with_ymd_and_hms(2024, 9, 2, 1, 0, 0).unwrap();
        assert_eq!(daily_seed(morning), daily_seed(evening));
        assert_ne!(daily_seed(morning), daily_seed(next_day));
    }

    #[test]
    fn test_zero_fairness_window_marks_any_gap_overdue() {
        let selector = PracticeSelector::new(&EngineConfig {
            fairness_window_days: 0.0,
            ..Default::default()
        })
        .unwrap();
        let questions = vec![
            question("bio", "1", 0, &[(0.5, 0)]),
            question("bio", "1", 1, &[(0.9, 1)]),
        ];
        let queue = selector
            .select_practice_set(&questions, now(), &SelectionOptions::default())
            .unwrap();
        assert_eq!(queue[0].reason, ReviewReason::Overdue);
        assert_eq!(queue[1].reason, ReviewReason::LowMastery);
    }
}
