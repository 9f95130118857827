//! Statistics Aggregator
//!
//! Rolls per-question mastery estimates up into subject and subject/week
//! summaries, flags weak areas, and reports practice activity (streaks,
//! recent questions).
//!
//! Weak-area flags are for surfacing to the learner only; the practice
//! selector ranks individual questions and never reads group averages.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::types::{
    GroupBy, GroupKey, MasteryEstimate, QuestionId, QuestionRecord, SubjectWeekStats, WeakArea,
};

/// Trailing window for `attempts_last_30_days`
pub const ACTIVITY_WINDOW_DAYS: i64 = 30;

/// Number of most recently practiced questions in an activity report
pub const RECENT_ACTIVITY_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSummary {
    pub total_questions: usize,
    pub practiced_questions: usize,
    pub average_score: Option<f64>,
    pub weak_subjects: Vec<String>,
    pub strong_subjects: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub question_id: QuestionId,
    pub last_practiced: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeActivity {
    pub total_attempts: usize,
    /// Mean raw attempt score, not decay-weighted
    pub average_attempt_score: Option<f64>,
    pub last_active: Option<DateTime<Utc>>,
    /// Consecutive UTC days with practice, ending today
    pub streak_days: u32,
    pub attempts_last_30_days: usize,
    pub recent: Vec<RecentActivity>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    total: usize,
    practiced: usize,
    sum: f64,
}

impl Accumulator {
    fn add(&mut self, value: Option<f64>) {
        self.total += 1;
        if let Some(v) = value {
            self.practiced += 1;
            self.sum += v;
        }
    }

    fn merge(&mut self, other: &Accumulator) {
        self.total += other.total;
        self.practiced += other.practiced;
        self.sum += other.sum;
    }

    fn average(&self) -> Option<f64> {
        if self.practiced == 0 {
            None
        } else {
            Some(self.sum / self.practiced as f64)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsAggregator {
    weak_area_threshold: f64,
    strong_area_threshold: f64,
}

impl StatisticsAggregator {
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            weak_area_threshold: config.weak_area_threshold,
            strong_area_threshold: config.strong_area_threshold,
        })
    }

    fn is_weak(&self, average: Option<f64>) -> bool {
        matches!(average, Some(avg) if avg < self.weak_area_threshold)
    }

    /// Summarize estimates per subject or per subject/week.
    ///
    /// Averages cover practiced questions only; a group without any reports
    /// `average_score: None` and is never weak.
    pub fn aggregate(
        &self,
        estimates: &[(QuestionId, MasteryEstimate)],
        group_by: GroupBy,
    ) -> BTreeMap<GroupKey, SubjectWeekStats> {
        let mut cells: BTreeMap<(String, String), Accumulator> = BTreeMap::new();
        for (id, estimate) in estimates {
            cells
                .entry((id.subject.clone(), id.week.clone()))
                .or_default()
                .add(estimate.value);
        }

        let groups = match group_by {
            GroupBy::SubjectWeek => cells
                .into_iter()
                .map(|((subject, week), acc)| {
                    let average = acc.average();
                    let is_weak = self.is_weak(average);
                    let mut weak_areas = BTreeSet::new();
                    if is_weak {
                        weak_areas.insert(WeakArea {
                            subject: subject.clone(),
                            week: week.clone(),
                        });
                    }
                    let key = GroupKey {
                        subject,
                        week: Some(week),
                    };
                    (key, stats_from(&acc, is_weak, weak_areas))
                })
                .collect(),
            GroupBy::Subject => {
                let mut subjects: BTreeMap<String, (Accumulator, BTreeSet<WeakArea>)> =
                    BTreeMap::new();
                for ((subject, week), acc) in &cells {
                    let entry = subjects.entry(subject.clone()).or_default();
                    entry.0.merge(acc);
                    if self.is_weak(acc.average()) {
                        entry.1.insert(WeakArea {
                            subject: subject.clone(),
                            week: week.clone(),
                        });
                    }
                }
                subjects
                    .into_iter()
                    .map(|(subject, (acc, weak_areas))| {
                        let is_weak = self.is_weak(acc.average());
                        let key = GroupKey {
                            subject,
                            week: None,
                        };
                        (key, stats_from(&acc, is_weak, weak_areas))
                    })
                    .collect()
            }
        };

        debug!(
            questions = estimates.len(),
            group_by = ?group_by,
            "statistics aggregated"
        );
        groups
    }

    /// Overall totals plus weak and strong subjects.
    pub fn summarize(&self, estimates: &[(QuestionId, MasteryEstimate)]) -> StatisticsSummary {
        let mut overall = Accumulator::default();
        for (_, estimate) in estimates {
            overall.add(estimate.value);
        }

        let by_subject = self.aggregate(estimates, GroupBy::Subject);
        let mut weak_subjects = Vec::new();
        let mut strong_subjects = Vec::new();
        for (key, stats) in &by_subject {
            if stats.is_weak {
                weak_subjects.push(key.subject.clone());
            } else if matches!(stats.average_score, Some(avg) if avg >= self.strong_area_threshold)
            {
                strong_subjects.push(key.subject.clone());
            }
        }

        StatisticsSummary {
            total_questions: overall.total,
            practiced_questions: overall.practiced,
            average_score: overall.average(),
            weak_subjects,
            strong_subjects,
        }
    }
}

fn stats_from(acc: &Accumulator, is_weak: bool, weak_areas: BTreeSet<WeakArea>) -> SubjectWeekStats {
    SubjectWeekStats {
        total_questions: acc.total,
        practiced_questions: acc.practiced,
        average_score: acc.average(),
        is_weak,
        weak_areas,
    }
}

/// Attempt counts, streak and recently practiced questions as of `now`.
///
/// # Errors
/// `InvalidInput` when an attempt lies after `now`.
pub fn practice_activity(
    records: &[QuestionRecord],
    now: DateTime<Utc>,
) -> EngineResult<PracticeActivity> {
    let window_start = now - Duration::days(ACTIVITY_WINDOW_DAYS);
    let mut total_attempts = 0usize;
    let mut score_sum = 0.0;
    let mut attempts_last_30_days = 0usize;
    let mut practice_days: HashSet<NaiveDate> = HashSet::new();
    let mut recent: Vec<RecentActivity> = Vec::new();

    for record in records {
        if let Some(last) = record.history.last_answered_at() {
            if last > now {
                return Err(EngineError::InvalidInput(format!(
                    "{}: last attempt at {last} lies after evaluation time {now}",
                    record.id
                )));
            }
            recent.push(RecentActivity {
                question_id: record.id.clone(),
                last_practiced: last,
            });
        }
        for attempt in record.history.iter() {
            total_attempts += 1;
            score_sum += attempt.score;
            if attempt.answered_at >= window_start {
                attempts_last_30_days += 1;
            }
            practice_days.insert(attempt.answered_at.date_naive());
        }
    }

    let last_active = recent.iter().map(|r| r.last_practiced).max();
    recent.sort_by(|a, b| b.last_practiced.cmp(&a.last_practiced));
    recent.truncate(RECENT_ACTIVITY_LIMIT);

    Ok(PracticeActivity {
        total_attempts,
        average_attempt_score: if total_attempts == 0 {
            None
        } else {
            Some(score_sum / total_attempts as f64)
        },
        last_active,
        streak_days: streak_ending(&practice_days, now.date_naive()),
        attempts_last_30_days,
        recent,
    })
}

fn streak_ending(days: &HashSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut streak = 0u32;
    let mut cursor = today;
    while days.contains(&cursor) {
        streak += 1;
        match cursor.pred_opt() {
            Some(prev) => cursor = prev,
            None => break,
        }
    }
    streak
}
