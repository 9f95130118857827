#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use recall_engine::{AttemptRecord, QuestionHistory, QuestionId, QuestionRecord};

pub const OWNER: &str = "learner-1";

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
}

pub fn day(n: f64) -> DateTime<Utc> {
    epoch() + Duration::milliseconds((n * 86_400_000.0).round() as i64)
}

pub fn qid(subject: &str, week: &str, index: u32) -> QuestionId {
    QuestionId::new(OWNER, subject, week, index)
}

/// History from `(score, day)` pairs, oldest first.
pub fn history(attempts: &[(f64, f64)]) -> QuestionHistory {
    QuestionHistory::from_attempts(
        attempts
            .iter()
            .map(|&(score, d)| AttemptRecord {
                score,
                answered_at: day(d),
                user_answer: String::new(),
            })
            .collect(),
    )
    .expect("fixture history must be valid")
}

pub fn record(subject: &str, week: &str, index: u32, attempts: &[(f64, f64)]) -> QuestionRecord {
    QuestionRecord::new(qid(subject, week, index), history(attempts))
}
