//! JSON interchange shapes for a whole practice snapshot.
//!
//! Timestamps are RFC 3339 instants, scores are plain floats in [0, 1].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::engine::ReviewEngine;
use crate::error::{EngineError, EngineResult};
use crate::selector::SelectionOptions;
use crate::stats::{PracticeActivity, StatisticsSummary};
use crate::types::{GroupBy, GroupKey, QuestionRecord, ReviewQueueEntry, SubjectWeekStats};

/// Input document: the questions plus optional evaluation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSnapshot {
    /// Evaluation instant; the caller's clock is used when absent
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
    #[serde(default)]
    pub config: Option<EngineConfig>,
    #[serde(default)]
    pub options: SelectionOptions,
    #[serde(default)]
    pub group_by: Option<GroupBy>,
    pub questions: Vec<QuestionRecord>,
}

impl PracticeSnapshot {
    pub fn from_json(raw: &str) -> EngineResult<Self> {
        let snapshot: Self = serde_json::from_str(raw)
            .map_err(|e| EngineError::Validation(format!("malformed practice snapshot: {e}")))?;
        if let Some(config) = &snapshot.config {
            config.validate()?;
        }
        Ok(snapshot)
    }
}

/// One aggregated group, flattened so it serializes as a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    pub subject: String,
    pub week: Option<String>,
    #[serde(flatten)]
    pub stats: SubjectWeekStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeReport {
    pub generated_at: DateTime<Utc>,
    pub queue: Vec<ReviewQueueEntry>,
    pub groups: Vec<GroupStats>,
    pub summary: StatisticsSummary,
    pub activity: PracticeActivity,
}

/// Queue, group statistics, summary and activity for one snapshot.
pub fn build_report(
    engine: &ReviewEngine,
    snapshot: &PracticeSnapshot,
    now: DateTime<Utc>,
) -> EngineResult<PracticeReport> {
    let queue = engine.select_practice_set(&snapshot.questions, now, &snapshot.options)?;
    let estimates = engine.estimates(&snapshot.questions, now)?;
    let groups = engine
        .aggregate(&estimates, snapshot.group_by.unwrap_or(GroupBy::Subject))
        .into_iter()
        .map(|(GroupKey { subject, week }, stats)| GroupStats {
            subject,
            week,
            stats,
        })
        .collect();

    Ok(PracticeReport {
        generated_at: now,
        queue,
        groups,
        summary: engine.summarize(&estimates),
        activity: engine.practice_activity(&snapshot.questions, now)?,
    })
}
