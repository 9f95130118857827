use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::sanitize::{require_non_negative, require_positive_count, require_unit};
use crate::types::{
    DEFAULT_DECAY_FACTOR, DEFAULT_FAIRNESS_WINDOW_DAYS, DEFAULT_FORGETTING_DECAY_FACTOR,
    DEFAULT_HISTORY_CAP, DEFAULT_STRONG_AREA_THRESHOLD, DEFAULT_WEAK_AREA_THRESHOLD,
};

/// Policy inputs for scoring, statistics and selection.
///
/// Every field has a public default constant in [`crate::types`]; nothing is
/// defaulted behind the caller's back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Per-day decay of individual attempt weights, in [0, 1]
    pub decay_factor: f64,
    /// Per-day decay applied since the last practice, in [0, 1]
    pub forgetting_decay_factor: f64,
    /// Maximum attempts kept per question, >= 1
    pub history_cap: usize,
    /// Days without practice before a question is force-prioritized, >= 0
    pub fairness_window_days: f64,
    /// Average mastery below which a group is weak, in [0, 1]
    pub weak_area_threshold: f64,
    /// Average mastery at or above which a subject is strong, in [0, 1]
    pub strong_area_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            decay_factor: DEFAULT_DECAY_FACTOR,
            forgetting_decay_factor: DEFAULT_FORGETTING_DECAY_FACTOR,
            history_cap: DEFAULT_HISTORY_CAP,
            fairness_window_days: DEFAULT_FAIRNESS_WINDOW_DAYS,
            weak_area_threshold: DEFAULT_WEAK_AREA_THRESHOLD,
            strong_area_threshold: DEFAULT_STRONG_AREA_THRESHOLD,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> EngineResult<()> {
        require_unit("decayFactor", self.decay_factor)?;
        require_unit("forgettingDecayFactor", self.forgetting_decay_factor)?;
        require_positive_count("historyCap", self.history_cap)?;
        require_non_negative("fairnessWindowDays", self.fairness_window_days)?;
        require_unit("weakAreaThreshold", self.weak_area_threshold)?;
        require_unit("strongAreaThreshold", self.strong_area_threshold)?;
        Ok(())
    }

    /// Parse a camelCase JSON object; missing fields take their defaults.
    pub fn from_json(raw: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| EngineError::Validation(format!("malformed engine config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `RECALL_*` environment variables.
    pub fn from_env() -> EngineResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(val) = lookup("RECALL_DECAY_FACTOR") {
            config.decay_factor = parse_var("RECALL_DECAY_FACTOR", &val)?;
        }
        if let Some(val) = lookup("RECALL_FORGETTING_DECAY_FACTOR") {
            config.forgetting_decay_factor = parse_var("RECALL_FORGETTING_DECAY_FACTOR", &val)?;
        }
        if let Some(val) = lookup("RECALL_HISTORY_CAP") {
            config.history_cap = parse_var("RECALL_HISTORY_CAP", &val)?;
        }
        if let Some(val) = lookup("RECALL_FAIRNESS_WINDOW_DAYS") {
            config.fairness_window_days = parse_var("RECALL_FAIRNESS_WINDOW_DAYS", &val)?;
        }
        if let Some(val) = lookup("RECALL_WEAK_AREA_THRESHOLD") {
            config.weak_area_threshold = parse_var("RECALL_WEAK_AREA_THRESHOLD", &val)?;
        }
        if let Some(val) = lookup("RECALL_STRONG_AREA_THRESHOLD") {
            config.strong_area_threshold = parse_var("RECALL_STRONG_AREA_THRESHOLD", &val)?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> EngineResult<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| EngineError::Validation(format!("{key} has unparseable value {raw:?}")))
}
