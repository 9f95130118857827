//! Input Sanitization
//!
//! Range checks shared by the config layer and the scoring functions.
//!
//! Functions:
//! - Unit-interval and non-negative validation
//! - Clamping into [0, 1]

use crate::error::{EngineError, EngineResult};
use crate::types::is_unit_score;

/// 将数值限制在 [0, 1]，NaN 视为 0
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// 校验取值位于 [0, 1]
pub fn require_unit(name: &str, value: f64) -> EngineResult<f64> {
    if is_unit_score(value) {
        Ok(value)
    } else {
        Err(EngineError::Validation(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

/// 校验取值为有限非负数
pub fn require_non_negative(name: &str, value: f64) -> EngineResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(EngineError::Validation(format!(
            "{name} must be a finite value >= 0, got {value}"
        )))
    }
}

/// 校验计数至少为 1
pub fn require_positive_count(name: &str, value: usize) -> EngineResult<usize> {
    if value >= 1 {
        Ok(value)
    } else {
        Err(EngineError::Validation(format!("{name} must be >= 1")))
    }
}
