//! Decay Model
//!
//! Two independent decay mechanisms:
//! - Recency weighting: how much an old attempt still counts when forming
//!   today's mastery estimate
//! - Forgetting projection: how much that estimate has eroded since the
//!   question was last practiced
//!
//! Mathematical formulas:
//! - Recency weight: w = exp(-d * age)
//!   - age: days between the attempt and the evaluation instant
//!   - d: decay factor in [0, 1]
//!
//! - Forgetting projection: M = clamp(M_base * exp(-f * t), 0, 1)
//!   - t: days since the last practice
//!   - f: forgetting decay factor in [0, 1]

use chrono::{DateTime, Utc};

use crate::error::{EngineError, EngineResult};
use crate::sanitize::clamp_unit;
use crate::types::MILLIS_PER_DAY;

/// Fractional days from `from` to `now`, at millisecond resolution.
///
/// Negative when `from` lies after `now`.
pub fn age_in_days(from: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - from).num_milliseconds() as f64 / MILLIS_PER_DAY
}

/// Weight of an attempt that is `age_in_days` old.
///
/// # Errors
/// `InvalidInput` for a negative or non-finite age (clock skew, future
/// timestamp).
pub fn recency_weight(age_in_days: f64, decay_factor: f64) -> EngineResult<f64> {
    check_elapsed("ageInDays", age_in_days)?;
    Ok((-decay_factor * age_in_days).exp())
}

/// Mastery remaining after `days_since_last_practice` without review.
///
/// # Errors
/// `InvalidInput` for a negative or non-finite elapsed time.
pub fn forgetting_projection(
    base_mastery: f64,
    days_since_last_practice: f64,
    forgetting_decay_factor: f64,
) -> EngineResult<f64> {
    check_elapsed("daysSinceLastPractice", days_since_last_practice)?;
    let projected = base_mastery * (-forgetting_decay_factor * days_since_last_practice).exp();
    Ok(clamp_unit(projected))
}

fn check_elapsed(name: &str, days: f64) -> EngineResult<()> {
    if days.is_nan() || days.is_infinite() || days < 0.0 {
        return Err(EngineError::InvalidInput(format!(
            "{name} must be a finite value >= 0, got {days}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn test_recency_weight_at_zero_age_is_one() {
        assert!((recency_weight(0.0, 0.1).unwrap() - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_recency_weight_matches_exponential() {
        let w = recency_weight(10.0, 0.1).unwrap();
        assert!((w - (-1.0f64).exp()).abs() < TOLERANCE);
    }

    #[test]
    fn test_recency_weight_decreases_with_age() {
        let recent = recency_weight(1.0, 0.1).unwrap();
        let old = recency_weight(30.0, 0.1).unwrap();
        assert!(recent > old);
    }

    #[test]
    fn test_recency_weight_zero_decay_is_flat() {
        assert_eq!(recency_weight(365.0, 0.0).unwrap(), 1.0);
    }

    #[test]
    fn test_recency_weight_rejects_negative_age() {
        let err = recency_weight(-0.5, 0.1).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn test_recency_weight_rejects_nan_age() {
        assert!(recency_weight(f64::NAN, 0.1).is_err());
    }

    #[test]
    fn test_forgetting_projection_one_day() {
        let m = forgetting_projection(0.838, 1.0, 0.05).unwrap();
        assert!((m - 0.838 * (-0.05f64).exp()).abs() < TOLERANCE);
    }

    #[test]
    fn test_forgetting_projection_no_elapsed_time() {
        assert_eq!(forgetting_projection(0.7, 0.0, 0.5).unwrap(), 0.7);
    }

    #[test]
    fn test_forgetting_projection_is_clamped() {
        assert_eq!(forgetting_projection(1.2, 0.0, 0.05).unwrap(), 1.0);
        assert_eq!(forgetting_projection(-0.2, 3.0, 0.05).unwrap(), 0.0);
    }

    #[test]
    fn test_forgetting_projection_rejects_negative_days() {
        let err = forgetting_projection(0.5, -1.0, 0.05).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn test_age_in_days_fractional() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let now = start + Duration::hours(36);
        assert!((age_in_days(start, now) - 1.5).abs() < TOLERANCE);
        assert!((age_in_days(now, start) + 1.5).abs() < TOLERANCE);
    }
}
