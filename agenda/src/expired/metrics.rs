//! Achievement metrics frozen into expired-deadline records

use chrono::{DateTime, Utc};

use crate::error::{DecisionError, DecisionResult};

/// `current / target * 100`. A zero target has no meaningful rate.
pub fn achievement_rate(current_score: u32, target_score: u32) -> DecisionResult<f64> {
    if target_score == 0 {
        return Err(DecisionError::validation("target score must be greater than 0"));
    }
    Ok(f64::from(current_score) * 100.0 / f64::from(target_score))
}

/// Whole days elapsed since `deadline`; 0 if it has not passed.
pub fn days_overdue(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - deadline).num_days().max(0)
}
