use serde::{Deserialize, Serialize};

use crate::error::TrackerError;
use crate::types::{ActivityRecord, ActivityStore, ActivityType, BreakEvaluation, StudyEvaluation};

/// Break totals above this are an emergency
pub const BREAK_EMERGENCY_HOURS: f64 = 3.0;

/// Break totals above this (and up to the emergency line) are a warning
pub const BREAK_WARNING_HOURS: f64 = 2.5;

/// Sum of hours logged in one bucket; 0.0 when the bucket does not exist
pub fn total_hours(store: &ActivityStore, date_key: &str, activity: ActivityType) -> f64 {
    store
        .get(date_key)
        .map(|day| {
            day.bucket(activity)
                .iter()
                .fold(0.0, |total, record| total + record.hours)
        })
        .unwrap_or(0.0)
}

/// Append a record at the end of a bucket, creating the day if needed.
///
/// Non-positive (or NaN) hours are rejected and the store is left untouched.
pub fn append_record(
    store: &mut ActivityStore,
    date_key: &str,
    activity: ActivityType,
    hours: f64,
    memo: &str,
    timestamp: &str,
) -> Result<(), TrackerError> {
    if hours.is_nan() || hours <= 0.0 {
        return Err(TrackerError::NonPositiveDuration(hours));
    }

    store
        .entry(date_key.to_string())
        .or_default()
        .bucket_mut(activity)
        .push(ActivityRecord::new(hours, memo, timestamp));
    Ok(())
}

/// Empty one bucket, leaving the other activity type and other dates alone
pub fn reset_bucket(store: &mut ActivityStore, date_key: &str, activity: ActivityType) {
    if let Some(day) = store.get_mut(date_key) {
        day.bucket_mut(activity).clear();
    }
}

pub fn evaluate_study(total_hours: f64, target_hours: f64) -> StudyEvaluation {
    if total_hours <= 0.0 {
        StudyEvaluation::Unset
    } else if total_hours >= target_hours {
        StudyEvaluation::Good
    } else {
        StudyEvaluation::Bad
    }
}

pub fn evaluate_break(total_hours: f64) -> BreakEvaluation {
    if total_hours > BREAK_EMERGENCY_HOURS {
        BreakEvaluation::Emergency
    } else if total_hours > BREAK_WARNING_HOURS {
        BreakEvaluation::Warning
    } else {
        BreakEvaluation::Normal
    }
}

/// One press of the time stepper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Plus30,
    Plus5,
    Minus30,
}

impl Step {
    pub fn minutes(self) -> i64 {
        match self {
            Step::Plus30 => 30,
            Step::Plus5 => 5,
            Step::Minus30 => -30,
        }
    }
}

/// Hours chosen with the stepper but not yet logged.
///
/// Kept as whole minutes so repeated 5-minute steps never drift.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingHours {
    minutes: u32,
}

impl PendingHours {
    /// Apply a step, clamping at zero
    pub fn apply(&mut self, step: Step) {
        let next = i64::from(self.minutes) + step.minutes();
        self.minutes = u32::try_from(next.max(0)).unwrap_or(u32::MAX);
    }

    pub fn clear(&mut self) {
        self.minutes = 0;
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    pub fn hours(&self) -> f64 {
        f64::from(self.minutes) / 60.0
    }
}
