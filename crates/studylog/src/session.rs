//! Application state and the command handlers that mutate it
//!
//! A [`Session`] owns the in-memory store and the pending-hours steppers.
//! Handlers mutate it in place; callers decide when to persist and redraw.

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use tracing::{debug, warn};

use crate::activity::{self, PendingHours, Step};
use crate::format::format_duration;
use crate::schedule::{classify, is_scheduled_item, schedule_for, target_study_hours};
use crate::types::{
    clock_stamp, date_key, ActivityRecord, ActivityType, AppData, BreakEvaluation, DayType,
    ReviewEntry, StudyEvaluation,
};

/// Per-activity steppers for hours not yet logged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingSteppers {
    study: PendingHours,
    rest: PendingHours,
}

impl PendingSteppers {
    pub fn get(&self, activity: ActivityType) -> PendingHours {
        match activity {
            ActivityType::Study => self.study,
            ActivityType::Break => self.rest,
        }
    }

    fn get_mut(&mut self, activity: ActivityType) -> &mut PendingHours {
        match activity {
            ActivityType::Study => &mut self.study,
            ActivityType::Break => &mut self.rest,
        }
    }
}

#[derive(Debug, Default)]
pub struct Session {
    pub data: AppData,
    pub pending: PendingSteppers,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChecklistItemView {
    pub id: &'static str,
    pub label: &'static str,
    pub target_time: &'static str,
    pub checked: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityView {
    pub records: Vec<ActivityRecord>,
    pub total_hours: f64,
    pub total_display: String,
    pub pending_hours: f64,
    pub pending_display: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingView {
    pub activity_type: ActivityType,
    pub hours: f64,
    pub display: String,
}

/// Everything needed to draw one day
#[derive(Debug, Clone, Serialize)]
pub struct DayView {
    pub date: String,
    pub day_type: DayType,
    pub checklist: Vec<ChecklistItemView>,
    pub study: ActivityView,
    pub study_target_hours: f64,
    pub study_evaluation: StudyEvaluation,
    #[serde(rename = "break")]
    pub rest: ActivityView,
    pub break_evaluation: BreakEvaluation,
    pub review: Option<ReviewEntry>,
}

impl Session {
    pub fn new(data: AppData) -> Self {
        Self {
            data,
            pending: PendingSteppers::default(),
        }
    }

    /// Set a checklist flag. Items outside the day's schedule are ignored.
    pub fn toggle_checklist_item(&mut self, date: NaiveDate, item_id: &str, checked: bool) -> bool {
        let day_type = classify(date);
        if !is_scheduled_item(day_type, item_id) {
            warn!(date = %date, item = item_id, day_type = %day_type, "Ignoring unknown checklist item");
            return false;
        }

        self.data
            .checklist
            .entry(date_key(date))
            .or_default()
            .insert(item_id.to_string(), checked);
        true
    }

    pub fn adjust_pending(&mut self, activity: ActivityType, step: Step) -> PendingView {
        self.pending.get_mut(activity).apply(step);
        self.pending_view(activity)
    }

    pub fn pending_view(&self, activity: ActivityType) -> PendingView {
        let pending = self.pending.get(activity);
        PendingView {
            activity_type: activity,
            hours: pending.hours(),
            display: format_duration(pending.hours()),
        }
    }

    /// Log the pending hours for `activity` and clear its stepper.
    ///
    /// Returns false (and changes nothing) when nothing is pending.
    pub fn append_activity(
        &mut self,
        date: NaiveDate,
        activity: ActivityType,
        memo: &str,
        now: NaiveTime,
    ) -> bool {
        let key = date_key(date);
        let hours = self.pending.get(activity).hours();

        match activity::append_record(
            &mut self.data.activities,
            &key,
            activity,
            hours,
            memo,
            &clock_stamp(now),
        ) {
            Ok(()) => {
                self.pending.get_mut(activity).clear();
                debug!(date = %key, activity = %activity, hours, "Activity logged");
                true
            }
            Err(e) => {
                debug!(date = %key, activity = %activity, error = %e, "Append ignored");
                false
            }
        }
    }

    pub fn reset_bucket(&mut self, date: NaiveDate, activity: ActivityType) {
        let key = date_key(date);
        activity::reset_bucket(&mut self.data.activities, &key, activity);
        self.pending.get_mut(activity).clear();
        debug!(date = %key, activity = %activity, "Bucket reset");
    }

    /// Overwrite the day's review. Blank content keeps the existing one.
    pub fn save_review(&mut self, date: NaiveDate, content: &str, now: NaiveTime) -> bool {
        if content.trim().is_empty() {
            return false;
        }

        self.data.reviews.insert(
            date_key(date),
            ReviewEntry {
                content: content.to_string(),
                timestamp: clock_stamp(now),
            },
        );
        true
    }

    pub fn day_view(&self, date: NaiveDate) -> DayView {
        let key = date_key(date);
        let day_type = classify(date);
        let checked = self.data.checklist.get(&key);

        let checklist = schedule_for(day_type)
            .iter()
            .map(|item| ChecklistItemView {
                id: item.id,
                label: item.label,
                target_time: item.target_time,
                checked: checked
                    .and_then(|items| items.get(item.id))
                    .copied()
                    .unwrap_or(false),
            })
            .collect();

        let study = self.activity_view(&key, ActivityType::Study);
        let rest = self.activity_view(&key, ActivityType::Break);
        let study_target_hours = target_study_hours(day_type);

        DayView {
            study_evaluation: activity::evaluate_study(study.total_hours, study_target_hours),
            break_evaluation: activity::evaluate_break(rest.total_hours),
            review: self.data.reviews.get(&key).cloned(),
            date: key,
            day_type,
            checklist,
            study,
            study_target_hours,
            rest,
        }
    }

    fn activity_view(&self, key: &str, activity: ActivityType) -> ActivityView {
        let records = self
            .data
            .activities
            .get(key)
            .map(|day| day.bucket(activity).to_vec())
            .unwrap_or_default();
        let total_hours = activity::total_hours(&self.data.activities, key, activity);
        let pending = self.pending.get(activity);

        ActivityView {
            records,
            total_hours,
            total_display: format_duration(total_hours),
            pending_hours: pending.hours(),
            pending_display: format_duration(pending.hours()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-02-05 is a Monday, 2024-02-06 a Tuesday
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 5).unwrap()
    }

    fn tuesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 6).unwrap()
    }

    fn at(hour: u32, min: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, min, 0).unwrap()
    }

    #[test]
    fn test_toggle_known_item() {
        let mut session = Session::default();
        assert!(session.toggle_checklist_item(monday(), "tkd", true));
        assert_eq!(session.data.checklist["2024-02-05"]["tkd"], true);

        assert!(session.toggle_checklist_item(monday(), "tkd", false));
        assert_eq!(session.data.checklist["2024-02-05"]["tkd"], false);
    }

    #[test]
    fn test_toggle_item_outside_schedule_ignored() {
        let mut session = Session::default();
        assert!(!session.toggle_checklist_item(tuesday(), "tkd", true));
        assert!(session.data.checklist.is_empty());
    }

    #[test]
    fn test_day_view_defaults_unchecked() {
        let mut session = Session::default();
        session.toggle_checklist_item(monday(), "wake", true);

        let view = session.day_view(monday());
        assert_eq!(view.day_type, DayType::Mwf);
        assert_eq!(view.checklist.len(), 8);
        assert!(view.checklist[0].checked);
        assert!(view.checklist[1..].iter().all(|item| !item.checked));
    }

    #[test]
    fn test_append_uses_pending_and_clears_it() {
        let mut session = Session::default();
        session.adjust_pending(ActivityType::Study, Step::Plus30);
        session.adjust_pending(ActivityType::Study, Step::Plus30);
        session.adjust_pending(ActivityType::Study, Step::Plus5);

        assert!(session.append_activity(monday(), ActivityType::Study, "calculus", at(9, 15)));

        let record = &session.data.activities["2024-02-05"].study[0];
        assert_eq!(record.memo, "calculus");
        assert_eq!(record.timestamp, "09:15");
        assert!((record.hours - 65.0 / 60.0).abs() < 1e-9);
        assert_eq!(session.pending.get(ActivityType::Study).minutes(), 0);
    }

    #[test]
    fn test_append_with_nothing_pending_is_noop() {
        let mut session = Session::default();
        assert!(!session.append_activity(monday(), ActivityType::Break, "nap", at(14, 0)));
        assert!(session.data.activities.is_empty());
    }

    #[test]
    fn test_steppers_are_independent() {
        let mut session = Session::default();
        session.adjust_pending(ActivityType::Study, Step::Plus30);
        let view = session.adjust_pending(ActivityType::Break, Step::Plus5);

        assert_eq!(view.display, "0 hours 5 minutes");
        assert_eq!(session.pending.get(ActivityType::Study).minutes(), 30);
    }

    #[test]
    fn test_reset_clears_bucket_and_stepper() {
        let mut session = Session::default();
        session.adjust_pending(ActivityType::Break, Step::Plus30);
        session.append_activity(monday(), ActivityType::Break, "lunch", at(12, 0));
        session.adjust_pending(ActivityType::Break, Step::Plus30);

        session.reset_bucket(monday(), ActivityType::Break);

        assert!(session.data.activities["2024-02-05"].rest.is_empty());
        assert_eq!(session.pending.get(ActivityType::Break).minutes(), 0);
    }

    #[test]
    fn test_review_overwritten() {
        let mut session = Session::default();
        assert!(session.save_review(monday(), "first draft", at(21, 0)));
        assert!(session.save_review(monday(), "final", at(22, 30)));

        let review = &session.data.reviews["2024-02-05"];
        assert_eq!(review.content, "final");
        assert_eq!(review.timestamp, "22:30");
        assert_eq!(session.data.reviews.len(), 1);
    }

    #[test]
    fn test_blank_review_keeps_existing() {
        let mut session = Session::default();
        session.save_review(monday(), "kept", at(21, 0));
        assert!(!session.save_review(monday(), "   ", at(22, 0)));
        assert_eq!(session.data.reviews["2024-02-05"].content, "kept");
    }

    #[test]
    fn test_day_view_evaluations() {
        let mut session = Session::default();
        for _ in 0..19 {
            session.adjust_pending(ActivityType::Study, Step::Plus30);
        }
        session.append_activity(tuesday(), ActivityType::Study, "", at(20, 0));
        for _ in 0..6 {
            session.adjust_pending(ActivityType::Break, Step::Plus30);
        }
        session.append_activity(tuesday(), ActivityType::Break, "", at(20, 5));

        let view = session.day_view(tuesday());
        assert_eq!(view.day_type, DayType::Tt);
        assert_eq!(view.study_target_hours, 9.5);
        assert_eq!(view.study.total_hours, 9.5);
        assert_eq!(view.study_evaluation, StudyEvaluation::Good);
        assert_eq!(view.rest.total_hours, 3.0);
        assert_eq!(view.break_evaluation, BreakEvaluation::Warning);
        assert_eq!(view.rest.total_display, "3 hours");
    }

    #[test]
    fn test_empty_day_view() {
        let session = Session::default();
        let view = session.day_view(tuesday());
        assert_eq!(view.study_evaluation, StudyEvaluation::Unset);
        assert_eq!(view.break_evaluation, BreakEvaluation::Normal);
        assert!(view.study.records.is_empty());
        assert!(view.review.is_none());
    }
}
