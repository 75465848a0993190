use chrono::{Datelike, NaiveDate, Weekday};

use crate::types::{DayType, ScheduleItem};

const fn item(id: &'static str, label: &'static str, target_time: &'static str) -> ScheduleItem {
    ScheduleItem {
        id,
        label,
        target_time,
    }
}

const MWF: &[ScheduleItem] = &[
    item("wake", "Wake up (6:00)", "6:00"),
    item("sleep", "Sleep (7:00)", "7:00"),
    item("class", "Class (3:30)", "3:30"),
    item("meal", "Meals and rest (3:00 max)", "3:00"),
    item("tkd", "Taekwondo (1:30 max)", "1:30"),
    item("study", "Study (8:00 min)", "8:00"),
    item("screen", "Class screen recording checked", "-"),
    item("focus", "No off-task device use", "-"),
];

const TT: &[ScheduleItem] = &[
    item("wake", "Wake up (6:00)", "6:00"),
    item("sleep", "Sleep (7:00)", "7:00"),
    item("class", "Class (3:30)", "3:30"),
    item("meal", "Meals and rest (3:00 max)", "3:00"),
    item("study", "Study (9:30 min)", "9:30"),
    item("screen", "Class screen recording checked", "-"),
    item("focus", "No off-task device use", "-"),
];

const SATURDAY: &[ScheduleItem] = &[
    item("wake", "Wake up (6:00)", "6:00"),
    item("sleep", "Sleep (7:00)", "7:00"),
    item("class", "Class (10:30)", "10:30"),
    item("meal", "Meals and rest (3:30)", "3:30"),
    item("study", "Study (3:00)", "3:00"),
    item("screen", "Class screen recording checked", "-"),
    item("focus", "No off-task device use", "-"),
];

const SUNDAY: &[ScheduleItem] = &[
    item("wake", "Wake up (6:00)", "6:00"),
    item("sleep", "Sleep (7:00)", "7:00"),
    item("meal", "Meals and rest (4:00)", "4:00"),
    item("study", "Study (11:00 min)", "11:00"),
    item("focus", "No off-task device use", "-"),
];

/// Schedule category for a date, from its weekday alone
pub fn classify(date: NaiveDate) -> DayType {
    match date.weekday() {
        Weekday::Sun => DayType::Sunday,
        Weekday::Sat => DayType::Saturday,
        Weekday::Mon | Weekday::Wed | Weekday::Fri => DayType::Mwf,
        Weekday::Tue | Weekday::Thu => DayType::Tt,
    }
}

/// Checklist items of a day type, in display order
pub fn schedule_for(day_type: DayType) -> &'static [ScheduleItem] {
    match day_type {
        DayType::Mwf => MWF,
        DayType::Tt => TT,
        DayType::Saturday => SATURDAY,
        DayType::Sunday => SUNDAY,
    }
}

/// Study hours a day type must reach to be evaluated GOOD
pub fn target_study_hours(day_type: DayType) -> f64 {
    match day_type {
        DayType::Mwf => 8.0,
        DayType::Tt => 9.5,
        DayType::Saturday => 3.0,
        DayType::Sunday => 11.0,
    }
}

pub fn is_scheduled_item(day_type: DayType, item_id: &str) -> bool {
    schedule_for(day_type).iter().any(|item| item.id == item_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(day_type: DayType) -> Vec<&'static str> {
        schedule_for(day_type).iter().map(|item| item.id).collect()
    }

    // 2024-01-01 is a Monday
    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_classify_full_week() {
        assert_eq!(classify(jan(1)), DayType::Mwf);
        assert_eq!(classify(jan(2)), DayType::Tt);
        assert_eq!(classify(jan(3)), DayType::Mwf);
        assert_eq!(classify(jan(4)), DayType::Tt);
        assert_eq!(classify(jan(5)), DayType::Mwf);
        assert_eq!(classify(jan(6)), DayType::Saturday);
        assert_eq!(classify(jan(7)), DayType::Sunday);
    }

    #[test]
    fn test_classify_depends_only_on_weekday() {
        let mut date = jan(1);
        for _ in 0..400 {
            let week_later = date + chrono::Duration::days(7);
            assert_eq!(classify(date), classify(week_later));
            date = date.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_schedule_item_order() {
        assert_eq!(
            ids(DayType::Mwf),
            ["wake", "sleep", "class", "meal", "tkd", "study", "screen", "focus"]
        );
        assert_eq!(
            ids(DayType::Tt),
            ["wake", "sleep", "class", "meal", "study", "screen", "focus"]
        );
        assert_eq!(
            ids(DayType::Saturday),
            ["wake", "sleep", "class", "meal", "study", "screen", "focus"]
        );
        assert_eq!(ids(DayType::Sunday), ["wake", "sleep", "meal", "study", "focus"]);
    }

    #[test]
    fn test_target_study_hours() {
        assert_eq!(target_study_hours(DayType::Mwf), 8.0);
        assert_eq!(target_study_hours(DayType::Tt), 9.5);
        assert_eq!(target_study_hours(DayType::Saturday), 3.0);
        assert_eq!(target_study_hours(DayType::Sunday), 11.0);
    }

    #[test]
    fn test_saturday_class_target_time() {
        let class = schedule_for(DayType::Saturday)
            .iter()
            .find(|item| item.id == "class")
            .unwrap();
        assert_eq!(class.target_time, "10:30");
    }

    #[test]
    fn test_is_scheduled_item() {
        assert!(is_scheduled_item(DayType::Mwf, "tkd"));
        assert!(!is_scheduled_item(DayType::Tt, "tkd"));
        assert!(!is_scheduled_item(DayType::Sunday, "class"));
        assert!(!is_scheduled_item(DayType::Sunday, "unknown"));
    }
}
