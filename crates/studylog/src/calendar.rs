use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

use crate::activity::total_hours;
use crate::types::{date_key, ActivityType, AppData};

/// One calendar row; `None` cells are padding outside the month
pub type Week = [Option<u32>; 7];

/// Number of days in a month, or `None` when the month is out of range
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    u32::try_from((next - first).num_days()).ok()
}

/// Column of `weekday` in a grid whose first column is `first_weekday`
fn column_of(weekday: Weekday, first_weekday: Weekday) -> usize {
    let days = 7 + weekday.num_days_from_monday() - first_weekday.num_days_from_monday();
    (days % 7) as usize
}

/// Lay a month out in 7-day rows starting at `first_weekday`.
///
/// Returns `None` for a month outside `1..=12`.
pub fn build_grid(year: i32, month: u32, first_weekday: Weekday) -> Option<Vec<Week>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let days = days_in_month(year, month)?;

    let mut weeks = Vec::with_capacity(6);
    let mut week: Week = [None; 7];
    let mut col = column_of(first.weekday(), first_weekday);

    for day in 1..=days {
        week[col] = Some(day);
        col += 1;
        if col == 7 {
            weeks.push(week);
            week = [None; 7];
            col = 0;
        }
    }
    if col > 0 {
        weeks.push(week);
    }

    Some(weeks)
}

/// Column headers for a grid starting at `first_weekday`
pub fn weekday_headers(first_weekday: Weekday) -> Vec<String> {
    let mut day = first_weekday;
    (0..7)
        .map(|_| {
            let name = day.to_string();
            day = day.succ();
            name
        })
        .collect()
}

/// What a calendar cell shows for one day
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DaySummary {
    pub date: String,
    pub day: u32,
    pub study_hours: f64,
    pub break_hours: f64,
    pub has_review: bool,
}

pub fn day_summary(data: &AppData, date: NaiveDate) -> DaySummary {
    let key = date_key(date);
    DaySummary {
        day: date.day(),
        study_hours: total_hours(&data.activities, &key, ActivityType::Study),
        break_hours: total_hours(&data.activities, &key, ActivityType::Break),
        has_review: data.reviews.contains_key(&key),
        date: key,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthView {
    pub year: i32,
    pub month: u32,
    pub weekdays: Vec<String>,
    pub weeks: Vec<Vec<Option<DaySummary>>>,
}

/// Month grid with each day cell filled in from the store
pub fn month_view(
    data: &AppData,
    year: i32,
    month: u32,
    first_weekday: Weekday,
) -> Option<MonthView> {
    let grid = build_grid(year, month, first_weekday)?;

    let weeks = grid
        .iter()
        .map(|week| {
            week.iter()
                .map(|cell| {
                    cell.and_then(|day| NaiveDate::from_ymd_opt(year, month, day))
                        .map(|date| day_summary(data, date))
                })
                .collect()
        })
        .collect();

    Some(MonthView {
        year,
        month,
        weekdays: weekday_headers(first_weekday),
        weeks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::append_record;
    use crate::types::ReviewEntry;

    fn flatten(weeks: &[Week]) -> Vec<u32> {
        weeks.iter().flatten().filter_map(|cell| *cell).collect()
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), Some(29));
        assert_eq!(days_in_month(2023, 2), Some(28));
        assert_eq!(days_in_month(1900, 2), Some(28));
        assert_eq!(days_in_month(2000, 2), Some(29));
        assert_eq!(days_in_month(2024, 4), Some(30));
        assert_eq!(days_in_month(2024, 12), Some(31));
        assert_eq!(days_in_month(2024, 13), None);
        assert_eq!(days_in_month(2024, 0), None);
    }

    #[test]
    fn test_leap_february_sunday_first() {
        let weeks = build_grid(2024, 2, Weekday::Sun).unwrap();

        assert_eq!(weeks.len(), 5);
        assert_eq!(
            weeks[0],
            [None, None, None, None, Some(1), Some(2), Some(3)]
        );
        assert_eq!(
            weeks[4],
            [Some(25), Some(26), Some(27), Some(28), Some(29), None, None]
        );
    }

    #[test]
    fn test_monday_first_shifts_origin() {
        let weeks = build_grid(2024, 2, Weekday::Mon).unwrap();
        assert_eq!(weeks[0], [None, None, None, Some(1), Some(2), Some(3), Some(4)]);
    }

    #[test]
    fn test_month_starting_on_first_column_has_no_leading_padding() {
        // 2023-10-01 is a Sunday
        let weeks = build_grid(2023, 10, Weekday::Sun).unwrap();
        assert_eq!(weeks[0][0], Some(1));
    }

    #[test]
    fn test_exact_four_week_month() {
        // February 2015 starts on Sunday and has 28 days
        let weeks = build_grid(2015, 2, Weekday::Sun).unwrap();
        assert_eq!(weeks.len(), 4);
        assert_eq!(weeks[3][6], Some(28));
    }

    #[test]
    fn test_six_row_month() {
        // March 2024 starts on Friday and has 31 days
        let weeks = build_grid(2024, 3, Weekday::Sun).unwrap();
        assert_eq!(weeks.len(), 6);
        assert_eq!(weeks[5], [Some(31), None, None, None, None, None, None]);
    }

    #[test]
    fn test_every_day_appears_once_in_order() {
        for month in 1..=12 {
            for first in [Weekday::Sun, Weekday::Mon, Weekday::Wed] {
                let weeks = build_grid(2025, month, first).unwrap();
                let days = flatten(&weeks);
                let expected: Vec<u32> = (1..=days_in_month(2025, month).unwrap()).collect();
                assert_eq!(days, expected);
            }
        }
    }

    #[test]
    fn test_invalid_month() {
        assert!(build_grid(2024, 0, Weekday::Sun).is_none());
        assert!(build_grid(2024, 13, Weekday::Sun).is_none());
    }

    #[test]
    fn test_weekday_headers() {
        assert_eq!(
            weekday_headers(Weekday::Sun),
            ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"]
        );
        assert_eq!(weekday_headers(Weekday::Mon)[6], "Sun");
    }

    #[test]
    fn test_month_view_fills_cells() {
        let mut data = AppData::default();
        append_record(&mut data.activities, "2024-02-01", ActivityType::Study, 2.5, "", "09:00")
            .unwrap();
        append_record(&mut data.activities, "2024-02-01", ActivityType::Break, 0.5, "", "11:00")
            .unwrap();
        data.reviews.insert(
            "2024-02-03".to_string(),
            ReviewEntry {
                content: "ok".to_string(),
                timestamp: "22:00".to_string(),
            },
        );

        let view = month_view(&data, 2024, 2, Weekday::Sun).unwrap();
        assert_eq!(view.weeks.len(), 5);
        assert!(view.weeks[0][3].is_none());

        let first = view.weeks[0][4].as_ref().unwrap();
        assert_eq!(first.date, "2024-02-01");
        assert_eq!(first.study_hours, 2.5);
        assert_eq!(first.break_hours, 0.5);
        assert!(!first.has_review);

        let third = view.weeks[0][6].as_ref().unwrap();
        assert_eq!(third.day, 3);
        assert_eq!(third.study_hours, 0.0);
        assert!(third.has_review);
    }
}
