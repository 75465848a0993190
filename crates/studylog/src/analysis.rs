//! Historical totals over the whole activity store

use serde::Serialize;
use std::collections::BTreeMap;

use crate::activity::total_hours;
use crate::types::{ActivityStore, ActivityType};

/// Study and break totals for one period (a date or a `YYYY-MM` month)
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PeriodTotals {
    pub period: String,
    pub study: f64,
    #[serde(rename = "break")]
    pub rest: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Summary {
    pub average_study_hours: f64,
    pub average_break_hours: f64,
    pub study_days: usize,
}

/// Flat row of the detailed record listing
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecordRow {
    pub date: String,
    pub activity_type: ActivityType,
    pub hours: f64,
    pub memo: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub daily: Vec<PeriodTotals>,
    pub monthly: Vec<PeriodTotals>,
    pub summary: Summary,
}

/// One row per date that has at least one record, oldest first
pub fn daily_totals(store: &ActivityStore) -> Vec<PeriodTotals> {
    store
        .iter()
        .filter(|(_, day)| !day.is_empty())
        .map(|(date, _)| PeriodTotals {
            period: date.clone(),
            study: total_hours(store, date, ActivityType::Study),
            rest: total_hours(store, date, ActivityType::Break),
        })
        .collect()
}

/// Daily totals rolled up by `YYYY-MM`, oldest first
pub fn monthly_totals(store: &ActivityStore) -> Vec<PeriodTotals> {
    let mut months: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    for day in daily_totals(store) {
        let month = day.period.get(..7).unwrap_or(&day.period).to_string();
        let totals = months.entry(month).or_insert((0.0, 0.0));
        totals.0 += day.study;
        totals.1 += day.rest;
    }

    months
        .into_iter()
        .map(|(period, (study, rest))| PeriodTotals {
            period,
            study,
            rest,
        })
        .collect()
}

pub fn summary(daily: &[PeriodTotals]) -> Summary {
    let days = daily.len();
    let average = |pick: fn(&PeriodTotals) -> f64| {
        if days == 0 {
            0.0
        } else {
            daily.iter().map(pick).fold(0.0, |acc, h| acc + h) / days as f64
        }
    };

    Summary {
        average_study_hours: average(|day| day.study),
        average_break_hours: average(|day| day.rest),
        study_days: daily.iter().filter(|day| day.study > 0.0).count(),
    }
}

pub fn analyze(store: &ActivityStore) -> Analysis {
    let daily = daily_totals(store);
    Analysis {
        monthly: monthly_totals(store),
        summary: summary(&daily),
        daily,
    }
}

/// Every record, newest date first; log order is kept within a day
pub fn detailed_records(store: &ActivityStore) -> Vec<RecordRow> {
    store
        .iter()
        .rev()
        .flat_map(|(date, day)| {
            ActivityType::ALL.into_iter().flat_map(move |activity| {
                day.bucket(activity).iter().map(move |record| RecordRow {
                    date: date.clone(),
                    activity_type: activity,
                    hours: record.hours,
                    memo: record.memo.clone(),
                    timestamp: record.timestamp.clone(),
                })
            })
        })
        .collect()
}
