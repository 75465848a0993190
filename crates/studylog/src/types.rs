use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::TrackerError;

/// Format of the date key shared by every map in the store
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Format of record and review timestamps
pub const TIMESTAMP_FORMAT: &str = "%H:%M";

/// Canonical `YYYY-MM-DD` key for a calendar day
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Parse a date key, accepting only the zero-padded canonical form
pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    let date = NaiveDate::parse_from_str(key, DATE_KEY_FORMAT).ok()?;
    (date_key(date) == key).then_some(date)
}

/// `HH:MM` stamp for a record or review
pub fn clock_stamp(time: NaiveTime) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Schedule category of a day, derived from its weekday
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayType {
    Mwf,
    Tt,
    Saturday,
    Sunday,
}

impl DayType {
    pub const ALL: [DayType; 4] = [
        DayType::Mwf,
        DayType::Tt,
        DayType::Saturday,
        DayType::Sunday,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DayType::Mwf => "mwf",
            DayType::Tt => "tt",
            DayType::Saturday => "saturday",
            DayType::Sunday => "sunday",
        }
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayType {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DayType::ALL
            .into_iter()
            .find(|day_type| day_type.as_str() == s)
            .ok_or_else(|| TrackerError::InvalidDayType(s.to_string()))
    }
}

/// Kind of logged activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Study,
    Break,
}

impl ActivityType {
    pub const ALL: [ActivityType; 2] = [ActivityType::Study, ActivityType::Break];

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::Study => "study",
            ActivityType::Break => "break",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "study" => Ok(ActivityType::Study),
            "break" => Ok(ActivityType::Break),
            other => Err(TrackerError::InvalidActivityType(other.to_string())),
        }
    }
}

/// A single logged interval of study or rest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityRecord {
    /// Duration in fractional hours
    pub hours: f64,

    #[serde(default)]
    pub memo: String,

    /// Wall-clock time of logging, `HH:MM`
    pub timestamp: String,
}

impl ActivityRecord {
    pub fn new(hours: f64, memo: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            hours,
            memo: memo.into(),
            timestamp: timestamp.into(),
        }
    }
}

/// Both activity buckets of one day, in log order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DayActivities {
    #[serde(default)]
    pub study: Vec<ActivityRecord>,

    #[serde(rename = "break", default)]
    pub rest: Vec<ActivityRecord>,
}

impl DayActivities {
    pub fn bucket(&self, activity: ActivityType) -> &[ActivityRecord] {
        match activity {
            ActivityType::Study => &self.study,
            ActivityType::Break => &self.rest,
        }
    }

    pub fn bucket_mut(&mut self, activity: ActivityType) -> &mut Vec<ActivityRecord> {
        match activity {
            ActivityType::Study => &mut self.study,
            ActivityType::Break => &mut self.rest,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.study.is_empty() && self.rest.is_empty()
    }
}

/// The end-of-day review, one per date
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewEntry {
    pub content: String,
    pub timestamp: String,
}

/// A static checklist line of a day's schedule
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ScheduleItem {
    pub id: &'static str,
    pub label: &'static str,
    /// Target time such as "6:00", or "-" when the item has none
    pub target_time: &'static str,
}

pub type ActivityStore = BTreeMap<String, DayActivities>;
pub type ChecklistState = BTreeMap<String, BTreeMap<String, bool>>;
pub type Reviews = BTreeMap<String, ReviewEntry>;

/// Everything that is persisted, keyed by date
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppData {
    #[serde(default)]
    pub activities: ActivityStore,

    #[serde(default)]
    pub checklist: ChecklistState,

    #[serde(default)]
    pub reviews: Reviews,
}

/// Study total measured against the day's target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StudyEvaluation {
    Good,
    Bad,
    Unset,
}

/// Break total measured against the fixed thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakEvaluation {
    Emergency,
    Warning,
    Normal,
}
