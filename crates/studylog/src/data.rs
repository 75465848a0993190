//! JSON documents: legacy import and whole-store export
//!
//! Older data files stored study time as a bare number of hours per day. Those
//! values are upgraded to a single record memoed "legacy" at "00:00". Anything
//! that cannot be interpreted is skipped with a warning; the rest of the file
//! still loads.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::TrackerError;
use crate::schedule::{classify, is_scheduled_item};
use crate::types::{parse_date_key, ActivityRecord, ActivityType, AppData, ReviewEntry};

pub const LEGACY_MEMO: &str = "legacy";
pub const LEGACY_TIMESTAMP: &str = "00:00";

/// Result of reading a legacy document
#[derive(Debug, Default)]
pub struct LegacyImport {
    pub data: AppData,
    pub skipped: Vec<TrackerError>,
}

pub(crate) fn malformed(date: &str, reason: impl Into<String>) -> TrackerError {
    TrackerError::MalformedLegacyRecord {
        date: date.to_string(),
        reason: reason.into(),
    }
}

fn legacy_record(date: &str, value: &Value) -> Result<ActivityRecord, TrackerError> {
    match value.as_f64() {
        Some(hours) if hours.is_finite() && hours >= 0.0 => {
            Ok(ActivityRecord::new(hours, LEGACY_MEMO, LEGACY_TIMESTAMP))
        }
        Some(hours) => Err(malformed(date, format!("invalid hours {hours}"))),
        None => Err(malformed(date, format!("expected a number, got {value}"))),
    }
}

fn record_from_value(date: &str, value: &Value) -> Result<ActivityRecord, TrackerError> {
    if value.is_number() {
        return legacy_record(date, value);
    }

    let record: ActivityRecord = serde_json::from_value(value.clone())
        .map_err(|e| malformed(date, format!("unreadable record: {e}")))?;
    if !record.hours.is_finite() || record.hours < 0.0 {
        return Err(malformed(date, format!("invalid hours {}", record.hours)));
    }
    Ok(record)
}

/// Upgrade one stored bucket. A bare number becomes a single legacy record;
/// an array keeps its readable elements.
fn parse_bucket(
    date: &str,
    value: &Value,
    skipped: &mut Vec<TrackerError>,
) -> Vec<ActivityRecord> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match record_from_value(date, item) {
                Ok(record) => Some(record),
                Err(e) => {
                    skipped.push(e);
                    None
                }
            })
            .collect(),
        Value::Null => Vec::new(),
        other => match legacy_record(date, other) {
            Ok(record) => vec![record],
            Err(e) => {
                skipped.push(e);
                Vec::new()
            }
        },
    }
}

/// Keep a checklist flag only when the item belongs to that date's schedule
pub(crate) fn insert_checklist_flag(
    import: &mut LegacyImport,
    date: &str,
    item_id: &str,
    checked: bool,
) {
    let scheduled = parse_date_key(date).is_some_and(|day| is_scheduled_item(classify(day), item_id));
    if !scheduled {
        import
            .skipped
            .push(malformed(date, format!("checklist item {item_id} is not on this day's schedule")));
        return;
    }

    import
        .data
        .checklist
        .entry(date.to_string())
        .or_default()
        .insert(item_id.to_string(), checked);
}

pub(crate) fn checked_date<'a>(key: &'a str, skipped: &mut Vec<TrackerError>) -> Option<&'a str> {
    if parse_date_key(key).is_some() {
        Some(key)
    } else {
        skipped.push(malformed(key, "not a YYYY-MM-DD date"));
        None
    }
}

fn as_object<'a>(
    section: &str,
    value: Option<&'a Value>,
    skipped: &mut Vec<TrackerError>,
) -> Option<&'a Map<String, Value>> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map),
        Some(other) => {
            skipped.push(malformed(section, format!("expected an object, got {other}")));
            None
        }
    }
}

/// Read a legacy document:
/// `{activities?, study_time?, checklist?, reviews?}`
pub fn parse_legacy_document(doc: &Value) -> LegacyImport {
    let mut import = LegacyImport::default();
    let skipped = &mut import.skipped;
    let data = &mut import.data;

    if let Some(days) = as_object("activities", doc.get("activities"), skipped) {
        for (key, day) in days {
            let Some(date) = checked_date(key, skipped) else {
                continue;
            };
            let entry = data.activities.entry(date.to_string()).or_default();
            match day {
                Value::Object(buckets) => {
                    for activity in ActivityType::ALL {
                        if let Some(bucket) = buckets.get(activity.as_str()) {
                            let records = parse_bucket(date, bucket, skipped);
                            entry.bucket_mut(activity).extend(records);
                        }
                    }
                }
                // A day stored as a plain number predates the break log
                other => {
                    let records = parse_bucket(date, other, skipped);
                    entry.study.extend(records);
                }
            }
        }
    }

    if let Some(days) = as_object("study_time", doc.get("study_time"), skipped) {
        for (key, hours) in days {
            let Some(date) = checked_date(key, skipped) else {
                continue;
            };
            match legacy_record(date, hours) {
                Ok(record) => data
                    .activities
                    .entry(date.to_string())
                    .or_default()
                    .study
                    .push(record),
                Err(e) => skipped.push(e),
            }
        }
    }

    if let Some(days) = as_object("reviews", doc.get("reviews"), skipped) {
        for (key, review) in days {
            let Some(date) = checked_date(key, skipped) else {
                continue;
            };
            match serde_json::from_value::<ReviewEntry>(review.clone()) {
                Ok(review) => {
                    data.reviews.insert(date.to_string(), review);
                }
                Err(e) => skipped.push(malformed(date, format!("unreadable review: {e}"))),
            }
        }
    }

    let mut checklist = Vec::new();
    if let Some(days) = as_object("checklist", doc.get("checklist"), skipped) {
        for (key, items) in days {
            let Some(date) = checked_date(key, skipped) else {
                continue;
            };
            let Some(items) = items.as_object() else {
                skipped.push(malformed(date, "checklist is not an object"));
                continue;
            };
            for (item_id, checked) in items {
                match checked.as_bool() {
                    Some(checked) => checklist.push((date, item_id.as_str(), checked)),
                    None => skipped.push(malformed(date, format!("checklist item {item_id}"))),
                }
            }
        }
    }
    for (date, item_id, checked) in checklist {
        insert_checklist_flag(&mut import, date, item_id, checked);
    }

    import.data.activities.retain(|_, day| !day.is_empty());
    import
}

/// Read and upgrade a legacy JSON file, logging every skipped value
pub fn load_legacy_json(path: &Path) -> Result<AppData> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let doc: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    Ok(report(parse_legacy_document(&doc), path))
}

/// Log every skipped value of an import and hand back the readable data
pub(crate) fn report(import: LegacyImport, source: &Path) -> AppData {
    for error in &import.skipped {
        warn!(error = %error, "Skipped legacy value");
    }
    info!(
        source = %source.display(),
        days = import.data.activities.len(),
        skipped = import.skipped.len(),
        "Legacy data read"
    );
    import.data
}

/// Merge imported data: records are appended after existing ones,
/// checklist flags and reviews are overwritten
pub fn merge_into(target: &mut AppData, incoming: AppData) {
    for (date, day) in incoming.activities {
        let entry = target.activities.entry(date).or_default();
        entry.study.extend(day.study);
        entry.rest.extend(day.rest);
    }
    for (date, items) in incoming.checklist {
        target.checklist.entry(date).or_default().extend(items);
    }
    target.reviews.extend(incoming.reviews);
}

/// Write the whole store as pretty-printed JSON
pub fn export_json(data: &AppData, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    debug!(path = %path.display(), "Store exported");
    Ok(())
}
