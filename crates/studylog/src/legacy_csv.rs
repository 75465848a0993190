//! CSV files of the older tracker, and CSV download of the record listing
//!
//! The older tracker kept three tables in its data directory:
//! `activities_data.csv`, `checklist_data.csv` and `reviews_data.csv`.
//! Rows that cannot be read are skipped with a warning like the JSON import.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

use crate::analysis::RecordRow;
use crate::data::{checked_date, insert_checklist_flag, malformed, report, LegacyImport};
use crate::types::{ActivityRecord, ActivityType, AppData, ReviewEntry};

pub const ACTIVITIES_FILE: &str = "activities_data.csv";
pub const CHECKLIST_FILE: &str = "checklist_data.csv";
pub const REVIEWS_FILE: &str = "reviews_data.csv";

#[derive(Debug, Deserialize)]
struct ActivityRow {
    date: String,
    activity_type: String,
    hours: f64,
    #[serde(default)]
    memo: String,
    #[serde(default)]
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct ChecklistRow {
    date: String,
    item_id: String,
    checked: String,
}

#[derive(Debug, Deserialize)]
struct ReviewRow {
    date: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    timestamp: String,
}

/// Flags were written as `True`/`False`
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Deserialize every row, recording unreadable ones against the file name
fn rows<T, R>(file: &str, reader: R, import: &mut LegacyImport) -> Vec<T>
where
    T: for<'de> Deserialize<'de>,
    R: Read,
{
    let mut reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        match row {
            Ok(row) => rows.push(row),
            Err(e) => import.skipped.push(malformed(file, format!("unreadable row: {e}"))),
        }
    }
    rows
}

pub fn read_activities<R: Read>(reader: R, import: &mut LegacyImport) {
    for row in rows::<ActivityRow, _>(ACTIVITIES_FILE, reader, import) {
        let Some(date) = checked_date(&row.date, &mut import.skipped) else {
            continue;
        };
        let activity: ActivityType = match row.activity_type.parse() {
            Ok(activity) => activity,
            Err(e) => {
                import.skipped.push(malformed(date, e.to_string()));
                continue;
            }
        };
        if !row.hours.is_finite() || row.hours < 0.0 {
            import
                .skipped
                .push(malformed(date, format!("invalid hours {}", row.hours)));
            continue;
        }

        import
            .data
            .activities
            .entry(date.to_string())
            .or_default()
            .bucket_mut(activity)
            .push(ActivityRecord::new(row.hours, row.memo, row.timestamp));
    }
}

pub fn read_checklist<R: Read>(reader: R, import: &mut LegacyImport) {
    for row in rows::<ChecklistRow, _>(CHECKLIST_FILE, reader, import) {
        let Some(date) = checked_date(&row.date, &mut import.skipped) else {
            continue;
        };
        match parse_flag(&row.checked) {
            Some(checked) => insert_checklist_flag(import, date, &row.item_id, checked),
            None => import.skipped.push(malformed(
                date,
                format!("checklist item {} has flag {:?}", row.item_id, row.checked),
            )),
        }
    }
}

pub fn read_reviews<R: Read>(reader: R, import: &mut LegacyImport) {
    for row in rows::<ReviewRow, _>(REVIEWS_FILE, reader, import) {
        let Some(date) = checked_date(&row.date, &mut import.skipped) else {
            continue;
        };
        import.data.reviews.insert(
            date.to_string(),
            ReviewEntry {
                content: row.content,
                timestamp: row.timestamp,
            },
        );
    }
}

/// Read whichever of the three tables exist in `dir`
pub fn load_legacy_csv_dir(dir: &Path) -> Result<AppData> {
    let mut import = LegacyImport::default();
    let readers: [(&str, fn(File, &mut LegacyImport)); 3] = [
        (ACTIVITIES_FILE, read_activities::<File>),
        (CHECKLIST_FILE, read_checklist::<File>),
        (REVIEWS_FILE, read_reviews::<File>),
    ];

    let mut found = 0;
    for (name, read) in readers {
        let path = dir.join(name);
        if !path.exists() {
            debug!(path = %path.display(), "Table not present");
            continue;
        }
        let file =
            File::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;
        read(file, &mut import);
        found += 1;
    }

    if found == 0 {
        anyhow::bail!(
            "No {ACTIVITIES_FILE}, {CHECKLIST_FILE} or {REVIEWS_FILE} in {}",
            dir.display()
        );
    }

    import.data.activities.retain(|_, day| !day.is_empty());
    Ok(report(import, dir))
}

/// Write the record listing as CSV with a header row
pub fn write_records<W: Write>(records: &[RecordRow], writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn records_csv(records: &[RecordRow]) -> Result<String> {
    let mut buffer = Vec::new();
    write_records(records, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

pub fn export_records_csv(records: &[RecordRow], path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_records(records, file)?;
    debug!(path = %path.display(), rows = records.len(), "Records exported");
    Ok(())
}
