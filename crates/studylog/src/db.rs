//! SQLite persistence for the tracker store
//!
//! This module handles:
//! - Database initialization and embedded migrations
//! - Whole-store load and save
//! - Point-in-time backups

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::types::{ActivityRecord, ActivityType, AppData, ReviewEntry};

/// File name of the database inside the data directory
pub const DB_FILE_NAME: &str = "studylog.db";

/// Migrations in the order they must be applied
const MIGRATIONS: &[(&str, &str)] = &[(
    "001_initial_schema",
    include_str!("../db/migrations/001_initial_schema.sql"),
)];

/// Open (creating if needed) the database at the given path and apply pending migrations
pub fn init_db(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

    let count = run_migrations(&conn)?;
    if count > 0 {
        info!(count = count, "Applied migrations");
    }

    Ok(conn)
}

/// Apply every embedded migration not yet recorded in `schema_migrations`
pub fn run_migrations(conn: &Connection) -> Result<usize> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL
        );",
    )?;

    let mut applied = 0;

    for (version, sql) in MIGRATIONS {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM schema_migrations WHERE version = ?1",
            [version],
            |row| row.get(0),
        )?;

        if already_applied {
            continue;
        }

        conn.execute_batch(sql)
            .with_context(|| format!("Failed to apply migration: {}", version))?;

        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, datetime('now'))",
            [version],
        )?;

        debug!(version = %version, "Applied migration");
        applied += 1;
    }

    Ok(applied)
}

/// Load the whole store
pub fn load_data(conn: &Connection) -> Result<AppData> {
    let mut data = AppData::default();

    let mut stmt = conn.prepare(
        "SELECT date, activity_type, hours, memo, timestamp
         FROM activities
         ORDER BY date ASC, activity_type ASC, seq ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            ActivityRecord {
                hours: row.get(2)?,
                memo: row.get(3)?,
                timestamp: row.get(4)?,
            },
        ))
    })?;
    for row in rows {
        let (date, activity_type, record) = row?;
        match activity_type.parse::<ActivityType>() {
            Ok(activity) => data
                .activities
                .entry(date)
                .or_default()
                .bucket_mut(activity)
                .push(record),
            Err(e) => warn!(date = %date, error = %e, "Skipping stored activity"),
        }
    }

    let mut stmt = conn.prepare("SELECT date, item_id, checked FROM checklist")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i32>(2)? != 0,
        ))
    })?;
    for row in rows {
        let (date, item_id, checked) = row?;
        data.checklist.entry(date).or_default().insert(item_id, checked);
    }

    let mut stmt = conn.prepare("SELECT date, content, timestamp FROM reviews")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            ReviewEntry {
                content: row.get(1)?,
                timestamp: row.get(2)?,
            },
        ))
    })?;
    for row in rows {
        let (date, review) = row?;
        data.reviews.insert(date, review);
    }

    debug!(
        days = data.activities.len(),
        reviews = data.reviews.len(),
        "Loaded store"
    );
    Ok(data)
}

/// Overwrite the stored data with `data` in a single transaction
pub fn save_data(conn: &mut Connection, data: &AppData) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute_batch(
        "DELETE FROM activities;
         DELETE FROM checklist;
         DELETE FROM reviews;",
    )?;

    {
        let mut insert = tx.prepare(
            "INSERT INTO activities (date, activity_type, seq, hours, memo, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for (date, day) in &data.activities {
            for activity in ActivityType::ALL {
                for (seq, record) in day.bucket(activity).iter().enumerate() {
                    insert.execute(params![
                        date,
                        activity.as_str(),
                        seq as i64,
                        record.hours,
                        record.memo,
                        record.timestamp,
                    ])?;
                }
            }
        }

        let mut insert =
            tx.prepare("INSERT INTO checklist (date, item_id, checked) VALUES (?1, ?2, ?3)")?;
        for (date, items) in &data.checklist {
            for (item_id, checked) in items {
                insert.execute(params![date, item_id, *checked as i32])?;
            }
        }

        let mut insert =
            tx.prepare("INSERT INTO reviews (date, content, timestamp) VALUES (?1, ?2, ?3)")?;
        for (date, review) in &data.reviews {
            insert.execute(params![date, review.content, review.timestamp])?;
        }
    }

    tx.commit().context("Failed to commit store")?;
    debug!(days = data.activities.len(), "Store saved");
    Ok(())
}

/// Write a consistent copy of the database to `backup_dir/studylog_<YYYYMMDD_HHMMSS>.db`.
/// A backup taken in the same second replaces the earlier one.
pub fn backup(conn: &Connection, backup_dir: &Path, now: NaiveDateTime) -> Result<PathBuf> {
    std::fs::create_dir_all(backup_dir)
        .with_context(|| format!("Failed to create {}", backup_dir.display()))?;

    let path = backup_dir.join(format!("studylog_{}.db", now.format("%Y%m%d_%H%M%S")));
    let target = path
        .to_str()
        .context("Backup path is not valid UTF-8")?
        .to_string();

    // VACUUM INTO refuses to write over an existing file
    if path.exists() {
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
    }

    conn.execute("VACUUM INTO ?1", [target])
        .with_context(|| format!("Failed to write backup to {}", path.display()))?;

    info!(path = %path.display(), "Backup written");
    Ok(path)
}

/// Count stored activity records
pub fn count_records(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM activities", [], |row| row.get(0))?;
    Ok(count as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::append_record;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn setup_test_db() -> (TempDir, Connection) {
        let temp_dir = TempDir::new().unwrap();
        let conn = init_db(&temp_dir.path().join("test.db")).unwrap();
        (temp_dir, conn)
    }

    fn sample_data() -> AppData {
        let mut data = AppData::default();
        let store = &mut data.activities;
        append_record(store, "2024-02-05", ActivityType::Study, 1.5, "algebra", "09:10").unwrap();
        append_record(store, "2024-02-05", ActivityType::Study, 0.5, "", "11:00").unwrap();
        append_record(store, "2024-02-05", ActivityType::Break, 5.0 / 60.0, "tea", "10:30").unwrap();
        append_record(store, "2024-02-06", ActivityType::Break, 2.0, "gym", "18:00").unwrap();

        let items = data.checklist.entry("2024-02-05".to_string()).or_default();
        items.insert("wake".to_string(), true);
        items.insert("tkd".to_string(), false);

        data.reviews.insert(
            "2024-02-05".to_string(),
            ReviewEntry {
                content: "Good day, 'quoted' text".to_string(),
                timestamp: "22:15".to_string(),
            },
        );
        data
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_temp_dir, conn) = setup_test_db();

        for table in ["activities", "checklist", "reviews", "schema_migrations"] {
            let exists: bool = conn
                .query_row(
                    "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert!(exists, "missing table {table}");
        }
    }

    #[test]
    fn test_init_db_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let conn1 = init_db(&db_path).unwrap();
        drop(conn1);
        let conn2 = init_db(&db_path).unwrap();

        assert_eq!(run_migrations(&conn2).unwrap(), 0);
        assert_eq!(count_records(&conn2).unwrap(), 0);
    }

    #[test]
    fn test_init_db_creates_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("data").join("test.db");
        init_db(&db_path).unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn test_load_empty_db() {
        let (_temp_dir, conn) = setup_test_db();
        assert_eq!(load_data(&conn).unwrap(), AppData::default());
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let (_temp_dir, mut conn) = setup_test_db();
        let data = sample_data();

        save_data(&mut conn, &data).unwrap();
        let loaded = load_data(&conn).unwrap();

        assert_eq!(loaded, data);
        assert_eq!(count_records(&conn).unwrap(), 4);
    }

    #[test]
    fn test_save_overwrites_previous_store() {
        let (_temp_dir, mut conn) = setup_test_db();
        save_data(&mut conn, &sample_data()).unwrap();

        let mut smaller = AppData::default();
        append_record(&mut smaller.activities, "2024-03-01", ActivityType::Study, 1.0, "", "08:00")
            .unwrap();
        save_data(&mut conn, &smaller).unwrap();

        assert_eq!(load_data(&conn).unwrap(), smaller);
    }

    #[test]
    fn test_empty_buckets_not_persisted() {
        let (_temp_dir, mut conn) = setup_test_db();
        let mut data = sample_data();
        crate::activity::reset_bucket(&mut data.activities, "2024-02-06", ActivityType::Break);

        save_data(&mut conn, &data).unwrap();
        let loaded = load_data(&conn).unwrap();

        assert!(!loaded.activities.contains_key("2024-02-06"));
        assert_eq!(loaded.activities["2024-02-05"], data.activities["2024-02-05"]);
    }

    #[test]
    fn test_backup_writes_copy() {
        let (temp_dir, mut conn) = setup_test_db();
        save_data(&mut conn, &sample_data()).unwrap();

        let now = NaiveDate::from_ymd_opt(2024, 2, 5)
            .unwrap()
            .and_hms_opt(21, 4, 9)
            .unwrap();
        let path = backup(&conn, &temp_dir.path().join("backup"), now).unwrap();

        assert!(path.ends_with("studylog_20240205_210409.db"));
        let copy = Connection::open(&path).unwrap();
        assert_eq!(load_data(&copy).unwrap(), sample_data());
    }

    #[test]
    fn test_backup_same_second_replaces_copy() {
        let (temp_dir, mut conn) = setup_test_db();
        let backup_dir = temp_dir.path().join("backup");
        let now = NaiveDate::from_ymd_opt(2024, 2, 5)
            .unwrap()
            .and_hms_opt(21, 4, 9)
            .unwrap();

        let first = backup(&conn, &backup_dir, now).unwrap();
        save_data(&mut conn, &sample_data()).unwrap();
        let second = backup(&conn, &backup_dir, now).unwrap();

        assert_eq!(first, second);
        let copy = Connection::open(&second).unwrap();
        assert_eq!(load_data(&copy).unwrap(), sample_data());
    }
}
