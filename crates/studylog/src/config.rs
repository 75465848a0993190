//! Configuration defaults loaded from environment variables.

use anyhow::{Context, Result};
use chrono::Weekday;
use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_PORT: u16 = 8080;

/// Runtime settings. CLI flags override these.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory holding the database and the `backup/` folder
    pub data_dir: PathBuf,
    pub port: u16,
    /// First column of calendar grids
    pub first_weekday: Weekday,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            port: DEFAULT_PORT,
            first_weekday: Weekday::Sun,
        }
    }
}

/// Parse a weekday name such as "sunday" or "Mon"
pub fn parse_weekday(value: &str) -> Option<Weekday> {
    value.trim().parse::<Weekday>().ok()
}

impl Config {
    /// Load settings from environment variables.
    ///
    /// Reads `STUDYLOG_DATA_DIR`, `STUDYLOG_PORT` and `STUDYLOG_FIRST_WEEKDAY`,
    /// either from the environment or from a `.env` file. Unset variables keep
    /// their defaults.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let mut config = Self::default();

        if let Ok(dir) = std::env::var("STUDYLOG_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        if let Ok(port) = std::env::var("STUDYLOG_PORT") {
            config.port = port
                .parse()
                .with_context(|| format!("STUDYLOG_PORT is not a port number: {port}"))?;
        }

        if let Ok(day) = std::env::var("STUDYLOG_FIRST_WEEKDAY") {
            config.first_weekday = parse_weekday(&day)
                .with_context(|| format!("STUDYLOG_FIRST_WEEKDAY is not a weekday: {day}"))?;
        }

        Ok(config)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(crate::db::DB_FILE_NAME)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.data_dir.join("backup")
    }
}
