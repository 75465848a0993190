use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

mod activity;
mod analysis;
mod calendar;
mod config;
mod data;
mod db;
mod error;
mod format;
mod legacy_csv;
mod schedule;
mod server;
mod session;
mod types;

use config::{parse_weekday, Config};
use format::format_duration;
use session::Session;
use types::DayType;

#[derive(Parser, Debug)]
#[command(name = "studylog")]
#[command(about = "Daily study checklist, activity log and monthly calendar summary")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory holding the database and backups
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the web server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show the checklist, activity log and evaluations of a day
    Day {
        /// Date in YYYY-MM-DD format (default: today)
        date: Option<NaiveDate>,
    },

    /// Show the checklist and study target of a day type
    Schedule {
        /// One of mwf, tt, saturday, sunday
        day_type: String,
    },

    /// Print the calendar of a month
    Calendar {
        /// Year (default: current)
        year: Option<i32>,

        /// Month 1-12 (default: current)
        month: Option<u32>,

        /// First column of the grid, e.g. "sunday" or "monday"
        #[arg(long)]
        first_weekday: Option<String>,
    },

    /// Print daily and monthly totals
    Analysis,

    /// Merge a legacy JSON data file into the store
    Import {
        /// Path to the JSON file
        file: PathBuf,
    },

    /// Merge activities_data.csv, checklist_data.csv and reviews_data.csv from a directory
    ImportCsv {
        /// Directory holding the CSV files
        dir: PathBuf,
    },

    /// Write the detailed record listing as CSV
    ExportRecords {
        /// Destination path
        file: PathBuf,
    },

    /// Write the whole store as JSON
    Export {
        /// Destination path
        file: PathBuf,
    },

    /// Copy the database into the backup directory
    Backup,
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level))
        .add_directive("hyper=warn".parse()?)
        .add_directive("tower_http=warn".parse()?);

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_max_level(Level::TRACE)
        .init();
    Ok(())
}

fn open_session(config: &Config) -> Result<(rusqlite::Connection, Session)> {
    let conn = db::init_db(&config.db_path())?;
    let data = db::load_data(&conn)?;
    Ok((conn, Session::new(data)))
}

fn print_day(session: &Session, date: NaiveDate) {
    let view = session.day_view(date);

    println!("{} ({})", view.date, view.day_type);
    println!();
    for item in &view.checklist {
        let mark = if item.checked { "x" } else { " " };
        println!("  [{mark}] {} ({})", item.label, item.target_time);
    }

    for (title, activity) in [("Study", &view.study), ("Break", &view.rest)] {
        println!();
        println!("{title}: {}", activity.total_display);
        for record in &activity.records {
            println!(
                "  - {}: {} ({})",
                format_duration(record.hours),
                record.memo,
                record.timestamp
            );
        }
    }

    println!();
    println!(
        "Study evaluation: {:?} (target {})",
        view.study_evaluation,
        format_duration(view.study_target_hours)
    );
    println!("Break evaluation: {:?}", view.break_evaluation);

    if let Some(review) = &view.review {
        println!();
        println!("Review ({}):", review.timestamp);
        println!("{}", review.content);
    }
}

fn print_schedule(day_type: DayType) {
    println!(
        "{day_type}: study target {}",
        format_duration(schedule::target_study_hours(day_type))
    );
    for item in schedule::schedule_for(day_type) {
        println!("  [{}] {} ({})", item.id, item.label, item.target_time);
    }
}

fn print_calendar(view: &calendar::MonthView) {
    println!("{}-{:02}", view.year, view.month);
    let header: Vec<String> = view.weekdays.iter().map(|d| format!("{d:>5}")).collect();
    println!("{}", header.join(""));

    for week in &view.weeks {
        let row: Vec<String> = week
            .iter()
            .map(|cell| match cell {
                Some(day) if day.study_hours > 0.0 || day.break_hours > 0.0 => {
                    format!("{:>4}*", day.day)
                }
                Some(day) => format!("{:>5}", day.day),
                None => " ".repeat(5),
            })
            .collect();
        println!("{}", row.join(""));
    }

    println!();
    for day in view.weeks.iter().flatten().flatten() {
        if day.study_hours > 0.0 || day.break_hours > 0.0 || day.has_review {
            println!(
                "{}  study {}  break {}{}",
                day.date,
                format_duration(day.study_hours),
                format_duration(day.break_hours),
                if day.has_review { "  (review)" } else { "" }
            );
        }
    }
}

fn print_analysis(analysis: &analysis::Analysis) {
    println!("Daily totals");
    for day in &analysis.daily {
        println!("  {}  study {:.1}h  break {:.1}h", day.period, day.study, day.rest);
    }

    println!();
    println!("Monthly totals");
    for month in &analysis.monthly {
        println!("  {}  study {:.1}h  break {:.1}h", month.period, month.study, month.rest);
    }

    println!();
    println!(
        "Average study: {:.1}h  Average break: {:.1}h  Study days: {}",
        analysis.summary.average_study_hours,
        analysis.summary.average_break_hours,
        analysis.summary.study_days
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args.log_level)?;

    let mut config = Config::from_env()?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }

    match args.command {
        // Default to serve if no command specified
        None => server::serve(&config).await?,
        Some(Commands::Serve { port }) => {
            if let Some(port) = port {
                config.port = port;
            }
            server::serve(&config).await?;
        }
        Some(Commands::Day { date }) => {
            let (_conn, session) = open_session(&config)?;
            print_day(&session, date.unwrap_or_else(|| Local::now().date_naive()));
        }
        Some(Commands::Schedule { day_type }) => {
            print_schedule(day_type.parse()?);
        }
        Some(Commands::Calendar {
            year,
            month,
            first_weekday,
        }) => {
            let today = Local::now().date_naive();
            let first_weekday = match first_weekday {
                Some(value) => parse_weekday(&value)
                    .with_context(|| format!("Not a weekday: {value}"))?,
                None => config.first_weekday,
            };
            let year = year.unwrap_or(today.year());
            let month = month.unwrap_or(today.month());

            let (_conn, session) = open_session(&config)?;
            let view = calendar::month_view(&session.data, year, month, first_weekday)
                .with_context(|| format!("Not a calendar month: {year}-{month}"))?;
            print_calendar(&view);
        }
        Some(Commands::Analysis) => {
            let (_conn, session) = open_session(&config)?;
            print_analysis(&analysis::analyze(&session.data.activities));
        }
        Some(Commands::Import { file }) => {
            let (mut conn, mut session) = open_session(&config)?;
            let incoming = data::load_legacy_json(&file)?;
            data::merge_into(&mut session.data, incoming);
            db::save_data(&mut conn, &session.data)?;
            info!(
                file = %file.display(),
                records = db::count_records(&conn)?,
                "Import complete"
            );
        }
        Some(Commands::ImportCsv { dir }) => {
            let (mut conn, mut session) = open_session(&config)?;
            let incoming = legacy_csv::load_legacy_csv_dir(&dir)?;
            data::merge_into(&mut session.data, incoming);
            db::save_data(&mut conn, &session.data)?;
            info!(
                dir = %dir.display(),
                records = db::count_records(&conn)?,
                "Import complete"
            );
        }
        Some(Commands::ExportRecords { file }) => {
            let (_conn, session) = open_session(&config)?;
            let records = analysis::detailed_records(&session.data.activities);
            legacy_csv::export_records_csv(&records, &file)?;
            info!(path = %file.display(), rows = records.len(), "Records saved");
        }
        Some(Commands::Export { file }) => {
            let (_conn, session) = open_session(&config)?;
            data::export_json(&session.data, &file)?;
            info!(path = %file.display(), "Export saved");
        }
        Some(Commands::Backup) => {
            let (conn, _session) = open_session(&config)?;
            let path = db::backup(&conn, &config.backup_dir(), Local::now().naive_local())?;
            info!(path = %path.display(), "Backup saved");
        }
    }

    Ok(())
}
