use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{Local, NaiveDate, Weekday};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::activity::Step;
use crate::analysis::{self, Analysis, RecordRow};
use crate::calendar::{self, MonthView};
use crate::config::{parse_weekday, Config};
use crate::db;
use crate::format::format_duration;
use crate::legacy_csv;
use crate::schedule::{schedule_for, target_study_hours};
use crate::session::{DayView, PendingView, Session};
use crate::types::{parse_date_key, ActivityType, AppData, DayType, ScheduleItem};

/// Application state shared across requests
pub struct AppState {
    pub session: RwLock<Session>,
    pub conn: Mutex<Connection>,
    pub backup_dir: PathBuf,
    pub first_weekday: Weekday,
}

impl AppState {
    pub fn new(conn: Connection, data: AppData, backup_dir: PathBuf, first_weekday: Weekday) -> Self {
        Self {
            session: RwLock::new(Session::new(data)),
            conn: Mutex::new(conn),
            backup_dir,
            first_weekday,
        }
    }
}

type ApiError = (StatusCode, String);

/// Answer to every day-level command
#[derive(Debug, Serialize)]
pub struct DayResponse {
    pub day: DayView,
    /// Whether the command changed anything
    pub changed: bool,
    /// One-line message when the store could not be saved
    pub notice: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChecklistRequest {
    pub checked: bool,
}

#[derive(Debug, Deserialize)]
pub struct AppendRequest {
    #[serde(default)]
    pub memo: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct StepRequest {
    pub step: Step,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub first_weekday: Option<String>,
}

/// Static checklist and study target of one day type
#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub day_type: DayType,
    pub items: &'static [ScheduleItem],
    pub target_study_hours: f64,
    pub target_display: String,
}

#[derive(Debug, Serialize)]
pub struct BackupResponse {
    pub path: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/days/{date}", get(day_handler))
        .route("/api/days/{date}/checklist/{item_id}", put(checklist_handler))
        .route(
            "/api/days/{date}/activities/{activity}",
            post(append_handler).delete(reset_handler),
        )
        .route("/api/days/{date}/review", put(review_handler))
        .route(
            "/api/pending/{activity}",
            get(pending_handler).post(step_handler),
        )
        .route("/api/schedules/{day_type}", get(schedule_handler))
        .route("/api/calendar/{year}/{month}", get(calendar_handler))
        .route("/api/analysis", get(analysis_handler))
        .route("/api/records", get(records_handler))
        .route("/api/records.csv", get(records_csv_handler))
        .route("/api/export", get(export_handler))
        .route("/api/backup", post(backup_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Load the store and start the web server
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let conn = db::init_db(&config.db_path())?;
    let data = db::load_data(&conn)?;
    info!(
        path = %config.db_path().display(),
        days = data.activities.len(),
        "Store loaded"
    );

    let state = Arc::new(AppState::new(
        conn,
        data,
        config.backup_dir(),
        config.first_weekday,
    ));
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    info!(%addr, "Server running, press Ctrl+C to stop");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, message.into())
}

fn parse_date(value: &str) -> Result<NaiveDate, ApiError> {
    parse_date_key(value).ok_or_else(|| bad_request(format!("invalid date: {value}")))
}

fn parse_activity(value: &str) -> Result<ActivityType, ApiError> {
    value.parse().map_err(|e| bad_request(format!("{e}")))
}

fn internal_error(message: impl Into<String>) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, message.into())
}

/// Run blocking SQLite work off the async workers
async fn with_conn<T, F>(state: &Arc<AppState>, work: F) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut Connection) -> anyhow::Result<T> + Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || {
        let mut conn = state.conn.blocking_lock();
        work(&mut conn)
    })
    .await?
}

/// Save the whole store; a failure becomes a notice and memory stays authoritative
async fn persist(state: &Arc<AppState>, data: AppData) -> Option<String> {
    match with_conn(state, move |conn| db::save_data(conn, &data)).await {
        Ok(()) => None,
        Err(e) => {
            warn!(error = %e, "Failed to save store");
            Some(format!("Could not save data: {e}"))
        }
    }
}

/// Run a command against the session, save when it changed something,
/// and answer with the refreshed day
async fn apply_command<F>(state: &Arc<AppState>, date: NaiveDate, command: F) -> Json<DayResponse>
where
    F: FnOnce(&mut Session) -> bool,
{
    // The write lock is held across the save so saves land in command order
    let mut session = state.session.write().await;
    let changed = command(&mut session);
    let notice = if changed {
        persist(state, session.data.clone()).await
    } else {
        None
    };

    Json(DayResponse {
        day: session.day_view(date),
        changed,
        notice,
    })
}

async fn day_handler(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
) -> Result<Json<DayView>, ApiError> {
    let date = parse_date(&date)?;
    let session = state.session.read().await;
    Ok(Json(session.day_view(date)))
}

async fn checklist_handler(
    State(state): State<Arc<AppState>>,
    Path((date, item_id)): Path<(String, String)>,
    Json(request): Json<ChecklistRequest>,
) -> Result<Json<DayResponse>, ApiError> {
    let date = parse_date(&date)?;
    Ok(apply_command(&state, date, |session| {
        session.toggle_checklist_item(date, &item_id, request.checked)
    })
    .await)
}

async fn append_handler(
    State(state): State<Arc<AppState>>,
    Path((date, activity)): Path<(String, String)>,
    Json(request): Json<AppendRequest>,
) -> Result<Json<DayResponse>, ApiError> {
    let date = parse_date(&date)?;
    let activity = parse_activity(&activity)?;
    let now = Local::now().time();
    Ok(apply_command(&state, date, |session| {
        session.append_activity(date, activity, &request.memo, now)
    })
    .await)
}

async fn reset_handler(
    State(state): State<Arc<AppState>>,
    Path((date, activity)): Path<(String, String)>,
) -> Result<Json<DayResponse>, ApiError> {
    let date = parse_date(&date)?;
    let activity = parse_activity(&activity)?;
    Ok(apply_command(&state, date, |session| {
        session.reset_bucket(date, activity);
        true
    })
    .await)
}

async fn review_handler(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<DayResponse>, ApiError> {
    let date = parse_date(&date)?;
    let now = Local::now().time();
    Ok(apply_command(&state, date, |session| {
        session.save_review(date, &request.content, now)
    })
    .await)
}

async fn pending_handler(
    State(state): State<Arc<AppState>>,
    Path(activity): Path<String>,
) -> Result<Json<PendingView>, ApiError> {
    let activity = parse_activity(&activity)?;
    let session = state.session.read().await;
    Ok(Json(session.pending_view(activity)))
}

async fn step_handler(
    State(state): State<Arc<AppState>>,
    Path(activity): Path<String>,
    Json(request): Json<StepRequest>,
) -> Result<Json<PendingView>, ApiError> {
    let activity = parse_activity(&activity)?;
    let mut session = state.session.write().await;
    Ok(Json(session.adjust_pending(activity, request.step)))
}

async fn schedule_handler(Path(day_type): Path<String>) -> Result<Json<ScheduleResponse>, ApiError> {
    let day_type: DayType = day_type.parse().map_err(|e| bad_request(format!("{e}")))?;
    let target = target_study_hours(day_type);
    Ok(Json(ScheduleResponse {
        day_type,
        items: schedule_for(day_type),
        target_study_hours: target,
        target_display: format_duration(target),
    }))
}

async fn calendar_handler(
    State(state): State<Arc<AppState>>,
    Path((year, month)): Path<(i32, u32)>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<MonthView>, ApiError> {
    let first_weekday = match query.first_weekday.as_deref() {
        Some(value) => {
            parse_weekday(value).ok_or_else(|| bad_request(format!("invalid weekday: {value}")))?
        }
        None => state.first_weekday,
    };

    let session = state.session.read().await;
    calendar::month_view(&session.data, year, month, first_weekday)
        .map(Json)
        .ok_or_else(|| bad_request(format!("invalid year and month: {year}-{month}")))
}

async fn analysis_handler(State(state): State<Arc<AppState>>) -> Json<Analysis> {
    let session = state.session.read().await;
    Json(analysis::analyze(&session.data.activities))
}

async fn records_handler(State(state): State<Arc<AppState>>) -> Json<Vec<RecordRow>> {
    let session = state.session.read().await;
    Json(analysis::detailed_records(&session.data.activities))
}

async fn records_csv_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.session.read().await;
    let records = analysis::detailed_records(&session.data.activities);
    let body = legacy_csv::records_csv(&records).map_err(|e| internal_error(format!("{e}")))?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"study_records.csv\"",
            ),
        ],
        body,
    ))
}

async fn export_handler(State(state): State<Arc<AppState>>) -> Json<AppData> {
    let session = state.session.read().await;
    Json(session.data.clone())
}

async fn backup_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BackupResponse>, ApiError> {
    let backup_dir = state.backup_dir.clone();
    let now = Local::now().naive_local();
    match with_conn(&state, move |conn| db::backup(conn, &backup_dir, now)).await {
        Ok(path) => Ok(Json(BackupResponse {
            path: path.display().to_string(),
        })),
        Err(e) => {
            warn!(error = %e, "Backup failed");
            Err(internal_error(format!("Backup failed: {e}")))
        }
    }
}
