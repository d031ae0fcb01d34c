//! HTTP handlers: pages, JSON API, live updates.
//!
//! Every mutating handler notifies the broadcaster after the store commit;
//! the SSE handler holds a subscription for the lifetime of its response
//! stream and re-queries the store whenever a change is announced.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, NaiveDateTime, Utc};
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::Error;
use crate::events;
use crate::server::views::{self, TaskView};
use crate::server::AppState;
use crate::store::models::{SearchFilters, Status, ValidationError};
use crate::timefmt;

/// Interval between SSE keep-alive comments.
const SSE_HEARTBEAT: Duration = Duration::from_secs(25);

/// Listing parameters shared by pages, the list API, and the SSE stream.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ListParams {
    /// Return archived tasks instead of active ones.
    #[serde(default)]
    pub archived: bool,
    /// Free-text search query.
    #[serde(default)]
    pub q: String,
}

impl ListParams {
    fn filters(&self) -> SearchFilters {
        SearchFilters { archived: self.archived, text_match: self.q.clone() }
    }
}

/// Errors surfaced by the HTTP layer.
#[derive(Debug)]
pub enum ApiError {
    /// The request itself was malformed.
    BadRequest(String),
    /// A core operation failed.
    Core(Error),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::Core(err)
    }
}

/// Field-level validation messages for rendering next to form inputs.
#[derive(Debug, Default, Serialize)]
pub struct ValidationMessages {
    /// Message for the title field, if it failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'static str>,
    /// Message for the description field, if it failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
}

impl From<&ValidationError> for ValidationMessages {
    fn from(v: &ValidationError) -> Self {
        let mut messages = Self::default();
        if v.title_empty {
            messages.title = Some("Title must not be empty");
        }
        if v.title_too_long {
            messages.title = Some("Title is too long");
        }
        if v.description_too_long {
            messages.description = Some("Description is too long");
        }
        messages
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorBody { error: message })).into_response()
            }
            Self::Core(Error::Validation(v)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(ValidationMessages::from(&v)))
                    .into_response()
            }
            Self::Core(Error::NotFound(_)) => {
                (StatusCode::NOT_FOUND, Json(ErrorBody { error: "not found".to_string() }))
                    .into_response()
            }
            Self::Core(err) => {
                // Generic failure indication; no internals leak to clients.
                tracing::error!(error = %err, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody { error: "internal error".to_string() }),
                )
                    .into_response()
            }
        }
    }
}

/// Parse a due timestamp in the form wire format; empty means none.
fn parse_due(value: &str) -> Result<Option<DateTime<Utc>>, ApiError> {
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDateTime::parse_from_str(value, timefmt::TIME_FORMAT)
        .map(|naive| Some(naive.and_utc()))
        .map_err(|_| ApiError::BadRequest("invalid due time".to_string()))
}

fn task_views(state: &AppState, params: &ListParams) -> Result<Vec<TaskView>, Error> {
    let now = Utc::now();
    let tasks = state.store.search(&params.filters())?;
    Ok(tasks.iter().map(|t| TaskView::from_task(now, t)).collect())
}

/// `GET /` — the index page with active tasks.
pub async fn get_index(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Html<String>, ApiError> {
    let params = ListParams { archived: false, ..params };
    let views = task_views(&state, &params).map_err(ApiError::Core)?;
    Ok(Html(views::page_index(&views).map_err(ApiError::Core)?))
}

/// `GET /archive` — the page with archived tasks.
pub async fn get_archive(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Html<String>, ApiError> {
    let params = ListParams { archived: true, ..params };
    let views = task_views(&state, &params).map_err(ApiError::Core)?;
    Ok(Html(views::page_archive(&views).map_err(ApiError::Core)?))
}

/// `GET /livez` — liveness probe.
pub async fn get_livez() -> StatusCode {
    StatusCode::OK
}

/// `GET /readyz` — readiness probe.
pub async fn get_readyz() -> StatusCode {
    StatusCode::OK
}

/// `GET /api/tasks` — list or search tasks as JSON.
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<TaskView>>, ApiError> {
    Ok(Json(task_views(&state, &params).map_err(ApiError::Core)?))
}

/// Body of `POST /api/tasks`.
#[derive(Debug, Deserialize)]
pub struct CreateTask {
    /// Task title.
    pub title: String,
    /// Task description.
    #[serde(default)]
    pub description: String,
    /// Due timestamp in `%Y-%m-%dT%H:%M` format; empty or absent for none.
    #[serde(default)]
    pub due: String,
}

/// Response of `POST /api/tasks`.
#[derive(Debug, Serialize)]
pub struct Created {
    /// Id assigned to the new task.
    pub id: i64,
}

/// `POST /api/tasks` — create a task.
pub async fn create_task(
    State(state): State<AppState>,
    Json(body): Json<CreateTask>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let due = parse_due(&body.due)?;
    let id = state.store.add(&body.title, &body.description, Utc::now(), due)?;

    let n = events::notify_tasks_changed(&state.broadcaster);
    tracing::debug!(clients = n, "notified tasks changed");
    Ok((StatusCode::CREATED, Json(Created { id })))
}

/// Body of `PUT /api/tasks/{id}`. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTask {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New done flag.
    pub done: Option<bool>,
    /// New archived flag.
    pub archived: Option<bool>,
    /// New due timestamp; an empty string clears the due date.
    pub due: Option<String>,
}

/// `PUT /api/tasks/{id}` — edit a task.
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateTask>,
) -> Result<StatusCode, ApiError> {
    let due = match body.due.as_deref() {
        Some(value) => Some(parse_due(value)?),
        None => None,
    };

    state.store.edit(id, |task| {
        if let Some(done) = body.done {
            task.status = if done { Status::Done } else { Status::Open };
        }
        if let Some(archived) = body.archived {
            task.archived = archived;
        }
        if let Some(title) = body.title {
            task.title = title;
        }
        if let Some(description) = body.description {
            task.description = description;
        }
        if let Some(due) = due {
            task.due = due;
        }
        Ok(())
    })?;

    let n = events::notify_tasks_changed(&state.broadcaster);
    tracing::debug!(clients = n, "notified tasks changed");
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/tasks/{id}/archive` — archive a task.
pub async fn archive_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.store.archive(id)?;

    let n = events::notify_tasks_changed(&state.broadcaster);
    tracing::debug!(clients = n, "notified tasks changed");
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/tasks/{id}` — delete a task.
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.store.delete(id)?;

    let n = events::notify_tasks_changed(&state.broadcaster);
    tracing::debug!(clients = n, "notified tasks changed");
    Ok(StatusCode::NO_CONTENT)
}

/// Body of `POST /api/tasks/validate`.
#[derive(Debug, Deserialize)]
pub struct ValidateTask {
    /// Candidate title.
    #[serde(default)]
    pub title: String,
    /// Candidate description.
    #[serde(default)]
    pub description: String,
}

/// `POST /api/tasks/validate` — dry-run validation for form feedback.
///
/// Always responds 200; the body carries field-level messages and is empty
/// when the input is valid.
pub async fn validate_task(Json(body): Json<ValidateTask>) -> Json<ValidationMessages> {
    let v = crate::store::models::validate(&body.title, &body.description);
    Json(ValidationMessages::from(&v))
}

/// `GET /api/events` — SSE stream of task list snapshots.
///
/// Sends an initial snapshot, then a fresh one on every change
/// notification. The broadcaster subscription is owned by the stream, so
/// client disconnect (or any other way the stream is dropped) releases it.
pub async fn get_events(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let (tx, rx) = mpsc::unbounded_channel::<String>();

    // Initial snapshot so clients render without waiting for a change.
    match snapshot(&state, &params) {
        Ok(payload) => {
            let _ = tx.send(payload);
        }
        Err(err) => tracing::error!(error = %err, "rendering initial task snapshot"),
    }

    let subscription = {
        let snap_state = state.clone();
        let params = params.clone();
        events::on_tasks_changed(&state.broadcaster, move |_| {
            match snapshot(&snap_state, &params) {
                Ok(payload) => {
                    let _ = tx.send(payload);
                }
                Err(err) => tracing::error!(error = %err, "refreshing task snapshot"),
            }
        })
    };

    let stream = futures_util::stream::unfold((rx, subscription), |(mut rx, sub)| async move {
        let payload = rx.recv().await?;
        let event = SseEvent::default().event("tasks").data(payload);
        Some((Ok::<_, Infallible>(event), (rx, sub)))
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(SSE_HEARTBEAT))
}

fn snapshot(state: &AppState, params: &ListParams) -> Result<String, Error> {
    let views = task_views(state, params)?;
    Ok(serde_json::to_string(&views)?)
}
