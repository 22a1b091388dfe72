use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    Duration, ExpandedSchedule, ExpansionConfig, FieldIssue, MilestoneId, MilestoneNode,
    OffsetError, PreviewService, Priority, RelativeOffset, TaskId, TaskNode, TemplateError,
    TemplateGraph, parse_and_validate_with,
};

/// One editing session: a single template shared behind a lock, plus the
/// stateless preview service.
#[derive(Clone)]
pub struct AppState {
    template: Arc<RwLock<TemplateGraph>>,
    preview: Arc<PreviewService>,
}

impl AppState {
    pub fn new(template: TemplateGraph, config: ExpansionConfig) -> Self {
        Self {
            template: Arc::new(RwLock::new(template)),
            preview: Arc::new(PreviewService::new(config)),
        }
    }

    pub fn with_shared(template: Arc<RwLock<TemplateGraph>>, config: ExpansionConfig) -> Self {
        Self {
            template,
            preview: Arc::new(PreviewService::new(config)),
        }
    }

    fn template(&self) -> Arc<RwLock<TemplateGraph>> {
        self.template.clone()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    issue: Option<FieldIssue>,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Invalid(String),
    Unprocessable {
        message: String,
        issue: Option<FieldIssue>,
    },
}

impl ApiError {
    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

impl From<TemplateError> for ApiError {
    fn from(value: TemplateError) -> Self {
        match value {
            TemplateError::MilestoneNotFound(_) | TemplateError::TaskNotFound { .. } => {
                ApiError::NotFound(value.to_string())
            }
            other => ApiError::Invalid(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => {
                let body = Json(ErrorBody {
                    error: "not_found",
                    message,
                    issue: None,
                });
                (StatusCode::NOT_FOUND, body).into_response()
            }
            ApiError::Invalid(message) => {
                let body = Json(ErrorBody {
                    error: "invalid_request",
                    message,
                    issue: None,
                });
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            ApiError::Unprocessable { message, issue } => {
                let body = Json(ErrorBody {
                    error: "not_computable",
                    message,
                    issue,
                });
                (StatusCode::UNPROCESSABLE_ENTITY, body).into_response()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct MilestonePayload {
    name: String,
    #[serde(default)]
    description: Option<String>,
    start_offset: RelativeOffset,
    due_offset: RelativeOffset,
    #[serde(default)]
    after_position: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct MilestoneUpdate {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    start_offset: Option<RelativeOffset>,
    #[serde(default)]
    due_offset: Option<RelativeOffset>,
}

#[derive(Debug, Deserialize)]
struct TaskPayload {
    title: String,
    #[serde(default)]
    description: Option<String>,
    due_offset: RelativeOffset,
    #[serde(default)]
    priority: Option<Priority>,
    #[serde(default)]
    estimated_hours: Option<f64>,
    #[serde(default)]
    after_position: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct TaskUpdate {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    due_offset: Option<RelativeOffset>,
    #[serde(default)]
    priority: Option<Priority>,
    #[serde(default)]
    estimated_hours: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ReorderPayload {
    order: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct ParsePayload {
    text: String,
}

#[derive(Debug, Serialize)]
struct ParsedOffset {
    days: i64,
    description: String,
}

impl From<Duration> for ParsedOffset {
    fn from(value: Duration) -> Self {
        Self {
            days: value.days(),
            description: value.describe(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PreviewPayload {
    anchor: NaiveDate,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/template", get(get_template).put(replace_template))
        .route("/milestones", post(create_milestone))
        .route("/milestones/reorder", post(reorder_milestones))
        .route(
            "/milestones/:id",
            put(update_milestone).delete(delete_milestone),
        )
        .route("/milestones/:id/tasks", post(create_task))
        .route("/milestones/:id/tasks/reorder", post(reorder_tasks))
        .route(
            "/milestones/:id/tasks/:task_id",
            put(update_task).delete(delete_task),
        )
        .route("/parse", post(parse_offset))
        .route("/preview", post(preview_schedule))
        .route("/preview/issues", get(preview_issues))
        .with_state(state)
}

pub async fn serve(
    addr: SocketAddr,
    template: TemplateGraph,
    config: ExpansionConfig,
) -> std::io::Result<()> {
    let state = AppState::new(template, config);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("template-schedule HTTP API listening on http://{addr}");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn get_template(State(state): State<AppState>) -> Json<TemplateGraph> {
    let template = state.template();
    let snapshot = template.read().clone();
    Json(snapshot)
}

async fn replace_template(
    State(state): State<AppState>,
    Json(replacement): Json<TemplateGraph>,
) -> Result<Json<TemplateGraph>, ApiError> {
    replacement.validate_structure()?;
    let template = state.template();
    {
        let mut guard = template.write();
        *guard = replacement.clone();
    }
    tracing::debug!(name = %replacement.name, "template replaced");
    Ok(Json(replacement))
}

async fn create_milestone(
    State(state): State<AppState>,
    Json(payload): Json<MilestonePayload>,
) -> Result<(StatusCode, Json<MilestoneNode>), ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::invalid("milestone name must not be empty"));
    }
    let template = state.template();
    let created = {
        let mut guard = template.write();
        let milestone = guard.add_milestone(
            payload.name,
            payload.start_offset,
            payload.due_offset,
            payload.after_position,
        )?;
        milestone.description = payload.description;
        milestone.clone()
    };
    tracing::debug!(id = created.id, "milestone created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_milestone(
    State(state): State<AppState>,
    Path(id): Path<MilestoneId>,
    Json(update): Json<MilestoneUpdate>,
) -> Result<Json<MilestoneNode>, ApiError> {
    let template = state.template();
    let mut guard = template.write();
    guard.set_milestone_offsets(id, update.start_offset, update.due_offset)?;
    let milestone = guard
        .milestone_mut(id)
        .ok_or(TemplateError::MilestoneNotFound(id))?;
    if let Some(name) = update.name {
        milestone.name = name;
    }
    if update.description.is_some() {
        milestone.description = update.description;
    }
    Ok(Json(milestone.clone()))
}

async fn delete_milestone(
    State(state): State<AppState>,
    Path(id): Path<MilestoneId>,
) -> Result<StatusCode, ApiError> {
    let template = state.template();
    let removed = template.write().remove_milestone(id)?;
    tracing::debug!(id, tasks = removed.tasks.len(), "milestone removed");
    Ok(StatusCode::NO_CONTENT)
}

async fn reorder_milestones(
    State(state): State<AppState>,
    Json(payload): Json<ReorderPayload>,
) -> Result<Json<Vec<MilestoneNode>>, ApiError> {
    let template = state.template();
    let mut guard = template.write();
    guard.reorder_milestones(&payload.order)?;
    Ok(Json(guard.milestones().to_vec()))
}

async fn create_task(
    State(state): State<AppState>,
    Path(milestone_id): Path<MilestoneId>,
    Json(payload): Json<TaskPayload>,
) -> Result<(StatusCode, Json<TaskNode>), ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::invalid("task title must not be empty"));
    }
    let template = state.template();
    let created = {
        let mut guard = template.write();
        let task = guard.add_task(
            milestone_id,
            payload.title,
            payload.due_offset,
            payload.after_position,
        )?;
        task.description = payload.description;
        task.priority = payload.priority.unwrap_or_default();
        task.estimated_hours = payload.estimated_hours;
        task.clone()
    };
    tracing::debug!(milestone_id, id = created.id, "task created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_task(
    State(state): State<AppState>,
    Path((milestone_id, task_id)): Path<(MilestoneId, TaskId)>,
    Json(update): Json<TaskUpdate>,
) -> Result<Json<TaskNode>, ApiError> {
    let template = state.template();
    let mut guard = template.write();
    if let Some(due) = update.due_offset {
        guard.set_task_due_offset(milestone_id, task_id, due)?;
    }
    let task = guard
        .milestone_mut(milestone_id)
        .ok_or(TemplateError::MilestoneNotFound(milestone_id))?
        .tasks
        .iter_mut()
        .find(|t| t.id == task_id)
        .ok_or(TemplateError::TaskNotFound {
            milestone: milestone_id,
            task: task_id,
        })?;
    if let Some(title) = update.title {
        task.title = title;
    }
    if update.description.is_some() {
        task.description = update.description;
    }
    if let Some(priority) = update.priority {
        task.priority = priority;
    }
    if update.estimated_hours.is_some() {
        task.estimated_hours = update.estimated_hours;
    }
    Ok(Json(task.clone()))
}

async fn delete_task(
    State(state): State<AppState>,
    Path((milestone_id, task_id)): Path<(MilestoneId, TaskId)>,
) -> Result<StatusCode, ApiError> {
    let template = state.template();
    template.write().remove_task(milestone_id, task_id)?;
    tracing::debug!(milestone_id, id = task_id, "task removed");
    Ok(StatusCode::NO_CONTENT)
}

async fn reorder_tasks(
    State(state): State<AppState>,
    Path(milestone_id): Path<MilestoneId>,
    Json(payload): Json<ReorderPayload>,
) -> Result<Json<Vec<TaskNode>>, ApiError> {
    let template = state.template();
    let mut guard = template.write();
    guard.reorder_tasks(milestone_id, &payload.order)?;
    let tasks = guard
        .milestone(milestone_id)
        .map(|m| m.tasks.clone())
        .unwrap_or_default();
    Ok(Json(tasks))
}

/// Checks one field against the same limits `/preview` applies.
async fn parse_offset(
    State(state): State<AppState>,
    Json(payload): Json<ParsePayload>,
) -> Result<Json<ParsedOffset>, ApiError> {
    parse_and_validate_with(&payload.text, state.preview.config().limits())
        .map(|duration| Json(ParsedOffset::from(duration)))
        .map_err(|err: OffsetError| ApiError::Unprocessable {
            message: err.to_string(),
            issue: None,
        })
}

async fn preview_schedule(
    State(state): State<AppState>,
    Json(payload): Json<PreviewPayload>,
) -> Result<Json<ExpandedSchedule>, ApiError> {
    let template = state.template();
    let result = {
        let guard = template.read();
        state.preview.preview(&guard, payload.anchor)
    };
    result.map(Json).map_err(|err| ApiError::Unprocessable {
        message: err.to_string(),
        issue: Some(FieldIssue::from(&err)),
    })
}

async fn preview_issues(State(state): State<AppState>) -> Json<Vec<FieldIssue>> {
    let template = state.template();
    let issues = {
        let guard = template.read();
        state.preview.field_issues(&guard)
    };
    Json(issues)
}
