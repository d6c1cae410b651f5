use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use taskview_shared::{
    api::{CompletedTasksResponse, TaskUpdate, UpdateTaskRequest},
    Project, RawTask, Section,
};

use crate::auth::SessionUser;
use crate::error::{AppError, AppJson};
use crate::gateway::GatewayResponse;
use crate::routes::AppState;

type Session = Option<Extension<SessionUser>>;

fn session(user: &Session) -> Option<&SessionUser> {
    user.as_ref().map(|Extension(user)| user)
}

fn respond(result: GatewayResponse) -> Response {
    match result {
        GatewayResponse::NoContent => StatusCode::NO_CONTENT.into_response(),
        GatewayResponse::Json(value) => Json(value).into_response(),
    }
}

/// GET /api/todoist/projects
pub async fn list_projects(
    State(state): State<AppState>,
    user: Session,
) -> Result<Json<Vec<Project>>, AppError> {
    Ok(Json(state.todoist.projects(session(&user)).await?))
}

/// GET /api/todoist/sections
pub async fn list_sections(
    State(state): State<AppState>,
    user: Session,
) -> Result<Json<Vec<Section>>, AppError> {
    Ok(Json(state.todoist.sections(session(&user)).await?))
}

/// GET /api/todoist/tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    user: Session,
) -> Result<Json<Vec<RawTask>>, AppError> {
    Ok(Json(state.todoist.tasks(session(&user)).await?))
}

/// GET /api/todoist/completed
pub async fn list_completed(
    State(state): State<AppState>,
    user: Session,
) -> Result<Json<CompletedTasksResponse>, AppError> {
    Ok(Json(state.todoist.completed_tasks(session(&user)).await?))
}

/// PUT /api/todoist/tasks
pub async fn update_task_by_body(
    State(state): State<AppState>,
    user: Session,
    AppJson(req): AppJson<UpdateTaskRequest>,
) -> Result<Response, AppError> {
    let (task_id, update) = req.into_parts()?;
    let result = state
        .todoist
        .update_task(session(&user), &task_id, &update)
        .await?;
    Ok(respond(result))
}

/// POST /api/todoist/tasks/:id
pub async fn update_task(
    State(state): State<AppState>,
    user: Session,
    Path(task_id): Path<String>,
    AppJson(update): AppJson<TaskUpdate>,
) -> Result<Response, AppError> {
    let result = state
        .todoist
        .update_task(session(&user), &task_id, &update)
        .await?;
    Ok(respond(result))
}

/// POST /api/todoist/tasks/:id/close
pub async fn close_task(
    State(state): State<AppState>,
    user: Session,
    Path(task_id): Path<String>,
) -> Result<Response, AppError> {
    let result = state.todoist.close_task(session(&user), &task_id).await?;
    Ok(respond(result))
}

/// POST /api/todoist/tasks/:id/reopen
pub async fn reopen_task(
    State(state): State<AppState>,
    user: Session,
    Path(task_id): Path<String>,
) -> Result<Response, AppError> {
    let result = state.todoist.reopen_task(session(&user), &task_id).await?;
    Ok(respond(result))
}

/// DELETE /api/todoist/tasks/:id
pub async fn delete_task(
    State(state): State<AppState>,
    user: Session,
    Path(task_id): Path<String>,
) -> Result<Response, AppError> {
    let result = state.todoist.delete_task(session(&user), &task_id).await?;
    Ok(respond(result))
}
