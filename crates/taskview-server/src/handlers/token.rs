use axum::{extract::State, http::StatusCode, Extension, Json};
use taskview_shared::api::{SetTokenRequest, TokenStatus};

use crate::auth::SessionUser;
use crate::error::{AppError, AppJson};
use crate::routes::AppState;

/// GET /api/token
pub async fn token_status(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<TokenStatus>, AppError> {
    let configured = state.todoist.credentials().is_configured(&user).await?;
    Ok(Json(TokenStatus { configured }))
}

/// PUT /api/token
pub async fn save_token(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    AppJson(req): AppJson<SetTokenRequest>,
) -> Result<StatusCode, AppError> {
    state.todoist.credentials().save(&user, &req.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/token
pub async fn delete_token(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<StatusCode, AppError> {
    state.todoist.credentials().remove(&user).await?;
    Ok(StatusCode::NO_CONTENT)
}
