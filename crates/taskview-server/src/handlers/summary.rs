use axum::{extract::State, Json};
use taskview_shared::api::{SummaryRequest, SummaryResponse};

use crate::error::{AppError, AppJson};
use crate::routes::AppState;

/// POST /api/summary
pub async fn generate_summary(
    State(state): State<AppState>,
    AppJson(req): AppJson<SummaryRequest>,
) -> Result<Json<SummaryResponse>, AppError> {
    let summary = state.summaries.summarize(&req).await?;
    Ok(Json(SummaryResponse { summary }))
}
