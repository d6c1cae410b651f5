use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, routes::AppState};

use super::jwt::verify_session_token;

/// Header naming the user whose Todoist token should be used. Only honoured
/// when it agrees with the verified session.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Identity established by a verified session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: String,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthenticated)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthenticated)?;

    let claims = verify_session_token(token, &state.config.jwt_secret)?;

    if let Some(claimed) = request.headers().get(USER_ID_HEADER) {
        let claimed = claimed.to_str().map_err(|_| AppError::Unauthenticated)?;
        if claimed != claims.sub {
            tracing::warn!(session_user = %claims.sub, "x-user-id does not match session");
            return Err(AppError::Unauthenticated);
        }
    }

    request.extensions_mut().insert(SessionUser { id: claims.sub });

    Ok(next.run(request).await)
}
