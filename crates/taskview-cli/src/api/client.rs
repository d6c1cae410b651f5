use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use taskview_shared::{
    api::{
        CompletedTasksResponse, ErrorResponse, SetTokenRequest, SummaryRequest, SummaryResponse,
        TaskUpdate, TokenStatus, UpdateTaskRequest, ValidationError,
    },
    Project, RawTask, Section,
};

use super::session::Session;

/// Header the proxy cross-checks against the session subject.
const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not authenticated")]
    Unauthorized,
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Server error ({status}): {message}")]
    Remote { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

/// Client for the taskview proxy.
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Option<Session>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session: None,
        }
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Load the session from disk
    pub fn load_session(&mut self) -> anyhow::Result<bool> {
        self.session = Session::load()?;
        Ok(self.session.is_some())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.user_id.as_str())
    }

    /// Build URL for endpoint
    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Starts a request carrying the session token and user id.
    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let session = self.session.as_ref().ok_or(ApiError::Unauthorized)?;
        if session.is_expired(chrono::Utc::now().timestamp()) {
            tracing::warn!(user_id = %session.user_id, "Session expired");
            return Err(ApiError::Unauthorized);
        }

        Ok(self
            .client
            .request(method, self.url(path))
            .bearer_auth(&session.token)
            .header(USER_ID_HEADER, &session.user_id))
    }

    async fn authed_get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.authed(Method::GET, path)?.send().await?;
        Self::handle_response(response).await
    }

    async fn authed_send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ApiError> {
        let mut request = self.authed(method, path)?;
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        Self::handle_empty_response(response).await
    }

    /// Handle API response
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        match response.status() {
            StatusCode::OK | StatusCode::CREATED => {
                response.json().await.map_err(ApiError::Network)
            }
            _ => Err(Self::error_from(response).await),
        }
    }

    /// Handle a response whose body, if any, is not needed
    async fn handle_empty_response(response: reqwest::Response) -> Result<(), ApiError> {
        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
            _ => Err(Self::error_from(response).await),
        }
    }

    async fn error_from(response: reqwest::Response) -> ApiError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|body| body.error)
            .unwrap_or(text);

        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ApiError::Validation(message)
            }
            _ => ApiError::Remote {
                status: status.as_u16(),
                message,
            },
        }
    }

    // ============ Todoist ============

    pub async fn projects(&self) -> Result<Vec<Project>, ApiError> {
        self.authed_get("/todoist/projects").await
    }

    pub async fn sections(&self) -> Result<Vec<Section>, ApiError> {
        self.authed_get("/todoist/sections").await
    }

    pub async fn tasks(&self) -> Result<Vec<RawTask>, ApiError> {
        self.authed_get("/todoist/tasks").await
    }

    pub async fn completed_tasks(&self) -> Result<CompletedTasksResponse, ApiError> {
        self.authed_get("/todoist/completed").await
    }

    pub async fn update_task(&self, task_id: &str, update: &TaskUpdate) -> Result<(), ApiError> {
        update.validate()?;
        let body = UpdateTaskRequest {
            id: Some(task_id.to_string()),
            update: update.clone(),
        };
        self.authed_send(Method::PUT, "/todoist/tasks", Some(&body))
            .await
    }

    pub async fn close_task(&self, task_id: &str) -> Result<(), ApiError> {
        self.authed_send::<()>(Method::POST, &format!("/todoist/tasks/{task_id}/close"), None)
            .await
    }

    pub async fn reopen_task(&self, task_id: &str) -> Result<(), ApiError> {
        self.authed_send::<()>(Method::POST, &format!("/todoist/tasks/{task_id}/reopen"), None)
            .await
    }

    pub async fn delete_task(&self, task_id: &str) -> Result<(), ApiError> {
        self.authed_send::<()>(Method::DELETE, &format!("/todoist/tasks/{task_id}"), None)
            .await
    }

    // ============ Token ============

    pub async fn token_status(&self) -> Result<TokenStatus, ApiError> {
        self.authed_get("/token").await
    }

    pub async fn set_token(&self, token: &str) -> Result<(), ApiError> {
        let body = SetTokenRequest {
            token: token.to_string(),
        };
        self.authed_send(Method::PUT, "/token", Some(&body)).await
    }

    pub async fn remove_token(&self) -> Result<(), ApiError> {
        self.authed_send::<()>(Method::DELETE, "/token", None).await
    }

    // ============ Summary ============

    pub async fn summarize(&self, request: &SummaryRequest) -> Result<String, ApiError> {
        let response = self
            .authed(Method::POST, "/summary")?
            .json(request)
            .send()
            .await?;
        let body: SummaryResponse = Self::handle_response(response).await?;
        Ok(body.summary)
    }
}
