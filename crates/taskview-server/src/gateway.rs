use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use taskview_shared::{
    api::{validate_task_id, CompletedTasksResponse, TaskUpdate},
    Project, RawTask, Section,
};
use uuid::Uuid;

use crate::error::AppError;

const REST: &str = "/rest/v2";
const SYNC: &str = "/sync/v9";

/// A successful upstream reply.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayResponse {
    Json(Value),
    /// `204 No Content`; there is no body to read.
    NoContent,
}

impl GatewayResponse {
    fn into_json<T: DeserializeOwned>(self) -> Result<T, AppError> {
        let value = match self {
            GatewayResponse::Json(value) => value,
            GatewayResponse::NoContent => Value::Null,
        };
        serde_json::from_value(value).map_err(|e| {
            tracing::error!("Unexpected Todoist response shape: {}", e);
            AppError::remote(502, "Unexpected Todoist API response")
        })
    }
}

/// Thin client for the Todoist REST and Sync APIs.
#[derive(Clone)]
pub struct TodoistGateway {
    client: Client,
    base_url: String,
}

impl TodoistGateway {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Sends one request on behalf of the owner of `token`.
    ///
    /// `Authorization` and `Content-Type` are always set here and win over
    /// anything in `headers`.
    pub async fn request(
        &self,
        token: &str,
        method: Method,
        path: &str,
        body: Option<&Value>,
        headers: HeaderMap,
    ) -> Result<GatewayResponse, AppError> {
        let mut headers = headers;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| AppError::DecryptionFailure)?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut request = self
            .client
            .request(method.clone(), format!("{}{}", self.base_url, path))
            .headers(headers);
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(%method, path, "Todoist request failed: {}", e);
            AppError::remote(500, "Failed to make Todoist API request")
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%method, path, status = status.as_u16(), "Todoist API error");
            return Err(AppError::remote(
                status.as_u16(),
                format!(
                    "Todoist API error: {}",
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            ));
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(GatewayResponse::NoContent);
        }

        let value = response.json::<Value>().await.map_err(|e| {
            tracing::error!(%method, path, "Failed to read Todoist response: {}", e);
            AppError::remote(500, "Failed to make Todoist API request")
        })?;

        Ok(GatewayResponse::Json(value))
    }

    async fn get<T: DeserializeOwned>(&self, token: &str, path: &str) -> Result<T, AppError> {
        self.request(token, Method::GET, path, None, HeaderMap::new())
            .await?
            .into_json()
    }

    /// Writes carry a fresh `X-Request-Id` so Todoist can drop duplicates.
    async fn write(
        &self,
        token: &str,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<GatewayResponse, AppError> {
        let mut headers = HeaderMap::new();
        if let Ok(id) = HeaderValue::from_str(&Uuid::new_v4().to_string()) {
            headers.insert("x-request-id", id);
        }
        self.request(token, method, path, body, headers).await
    }

    pub async fn projects(&self, token: &str) -> Result<Vec<Project>, AppError> {
        self.get(token, &format!("{REST}/projects")).await
    }

    pub async fn sections(&self, token: &str) -> Result<Vec<Section>, AppError> {
        self.get(token, &format!("{REST}/sections")).await
    }

    pub async fn tasks(&self, token: &str) -> Result<Vec<RawTask>, AppError> {
        self.get(token, &format!("{REST}/tasks")).await
    }

    pub async fn completed_tasks(&self, token: &str) -> Result<CompletedTasksResponse, AppError> {
        self.get(token, &format!("{SYNC}/completed/get_all")).await
    }

    /// Validates the patch before anything leaves the process.
    pub async fn update_task(
        &self,
        token: &str,
        task_id: &str,
        update: &TaskUpdate,
    ) -> Result<GatewayResponse, AppError> {
        update.validate()?;
        let body = serde_json::to_value(update)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode update: {}", e)))?;

        tracing::debug!(task_id, "Updating Todoist task");
        let path = task_path(task_id, "")?;
        self.write(token, Method::POST, &path, Some(&body)).await
    }

    pub async fn close_task(
        &self,
        token: &str,
        task_id: &str,
    ) -> Result<GatewayResponse, AppError> {
        let path = task_path(task_id, "/close")?;
        self.write(token, Method::POST, &path, None).await
    }

    pub async fn reopen_task(
        &self,
        token: &str,
        task_id: &str,
    ) -> Result<GatewayResponse, AppError> {
        let path = task_path(task_id, "/reopen")?;
        self.write(token, Method::POST, &path, None).await
    }

    pub async fn delete_task(
        &self,
        token: &str,
        task_id: &str,
    ) -> Result<GatewayResponse, AppError> {
        let path = task_path(task_id, "")?;
        self.write(token, Method::DELETE, &path, None).await
    }
}

/// `/rest/v2/tasks/{id}{suffix}`, refusing ids that would leave that path.
fn task_path(task_id: &str, suffix: &str) -> Result<String, AppError> {
    validate_task_id(task_id)?;
    Ok(format!("{REST}/tasks/{task_id}{suffix}"))
}
