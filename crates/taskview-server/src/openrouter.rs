use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use taskview_shared::{api::SummaryRequest, Task};

use crate::config::OpenRouterConfig;
use crate::error::AppError;

const MAX_TOKENS: u32 = 250;

const SYSTEM_PROMPT: &str = "Only perform the action the user specifies. \
Do not add a greeting, preface, or summary of your work. Use only plain text in your responses.";

const USER_PROMPT: &str = "The following tasks are what the user plans to finish today. \
Assess whether they can be done in a normal day. Speak directly to the user; be kind but firm.";

#[derive(Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client for the "can this all get done today" summary.
#[derive(Clone)]
pub struct SummaryClient {
    client: Client,
    config: OpenRouterConfig,
}

impl SummaryClient {
    pub fn new(config: OpenRouterConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub async fn summarize(&self, request: &SummaryRequest) -> Result<String, AppError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::remote(500, "OpenRouter API key is not configured"))?;

        let prompt = format!(
            "{}\nProject tasks:\n{}\nOther tasks:\n{}",
            USER_PROMPT,
            task_lines(&request.project_tasks),
            task_lines(&request.other_tasks),
        );
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "max_tokens": MAX_TOKENS,
        });

        tracing::info!(model = %self.config.model, "Requesting task summary");
        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Error connecting to OpenRouter: {}", e);
                AppError::remote(500, "Failed to connect to OpenRouter")
            })?;

        let status = response.status();
        let payload: serde_json::Value = response.json().await.unwrap_or_default();
        if !status.is_success() {
            let message = payload["error"]["message"]
                .as_str()
                .unwrap_or("Failed to fetch from OpenRouter")
                .to_string();
            tracing::warn!(status = status.as_u16(), "OpenRouter API error: {}", message);
            return Err(AppError::remote(status.as_u16(), message));
        }

        let completion: ChatCompletion = serde_json::from_value(payload)
            .map_err(|_| AppError::remote(502, "Invalid API response structure"))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AppError::remote(502, "Invalid API response structure"))
    }
}

fn task_lines(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "(none)".to_string();
    }
    tasks
        .iter()
        .map(|task| {
            let due = task.due_day().unwrap_or("no due date");
            format!(
                "- {} [{} / {}] priority {}, due {}",
                task.content, task.project_name, task.section_name, task.priority, due
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn config(base_url: String, api_key: Option<&str>) -> OpenRouterConfig {
        OpenRouterConfig {
            api_key: api_key.map(str::to_string),
            model: "test/model".into(),
            base_url,
        }
    }

    #[tokio::test]
    async fn returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer or-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "Too much." } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = SummaryClient::new(config(server.uri(), Some("or-key")));
        let summary = client.summarize(&SummaryRequest::default()).await.unwrap();
        assert_eq!(summary, "Too much.");
    }

    #[tokio::test]
    async fn upstream_error_message_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": { "message": "Rate limited" }
            })))
            .mount(&server)
            .await;

        let client = SummaryClient::new(config(server.uri(), Some("or-key")));
        match client.summarize(&SummaryRequest::default()).await {
            Err(AppError::RemoteApi { status, message }) => {
                assert_eq!(status, 429);
                assert_eq!(message, "Rate limited");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_key_fails_without_calling_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = SummaryClient::new(config(server.uri(), None));
        assert!(matches!(
            client.summarize(&SummaryRequest::default()).await,
            Err(AppError::RemoteApi { status: 500, .. })
        ));
    }
}
