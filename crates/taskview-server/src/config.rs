use std::env;

use anyhow::Context;

pub const DEFAULT_TODOIST_URL: &str = "https://api.todoist.com";
pub const DEFAULT_OPENROUTER_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_OPENROUTER_MODEL: &str = "openai/gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub port: u16,
    pub todoist_base_url: String,
    pub openrouter: OpenRouterConfig,
}

#[derive(Clone)]
pub struct OpenRouterConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl std::fmt::Debug for OpenRouterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PORT must be a port number")?,
            todoist_base_url: env::var("TODOIST_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_TODOIST_URL.to_string()),
            openrouter: OpenRouterConfig {
                api_key: env::var("OPENROUTER_API_KEY").ok().filter(|key| !key.is_empty()),
                model: env::var("OPENROUTER_MODEL")
                    .unwrap_or_else(|_| DEFAULT_OPENROUTER_MODEL.to_string()),
                base_url: env::var("OPENROUTER_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_OPENROUTER_URL.to_string()),
            },
        })
    }
}
