use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::auth::auth_middleware;
use crate::credentials::CredentialResolver;
use crate::db::TokenStore;
use crate::gateway::TodoistGateway;
use crate::handlers::{
    summary as summary_handlers, todoist as todoist_handlers, token as token_handlers,
};
use crate::openrouter::SummaryClient;
use crate::todoist::TodoistService;
use crate::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub todoist: TodoistService,
    pub summaries: SummaryClient,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn TokenStore>) -> Self {
        let todoist = TodoistService::new(
            CredentialResolver::new(store),
            TodoistGateway::new(&config.todoist_base_url),
        );
        let summaries = SummaryClient::new(config.openrouter.clone());
        Self {
            config,
            todoist,
            summaries,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    // Todoist proxy routes
    let todoist_routes = Router::new()
        .route("/projects", get(todoist_handlers::list_projects))
        .route("/sections", get(todoist_handlers::list_sections))
        .route(
            "/tasks",
            get(todoist_handlers::list_tasks).put(todoist_handlers::update_task_by_body),
        )
        .route("/completed", get(todoist_handlers::list_completed))
        .route(
            "/tasks/:id",
            post(todoist_handlers::update_task).delete(todoist_handlers::delete_task),
        )
        .route("/tasks/:id/close", post(todoist_handlers::close_task))
        .route("/tasks/:id/reopen", post(todoist_handlers::reopen_task));

    // Protected routes with session middleware
    let protected_routes = Router::new()
        .nest("/todoist", todoist_routes)
        .route(
            "/token",
            get(token_handlers::token_status)
                .put(token_handlers::save_token)
                .delete(token_handlers::delete_token),
        )
        .route("/summary", post(summary_handlers::generate_summary))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
