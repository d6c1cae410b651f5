pub mod auth;
pub mod cipher;
pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod openrouter;
pub mod routes;
pub mod todoist;

pub use config::Config;
pub use db::DbPool;
pub use error::AppError;
pub use routes::{create_router, AppState};
