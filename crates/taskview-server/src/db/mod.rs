use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

mod tokens;

pub use tokens::{MemoryTokenStore, PgTokenStore, StoredToken, TokenStore};

pub type DbPool = PgPool;

pub async fn create_pool(database_url: &str) -> anyhow::Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    Ok(pool)
}
