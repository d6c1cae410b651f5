use std::net::SocketAddr;
use std::sync::Arc;

use taskview_server::{
    config::Config,
    create_router,
    db::{self, MemoryTokenStore, PgTokenStore, TokenStore},
    AppState,
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskview_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn TokenStore> = match &config.database_url {
        Some(url) => {
            let store = PgTokenStore::new(db::create_pool(url).await?);
            store.ensure_schema().await?;
            tracing::info!("Using Postgres token store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; stored tokens live in memory only");
            Arc::new(MemoryTokenStore::new())
        }
    };

    let port = config.port;
    let app = create_router(AppState::new(config, store));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
