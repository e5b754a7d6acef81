use std::sync::Arc;

use game_catalog::{
    api::{create_router, AppState},
    config::Config,
    db::{self, CatalogStore, MemoryStore, PgStore},
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing("info,game_catalog=debug")?;

    let config = Config::from_env()?;

    let store: Arc<dyn CatalogStore> = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url, config.database_max_connections).await?;
            db::run_migrations(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, serving an in-memory catalog");
            Arc::new(MemoryStore::new())
        }
    };
    tracing::info!(store = store.name(), "Catalog store ready");

    // Create the router with all routes
    let app = create_router(AppState::with_store(store));

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
