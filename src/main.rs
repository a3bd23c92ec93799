use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rental_pricing::cache::AppCache;
use rental_pricing::config::Config;
use rental_pricing::pricing::{PgRemotePricer, PgTierStore};
use rental_pricing::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rental_pricing=debug,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("loading configuration")?;
    info!(
        bind_addr = %config.bind_addr,
        max_connections = config.database_max_connections,
        remote_timeout_ms = config.remote_quote_timeout.as_millis() as u64,
        "Configuration loaded"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("connecting to PostgreSQL")?;
    info!("Connected to PostgreSQL");

    let state = AppState {
        store: Arc::new(PgTierStore::new(pool.clone())),
        remote: Arc::new(PgRemotePricer::new(pool, config.remote_quote_timeout)),
        cache: AppCache::new(config.tier_cache_capacity, config.tier_cache_ttl),
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, rental_pricing::app(state)).await?;

    Ok(())
}
