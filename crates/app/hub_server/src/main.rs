//! Service Hub API server binary.
//!
//! Runs the startup checks once, then serves the HTTP API until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use hub_api::config::{ApiConfig, DEFAULT_BIND_ADDR, DEFAULT_DATABASE_URL};
use hub_core::credentials::PgCredentialStore;
use hub_core::llm::GeminiClient;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "info,hub_api=debug,hub_core=debug";

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "hub_server", about = "Service Hub API server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = DEFAULT_BIND_ADDR)]
    bind_addr: String,

    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 5)]
    max_connections: u32,

    /// How long a request waits for a pooled connection, in seconds.
    #[arg(long, default_value_t = 10)]
    acquire_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();

    let config = ApiConfig {
        bind_addr: args.bind_addr,
        pg_connection_url: args.database_url,
        db_max_connections: args.max_connections,
        ..ApiConfig::from_env()
    };

    info!(
        version = hub_core::version(),
        bind_addr = %config.bind_addr,
        max_connections = config.db_max_connections,
        model = %config.llm.model,
        "starting hub_server"
    );

    // Connections are opened on first use so a database outage surfaces
    // through /health/ and /ready/ instead of aborting startup.
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(args.acquire_timeout_secs))
        .connect_lazy(&config.pg_connection_url)?;

    let generator = GeminiClient::new(&config.llm)?;
    let readiness = hub_api::startup::run(&pool, &generator).await;
    if !readiness.is_ready() {
        warn!(?readiness, "starting without every startup check passing");
    }

    let state = hub_api::AppState {
        pool: pool.clone(),
        config: config.clone(),
        credentials: Arc::new(PgCredentialStore::new(pool.clone())),
        generator: Arc::new(generator),
        readiness,
    };

    let app = hub_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
