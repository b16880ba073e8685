use autodoc::config::Config;
use autodoc::db::ConnectionPool;
use autodoc::remote::{ClientCredentialsProvider, GraphStore};
use autodoc::router::{AutodocState, autodoc_router};
use autodoc::service::Orchestrator;
use mimalloc::MiMalloc;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // a bad variable must stop startup, not fall back to defaults
    let cfg = Config::load()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.database.url,
        pool_min = cfg.database.min_connections,
        pool_max = cfg.database.max_connections,
        graph = %cfg.remote.graph_base_url,
        drive_id = %cfg.remote.drive_id,
        loglevel = %cfg.basic.loglevel,
    );
    if cfg.remote.client_id.is_empty() || cfg.remote.drive_id.is_empty() {
        warn!("remote store credentials are not configured; remote writes will fail");
    }

    let pool = ConnectionPool::new(cfg.database.clone());
    pool.connect().await?;
    pool.init_schema().await?;

    let store = GraphStore::new(&cfg.remote)?;
    let tokens = ClientCredentialsProvider::new(&cfg.remote)?;
    let orchestrator = Orchestrator::new(pool.clone(), Arc::new(store), Arc::new(tokens))
        .with_upload_limit(cfg.remote.small_file_limit);

    let state = AutodocState::new(Arc::new(orchestrator));
    let app = autodoc_router(state);

    let listener = TcpListener::bind(cfg.basic.listen_addr.as_str()).await?;
    info!("HTTP server listening on {}", cfg.basic.listen_addr);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    pool.close_all().await;
    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received; draining");
}
