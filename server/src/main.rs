use anyhow::Context;
use clap::Parser;
use todo_core::TodoStore;
use todo_kv::LogStore;
use todo_server::{app, Config};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(config.log_level());

    tracing::info!("todo v{} starting", env!("CARGO_PKG_VERSION"));

    let engine = LogStore::open(&config.data_dir, config.log_options())
        .with_context(|| format!("opening data directory {}", config.data_dir.display()))?;
    let store = TodoStore::new(engine);
    tracing::info!(next_id = store.next_id()?, "store ready");

    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app(store))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("todo stopped");
    Ok(())
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},tower_http=debug")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
