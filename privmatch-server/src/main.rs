use clap::Parser;
use privmatch_server::{app, AppState, Config};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        dimension = config.dimension,
        metric = ?config.metric,
        data_dir = ?config.data_dir,
        "starting privmatch-server"
    );

    let state = AppState::from_config(&config).await?;
    let store = state.store.clone();

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("listening on {}", config.bind);
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.flush().await?;
    info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
