use anyhow::Context;
use clap::Parser;
use privebank_pix::app::{build_router, AppState, Config};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "privebank-pix", about = "PriveBank PIX deposit service")]
struct Cli {
    /// Optional TOML config file; environment variables override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides PORT and the config file).
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).context("invalid configuration")?;
    if let Some(port) = cli.port {
        config.server_port = port;
    }

    info!(
        "Starting PriveBank PIX service on port {} (gateway {})",
        config.server_port, config.abacatepay_api_url
    );

    let state = Arc::new(AppState::from_config(&config).context("failed to build services")?);
    let app = build_router(state).layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
