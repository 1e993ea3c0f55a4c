//! toolrelay server binary

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use toolrelay_core::logging::{Logger, LoggerExt, TracingLogger};
use toolrelay_core::{
    create_provider, AgentService, ConfigProvider, EnvSecretStore, FileConfigProvider, SecretStore,
    ToolRegistry,
};
use toolrelay_server::observability::init_tracing;
use toolrelay_server::{router, AppState};

#[derive(Parser, Debug)]
#[command(name = "toolrelay")]
#[command(about = "Stream a tool-using chat agent over HTTP", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ~/.config/toolrelay/config.yaml)
    #[arg(short, long, env = "TOOLRELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:8000", env = "TOOLRELAY_BIND")]
    bind: String,

    /// Debug logging for toolrelay components
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let logger: Arc<dyn Logger> = Arc::new(TracingLogger::new());

    let config = match &cli.config {
        Some(path) => FileConfigProvider::new(path),
        None => FileConfigProvider::user(),
    };
    if !config.exists() {
        logger.warn_fmt(format_args!(
            "[Server] No config at {}, using defaults",
            config.path().display()
        ));
    }

    let settings = config
        .agent_settings()
        .await
        .with_context(|| format!("Failed to load {}", config.path().display()))?;
    let servers = config.servers().await?;

    let secrets: Arc<dyn SecretStore> = Arc::new(EnvSecretStore::new());
    let registry = Arc::new(ToolRegistry::from_config(
        &servers,
        Arc::clone(&secrets),
        Arc::clone(&logger),
    ));
    let provider = create_provider(&settings.provider, secrets, Arc::clone(&logger));
    let service = AgentService::from_settings(
        &settings,
        Arc::clone(&registry),
        provider,
        Arc::clone(&logger),
    )
    .context("Failed to read agent instructions")?;

    logger.info_fmt(format_args!(
        "[Server] Agent {} using {}/{} with {} tool providers",
        settings.name,
        settings.provider,
        settings.model,
        servers.len()
    ));

    registry.warm_up().await;

    let app = router(AppState::new(Arc::new(service), Arc::clone(&logger)));
    let listener = tokio::net::TcpListener::bind(&cli.bind)
        .await
        .with_context(|| format!("Failed to bind {}", cli.bind))?;

    logger.info_fmt(format_args!("[Server] Listening on {}", cli.bind));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    logger.info("[Server] Shutting down tool providers");
    registry.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
