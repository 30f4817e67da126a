//! REAPER OSC Bridge
//!
//! Listens for REAPER's OSC track feedback, keeps an in-memory track model and
//! serves it over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use reaper_osc_bridge::api::{self, ApiState};
use reaper_osc_bridge::config::BridgeConfig;
use reaper_osc_bridge::osc::{Listener, Notifier, Router};
use reaper_osc_bridge::state::StateStore;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// REAPER OSC Bridge - mirror REAPER track state over HTTP
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Optional YAML configuration file (environment variables override it)
    #[arg(short, long, env = "REAPER_CONFIG")]
    config: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Run only the OSC bridge, without the HTTP API
    #[arg(long)]
    no_api: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level, args.json_logs)?;

    info!("Starting REAPER OSC bridge...");

    let config = load_config(args.config.as_deref()).await?;
    info!(
        listen = %config.listen_addr(),
        send = %format!("{}:{}", config.send_host, config.send_port),
        "Configuration loaded"
    );

    run_app(config, !args.no_api, shutdown_signal()).await?;

    info!("REAPER OSC bridge shutdown complete");
    Ok(())
}

async fn load_config(path: Option<&str>) -> Result<BridgeConfig> {
    let mut config = match path {
        Some(path) => {
            info!("Configuration file: {}", path);
            BridgeConfig::load(path).await?
        }
        None => BridgeConfig::default(),
    };
    config
        .apply_env()
        .context("Invalid environment configuration")?;
    Ok(config)
}

async fn run_app(
    config: BridgeConfig,
    serve_api: bool,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    let state = StateStore::new();

    let router = Arc::new(
        Router::with_default_handlers(state.clone(), config.unhandled_policy())
            .context("Failed to build OSC handlers")?,
    );
    info!("Router initialized with {} handlers", router.handler_names().len());

    let notifier = Arc::new(Notifier::new(config.send_host.clone(), config.send_port).await?);

    // Bind failure is the one fatal error
    let listener = Listener::bind(&config.listen_addr(), router).await?.spawn()?;

    let api_task = if serve_api {
        let api_state = Arc::new(ApiState {
            state,
            notifier: notifier.clone(),
        });
        let port = config.api_port;
        Some(tokio::spawn(async move {
            if let Err(e) = api::start_server(api_state, port).await {
                error!("API server stopped: {:#}", e);
            }
        }))
    } else {
        None
    };

    // Ask REAPER for the current track list so the model starts populated
    if let Err(e) = notifier.refresh_tracks().await {
        error!("Initial track refresh failed: {:#}", e);
    }

    info!("✅ Ready to process OSC messages");

    shutdown.await;

    info!("Shutting down...");
    if let Some(task) = api_task {
        task.abort();
    }
    listener.shutdown().await?;

    Ok(())
}

fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .init();
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
