//! wayfare-planner - group trip planning service
//!
//! Serves the itinerary consensus and enrichment pipeline over HTTP + SSE.
//! Default port: 5740

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wayfare_common::config::{
    default_config_path, CompiledDefaults, RootFolderInitializer, RootFolderResolver, TomlConfig,
};
use wayfare_common::events::EventBus;

use wayfare_planner::config::resolve_provider_settings;
use wayfare_planner::providers::Providers;
use wayfare_planner::services::PipelineOrchestrator;
use wayfare_planner::AppState;

const MODULE_NAME: &str = "wayfare-planner";
const EVENT_BUS_CAPACITY: usize = 256;

/// Command-line arguments for wayfare-planner
#[derive(Parser, Debug)]
#[command(name = "wayfare-planner")]
#[command(about = "Group trip itinerary consensus and enrichment service")]
#[command(version)]
struct Args {
    /// Folder holding wayfare.db
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// TOML config file (default ~/.config/wayfare/wayfare-planner.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "WAYFARE_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(short, long, env = "WAYFARE_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let defaults = CompiledDefaults::for_current_platform();

    let config_path = args.config.clone().or_else(|| default_config_path(MODULE_NAME));
    let toml_config = config_path
        .as_deref()
        .map(TomlConfig::load_or_default)
        .unwrap_or_default();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{},tower_http=info", toml_config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting {} v{}", MODULE_NAME, env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        info!("Config file: {}", path.display());
    }

    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder.clone())
        .with_toml_config(&toml_config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db = wayfare_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;

    let provider_settings = resolve_provider_settings(&db, &toml_config)
        .await
        .context("Failed to resolve provider settings")?;
    let providers = Providers::from_settings(&provider_settings).context("Failed to build provider clients")?;

    let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
    let orchestrator = PipelineOrchestrator::new(db.clone(), providers, event_bus, &provider_settings);
    let app = wayfare_planner::build_router(AppState::new(db, orchestrator));

    let bind = args
        .bind
        .or(toml_config.bind_address.clone())
        .unwrap_or(defaults.bind_address);
    let port = args.port.or(toml_config.port).unwrap_or(defaults.port);
    let addr = format!("{}:{}", bind, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
