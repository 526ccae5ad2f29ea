//! Search indexer API
//!
//! ```text
//!   appsettings.toml ─┐
//!   appsettings.{env} ├─▶ ConfigLoader ─▶ ServiceSettings
//!   environment vars ─┘                        │
//!                                              ▼
//!                     ┌──────────────── BootstrapOrchestrator ───────────────┐
//!                     │  AuthGate  ─▶  DiscoveryRegistrar  ─▶  IndexSynchronizer │
//!                     │  (SecureToken   (Consul, optional,      (Azure Search,   │
//!                     │   | Bearer)      non-fatal)              fatal)          │
//!                     └──────────────────────────┬───────────────────────────────┘
//!                                                ▼ Ready
//!                                           ApiServer
//!                                  /health   /api/index   /api/identity
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use search_indexer_api::config::loader::DEFAULT_ENVIRONMENT;
use search_indexer_api::lifecycle::spawn_signal_listener;
use search_indexer_api::observability::logging::{init_logging, LogFormat};
use search_indexer_api::observability::metrics;
use search_indexer_api::{ApiServer, BootstrapOrchestrator, ConfigLoader, Shutdown};

#[derive(Debug, Parser)]
#[command(name = "search-indexer-api", version, about = "Search indexer API service")]
struct Args {
    /// Directory holding appsettings.toml and its environment overlays.
    #[arg(long, default_value = ".")]
    content_root: PathBuf,

    /// Environment name selecting appsettings.{environment}.toml.
    #[arg(long, env = "APP_ENVIRONMENT", default_value = DEFAULT_ENVIRONMENT)]
    environment: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let loader = ConfigLoader::new(&args.content_root).environment(&args.environment);

    let resolved = loader.load();
    let log_level = resolved
        .as_ref()
        .ok()
        .and_then(|config| config.get_non_blank("Logging.Level"))
        .unwrap_or("info")
        .to_string();
    init_logging(&log_level, LogFormat::from_env());

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %args.environment,
        content_root = %args.content_root.display(),
        "search-indexer-api starting"
    );

    let config = match resolved {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Startup aborted: configuration could not be resolved");
            return ExitCode::FAILURE;
        }
    };

    let mut bootstrap = BootstrapOrchestrator::new(loader).with_resolved_config(config);
    let ready = match bootstrap.run().await {
        Ok(ready) => ready,
        Err(e) => {
            tracing::error!(error = %e, state = %bootstrap.state(), "Startup aborted");
            return ExitCode::FAILURE;
        }
    };

    let observability = ready.settings.observability.clone();
    if observability.metrics_enabled {
        match observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = ApiServer::new(ready);
    let addr = server.bind_address();
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to bind listener");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Arc::new(Shutdown::new());
    spawn_signal_listener(shutdown.clone());

    if let Err(e) = server.run(listener, shutdown.wait()).await {
        tracing::error!(error = %e, "HTTP server failed");
        return ExitCode::FAILURE;
    }

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}
