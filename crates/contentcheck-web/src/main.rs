//! ContentCheck
//!
//! Classifies emails and SMS messages as HAM/SPAM and news articles and
//! social media posts as REAL/FAKE with four fine-tuned transformers.

use anyhow::{Context, Result};
use clap::Parser;
use contentcheck_classifiers::{ModelRegistry, RegistryConfig};
use contentcheck_web::cli::{Cli, Commands};
use contentcheck_web::server::run_server;
use contentcheck_web::{on_submit, AppState};
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            address,
            config,
            verbose,
        } => {
            init_logging(verbose);

            let metrics_handle = init_metrics()?;
            let registry = load_registry(config).await?;
            let state = AppState::new(registry).with_metrics(metrics_handle);

            let addr: SocketAddr = format!("{}:{}", address, port).parse()?;
            run_server(state, addr).await?;

            Ok(ExitCode::SUCCESS)
        }

        Commands::Classify {
            content_type,
            config,
            verbose,
            text,
        } => {
            init_logging(verbose);

            let registry = load_registry(config).await?;
            let state = AppState::new(registry);

            let outcome = tokio::task::spawn_blocking(move || {
                on_submit(&state.pipeline, content_type, &text)
            })
            .await?;

            println!("{}", outcome.message());

            Ok(if outcome.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

/// Load every model; any failure aborts startup
async fn load_registry(config_path: Option<PathBuf>) -> Result<Arc<ModelRegistry>> {
    let config = RegistryConfig::load_or_default(config_path.as_deref())
        .context("Failed to load registry configuration")?;

    info!("Loading {} models on {:?}", config.models.len(), config.device);

    let registry = tokio::task::spawn_blocking(move || ModelRegistry::load(&config))
        .await?
        .context("Failed to load models")?;

    info!("All {} models loaded", registry.len());
    Ok(Arc::new(registry))
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("contentcheck=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("contentcheck=info,tower_http=warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "contentcheck_predictions_total",
        "Total number of predictions by content type and label"
    );
    metrics::describe_counter!(
        "contentcheck_errors_total",
        "Total number of failed predictions by content type and error kind"
    );
    metrics::describe_histogram!(
        "contentcheck_inference_latency_us",
        metrics::Unit::Microseconds,
        "Encode and forward pass latency in microseconds by content type"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
