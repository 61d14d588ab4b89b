use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get};
use clap::{Args, Parser, Subcommand};
use client_discovery::api;
use client_discovery::config::{AgentConfig, DEFAULT_REGISTRY_ADDR, RegistryConfig};
use client_discovery::provider::{InstanceIdentity, RegistrationAgent};
use client_discovery::registry::{ExpirySweeper, RegistryStore};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "client-discovery")]
#[command(about = "Service registry and demo provider")]
struct Cli {
    /// Maximum log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the service registry
    Registry(RegistryArgs),
    /// Run the demo product-service, registered through the agent
    Provider(ProviderArgs),
}

#[derive(Args)]
struct RegistryArgs {
    #[arg(long, env = "REGISTRY_BIND", default_value = DEFAULT_REGISTRY_ADDR)]
    bind: SocketAddr,

    /// Seconds between expiry sweeps
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value_t = 30)]
    sweep_interval: u64,

    /// Seconds without renewal before an instance is evicted
    #[arg(long, env = "EVICTION_THRESHOLD_SECS", default_value_t = 90)]
    eviction_threshold: u64,

    /// Seconds between registry stats log lines
    #[arg(long, env = "STATS_INTERVAL_SECS", default_value_t = 60)]
    stats_interval: u64,
}

#[derive(Args)]
struct ProviderArgs {
    #[arg(long, env = "SERVICE_NAME", default_value = "product-service")]
    service: String,

    /// Local address to listen on; port 0 picks a free port
    #[arg(long, env = "PROVIDER_BIND", default_value = "127.0.0.1:8081")]
    bind: SocketAddr,

    /// Host advertised to the registry; defaults to the bind IP
    #[arg(long, env = "ADVERTISE_HOST")]
    advertise_host: Option<String>,

    #[arg(long, env = "REGISTRY_URL", default_value = "http://127.0.0.1:8761")]
    registry_url: String,

    /// Seconds between renewals
    #[arg(long, env = "RENEW_INTERVAL_SECS", default_value_t = 30)]
    renew_interval: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .init();

    match cli.command {
        Command::Registry(args) => run_registry(args).await,
        Command::Provider(args) => run_provider(args).await,
    }
}

async fn run_registry(args: RegistryArgs) -> anyhow::Result<()> {
    let config = RegistryConfig {
        bind_addr: args.bind,
        sweep_interval: Duration::from_secs(args.sweep_interval),
        eviction_threshold: Duration::from_secs(args.eviction_threshold),
    };
    config.validate()?;

    // 1. Store + sweeper:
    let store = RegistryStore::new();
    let sweeper = ExpirySweeper::new(
        store.clone(),
        config.sweep_interval,
        config.eviction_threshold,
    );
    sweeper.start().await;

    // 2. Stats reporter:
    let stats_store = store.clone();
    let stats_interval = Duration::from_secs(args.stats_interval.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(stats_interval);

        loop {
            interval.tick().await;
            let services = stats_store.list_services();
            tracing::info!(
                "Registry stats: {} service(s), {} instance(s)",
                stats_store.service_count(),
                stats_store.instance_count()
            );
            for (name, instances) in services {
                tracing::info!("  - {} ({} up)", name, instances.len());
            }
        }
    });

    // 3. HTTP server:
    let app = api::router(store);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    tracing::info!("Registry listening on {}", config.bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.stop().await;
    Ok(())
}

#[derive(Serialize)]
struct ProviderHealth {
    status: &'static str,
    instance_id: String,
}

async fn run_provider(args: ProviderArgs) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    let local_addr = listener.local_addr()?;
    let host = args
        .advertise_host
        .unwrap_or_else(|| local_addr.ip().to_string());

    let instance = InstanceIdentity::generate(&args.service)
        .into_instance(host, local_addr.port())
        .with_metadata("version", env!("CARGO_PKG_VERSION"));
    let instance_id = instance.instance_id.clone();

    let agent = RegistrationAgent::new(
        AgentConfig {
            registry_url: args.registry_url,
            renew_interval: Duration::from_secs(args.renew_interval),
            ..AgentConfig::default()
        },
        instance,
    )?;
    agent.start().await;

    let app = Router::new()
        .route("/products/:id", get(handle_get_product))
        .route("/health", get(handle_provider_health))
        .layer(Extension(Arc::new(instance_id.clone())));

    tracing::info!(
        instance = %instance_id,
        "{} listening on {}",
        args.service,
        local_addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    agent.stop().await;
    Ok(())
}

async fn handle_get_product(
    Extension(instance_id): Extension<Arc<String>>,
    Path(id): Path<String>,
) -> String {
    tracing::debug!("Serving product {}", id);
    format!("Product {} from instance {}", id, instance_id)
}

async fn handle_provider_health(
    Extension(instance_id): Extension<Arc<String>>,
) -> (StatusCode, Json<ProviderHealth>) {
    (
        StatusCode::OK,
        Json(ProviderHealth {
            status: "ok",
            instance_id: instance_id.to_string(),
        }),
    )
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
