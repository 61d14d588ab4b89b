use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get};
use clap::Parser;
use client_discovery::config::ResolverConfig;
use client_discovery::error::ResolverError;
use client_discovery::resolver::{HttpExecutor, PolicyKind, RequestExecutor, Resolver};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "consumer")]
#[command(about = "Demo order-service using client-side discovery")]
struct Cli {
    #[arg(long, env = "CONSUMER_BIND", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    #[arg(long, env = "REGISTRY_URL", default_value = "http://127.0.0.1:8761")]
    registry_url: String,

    /// Logical name of the provider to call
    #[arg(long, env = "TARGET_SERVICE", default_value = "product-service")]
    target_service: String,

    #[arg(long, env = "SELECTION_POLICY", value_enum, default_value_t = PolicyKind::RoundRobin)]
    policy: PolicyKind,

    /// Seconds between background cache refreshes
    #[arg(long, env = "REFRESH_INTERVAL_SECS", default_value_t = 30)]
    refresh_interval: u64,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: tracing::Level,
}

#[derive(Clone)]
struct AppState {
    resolver: Arc<Resolver>,
    /// Used by the manual route, which bypasses failover.
    executor: Arc<HttpExecutor>,
    target_service: String,
}

#[derive(Serialize)]
struct OrderResponse {
    order: String,
    product: String,
}

#[derive(Serialize)]
struct ManualOrderResponse {
    order: String,
    instance_id: String,
    instance: String,
    product: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .init();

    let resolver = Resolver::from_config(ResolverConfig {
        registry_url: cli.registry_url.trim_end_matches('/').to_string(),
        refresh_interval: Duration::from_secs(cli.refresh_interval),
        policy: cli.policy,
        ..ResolverConfig::default()
    })?;
    resolver.start();

    let state = AppState {
        executor: Arc::new(HttpExecutor::new(resolver.config().call_timeout)),
        resolver: resolver.clone(),
        target_service: cli.target_service,
    };

    tracing::info!("Order service listening on {}", cli.bind);
    let listener = tokio::net::TcpListener::bind(cli.bind).await?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    resolver.shutdown().await;
    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/orders/product/:id", get(order_product))
        .route("/orders/product-manual/:id", get(order_product_manual))
        .with_state(state)
}

/// Resolver picks the instance and fails over on connection errors.
async fn order_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let response = state
        .resolver
        .call(&state.target_service, &product_path(&id))
        .await
        .map_err(resolver_error)?;

    if !response.is_success() {
        return Err(upstream_status(response.status, &response.body));
    }

    Ok(Json(OrderResponse {
        order: format!("Order for product {}", id),
        product: response.body,
    }))
}

/// Resolves first, then calls the chosen instance directly; shows which one answered.
async fn order_product_manual(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ManualOrderResponse>, ApiError> {
    let instance = state
        .resolver
        .resolve(&state.target_service)
        .await
        .map_err(resolver_error)?;

    let path = product_path(&id);
    let response = state
        .executor
        .execute(&instance.host, instance.port, &path)
        .await
        .map_err(|e| {
            tracing::warn!(instance = %instance.instance_id, "Call to {} failed: {}", path, e);
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorBody {
                    error: e.to_string(),
                }),
            )
        })?;

    if !response.is_success() {
        return Err(upstream_status(response.status, &response.body));
    }

    Ok(Json(ManualOrderResponse {
        order: format!("Order for product {}", id),
        instance_id: instance.instance_id.clone(),
        instance: instance.address(),
        product: response.body,
    }))
}

/// Provider path for a product; the id is re-encoded so it stays one segment.
fn product_path(id: &str) -> String {
    format!("/products/{}", urlencoding::encode(id))
}

fn resolver_error(err: ResolverError) -> ApiError {
    let status = match err {
        ResolverError::NoInstancesAvailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        ResolverError::CallFailed { .. } => StatusCode::BAD_GATEWAY,
    };
    tracing::warn!("{}", err);
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
}

fn upstream_status(status: u16, body: &str) -> ApiError {
    (
        StatusCode::BAD_GATEWAY,
        Json(ErrorBody {
            error: format!("upstream answered {}: {}", status, body),
        }),
    )
}
