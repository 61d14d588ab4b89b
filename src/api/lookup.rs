//! Consumer-facing handlers. Unknown services are not an error: consumers poll for
//! services that may not have any provider yet.

use super::protocol::{HealthResponse, InstanceResponse};
use crate::registry::store::RegistryStore;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
};
use std::collections::BTreeMap;
use std::sync::Arc;

pub async fn handle_list_instances(
    Extension(store): Extension<Arc<RegistryStore>>,
    Path(service_name): Path<String>,
) -> (StatusCode, Json<Vec<InstanceResponse>>) {
    let instances: Vec<InstanceResponse> = store
        .list_instances(&service_name)
        .into_iter()
        .map(InstanceResponse::from)
        .collect();

    tracing::debug!(
        service = %service_name,
        "Lookup returned {} instance(s)",
        instances.len()
    );

    (StatusCode::OK, Json(instances))
}

pub async fn handle_list_services(
    Extension(store): Extension<Arc<RegistryStore>>,
) -> (StatusCode, Json<BTreeMap<String, Vec<InstanceResponse>>>) {
    let services = store
        .list_services()
        .into_iter()
        .map(|(name, instances)| {
            (
                name,
                instances.into_iter().map(InstanceResponse::from).collect(),
            )
        })
        .collect();

    (StatusCode::OK, Json(services))
}

pub async fn handle_health(
    Extension(store): Extension<Arc<RegistryStore>>,
) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            services: store.service_count(),
            instances: store.instance_count(),
        }),
    )
}
