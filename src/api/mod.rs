//! Registry HTTP API
//!
//! Thin transport layer over `RegistryStore`.
//!
//! ## Routes
//! - `PUT    /registry/{service}/{instance}`         register, 204 / 400
//! - `PUT    /registry/{service}/{instance}/renew`   heartbeat, 200 / 404
//! - `PUT    /registry/{service}/{instance}/status`  status override, 200 / 400 / 404
//! - `DELETE /registry/{service}/{instance}`         deregister, always 204
//! - `GET    /registry/{service}`                    live instances, `[]` when unknown
//! - `GET    /registry`                              every live service
//! - `GET    /health`

pub mod lookup;
pub mod protocol;
pub mod registration;

use crate::registry::store::RegistryStore;
use axum::{
    Router,
    extract::Extension,
    routing::{get, put},
};
use lookup::{handle_health, handle_list_instances, handle_list_services};
use protocol::{
    ENDPOINT_HEALTH, ENDPOINT_INSTANCE, ENDPOINT_REGISTRY, ENDPOINT_RENEW, ENDPOINT_SERVICE,
    ENDPOINT_STATUS,
};
use registration::{handle_deregister, handle_register, handle_renew, handle_set_status};
use std::sync::Arc;

/// Builds the registry router around a shared store.
pub fn router(store: Arc<RegistryStore>) -> Router {
    Router::new()
        .route(ENDPOINT_REGISTRY, get(handle_list_services))
        .route(ENDPOINT_SERVICE, get(handle_list_instances))
        .route(
            ENDPOINT_INSTANCE,
            put(handle_register).delete(handle_deregister),
        )
        .route(ENDPOINT_RENEW, put(handle_renew))
        .route(ENDPOINT_STATUS, put(handle_set_status))
        .route(ENDPOINT_HEALTH, get(handle_health))
        .layer(Extension(store))
}
