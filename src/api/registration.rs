//! Provider-facing handlers. Each request maps to exactly one store operation.

use super::protocol::{ErrorResponse, RegisterRequest, RenewResponse, StatusRequest};
use crate::error::RegistryError;
use crate::registry::store::RegistryStore;
use crate::registry::types::ServiceInstance;

use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
};
use std::sync::Arc;

pub async fn handle_register(
    Extension(store): Extension<Arc<RegistryStore>>,
    Path((service_name, instance_id)): Path<(String, String)>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            tracing::warn!(
                service = %service_name,
                instance = %instance_id,
                "Rejected registration body: {}",
                rejection.body_text()
            );
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let instance = match to_instance(service_name, instance_id, req) {
        Ok(instance) => instance,
        Err(e) => return registry_error_response(e),
    };

    match store.register(instance) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => registry_error_response(e),
    }
}

pub async fn handle_renew(
    Extension(store): Extension<Arc<RegistryStore>>,
    Path((service_name, instance_id)): Path<(String, String)>,
) -> Response {
    match store.renew(&service_name, &instance_id) {
        Ok(status) => (StatusCode::OK, Json(RenewResponse { status })).into_response(),
        Err(e) => {
            tracing::debug!("Renewal rejected: {}", e);
            registry_error_response(e)
        }
    }
}

pub async fn handle_deregister(
    Extension(store): Extension<Arc<RegistryStore>>,
    Path((service_name, instance_id)): Path<(String, String)>,
) -> StatusCode {
    if !store.deregister(&service_name, &instance_id) {
        tracing::debug!(
            service = %service_name,
            instance = %instance_id,
            "Deregister for unknown instance"
        );
    }
    StatusCode::NO_CONTENT
}

pub async fn handle_set_status(
    Extension(store): Extension<Arc<RegistryStore>>,
    Path((service_name, instance_id)): Path<(String, String)>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    match store.set_status(&service_name, &instance_id, req.status) {
        Ok(()) => (StatusCode::OK, Json(RenewResponse { status: req.status })).into_response(),
        Err(e) => registry_error_response(e),
    }
}

/// Builds the instance from path and body, rejecting missing or out-of-range fields.
pub fn to_instance(
    service_name: String,
    instance_id: String,
    req: RegisterRequest,
) -> Result<ServiceInstance, RegistryError> {
    if instance_id.trim().is_empty() {
        return Err(RegistryError::Validation("instance id is required".to_string()));
    }

    let host = req
        .host
        .filter(|host| !host.trim().is_empty())
        .ok_or_else(|| RegistryError::Validation("host is required".to_string()))?;

    let port = req
        .port
        .ok_or_else(|| RegistryError::Validation("port is required".to_string()))?;
    let port = u16::try_from(port)
        .ok()
        .filter(|port| *port != 0)
        .ok_or_else(|| {
            RegistryError::Validation(format!("port {} is not between 1 and 65535", port))
        })?;

    let mut instance = ServiceInstance::new(service_name, instance_id, host, port);
    instance.metadata = req.metadata;
    Ok(instance)
}

pub(crate) fn registry_error_response(err: RegistryError) -> Response {
    let status = match err {
        RegistryError::Validation(_) => StatusCode::BAD_REQUEST,
        RegistryError::NotFound { .. } => StatusCode::NOT_FOUND,
    };
    error_response(status, err.to_string())
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}
