use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use maxdate_shared::types::api::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let store = match state.stores.accounts.ping().await {
        Ok(()) => HealthCheck::passing("store"),
        Err(e) => HealthCheck::failing("store", e.to_string()),
    };
    let cities = if state.cities.is_empty() {
        HealthCheck::failing("cities", "city directory is empty")
    } else {
        HealthCheck::passing("cities")
    };

    let health = HealthResponse::healthy("maxdate-api", env!("CARGO_PKG_VERSION"))
        .with_checks(vec![store, cities]);
    let status = match health.status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };
    (status, Json(health))
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
