use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use maxdate_core::City;
use maxdate_shared::types::ApiResponse;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CityQuery {
    pub q: Option<String>,
}

/// Most populous first; `?q=` narrows by name.
pub async fn list_cities(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CityQuery>,
) -> Json<ApiResponse<Vec<City>>> {
    let cities = match query.q.as_deref() {
        Some(q) => state.cities.search(q),
        None => state.cities.all().to_vec(),
    };
    Json(ApiResponse::ok(cities))
}
