use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use wgc_core::{config::PostalCode, garbage_client::AddressCandidate};

use crate::{
    route::{bad_request, ApiError},
    state::AppState,
};

#[derive(Debug, Clone, Deserialize)]
pub struct QueryParams {
    postal_code: String,
}

/// Handle requests for the addresses within a postal code.
pub async fn handler(
    State(state): State<AppState>,
    Query(query_params): Query<QueryParams>,
) -> Result<Json<Vec<AddressCandidate>>, ApiError> {
    let postal_code = PostalCode::parse(&query_params.postal_code).map_err(bad_request)?;
    Ok(Json(state.client().search(&postal_code).await))
}
