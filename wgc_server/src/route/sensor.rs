use axum::{
    extract::{Query, State},
    Json,
};
use wgc_core::sensor::SensorState;

use crate::{
    route::{AddressQueryParams, ApiError},
    state::AppState,
};

/// Handle requests for the days until the next pickup.
pub async fn handler(
    State(state): State<AppState>,
    Query(query_params): Query<AddressQueryParams>,
) -> Result<Json<SensorState>, ApiError> {
    let sensor = state
        .with_coordinator(
            query_params.address_point_id,
            query_params.update_interval()?,
            |coordinator| coordinator.sensor(),
        )
        .await?;
    Ok(Json(sensor))
}
