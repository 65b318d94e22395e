use axum::{
    extract::{Query, State},
    Json,
};
use wgc_core::schedule::NormalizedSchedule;

use crate::{
    route::{AddressQueryParams, ApiError},
    state::AppState,
};

/// Handle requests for the normalized schedule.
pub async fn handler(
    State(state): State<AppState>,
    Query(query_params): Query<AddressQueryParams>,
) -> Result<Json<NormalizedSchedule>, ApiError> {
    let schedule = state
        .with_coordinator(
            query_params.address_point_id,
            query_params.update_interval()?,
            |coordinator| coordinator.data().cloned().unwrap_or_default(),
        )
        .await?;
    Ok(Json(schedule))
}
