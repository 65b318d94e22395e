use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use wgc_core::schedule::WasteType;

use crate::{
    route::{bad_request, calendar::handle, AddressQueryParams, ApiError},
    state::AppState,
};

/// Handle calendar requests for a single waste type.
pub async fn handler(
    State(state): State<AppState>,
    Path(waste_type): Path<String>,
    Query(query_params): Query<AddressQueryParams>,
) -> Result<Response, ApiError> {
    let waste_type: WasteType = waste_type.parse().map_err(bad_request)?;
    handle(
        &state,
        query_params.address_point_id,
        query_params.update_interval()?,
        !waste_type.bitmask(),
    )
    .await
}
