use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use wgc_core::calendar::CalendarEvent;

use crate::{
    route::{parse_update_interval, ApiError},
    state::AppState,
};

#[derive(Debug, Clone, Deserialize)]
pub struct QueryParams {
    address_point_id: u64,
    update_interval: Option<u32>,
    start: NaiveDate,
    end: NaiveDate,
}

/// Handle requests for the pickups within a date range.
///
/// Both `start` and `end` are inclusive.
pub async fn handler(
    State(state): State<AppState>,
    Query(query_params): Query<QueryParams>,
) -> Result<Json<Vec<CalendarEvent>>, ApiError> {
    let events = state
        .with_coordinator(
            query_params.address_point_id,
            parse_update_interval(query_params.update_interval)?,
            |coordinator| {
                coordinator
                    .calendar()
                    .map(|view| view.events_between(query_params.start, query_params.end))
                    .unwrap_or_default()
            },
        )
        .await?;
    Ok(Json(events))
}
