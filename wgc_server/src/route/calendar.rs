pub mod waste_type;

use axum::{
    extract::{Query, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Local;
use serde::Deserialize;
use wgc_core::{config::UpdateInterval, ical::generator::Emitter, schedule::WasteTypeBitmask};

use crate::{
    route::{parse_update_interval, ApiError},
    state::AppState,
};

#[derive(Debug, Clone, Deserialize)]
pub struct QueryParams {
    address_point_id: u64,
    update_interval: Option<u32>,
    #[serde(default)]
    exclude_waste: bool,
    #[serde(default)]
    exclude_paper: bool,
    #[serde(default)]
    exclude_recycle: bool,
    #[serde(default)]
    exclude_organic: bool,
    #[serde(default)]
    exclude_others: bool,
    #[serde(default)]
    exclude_custom: bool,
}

impl From<&QueryParams> for WasteTypeBitmask {
    fn from(value: &QueryParams) -> Self {
        let mut waste_type_bitmask = WasteTypeBitmask::none();
        if value.exclude_waste {
            waste_type_bitmask |= WasteTypeBitmask::Waste;
        }
        if value.exclude_paper {
            waste_type_bitmask |= WasteTypeBitmask::Paper;
        }
        if value.exclude_recycle {
            waste_type_bitmask |= WasteTypeBitmask::Recycle;
        }
        if value.exclude_organic {
            waste_type_bitmask |= WasteTypeBitmask::Organic;
        }
        if value.exclude_others {
            waste_type_bitmask |= WasteTypeBitmask::Others;
        }
        if value.exclude_custom {
            waste_type_bitmask |= WasteTypeBitmask::Custom;
        }
        waste_type_bitmask
    }
}

pub async fn handle(
    state: &AppState,
    address_point_id: u64,
    update_interval: Option<UpdateInterval>,
    excluded_waste_types: WasteTypeBitmask,
) -> Result<Response, ApiError> {
    let ical_calendar = state
        .with_coordinator(address_point_id, update_interval, |coordinator| {
            coordinator
                .calendar()
                .map(|view| view.to_ical(excluded_waste_types, Local::now().naive_local()))
        })
        .await?
        .ok_or_else(|| {
            (
                StatusCode::BAD_GATEWAY,
                String::from("no schedule available"),
            )
        })?;
    let response = ([(CONTENT_TYPE, "text/calendar")], ical_calendar.generate()).into_response();
    Ok(response)
}

/// Handle calendar requests.
///
/// The `address_point_id` must be given in the query string.
pub async fn handler(
    State(state): State<AppState>,
    Query(query_params): Query<QueryParams>,
) -> Result<Response, ApiError> {
    handle(
        &state,
        query_params.address_point_id,
        parse_update_interval(query_params.update_interval)?,
        WasteTypeBitmask::from(&query_params),
    )
    .await
}
