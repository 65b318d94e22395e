pub mod addresses;
pub mod calendar;
pub mod events;
pub mod schedule;
pub mod sensor;

use std::fmt::Display;

use axum::http::StatusCode;
use serde::Deserialize;
use wgc_core::{config::UpdateInterval, garbage_client::FetchError};

pub type ApiError = (StatusCode, String);

#[derive(Debug, Clone, Deserialize)]
pub struct AddressQueryParams {
    pub address_point_id: u64,
    pub update_interval: Option<u32>,
}

impl AddressQueryParams {
    pub fn update_interval(&self) -> Result<Option<UpdateInterval>, ApiError> {
        parse_update_interval(self.update_interval)
    }
}

pub fn parse_update_interval(days: Option<u32>) -> Result<Option<UpdateInterval>, ApiError> {
    days.map(UpdateInterval::new).transpose().map_err(bad_request)
}

pub fn bad_request(err: impl Display) -> ApiError {
    (StatusCode::BAD_REQUEST, err.to_string())
}

pub fn bad_gateway(err: FetchError) -> ApiError {
    (StatusCode::BAD_GATEWAY, err.to_string())
}
