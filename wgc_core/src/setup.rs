//! Setting up a tracked address: postal code, address choice, then a test fetch.

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::{
    config::{Config, ConfigError, PostalCode, UpdateInterval, DEFAULT_UPDATE_INTERVAL_DAYS},
    garbage_client::{AddressCandidate, FetchError, ScheduleSource},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("a postal code is required")]
    PostalCodeRequired,
    #[error("postal code `{0}` is not in the NN-NNN format")]
    InvalidPostalCode(String),
    #[error("no addresses found for this postal code")]
    NoAddresses,
    #[error("an address must be selected")]
    AddressRequired,
    #[error("`{0}` is not one of the offered addresses")]
    InvalidSelection(String),
    #[error("update interval must be between 1 and 7 days, got {0}")]
    InvalidUpdateInterval(u32),
    #[error("cannot connect to the schedule service: {0}")]
    CannotConnect(String),
    #[error("the schedule service returned invalid data: {0}")]
    InvalidData(String),
    #[error("no schedule found for this address")]
    NoScheduleFound,
}

impl SetupError {
    /// The form field the error belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            SetupError::PostalCodeRequired | SetupError::InvalidPostalCode(_) => "postal_code",
            SetupError::AddressRequired | SetupError::InvalidSelection(_) => "address",
            SetupError::InvalidUpdateInterval(_) => "update_interval",
            _ => "base",
        }
    }

    /// The translation key of the error message.
    pub fn key(&self) -> &'static str {
        match self {
            SetupError::PostalCodeRequired | SetupError::AddressRequired => "required",
            SetupError::InvalidPostalCode(_) => "invalid_format",
            SetupError::NoAddresses => "no_addresses",
            SetupError::InvalidSelection(_) => "invalid_selection",
            SetupError::InvalidUpdateInterval(_) => "invalid_update_interval",
            SetupError::CannotConnect(_) => "cannot_connect",
            SetupError::InvalidData(_) => "invalid_data",
            SetupError::NoScheduleFound => "no_schedule_found",
        }
    }
}

impl From<ConfigError> for SetupError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::PostalCodeRequired => SetupError::PostalCodeRequired,
            ConfigError::InvalidPostalCode(postal_code) => {
                SetupError::InvalidPostalCode(postal_code)
            }
            ConfigError::InvalidUpdateInterval(days) => SetupError::InvalidUpdateInterval(days),
        }
    }
}

impl From<FetchError> for SetupError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NoScheduleFound { .. } => SetupError::NoScheduleFound,
            FetchError::UnparsableResponse(cause) => SetupError::InvalidData(cause),
            err => SetupError::CannotConnect(err.to_string()),
        }
    }
}

/// The outcome of a successful setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigEntry {
    pub title: String,
    pub config: Config,
}

/// Check that an address point has a schedule and name it.
pub async fn validate<S>(source: &S, address_point_id: u64) -> Result<String, SetupError>
where
    S: ScheduleSource + ?Sized,
{
    let entries = source.fetch(address_point_id).await.map_err(|err| {
        error!(address_point_id, %err, "validation fetch failed");
        SetupError::from(err)
    })?;
    let title = entries
        .first()
        .and_then(|entry| entry.address.clone())
        .filter(|address| !address.is_empty())
        .unwrap_or_else(|| format!("Address {address_point_id}"));
    info!(address_point_id, %title, "validated address");
    Ok(title)
}

/// The two steps of setting up an address.
pub struct SetupFlow<'a, S: ScheduleSource + ?Sized> {
    source: &'a S,
    postal_code: Option<PostalCode>,
    candidates: Vec<AddressCandidate>,
}

impl<'a, S: ScheduleSource + ?Sized> SetupFlow<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            postal_code: None,
            candidates: vec![],
        }
    }

    /// Take the postal code and look up its addresses.
    pub async fn submit_postal_code(
        &mut self,
        input: &str,
    ) -> Result<&[AddressCandidate], SetupError> {
        let postal_code = PostalCode::parse(input)?;
        if self.postal_code.as_ref() != Some(&postal_code) {
            self.candidates = self.source.search(&postal_code).await;
            self.postal_code = Some(postal_code);
        }
        if self.candidates.is_empty() {
            return Err(SetupError::NoAddresses);
        }
        Ok(&self.candidates)
    }

    /// The addresses to choose from, labelled with their ids.
    pub fn options(&self) -> Vec<(u64, String)> {
        self.candidates
            .iter()
            .map(|candidate| {
                (
                    candidate.address_point_id,
                    format!("{} ({})", candidate.full_name, candidate.address_point_id),
                )
            })
            .collect()
    }

    /// Pick one of the offered addresses and validate it.
    pub async fn select_address(
        &self,
        selection: &str,
        update_interval_days: Option<u32>,
    ) -> Result<ConfigEntry, SetupError> {
        let selection = selection.trim();
        if selection.is_empty() {
            return Err(SetupError::AddressRequired);
        }
        let candidate = selection
            .parse::<u64>()
            .ok()
            .and_then(|id| {
                self.candidates
                    .iter()
                    .find(|candidate| candidate.address_point_id == id)
            })
            .ok_or_else(|| SetupError::InvalidSelection(selection.to_string()))?;
        let update_interval =
            UpdateInterval::new(update_interval_days.unwrap_or(DEFAULT_UPDATE_INTERVAL_DAYS))?;
        let title = validate(self.source, candidate.address_point_id).await?;
        Ok(ConfigEntry {
            title,
            config: Config::new(candidate.address_point_id).with_update_interval(update_interval),
        })
    }
}
