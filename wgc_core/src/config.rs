//! Configuration of a tracked address.

use std::{fmt, str::FromStr, sync::OnceLock};

use chrono::Duration;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_UPDATE_INTERVAL_DAYS: u32 = 1;
pub const MIN_UPDATE_INTERVAL_DAYS: u32 = 1;
pub const MAX_UPDATE_INTERVAL_DAYS: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("update interval must be between 1 and 7 days, got {0}")]
    InvalidUpdateInterval(u32),
    #[error("a postal code is required")]
    PostalCodeRequired,
    #[error("postal code `{0}` is not in the NN-NNN format")]
    InvalidPostalCode(String),
}

/// How often the schedule is polled, in whole days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct UpdateInterval(u32);

impl UpdateInterval {
    pub fn new(days: u32) -> Result<Self, ConfigError> {
        if (MIN_UPDATE_INTERVAL_DAYS..=MAX_UPDATE_INTERVAL_DAYS).contains(&days) {
            Ok(Self(days))
        } else {
            Err(ConfigError::InvalidUpdateInterval(days))
        }
    }

    pub fn days(&self) -> u32 {
        self.0
    }

    pub fn duration(&self) -> Duration {
        Duration::days(i64::from(self.0))
    }
}

impl Default for UpdateInterval {
    fn default() -> Self {
        Self(DEFAULT_UPDATE_INTERVAL_DAYS)
    }
}

impl TryFrom<u32> for UpdateInterval {
    type Error = ConfigError;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        Self::new(days)
    }
}

impl From<UpdateInterval> for u32 {
    fn from(update_interval: UpdateInterval) -> Self {
        update_interval.0
    }
}

impl FromStr for UpdateInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let days: u32 = s.parse().map_err(|_| format!("`{s}` is not a number of days"))?;
        Self::new(days).map_err(|err| err.to_string())
    }
}

fn postal_code_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^\d{2}-\d{3}$").unwrap())
}

/// A Polish postal code such as `00-001`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostalCode(String);

impl PostalCode {
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let postal_code = input.trim();
        if postal_code.is_empty() {
            return Err(ConfigError::PostalCodeRequired);
        }
        if !postal_code_regex().is_match(postal_code) {
            return Err(ConfigError::InvalidPostalCode(postal_code.to_string()));
        }
        Ok(Self(postal_code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The form the address search expects, without the dash.
    pub fn query_value(&self) -> String {
        self.0.replace('-', "")
    }
}

impl FromStr for PostalCode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything needed to poll the schedule of one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub address_point_id: u64,
    #[serde(default)]
    pub update_interval: UpdateInterval,
}

impl Config {
    pub fn new(address_point_id: u64) -> Self {
        Self {
            address_point_id,
            update_interval: UpdateInterval::default(),
        }
    }

    pub fn with_update_interval(mut self, update_interval: UpdateInterval) -> Self {
        self.update_interval = update_interval;
        self
    }
}
