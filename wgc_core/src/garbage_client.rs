//! This client fetches schedules and addresses from the Warsaw 19115 service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Response};
use scraper::{Html, Selector};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{config::PostalCode, schedule::RawScheduleEntry};

static URL: &str = "https://warszawa19115.pl/harmonogramy-wywozu-odpadow";
static PORTLET_ID: &str =
    "portalCKMjunkschedules_WAR_portalCKMjunkschedulesportlet_INSTANCE_o5AIb2mimbRJ";
static SCHEDULE_RESOURCE_ID: &str = "ajaxResource";
static AUTOCOMPLETE_RESOURCE_ID: &str = "autocompleteResource";

const SCHEDULE_TIMEOUT: Duration = Duration::from_secs(30);
const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);
const LOGGED_BODY_LENGTH: usize = 500;

/// Why a schedule could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("connection to the schedule service failed: {0}")]
    ConnectionFailed(String),
    #[error("schedule service returned status {status}")]
    BadStatus { status: u16, body: String },
    #[error("schedule service returned an unparsable response: {0}")]
    UnparsableResponse(String),
    #[error("no schedule found for address point {address_point_id}")]
    NoScheduleFound { address_point_id: u64 },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::ConnectionFailed(format!("request timed out: {err}"))
        } else {
            FetchError::ConnectionFailed(err.to_string())
        }
    }
}

/// An address offered by the address search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressCandidate {
    #[serde(rename = "addressPointId", deserialize_with = "address_point_id")]
    pub address_point_id: u64,
    #[serde(rename = "fullName", default)]
    pub full_name: String,
}

fn address_point_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(number) => number
            .as_u64()
            .ok_or_else(|| D::Error::custom(format!("invalid address point id {number}"))),
        Value::String(string) => string.trim().parse().map_err(D::Error::custom),
        other => Err(D::Error::custom(format!(
            "invalid address point id {other}"
        ))),
    }
}

/// Where schedules and addresses come from.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// Fetch the raw schedule of an address point.
    async fn fetch(&self, address_point_id: u64) -> Result<Vec<RawScheduleEntry>, FetchError>;

    /// Search addresses by postal code. Failures yield no candidates.
    async fn search(&self, postal_code: &PostalCode) -> Vec<AddressCandidate>;
}

#[derive(Debug, Clone)]
pub struct GarbageClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for GarbageClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GarbageClient {
    pub fn new() -> Self {
        Self::with_base_url(URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.to_string(),
        }
    }

    /// Get the raw schedule for an address point.
    ///
    /// The service labels its JSON as `text/html`, so the body is parsed whatever the
    /// content type says.
    pub async fn fetch(&self, address_point_id: u64) -> Result<Vec<RawScheduleEntry>, FetchError> {
        debug!(address_point_id, "fetching schedule");
        let response = self
            .get_response(
                SCHEDULE_RESOURCE_ID,
                "addressPointId",
                address_point_id.to_string(),
                SCHEDULE_TIMEOUT,
            )
            .await
            .map_err(|err| {
                error!(address_point_id, %err, "could not reach schedule service");
                err
            })?;
        let value = read_json(response).await?;
        let entries = schedule_entries(value, address_point_id)?;
        debug!(
            address_point_id,
            items = entries[0].schedule_items.len(),
            "received schedule"
        );
        Ok(entries)
    }

    /// Search addresses within a postal code.
    pub async fn search(&self, postal_code: &PostalCode) -> Vec<AddressCandidate> {
        match self.try_search(postal_code).await {
            Ok(candidates) => {
                debug!(%postal_code, count = candidates.len(), "found addresses");
                candidates
            }
            Err(err) => {
                warn!(%postal_code, %err, "address search failed");
                vec![]
            }
        }
    }

    async fn try_search(
        &self,
        postal_code: &PostalCode,
    ) -> Result<Vec<AddressCandidate>, FetchError> {
        let response = self
            .get_response(
                AUTOCOMPLETE_RESOURCE_ID,
                "name",
                postal_code.query_value(),
                SEARCH_TIMEOUT,
            )
            .await?;
        let Value::Array(items) = read_json(response).await? else {
            return Err(FetchError::UnparsableResponse(String::from(
                "expected a list of addresses",
            )));
        };
        Ok(items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(candidate) => Some(candidate),
                Err(err) => {
                    debug!(%err, "skipping address without a usable id");
                    None
                }
            })
            .collect())
    }

    /// Send a portlet resource request with one identifying parameter.
    async fn get_response(
        &self,
        resource_id: &str,
        parameter: &str,
        value: String,
        timeout: Duration,
    ) -> Result<Response, FetchError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&portlet_query(resource_id, parameter, value))
            .timeout(timeout)
            .send()
            .await?;
        debug!(url = %response.url(), status = %response.status(), "received response");
        Ok(response)
    }
}

#[async_trait]
impl ScheduleSource for GarbageClient {
    async fn fetch(&self, address_point_id: u64) -> Result<Vec<RawScheduleEntry>, FetchError> {
        GarbageClient::fetch(self, address_point_id).await
    }

    async fn search(&self, postal_code: &PostalCode) -> Vec<AddressCandidate> {
        GarbageClient::search(self, postal_code).await
    }
}

fn portlet_query(resource_id: &str, parameter: &str, value: String) -> Vec<(String, String)> {
    [
        ("p_p_id", PORTLET_ID),
        ("p_p_lifecycle", "2"),
        ("p_p_state", "normal"),
        ("p_p_mode", "view"),
        ("p_p_resource_id", resource_id),
        ("p_p_cacheability", "cacheLevelPage"),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value.to_string()))
    .chain([(format!("_{PORTLET_ID}_{parameter}"), value)])
    .collect()
}

/// Check the status and read the body as JSON.
async fn read_json(response: Response) -> Result<Value, FetchError> {
    let status = response.status();
    if !status.is_success() {
        let body = truncate(
            &response.text().await.unwrap_or_default(),
            LOGGED_BODY_LENGTH,
        );
        error!(
            status = status.as_u16(),
            body = %body,
            "schedule service returned an error status"
        );
        return Err(FetchError::BadStatus {
            status: status.as_u16(),
            body,
        });
    }
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_lowercase();
    let body = response.text().await?;
    parse_body(&content_type, &body)
}

/// Parse a body as JSON, whatever its declared content type.
fn parse_body(content_type: &str, body: &str) -> Result<Value, FetchError> {
    if content_type.contains("json") {
        if let Ok(value) = serde_json::from_str(body) {
            return Ok(value);
        }
    }
    let trimmed = body.trim();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        return match serde_json::from_str(trimmed) {
            Ok(value) => {
                if !content_type.contains("json") {
                    info!(content_type, "parsed JSON despite the declared content type");
                }
                Ok(value)
            }
            Err(err) => {
                error!(
                    %err,
                    body = %truncate(body, LOGGED_BODY_LENGTH),
                    "response looks like JSON but failed to parse"
                );
                Err(FetchError::UnparsableResponse(format!(
                    "response looks like JSON but failed to parse: {err}"
                )))
            }
        };
    }
    error!(content_type, body = %truncate(body, LOGGED_BODY_LENGTH), "response is not JSON");
    Err(FetchError::UnparsableResponse(describe_non_json(content_type, body)))
}

/// Describe a body that is not JSON, naming the page if it is HTML.
fn describe_non_json(content_type: &str, body: &str) -> String {
    if body.trim().is_empty() {
        return String::from("empty response body");
    }
    let title_selector = Selector::parse("title").unwrap();
    let dom = Html::parse_document(body);
    let title = dom
        .select(&title_selector)
        .next()
        .map(|title| title.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty());
    match title {
        Some(title) => format!("expected JSON but got the HTML page `{title}`"),
        None => format!("expected JSON but got `{content_type}` content"),
    }
}

/// Turn the parsed body into schedule entries.
///
/// Only the first entry is read; the rest of the list is ignored. An empty list, or a first
/// entry without schedule items, means the address has no schedule.
fn schedule_entries(
    value: Value,
    address_point_id: u64,
) -> Result<Vec<RawScheduleEntry>, FetchError> {
    let Value::Array(entries) = value else {
        return Err(FetchError::UnparsableResponse(String::from(
            "expected a list of schedules",
        )));
    };
    let entry = match entries.into_iter().next() {
        Some(Value::Null) | None => None,
        Some(entry) => Some(
            serde_json::from_value::<RawScheduleEntry>(entry)
                .map_err(|err| FetchError::UnparsableResponse(err.to_string()))?,
        ),
    };
    match entry {
        Some(entry) if !entry.schedule_items.is_empty() => Ok(vec![entry]),
        _ => {
            warn!(address_point_id, "no schedule found for address");
            Err(FetchError::NoScheduleFound { address_point_id })
        }
    }
}

fn truncate(body: &str, length: usize) -> String {
    body.chars().take(length).collect()
}
