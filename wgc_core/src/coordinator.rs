//! Polling the schedule of one address and keeping the latest snapshot.

use chrono::NaiveDateTime;
use tracing::{debug, error, info};

use crate::{
    calendar::CalendarView,
    config::{Config, UpdateInterval},
    garbage_client::{FetchError, ScheduleSource},
    schedule::{normalize, NormalizedSchedule, WasteTypeMapping},
    sensor::SensorState,
    translation::TranslationTable,
};

/// Polls a [`ScheduleSource`] for one address.
///
/// Every successful refresh replaces the snapshot entirely. A failed refresh keeps the
/// previous snapshot and reports the error. Either way the next refresh is due one update
/// interval after the attempt.
pub struct ScheduleCoordinator<S: ScheduleSource> {
    source: S,
    config: Config,
    title: Option<String>,
    translations: TranslationTable,
    waste_types: WasteTypeMapping,
    data: Option<NormalizedSchedule>,
    last_refresh: Option<NaiveDateTime>,
    last_attempt: Option<NaiveDateTime>,
    last_error: Option<FetchError>,
}

impl<S: ScheduleSource> ScheduleCoordinator<S> {
    pub fn new(source: S, config: Config) -> Self {
        Self {
            source,
            config,
            title: None,
            translations: TranslationTable::default(),
            waste_types: WasteTypeMapping::default(),
            data: None,
            last_refresh: None,
            last_attempt: None,
            last_error: None,
        }
    }

    pub fn with_title(mut self, title: String) -> Self {
        self.title = Some(title);
        self
    }

    pub fn with_translations(mut self, translations: TranslationTable) -> Self {
        self.translations = translations;
        self
    }

    pub fn with_waste_types(mut self, waste_types: WasteTypeMapping) -> Self {
        self.waste_types = waste_types;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_update_interval(&mut self, update_interval: UpdateInterval) {
        self.config.update_interval = update_interval;
    }

    pub fn data(&self) -> Option<&NormalizedSchedule> {
        self.data.as_ref()
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    pub fn last_refresh(&self) -> Option<NaiveDateTime> {
        self.last_refresh
    }

    pub fn last_attempt(&self) -> Option<NaiveDateTime> {
        self.last_attempt
    }

    /// Whether the update interval has passed since the last refresh attempt.
    pub fn needs_refresh(&self, now: NaiveDateTime) -> bool {
        match self.last_attempt {
            Some(last_attempt) => now - last_attempt >= self.config.update_interval.duration(),
            None => true,
        }
    }

    /// Fetch and normalize the schedule, replacing the snapshot.
    pub async fn refresh(
        &mut self,
        now: NaiveDateTime,
    ) -> Result<&NormalizedSchedule, FetchError> {
        let address_point_id = self.config.address_point_id;
        self.last_attempt = Some(now);
        let payload = match self.source.fetch(address_point_id).await {
            Ok(payload) => payload,
            Err(err) => {
                error!(address_point_id, %err, "schedule refresh failed");
                self.last_error = Some(err.clone());
                return Err(err);
            }
        };
        // The first entry is taken as the requested address without checking it.
        debug!(
            address_point_id,
            entries = payload.len(),
            address = ?payload.first().and_then(|entry| entry.address.as_deref()),
            "using first schedule entry"
        );
        let schedule = normalize(&payload, now.date(), &self.translations, &self.waste_types);
        info!(
            address_point_id,
            events = schedule.events.len(),
            fractions = schedule.fractions.len(),
            "schedule refreshed"
        );
        self.last_refresh = Some(now);
        self.last_error = None;
        Ok(self.data.insert(schedule))
    }

    /// Refresh when the update interval has passed. Returns whether a refresh happened.
    pub async fn refresh_if_due(&mut self, now: NaiveDateTime) -> Result<bool, FetchError> {
        if !self.needs_refresh(now) {
            return Ok(false);
        }
        self.refresh(now).await?;
        Ok(true)
    }

    /// The name shown for this address.
    pub fn display_name(&self) -> String {
        self.data
            .as_ref()
            .and_then(|data| data.address.clone())
            .filter(|address| !address.is_empty())
            .or_else(|| self.title.clone())
            .unwrap_or_else(|| format!("Wywóz Odpadów ({})", self.config.address_point_id))
    }

    pub fn calendar(&self) -> Option<CalendarView<'_>> {
        self.data
            .as_ref()
            .map(|data| CalendarView::new(data, self.config.address_point_id))
    }

    pub fn sensor(&self) -> SensorState {
        SensorState::new(
            self.display_name(),
            self.data.as_ref(),
            self.config.update_interval,
        )
    }
}
