//! The calendar view of a schedule: the next pickup, pickups in a date range and an
//! iCalendar export.

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use ical::{
    generator::{IcalCalendar, IcalCalendarBuilder, IcalEvent, IcalEventBuilder, Property},
    ical_property,
};
use regex::Regex;
use serde::Serialize;

use crate::schedule::{NormalizedSchedule, PickupEvent, WasteType, WasteTypeBitmask};

static PROD_ID: [&str; 2] = ["Wywoz Odpadow", "warszawa19115.pl"];
static TIMEZONE: &str = "Europe/Warsaw";
static FORMAT: &str = "%Y%m%d";
static CHANGED_FORMAT: &str = "%Y%m%dT%H%M%S";

/// A pickup as shown in a calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEvent {
    pub uid: String,
    pub date: NaiveDate,
    pub summary: String,
    pub description: String,
    pub fraction_id: String,
}

/// Read-only calendar access to the schedule of one address point.
#[derive(Debug, Clone, Copy)]
pub struct CalendarView<'a> {
    schedule: &'a NormalizedSchedule,
    address_point_id: u64,
}

impl<'a> CalendarView<'a> {
    pub fn new(schedule: &'a NormalizedSchedule, address_point_id: u64) -> Self {
        Self {
            schedule,
            address_point_id,
        }
    }

    /// The first pickup of the snapshot.
    pub fn next_event(&self) -> Option<CalendarEvent> {
        self.schedule
            .events
            .first()
            .map(|event| self.calendar_event(event))
    }

    /// All pickups from `start` to `end`, both inclusive.
    pub fn events_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<CalendarEvent> {
        self.schedule
            .events
            .iter()
            .filter(|event| start <= event.date && event.date <= end)
            .map(|event| self.calendar_event(event))
            .collect()
    }

    /// Build an iCalendar with one all-day event per pickup.
    pub fn to_ical(
        &self,
        excluded_waste_types: WasteTypeBitmask,
        changed: NaiveDateTime,
    ) -> IcalCalendar {
        let changed = changed.format(CHANGED_FORMAT).to_string();
        let mut included = WasteType::ALL
            .into_iter()
            .filter(|waste_type| !excluded_waste_types.contains(waste_type.bitmask()));
        let prod_id_label = match (included.next(), included.next()) {
            (Some(only), None) => Some(only.as_str()),
            _ => None,
        };
        let mut calendar = IcalCalendarBuilder::version("2.0")
            .gregorian()
            .prodid(prod_id(prod_id_label))
            .build();
        for event in &self.schedule.events {
            if excluded_waste_types.contains(self.waste_type(event).bitmask()) {
                continue;
            }
            calendar.events.push(self.ical_event(event, &changed));
        }
        calendar
    }

    fn waste_type(&self, event: &PickupEvent) -> WasteType {
        self.schedule
            .fractions
            .get(&event.category_id)
            .map(|summary| summary.waste_type)
            .unwrap_or(WasteType::Custom)
    }

    fn calendar_event(&self, event: &PickupEvent) -> CalendarEvent {
        CalendarEvent {
            uid: uid(self.address_point_id, &event.category_id, &event.date),
            date: event.date,
            summary: event.category_display_name.clone(),
            description: event.description.clone(),
            fraction_id: event.category_id.clone(),
        }
    }

    fn ical_event(&self, event: &PickupEvent, changed: &str) -> IcalEvent {
        let mut builder = IcalEventBuilder::tzid(TIMEZONE)
            .uid(uid(self.address_point_id, &event.category_id, &event.date))
            .changed(changed)
            .one_day(event.date.format(FORMAT).to_string())
            .set(ical_property!("SUMMARY", &event.category_display_name))
            .set(ical_property!("DESCRIPTION", &event.description))
            .set(ical_property!("TRANSP", "TRANSPARENT"));
        if let Some(address) = self.schedule.address.as_deref().filter(|a| !a.is_empty()) {
            builder = builder.set(ical_property!(
                "LOCATION",
                format!("{address}, Warszawa")
            ));
        }
        builder.build()
    }
}

fn prod_id(label: Option<&str>) -> String {
    let mut strings: Vec<String> = Vec::from(PROD_ID).into_iter().map(String::from).collect();
    if let Some(label) = label {
        strings.splice(0..0, [String::from(label)]);
    }
    strings.splice(0..0, [String::from("-")]);
    strings.join("//")
}

fn whitespace_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Get a unique id for a pickup of a fraction at an address point.
///
/// Changing this function is a breaking change!
fn uid(address_point_id: u64, fraction_id: &str, date: &NaiveDate) -> String {
    let fraction_id = whitespace_regex().replace_all(fraction_id, "-");
    format!(
        "wywoz_odpadow_{address_point_id}_{fraction_id}_{}@warszawa19115.pl",
        date.format("%Y-%m-%d")
    )
}
