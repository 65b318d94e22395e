//! The schedule data and its normalization into pickup events and per-fraction summaries.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    str::FromStr,
};

use bitmask_enum::bitmask;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::translation::{translate, TranslationTable};

pub(crate) static DATE_FORMAT: &str = "%Y-%m-%d";

/// One address as returned by the schedule endpoint.
///
/// Fields of the wrong type read as missing, and schedule items that are not objects are
/// dropped, so one malformed item never loses the rest of the schedule.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawScheduleEntry {
    #[serde(rename = "adres", default, deserialize_with = "lenient_string")]
    pub address: Option<String>,
    #[serde(rename = "dzielnicy", default, deserialize_with = "lenient_string")]
    pub district: Option<String>,
    #[serde(rename = "harmonogramy", default, deserialize_with = "lenient_items")]
    pub schedule_items: Vec<RawScheduleItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawScheduleItem {
    #[serde(rename = "data", default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
    #[serde(rename = "frakcja", default, deserialize_with = "lenient_fraction")]
    pub fraction: Option<RawFraction>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawFraction {
    #[serde(
        rename = "id_frakcja",
        alias = "id_frakcza",
        default,
        deserialize_with = "string_or_number"
    )]
    pub id: Option<String>,
    #[serde(rename = "nazwa", default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
}

/// The service sends some identifiers as strings and others as numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(string)) => Some(string),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(string)) => Some(string),
        _ => None,
    })
}

fn lenient_fraction<'de, D>(deserializer: D) -> Result<Option<RawFraction>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .and_then(|value| serde_json::from_value(value).ok()))
}

/// A missing or `null` list reads as empty.
fn lenient_items<'de, D>(deserializer: D) -> Result<Vec<RawScheduleItem>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(Value::Array(items)) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(vec![]);
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(item) => Some(item),
            Err(err) => {
                warn!(%err, "skipping malformed schedule item");
                None
            }
        })
        .collect())
}

/// The kind of waste a fraction belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WasteType {
    Waste,
    Paper,
    Recycle,
    Organic,
    Others,
    Custom,
}

impl WasteType {
    pub const ALL: [WasteType; 6] = [
        WasteType::Waste,
        WasteType::Paper,
        WasteType::Recycle,
        WasteType::Organic,
        WasteType::Others,
        WasteType::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WasteType::Waste => "waste",
            WasteType::Paper => "paper",
            WasteType::Recycle => "recycle",
            WasteType::Organic => "organic",
            WasteType::Others => "others",
            WasteType::Custom => "custom",
        }
    }

    pub fn bitmask(&self) -> WasteTypeBitmask {
        match self {
            WasteType::Waste => WasteTypeBitmask::Waste,
            WasteType::Paper => WasteTypeBitmask::Paper,
            WasteType::Recycle => WasteTypeBitmask::Recycle,
            WasteType::Organic => WasteTypeBitmask::Organic,
            WasteType::Others => WasteTypeBitmask::Others,
            WasteType::Custom => WasteTypeBitmask::Custom,
        }
    }
}

impl fmt::Display for WasteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown waste type `{0}`")]
pub struct UnknownWasteType(pub String);

impl FromStr for WasteType {
    type Err = UnknownWasteType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WasteType::ALL
            .into_iter()
            .find(|waste_type| waste_type.as_str() == s)
            .ok_or_else(|| UnknownWasteType(s.to_string()))
    }
}

/// A set of waste types, used to exclude fractions from calendar exports.
#[bitmask(u8)]
pub enum WasteTypeBitmask {
    Waste,
    Paper,
    Recycle,
    Organic,
    Others,
    Custom,
}

/// Maps raw fraction labels to waste types.
///
/// Labels are matched exactly; anything unknown is [`WasteType::Custom`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WasteTypeMapping(HashMap<String, WasteType>);

impl WasteTypeMapping {
    pub fn resolve(&self, raw_name: &str) -> WasteType {
        self.0.get(raw_name).copied().unwrap_or(WasteType::Custom)
    }
}

impl Default for WasteTypeMapping {
    fn default() -> Self {
        [
            ("zmieszane odpady opakowaniowe", WasteType::Waste),
            ("niesegregowane (zmieszane) odpady komunalne", WasteType::Waste),
            ("opakowania z papieru i tektury", WasteType::Paper),
            ("opakowania ze szkła", WasteType::Recycle),
            ("odpady ulegające biodegradacji", WasteType::Organic),
            ("odpady kuchenne ulegające biodegradacji", WasteType::Organic),
            ("odpady wielkogabarytowe", WasteType::Others),
        ]
        .into_iter()
        .map(|(label, waste_type)| (label.to_string(), waste_type))
        .collect()
    }
}

impl FromIterator<(String, WasteType)> for WasteTypeMapping {
    fn from_iter<T: IntoIterator<Item = (String, WasteType)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A single upcoming pickup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PickupEvent {
    pub date: NaiveDate,
    pub category_id: String,
    pub category_display_name: String,
    pub description: String,
}

/// What is known about one fraction of the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub id: String,
    pub display_name: String,
    pub waste_type: WasteType,
    pub next_date: Option<NaiveDate>,
    pub days_until: Option<i64>,
}

/// A complete snapshot of the schedule of one address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedSchedule {
    pub address: Option<String>,
    pub district: Option<String>,
    pub events: Vec<PickupEvent>,
    pub fractions: BTreeMap<String, CategorySummary>,
}

impl NormalizedSchedule {
    /// The fewest days until any fraction is picked up.
    pub fn min_days_until(&self) -> Option<i64> {
        self.fractions
            .values()
            .filter_map(|summary| summary.days_until)
            .min()
    }
}

/// Normalize the raw schedule of an address.
///
/// Only the first entry of `payload` is considered. Items without a date or fraction id, or
/// with an unparsable date, are skipped. Events before `today` are dropped, but their
/// fractions are still listed.
pub fn normalize(
    payload: &[RawScheduleEntry],
    today: NaiveDate,
    translations: &TranslationTable,
    waste_types: &WasteTypeMapping,
) -> NormalizedSchedule {
    let Some(entry) = payload.first() else {
        return NormalizedSchedule::default();
    };
    let mut events: Vec<PickupEvent> = vec![];
    let mut fractions: BTreeMap<String, CategorySummary> = BTreeMap::new();
    for item in &entry.schedule_items {
        let date_option = item.date.as_deref().filter(|date| !date.is_empty());
        let id_option = item
            .fraction
            .as_ref()
            .and_then(|fraction| fraction.id.as_deref())
            .filter(|id| !id.is_empty());
        let (Some(date_str), Some(fraction_id)) = (date_option, id_option) else {
            continue;
        };
        let Ok(date) = NaiveDate::parse_from_str(date_str, DATE_FORMAT) else {
            warn!(date = date_str, fraction_id, "skipping schedule item with invalid date");
            continue;
        };
        let raw_name = item
            .fraction
            .as_ref()
            .and_then(|fraction| fraction.name.as_deref())
            .unwrap_or_default();
        let display_name = translate(raw_name, translations);
        if date >= today {
            events.push(PickupEvent {
                date,
                category_id: fraction_id.to_string(),
                description: format!("Wywóz: {display_name}"),
                category_display_name: display_name.clone(),
            });
        }
        fractions
            .entry(fraction_id.to_string())
            .or_insert_with(|| CategorySummary {
                id: fraction_id.to_string(),
                display_name,
                waste_type: waste_types.resolve(raw_name),
                next_date: None,
                days_until: None,
            });
    }
    events.sort_by_key(|event| event.date);
    for summary in fractions.values_mut() {
        if let Some(next_event) = events.iter().find(|event| event.category_id == summary.id) {
            summary.next_date = Some(next_event.date);
            summary.days_until = Some((next_event.date - today).num_days());
        }
    }
    NormalizedSchedule {
        address: Some(entry.address.clone().unwrap_or_default()),
        district: Some(entry.district.clone().unwrap_or_default()),
        events,
        fractions,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::{
        schedule::{
            normalize, NormalizedSchedule, RawFraction, RawScheduleEntry, RawScheduleItem,
            WasteType, WasteTypeMapping,
        },
        translation::TranslationTable,
    };

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn item(date: &str, id: &str, name: &str) -> RawScheduleItem {
        RawScheduleItem {
            date: Some(date.to_string()),
            fraction: Some(RawFraction {
                id: Some(id.to_string()),
                name: Some(name.to_string()),
            }),
        }
    }

    fn entry(items: Vec<RawScheduleItem>) -> RawScheduleEntry {
        RawScheduleEntry {
            address: Some("KOSZYKOWA 1".to_string()),
            district: Some("Śródmieście".to_string()),
            schedule_items: items,
        }
    }

    fn fixture() -> Vec<RawScheduleEntry> {
        serde_json::from_str(include_str!("schedule/tests/schedule.json")).unwrap()
    }

    fn normalize_fixture(today: NaiveDate) -> NormalizedSchedule {
        normalize(
            &fixture(),
            today,
            &TranslationTable::default(),
            &WasteTypeMapping::default(),
        )
    }

    #[test]
    fn test_normalize_empty() {
        let normalized = normalize(
            &[],
            date("2024-05-15"),
            &TranslationTable::default(),
            &WasteTypeMapping::default(),
        );
        assert_eq!(normalized, NormalizedSchedule::default());
        assert_eq!(normalized.address, None);
        assert!(normalized.events.is_empty());
        assert!(normalized.fractions.is_empty());
    }

    #[test]
    fn test_normalize() {
        let today = date("2024-05-15");
        let normalized = normalize_fixture(today);
        assert_eq!(normalized.address.as_deref(), Some("MARSZAŁKOWSKA 104/122"));
        assert_eq!(normalized.district.as_deref(), Some("Śródmieście"));
        let events: Vec<(NaiveDate, &str)> = normalized
            .events
            .iter()
            .map(|event| (event.date, event.category_id.as_str()))
            .collect();
        assert_eq!(
            events,
            vec![
                (date("2024-05-15"), "MT"),
                (date("2024-05-16"), "ZM"),
                (date("2024-05-16"), "SZ"),
                (date("2024-05-20"), "OK"),
                (date("2024-05-22"), "PA"),
                (date("2024-05-23"), "ZM"),
                (date("2024-05-29"), "MT"),
                (date("2024-06-03"), "OK"),
            ]
        );
        assert_eq!(
            normalized.events[2].description,
            "Wywóz: opakowania ze szkła"
        );
        assert!(normalized.events.iter().all(|event| event.date >= today));

        let ids: Vec<&str> = normalized.fractions.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["BK", "MT", "OK", "PA", "SZ", "ZM"]);
        let bulky = &normalized.fractions["BK"];
        assert_eq!(bulky.next_date, None);
        assert_eq!(bulky.days_until, None);
        // the mapping is case-sensitive
        assert_eq!(bulky.waste_type, WasteType::Custom);
        let kitchen = &normalized.fractions["OK"];
        assert_eq!(kitchen.next_date, Some(date("2024-05-20")));
        assert_eq!(kitchen.days_until, Some(5));
        assert_eq!(kitchen.waste_type, WasteType::Organic);
        let metals = &normalized.fractions["MT"];
        assert_eq!(metals.days_until, Some(0));
        assert_eq!(metals.waste_type, WasteType::Waste);
        assert_eq!(normalized.fractions["PA"].waste_type, WasteType::Paper);
        assert_eq!(normalized.fractions["SZ"].waste_type, WasteType::Recycle);
        assert_eq!(normalized.min_days_until(), Some(0));
    }

    #[test]
    fn test_normalize_next_date_is_earliest_event() {
        for today in ["2024-05-01", "2024-05-16", "2024-05-21", "2024-06-03"] {
            let today = date(today);
            let normalized = normalize_fixture(today);
            assert!(normalized
                .events
                .windows(2)
                .all(|pair| pair[0].date <= pair[1].date));
            for summary in normalized.fractions.values() {
                let earliest = normalized
                    .events
                    .iter()
                    .filter(|event| event.category_id == summary.id)
                    .map(|event| event.date)
                    .min();
                assert_eq!(summary.next_date, earliest);
                if let Some(days_until) = summary.days_until {
                    assert!(days_until >= 0);
                }
            }
        }
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let today = date("2024-05-15");
        let first = normalize_fixture(today);
        let second = normalize_fixture(today);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_normalize_same_date_keeps_source_order() {
        let payload = vec![entry(vec![
            item("2024-05-20", "PA", "opakowania z papieru i tektury"),
            item("2024-05-17", "ZM", "niesegregowane (zmieszane) odpady komunalne"),
            item("2024-05-20", "SZ", "opakowania ze szkła"),
        ])];
        let normalized = normalize(
            &payload,
            date("2024-05-15"),
            &TranslationTable::default(),
            &WasteTypeMapping::default(),
        );
        let ids: Vec<&str> = normalized
            .events
            .iter()
            .map(|event| event.category_id.as_str())
            .collect();
        assert_eq!(ids, vec!["ZM", "PA", "SZ"]);
    }

    #[test]
    fn test_normalize_skips_malformed_items() {
        let mut no_fraction = item("2024-05-20", "", "");
        no_fraction.fraction = None;
        let payload = vec![entry(vec![
            item("2024-05-20", "", "opakowania ze szkła"),
            item("", "SZ", "opakowania ze szkła"),
            item("2024-13-01", "SZ", "opakowania ze szkła"),
            item("tomorrow", "SZ", "opakowania ze szkła"),
            no_fraction,
        ])];
        let normalized = normalize(
            &payload,
            date("2024-05-15"),
            &TranslationTable::default(),
            &WasteTypeMapping::default(),
        );
        assert_eq!(normalized.address.as_deref(), Some("KOSZYKOWA 1"));
        assert!(normalized.events.is_empty());
        assert!(normalized.fractions.is_empty());
    }

    #[test]
    fn test_normalize_translates_but_maps_raw_label() {
        let translations: TranslationTable = [(
            "opakowania_ze_szkla".to_string(),
            "Glass".to_string(),
        )]
        .into_iter()
        .collect();
        let payload = vec![entry(vec![item("2024-05-20", "SZ", "opakowania ze szkła")])];
        let normalized = normalize(
            &payload,
            date("2024-05-15"),
            &translations,
            &WasteTypeMapping::default(),
        );
        assert_eq!(normalized.events[0].category_display_name, "Glass");
        assert_eq!(normalized.events[0].description, "Wywóz: Glass");
        let glass = &normalized.fractions["SZ"];
        assert_eq!(glass.display_name, "Glass");
        assert_eq!(glass.waste_type, WasteType::Recycle);
    }

    #[test]
    fn test_normalize_uses_first_entry_only() {
        let normalized = normalize_fixture(date("2024-05-17"));
        assert_eq!(normalized.address.as_deref(), Some("MARSZAŁKOWSKA 104/122"));
        assert!(!normalized
            .events
            .iter()
            .any(|event| event.date == date("2024-05-17")));
    }

    #[test]
    fn test_deserialize_raw_entry() {
        let entries: Vec<RawScheduleEntry> = serde_json::from_str(
            r#"[{"harmonogramy": [
                {"data": "2024-05-20", "frakcja": {"id_frakcja": 7, "nazwa": "Papier"}},
                {"data": "2024-05-21", "frakcja": {"id_frakcza": "SZ", "nazwa": null}},
                {"data": null, "frakcja": null}
            ]}]"#,
        )
        .unwrap();
        let items = &entries[0].schedule_items;
        assert_eq!(entries[0].address, None);
        assert_eq!(items[0].fraction.as_ref().unwrap().id.as_deref(), Some("7"));
        assert_eq!(items[1].fraction.as_ref().unwrap().id.as_deref(), Some("SZ"));
        assert_eq!(items[2], RawScheduleItem::default());
    }

    #[test]
    fn test_deserialize_malformed_items() {
        let entries: Vec<RawScheduleEntry> = serde_json::from_str(
            r#"[{"adres": 5, "harmonogramy": [
                {"data": 20240520, "frakcja": {"id_frakcja": "PA", "nazwa": "Papier"}},
                {"data": "2024-05-21", "frakcja": "SZ"},
                "2024-05-22",
                null,
                {"data": "2024-05-23", "frakcja": {"id_frakcja": "ZM", "nazwa": 3}}
            ]}]"#,
        )
        .unwrap();
        let items = &entries[0].schedule_items;
        assert_eq!(entries[0].address, None);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].date, None);
        assert_eq!(items[1].fraction, None);
        assert_eq!(items[2].date.as_deref(), Some("2024-05-23"));
        assert_eq!(items[2].fraction.as_ref().unwrap().name, None);

        let normalized = normalize(
            &entries,
            date("2024-05-15"),
            &TranslationTable::default(),
            &WasteTypeMapping::default(),
        );
        assert_eq!(normalized.events.len(), 1);
        assert_eq!(normalized.events[0].category_id, "ZM");
    }

    #[test]
    fn test_deserialize_null_schedule_items() {
        let entries: Vec<RawScheduleEntry> =
            serde_json::from_str(r#"[{"adres": "A", "harmonogramy": null}, {"adres": "B"}]"#)
                .unwrap();
        assert!(entries[0].schedule_items.is_empty());
        assert!(entries[1].schedule_items.is_empty());
    }

    #[test]
    fn test_waste_type_from_str() {
        for waste_type in WasteType::ALL {
            assert_eq!(waste_type.as_str().parse::<WasteType>(), Ok(waste_type));
        }
        assert!("glass".parse::<WasteType>().is_err());
    }
}
