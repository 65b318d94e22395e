//! The "days until next pickup" sensor.

use serde::Serialize;

use crate::{config::UpdateInterval, schedule::NormalizedSchedule};

pub static UNIT_OF_MEASUREMENT: &str = "dni";
pub static ICON: &str = "mdi:trash-can";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorAttributes {
    /// The poll interval in days.
    pub update_interval: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorState {
    pub name: String,
    /// Days until the next pickup of any fraction.
    pub state: Option<i64>,
    pub unit_of_measurement: &'static str,
    pub icon: &'static str,
    pub attributes: SensorAttributes,
}

impl SensorState {
    pub fn new(
        name: String,
        schedule: Option<&NormalizedSchedule>,
        update_interval: UpdateInterval,
    ) -> Self {
        Self {
            name,
            state: schedule.and_then(NormalizedSchedule::min_days_until),
            unit_of_measurement: UNIT_OF_MEASUREMENT,
            icon: ICON,
            attributes: SensorAttributes {
                update_interval: update_interval.days(),
            },
        }
    }
}
