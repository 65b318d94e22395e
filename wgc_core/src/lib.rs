//! This crate turns Warsaw's waste collection schedules into calendar events and
//! a "days until next pickup" sensor value.
//!
//! The schedules are read from <https://warszawa19115.pl/harmonogramy-wywozu-odpadow>.

pub use ical;

pub mod calendar;
pub mod config;
pub mod coordinator;
pub mod garbage_client;
pub mod schedule;
pub mod sensor;
pub mod setup;
pub mod translation;

#[cfg(test)]
mod test_source;
