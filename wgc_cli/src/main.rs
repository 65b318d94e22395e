use std::{env::current_dir, fs::write, path::PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wgc_core::{
    config::{Config, UpdateInterval, DEFAULT_UPDATE_INTERVAL_DAYS},
    coordinator::ScheduleCoordinator,
    garbage_client::GarbageClient,
    ical::generator::Emitter,
    schedule::WasteTypeBitmask,
    setup::SetupFlow,
    translation::TranslationTable,
};

#[derive(Debug, Parser)]
#[command(version, about = "Warsaw waste collection schedules")]
pub struct Arguments {
    /// a JSON file translating fraction names
    #[arg(long, global = true, env = "WGC_TRANSLATIONS")]
    pub translations: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// list the addresses within a postal code
    Search {
        /// the postal code, e.g. 00-659
        postal_code: String,
    },
    /// choose an address and check that it has a schedule
    Setup {
        /// the postal code, e.g. 00-659
        postal_code: String,
        /// the address point id, as listed by `search`
        address_point_id: String,
        /// days between schedule updates
        #[arg(long)]
        update_interval: Option<u32>,
    },
    /// print the normalized schedule
    Schedule {
        /// the address point id
        address_point_id: u64,
    },
    /// print the days until the next pickup
    Next {
        /// the address point id
        address_point_id: u64,
        /// days between schedule updates
        #[arg(long)]
        update_interval: Option<u32>,
    },
    /// write the pickups to calendar.ics
    Calendar(CalendarArguments),
}

#[derive(Debug, Args)]
pub struct CalendarArguments {
    /// the address point id
    pub address_point_id: u64,
    /// exclude mixed and packaging waste collection dates
    #[arg(long)]
    pub exclude_waste: bool,
    /// exclude paper collection dates
    #[arg(long)]
    pub exclude_paper: bool,
    /// exclude glass collection dates
    #[arg(long)]
    pub exclude_recycle: bool,
    /// exclude organic waste collection dates
    #[arg(long)]
    pub exclude_organic: bool,
    /// exclude bulky waste collection dates
    #[arg(long)]
    pub exclude_others: bool,
    /// exclude collection dates of unknown fractions
    #[arg(long)]
    pub exclude_custom: bool,
}

impl From<&CalendarArguments> for WasteTypeBitmask {
    fn from(value: &CalendarArguments) -> Self {
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

fn load_translations(path: Option<&PathBuf>) -> Result<TranslationTable> {
    let Some(path) = path else {
        return Ok(TranslationTable::default());
    };
    let translations = TranslationTable::from_path(path)
        .with_context(|| format!("could not load translations from {}", path.display()))?;
    info!(path = %path.display(), count = translations.len(), "loaded translations");
    Ok(translations)
}

async fn refreshed_coordinator(
    address_point_id: u64,
    update_interval: Option<u32>,
    translations: TranslationTable,
) -> Result<ScheduleCoordinator<GarbageClient>> {
    let update_interval =
        UpdateInterval::new(update_interval.unwrap_or(DEFAULT_UPDATE_INTERVAL_DAYS))?;
    let config = Config::new(address_point_id).with_update_interval(update_interval);
    let mut coordinator =
        ScheduleCoordinator::new(GarbageClient::new(), config).with_translations(translations);
    coordinator.refresh(Local::now().naive_local()).await?;
    Ok(coordinator)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let args = Arguments::parse();
    let translations = load_translations(args.translations.as_ref())?;
    match &args.command {
        Command::Search { postal_code } => {
            let client = GarbageClient::new();
            let mut flow = SetupFlow::new(&client);
            flow.submit_postal_code(postal_code).await?;
            for (_, label) in flow.options() {
                println!("{label}");
            }
        }
        Command::Setup {
            postal_code,
            address_point_id,
            update_interval,
        } => {
            let client = GarbageClient::new();
            let mut flow = SetupFlow::new(&client);
            flow.submit_postal_code(postal_code).await?;
            let entry = flow
                .select_address(address_point_id, *update_interval)
                .await?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        Command::Schedule { address_point_id } => {
            let coordinator = refreshed_coordinator(*address_point_id, None, translations).await?;
            println!("{}", serde_json::to_string_pretty(&coordinator.data())?);
        }
        Command::Next {
            address_point_id,
            update_interval,
        } => {
            let coordinator =
                refreshed_coordinator(*address_point_id, *update_interval, translations).await?;
            let output = json!({
                "sensor": coordinator.sensor(),
                "next_event": coordinator.calendar().and_then(|view| view.next_event()),
                "fractions": coordinator.data().map(|data| &data.fractions),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Calendar(calendar_args) => {
            let coordinator =
                refreshed_coordinator(calendar_args.address_point_id, None, translations).await?;
            let calendar = coordinator
                .calendar()
                .context("no schedule available")?
                .to_ical(
                    WasteTypeBitmask::from(calendar_args),
                    Local::now().naive_local(),
                );
            let mut path = current_dir()?;
            path.push("calendar.ics");
            write(&path, calendar.generate())?;
            info!(path = %path.display(), events = calendar.events.len(), "wrote calendar");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use wgc_core::schedule::WasteTypeBitmask;

    use crate::{Arguments, Command};

    fn excluded(args: &[&str]) -> WasteTypeBitmask {
        let args = Arguments::try_parse_from(args).unwrap();
        match &args.command {
            Command::Calendar(calendar_args) => WasteTypeBitmask::from(calendar_args),
            command => panic!("unexpected command {command:?}"),
        }
    }

    #[test]
    fn test_from_calendar_arguments_for_exclude_waste_type() {
        assert_eq!(
            excluded(&["wgc_cli", "calendar", "101174"]),
            WasteTypeBitmask::none()
        );
        assert_eq!(
            excluded(&["wgc_cli", "calendar", "101174", "--exclude-waste"]),
            WasteTypeBitmask::Waste
        );
        assert_eq!(
            excluded(&[
                "wgc_cli",
                "calendar",
                "101174",
                "--exclude-recycle",
                "--exclude-others",
                "--exclude-custom"
            ]),
            WasteTypeBitmask::Recycle
                .or(WasteTypeBitmask::Others)
                .or(WasteTypeBitmask::Custom)
        );
    }

    #[test]
    fn test_parse_arguments() {
        let args = Arguments::try_parse_from([
            "wgc_cli",
            "setup",
            "00-659",
            "101174",
            "--update-interval",
            "3",
            "--translations",
            "en.json",
        ])
        .unwrap();
        assert_eq!(args.translations.unwrap().to_str(), Some("en.json"));
        match args.command {
            Command::Setup {
                postal_code,
                address_point_id,
                update_interval,
            } => {
                assert_eq!(postal_code, "00-659");
                assert_eq!(address_point_id, "101174");
                assert_eq!(update_interval, Some(3));
            }
            command => panic!("unexpected command {command:?}"),
        }
        assert!(Arguments::try_parse_from(["wgc_cli", "next", "not-a-number"]).is_err());
    }
}
