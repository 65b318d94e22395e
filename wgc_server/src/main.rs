use std::{net::SocketAddr, path::PathBuf};

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wgc_core::{garbage_client::GarbageClient, translation::TranslationTable};

use crate::state::AppState;

mod route;
mod state;

#[derive(Debug, Parser)]
#[command(version, about = "Serves Warsaw waste collection schedules")]
struct Arguments {
    /// the address to listen on
    #[arg(long, env = "WGC_BIND", default_value = "0.0.0.0:8008")]
    bind: SocketAddr,
    /// a JSON file translating fraction names
    #[arg(long, env = "WGC_TRANSLATIONS")]
    translations: Option<PathBuf>,
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/calendar", get(route::calendar::handler))
        .route(
            "/calendar/:waste_type",
            get(route::calendar::waste_type::handler),
        )
        .route("/schedule", get(route::schedule::handler))
        .route("/sensor", get(route::sensor::handler))
        .route("/events", get(route::events::handler))
        .route("/addresses", get(route::addresses::handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = Arguments::parse();
    let translations = match &args.translations {
        Some(path) => TranslationTable::from_path(path)
            .with_context(|| format!("could not load translations from {}", path.display()))?,
        None => TranslationTable::default(),
    };
    let app = router(AppState::new(GarbageClient::new(), translations));
    info!(bind = %args.bind, "listening");
    axum::Server::bind(&args.bind)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
