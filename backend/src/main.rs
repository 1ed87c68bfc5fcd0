#[macro_use]
extern crate rocket;

mod api;
mod config;
mod models;
mod services;
mod utils;

use crate::config::{create_app_state, create_cors, init_logger, load_environment, AppConfig};
use crate::services::metadata::MetadataResolver;
use crate::services::transcript::TranscriptResolver;
use crate::services::youtube::YouTubeClient;
use log::info;
use rocket::{Build, Rocket};

pub struct AppState {
    pub config: AppConfig,
    pub youtube: YouTubeClient,
    pub transcripts: TranscriptResolver,
    pub metadata: MetadataResolver,
}

pub fn build_rocket(state: AppState) -> anyhow::Result<Rocket<Build>> {
    let cors = create_cors(&state.config)?;
    let figment = rocket::Config::figment()
        .merge(("address", "0.0.0.0"))
        .merge(("port", state.config.port));

    Ok(rocket::custom(figment)
        .manage(state)
        .mount("/api", api::routes())
        .register("/", api::catchers())
        .attach(cors))
}

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    load_environment();
    init_logger();

    let config = AppConfig::from_env();
    let state = create_app_state(&config)?;
    info!("Backend will run on port {}", config.port);

    build_rocket(state)?
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Rocket failed: {e}"))?;
    Ok(())
}
