// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Rain forecast: animated precipitation radar for a map location.
//!
//! Loads the persisted configuration, applies command line overrides and runs
//! the radar client against a headless map until interrupted.

mod config;
mod map;
mod replay;

use std::path::PathBuf;

use clap::Parser;
use log::{error, info, warn};
use rain_radar::{validate_location, Client, DisplayStatus, RainViewerSource};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use config::AppConfig;
use map::ConsoleMap;
use replay::FileSource;

/// Animated rain radar for a map location
#[derive(Parser, Debug)]
#[command(name = "rain-forecast", version, about)]
struct Cli {
    /// Map center latitude
    #[arg(long, allow_hyphen_values = true)]
    latitude: Option<f64>,

    /// Map center longitude
    #[arg(long, allow_hyphen_values = true)]
    longitude: Option<f64>,

    /// Time between radar API requests in milliseconds
    #[arg(long)]
    update_interval_ms: Option<u64>,

    /// Time each frame stays on screen in milliseconds
    #[arg(long)]
    animation_speed_ms: Option<u64>,

    /// Log filter (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Use a different configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Replay a saved weather-maps payload instead of calling the API
    #[arg(long)]
    payload_file: Option<PathBuf>,

    /// Print the configuration file path and exit
    #[arg(long)]
    print_config_path: bool,
}

impl Cli {
    /// Apply command line overrides on top of the file configuration.
    fn apply(&self, config: &mut AppConfig) {
        if let Some(latitude) = self.latitude {
            config.latitude = Some(latitude);
        }
        if let Some(longitude) = self.longitude {
            config.longitude = Some(longitude);
        }
        if let Some(interval) = self.update_interval_ms {
            config.update_interval_ms = interval;
        }
        if let Some(speed) = self.animation_speed_ms {
            config.animation_speed_ms = speed;
        }
    }
}

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();
}

fn load_config(cli: &Cli) -> Result<AppConfig, confy::ConfyError> {
    match &cli.config {
        Some(path) => AppConfig::load_path(path),
        None => AppConfig::load(),
    }
}

async fn report_status(mut status_rx: watch::Receiver<DisplayStatus>) {
    loop {
        let status = status_rx.borrow_and_update().clone();
        match status {
            DisplayStatus::ConfigError(reason) => error!("Radar unavailable: {}", reason),
            DisplayStatus::Loading => info!("Loading radar frames..."),
            DisplayStatus::Ready => info!("Radar ready"),
        }

        if status_rx.changed().await.is_err() {
            return;
        }
    }
}

/// Wait for the status reporter, returning whether it ended cleanly.
async fn join_reporter(task: JoinHandle<()>) -> bool {
    match task.await {
        Ok(()) => true,
        Err(e) => {
            warn!("Status reporter stopped unexpectedly: {}", e);
            false
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.print_config_path {
        let path = match &cli.config {
            Some(path) => path.clone(),
            None => AppConfig::get_config_path()?,
        };
        println!("{}", path.display());
        return Ok(());
    }

    init_logging(&cli.log_level);
    info!("Starting Rain Forecast...");

    let mut app_config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load configuration, using defaults: {}", e);
            AppConfig::default()
        }
    };
    cli.apply(&mut app_config);

    let client_config = app_config.to_client_config();
    let center = validate_location(client_config.location).unwrap_or((0.0, 0.0));

    let map = ConsoleMap::new(center, app_config.zoom);
    map.show_markers(&app_config.markers);

    let client = match &cli.payload_file {
        Some(path) => {
            info!("Replaying radar payload from {}", path.display());
            Client::spawn(client_config, FileSource::new(path), map)
        }
        None => {
            let source = RainViewerSource::with_url(app_config.api_url.as_str())?;
            Client::spawn(client_config, source, map)
        }
    };

    let status_task = tokio::spawn(report_status(client.subscribe_status()));

    if matches!(client.status(), DisplayStatus::ConfigError(_)) {
        // Nothing was started; give the status line a chance to print.
        join_reporter(status_task).await;
        return Ok(());
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");
    client.shutdown();
    status_task.abort();

    Ok(())
}
