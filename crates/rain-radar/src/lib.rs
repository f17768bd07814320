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

//! Weather radar animation for slippy maps.
//!
//! This library polls a public radar API for timestamped snapshots and plays
//! them back as a looping sequence of tile layers. It is split into layers
//! that can be used on their own:
//!
//! - **Frame layer**: payload parsing into an ordered [`ForecastSet`]
//! - **Source layer**: the [`FrameSource`] trait, the RainViewer HTTP source
//!   and the self-rearming fetch loop
//! - **Cache layer**: one tile layer per frame timestamp, created lazily and
//!   released when a refresh drops the timestamp
//! - **Playback layer**: a clock-free scheduler stepping through the frames
//! - **Presentation layer**: the [`PresentationAdapter`] trait, the only
//!   place that talks to a map widget
//!
//! # Quick Start
//!
//! ```no_run
//! use rain_radar::{Client, ClientConfig, MemoryAdapter, RainViewerSource};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = MemoryAdapter::new();
//!     let client = Client::spawn(
//!         ClientConfig {
//!             location: Some((49.40, 8.69)),
//!             ..Default::default()
//!         },
//!         RainViewerSource::new()?,
//!         adapter.clone(),
//!     );
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(10)).await;
//!     println!("{:?}, visible: {:?}", client.status(), adapter.visible_z_indices());
//!     client.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! # Driving playback by hand
//!
//! ```
//! use rain_radar::{ForecastSet, Frame, MemoryAdapter, RadarAnimator};
//!
//! let adapter = MemoryAdapter::new();
//! let mut animator = RadarAnimator::with_defaults(adapter.clone());
//! animator.load(&ForecastSet::new(vec![Frame::new(100, "/a"), Frame::new(200, "/b")]));
//!
//! animator.on_timer(); // priming done, first frame shown
//! assert_eq!(adapter.visible_z_indices(), vec![100]);
//! animator.on_timer();
//! assert_eq!(adapter.visible_z_indices(), vec![200]);
//! ```

pub mod adapter;
pub mod animator;
pub mod cache;
pub mod frame;
pub mod playback;
pub mod source;
pub mod tiles;

use log::{error, info};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

pub use adapter::{AdapterCall, MemoryAdapter, PresentationAdapter, ResourceError, ResourceHandle};
pub use animator::{DisplayStatus, RadarAnimator};
pub use cache::{LayerCache, LayerEntry};
pub use frame::{ForecastSet, Frame, ParseError};
pub use playback::{PlaybackConfig, PlaybackPhase, PlaybackScheduler, TimerDirective};
pub use source::{FetchError, FetchLoopConfig, FrameSource, RainViewerSource, SourceEvent};
pub use tiles::TileOptions;

/// Errors in the startup configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("no latitude and/or longitude set")]
    MissingLocation,

    #[error("invalid location: latitude {latitude}, longitude {longitude}")]
    InvalidLocation { latitude: f64, longitude: f64 },
}

/// Check that a map location is present and within WGS84 bounds.
pub fn validate_location(location: Option<(f64, f64)>) -> Result<(f64, f64), ConfigError> {
    let (latitude, longitude) = location.ok_or(ConfigError::MissingLocation)?;

    let valid = latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude);

    if valid {
        Ok((latitude, longitude))
    } else {
        Err(ConfigError::InvalidLocation {
            latitude,
            longitude,
        })
    }
}

/// Configuration for the full-stack client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Fetch loop timing.
    pub fetch: FetchLoopConfig,
    /// Playback timing.
    pub playback: PlaybackConfig,
    /// Tile URL options.
    pub tiles: TileOptions,
    /// Opacity layers are created with before being hidden.
    pub initial_opacity: f32,
    /// Map center (latitude, longitude). Required.
    pub location: Option<(f64, f64)>,
    /// Channel buffer between the fetch loop and the animator.
    pub event_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            fetch: FetchLoopConfig::default(),
            playback: PlaybackConfig::default(),
            tiles: TileOptions::default(),
            initial_opacity: cache::DEFAULT_INITIAL_OPACITY,
            location: None,
            event_buffer: 4,
        }
    }
}

/// Full-stack radar client that wires all layers together.
///
/// Spawns the fetch loop and the animator as two tasks joined by a channel.
/// Both stop when the client is shut down or dropped.
pub struct Client {
    status_rx: watch::Receiver<DisplayStatus>,
    cancel_token: CancellationToken,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("status", &*self.status_rx.borrow())
            .field("cancel_token", &self.cancel_token)
            .finish()
    }
}

impl Client {
    /// Validate the configuration and start fetching and animating.
    ///
    /// With a missing or invalid location the client reports
    /// [`DisplayStatus::ConfigError`] and starts nothing.
    #[must_use]
    pub fn spawn<S, A>(config: ClientConfig, source: S, adapter: A) -> Self
    where
        S: FrameSource + Send + Sync + 'static,
        A: PresentationAdapter + Send + 'static,
    {
        let cancel_token = CancellationToken::new();

        let (latitude, longitude) = match validate_location(config.location) {
            Ok(location) => location,
            Err(e) => {
                error!("Radar display disabled: {}", e);
                let (_, status_rx) = watch::channel(DisplayStatus::ConfigError(e.to_string()));
                return Self {
                    status_rx,
                    cancel_token,
                };
            }
        };

        info!("Starting radar display at {:.2}, {:.2}", latitude, longitude);

        let cache = LayerCache::with_initial_opacity(config.tiles, config.initial_opacity);
        let animator = RadarAnimator::new(adapter, cache, config.playback);
        let status_rx = animator.subscribe_status();

        let (event_tx, event_rx) = mpsc::channel(config.event_buffer.max(1));
        source::spawn_fetch_loop(source, config.fetch, event_tx, cancel_token.clone());
        tokio::spawn(animator.run(event_rx, cancel_token.clone()));

        Self {
            status_rx,
            cancel_token,
        }
    }

    /// Current display status.
    #[must_use]
    pub fn status(&self) -> DisplayStatus {
        self.status_rx.borrow().clone()
    }

    /// Subscribe to display status changes.
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<DisplayStatus> {
        self.status_rx.clone()
    }

    /// Stop fetching and animating.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
