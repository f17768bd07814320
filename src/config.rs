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

//! Application configuration management.
//!
//! Persistent settings are stored as TOML through `confy`. Every field has a
//! serde default so partial or older files keep loading.

use std::path::Path;
use std::time::Duration;

use rain_radar::source::DEFAULT_API_URL;
use rain_radar::tiles::DEFAULT_TILE_BASE;
use rain_radar::{ClientConfig, FetchLoopConfig, PlaybackConfig, TileOptions};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "rain-forecast";
const CONFIG_NAME: &str = "config";

/// Marker colours the map widget ships icons for.
pub const MARKER_COLORS: [&str; 8] = [
    "black", "red", "green", "blue", "orange", "violet", "yellow", "gold",
];

/// Colour used for markers with an unknown colour.
pub const DEFAULT_MARKER_COLOR: &str = "red";

/// A pin drawn on the map.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MarkerConfig {
    pub latitude: f64,
    pub longitude: f64,

    /// One of [`MARKER_COLORS`]
    #[serde(default = "default_marker_color")]
    pub color: String,
}

impl MarkerConfig {
    pub fn new(latitude: f64, longitude: f64, color: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            color: color.into(),
        }
    }

    /// The configured colour, or red if it is not a known marker colour.
    pub fn resolved_color(&self) -> &str {
        let color = self.color.trim();
        MARKER_COLORS
            .iter()
            .find(|known| known.eq_ignore_ascii_case(color))
            .copied()
            .unwrap_or(DEFAULT_MARKER_COLOR)
    }
}

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Time between radar API requests
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,

    /// Time each frame stays on screen
    #[serde(default = "default_animation_speed_ms")]
    pub animation_speed_ms: u64,

    /// Layer fade-in time; playback starts after twice this
    #[serde(default = "default_fade_in_ms")]
    pub fade_in_ms: u64,

    /// Extra hold on the last frame before the loop restarts
    #[serde(default = "default_boundary_pause_ms")]
    pub boundary_pause_ms: u64,

    /// Opacity of the frame on screen (0.0 - 1.0)
    #[serde(default = "default_frame_opacity")]
    pub frame_opacity: f32,

    /// Map center latitude
    #[serde(default = "default_latitude")]
    pub latitude: Option<f64>,

    /// Map center longitude
    #[serde(default = "default_longitude")]
    pub longitude: Option<f64>,

    /// Map zoom level
    #[serde(default = "default_zoom")]
    pub zoom: u8,

    /// Pins shown on the map
    #[serde(default = "default_markers")]
    pub markers: Vec<MarkerConfig>,

    /// Weather-maps endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Tile CDN used when the API does not advertise a host
    #[serde(default = "default_tile_base")]
    pub tile_base: String,

    /// Tile edge length in pixels
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,

    /// Radar color scheme index
    #[serde(default = "default_color_scheme")]
    pub color_scheme: u8,

    /// Blur radar data
    #[serde(default = "default_true")]
    pub smooth: bool,

    /// Render snow in its own palette
    #[serde(default = "default_true")]
    pub snow: bool,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_update_interval_ms() -> u64 {
    600_000
}

fn default_animation_speed_ms() -> u64 {
    600
}

fn default_fade_in_ms() -> u64 {
    2_000
}

fn default_boundary_pause_ms() -> u64 {
    2_000
}

fn default_frame_opacity() -> f32 {
    rain_radar::playback::DEFAULT_VISIBLE_OPACITY
}

fn default_latitude() -> Option<f64> {
    Some(49.40)
}

fn default_longitude() -> Option<f64> {
    Some(8.69)
}

fn default_zoom() -> u8 {
    8
}

fn default_markers() -> Vec<MarkerConfig> {
    vec![MarkerConfig::new(49.40, 8.69, "yellow")]
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_tile_base() -> String {
    DEFAULT_TILE_BASE.to_string()
}

fn default_tile_size() -> u32 {
    256
}

fn default_color_scheme() -> u8 {
    2
}

fn default_true() -> bool {
    true
}

fn default_marker_color() -> String {
    DEFAULT_MARKER_COLOR.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            update_interval_ms: default_update_interval_ms(),
            animation_speed_ms: default_animation_speed_ms(),
            fade_in_ms: default_fade_in_ms(),
            boundary_pause_ms: default_boundary_pause_ms(),
            frame_opacity: default_frame_opacity(),
            latitude: default_latitude(),
            longitude: default_longitude(),
            zoom: default_zoom(),
            markers: default_markers(),
            api_url: default_api_url(),
            tile_base: default_tile_base(),
            tile_size: default_tile_size(),
            color_scheme: default_color_scheme(),
            smooth: true,
            snow: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, writing defaults on first run
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, CONFIG_NAME)
    }

    /// Load configuration from an explicit file
    pub fn load_path(path: impl AsRef<Path>) -> Result<Self, confy::ConfyError> {
        confy::load_path(path)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Map center, if both coordinates are set
    pub fn location(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }

    /// Build the library configuration.
    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig {
            fetch: FetchLoopConfig {
                update_interval: Duration::from_millis(self.update_interval_ms),
                ..Default::default()
            },
            playback: PlaybackConfig {
                animation_speed: Duration::from_millis(self.animation_speed_ms),
                fade_in: Duration::from_millis(self.fade_in_ms),
                boundary_pause: Duration::from_millis(self.boundary_pause_ms),
                visible_opacity: self.frame_opacity.clamp(0.0, 1.0),
            },
            tiles: TileOptions {
                tile_base: self.tile_base.clone(),
                tile_size: self.tile_size,
                color_scheme: self.color_scheme,
                smooth: self.smooth,
                snow: self.snow,
            },
            location: self.location(),
            ..Default::default()
        }
    }
}
