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

//! Radar tile URL templates.

use crate::frame::Frame;

/// Default tile CDN used when the API payload does not advertise a host.
pub const DEFAULT_TILE_BASE: &str = "https://tilecache.rainviewer.com";

/// Options controlling how per-frame tile URLs are built.
///
/// Produces templates of the form
/// `<base><path>/<size>/{z}/{x}/{y}/<color_scheme>/<smooth>_<snow>.png`,
/// leaving the `{z}/{x}/{y}` placeholders for the map widget to fill in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileOptions {
    /// Tile CDN base URL (no trailing slash).
    pub tile_base: String,
    /// Tile edge length in pixels.
    pub tile_size: u32,
    /// Upstream color scheme index.
    pub color_scheme: u8,
    /// Blur radar data.
    pub smooth: bool,
    /// Render snow in a separate palette.
    pub snow: bool,
}

impl Default for TileOptions {
    fn default() -> Self {
        Self {
            tile_base: DEFAULT_TILE_BASE.to_string(),
            tile_size: 256,
            color_scheme: 2,
            smooth: true,
            snow: true,
        }
    }
}

impl TileOptions {
    /// Build the tile URL template for a frame.
    ///
    /// `host` overrides the configured base when the API supplied one.
    #[must_use]
    pub fn url_template(&self, frame: &Frame, host: Option<&str>) -> String {
        let base = host.unwrap_or(&self.tile_base).trim_end_matches('/');
        format!(
            "{}{}/{}/{{z}}/{{x}}/{{y}}/{}/{}_{}.png",
            base,
            frame.path,
            self.tile_size,
            self.color_scheme,
            u8::from(self.smooth),
            u8::from(self.snow)
        )
    }
}
