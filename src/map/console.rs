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

//! Headless map that tracks radar layers and logs what would be on screen.

use std::collections::HashMap;

use log::{debug, info};
use rain_radar::{PresentationAdapter, ResourceError, ResourceHandle};

use crate::config::MarkerConfig;

/// Attribution line required by the radar tile provider.
pub const ATTRIBUTION: &str = "Weather data © RainViewer";

/// A tile layer as the map sees it
#[derive(Debug, Clone)]
struct TileLayer {
    url_template: String,
    tile_size: u32,
    z_index: i64,
    opacity: f32,
    attached: bool,
}

/// Presentation adapter without a window.
///
/// Layers live in a handle map; the topmost attached layer with non-zero
/// opacity is reported whenever it changes.
pub struct ConsoleMap {
    center: (f64, f64),
    zoom: u8,
    layers: HashMap<ResourceHandle, TileLayer>,
    next_id: u64,
    on_screen: Option<i64>,
}

impl ConsoleMap {
    pub fn new(center: (f64, f64), zoom: u8) -> Self {
        info!(
            "Map centered at {:.2}, {:.2} (zoom {}) - {}",
            center.0, center.1, zoom, ATTRIBUTION
        );
        Self {
            center,
            zoom,
            layers: HashMap::new(),
            next_id: 1,
            on_screen: None,
        }
    }

    /// Report configured markers. Called once at startup.
    pub fn show_markers(&self, markers: &[MarkerConfig]) {
        for marker in markers {
            if marker.resolved_color() != marker.color.trim() {
                info!(
                    "Marker color '{}' not available, using {}",
                    marker.color,
                    marker.resolved_color()
                );
            }
            info!(
                "Marker at {:.4}, {:.4} ({})",
                marker.latitude,
                marker.longitude,
                marker.resolved_color()
            );
        }
    }

    /// Number of layers currently on the map
    pub fn attached_count(&self) -> usize {
        self.layers.values().filter(|layer| layer.attached).count()
    }

    /// Z-index of the topmost visible layer
    pub fn visible_layer(&self) -> Option<i64> {
        self.layers
            .values()
            .filter(|layer| layer.attached && layer.opacity > 0.0)
            .map(|layer| layer.z_index)
            .max()
    }

    fn layer_mut(&mut self, handle: ResourceHandle) -> Result<&mut TileLayer, ResourceError> {
        self.layers
            .get_mut(&handle)
            .ok_or(ResourceError::UnknownHandle(handle))
    }

    fn refresh_screen(&mut self) {
        let visible = self.visible_layer();
        if visible == self.on_screen {
            return;
        }
        self.on_screen = visible;

        match visible {
            Some(timestamp) => debug!("Showing radar frame {}", timestamp),
            None => debug!("No radar frame on screen"),
        }
    }
}

impl std::fmt::Debug for ConsoleMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleMap")
            .field("center", &self.center)
            .field("zoom", &self.zoom)
            .field("layers", &self.layers.len())
            .field("on_screen", &self.on_screen)
            .finish()
    }
}

impl PresentationAdapter for ConsoleMap {
    fn create_resource(
        &mut self,
        url_template: &str,
        tile_size: u32,
        initial_opacity: f32,
        z_index: i64,
    ) -> Result<ResourceHandle, ResourceError> {
        if !url_template.contains("{z}") || !url_template.contains("{x}") || !url_template.contains("{y}") {
            return Err(ResourceError::Rejected(format!(
                "template without tile placeholders: {}",
                url_template
            )));
        }

        let handle = ResourceHandle::new(self.next_id);
        self.next_id += 1;

        debug!("{} <- {} ({}px)", handle, url_template, tile_size);
        self.layers.insert(
            handle,
            TileLayer {
                url_template: url_template.to_string(),
                tile_size,
                z_index,
                opacity: initial_opacity.clamp(0.0, 1.0),
                attached: false,
            },
        );
        Ok(handle)
    }

    fn set_visibility(&mut self, handle: ResourceHandle, value: f32) -> Result<(), ResourceError> {
        self.layer_mut(handle)?.opacity = value.clamp(0.0, 1.0);
        self.refresh_screen();
        Ok(())
    }

    fn attach(&mut self, handle: ResourceHandle) -> Result<(), ResourceError> {
        self.layer_mut(handle)?.attached = true;
        self.refresh_screen();
        Ok(())
    }

    fn detach(&mut self, handle: ResourceHandle) -> Result<(), ResourceError> {
        let layer = self
            .layers
            .remove(&handle)
            .ok_or(ResourceError::UnknownHandle(handle))?;
        debug!(
            "{} released ({}, {}px), {} layers on map",
            handle,
            layer.url_template,
            layer.tile_size,
            self.attached_count()
        );
        self.refresh_screen();
        Ok(())
    }

    fn is_attached(&self, handle: ResourceHandle) -> bool {
        self.layers.get(&handle).is_some_and(|layer| layer.attached)
    }
}
