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

//! Frame layer cache.
//!
//! Maps each frame timestamp to exactly one tile layer on the presentation
//! side. Layers are created hidden on first reference and released once a
//! refresh no longer contains their timestamp.

use std::collections::{BTreeMap, HashSet};

use log::{debug, info, warn};

use crate::adapter::{PresentationAdapter, ResourceError, ResourceHandle};
use crate::frame::{ForecastSet, Frame};
use crate::tiles::TileOptions;

/// Opacity new layers are created with. A layer created at exactly zero
/// opacity sometimes fails to initialise its tiles on first attach.
pub const DEFAULT_INITIAL_OPACITY: f32 = 0.01;

/// Cache record binding a timestamp to its tile layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerEntry {
    /// Frame timestamp (unix seconds).
    pub timestamp: i64,
    /// Layer handle on the presentation side.
    pub handle: ResourceHandle,
    /// Last opacity successfully applied.
    pub visibility: f32,
}

/// Owns one [`LayerEntry`] per frame timestamp in the current forecast set.
#[derive(Debug)]
pub struct LayerCache {
    entries: BTreeMap<i64, LayerEntry>,
    tiles: TileOptions,
    initial_opacity: f32,
}

impl Default for LayerCache {
    fn default() -> Self {
        Self::new(TileOptions::default())
    }
}

impl LayerCache {
    #[must_use]
    pub fn new(tiles: TileOptions) -> Self {
        Self::with_initial_opacity(tiles, DEFAULT_INITIAL_OPACITY)
    }

    #[must_use]
    pub fn with_initial_opacity(tiles: TileOptions, initial_opacity: f32) -> Self {
        Self {
            entries: BTreeMap::new(),
            tiles,
            initial_opacity,
        }
    }

    /// Bring the cache in line with a new forecast set.
    ///
    /// Releases layers for timestamps missing from `forecast`, creates hidden
    /// layers for new timestamps and leaves matching entries untouched.
    /// Returns the timestamps that have a layer, in forecast order. Frames
    /// whose layer could not be created are left out and retried on the
    /// next call.
    pub fn reconcile<A>(&mut self, forecast: &ForecastSet, adapter: &mut A) -> Vec<i64>
    where
        A: PresentationAdapter + ?Sized,
    {
        let wanted: HashSet<i64> = forecast.frames().iter().map(|f| f.timestamp).collect();

        let stale: Vec<i64> = self
            .entries
            .keys()
            .filter(|ts| !wanted.contains(ts))
            .copied()
            .collect();
        for timestamp in &stale {
            if let Some(entry) = self.entries.remove(timestamp) {
                Self::release(&entry, adapter);
            }
        }

        let mut ordered = Vec::with_capacity(forecast.len());
        let mut created = 0;

        for frame in forecast.frames() {
            if self.entries.contains_key(&frame.timestamp) {
                ordered.push(frame.timestamp);
                continue;
            }

            match self.materialize(frame, forecast.host(), adapter) {
                Ok(entry) => {
                    self.entries.insert(frame.timestamp, entry);
                    ordered.push(frame.timestamp);
                    created += 1;
                }
                Err(e) => {
                    warn!("Failed to create layer for frame {}: {}", frame.timestamp, e);
                }
            }
        }

        if created > 0 || !stale.is_empty() {
            info!(
                "Layer cache reconciled: {} created, {} released, {} cached",
                created,
                stale.len(),
                self.entries.len()
            );
        }

        ordered
    }

    fn materialize<A>(
        &self,
        frame: &Frame,
        host: Option<&str>,
        adapter: &mut A,
    ) -> Result<LayerEntry, ResourceError>
    where
        A: PresentationAdapter + ?Sized,
    {
        let url_template = self.tiles.url_template(frame, host);
        let handle = adapter.create_resource(
            &url_template,
            self.tiles.tile_size,
            self.initial_opacity,
            frame.timestamp,
        )?;

        let prepared = adapter.set_visibility(handle, 0.0).and_then(|()| {
            if adapter.is_attached(handle) {
                Ok(())
            } else {
                adapter.attach(handle)
            }
        });

        if let Err(e) = prepared {
            if let Err(detach_err) = adapter.detach(handle) {
                debug!("Discarding half-created {} failed: {}", handle, detach_err);
            }
            return Err(e);
        }

        debug!("Created {} for frame {} ({})", handle, frame.timestamp, url_template);

        Ok(LayerEntry {
            timestamp: frame.timestamp,
            handle,
            visibility: 0.0,
        })
    }

    fn release<A>(entry: &LayerEntry, adapter: &mut A)
    where
        A: PresentationAdapter + ?Sized,
    {
        match adapter.detach(entry.handle) {
            Ok(()) => {}
            Err(ResourceError::UnknownHandle(handle)) => {
                debug!("{} for frame {} was already released", handle, entry.timestamp);
            }
            Err(e) => warn!("Failed to release layer for frame {}: {}", entry.timestamp, e),
        }
    }

    /// Apply an opacity to the layer of a timestamp.
    ///
    /// If the presentation side no longer knows the layer, the entry is
    /// dropped so the next reconcile creates it again.
    pub fn set_visibility<A>(
        &mut self,
        timestamp: i64,
        value: f32,
        adapter: &mut A,
    ) -> Result<(), ResourceError>
    where
        A: PresentationAdapter + ?Sized,
    {
        let entry = self
            .entries
            .get_mut(&timestamp)
            .ok_or(ResourceError::UnknownFrame(timestamp))?;

        match adapter.set_visibility(entry.handle, value) {
            Ok(()) => {
                entry.visibility = value;
                Ok(())
            }
            Err(e @ ResourceError::UnknownHandle(_)) => {
                self.entries.remove(&timestamp);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Hide every layer that is currently visible.
    ///
    /// Returns `false` if some layer could not be hidden; it stays reported
    /// by [`visible`](Self::visible) so a later call can retry it.
    pub fn hide_all<A>(&mut self, adapter: &mut A) -> bool
    where
        A: PresentationAdapter + ?Sized,
    {
        self.hide_except(None, adapter)
    }

    /// Hide every visible layer other than the one for `keep`.
    ///
    /// Returns `false` if some layer could not be hidden.
    pub fn hide_others<A>(&mut self, keep: i64, adapter: &mut A) -> bool
    where
        A: PresentationAdapter + ?Sized,
    {
        self.hide_except(Some(keep), adapter)
    }

    fn hide_except<A>(&mut self, keep: Option<i64>, adapter: &mut A) -> bool
    where
        A: PresentationAdapter + ?Sized,
    {
        let mut all_hidden = true;

        for timestamp in self.visible() {
            if Some(timestamp) == keep {
                continue;
            }
            match self.set_visibility(timestamp, 0.0, adapter) {
                // A layer gone from the map is not showing either.
                Ok(()) | Err(ResourceError::UnknownHandle(_)) => {}
                Err(e) => {
                    warn!("Failed to hide frame {}: {}", timestamp, e);
                    all_hidden = false;
                }
            }
        }

        all_hidden
    }

    /// Timestamps whose layer has a non-zero opacity.
    #[must_use]
    pub fn visible(&self) -> Vec<i64> {
        self.entries
            .values()
            .filter(|e| e.visibility > 0.0)
            .map(|e| e.timestamp)
            .collect()
    }

    #[must_use]
    pub fn get(&self, timestamp: i64) -> Option<&LayerEntry> {
        self.entries.get(&timestamp)
    }

    #[must_use]
    pub fn contains(&self, timestamp: i64) -> bool {
        self.entries.contains_key(&timestamp)
    }

    /// Cached timestamps, ascending.
    #[must_use]
    pub fn timestamps(&self) -> Vec<i64> {
        self.entries.keys().copied().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
