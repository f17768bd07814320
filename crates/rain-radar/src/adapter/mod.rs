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

//! Presentation layer abstraction.
//!
//! The core never touches a map widget directly. Everything it needs from the
//! display side goes through [`PresentationAdapter`], a narrow capability
//! trait with five operations. [`MemoryAdapter`] is an in-memory
//! implementation that records every call.

mod memory;

pub use memory::{AdapterCall, MemoryAdapter};

use thiserror::Error;

/// Opaque handle to a tile layer owned by the presentation side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle(u64);

impl ResourceHandle {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// Errors reported by a presentation adapter.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("unknown resource handle: {0}")]
    UnknownHandle(ResourceHandle),

    #[error("no layer exists for frame {0}")]
    UnknownFrame(i64),

    #[error("presentation rejected request: {0}")]
    Rejected(String),
}

/// Capability interface to the map widget.
///
/// Implementations own the actual tile layers. Opacity values are in `[0, 1]`.
pub trait PresentationAdapter {
    /// Create a tile layer from a URL template. The layer is not attached yet.
    fn create_resource(
        &mut self,
        url_template: &str,
        tile_size: u32,
        initial_opacity: f32,
        z_index: i64,
    ) -> Result<ResourceHandle, ResourceError>;

    /// Change the opacity of a layer.
    fn set_visibility(&mut self, handle: ResourceHandle, value: f32) -> Result<(), ResourceError>;

    /// Add a layer to the map.
    fn attach(&mut self, handle: ResourceHandle) -> Result<(), ResourceError>;

    /// Remove a layer from the map and release it.
    fn detach(&mut self, handle: ResourceHandle) -> Result<(), ResourceError>;

    /// Whether the layer is currently on the map.
    fn is_attached(&self, handle: ResourceHandle) -> bool;
}

impl<T: PresentationAdapter + ?Sized> PresentationAdapter for Box<T> {
    fn create_resource(
        &mut self,
        url_template: &str,
        tile_size: u32,
        initial_opacity: f32,
        z_index: i64,
    ) -> Result<ResourceHandle, ResourceError> {
        (**self).create_resource(url_template, tile_size, initial_opacity, z_index)
    }

    fn set_visibility(&mut self, handle: ResourceHandle, value: f32) -> Result<(), ResourceError> {
        (**self).set_visibility(handle, value)
    }

    fn attach(&mut self, handle: ResourceHandle) -> Result<(), ResourceError> {
        (**self).attach(handle)
    }

    fn detach(&mut self, handle: ResourceHandle) -> Result<(), ResourceError> {
        (**self).detach(handle)
    }

    fn is_attached(&self, handle: ResourceHandle) -> bool {
        (**self).is_attached(handle)
    }
}
