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

//! In-memory presentation adapter.
//!
//! Keeps layer state in a shared map and records every call, so a clone can
//! be handed to the animator while the original is inspected.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{PresentationAdapter, ResourceError, ResourceHandle};

/// A single call made against a [`MemoryAdapter`].
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterCall {
    Create {
        handle: ResourceHandle,
        url_template: String,
        z_index: i64,
    },
    SetVisibility {
        handle: ResourceHandle,
        value: f32,
    },
    Attach(ResourceHandle),
    Detach(ResourceHandle),
}

#[derive(Debug, Clone)]
struct MemoryLayer {
    url_template: String,
    z_index: i64,
    opacity: f32,
    attached: bool,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    layers: BTreeMap<ResourceHandle, MemoryLayer>,
    calls: Vec<AdapterCall>,
    rejected_templates: Vec<String>,
    refused_hides: Vec<i64>,
}

/// Presentation adapter that keeps layers in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `create_resource` fail for any template containing `fragment`.
    pub fn reject_templates_containing(&self, fragment: impl Into<String>) {
        self.lock().rejected_templates.push(fragment.into());
    }

    /// Stop rejecting templates.
    pub fn accept_all_templates(&self) {
        self.lock().rejected_templates.clear();
    }

    /// Make hiding the layer with this z-index fail with `Rejected`.
    pub fn refuse_hiding(&self, z_index: i64) {
        self.lock().refused_hides.push(z_index);
    }

    /// Let every layer be hidden again.
    pub fn allow_hiding(&self) {
        self.lock().refused_hides.clear();
    }

    /// Take a layer off the map while keeping its resources alive.
    pub fn unmount(&self, handle: ResourceHandle) {
        if let Some(layer) = self.lock().layers.get_mut(&handle) {
            layer.attached = false;
        }
    }

    /// Drop a layer without going through `detach`, as if the map removed it.
    pub fn forget(&self, handle: ResourceHandle) {
        self.lock().layers.remove(&handle);
    }

    /// All calls recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<AdapterCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Number of recorded `create_resource` calls that succeeded.
    #[must_use]
    pub fn created_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, AdapterCall::Create { .. }))
            .count()
    }

    /// Number of recorded `detach` calls.
    #[must_use]
    pub fn detached_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, AdapterCall::Detach(_)))
            .count()
    }

    /// Number of live layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.lock().layers.len()
    }

    /// Current opacity of a live layer.
    #[must_use]
    pub fn opacity(&self, handle: ResourceHandle) -> Option<f32> {
        self.lock().layers.get(&handle).map(|l| l.opacity)
    }

    /// Z-indexes of attached layers with non-zero opacity, ascending.
    #[must_use]
    pub fn visible_z_indices(&self) -> Vec<i64> {
        let mut visible: Vec<i64> = self
            .lock()
            .layers
            .values()
            .filter(|l| l.attached && l.opacity > 0.0)
            .map(|l| l.z_index)
            .collect();
        visible.sort_unstable();
        visible
    }

    /// URL templates of live layers, ordered by z-index.
    #[must_use]
    pub fn templates(&self) -> Vec<String> {
        let mut layers: Vec<MemoryLayer> = self.lock().layers.values().cloned().collect();
        layers.sort_by_key(|l| l.z_index);
        layers.into_iter().map(|l| l.url_template).collect()
    }
}

impl PresentationAdapter for MemoryAdapter {
    fn create_resource(
        &mut self,
        url_template: &str,
        _tile_size: u32,
        initial_opacity: f32,
        z_index: i64,
    ) -> Result<ResourceHandle, ResourceError> {
        let mut inner = self.lock();

        if inner
            .rejected_templates
            .iter()
            .any(|fragment| url_template.contains(fragment.as_str()))
        {
            return Err(ResourceError::Rejected(url_template.to_string()));
        }

        inner.next_id += 1;
        let handle = ResourceHandle::new(inner.next_id);
        inner.layers.insert(
            handle,
            MemoryLayer {
                url_template: url_template.to_string(),
                z_index,
                opacity: initial_opacity,
                attached: false,
            },
        );
        inner.calls.push(AdapterCall::Create {
            handle,
            url_template: url_template.to_string(),
            z_index,
        });

        Ok(handle)
    }

    fn set_visibility(&mut self, handle: ResourceHandle, value: f32) -> Result<(), ResourceError> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let layer = inner
            .layers
            .get_mut(&handle)
            .ok_or(ResourceError::UnknownHandle(handle))?;

        if value <= 0.0 && inner.refused_hides.contains(&layer.z_index) {
            return Err(ResourceError::Rejected(format!("cannot hide {handle}")));
        }

        layer.opacity = value.clamp(0.0, 1.0);
        inner.calls.push(AdapterCall::SetVisibility { handle, value });
        Ok(())
    }

    fn attach(&mut self, handle: ResourceHandle) -> Result<(), ResourceError> {
        let mut inner = self.lock();
        let layer = inner
            .layers
            .get_mut(&handle)
            .ok_or(ResourceError::UnknownHandle(handle))?;
        layer.attached = true;
        inner.calls.push(AdapterCall::Attach(handle));
        Ok(())
    }

    fn detach(&mut self, handle: ResourceHandle) -> Result<(), ResourceError> {
        let mut inner = self.lock();
        inner
            .layers
            .remove(&handle)
            .ok_or(ResourceError::UnknownHandle(handle))?;
        inner.calls.push(AdapterCall::Detach(handle));
        Ok(())
    }

    fn is_attached(&self, handle: ResourceHandle) -> bool {
        self.lock().layers.get(&handle).is_some_and(|l| l.attached)
    }
}
