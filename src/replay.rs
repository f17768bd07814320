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

//! Offline frame source reading a saved weather-maps payload.

use std::path::PathBuf;

use log::debug;
use rain_radar::{FetchError, FrameSource};

/// Reads the payload from disk on every fetch cycle, so edits to the file
/// show up on the next refresh.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FrameSource for FileSource {
    async fn fetch(&self) -> Result<String, FetchError> {
        debug!("Reading {}", self.path.display());
        Ok(tokio::fs::read_to_string(&self.path).await?)
    }
}
