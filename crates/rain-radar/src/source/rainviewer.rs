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

//! RainViewer public weather-maps API.

use log::debug;
use reqwest::StatusCode;

use super::{FetchError, FrameSource};

/// Public endpoint listing the available radar frames.
pub const DEFAULT_API_URL: &str = "https://api.rainviewer.com/public/weather-maps.json";

const USER_AGENT: &str = concat!("rain-radar/", env!("CARGO_PKG_VERSION"));

/// Frame source backed by the RainViewer HTTP API.
#[derive(Debug, Clone)]
pub struct RainViewerSource {
    client: reqwest::Client,
    url: String,
}

impl RainViewerSource {
    /// Create a source for the public endpoint.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_url(DEFAULT_API_URL)
    }

    /// Create a source for a custom endpoint (mirrors, proxies).
    pub fn with_url(url: impl Into<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl FrameSource for RainViewerSource {
    async fn fetch(&self) -> Result<String, FetchError> {
        debug!("GET {}", self.url);

        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}
