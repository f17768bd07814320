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

//! Frame source and the periodic fetch loop.
//!
//! The fetch loop runs in its own task. Each cycle requests the current frame
//! list, forwards the outcome as a [`SourceEvent`] and only then waits for the
//! update interval, so a slow request delays the next cycle instead of
//! overlapping it. Failures never stop the loop.

mod rainviewer;

pub use rainviewer::{RainViewerSource, DEFAULT_API_URL};

use std::future::Future;
use std::time::Duration;

use log::{info, warn};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

/// Default time between fetch cycles.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(10 * 60);
/// Default upper bound for a single request.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while fetching the frame list.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status code {0}")]
    Status(u16),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to read payload: {0}")]
    Io(#[from] std::io::Error),
}

/// Messages from the fetch side to the display side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    /// Raw weather-maps payload from a successful fetch.
    Data(String),
    /// A fetch cycle failed. Carries no payload.
    Error,
}

/// Anything that can produce a weather-maps payload.
pub trait FrameSource {
    /// Request the current frame list, returning the raw JSON body.
    fn fetch(&self) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Timing of the fetch loop.
#[derive(Debug, Clone)]
pub struct FetchLoopConfig {
    /// Delay between the end of one fetch and the start of the next.
    pub update_interval: Duration,
    /// Upper bound for a single request.
    pub fetch_timeout: Duration,
}

impl Default for FetchLoopConfig {
    fn default() -> Self {
        Self {
            update_interval: DEFAULT_UPDATE_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Spawn the fetch loop on the current runtime.
///
/// The loop fetches immediately, then once per update interval, until the
/// token is cancelled or the receiving side is dropped.
pub fn spawn_fetch_loop<S>(
    source: S,
    config: FetchLoopConfig,
    event_tx: mpsc::Sender<SourceEvent>,
    cancel_token: CancellationToken,
) -> JoinHandle<()>
where
    S: FrameSource + Send + Sync + 'static,
{
    tokio::spawn(async move {
        fetch_loop(source, config, event_tx, cancel_token).await;
    })
}

async fn fetch_loop<S: FrameSource>(
    source: S,
    config: FetchLoopConfig,
    event_tx: mpsc::Sender<SourceEvent>,
    cancel_token: CancellationToken,
) {
    loop {
        if cancel_token.is_cancelled() {
            info!("Fetch loop cancelled");
            return;
        }

        info!("Fetching radar frames...");

        let outcome = tokio::select! {
            result = timeout(config.fetch_timeout, source.fetch()) => result,
            () = cancel_token.cancelled() => {
                info!("Fetch loop cancelled during request");
                return;
            }
        };

        let event = match outcome {
            Ok(Ok(body)) => SourceEvent::Data(body),
            Ok(Err(e)) => {
                warn!("Error fetching radar frames: {}", e);
                SourceEvent::Error
            }
            Err(_elapsed) => {
                warn!(
                    "Error fetching radar frames: {}",
                    FetchError::Timeout(config.fetch_timeout)
                );
                SourceEvent::Error
            }
        };

        if event_tx.send(event).await.is_err() {
            info!("Frame receiver dropped, stopping fetch loop");
            return;
        }

        tokio::select! {
            () = sleep(config.update_interval) => {}
            () = cancel_token.cancelled() => {
                info!("Fetch loop cancelled while waiting for next cycle");
                return;
            }
        }
    }
}
