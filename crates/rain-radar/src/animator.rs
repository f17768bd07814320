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

//! Radar animation driver.
//!
//! [`RadarAnimator`] owns the layer cache, the playback scheduler and the
//! presentation adapter. It turns source events and timer expiries into
//! layer operations, keeping exactly one timer outstanding.

use log::{debug, info, warn};
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::adapter::PresentationAdapter;
use crate::cache::LayerCache;
use crate::frame::{ForecastSet, Frame};
use crate::playback::{PlaybackConfig, PlaybackScheduler, TimerDirective, VisibilityCommand};
use crate::source::SourceEvent;
use crate::tiles::TileOptions;

/// User-visible state of the radar display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayStatus {
    /// Location configuration is missing or invalid. Nothing is fetched.
    ConfigError(String),
    /// No forecast has been loaded yet.
    Loading,
    /// At least one forecast has been loaded.
    Ready,
}

/// Owned animation state for one radar display.
pub struct RadarAnimator<A> {
    adapter: A,
    cache: LayerCache,
    scheduler: PlaybackScheduler,
    status_tx: watch::Sender<DisplayStatus>,
}

impl<A> std::fmt::Debug for RadarAnimator<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadarAnimator")
            .field("cache", &self.cache)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl<A: PresentationAdapter> RadarAnimator<A> {
    #[must_use]
    pub fn new(adapter: A, cache: LayerCache, playback: PlaybackConfig) -> Self {
        let (status_tx, _) = watch::channel(DisplayStatus::Loading);
        Self {
            adapter,
            cache,
            scheduler: PlaybackScheduler::new(playback),
            status_tx,
        }
    }

    /// Animator with default tile options.
    #[must_use]
    pub fn with_defaults(adapter: A) -> Self {
        Self::new(
            adapter,
            LayerCache::new(TileOptions::default()),
            PlaybackConfig::default(),
        )
    }

    /// Subscribe to display status changes.
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<DisplayStatus> {
        self.status_tx.subscribe()
    }

    /// Handle a message from the fetch side.
    ///
    /// Returns `None` when the outstanding timer must be left alone.
    pub fn handle_event(&mut self, event: SourceEvent) -> Option<TimerDirective> {
        match event {
            SourceEvent::Data(body) => match ForecastSet::from_json(&body) {
                Ok(forecast) => Some(self.load(&forecast)),
                Err(e) => {
                    warn!("Ignoring radar payload: {}", e);
                    None
                }
            },
            SourceEvent::Error => {
                debug!("Fetch cycle failed, keeping current frames");
                None
            }
        }
    }

    /// Replace the playing sequence with a new forecast set.
    ///
    /// Reconciles the cache, hides whatever was visible and restarts priming
    /// from the first frame.
    pub fn load(&mut self, forecast: &ForecastSet) -> TimerDirective {
        let ordered = self.cache.reconcile(forecast, &mut self.adapter);
        self.cache.hide_all(&mut self.adapter);

        match (forecast.frames().first(), forecast.frames().last()) {
            (Some(first), Some(last)) => info!(
                "Loaded {} radar frames ({} to {})",
                ordered.len(),
                capture_label(first),
                capture_label(last)
            ),
            _ => info!("Forecast contains no radar frames"),
        }

        self.status_tx.send_if_modified(|status| {
            if *status == DisplayStatus::Loading {
                *status = DisplayStatus::Ready;
                true
            } else {
                false
            }
        });

        self.scheduler.load(ordered)
    }

    /// Advance playback because the outstanding timer fired.
    pub fn on_timer(&mut self) -> TimerDirective {
        let step = self.scheduler.fire();
        for command in step.commands {
            self.apply(command);
        }
        step.timer
    }

    fn apply(&mut self, command: VisibilityCommand) {
        let (timestamp, opacity) = match command {
            VisibilityCommand::Show { timestamp, opacity } => {
                // Never expose a second frame while an earlier one refuses to hide.
                if !self.cache.hide_others(timestamp, &mut self.adapter) {
                    warn!("Keeping frame {} hidden, previous frame still visible", timestamp);
                    return;
                }
                (timestamp, opacity)
            }
            VisibilityCommand::Hide { timestamp } => (timestamp, 0.0),
        };

        debug!("Frame {} -> opacity {}", timestamp, opacity);

        if let Err(e) = self.cache.set_visibility(timestamp, opacity, &mut self.adapter) {
            warn!("Failed to change visibility of frame {}: {}", timestamp, e);
        }
    }

    #[must_use]
    pub fn cache(&self) -> &LayerCache {
        &self.cache
    }

    #[must_use]
    pub fn scheduler(&self) -> &PlaybackScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Drive the animation until cancelled.
    ///
    /// Keeps running on the last loaded frames if the event channel closes.
    pub async fn run(mut self, mut events: mpsc::Receiver<SourceEvent>, cancel_token: CancellationToken) {
        let mut deadline: Option<Instant> = None;
        let mut source_open = true;

        loop {
            let armed = deadline;
            let timer = async move {
                match armed {
                    Some(at) => sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                () = cancel_token.cancelled() => {
                    info!("Radar animation stopped");
                    return;
                }
                event = events.recv(), if source_open => match event {
                    Some(event) => {
                        if let Some(directive) = self.handle_event(event) {
                            deadline = next_deadline(directive);
                        }
                    }
                    None => {
                        info!("Frame source closed, continuing with current frames");
                        source_open = false;
                    }
                },
                () = timer => {
                    deadline = next_deadline(self.on_timer());
                }
            }
        }
    }
}

fn capture_label(frame: &Frame) -> String {
    frame.captured_at().map_or_else(
        || frame.timestamp.to_string(),
        |captured| captured.format("%Y-%m-%d %H:%M UTC").to_string(),
    )
}

fn next_deadline(directive: TimerDirective) -> Option<Instant> {
    match directive {
        TimerDirective::Arm(delay) => Some(Instant::now() + delay),
        TimerDirective::Cancel => None,
    }
}
