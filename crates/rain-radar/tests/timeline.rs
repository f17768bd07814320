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

//! End-to-end playback timelines on tokio's paused clock.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rain_radar::{
    AdapterCall, Client, ClientConfig, DisplayStatus, FetchError, FrameSource, MemoryAdapter,
};
use tokio::time::{sleep_until, Instant};

const LOCATION: Option<(f64, f64)> = Some((49.40, 8.69));
const UPDATE_INTERVAL: Duration = Duration::from_secs(600);

/// Serves queued responses in order; 503 once the queue is empty.
#[derive(Clone, Default)]
struct QueuedSource {
    responses: Arc<Mutex<VecDeque<Result<String, u16>>>>,
    calls: Arc<Mutex<Vec<Instant>>>,
}

impl QueuedSource {
    fn new(responses: Vec<Result<String, u16>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            calls: Arc::default(),
        }
    }

    fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

impl FrameSource for QueuedSource {
    async fn fetch(&self) -> Result<String, FetchError> {
        self.calls.lock().unwrap().push(Instant::now());
        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or(Err(503)).map_err(FetchError::Status)
    }
}

fn payload(past: &[i64], nowcast: &[i64]) -> String {
    let frames = |timestamps: &[i64]| {
        timestamps
            .iter()
            .map(|ts| format!(r#"{{"time":{ts},"path":"/v2/radar/{ts}"}}"#))
            .collect::<Vec<_>>()
            .join(",")
    };
    format!(
        r#"{{"host":"https://tilecache.rainviewer.com","radar":{{"past":[{}],"nowcast":[{}]}}}}"#,
        frames(past),
        frames(nowcast)
    )
}

fn config() -> ClientConfig {
    let mut config = ClientConfig {
        location: LOCATION,
        ..Default::default()
    };
    config.fetch.update_interval = UPDATE_INTERVAL;
    config
}

async fn at(start: Instant, millis: u64) {
    sleep_until(start + Duration::from_millis(millis)).await;
}

#[tokio::test(start_paused = true)]
async fn test_two_frame_loop() {
    let source = QueuedSource::new(vec![Ok(payload(&[100], &[200]))]);
    let adapter = MemoryAdapter::new();
    let start = Instant::now();
    let client = Client::spawn(config(), source, adapter.clone());

    at(start, 100).await;
    assert_eq!(client.status(), DisplayStatus::Ready);
    assert_eq!(adapter.layer_count(), 2);
    assert!(adapter.visible_z_indices().is_empty());

    // Priming: twice the 2s fade-in.
    at(start, 3_900).await;
    assert!(adapter.visible_z_indices().is_empty());
    at(start, 4_100).await;
    assert_eq!(adapter.visible_z_indices(), vec![100]);

    // Frame 100 holds for the animation speed, frame 200 (last) holds longer.
    at(start, 4_700).await;
    assert_eq!(adapter.visible_z_indices(), vec![200]);
    at(start, 7_100).await;
    assert_eq!(adapter.visible_z_indices(), vec![200]);
    at(start, 7_300).await;
    assert_eq!(adapter.visible_z_indices(), vec![100]);
    at(start, 7_900).await;
    assert_eq!(adapter.visible_z_indices(), vec![200]);

    client.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_failed_refresh_keeps_playing() {
    let source = QueuedSource::new(vec![Ok(payload(&[100, 200, 300], &[])), Err(503)]);
    let adapter = MemoryAdapter::new();
    let start = Instant::now();
    let client = Client::spawn(config(), source.clone(), adapter.clone());

    at(start, 599_000).await;
    let created_before = adapter.created_count();
    let calls_before = adapter.calls().len();

    // Second cycle fails at 600s.
    at(start, 601_000).await;
    assert_eq!(source.call_times().len(), 2);
    assert_eq!(adapter.created_count(), created_before);
    assert_eq!(adapter.detached_count(), 0);
    assert!(adapter.calls().len() > calls_before, "playback kept ticking");
    assert_eq!(adapter.visible_z_indices().len(), 1);
    assert_eq!(client.status(), DisplayStatus::Ready);

    // Next attempt one full interval later.
    at(start, 1_201_000).await;
    let calls = source.call_times();
    assert_eq!(calls.len(), 3);
    let third = calls[2] - start;
    assert!(third >= UPDATE_INTERVAL * 2 && third < UPDATE_INTERVAL * 2 + Duration::from_millis(5));

    client.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_single_frame_stays_visible() {
    let source = QueuedSource::new(vec![Ok(payload(&[100], &[]))]);
    let adapter = MemoryAdapter::new();
    let start = Instant::now();
    let client = Client::spawn(config(), source, adapter.clone());

    at(start, 4_100).await;
    assert_eq!(adapter.visible_z_indices(), vec![100]);
    adapter.clear_calls();

    for sample in 1..=20 {
        at(start, 4_100 + sample * 1_000).await;
        assert_eq!(adapter.visible_z_indices(), vec![100]);
    }
    assert!(
        !adapter
            .calls()
            .iter()
            .any(|call| matches!(call, AdapterCall::SetVisibility { value, .. } if *value == 0.0)),
        "single frame was hidden"
    );

    client.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_refresh_swaps_only_changed_frames() {
    let source = QueuedSource::new(vec![
        Ok(payload(&[1, 2], &[3])),
        Ok(payload(&[2, 3], &[4])),
    ]);
    let adapter = MemoryAdapter::new();
    let start = Instant::now();
    let client = Client::spawn(config(), source, adapter.clone());

    at(start, 1_000).await;
    assert_eq!(adapter.created_count(), 3);

    at(start, 601_000).await;
    assert_eq!(adapter.created_count(), 4);
    assert_eq!(adapter.detached_count(), 1);
    assert_eq!(adapter.layer_count(), 3);

    // Restarted priming: nothing visible until 4s after the refresh.
    assert!(adapter.visible_z_indices().is_empty());
    at(start, 604_100).await;
    assert_eq!(adapter.visible_z_indices(), vec![2]);

    client.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_missing_location_starts_nothing() {
    let source = QueuedSource::new(vec![Ok(payload(&[100], &[]))]);
    let adapter = MemoryAdapter::new();
    let start = Instant::now();
    let client = Client::spawn(ClientConfig::default(), source.clone(), adapter.clone());

    at(start, 10_000).await;
    assert!(matches!(client.status(), DisplayStatus::ConfigError(_)));
    assert!(source.call_times().is_empty());
    assert_eq!(adapter.layer_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_first_fetch_failure_stays_loading() {
    let source = QueuedSource::new(vec![Err(502)]);
    let adapter = MemoryAdapter::new();
    let start = Instant::now();
    let client = Client::spawn(config(), source, adapter.clone());

    at(start, 10_000).await;
    assert_eq!(client.status(), DisplayStatus::Loading);
    assert_eq!(adapter.layer_count(), 0);

    client.shutdown();
}
