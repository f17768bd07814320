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

//! Radar frame model and weather-maps payload parsing.
//!
//! The upstream API returns past and nowcast radar snapshots. They are
//! flattened into a single [`ForecastSet`] ordered past-first. Individual
//! malformed frames are skipped; a payload without the expected structure
//! is rejected as a whole.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use log::warn;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while parsing a weather-maps payload.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid value for field '{field}': {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("duplicate frame timestamp: {0}")]
    DuplicateTimestamp(i64),
}

/// One radar snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Capture time in unix seconds. Unique within one forecast set.
    pub timestamp: i64,
    /// URL path fragment used to build tile URLs (e.g. "/v2/radar/1700000000").
    pub path: String,
}

impl Frame {
    #[must_use]
    pub fn new(timestamp: i64, path: impl Into<String>) -> Self {
        Self {
            timestamp,
            path: path.into(),
        }
    }

    /// Capture time as a UTC datetime, if the timestamp is representable.
    #[must_use]
    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }

    fn from_value(value: &Value) -> Result<Self, ParseError> {
        let time = value.get("time").ok_or(ParseError::MissingField("time"))?;
        let timestamp = time.as_i64().ok_or_else(|| ParseError::InvalidValue {
            field: "time",
            value: time.to_string(),
        })?;

        let path = value.get("path").ok_or(ParseError::MissingField("path"))?;
        let path = path.as_str().ok_or_else(|| ParseError::InvalidValue {
            field: "path",
            value: path.to_string(),
        })?;

        Ok(Self::new(timestamp, path))
    }
}

#[derive(Debug, Deserialize)]
struct WeatherMapsPayload {
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    radar: Option<RadarPayload>,
}

#[derive(Debug, Deserialize)]
struct RadarPayload {
    #[serde(default)]
    past: Option<Vec<Value>>,
    #[serde(default)]
    nowcast: Option<Vec<Value>>,
}

/// Ordered frames from one fetch cycle: past frames followed by nowcast frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForecastSet {
    host: Option<String>,
    frames: Vec<Frame>,
}

impl ForecastSet {
    /// Build a set directly from frames (in display order).
    #[must_use]
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { host: None, frames }
    }

    /// Attach the tile host advertised by the upstream API.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Parse a raw weather-maps JSON body.
    pub fn from_json(body: &str) -> Result<Self, ParseError> {
        let payload: WeatherMapsPayload = serde_json::from_str(body)?;
        Self::from_payload(payload)
    }

    /// Parse an already-decoded weather-maps JSON document.
    pub fn from_value(value: Value) -> Result<Self, ParseError> {
        let payload: WeatherMapsPayload = serde_json::from_value(value)?;
        Self::from_payload(payload)
    }

    fn from_payload(payload: WeatherMapsPayload) -> Result<Self, ParseError> {
        let radar = payload.radar.ok_or(ParseError::MissingField("radar"))?;
        let past = radar.past.ok_or(ParseError::MissingField("radar.past"))?;
        let nowcast = radar.nowcast.unwrap_or_default();

        let mut seen = HashSet::new();
        let mut frames = Vec::with_capacity(past.len() + nowcast.len());

        for value in past.iter().chain(nowcast.iter()) {
            let frame = match Frame::from_value(value) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Skipping radar frame: {}", e);
                    continue;
                }
            };

            if !seen.insert(frame.timestamp) {
                warn!(
                    "Skipping radar frame: {}",
                    ParseError::DuplicateTimestamp(frame.timestamp)
                );
                continue;
            }

            frames.push(frame);
        }

        Ok(Self {
            host: payload.host.filter(|h| !h.is_empty()),
            frames,
        })
    }

    /// Tile host advertised by the API, if any.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Frame timestamps in display order.
    #[must_use]
    pub fn timestamps(&self) -> Vec<i64> {
        self.frames.iter().map(|f| f.timestamp).collect()
    }

    #[must_use]
    pub fn contains(&self, timestamp: i64) -> bool {
        self.frames.iter().any(|f| f.timestamp == timestamp)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_past_then_nowcast() {
        let body = r#"{"radar":{"past":[{"time":100,"path":"/a"}],"nowcast":[{"time":200,"path":"/b"}]}}"#;
        let set = ForecastSet::from_json(body).unwrap();
        assert_eq!(set.timestamps(), vec![100, 200]);
        assert_eq!(set.frames()[1].path, "/b");
        assert!(set.host().is_none());
    }

    #[test]
    fn test_parse_host() {
        let body = r#"{"host":"https://tilecache.rainviewer.com","radar":{"past":[],"nowcast":[]}}"#;
        let set = ForecastSet::from_json(body).unwrap();
        assert_eq!(set.host(), Some("https://tilecache.rainviewer.com"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_missing_radar_is_rejected() {
        let result = ForecastSet::from_json(r#"{"version":"2.0"}"#);
        assert!(matches!(result, Err(ParseError::MissingField("radar"))));
    }

    #[test]
    fn test_missing_past_is_rejected() {
        let result = ForecastSet::from_json(r#"{"radar":{"nowcast":[]}}"#);
        assert!(matches!(result, Err(ParseError::MissingField("radar.past"))));
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        let result = ForecastSet::from_json("<html>Bad Gateway</html>");
        assert!(matches!(result, Err(ParseError::InvalidJson(_))));
    }

    #[test]
    fn test_malformed_frames_are_skipped() {
        let body = r#"{"radar":{"past":[
            {"time":100,"path":"/a"},
            {"path":"/no-time"},
            {"time":"soon","path":"/bad-time"},
            {"time":300}
        ],"nowcast":[{"time":400,"path":"/d"}]}}"#;
        let set = ForecastSet::from_json(body).unwrap();
        assert_eq!(set.timestamps(), vec![100, 400]);
    }

    #[test]
    fn test_duplicate_timestamps_keep_first() {
        let body = r#"{"radar":{"past":[{"time":100,"path":"/a"}],"nowcast":[{"time":100,"path":"/b"}]}}"#;
        let set = ForecastSet::from_json(body).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.frames()[0].path, "/a");
    }

    #[test]
    fn test_from_decoded_value() {
        let value = serde_json::json!({
            "radar": {
                "past": [{"time": 100, "path": "/a"}, {"time": 200, "path": "/b"}],
                "nowcast": []
            }
        });
        let set = ForecastSet::from_value(value).unwrap();
        assert!(set.contains(200));
        assert!(!set.contains(300));

        assert!(matches!(
            ForecastSet::from_value(serde_json::json!({"host": "x"})),
            Err(ParseError::MissingField("radar"))
        ));
    }

    #[test]
    fn test_captured_at() {
        let frame = Frame::new(1_700_000_000, "/v2/radar/1700000000");
        let at = frame.captured_at().unwrap();
        assert_eq!(at.timestamp(), 1_700_000_000);
    }
}
