//! Per-frame input and the NDJSON frame feed

use std::io::BufRead;

use chrono::{DateTime, Utc};
use entity::{Entity, Timestamp};
use serde::{Deserialize, Serialize};

use crate::MonitorError;

/// Tracked entities for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameInput {
    pub frame: u64,

    /// Monotonic frame time (seconds)
    pub timestamp_s: Timestamp,

    /// Wall-clock capture time, used for alert records and registry sightings
    #[serde(default)]
    pub captured_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub people: Vec<Entity>,

    #[serde(default)]
    pub vehicles: Vec<Entity>,
}

impl FrameInput {
    pub fn new(frame: u64, timestamp_s: Timestamp) -> Self {
        Self {
            frame,
            timestamp_s,
            captured_at: None,
            people: Vec::new(),
            vehicles: Vec::new(),
        }
    }

    pub fn with_people(mut self, people: Vec<Entity>) -> Self {
        self.people = people;
        self
    }

    pub fn with_vehicles(mut self, vehicles: Vec<Entity>) -> Self {
        self.vehicles = vehicles;
        self
    }

    pub fn with_captured_at(mut self, captured_at: DateTime<Utc>) -> Self {
        self.captured_at = Some(captured_at);
        self
    }

    /// Parse one feed line. Blank lines yield `None`.
    pub fn parse_line(text: &str, line: usize) -> Result<Option<Self>, MonitorError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(text)
            .map(Some)
            .map_err(|source| MonitorError::Feed { line, source })
    }

    /// Capture time, or now if the feed did not provide one
    pub fn wall_clock(&self) -> DateTime<Utc> {
        self.captured_at.unwrap_or_else(Utc::now)
    }
}

/// Reads one `FrameInput` per line. Blank lines are skipped.
pub struct FrameFeed<R> {
    reader: R,
    line: usize,
    buf: String,
}

impl<R: BufRead> FrameFeed<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
        }
    }

    /// Number of lines consumed so far
    pub fn line(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> Iterator for FrameFeed<R> {
    type Item = Result<FrameInput, MonitorError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => self.line += 1,
                Err(e) => return Some(Err(MonitorError::Io(e))),
            }

            match FrameInput::parse_line(&self.buf, self.line) {
                Ok(Some(frame)) => return Some(Ok(frame)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
