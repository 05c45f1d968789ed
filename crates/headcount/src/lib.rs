//! Headcount Monitoring
//!
//! Records the number of people detected each frame and, once per check
//! interval, compares the most frequent count over a sliding window against
//! the expected number of people on site. Repeat mismatch alerts are throttled
//! by a separate, longer cooldown.

pub mod config;
mod window;

pub use config::HeadcountConfig;
pub use window::{CountSample, SampleWindow};

use entity::{MonotonicGuard, Timestamp};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Outcome of one headcount check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeadcountCheck {
    /// A mismatch that passed the alert cooldown
    pub has_mismatch: bool,
    /// Most recent sample
    pub current_count: u32,
    /// Most frequent count over the window
    pub mode_count: u32,
    pub expected_count: u32,
}

/// Monitoring statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadcountStats {
    pub expected: u32,
    pub current: u32,
    pub mode: u32,
    pub samples: usize,
    pub window_minutes: f64,
}

/// Sliding-window headcount tracker
pub struct HeadcountTracker {
    config: HeadcountConfig,
    window: SampleWindow,
    /// Starts at the first recorded sample
    last_check_time: Option<Timestamp>,
    last_alert_time: Option<Timestamp>,
    clock: MonotonicGuard,
}

impl HeadcountTracker {
    /// Create a new headcount tracker
    pub fn new(config: HeadcountConfig) -> Self {
        info!(
            "Headcount tracker: expecting {} people, check every {:.0}s over a {:.0}s window",
            config.expected_count, config.check_interval_s, config.sample_window_s
        );
        Self {
            window: SampleWindow::new(config.sample_window_s),
            config,
            last_check_time: None,
            last_alert_time: None,
            clock: MonotonicGuard::new(),
        }
    }

    /// Record the number of people detected at `now`
    pub fn record(&mut self, count: u32, now: Timestamp) {
        let now = self.clock.observe(now);
        self.last_check_time.get_or_insert(now);
        self.window.push(CountSample {
            timestamp: now,
            count,
        });
    }

    /// True once a full check interval has passed since the last check
    pub fn should_check(&self, now: Timestamp) -> bool {
        self.last_check_time
            .is_some_and(|last| now - last >= self.config.check_interval_s)
    }

    /// Compare the window mode against the expected count.
    ///
    /// Always consumes the current interval. A mismatch inside the alert
    /// cooldown is reported as `has_mismatch = false` and leaves the cooldown
    /// untouched.
    pub fn check(&mut self, now: Timestamp) -> HeadcountCheck {
        let now = self.clock.observe(now);
        self.last_check_time = Some(now);
        let expected_count = self.config.expected_count;

        let (Some(mode_count), Some(latest)) = (self.window.mode(), self.window.latest()) else {
            return HeadcountCheck {
                has_mismatch: false,
                current_count: 0,
                mode_count: 0,
                expected_count,
            };
        };
        let current_count = latest.count;

        let mut has_mismatch = mode_count != expected_count;
        if has_mismatch {
            let since_last = self.last_alert_time.map(|last| now - last);
            match since_last {
                Some(elapsed) if elapsed < self.config.alert_cooldown_s => {
                    debug!(
                        "Headcount mismatch in cooldown ({:.0}s / {:.0}s)",
                        elapsed, self.config.alert_cooldown_s
                    );
                    has_mismatch = false;
                }
                _ => {
                    self.last_alert_time = Some(now);
                    warn!(
                        "Headcount mismatch: expected {}, mode {} (current {})",
                        expected_count, mode_count, current_count
                    );
                }
            }
        }

        HeadcountCheck {
            has_mismatch,
            current_count,
            mode_count,
            expected_count,
        }
    }

    /// Update the expected number of people on site
    pub fn set_expected_count(&mut self, count: u32) {
        let old = self.config.expected_count;
        self.config.expected_count = count;
        if old != count {
            info!("Expected headcount updated: {} -> {}", old, count);
        }
    }

    pub fn expected_count(&self) -> u32 {
        self.config.expected_count
    }

    /// Current monitoring statistics
    pub fn stats(&self) -> HeadcountStats {
        HeadcountStats {
            expected: self.config.expected_count,
            current: self.window.latest().map_or(0, |s| s.count),
            mode: self.window.mode().unwrap_or(0),
            samples: self.window.len(),
            window_minutes: self.config.sample_window_s / 60.0,
        }
    }

    pub fn config(&self) -> &HeadcountConfig {
        &self.config
    }
}

impl Default for HeadcountTracker {
    fn default() -> Self {
        Self::new(HeadcountConfig::default())
    }
}
