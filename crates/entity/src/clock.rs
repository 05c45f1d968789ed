//! Caller-supplied timestamp handling
//!
//! Trackers never sample the wall clock. They are driven by a monotonic
//! timestamp in seconds supplied with every update. A timestamp that goes
//! backwards is clamped to the latest one seen so durations never turn negative.

use tracing::warn;

/// Seconds on a caller-defined monotonic timeline
pub type Timestamp = f64;

/// Clamps out-of-order timestamps for a single tracker instance
#[derive(Debug, Clone, Default)]
pub struct MonotonicGuard {
    last: Option<Timestamp>,
}

impl MonotonicGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `now`, or the last seen timestamp if `now` is older
    pub fn observe(&mut self, now: Timestamp) -> Timestamp {
        match self.last {
            Some(last) if now < last => {
                warn!(
                    "Out-of-order timestamp {:.3}s (last {:.3}s), clamping",
                    now, last
                );
                last
            }
            _ => {
                self.last = Some(now);
                now
            }
        }
    }

    /// Latest accepted timestamp
    pub fn last(&self) -> Option<Timestamp> {
        self.last
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_timestamps_pass_through() {
        let mut guard = MonotonicGuard::new();
        assert_eq!(guard.observe(1.0), 1.0);
        assert_eq!(guard.observe(1.0), 1.0);
        assert_eq!(guard.observe(2.5), 2.5);
        assert_eq!(guard.last(), Some(2.5));
    }

    #[test]
    fn test_backwards_timestamp_is_clamped() {
        let mut guard = MonotonicGuard::new();
        guard.observe(10.0);
        assert_eq!(guard.observe(4.0), 10.0);
        // Clamping does not move the high-water mark
        assert_eq!(guard.observe(11.0), 11.0);
    }
}
