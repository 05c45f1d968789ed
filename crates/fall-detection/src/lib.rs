//! Fall Posture Tracking
//!
//! Flags people whose bounding box is markedly wider than tall ("lying") and
//! raises a PersonDown alert once the pose has held for a minimum duration.
//! Alerted states linger for a cooldown window after the person gets up so a
//! single missed frame cannot re-trigger the alert.

pub mod config;
pub mod state;

pub use config::FallConfig;
pub use state::{FallAlert, FallState, FallUpdate};

use std::collections::{BTreeSet, HashMap};

use entity::{Entity, MonotonicGuard, Timestamp, TrackId};
use tracing::{debug, info, warn};

/// Per-person fall tracker
pub struct FallTracker {
    config: FallConfig,
    states: HashMap<TrackId, FallState>,
    clock: MonotonicGuard,
}

impl FallTracker {
    /// Create a new fall tracker
    pub fn new(config: FallConfig) -> Self {
        info!(
            "Fall tracker: aspect_ratio_threshold={:.2}, min_duration={:.1}s, cooldown={:.1}s",
            config.aspect_ratio_threshold, config.min_duration_s, config.cooldown_s
        );
        Self {
            config,
            states: HashMap::new(),
            clock: MonotonicGuard::new(),
        }
    }

    /// Whether a person's box currently reads as lying down.
    /// Zero-width boxes never qualify; a flat box with width does.
    pub fn is_lying(&self, person: &Entity) -> bool {
        person.bbox.width() > 0.0 && person.bbox.aspect_ratio() < self.config.lying_ratio()
    }

    /// Update fall states for all tracked people
    pub fn update(&mut self, people: &[Entity], now: Timestamp) -> FallUpdate {
        let now = self.clock.observe(now);
        let mut fallen = BTreeSet::new();
        let mut alerts = Vec::new();

        let lying: Vec<&Entity> = people.iter().filter(|p| self.is_lying(p)).collect();

        for person in lying {
            if !fallen.insert(person.id) {
                continue;
            }

            let Some(state) = self.states.get_mut(&person.id) else {
                debug!(
                    "Person #{} in fallen pose (aspect ratio {:.2})",
                    person.id,
                    person.bbox.aspect_ratio()
                );
                self.states.insert(person.id, FallState::new(person.id, now));
                continue;
            };

            let duration = state.update(now);
            let cooldown_elapsed = state
                .last_alert_time
                .map_or(true, |last| now - last >= self.config.cooldown_s);

            if !state.alerted && duration >= self.config.min_duration_s && cooldown_elapsed {
                state.alerted = true;
                state.last_alert_time = Some(now);
                warn!(
                    "Fall alert: person #{} down for {:.1}s",
                    person.id, duration
                );
                alerts.push(FallAlert {
                    person_id: person.id,
                    location: person.center,
                    duration_s: duration,
                    confidence: person.confidence,
                    timestamp: now,
                });
            }
        }

        let recovered = self.expire_states(&fallen, now);

        FallUpdate {
            fallen,
            alerts,
            recovered,
        }
    }

    /// Drop states of people no longer lying. Collects first, removes after.
    fn expire_states(&mut self, fallen: &BTreeSet<TrackId>, now: Timestamp) -> Vec<TrackId> {
        let mut expired = Vec::new();
        let mut recovered = Vec::new();

        for (id, state) in &self.states {
            if fallen.contains(id) {
                continue;
            }
            if !state.alerted {
                expired.push(*id);
            } else if now - state.last_detected > self.config.cooldown_s {
                expired.push(*id);
                recovered.push(*id);
            }
        }

        for id in &expired {
            self.states.remove(id);
        }

        recovered.sort_unstable();
        for id in &recovered {
            info!("Person #{} recovered from fall", id);
        }
        recovered
    }

    /// Snapshot of all fall states
    pub fn active_states(&self) -> Vec<FallState> {
        let mut states: Vec<_> = self.states.values().cloned().collect();
        states.sort_by_key(|s| s.person_id);
        states
    }

    pub fn state(&self, person_id: TrackId) -> Option<&FallState> {
        self.states.get(&person_id)
    }

    pub fn config(&self) -> &FallConfig {
        &self.config
    }

    /// Reset all fall state
    pub fn reset(&mut self) {
        self.states.clear();
        self.clock.reset();
        info!("Fall tracker state reset");
    }
}

impl Default for FallTracker {
    fn default() -> Self {
        Self::new(FallConfig::default())
    }
}
