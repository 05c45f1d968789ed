//! Pairwise proximity tracker

use std::collections::{HashMap, HashSet};

use entity::{Entity, MonotonicGuard, Timestamp};
use tracing::{debug, info, warn};

use crate::config::ProximityConfig;
use crate::state::{ClosePair, PairKey, PairState, ProximityAlert};

/// Tracks every person-vehicle pair in view and raises debounced warnings
pub struct ProximityTracker {
    config: ProximityConfig,
    states: HashMap<PairKey, PairState>,
    clock: MonotonicGuard,
}

impl ProximityTracker {
    /// Create a new proximity tracker
    pub fn new(config: ProximityConfig) -> Self {
        info!(
            "Proximity tracker: threshold={:.0}px, min_duration={:.1}s, cooldown={:.1}s",
            config.pixel_threshold, config.min_duration_s, config.cooldown_s
        );
        Self {
            config,
            states: HashMap::new(),
            clock: MonotonicGuard::new(),
        }
    }

    /// Update pair states with the current frame and return new warnings
    pub fn update(
        &mut self,
        people: &[Entity],
        vehicles: &[Entity],
        now: Timestamp,
    ) -> Vec<ProximityAlert> {
        let now = self.clock.observe(now);
        let mut alerts = Vec::new();
        let mut present = HashSet::with_capacity(people.len() * vehicles.len());

        for person in people {
            for vehicle in vehicles {
                let key = PairKey::new(person.id, vehicle.id);
                present.insert(key);

                let distance = person.distance_to(vehicle);
                let state = self.states.entry(key).or_default();

                if distance > self.config.pixel_threshold {
                    if state.is_close() {
                        debug!(
                            "Pair P{}/V{} separated ({:.0}px), resetting",
                            key.person_id, key.vehicle_id, distance
                        );
                    }
                    state.reset();
                    continue;
                }

                let first = *state.first_close_time.get_or_insert(now);
                state.last_close_time = Some(now);
                let duration = now - first;

                if duration >= self.config.min_duration_s
                    && state.cooldown_elapsed(now, self.config.cooldown_s)
                {
                    warn!(
                        "Proximity warning: person #{} within {:.0}px of vehicle #{} for {:.1}s",
                        person.id, distance, vehicle.id, duration
                    );
                    state.is_alerted = true;
                    state.last_alert_time = Some(now);
                    alerts.push(ProximityAlert {
                        person_id: person.id,
                        vehicle_id: vehicle.id,
                        distance,
                        duration_s: duration,
                        person_center: person.center,
                        vehicle_center: vehicle.center,
                        timestamp: now,
                    });
                }
            }
        }

        let before = self.states.len();
        self.states.retain(|key, _| present.contains(key));
        if self.states.len() < before {
            debug!("Dropped {} stale pair states", before - self.states.len());
        }

        alerts
    }

    /// Pairs currently inside the threshold, with their streak duration
    pub fn close_pairs(&self, now: Timestamp) -> Vec<ClosePair> {
        let mut pairs: Vec<_> = self
            .states
            .iter()
            .filter_map(|(key, state)| {
                state.close_duration(now).map(|duration_s| ClosePair {
                    person_id: key.person_id,
                    vehicle_id: key.vehicle_id,
                    duration_s,
                })
            })
            .collect();
        pairs.sort_by_key(|p| (p.person_id, p.vehicle_id));
        pairs
    }

    /// State for one pair, if tracked
    pub fn state(&self, person_id: u32, vehicle_id: u32) -> Option<&PairState> {
        self.states.get(&PairKey::new(person_id, vehicle_id))
    }

    /// Number of tracked pairs
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn config(&self) -> &ProximityConfig {
        &self.config
    }

    /// Clear all pair states
    pub fn reset(&mut self) {
        self.states.clear();
        self.clock.reset();
    }
}

impl Default for ProximityTracker {
    fn default() -> Self {
        Self::new(ProximityConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn person_at(id: u32, x: f64) -> Entity {
        Entity::person(id, (x, 360.0), (60.0, 160.0))
    }

    fn truck_at(id: u32, x: f64) -> Entity {
        Entity::vehicle(id, "truck", (x, 360.0), (200.0, 100.0))
    }

    #[test]
    fn test_alert_after_min_duration_then_cooldown() {
        let mut tracker = ProximityTracker::default();
        let people = [person_at(1, 500.0)];
        let vehicles = [truck_at(10, 650.0)]; // 150px apart

        assert!(tracker.update(&people, &vehicles, 0.0).is_empty());
        assert!(tracker.update(&people, &vehicles, 1.0).is_empty());

        let alerts = tracker.update(&people, &vehicles, 2.0);
        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!((alert.person_id, alert.vehicle_id), (1, 10));
        assert!((alert.distance - 150.0).abs() < 1e-9);
        assert!((alert.duration_s - 2.0).abs() < 1e-9);
        assert_eq!(alert.timestamp, 2.0);

        // Cooldown
        assert!(tracker.update(&people, &vehicles, 3.0).is_empty());
    }

    #[test]
    fn test_repeat_after_cooldown() {
        let mut tracker = ProximityTracker::default();
        let people = [person_at(1, 500.0)];
        let vehicles = [truck_at(10, 600.0)];

        tracker.update(&people, &vehicles, 0.0);
        assert_eq!(tracker.update(&people, &vehicles, 2.5).len(), 1);
        assert!(tracker.update(&people, &vehicles, 3.0).is_empty());
        assert!(tracker.update(&people, &vehicles, 7.4).is_empty());
        assert_eq!(tracker.update(&people, &vehicles, 7.5).len(), 1);
    }

    #[test]
    fn test_departure_resets_duration() {
        let mut tracker = ProximityTracker::default();
        let people = [person_at(1, 500.0)];
        let near = [truck_at(10, 600.0)];
        let far = [truck_at(10, 1100.0)];

        tracker.update(&people, &near, 0.0);
        tracker.update(&people, &near, 1.5);
        tracker.update(&people, &far, 1.9);

        let state = tracker.state(1, 10).unwrap();
        assert!(!state.is_close());
        assert!(!state.is_alerted);

        // Re-entry must accrue the full duration again
        assert!(tracker.update(&people, &near, 2.0).is_empty());
        assert!(tracker.update(&people, &near, 3.9).is_empty());
        assert_eq!(tracker.update(&people, &near, 4.0).len(), 1);
    }

    #[test]
    fn test_cooldown_survives_departure() {
        let mut tracker = ProximityTracker::default();
        let people = [person_at(1, 500.0)];
        let near = [truck_at(10, 600.0)];
        let far = [truck_at(10, 1100.0)];

        tracker.update(&people, &near, 0.0);
        assert_eq!(tracker.update(&people, &near, 2.0).len(), 1);
        tracker.update(&people, &far, 2.5);
        tracker.update(&people, &near, 3.0);
        // Duration satisfied again at 5.0 but cooldown (until 7.0) is not
        assert!(tracker.update(&people, &near, 5.0).is_empty());
        assert_eq!(tracker.update(&people, &near, 7.0).len(), 1);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut tracker = ProximityTracker::default();
        let people = [person_at(1, 0.0)];
        let vehicles = [truck_at(10, 200.0)];

        tracker.update(&people, &vehicles, 0.0);
        assert_eq!(tracker.update(&people, &vehicles, 2.0).len(), 1);
    }

    #[test]
    fn test_multiple_pairs() {
        let mut tracker = ProximityTracker::default();
        let people = [person_at(1, 500.0), person_at(2, 800.0)];
        let vehicles = [truck_at(10, 650.0)];

        assert!(tracker.update(&people, &vehicles, 0.0).is_empty());
        let alerts = tracker.update(&people, &vehicles, 2.5);
        assert_eq!(alerts.len(), 2);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_state_cleanup_when_entities_vanish() {
        let mut tracker = ProximityTracker::default();
        let people = [person_at(1, 500.0), person_at(2, 520.0)];
        let vehicles = [truck_at(10, 600.0)];

        tracker.update(&people, &vehicles, 0.0);
        assert_eq!(tracker.len(), 2);

        // Person 2 leaves
        tracker.update(&people[..1], &vehicles, 1.0);
        assert_eq!(tracker.len(), 1);
        assert!(tracker.state(2, 10).is_none());

        // Everyone leaves
        assert!(tracker.update(&[], &[], 2.0).is_empty());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_no_vehicles_clears_states() {
        let mut tracker = ProximityTracker::default();
        let people = [person_at(1, 500.0)];
        tracker.update(&people, &[truck_at(10, 600.0)], 0.0);

        assert!(tracker.update(&people, &[], 1.0).is_empty());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_close_pairs_report() {
        let mut tracker = ProximityTracker::default();
        let people = [person_at(1, 500.0), person_at(2, 1200.0)];
        let vehicles = [truck_at(10, 600.0)];

        tracker.update(&people, &vehicles, 1.0);
        tracker.update(&people, &vehicles, 2.0);

        let pairs = tracker.close_pairs(2.5);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].person_id, 1);
        assert!((pairs[0].duration_s - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_reset_clears_pairs_and_clock() {
        let mut tracker = ProximityTracker::default();
        let people = [person_at(1, 500.0)];
        let vehicles = [truck_at(10, 600.0)];

        tracker.update(&people, &vehicles, 10.0);
        assert_eq!(tracker.update(&people, &vehicles, 12.0).len(), 1);

        tracker.reset();
        assert!(tracker.is_empty());

        // No cooldown carried over and earlier timestamps are accepted again
        assert!(tracker.update(&people, &vehicles, 0.0).is_empty());
        assert_eq!(tracker.update(&people, &vehicles, 2.0).len(), 1);
    }

    #[test]
    fn test_backwards_timestamp_does_not_produce_negative_duration() {
        let mut tracker = ProximityTracker::default();
        let people = [person_at(1, 500.0)];
        let vehicles = [truck_at(10, 600.0)];

        tracker.update(&people, &vehicles, 5.0);
        assert!(tracker.update(&people, &vehicles, 1.0).is_empty());
        let state = tracker.state(1, 10).unwrap();
        assert_eq!(state.close_duration(5.0), Some(0.0));
    }

    proptest! {
        #[test]
        fn prop_first_alert_at_first_frame_past_min_duration(
            steps in proptest::collection::vec(0.05f64..0.7, 1..40),
        ) {
            let config = ProximityConfig::default();
            let mut tracker = ProximityTracker::new(config.clone());
            let people = [person_at(1, 500.0)];
            let vehicles = [truck_at(10, 600.0)];

            let mut now = 0.0;
            let mut fired_at = None;
            tracker.update(&people, &vehicles, now);
            for step in steps {
                now += step;
                let alerts = tracker.update(&people, &vehicles, now);
                if fired_at.is_none() {
                    if now < config.min_duration_s {
                        prop_assert!(alerts.is_empty());
                    } else {
                        prop_assert_eq!(alerts.len(), 1);
                        fired_at = Some(now);
                    }
                } else if let Some(t1) = fired_at {
                    if now - t1 < config.cooldown_s {
                        prop_assert!(alerts.is_empty());
                    } else {
                        prop_assert_eq!(alerts.len(), 1);
                        fired_at = Some(now);
                    }
                }
            }
        }
    }
}
