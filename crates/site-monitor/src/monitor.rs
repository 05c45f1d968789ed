//! Site monitor
//!
//! Owns every tracker plus the vehicle registry and drives them once per
//! frame. Alerts are turned into records and handed to an [`AlertSink`].

use std::collections::{BTreeMap, BTreeSet};

use alerting::{AlertRecord, AlertSink};
use entity::{Timestamp, TrackId};
use fall_detection::FallTracker;
use headcount::{HeadcountCheck, HeadcountStats, HeadcountTracker};
use proximity::{ClosePair, ProximityTracker};
use tracing::{debug, error, info, warn};
use vehicle_registry::{VehicleId, VehicleRegistry};

use crate::{FrameInput, MonitorError, SiteSettings};

/// Everything one frame produced
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    pub frame: u64,
    /// Records handed to the sink, in delivery order
    pub alerts: Vec<AlertRecord>,
    /// People currently lying down
    pub lying: BTreeSet<TrackId>,
    /// People whose alerted fall state expired this frame
    pub recovered: Vec<TrackId>,
    pub close_pairs: Vec<ClosePair>,
    /// Track id to registry id for every vehicle in the frame
    pub vehicle_ids: BTreeMap<TrackId, VehicleId>,
    /// Present only when a headcount check ran
    pub headcount: Option<HeadcountCheck>,
    /// Records the sink rejected
    pub delivery_failures: usize,
}

/// Per-frame orchestrator
pub struct SiteMonitor {
    proximity: ProximityTracker,
    fall: FallTracker,
    headcount: HeadcountTracker,
    registry: VehicleRegistry,
    autosave_interval_s: f64,
    last_save: Option<Timestamp>,
    frames_processed: u64,
}

impl SiteMonitor {
    pub fn new(settings: &SiteSettings, registry: VehicleRegistry) -> Self {
        info!(
            "Site monitor: fall detection {}, {} known vehicles",
            if settings.fall.enabled { "enabled" } else { "disabled" },
            registry.len()
        );
        Self {
            proximity: ProximityTracker::new(settings.proximity.clone()),
            fall: FallTracker::new(settings.fall.clone()),
            headcount: HeadcountTracker::new(settings.headcount.clone()),
            registry,
            autosave_interval_s: settings.registry.autosave_interval_s,
            last_save: None,
            frames_processed: 0,
        }
    }

    /// Run every tracker on one frame and deliver the resulting alerts
    pub fn process_frame(&mut self, input: &FrameInput, sink: &dyn AlertSink) -> FrameReport {
        let now = input.timestamp_s;
        let wall_clock = input.wall_clock();
        let mut report = FrameReport {
            frame: input.frame,
            ..Default::default()
        };

        for alert in self.proximity.update(&input.people, &input.vehicles, now) {
            report
                .alerts
                .push(AlertRecord::proximity(&alert, input.frame, wall_clock));
        }
        report.close_pairs = self.proximity.close_pairs(now);

        if self.fall.config().enabled {
            let update = self.fall.update(&input.people, now);
            for alert in &update.alerts {
                report
                    .alerts
                    .push(AlertRecord::person_down(alert, input.frame, wall_clock));
            }
            report.lying = update.fallen;
            report.recovered = update.recovered;
        }

        self.headcount.record(input.people.len() as u32, now);
        if self.headcount.should_check(now) {
            let check = self.headcount.check(now);
            if check.has_mismatch {
                report
                    .alerts
                    .push(AlertRecord::headcount_mismatch(&check, input.frame, wall_clock));
            }
            report.headcount = Some(check);
        }

        for vehicle in &input.vehicles {
            let id = self
                .registry
                .match_vehicle(&vehicle.class_label, vehicle.center, wall_clock);
            report.vehicle_ids.insert(vehicle.id, id);
        }

        for record in &report.alerts {
            if let Err(e) = sink.deliver(record) {
                error!("Failed to deliver {}: {}", record.kind.name(), e);
                report.delivery_failures += 1;
            }
        }

        self.autosave(now);
        self.frames_processed += 1;
        report
    }

    /// Save the registry when dirty and the autosave interval has passed
    fn autosave(&mut self, now: Timestamp) {
        if self.autosave_interval_s <= 0.0 || self.registry.path().is_none() {
            return;
        }
        let last = *self.last_save.get_or_insert(now);
        if !self.registry.is_dirty() || now - last < self.autosave_interval_s {
            return;
        }

        match self.registry.save() {
            Ok(()) => debug!("Registry autosaved ({} vehicles)", self.registry.len()),
            Err(e) => warn!("Registry autosave failed: {}", e),
        }
        self.last_save = Some(now);
    }

    /// Operator override of the expected headcount
    pub fn set_expected_headcount(&mut self, count: u32) {
        info!("Operator set expected headcount to {}", count);
        self.headcount.set_expected_count(count);
    }

    pub fn headcount_stats(&self) -> HeadcountStats {
        self.headcount.stats()
    }

    pub fn registry(&self) -> &VehicleRegistry {
        &self.registry
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Persist the registry. Call once the feed has ended.
    pub fn shutdown(&mut self) -> Result<(), MonitorError> {
        info!(
            "Site monitor stopping after {} frames",
            self.frames_processed
        );
        if self.registry.path().is_none() {
            return Ok(());
        }
        self.registry.save()?;
        info!("Registry saved ({} vehicles)", self.registry.len());
        Ok(())
    }
}
