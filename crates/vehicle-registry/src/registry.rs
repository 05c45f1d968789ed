//! Vehicle Registry Implementation

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use entity::Point;
use tracing::{debug, error, info, warn};

use crate::record::{VehicleId, VehicleRecord, VehicleStatus};
use crate::{RegistryConfig, RegistryError};

/// First id handed out to vehicles created at runtime
pub const RUNTIME_ID_START: VehicleId = 1000;

/// Vehicle registry with greedy nearest-neighbour re-identification
pub struct VehicleRegistry {
    /// Records by id (ordered for persistence)
    vehicles: BTreeMap<VehicleId, VehicleRecord>,
    /// Ids grouped by label
    label_index: HashMap<String, Vec<VehicleId>>,
    /// Next runtime id
    next_id: VehicleId,
    /// Matching radius (pixels, exclusive)
    match_radius: f64,
    /// Backing file, if any
    path: Option<PathBuf>,
    /// Modified since the last successful save
    dirty: bool,
}

impl VehicleRegistry {
    /// Create an empty in-memory registry
    pub fn new(match_radius: f64) -> Self {
        Self {
            vehicles: BTreeMap::new(),
            label_index: HashMap::new(),
            next_id: RUNTIME_ID_START,
            match_radius,
            path: None,
            dirty: false,
        }
    }

    /// Build a registry from existing records
    pub fn from_records(records: Vec<VehicleRecord>, match_radius: f64) -> Self {
        let mut registry = Self::new(match_radius);
        for record in records {
            registry.insert(record);
        }
        registry.next_id = match registry.vehicles.keys().next_back() {
            Some(&max) => match max.checked_add(1) {
                Some(next) => next.max(RUNTIME_ID_START),
                None => {
                    warn!("Registry holds the maximum vehicle id {}", max);
                    VehicleId::MAX
                }
            },
            None => RUNTIME_ID_START,
        };
        registry
    }

    /// Load a registry file. A missing file yields an empty registry.
    pub fn load(path: impl AsRef<Path>, match_radius: f64) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("Registry not found: {}", path.display());
            let mut registry = Self::new(match_radius);
            registry.path = Some(path.to_path_buf());
            return Ok(registry);
        }

        let file = File::open(path)?;
        let records: Vec<VehicleRecord> = serde_json::from_reader(BufReader::new(file))?;
        let mut registry = Self::from_records(records, match_radius);
        registry.path = Some(path.to_path_buf());

        info!(
            "Loaded {} vehicles from registry {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Load the configured registry, falling back to an empty one on failure.
    ///
    /// An unreadable file is moved aside to `<path>.corrupt-<timestamp>` before
    /// the empty registry takes over the path. If it cannot be moved, the
    /// registry stays in memory only and saves are disabled.
    pub fn open(config: &RegistryConfig) -> Self {
        let e = match Self::load(&config.path, config.match_radius) {
            Ok(registry) => return registry,
            Err(e) => e,
        };

        warn!(
            "Failed to load registry {}: {}. Starting empty",
            config.path.display(),
            e
        );
        let mut registry = Self::new(config.match_radius);
        match quarantine(&config.path) {
            Ok(moved) => {
                warn!("Unreadable registry moved to {}", moved.display());
                registry.path = Some(config.path.clone());
            }
            Err(e) => error!(
                "Could not move unreadable registry {}: {}. Saves disabled",
                config.path.display(),
                e
            ),
        }
        registry
    }

    /// Save to the backing file
    pub fn save(&mut self) -> Result<(), RegistryError> {
        let path = self.path.clone().ok_or(RegistryError::NoPath)?;
        self.save_to(&path)?;
        self.dirty = false;
        Ok(())
    }

    /// Save to an explicit path via a synced temp file renamed over the target
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), RegistryError> {
        let path = path.as_ref();
        let records: Vec<&VehicleRecord> = self.vehicles.values().collect();
        let data = serde_json::to_vec_pretty(&records)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&data)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;

        debug!("Saved {} vehicles to {}", records.len(), path.display());
        Ok(())
    }

    /// Resolve a detection to a registry id.
    ///
    /// Picks the nearest known vehicle with the same label. Reuses it when it
    /// is inside the match radius, otherwise registers a new vehicle.
    pub fn match_vehicle(
        &mut self,
        label: &str,
        location: Point,
        seen_at: DateTime<Utc>,
    ) -> VehicleId {
        if let Some((id, distance)) = self.nearest(label, location) {
            if distance < self.match_radius {
                self.update_vehicle(id, Some(location), seen_at);
                return id;
            }
        }

        let id = self.allocate_id();
        self.insert(VehicleRecord {
            id,
            label: label.to_string(),
            status: VehicleStatus::Active,
            last_seen: Some(seen_at),
            location: Some(location),
        });
        self.dirty = true;

        info!("New vehicle detected: {} (ID: {})", label, id);
        id
    }

    /// Nearest same-label vehicle with a known location
    fn nearest(&self, label: &str, location: Point) -> Option<(VehicleId, f64)> {
        self.label_index
            .get(label)?
            .iter()
            .filter_map(|id| {
                let known = self.vehicles.get(id)?.location?;
                Some((*id, known.distance_to(&location)))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Refresh last-seen time and, when given, location
    pub fn update_vehicle(
        &mut self,
        id: VehicleId,
        location: Option<Point>,
        seen_at: DateTime<Utc>,
    ) -> bool {
        let Some(vehicle) = self.vehicles.get_mut(&id) else {
            return false;
        };
        vehicle.last_seen = Some(seen_at);
        if location.is_some() {
            vehicle.location = location;
        }
        self.dirty = true;
        true
    }

    /// Change a vehicle's operational status
    pub fn set_status(&mut self, id: VehicleId, status: VehicleStatus) -> bool {
        match self.vehicles.get_mut(&id) {
            Some(vehicle) if vehicle.status != status => {
                info!("Vehicle {} status {:?} -> {:?}", id, vehicle.status, status);
                vehicle.status = status;
                self.dirty = true;
                true
            }
            Some(_) => true,
            None => false,
        }
    }

    pub fn get(&self, id: VehicleId) -> Option<&VehicleRecord> {
        self.vehicles.get(&id)
    }

    /// All vehicles ordered by id
    pub fn vehicles(&self) -> impl Iterator<Item = &VehicleRecord> {
        self.vehicles.values()
    }

    /// Ids registered under a label
    pub fn ids_for_label(&self, label: &str) -> &[VehicleId] {
        self.label_index.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn next_id(&self) -> VehicleId {
        self.next_id
    }

    /// Hand out the next runtime id. Once the top of the id space is taken,
    /// falls back to the lowest free runtime id.
    fn allocate_id(&mut self) -> VehicleId {
        let id = self.next_id;
        if !self.vehicles.contains_key(&id) {
            self.next_id = id.saturating_add(1);
            return id;
        }

        let free = (RUNTIME_ID_START..=VehicleId::MAX)
            .find(|candidate| !self.vehicles.contains_key(candidate))
            .unwrap_or(VehicleId::MAX);
        warn!("Vehicle ids exhausted at {}, reusing free id {}", id, free);
        free
    }

    fn insert(&mut self, record: VehicleRecord) {
        if let Some(previous) = self.vehicles.get(&record.id) {
            warn!("Duplicate vehicle id {} in registry, keeping the last", record.id);
            if previous.label != record.label {
                if let Some(ids) = self.label_index.get_mut(&previous.label) {
                    ids.retain(|id| *id != record.id);
                }
            }
        }

        let ids = self.label_index.entry(record.label.clone()).or_default();
        if !ids.contains(&record.id) {
            ids.push(record.id);
        }
        self.vehicles.insert(record.id, record);
    }
}

/// Rename a file to `<path>.corrupt-<timestamp>`, returning the new path
fn quarantine(path: &Path) -> std::io::Result<PathBuf> {
    let mut target = path.as_os_str().to_os_string();
    target.push(format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S%.3f")));
    let target = PathBuf::from(target);
    fs::rename(path, &target)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn test_same_label_nearby_reuses_id() {
        let mut registry = VehicleRegistry::new(500.0);
        let first = registry.match_vehicle("truck", Point::new(100.0, 100.0), now());
        let second = registry.match_vehicle("truck", Point::new(104.0, 98.0), now());
        assert_eq!(first, second);
        assert_eq!(first, RUNTIME_ID_START);
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get(first).unwrap().location,
            Some(Point::new(104.0, 98.0))
        );
    }

    #[test]
    fn test_far_location_creates_new_id() {
        let mut registry = VehicleRegistry::new(500.0);
        let first = registry.match_vehicle("truck", Point::new(0.0, 0.0), now());
        let second = registry.match_vehicle("truck", Point::new(600.0, 0.0), now());
        assert_ne!(first, second);
        assert_eq!(second, first + 1);
    }

    #[test]
    fn test_radius_is_exclusive() {
        let mut registry = VehicleRegistry::new(500.0);
        let first = registry.match_vehicle("truck", Point::new(0.0, 0.0), now());
        let second = registry.match_vehicle("truck", Point::new(500.0, 0.0), now());
        assert_ne!(first, second);
    }

    #[test]
    fn test_labels_do_not_cross_match() {
        let mut registry = VehicleRegistry::new(500.0);
        let truck = registry.match_vehicle("truck", Point::new(0.0, 0.0), now());
        let car = registry.match_vehicle("car", Point::new(1.0, 1.0), now());
        assert_ne!(truck, car);
        assert_eq!(registry.ids_for_label("truck"), &[truck]);
        assert_eq!(registry.ids_for_label("car"), &[car]);
    }

    #[test]
    fn test_nearest_candidate_wins() {
        let mut registry = VehicleRegistry::new(500.0);
        let a = registry.match_vehicle("truck", Point::new(0.0, 0.0), now());
        let b = registry.match_vehicle("truck", Point::new(900.0, 0.0), now());
        assert_eq!(registry.match_vehicle("truck", Point::new(700.0, 0.0), now()), b);
        assert_eq!(registry.match_vehicle("truck", Point::new(200.0, 0.0), now()), a);
    }

    #[test]
    fn test_seeded_records_without_location_never_match() {
        let seeded = vec![VehicleRecord::new(3, "truck")];
        let mut registry = VehicleRegistry::from_records(seeded, 500.0);
        let id = registry.match_vehicle("truck", Point::new(10.0, 10.0), now());
        assert_eq!(id, RUNTIME_ID_START);
        assert_eq!(registry.ids_for_label("truck"), &[3, RUNTIME_ID_START]);
    }

    #[test]
    fn test_next_id_above_loaded_max() {
        let seeded = vec![VehicleRecord::new(1, "truck"), VehicleRecord::new(1500, "car")];
        let registry = VehicleRegistry::from_records(seeded, 500.0);
        assert_eq!(registry.next_id(), 1501);

        let low = VehicleRegistry::from_records(vec![VehicleRecord::new(12, "car")], 500.0);
        assert_eq!(low.next_id(), RUNTIME_ID_START);
    }

    #[test]
    fn test_max_loaded_id_does_not_overflow() {
        let seeded = vec![VehicleRecord::new(VehicleId::MAX, "truck")];
        let mut registry = VehicleRegistry::from_records(seeded, 500.0);
        assert_eq!(registry.next_id(), VehicleId::MAX);

        let first = registry.match_vehicle("crane", Point::new(0.0, 0.0), now());
        let second = registry.match_vehicle("crane", Point::new(900.0, 0.0), now());
        assert_eq!(first, RUNTIME_ID_START);
        assert_eq!(second, RUNTIME_ID_START + 1);
        assert_eq!(registry.get(VehicleId::MAX).unwrap().label, "truck");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_last_id_handed_out_once() {
        let seeded = vec![VehicleRecord::new(VehicleId::MAX - 1, "truck")];
        let mut registry = VehicleRegistry::from_records(seeded, 500.0);

        let top = registry.match_vehicle("crane", Point::new(0.0, 0.0), now());
        let next = registry.match_vehicle("crane", Point::new(900.0, 0.0), now());
        assert_eq!(top, VehicleId::MAX);
        assert_eq!(next, RUNTIME_ID_START);
    }

    #[test]
    fn test_set_status() {
        let mut registry = VehicleRegistry::from_records(vec![VehicleRecord::new(5, "truck")], 500.0);
        assert!(registry.set_status(5, VehicleStatus::Idle));
        assert_eq!(registry.get(5).unwrap().status, VehicleStatus::Idle);
        assert!(registry.is_dirty());
        assert!(!registry.set_status(99, VehicleStatus::Idle));
    }

    #[test]
    fn test_save_without_path_fails() {
        let mut registry = VehicleRegistry::new(500.0);
        assert!(matches!(registry.save(), Err(RegistryError::NoPath)));
    }

    proptest! {
        #[test]
        fn prop_identity_stable_for_small_moves(
            x in 0.0f64..1920.0,
            y in 0.0f64..1080.0,
            dx in -50.0f64..50.0,
            dy in -50.0f64..50.0,
        ) {
            let mut registry = VehicleRegistry::new(500.0);
            let first = registry.match_vehicle("truck", Point::new(x, y), now());
            let second = registry.match_vehicle("truck", Point::new(x + dx, y + dy), now());
            prop_assert_eq!(first, second);
            prop_assert_eq!(registry.len(), 1);
        }
    }
}
