//! Alert Manager Implementation

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::{AlertError, AlertRecord, AlertSink, EventLog, Severity};

/// Alert sink configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Directory holding `events.ndjson`
    pub log_dir: PathBuf,
    /// Number of recent records kept in memory
    pub recent_capacity: usize,
    /// Per-subscriber queue length before it counts as lagging
    pub subscriber_capacity: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            recent_capacity: 100,
            subscriber_capacity: 64,
        }
    }
}

/// Logs, caches and fans out every delivered alert
pub struct AlertManager {
    config: AlertConfig,
    /// None for an in-memory manager
    log: Option<Mutex<EventLog>>,
    recent: Mutex<VecDeque<AlertRecord>>,
    sender: broadcast::Sender<AlertRecord>,
}

impl AlertManager {
    /// Create a manager writing to `config.log_dir`
    pub fn new(config: AlertConfig) -> Result<Self, AlertError> {
        let log = EventLog::open(&config.log_dir)?;
        info!("Alert manager initialized: {}", log.path().display());
        Ok(Self::build(config, Some(log)))
    }

    /// Create a manager without an event log file
    pub fn in_memory(config: AlertConfig) -> Self {
        debug!("Alert manager running without an event log");
        Self::build(config, None)
    }

    fn build(config: AlertConfig, log: Option<EventLog>) -> Self {
        let (sender, _) = broadcast::channel(config.subscriber_capacity.max(1));
        Self {
            recent: Mutex::new(VecDeque::with_capacity(config.recent_capacity)),
            log: log.map(Mutex::new),
            sender,
            config,
        }
    }

    /// Receive every record delivered from now on
    pub fn subscribe(&self) -> broadcast::Receiver<AlertRecord> {
        let receiver = self.sender.subscribe();
        info!(
            "Event subscriber connected (total: {})",
            self.sender.receiver_count()
        );
        receiver
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// The last `limit` records, oldest first
    pub fn recent(&self, limit: usize) -> Result<Vec<AlertRecord>, AlertError> {
        let recent = self
            .recent
            .lock()
            .map_err(|e| AlertError::Lock(e.to_string()))?;
        let skip = recent.len().saturating_sub(limit);
        Ok(recent.iter().skip(skip).cloned().collect())
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    fn write_log(&self, record: &AlertRecord) -> Result<(), AlertError> {
        let Some(log) = &self.log else {
            return Ok(());
        };
        log.lock()
            .map_err(|e| AlertError::Lock(e.to_string()))?
            .append(record)
    }

    fn remember(&self, record: &AlertRecord) -> Result<(), AlertError> {
        if self.config.recent_capacity == 0 {
            return Ok(());
        }
        let mut recent = self
            .recent
            .lock()
            .map_err(|e| AlertError::Lock(e.to_string()))?;
        if recent.len() >= self.config.recent_capacity {
            recent.pop_front();
        }
        recent.push_back(record.clone());
        Ok(())
    }
}

impl AlertSink for AlertManager {
    /// Write, cache and broadcast. A log failure is reported after the record
    /// has still reached the cache and live subscribers.
    fn deliver(&self, record: &AlertRecord) -> Result<(), AlertError> {
        match record.severity() {
            Severity::Critical | Severity::High => warn!("ALERT: {}", record),
            _ => info!("Alert: {}", record),
        }

        let logged = self.write_log(record);
        if let Err(e) = &logged {
            error!("Failed to write event log: {}", e);
        }

        self.remember(record)?;

        // No receivers is not an error
        if let Ok(count) = self.sender.send(record.clone()) {
            debug!("{} broadcast to {} subscribers", record.kind.name(), count);
        }

        logged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AlertKind;
    use chrono::Utc;
    use tokio::sync::broadcast::error::TryRecvError;

    fn person_down(frame: u64) -> AlertRecord {
        AlertRecord {
            timestamp: Utc::now(),
            frame,
            kind: AlertKind::PersonDown {
                person_id: 1,
                location: [10.0, 10.0],
                confidence: 0.9,
            },
        }
    }

    fn manager(recent_capacity: usize) -> AlertManager {
        AlertManager::in_memory(AlertConfig {
            recent_capacity,
            ..Default::default()
        })
    }

    #[test]
    fn test_recent_is_bounded_and_ordered() {
        let manager = manager(3);
        for frame in 0..5 {
            manager.deliver(&person_down(frame)).unwrap();
        }

        let frames: Vec<u64> = manager.recent(10).unwrap().iter().map(|r| r.frame).collect();
        assert_eq!(frames, vec![2, 3, 4]);

        let last_two: Vec<u64> = manager.recent(2).unwrap().iter().map(|r| r.frame).collect();
        assert_eq!(last_two, vec![3, 4]);
    }

    #[test]
    fn test_subscribers_receive_records() {
        let manager = manager(10);
        let mut first = manager.subscribe();
        let mut second = manager.subscribe();
        assert_eq!(manager.subscriber_count(), 2);

        manager.deliver(&person_down(7)).unwrap();
        assert_eq!(first.try_recv().unwrap().frame, 7);
        assert_eq!(second.try_recv().unwrap().frame, 7);
        assert!(matches!(first.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_deliver_without_subscribers() {
        let manager = manager(10);
        assert!(manager.deliver(&person_down(1)).is_ok());
        assert_eq!(manager.recent(10).unwrap().len(), 1);
    }

    #[test]
    fn test_slow_subscriber_lags() {
        let manager = AlertManager::in_memory(AlertConfig {
            subscriber_capacity: 2,
            ..Default::default()
        });
        let mut slow = manager.subscribe();
        for frame in 0..5 {
            manager.deliver(&person_down(frame)).unwrap();
        }
        assert!(matches!(slow.try_recv(), Err(TryRecvError::Lagged(_))));
    }

    #[test]
    fn test_writes_event_log() {
        let dir = tempfile::tempdir().unwrap();
        let manager = AlertManager::new(AlertConfig {
            log_dir: dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();
        manager.deliver(&person_down(1)).unwrap();
        manager.deliver(&person_down(2)).unwrap();

        let contents = std::fs::read_to_string(dir.path().join(crate::EVENT_LOG_FILE)).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.lines().all(|l| l.contains("\"type\":\"PersonDown\"")));
    }
}
