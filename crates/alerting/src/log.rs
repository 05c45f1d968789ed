//! Append-only NDJSON event log

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::{AlertError, AlertRecord};

/// File name inside the log directory
pub const EVENT_LOG_FILE: &str = "events.ndjson";

/// One JSON record per line, flushed after every record
pub struct EventLog {
    path: PathBuf,
    writer: BufWriter<File>,
    written: u64,
}

impl EventLog {
    /// Open (or create) `events.ndjson` under `log_dir`
    pub fn open(log_dir: impl AsRef<Path>) -> Result<Self, AlertError> {
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)?;

        let path = log_dir.join(EVENT_LOG_FILE);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!("Event log opened: {}", path.display());

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn append(&mut self, record: &AlertRecord) -> Result<(), AlertError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended through this handle
    pub fn written(&self) -> u64 {
        self.written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AlertKind, Severity};
    use chrono::Utc;

    fn mismatch(frame: u64) -> AlertRecord {
        AlertRecord {
            timestamp: Utc::now(),
            frame,
            kind: AlertKind::HeadcountMismatch {
                detected_count: 2,
                expected_count: 3,
                mode_count: 2,
                severity: Severity::High,
            },
        }
    }

    #[test]
    fn test_appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = EventLog::open(dir.path().join("logs")).unwrap();
        log.append(&mismatch(1)).unwrap();
        log.append(&mismatch(2)).unwrap();
        assert_eq!(log.written(), 2);

        let contents = fs::read_to_string(log.path()).unwrap();
        let frames: Vec<u64> = contents
            .lines()
            .map(|line| serde_json::from_str::<AlertRecord>(line).unwrap().frame)
            .collect();
        assert_eq!(frames, vec![1, 2]);
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempfile::tempdir().unwrap();
        EventLog::open(dir.path()).unwrap().append(&mismatch(1)).unwrap();
        EventLog::open(dir.path()).unwrap().append(&mismatch(2)).unwrap();

        let contents = fs::read_to_string(dir.path().join(EVENT_LOG_FILE)).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
