//! Detection Logger Implementation

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, error, info, warn};

use crate::{DetectionEvent, DetectionStats, Metadata, StorageError};

const LOG_FILE_NAME: &str = "detections.jsonl";

/// Running counters since process start. Not persisted, never reported.
#[derive(Debug, Default)]
struct StatsCache {
    by_class: HashMap<String, u64>,
    total_detections: u64,
    total_alerts_sent: u64,
}

/// Append-only detection log backed by a JSON Lines file
pub struct DetectionLogger {
    /// Directory holding the log
    log_dir: PathBuf,
    /// The log file
    log_file: PathBuf,
    /// Serializes appends and deletion; guards the running counters
    writer: Mutex<StatsCache>,
}

impl DetectionLogger {
    /// Open (and create if needed) the log directory
    pub fn new(log_dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let log_dir = log_dir.as_ref().to_path_buf();
        fs::create_dir_all(&log_dir)?;
        let log_file = log_dir.join(LOG_FILE_NAME);

        info!("Detection logger initialized: {}", log_file.display());
        Ok(Self {
            log_dir,
            log_file,
            writer: Mutex::new(StatsCache::default()),
        })
    }

    /// Path of the log file
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Append one detection record
    pub fn log_detection(
        &self,
        class_name: &str,
        confidence: f64,
        timestamp: &str,
        alert_sent: bool,
        metadata: Option<Metadata>,
    ) -> Result<(), StorageError> {
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(StorageError::InvalidConfidence(confidence));
        }

        let event = DetectionEvent {
            timestamp: timestamp.to_string(),
            class_name: class_name.to_string(),
            confidence,
            alert_sent,
            metadata: metadata.unwrap_or_default(),
        };
        let line = serde_json::to_vec(&event)?;

        let mut cache = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        self.append_line(&line)?;

        *cache.by_class.entry(event.class_name).or_insert(0) += 1;
        cache.total_detections += 1;
        if alert_sent {
            cache.total_alerts_sent += 1;
        }

        info!("Detection logged: {} ({:.2})", class_name, confidence);
        debug!(
            "{} detections, {} alerts recorded since start",
            cache.total_detections, cache.total_alerts_sent
        );
        Ok(())
    }

    /// Write one record as a full line, terminating a torn previous line first
    fn append_line(&self, line: &[u8]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.log_dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.log_file)?;

        let mut buf = Vec::with_capacity(line.len() + 2);
        if file.metadata()?.len() > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1))?;
            file.read_exact(&mut last)?;
            if last[0] != b'\n' {
                warn!("Detection log ended mid-record, starting a new line");
                buf.push(b'\n');
            }
        }
        buf.extend_from_slice(line);
        buf.push(b'\n');

        file.write_all(&buf)?;
        file.flush()?;
        Ok(())
    }

    /// Every readable record in log order. Malformed lines are skipped.
    pub fn detections(&self) -> Result<Vec<DetectionEvent>, StorageError> {
        let file = match File::open(&self.log_file) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut events = Vec::new();
        for (index, line) in BufReader::new(file).split(b'\n').enumerate() {
            let line = line?;
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<DetectionEvent>(&line) {
                Ok(event) => events.push(event),
                Err(e) => warn!("Skipping malformed detection record at line {}: {}", index + 1, e),
            }
        }
        Ok(events)
    }

    /// Statistics recomputed from the persisted log; zeroed on read failure
    pub fn get_stats(&self) -> DetectionStats {
        match self.detections() {
            Ok(events) => DetectionStats::from_events(events),
            Err(e) => {
                error!("Failed to read detection log for stats: {}", e);
                DetectionStats::default()
            }
        }
    }

    /// Records whose timestamp starts with `date` (e.g. "2024-01-15")
    pub fn get_detections_by_date(&self, date: &str) -> Vec<DetectionEvent> {
        match self.detections() {
            Ok(events) => events
                .into_iter()
                .filter(|e| e.timestamp.starts_with(date))
                .collect(),
            Err(e) => {
                error!("Failed to read detection log for {}: {}", date, e);
                Vec::new()
            }
        }
    }

    /// Delete the persisted log and reset the running counters. Irreversible.
    pub fn clear_logs(&self) -> Result<(), StorageError> {
        let mut cache = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        match fs::remove_file(&self.log_file) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        *cache = StatsCache::default();

        info!("Detection log cleared");
        Ok(())
    }
}
