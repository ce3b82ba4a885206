//! This module handles logging of presence readings to a CSV file.
//! It defines the `PresenceSample` row type, the `PresenceLogger` that buffers
//! samples and appends them to disk, and `PresenceTracker` which turns a stream
//! of samples into arrival/departure transitions.
//!

use std::error::Error;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::Local;
use rd03::SensorReading;
use serde::Serialize;
use tracing::{info, warn};

/// One decoded RD-03 frame, as stored in the CSV log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PresenceSample {
    /// Timestamp of the reading in seconds since UNIX epoch.
    pub timestamp_s: u64,
    /// Presence flag as sent by the sensor.
    pub someone_present: bool,
    /// Raw distance byte.
    pub distance_code: u8,
    /// Presence gated by the configured distance window.
    pub in_window: bool,
}

impl PresenceSample {
    pub fn new(timestamp_s: u64, reading: SensorReading, in_window: bool) -> Self {
        Self {
            timestamp_s,
            someone_present: reading.someone_present,
            distance_code: reading.distance_code,
            in_window,
        }
    }
}

/// Change in gated presence between two consecutive samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Arrived { timestamp_s: u64, distance_code: u8 },
    Left { timestamp_s: u64, present_for_s: u64 },
}

/// Remembers the previous gated presence and reports edges.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    present_since: Option<u64>,
}

impl PresenceTracker {
    pub fn is_present(&self) -> bool {
        self.present_since.is_some()
    }

    pub fn update(&mut self, sample: &PresenceSample) -> Option<Transition> {
        match (self.present_since, sample.in_window) {
            (None, true) => {
                self.present_since = Some(sample.timestamp_s);
                Some(Transition::Arrived {
                    timestamp_s: sample.timestamp_s,
                    distance_code: sample.distance_code,
                })
            }
            (Some(since), false) => {
                self.present_since = None;
                Some(Transition::Left {
                    timestamp_s: sample.timestamp_s,
                    present_for_s: sample.timestamp_s.saturating_sub(since),
                })
            }
            _ => None,
        }
    }
}

/// Logger for presence samples.
///
/// Samples are buffered and appended to a CSV file named after the session start
/// time once `flush_every` of them have accumulated. Implements `Drop` so the
/// tail of the buffer is written when the logger goes away.
#[derive(Debug)]
pub struct PresenceLogger {
    /// Samples not yet written.
    buffer: Vec<PresenceSample>,
    /// Number of samples to buffer before flushing.
    flush_every: usize,
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl Drop for PresenceLogger {
    fn drop(&mut self) {
        info!("Presence logging ended, flushing final data.");
        if let Err(e) = self.flush() {
            warn!("Failed to flush data on drop: {}", e);
        }
    }
}

impl PresenceLogger {
    /// Creates `presence_<YYYY-mm-dd_HH-MM-SS>.csv` under `data_path` and writes the header row.
    pub fn new(data_path: &str, flush_every: usize) -> Result<Self, Box<dyn Error>> {
        let file_name = format!("presence_{}.csv", Local::now().format("%Y-%m-%d_%H-%M-%S"));
        Self::create(Path::new(data_path).join(file_name), flush_every)
    }

    /// Creates (or truncates) the CSV file at `path`.
    pub fn create(path: impl Into<PathBuf>, flush_every: usize) -> Result<Self, Box<dyn Error>> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        let writer = csv::WriterBuilder::new().has_headers(true).from_writer(file);
        info!("Presence log created at {}.", path.display());

        Ok(Self {
            buffer: Vec::new(),
            flush_every: flush_every.max(1),
            path,
            writer,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Samples buffered but not yet on disk.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Appends a sample to the buffer, flushing once `flush_every` are held.
    #[tracing::instrument(skip(self, sample))]
    pub fn append(&mut self, sample: PresenceSample) -> Result<(), Box<dyn Error>> {
        self.buffer.push(sample);
        if self.buffer.len() >= self.flush_every {
            self.flush()?;
        }
        Ok(())
    }

    /// Writes the buffered samples to the CSV file.
    #[tracing::instrument(skip(self))]
    pub fn flush(&mut self) -> Result<(), Box<dyn Error>> {
        let buffer = std::mem::take(&mut self.buffer);
        if buffer.is_empty() {
            return Ok(());
        }
        for sample in &buffer {
            self.writer.serialize(sample)?;
        }
        self.writer.flush()?;
        info!("Flushed {} samples to {}", buffer.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn sample(timestamp_s: u64, in_window: bool) -> PresenceSample {
        PresenceSample {
            timestamp_s,
            someone_present: in_window,
            distance_code: 12,
            in_window,
        }
    }

    #[test]
    fn sample_from_reading() {
        let reading = SensorReading { someone_present: true, distance_code: 40 };
        let s = PresenceSample::new(7, reading, false);
        assert!(s.someone_present);
        assert!(!s.in_window);
        assert_eq!(s.distance_code, 40);
    }

    #[test]
    fn tracker_reports_edges_only() {
        let mut tracker = PresenceTracker::default();
        assert_eq!(tracker.update(&sample(1, false)), None);
        assert_eq!(
            tracker.update(&sample(2, true)),
            Some(Transition::Arrived { timestamp_s: 2, distance_code: 12 })
        );
        assert!(tracker.is_present());
        assert_eq!(tracker.update(&sample(3, true)), None);
        assert_eq!(
            tracker.update(&sample(9, false)),
            Some(Transition::Left { timestamp_s: 9, present_for_s: 7 })
        );
        assert!(!tracker.is_present());
    }

    #[test]
    fn logger_flushes_in_batches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let mut logger = PresenceLogger::create(&path, 2).unwrap();

        logger.append(sample(1, true)).unwrap();
        assert_eq!(logger.pending(), 1);
        logger.append(sample(2, false)).unwrap();
        assert_eq!(logger.pending(), 0);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "timestamp_s,someone_present,distance_code,in_window");
        assert_eq!(lines[1], "1,true,12,true");
        assert_eq!(lines[2], "2,false,12,false");
    }

    #[test]
    fn drop_flushes_remainder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        {
            let mut logger = PresenceLogger::create(&path, 100).unwrap();
            logger.append(sample(5, true)).unwrap();
            assert_eq!(logger.pending(), 1);
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn new_names_file_by_session_start() {
        let dir = tempfile::tempdir().unwrap();
        let logger = PresenceLogger::new(dir.path().to_str().unwrap(), 10).unwrap();
        let name = logger.path().file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("presence_"));
        assert!(name.ends_with(".csv"));
    }
}
