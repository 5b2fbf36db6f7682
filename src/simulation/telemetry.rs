//! Per-cycle telemetry snapshots
//!
//! One snapshot is recorded each control cycle. The log is append-only with
//! the newest record last, and can be mirrored to a CSV file.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use super::types::IntersectionId;

/// Queue lengths seen at one intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntersectionQueues {
    pub id: IntersectionId,
    pub ns_queue: usize,
    pub ew_queue: usize,
}

/// Network-wide counts at one control cycle
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub timestamp: f64,
    pub total_vehicles: usize,
    pub emergency_count: usize,
    pub bus_count: usize,
    pub car_count: usize,
    pub per_intersection: Vec<IntersectionQueues>,
}

/// Flat CSV row for a snapshot
#[derive(Debug, Serialize)]
struct SnapshotRecord {
    timestamp: f64,
    total_vehicles: usize,
    emergency_vehicles: usize,
    buses: usize,
    cars: usize,
    intersection_data: String,
}

impl From<&Snapshot> for SnapshotRecord {
    fn from(snapshot: &Snapshot) -> Self {
        let intersection_data = snapshot
            .per_intersection
            .iter()
            .map(|q| format!("{}:{}/{}", q.id, q.ns_queue, q.ew_queue))
            .collect::<Vec<_>>()
            .join(";");
        Self {
            timestamp: snapshot.timestamp,
            total_vehicles: snapshot.total_vehicles,
            emergency_vehicles: snapshot.emergency_count,
            buses: snapshot.bus_count,
            cars: snapshot.car_count,
            intersection_data,
        }
    }
}

/// Appends snapshot rows to a CSV file
pub struct CsvSink {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl CsvSink {
    /// Open `path` for appending. A header is written only if the file is new
    /// or empty.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let needs_header = std::fs::metadata(&path)
            .map(|meta| meta.len() == 0)
            .unwrap_or(true);
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .with_context(|| format!("Failed to open telemetry file {}", path.display()))?;
        let writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        Ok(Self { path, writer })
    }

    pub fn write(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.writer
            .serialize(SnapshotRecord::from(snapshot))
            .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Append-only snapshot history
#[derive(Default)]
pub struct TelemetryLog {
    records: Vec<Snapshot>,
    sink: Option<CsvSink>,
}

impl TelemetryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_sink(&mut self, sink: CsvSink) {
        self.sink = Some(sink);
    }

    /// Append a snapshot, mirroring it to the CSV sink if one is attached
    pub fn record(&mut self, snapshot: Snapshot) -> Result<()> {
        let written = match &mut self.sink {
            Some(sink) => sink.write(&snapshot),
            None => Ok(()),
        };
        self.records.push(snapshot);
        written
    }

    pub fn records(&self) -> &[Snapshot] {
        &self.records
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
