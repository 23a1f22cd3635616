//! In-memory reading store.
//!
//! Readings are kept per source, always sorted ascending by timestamp, so
//! callers can slice windows without re-sorting. The store is the "fetch
//! readings for source X" collaborator consumed by the feature builder; it
//! performs no feature logic of its own.

use crate::reading::types::{Reading, Source};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::RwLock;
use thiserror::Error;

/// Errors from loading historical readings off disk.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("csv parse error: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: unparseable timestamp {value:?}")]
    Timestamp { row: usize, value: String },
}

/// Thread-safe, per-source collection of readings.
///
/// Concurrent inserts and reads are safe; each query returns an owned
/// snapshot so no lock is held while features are computed.
#[derive(Debug, Default)]
pub struct ReadingStore {
    inner: RwLock<HashMap<Source, Vec<Reading>>>,
}

impl ReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a reading, keeping the series sorted.
    ///
    /// A reading with the same `(source, timestamp)` as an existing one
    /// replaces it, so re-ingesting a file is idempotent.
    pub fn insert(&self, reading: Reading) {
        let mut inner = self.inner.write().expect("reading store lock poisoned");
        let series = inner.entry(reading.source).or_default();
        match series.binary_search_by(|r| r.timestamp.cmp(&reading.timestamp)) {
            Ok(pos) => series[pos] = reading,
            Err(pos) => series.insert(pos, reading),
        }
    }

    /// Insert a batch of readings.
    pub fn insert_many(&self, readings: impl IntoIterator<Item = Reading>) -> usize {
        let mut count = 0;
        for reading in readings {
            self.insert(reading);
            count += 1;
        }
        count
    }

    /// All readings for a source with `timestamp >= since`, ascending.
    /// Empty if none match.
    pub fn readings_since(&self, source: Source, since: NaiveDateTime) -> Vec<Reading> {
        let inner = self.inner.read().expect("reading store lock poisoned");
        inner
            .get(&source)
            .map(|series| {
                let start = series.partition_point(|r| r.timestamp < since);
                series[start..].to_vec()
            })
            .unwrap_or_default()
    }

    /// The most recent `k` readings for a source, ascending. Returns fewer
    /// than `k` if the series is shorter.
    pub fn recent(&self, source: Source, k: usize) -> Vec<Reading> {
        let inner = self.inner.read().expect("reading store lock poisoned");
        inner
            .get(&source)
            .map(|series| {
                let start = series.len().saturating_sub(k);
                series[start..].to_vec()
            })
            .unwrap_or_default()
    }

    /// The full series for a source, ascending.
    pub fn all(&self, source: Source) -> Vec<Reading> {
        let inner = self.inner.read().expect("reading store lock poisoned");
        inner.get(&source).cloned().unwrap_or_default()
    }

    /// Number of readings held for a source.
    pub fn len(&self, source: Source) -> usize {
        let inner = self.inner.read().expect("reading store lock poisoned");
        inner.get(&source).map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self, source: Source) -> bool {
        self.len(source) == 0
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    value: f64,
}

/// Parse a timestamp as written by common exports: ISO 8601 with a `T`
/// separator, with a space separator, or a bare date.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d"];
    let raw = raw.trim();
    FORMATS.iter().find_map(|fmt| {
        if *fmt == "%Y-%m-%d" {
            chrono::NaiveDate::parse_from_str(raw, fmt)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        } else {
            NaiveDateTime::parse_from_str(raw, fmt).ok()
        }
    })
}

/// Load a `timestamp,value` CSV of historical readings for one source.
///
/// Rows are sorted ascending by timestamp after loading; the file itself
/// does not have to be ordered.
pub fn load_csv(path: impl AsRef<Path>, source: Source) -> Result<Vec<Reading>, StoreError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| StoreError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut reader = csv::Reader::from_reader(file);
    let mut readings = Vec::new();
    for (i, result) in reader.deserialize().enumerate() {
        let row: CsvRow = result?;
        let timestamp = parse_timestamp(&row.timestamp).ok_or(StoreError::Timestamp {
            row: i + 1,
            value: row.timestamp.clone(),
        })?;
        readings.push(Reading::new(source, row.value, timestamp));
    }

    readings.sort_by_key(|r| r.timestamp);
    Ok(readings)
}
