//! Domain types for sensor readings.
//!
//! A reading is a single pollutant-concentration observation from one of the
//! sensing modalities. Timestamps are timezone-naive; upstream data is
//! assumed to be recorded in a single local timezone.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The sensing modality that produced a reading series.
///
/// Each source is modeled independently with its own regressor/scaler pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Ground-based monitoring station
    Ground,
    /// Satellite-derived column measurement
    Satellite,
}

impl Source {
    /// All known sources, in a fixed order.
    pub const ALL: [Source; 2] = [Source::Ground, Source::Satellite];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Ground => "ground",
            Source::Satellite => "satellite",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown source name.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown source {0:?} (expected \"ground\" or \"satellite\")")]
pub struct ParseSourceError(String);

impl FromStr for Source {
    type Err = ParseSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ground" => Ok(Source::Ground),
            "satellite" => Ok(Source::Satellite),
            other => Err(ParseSourceError(other.to_string())),
        }
    }
}

/// A single observed pollutant concentration.
///
/// For a given source, readings are uniquely keyed by `(source, timestamp)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Sensing modality that produced this observation
    pub source: Source,
    /// Pollutant concentration
    pub value: f64,
    /// Observation time (timezone-naive)
    pub timestamp: NaiveDateTime,
}

impl Reading {
    pub fn new(source: Source, value: f64, timestamp: NaiveDateTime) -> Self {
        Self {
            source,
            value,
            timestamp,
        }
    }
}
