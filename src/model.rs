/// Shared data types for the sea-state event service.
///
/// Everything the ingest, analysis, and report layers pass between each
/// other lives here, along with the error types each layer can raise.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDateTime;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Data kinds
// ---------------------------------------------------------------------------

/// Conversion factor from metres per second (ERA5 wind components) to knots.
pub const MS_TO_KNOTS: f64 = 1.94384;

/// The two event families the service counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    /// Gale-force wind episodes (wind speed in knots).
    Storm,
    /// High-wave episodes (significant wave height in metres).
    Wave,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Storm => "storm",
            DataKind::Wave => "wave",
        }
    }

    /// Grid variables the intensity is derived from.
    pub fn variables(&self) -> &'static [&'static str] {
        match self {
            DataKind::Storm => &["u10", "v10"],
            DataKind::Wave => &["swh"],
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "storm" => Ok(DataKind::Storm),
            "wave" => Ok(DataKind::Wave),
            other => Err(ConfigError::Invalid(format!("unknown data type '{}'", other))),
        }
    }
}

/// Which data kinds a run processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSelection {
    Storm,
    Wave,
    Both,
}

impl DataSelection {
    /// Kinds in processing order. `Both` runs storm before wave.
    pub fn kinds(&self) -> Vec<DataKind> {
        match self {
            DataSelection::Storm => vec![DataKind::Storm],
            DataSelection::Wave => vec![DataKind::Wave],
            DataSelection::Both => vec![DataKind::Storm, DataKind::Wave],
        }
    }
}

impl FromStr for DataSelection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "both" => Ok(DataSelection::Both),
            other => other.parse::<DataKind>().map(|kind| match kind {
                DataKind::Storm => DataSelection::Storm,
                DataKind::Wave => DataSelection::Wave,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline parameters
// ---------------------------------------------------------------------------

/// Per-invocation parameters of the event-detection pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct EventParams {
    /// Intensity a grid cell must meet or exceed (knots or metres).
    pub threshold: f64,
    /// Fraction of a region's cells that must exceed `threshold` for the
    /// hour to count as active.
    pub spatial_proportion: f64,
    /// Minimum run length, in hours.
    pub min_duration_hours: usize,
    /// Minimum spacing between an active hour and the previous one for the
    /// later hour to start a new cluster.
    pub intervening_hours: usize,
    /// Force the first hour inactive before run extraction so an event
    /// already in progress when the record begins is not counted.
    pub suppress_first_hour: bool,
}

impl EventParams {
    pub fn for_kind(kind: DataKind) -> Self {
        match kind {
            DataKind::Storm => EventParams {
                threshold: 34.0,
                spatial_proportion: 0.25,
                min_duration_hours: 3,
                intervening_hours: 96,
                suppress_first_hour: false,
            },
            DataKind::Wave => EventParams {
                threshold: 5.0,
                spatial_proportion: 0.25,
                min_duration_hours: 3,
                intervening_hours: 96,
                suppress_first_hour: true,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Gridded input
// ---------------------------------------------------------------------------

/// Hourly gridded intensity values.
///
/// `values` is row-major `[hour][lat][lon]`. Missing cells (land in the wave
/// product, for example) are `None` and never meet a threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityField {
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
    pub times: Vec<NaiveDateTime>,
    pub values: Vec<Option<f64>>,
}

impl IntensityField {
    /// Number of grid cells per hour.
    pub fn cell_count(&self) -> usize {
        self.latitude.len() * self.longitude.len()
    }

    pub fn hour_count(&self) -> usize {
        self.times.len()
    }

    /// All cell values for one hour, in `[lat][lon]` order.
    pub fn hour(&self, index: usize) -> &[Option<f64>] {
        let cells = self.cell_count();
        &self.values[index * cells..(index + 1) * cells]
    }
}

/// Region label for every grid cell, in the same `[lat][lon]` order as
/// `IntensityField`. `None` marks cells outside every region.
pub type RegionMask = Vec<Option<usize>>;

// ---------------------------------------------------------------------------
// Derived series
// ---------------------------------------------------------------------------

/// One coverage fraction per hour.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageSeries {
    pub region: usize,
    pub points: Vec<(NaiveDateTime, f64)>,
}

impl CoverageSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Per-hour active flags, aligned index-for-index with a `CoverageSeries`.
pub type Indicator = Vec<bool>;

/// A maximal contiguous span of active hours; `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub start: usize,
    pub end: usize,
}

impl Run {
    pub fn duration(&self) -> usize {
        self.end - self.start
    }
}

/// Event counts per calendar year over a closed year range.
///
/// Every year of the range is present, even when no data existed for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnualCount {
    counts: BTreeMap<i32, usize>,
}

impl AnnualCount {
    /// An all-zero table covering `start_year..=end_year`.
    pub fn zeroed(start_year: i32, end_year: i32) -> Self {
        AnnualCount {
            counts: (start_year..=end_year).map(|year| (year, 0)).collect(),
        }
    }

    /// Adds one event to `year`. Years outside the range are ignored.
    pub fn record(&mut self, year: i32) {
        if let Some(count) = self.counts.get_mut(&year) {
            *count += 1;
        }
    }

    pub fn get(&self, year: i32) -> Option<usize> {
        self.counts.get(&year).copied()
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.counts.keys().copied()
    }

    /// `(year, count)` pairs in ascending year order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, usize)> + '_ {
        self.counts.iter().map(|(year, count)| (*year, *count))
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures of a single region's detection pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventError {
    /// The region has no member cells, so coverage would divide by zero.
    #[error("region {0} has no member grid cells")]
    EmptyRegion(usize),
    /// The worker running the region stopped before reporting a result.
    #[error("region {0} pipeline panicked")]
    WorkerLost(usize),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Malformed or unreadable grid and geojson input.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read NetCDF {path}: {source}")]
    NetCdf {
        path: PathBuf,
        #[source]
        source: netcdf::Error,
    },
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("{path} has no '{variable}' variable")]
    MissingVariable { path: PathBuf, variable: String },
    #[error("{path}: expected {expected} values, found {found}")]
    ShapeMismatch {
        path: PathBuf,
        expected: usize,
        found: usize,
    },
    #[error("{path} uses a different grid than the files before it")]
    GridMismatch { path: PathBuf },
    #[error("no {kind} data files found for {start_year}-{end_year}")]
    NoData {
        kind: DataKind,
        start_year: i32,
        end_year: i32,
    },
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Fatal errors that end a whole processing run.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Report(#[from] ReportError),
}
