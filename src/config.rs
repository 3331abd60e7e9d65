/// Processing configuration loader - parses seastate.toml
///
/// Keeps thresholds, the year range, region selection, and file locations
/// out of the code so a run can be retuned without recompiling.
///
/// ```toml
/// [general]
/// start_year = 1959
/// end_year = 2022
/// data_type = "both"      # "storm", "wave" or "both"
/// output_type = "csv"     # "csv" or "json"
/// regions = [0, 1, 2, 3, 4]
///
/// [storm]
/// threshold = 34.0        # knots
///
/// [wave]
/// threshold = 5.0         # metres
/// ```

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::model::{ConfigError, DataKind, DataSelection, EventParams};

/// Config file used when neither `--config` nor `SEASTATE_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "seastate.toml";

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "SEASTATE_CONFIG";

/// Report file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    Csv,
    Json,
}

impl OutputType {
    /// Unknown names fall back to CSV.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "json" => OutputType::Json,
            _ => OutputType::Csv,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputType::Csv => "csv",
            OutputType::Json => "json",
        }
    }
}

// ---------------------------------------------------------------------------
// TOML structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawConfig {
    general: GeneralSection,
    #[serde(default)]
    storm: KindSection,
    #[serde(default)]
    wave: KindSection,
}

#[derive(Debug, Deserialize)]
struct GeneralSection {
    start_year: i32,
    end_year: i32,
    #[serde(default = "default_data_type")]
    data_type: String,
    #[serde(default = "default_output_type")]
    output_type: String,
    #[serde(default = "default_regions")]
    regions: Vec<usize>,
    #[serde(default = "default_geojson_file")]
    geojson_file: PathBuf,
    #[serde(default = "default_data_dir")]
    data_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    output_dir: PathBuf,
}

/// A `[storm]` or `[wave]` section. Missing keys take the kind's defaults.
#[derive(Debug, Default, Deserialize)]
struct KindSection {
    threshold: Option<f64>,
    duration_hours: Option<usize>,
    intervening_hours: Option<usize>,
    spatial_proportion: Option<f64>,
    file_base_name: Option<String>,
}

fn default_data_type() -> String {
    "both".to_string()
}

fn default_output_type() -> String {
    "csv".to_string()
}

fn default_regions() -> Vec<usize> {
    (0..5).collect()
}

fn default_geojson_file() -> PathBuf {
    PathBuf::from("geojson/NES_5REGIONS.json")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Settings for one data kind after defaults are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct KindConfig {
    pub kind: DataKind,
    pub threshold: f64,
    pub duration_hours: usize,
    pub intervening_hours: usize,
    pub spatial_proportion: f64,
    pub file_base_name: String,
}

impl KindConfig {
    fn resolve(kind: DataKind, section: KindSection) -> Self {
        let defaults = EventParams::for_kind(kind);
        let default_base_name = match kind {
            DataKind::Storm => "Atlantic_stormy_",
            DataKind::Wave => "Atlantic_waves_",
        };

        KindConfig {
            kind,
            threshold: section.threshold.unwrap_or(defaults.threshold),
            duration_hours: section.duration_hours.unwrap_or(defaults.min_duration_hours),
            intervening_hours: section.intervening_hours.unwrap_or(defaults.intervening_hours),
            spatial_proportion: section.spatial_proportion.unwrap_or(defaults.spatial_proportion),
            file_base_name: section.file_base_name.unwrap_or_else(|| default_base_name.to_string()),
        }
    }
}

/// Only the wave kind suppresses the first hour of the record.
impl From<&KindConfig> for EventParams {
    fn from(config: &KindConfig) -> Self {
        EventParams {
            threshold: config.threshold,
            spatial_proportion: config.spatial_proportion,
            min_duration_hours: config.duration_hours,
            intervening_hours: config.intervening_hours,
            suppress_first_hour: config.kind == DataKind::Wave,
        }
    }
}

/// Fully resolved processing configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingConfig {
    pub start_year: i32,
    pub end_year: i32,
    pub data_selection: DataSelection,
    pub output_type: OutputType,
    pub regions: Vec<usize>,
    pub geojson_file: PathBuf,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub storm: KindConfig,
    pub wave: KindConfig,
}

impl ProcessingConfig {
    pub fn kind(&self, kind: DataKind) -> &KindConfig {
        match kind {
            DataKind::Storm => &self.storm,
            DataKind::Wave => &self.wave,
        }
    }

    pub fn params(&self, kind: DataKind) -> EventParams {
        self.kind(kind).into()
    }

    /// January 1, 00:00 of the start year. Every hour index in the
    /// pipeline is an offset from here.
    pub fn record_start(&self) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(self.start_year, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or(NaiveDateTime::MIN)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.start_year > self.end_year {
            return Err(ConfigError::Invalid(format!(
                "start_year {} is after end_year {}",
                self.start_year, self.end_year
            )));
        }
        if NaiveDate::from_ymd_opt(self.start_year, 1, 1).is_none() {
            return Err(ConfigError::Invalid(format!("start_year {} is out of range", self.start_year)));
        }
        if self.regions.is_empty() {
            return Err(ConfigError::Invalid("no regions selected".to_string()));
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = self.regions.iter().find(|region| !seen.insert(**region)) {
            return Err(ConfigError::Invalid(format!("region {} is selected more than once", duplicate)));
        }
        for kind in [&self.storm, &self.wave] {
            if !kind.threshold.is_finite() {
                return Err(ConfigError::Invalid(format!("{} threshold must be finite", kind.kind)));
            }
            if !(0.0..=1.0).contains(&kind.spatial_proportion) {
                return Err(ConfigError::Invalid(format!(
                    "{} spatial_proportion {} is outside [0, 1]",
                    kind.kind, kind.spatial_proportion
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Parses configuration text. Relative paths are resolved against `base_dir`.
pub fn parse_config(contents: &str, base_dir: &Path, source: &Path) -> Result<ProcessingConfig, ConfigError> {
    let raw: RawConfig = toml::from_str(contents).map_err(|e| ConfigError::Parse {
        path: source.to_path_buf(),
        source: e,
    })?;

    let general = raw.general;
    let resolve = |p: PathBuf| if p.is_absolute() { p } else { base_dir.join(p) };

    let config = ProcessingConfig {
        start_year: general.start_year,
        end_year: general.end_year,
        data_selection: general.data_type.parse()?,
        output_type: OutputType::from_name(&general.output_type),
        regions: general.regions,
        geojson_file: resolve(general.geojson_file),
        data_dir: resolve(general.data_dir),
        output_dir: resolve(general.output_dir),
        storm: KindConfig::resolve(DataKind::Storm, raw.storm),
        wave: KindConfig::resolve(DataKind::Wave, raw.wave),
    };

    config.validate()?;
    Ok(config)
}

/// Loads and validates the configuration file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ProcessingConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_config(&contents, base_dir, path)
}

/// Picks the config path: explicit argument, then `SEASTATE_CONFIG` (a
/// `.env` file is honoured), then `seastate.toml`.
pub fn config_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    dotenv::dotenv().ok();
    env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}
