/// ERA5 NetCDF reading.
///
/// A yearly file carries the `latitude` and `longitude` axes, an hourly
/// time axis (`time` in older downloads, `valid_time` in newer ones) encoded
/// as `<unit> since <reference>`, and the data variables shaped
/// `(time, latitude, longitude)`.
///
/// Data variables are usually packed as 16-bit integers. A raw value equal
/// to `_FillValue` or `missing_value` is missing; everything else is
/// unpacked as `raw * scale_factor + add_offset`.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use netcdf::{AttributeValue, Variable};

use super::grid::GridVariables;
use crate::model::IngestError;

const TIME_VARIABLES: [&str; 2] = ["time", "valid_time"];

// ---------------------------------------------------------------------------
// Packing
// ---------------------------------------------------------------------------

/// CF packing attributes of one data variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Packing {
    pub fill_value: Option<f64>,
    pub missing_value: Option<f64>,
    pub scale_factor: f64,
    pub add_offset: f64,
}

impl Default for Packing {
    fn default() -> Self {
        Self {
            fill_value: None,
            missing_value: None,
            scale_factor: 1.0,
            add_offset: 0.0,
        }
    }
}

impl Packing {
    fn from_variable(var: &Variable<'_>) -> Self {
        Self {
            fill_value: numeric_attribute(var, "_FillValue"),
            missing_value: numeric_attribute(var, "missing_value"),
            scale_factor: numeric_attribute(var, "scale_factor").unwrap_or(1.0),
            add_offset: numeric_attribute(var, "add_offset").unwrap_or(0.0),
        }
    }

    /// Physical value of one raw sample, or `None` when it is missing.
    pub fn unpack(&self, raw: f64) -> Option<f64> {
        if raw.is_nan() || Some(raw) == self.fill_value || Some(raw) == self.missing_value {
            return None;
        }
        Some(raw * self.scale_factor + self.add_offset)
    }
}

fn numeric_attribute(var: &Variable<'_>, name: &str) -> Option<f64> {
    let value = var.attribute(name)?.value().ok()?;
    match value {
        AttributeValue::Double(v) => Some(v),
        AttributeValue::Float(v) => Some(v as f64),
        AttributeValue::Short(v) => Some(v as f64),
        AttributeValue::Ushort(v) => Some(v as f64),
        AttributeValue::Int(v) => Some(v as f64),
        AttributeValue::Uint(v) => Some(v as f64),
        AttributeValue::Longlong(v) => Some(v as f64),
        AttributeValue::Ulonglong(v) => Some(v as f64),
        AttributeValue::Schar(v) => Some(v as f64),
        AttributeValue::Uchar(v) => Some(v as f64),
        AttributeValue::Doubles(v) => v.first().copied(),
        AttributeValue::Floats(v) => v.first().map(|v| *v as f64),
        AttributeValue::Shorts(v) => v.first().map(|v| *v as f64),
        AttributeValue::Ints(v) => v.first().map(|v| *v as f64),
        _ => None,
    }
}

fn string_attribute(var: &Variable<'_>, name: &str) -> Option<String> {
    match var.attribute(name)?.value().ok()? {
        AttributeValue::Str(s) => Some(s),
        AttributeValue::Strs(mut s) if !s.is_empty() => Some(s.swap_remove(0)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Time axis
// ---------------------------------------------------------------------------

/// Decodes CF time offsets such as `hours since 1900-01-01 00:00:00.0`.
pub fn decode_time_axis(units: &str, offsets: &[f64]) -> Result<Vec<NaiveDateTime>, String> {
    let (unit, reference) = units
        .split_once(" since ")
        .ok_or_else(|| format!("unsupported time units '{}'", units))?;

    let seconds_per_unit = match unit.trim().to_lowercase().as_str() {
        "seconds" | "second" | "s" => 1.0,
        "minutes" | "minute" => 60.0,
        "hours" | "hour" | "h" => 3600.0,
        "days" | "day" | "d" => 86400.0,
        other => return Err(format!("unsupported time unit '{}'", other)),
    };
    let reference = parse_reference(reference)
        .ok_or_else(|| format!("unsupported time reference '{}'", reference.trim()))?;

    Ok(offsets
        .iter()
        .map(|offset| reference + Duration::seconds((offset * seconds_per_unit).round() as i64))
        .collect())
}

fn parse_reference(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim().trim_end_matches("UTC").trim_end_matches('Z').trim();
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Reads the axes and the named data variables from one NetCDF file.
///
/// # Errors
/// - `IngestError::NetCdf` when the file cannot be opened or read.
/// - `IngestError::MissingVariable` for an absent axis or data variable.
/// - `IngestError::Parse` for undecodable time units or a data variable that
///   is not three-dimensional.
/// - `IngestError::ShapeMismatch` when a data variable does not match the axes.
pub fn read_grid(path: &Path, variables: &[&str]) -> Result<GridVariables, IngestError> {
    let netcdf_error = |source: netcdf::Error| IngestError::NetCdf {
        path: path.to_path_buf(),
        source,
    };
    let missing = |variable: &str| IngestError::MissingVariable {
        path: path.to_path_buf(),
        variable: variable.to_string(),
    };

    let file = netcdf::open(path).map_err(netcdf_error)?;

    let read_axis = |name: &str| -> Result<Vec<f64>, IngestError> {
        let var = file.variable(name).ok_or_else(|| missing(name))?;
        var.get_values::<f64, _>(..).map_err(netcdf_error)
    };
    let latitude = read_axis("latitude")?;
    let longitude = read_axis("longitude")?;

    let time_var = TIME_VARIABLES
        .iter()
        .find_map(|name| file.variable(name))
        .ok_or_else(|| missing("time"))?;
    let units = string_attribute(&time_var, "units").ok_or_else(|| IngestError::Parse {
        path: path.to_path_buf(),
        message: "time variable has no units".to_string(),
    })?;
    let offsets = time_var.get_values::<f64, _>(..).map_err(netcdf_error)?;
    let times = decode_time_axis(&units, &offsets).map_err(|message| IngestError::Parse {
        path: path.to_path_buf(),
        message,
    })?;

    let expected = times.len() * latitude.len() * longitude.len();
    let mut data = BTreeMap::new();
    for &name in variables {
        let var = file.variable(name).ok_or_else(|| missing(name))?;
        let dims = var.dimensions();
        if dims.len() != 3 {
            return Err(IngestError::Parse {
                path: path.to_path_buf(),
                message: format!("'{}' has {} dimensions, expected (time, latitude, longitude)", name, dims.len()),
            });
        }

        let packing = Packing::from_variable(&var);
        let raw = var.get_values::<f64, _>(..).map_err(netcdf_error)?;
        if raw.len() != expected {
            return Err(IngestError::ShapeMismatch {
                path: path.to_path_buf(),
                expected,
                found: raw.len(),
            });
        }
        data.insert(name.to_string(), raw.into_iter().map(|r| packing.unpack(r)).collect());
    }

    Ok(GridVariables {
        latitude,
        longitude,
        times,
        data,
    })
}
