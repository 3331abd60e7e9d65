/// Yearly gridded reanalysis files.
///
/// One ERA5 NetCDF file per year, named `<file_base_name><year>.nc`, holding
/// the grid axes, hourly timestamps, and the variables for one data kind.
/// `netcdf_io` does the file decoding; this module turns the decoded
/// variables into a single-intensity field and concatenates the years.
///
/// Years without a file are skipped: they contribute no hours to the
/// concatenated field and are not an error.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, info};

use super::netcdf_io;
use crate::model::{DataKind, IngestError, IntensityField, MS_TO_KNOTS};

/// Decoded contents of one yearly file.
///
/// Every entry of `data` is flattened `[time][lat][lon]`, `None` where the
/// file marks the value missing.
#[derive(Debug, Clone, PartialEq)]
pub struct GridVariables {
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
    pub times: Vec<NaiveDateTime>,
    pub data: BTreeMap<String, Vec<Option<f64>>>,
}

// ---------------------------------------------------------------------------
// Intensity derivation
// ---------------------------------------------------------------------------

/// Wind speed in knots from 10 m wind components in m/s.
pub fn wind_speed_knots(u: f64, v: f64) -> f64 {
    ((u * MS_TO_KNOTS).powi(2) + (v * MS_TO_KNOTS).powi(2)).sqrt()
}

/// Builds the single-intensity field for `kind` from decoded variables.
///
/// Wave files supply `swh` directly. Storm files supply `u10`/`v10`, which
/// are combined into wind speed in knots; a cell missing either component
/// is missing.
pub fn intensity_field(mut grid: GridVariables, kind: DataKind, source: &Path) -> Result<IntensityField, IngestError> {
    let expected = grid.times.len() * grid.latitude.len() * grid.longitude.len();
    let mut take = |variable: &str| -> Result<Vec<Option<f64>>, IngestError> {
        let values = grid.data.remove(variable).ok_or_else(|| IngestError::MissingVariable {
            path: source.to_path_buf(),
            variable: variable.to_string(),
        })?;
        if values.len() != expected {
            return Err(IngestError::ShapeMismatch {
                path: source.to_path_buf(),
                expected,
                found: values.len(),
            });
        }
        Ok(values)
    };

    let values = match kind {
        DataKind::Wave => take("swh")?,
        DataKind::Storm => {
            let u = take("u10")?;
            let v = take("v10")?;
            u.into_iter()
                .zip(v)
                .map(|(u, v)| match (u, v) {
                    (Some(u), Some(v)) => Some(wind_speed_knots(u, v)),
                    _ => None,
                })
                .collect()
        }
    };

    Ok(IntensityField {
        latitude: grid.latitude,
        longitude: grid.longitude,
        times: grid.times,
        values,
    })
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Path of the data file for `year`.
pub fn year_file_path(data_dir: &Path, file_base_name: &str, year: i32) -> PathBuf {
    data_dir.join(format!("{}{}.nc", file_base_name, year))
}

/// Data files present for `start_year..=end_year`, in year order.
pub fn available_year_files(
    data_dir: &Path,
    file_base_name: &str,
    start_year: i32,
    end_year: i32,
) -> Vec<(i32, PathBuf)> {
    (start_year..=end_year)
        .filter_map(|year| {
            let path = year_file_path(data_dir, file_base_name, year);
            if path.exists() {
                Some((year, path))
            } else {
                info!(year, path = %path.display(), "no data file, year contributes no hours");
                None
            }
        })
        .collect()
}

/// Appends `next` to `field`; both must share the same grid.
fn append(field: &mut IntensityField, next: IntensityField, source: &Path) -> Result<(), IngestError> {
    if field.latitude != next.latitude || field.longitude != next.longitude {
        return Err(IngestError::GridMismatch {
            path: source.to_path_buf(),
        });
    }
    field.times.extend(next.times);
    field.values.extend(next.values);
    Ok(())
}

/// Loads and concatenates every available yearly file of one data kind.
///
/// # Errors
/// - `IngestError::NoData` — no file exists in the year range.
/// - any NetCDF, variable, shape, or grid error from an individual file.
pub fn load_intensity_field(
    data_dir: &Path,
    file_base_name: &str,
    kind: DataKind,
    start_year: i32,
    end_year: i32,
) -> Result<IntensityField, IngestError> {
    let files = available_year_files(data_dir, file_base_name, start_year, end_year);

    let mut field: Option<IntensityField> = None;
    for (year, path) in files {
        let grid = netcdf_io::read_grid(&path, kind.variables())?;
        let year_field = intensity_field(grid, kind, &path)?;
        debug!(year, hours = year_field.hour_count(), "loaded grid file");

        match field.as_mut() {
            Some(existing) => append(existing, year_field, &path)?,
            None => field = Some(year_field),
        }
    }

    field.ok_or(IngestError::NoData {
        kind,
        start_year,
        end_year,
    })
}
