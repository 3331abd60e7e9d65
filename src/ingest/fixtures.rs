/// Test fixtures: representative yearly grid contents.
///
/// Each payload is a JSON transcription of what `netcdf_io::read_grid`
/// decodes from an ERA5 single-level file, cut down to a 2 x 2 grid and a
/// handful of hours:
///
///   latitude[]                    — descending, degrees north
///   longitude[]                   — ascending, degrees east
///   time[]                        — ISO 8601, hourly, no offset (UTC)
///   swh[time][lat][lon]           — significant wave height, metres
///   u10/v10[time][lat][lon]       — 10 m wind components, m/s
///
/// Land cells carry `null` in the wave product. `write_fixture_netcdf`
/// writes a grid back out as a packed ERA5-style NetCDF file for the
/// loader tests.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use super::grid::GridVariables;

type Cube = Vec<Vec<Vec<Option<f64>>>>;

#[derive(Deserialize)]
struct FixtureGrid {
    latitude: Vec<f64>,
    longitude: Vec<f64>,
    time: Vec<NaiveDateTime>,
    #[serde(flatten)]
    variables: BTreeMap<String, Cube>,
}

/// Decodes a JSON fixture into flattened grid variables.
pub(crate) fn fixture_grid(json: &str) -> GridVariables {
    let grid: FixtureGrid = serde_json::from_str(json).expect("fixture should parse");
    GridVariables {
        latitude: grid.latitude,
        longitude: grid.longitude,
        times: grid.time,
        data: grid
            .variables
            .into_iter()
            .map(|(name, cube)| (name, cube.into_iter().flatten().flatten().collect()))
            .collect(),
    }
}

const SCALE_FACTOR: f64 = 0.001;
const FILL_VALUE: i16 = -32767;

/// Writes `grid` as an ERA5-style file: `hours since 1900` time axis and
/// data variables packed into 16-bit integers.
pub(crate) fn write_fixture_netcdf(path: &Path, grid: &GridVariables) {
    let epoch = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    let mut file = netcdf::create(path).expect("fixture file should be created");
    file.add_dimension("time", grid.times.len()).unwrap();
    file.add_dimension("latitude", grid.latitude.len()).unwrap();
    file.add_dimension("longitude", grid.longitude.len()).unwrap();

    let latitude: Vec<f32> = grid.latitude.iter().map(|v| *v as f32).collect();
    let mut var = file.add_variable::<f32>("latitude", &["latitude"]).unwrap();
    var.put_values(&latitude, ..).unwrap();

    let longitude: Vec<f32> = grid.longitude.iter().map(|v| *v as f32).collect();
    let mut var = file.add_variable::<f32>("longitude", &["longitude"]).unwrap();
    var.put_values(&longitude, ..).unwrap();

    let hours: Vec<i32> = grid.times.iter().map(|t| (*t - epoch).num_hours() as i32).collect();
    let mut var = file.add_variable::<i32>("time", &["time"]).unwrap();
    var.put_attribute("units", "hours since 1900-01-01 00:00:00.0").unwrap();
    var.put_values(&hours, ..).unwrap();

    for (name, values) in &grid.data {
        let packed: Vec<i16> = values
            .iter()
            .map(|v| v.map_or(FILL_VALUE, |v| (v / SCALE_FACTOR).round() as i16))
            .collect();
        let mut var = file
            .add_variable::<i16>(name, &["time", "latitude", "longitude"])
            .unwrap();
        var.put_attribute("scale_factor", SCALE_FACTOR).unwrap();
        var.put_attribute("add_offset", 0.0f64).unwrap();
        var.put_attribute("_FillValue", FILL_VALUE).unwrap();
        var.put_attribute("missing_value", FILL_VALUE).unwrap();
        var.put_values(&packed, ..).unwrap();
    }
}

/// Wave heights for three hours. The south-west cell is land.
pub(crate) fn fixture_wave_grid_json() -> &'static str {
    r#"{
      "latitude": [42.0, 41.5],
      "longitude": [-70.0, -69.5],
      "time": ["2000-01-01T00:00:00", "2000-01-01T01:00:00", "2000-01-01T02:00:00"],
      "swh": [
        [[1.2, 5.5], [null, 0.8]],
        [[5.0, 6.1], [null, 4.9]],
        [[2.0, 2.2], [null, 2.1]]
      ]
    }"#
}

/// Wind components for two hours. 17.5 m/s is 34.0 knots.
pub(crate) fn fixture_storm_grid_json() -> &'static str {
    r#"{
      "latitude": [42.0, 41.5],
      "longitude": [-70.0, -69.5],
      "time": ["2000-01-01T00:00:00", "2000-01-01T01:00:00"],
      "u10": [
        [[3.0, 17.5], [0.0, -12.0]],
        [[0.0, 0.0], [1.0, 1.0]]
      ],
      "v10": [
        [[4.0, 0.0], [0.0, -16.0]],
        [[0.0, 0.0], [1.0, 1.0]]
      ]
    }"#
}

/// Wave grid whose second hour has only one latitude row, two values short.
pub(crate) fn fixture_ragged_wave_grid_json() -> &'static str {
    r#"{
      "latitude": [42.0, 41.5],
      "longitude": [-70.0, -69.5],
      "time": ["2000-01-01T00:00:00", "2000-01-01T01:00:00"],
      "swh": [
        [[1.0, 1.0], [1.0, 1.0]],
        [[1.0, 1.0]]
      ]
    }"#
}
