/// End-to-end tests for the batch processor
///
/// These tests verify the full path a real run takes:
/// 1. Config file → resolved paths and parameters
/// 2. GeoJSON regions + yearly NetCDF grid files on disk
/// 3. Parallel per-region pipelines, including a failing region
/// 4. CSV / JSON reports with collision-free file names
///
/// Every test builds its own scratch directory, so they can run in parallel.

use std::fs;
use std::path::Path;

use chrono::{Duration, NaiveDate};
use serde_json::json;

use seastate_events::config::load_config;
use seastate_events::model::{DataKind, EventError, IngestError, ProcessError};
use seastate_events::processor::Processor;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const HOURS: usize = 300;

/// Region 0 around lon -71, region 1 around lon -69, region 2 far east with
/// no grid cells inside it.
fn write_geojson(dir: &Path) {
    let square = |west: f64, east: f64| {
        json!({
            "type": "Feature",
            "properties": {},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[west, 40.0], [east, 40.0], [east, 42.0], [west, 42.0], [west, 40.0]]]
            }
        })
    };
    let collection = json!({
        "type": "FeatureCollection",
        "features": [square(-72.0, -70.0), square(-70.0, -68.0), square(-50.0, -48.0)]
    });
    fs::create_dir_all(dir.join("geojson")).unwrap();
    fs::write(dir.join("geojson/regions.json"), collection.to_string()).unwrap();
}

/// Writes an ERA5-style yearly file on a 1 x 2 grid (lat 41, lon -71 / -69).
/// `variables` holds flattened `[time][lat][lon]` values in physical units.
fn write_year_file(path: &Path, year: i32, variables: &[(&str, Vec<f32>)]) {
    let epoch = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    let first_hour = (start - epoch).num_hours() as i32;
    let hours: Vec<i32> = (0..HOURS as i32).map(|h| first_hour + h).collect();

    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut file = netcdf::create(path).unwrap();
    file.add_dimension("time", HOURS).unwrap();
    file.add_dimension("latitude", 1).unwrap();
    file.add_dimension("longitude", 2).unwrap();

    let mut var = file.add_variable::<f32>("latitude", &["latitude"]).unwrap();
    var.put_values(&[41.0f32], ..).unwrap();
    let mut var = file.add_variable::<f32>("longitude", &["longitude"]).unwrap();
    var.put_values(&[-71.0f32, -69.0], ..).unwrap();
    let mut var = file.add_variable::<i32>("time", &["time"]).unwrap();
    var.put_attribute("units", "hours since 1900-01-01 00:00:00.0").unwrap();
    var.put_values(&hours, ..).unwrap();

    for (name, values) in variables {
        let mut var = file
            .add_variable::<f32>(name, &["time", "latitude", "longitude"])
            .unwrap();
        var.put_values(values, ..).unwrap();
    }
}

/// Flattened `[time][lat][lon]` values for the 1 x 2 grid.
fn cube(west: impl Fn(usize) -> f32, east: impl Fn(usize) -> f32) -> Vec<f32> {
    (0..HOURS).flat_map(|h| [west(h), east(h)]).collect()
}

fn write_wave_year(dir: &Path, year: i32) {
    // West cell: high seas already running at the record start, then a
    // separate 4 hour event. East cell: one 2 hour spike.
    let swh = cube(
        |h| if h < 4 || (150..154).contains(&h) { 6.0 } else { 1.0 },
        |h| if (200..202).contains(&h) { 6.0 } else { 1.0 },
    );
    write_year_file(&dir.join(format!("data/waves_{}.nc", year)), year, &[("swh", swh)]);
}

fn write_storm_year(dir: &Path, year: i32) {
    // 20 m/s is ~38.9 knots.
    let u10 = cube(|h| if (120..125).contains(&h) { 20.0 } else { 2.0 }, |_| 2.0);
    let v10 = cube(|_| 0.0, |_| 0.0);
    write_year_file(&dir.join(format!("data/stormy_{}.nc", year)), year, &[("u10", u10), ("v10", v10)]);
}

fn write_config(dir: &Path, data_type: &str, output_type: &str, regions: &str) {
    let config = format!(
        r#"
[general]
start_year = 2000
end_year = 2001
data_type = "{data_type}"
output_type = "{output_type}"
regions = {regions}
geojson_file = "geojson/regions.json"
data_dir = "data"
output_dir = "results"

[storm]
file_base_name = "stormy_"

[wave]
file_base_name = "waves_"
"#
    );
    fs::write(dir.join("seastate.toml"), config).unwrap();
}

fn processor(dir: &Path) -> Processor {
    let config = load_config(dir.join("seastate.toml")).expect("config should load");
    Processor::with_workers(config, 2)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_wave_run_writes_csv_for_successful_regions() {
    let dir = tempfile::tempdir().unwrap();
    write_geojson(dir.path());
    write_wave_year(dir.path(), 2000);
    write_config(dir.path(), "wave", "csv", "[0, 1, 2]");

    let summaries = processor(dir.path()).run().expect("run should succeed");
    assert_eq!(summaries.len(), 1);

    let summary = &summaries[0];
    assert_eq!(summary.kind, DataKind::Wave);
    assert_eq!(summary.hours, HOURS);
    assert_eq!(summary.failures(), vec![(2, &EventError::EmptyRegion(2))]);

    let csv = fs::read_to_string(&summary.report_path).unwrap();
    assert_eq!(csv, "region,2000,2001\nregion 0,1,0\nregion 1,0,0\n");
    assert_eq!(summary.report_path, dir.path().join("results/wave_2000-2001.csv"));
}

#[test]
fn test_wave_event_in_progress_at_record_start_is_not_counted() {
    let dir = tempfile::tempdir().unwrap();
    write_geojson(dir.path());
    write_wave_year(dir.path(), 2000);
    write_config(dir.path(), "wave", "csv", "[0]");

    let summaries = processor(dir.path()).run().unwrap();
    let (_, result) = &summaries[0].results[0];
    let events = result.as_ref().unwrap();

    let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    assert_eq!(events.events.iter().copied().collect::<Vec<_>>(), vec![start + Duration::hours(150)]);
}

#[test]
fn test_both_kinds_write_json_reports() {
    let dir = tempfile::tempdir().unwrap();
    write_geojson(dir.path());
    write_wave_year(dir.path(), 2000);
    write_storm_year(dir.path(), 2000);
    write_config(dir.path(), "both", "json", "[0, 1]");

    let summaries = processor(dir.path()).run().unwrap();
    let kinds: Vec<DataKind> = summaries.iter().map(|s| s.kind).collect();
    assert_eq!(kinds, vec![DataKind::Storm, DataKind::Wave]);

    let storm: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&summaries[0].report_path).unwrap()).unwrap();
    assert_eq!(storm["region 0"]["2000"], 1);
    assert_eq!(storm["region 0"]["2001"], 0);
    assert_eq!(storm["region 1"]["2000"], 0);
    assert!(summaries[0].report_path.ends_with("storm_2000-2001.json"));
}

#[test]
fn test_second_run_does_not_overwrite_report() {
    let dir = tempfile::tempdir().unwrap();
    write_geojson(dir.path());
    write_wave_year(dir.path(), 2000);
    write_config(dir.path(), "wave", "csv", "[0]");

    let first = processor(dir.path()).run().unwrap();
    let second = processor(dir.path()).run().unwrap();

    assert!(first[0].report_path.ends_with("wave_2000-2001.csv"));
    assert!(second[0].report_path.ends_with("wave_2000-2001(1).csv"));
    assert_eq!(
        fs::read_to_string(&first[0].report_path).unwrap(),
        fs::read_to_string(&second[0].report_path).unwrap()
    );
}

#[test]
fn test_missing_year_reports_zero() {
    let dir = tempfile::tempdir().unwrap();
    write_geojson(dir.path());
    write_wave_year(dir.path(), 2000);
    write_config(dir.path(), "wave", "csv", "[1]");

    let summaries = processor(dir.path()).run().unwrap();
    let (_, result) = &summaries[0].results[0];
    let counts = &result.as_ref().unwrap().counts;

    assert_eq!(counts.iter().collect::<Vec<_>>(), vec![(2000, 0), (2001, 0)]);
}

#[test]
fn test_missing_data_files_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_geojson(dir.path());
    write_config(dir.path(), "wave", "csv", "[0]");

    let err = processor(dir.path()).run().unwrap_err();
    assert!(matches!(err, ProcessError::Ingest(IngestError::NoData { .. })));
}

#[test]
fn test_missing_geojson_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_wave_year(dir.path(), 2000);
    write_config(dir.path(), "wave", "csv", "[0]");

    let err = processor(dir.path()).run().unwrap_err();
    assert!(matches!(err, ProcessError::Ingest(IngestError::Read { .. })));
}
