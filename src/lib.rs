/// seastate_events: annual gale and high-wave event counts per region.
///
/// # Module structure
///
/// ```text
/// seastate_events
/// ├── model       — shared data types (IntensityField, EventParams, AnnualCount, errors, …)
/// ├── config      — processing configuration loader (seastate.toml)
/// ├── regions     — GeoJSON region polygons and grid-cell classification
/// ├── ingest
/// │   ├── grid    — yearly reanalysis grid files → hourly intensity field
/// │   ├── netcdf_io — ERA5 NetCDF decoding (CF time axis, packed variables)
/// │   └── fixtures (test only) — representative grid payloads
/// ├── analysis
/// │   ├── coverage — spatial coverage fraction and active-hour indicator
/// │   ├── runs     — run extraction and duration filter
/// │   ├── gaps     — intervening-period rule
/// │   └── events   — event resolution, annual counts, per-region pipeline
/// ├── processor   — batch driver (load, classify, parallel regions, report)
/// └── report      — CSV / JSON annual count reports
/// ```

/// Public modules
pub mod analysis;
pub mod config;
pub mod ingest;
pub mod model;
pub mod processor;
pub mod regions;
pub mod report;
