/// Input loading for the event pipeline.
///
/// - `grid`      — yearly reanalysis files → `IntensityField`
/// - `netcdf_io` — ERA5 NetCDF decoding (axes, CF time, packed variables)
/// - `fixtures` (test only) — representative grid contents

pub mod grid;
pub mod netcdf_io;

#[cfg(test)]
pub(crate) mod fixtures;
