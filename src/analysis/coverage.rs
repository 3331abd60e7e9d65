/// Spatial coverage and the per-hour active indicator.
///
/// Coverage is the fraction of a region's grid cells whose intensity meets
/// the threshold in a given hour. Thresholding that fraction against the
/// spatial proportion gives the boolean indicator the rest of the pipeline
/// works on.

use crate::model::{CoverageSeries, EventError, Indicator, IntensityField, RegionMask};

/// Computes the coverage fraction of `region` for every hour of `field`.
///
/// Cells with a missing value count toward the denominator but never meet
/// the threshold.
///
/// # Errors
/// `EventError::EmptyRegion` if no cell of `mask` belongs to `region`.
pub fn spatial_coverage(
    field: &IntensityField,
    mask: &RegionMask,
    region: usize,
    threshold: f64,
) -> Result<CoverageSeries, EventError> {
    let members: Vec<usize> = mask
        .iter()
        .enumerate()
        .filter(|(_, label)| **label == Some(region))
        .map(|(cell, _)| cell)
        .collect();

    if members.is_empty() {
        return Err(EventError::EmptyRegion(region));
    }

    let member_count = members.len() as f64;
    let points = field
        .times
        .iter()
        .enumerate()
        .map(|(hour, time)| {
            let values = field.hour(hour);
            let exceeding = members
                .iter()
                .filter(|&&cell| values[cell].is_some_and(|v| v >= threshold))
                .count();
            (*time, exceeding as f64 / member_count)
        })
        .collect();

    Ok(CoverageSeries { region, points })
}

/// Marks each hour whose coverage meets `spatial_proportion`.
///
/// With `suppress_first_hour` set, hour 0 is always inactive.
pub fn build_indicator(
    coverage: &CoverageSeries,
    spatial_proportion: f64,
    suppress_first_hour: bool,
) -> Indicator {
    let mut indicator: Indicator = coverage
        .points
        .iter()
        .map(|(_, fraction)| *fraction >= spatial_proportion)
        .collect();

    if suppress_first_hour {
        if let Some(first) = indicator.first_mut() {
            *first = false;
        }
    }

    indicator
}
