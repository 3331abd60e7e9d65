/// Event resolution, annual aggregation, and the per-region pipeline.
///
/// # Pipeline
///
/// 1. **Coverage** — fraction of region cells at or above the threshold
/// 2. **Indicator** — coverage against the spatial proportion
/// 3. **Runs** — closed stretches of active hours
/// 4. **Duration starts** — runs of at least the minimum duration
/// 5. **Gap starts** — active hours far enough from the previous one
/// 6. **Events** — timestamps present in both 4 and 5
/// 7. **Annual counts** — events bucketed by calendar year
///
/// Regions never interact; each call works only from the shared, read-only
/// field and mask.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDateTime};
use tracing::debug;

use super::coverage::{build_indicator, spatial_coverage};
use super::gaps::gap_start_times;
use super::runs::{duration_start_times, extract_runs};
use crate::model::{AnnualCount, EventError, EventParams, IntensityField, RegionMask};

/// Intermediate and final timestamp sets for one indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSets {
    pub duration_starts: BTreeSet<NaiveDateTime>,
    pub gap_starts: BTreeSet<NaiveDateTime>,
    pub events: BTreeSet<NaiveDateTime>,
}

/// Result of running the full pipeline for one region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionEvents {
    pub region: usize,
    pub hours: usize,
    pub events: BTreeSet<NaiveDateTime>,
    pub counts: AnnualCount,
}

/// Keeps the timestamps found in both sets.
pub fn resolve_events(
    duration_starts: &BTreeSet<NaiveDateTime>,
    gap_starts: &BTreeSet<NaiveDateTime>,
) -> BTreeSet<NaiveDateTime> {
    duration_starts.intersection(gap_starts).copied().collect()
}

/// Runs stages 3 to 6 over an already built indicator.
pub fn events_from_indicator(
    indicator: &[bool],
    params: &EventParams,
    record_start: NaiveDateTime,
) -> EventSets {
    let runs = extract_runs(indicator);
    let duration_starts = duration_start_times(&runs, params.min_duration_hours, record_start);
    let gap_starts = gap_start_times(indicator, params.intervening_hours, record_start);
    let events = resolve_events(&duration_starts, &gap_starts);

    debug!(
        runs = runs.len(),
        duration_starts = duration_starts.len(),
        gap_starts = gap_starts.len(),
        events = events.len(),
        "resolved events"
    );

    EventSets {
        duration_starts,
        gap_starts,
        events,
    }
}

/// Counts events per calendar year over `start_year..=end_year`.
///
/// Years without events, including years with no data at all, report 0.
pub fn annual_counts(
    events: &BTreeSet<NaiveDateTime>,
    start_year: i32,
    end_year: i32,
) -> AnnualCount {
    let mut counts = AnnualCount::zeroed(start_year, end_year);
    for event in events {
        counts.record(event.year());
    }
    counts
}

/// Full detection pipeline for a single region.
///
/// # Errors
/// `EventError::EmptyRegion` when `region` has no cells in `mask`.
pub fn detect_region_events(
    field: &IntensityField,
    mask: &RegionMask,
    region: usize,
    params: &EventParams,
    record_start: NaiveDateTime,
    start_year: i32,
    end_year: i32,
) -> Result<RegionEvents, EventError> {
    let coverage = spatial_coverage(field, mask, region, params.threshold)?;
    let indicator = build_indicator(&coverage, params.spatial_proportion, params.suppress_first_hour);
    let sets = events_from_indicator(&indicator, params, record_start);
    let counts = annual_counts(&sets.events, start_year, end_year);

    debug!(
        region,
        hours = indicator.len(),
        active_hours = indicator.iter().filter(|a| **a).count(),
        events = sets.events.len(),
        "region pipeline complete"
    );

    Ok(RegionEvents {
        region,
        hours: indicator.len(),
        events: sets.events,
        counts,
    })
}
