/// Intervening-period rule.
///
/// Works on a copy of the indicator with hour 0 forced active, so that an
/// event starting inside the first gap window of the record can still
/// qualify. Spacing is measured between consecutive active hours, not
/// between event starts: an active hour opens a new cluster when the
/// previous active hour is at least `intervening_hours` earlier, even if
/// both belong to the same stretch of activity.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDateTime};

/// Indices of all active hours, with hour 0 forced active.
pub fn active_hours(indicator: &[bool]) -> Vec<usize> {
    let mut forced = indicator.to_vec();
    if let Some(first) = forced.first_mut() {
        *first = true;
    }

    forced
        .iter()
        .enumerate()
        .filter(|(_, active)| **active)
        .map(|(hour, _)| hour)
        .collect()
}

/// Active hours that follow the previous active hour by at least
/// `intervening_hours`. The first active hour has no predecessor and is
/// never included.
pub fn cluster_starts(indicator: &[bool], intervening_hours: usize) -> Vec<usize> {
    active_hours(indicator)
        .windows(2)
        .filter(|pair| pair[1] - pair[0] >= intervening_hours)
        .map(|pair| pair[1])
        .collect()
}

/// Timestamps of the cluster starts in `indicator`.
pub fn gap_start_times(
    indicator: &[bool],
    intervening_hours: usize,
    record_start: NaiveDateTime,
) -> BTreeSet<NaiveDateTime> {
    cluster_starts(indicator, intervening_hours)
        .into_iter()
        .map(|hour| record_start + Duration::hours(hour as i64))
        .collect()
}
