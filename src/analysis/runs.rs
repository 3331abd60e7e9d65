/// Run extraction and the duration filter.
///
/// A run starts at hour `i >= 1` when the indicator steps from inactive to
/// active and ends (exclusive) at the next inactive hour. Transitions only
/// exist between neighbouring hours, so an indicator that is already active
/// at hour 0 never produces a run start there. A run still open when the
/// record ends has no end transition and is dropped.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDateTime};

use crate::model::Run;

/// Finds every closed run in `indicator`, in order.
pub fn extract_runs(indicator: &[bool]) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut open: Option<usize> = None;

    for (i, pair) in indicator.windows(2).enumerate() {
        let hour = i + 1;
        match (pair[0], pair[1]) {
            (false, true) => open = Some(hour),
            (true, false) => {
                if let Some(start) = open.take() {
                    runs.push(Run { start, end: hour });
                }
            }
            _ => {}
        }
    }

    runs
}

/// Keeps runs lasting at least `min_duration_hours`.
pub fn filter_by_duration(runs: &[Run], min_duration_hours: usize) -> Vec<Run> {
    runs.iter()
        .copied()
        .filter(|run| run.duration() >= min_duration_hours)
        .collect()
}

/// Start timestamps of the runs that pass the duration filter.
///
/// Only the pass/fail test uses the duration; the magnitude is not carried
/// further.
pub fn duration_start_times(
    runs: &[Run],
    min_duration_hours: usize,
    record_start: NaiveDateTime,
) -> BTreeSet<NaiveDateTime> {
    filter_by_duration(runs, min_duration_hours)
        .iter()
        .map(|run| record_start + Duration::hours(run.start as i64))
        .collect()
}
