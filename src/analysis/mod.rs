/// Event-detection engine.
///
/// Submodules:
/// - `coverage` — per-hour spatial coverage and the active indicator.
/// - `runs`     — closed runs of active hours and the duration filter.
/// - `gaps`     — intervening-period rule over all active hours.
/// - `events`   — intersection of the two start sets, annual counts, and
///                the composed per-region pipeline.

pub mod coverage;
pub mod events;
pub mod gaps;
pub mod runs;

pub use events::{RegionEvents, detect_region_events};
