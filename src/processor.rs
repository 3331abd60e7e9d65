/// Batch driver for event counting.
///
/// For each selected data kind:
/// 1. Loads every available yearly grid file into one intensity field
/// 2. Labels each grid cell with its region
/// 3. Runs the per-region pipeline for every selected region in parallel
/// 4. Writes the annual count report for the regions that succeeded
///
/// A region that fails (no member cells) is reported in the summary but
/// does not stop the other regions or the other data kind.

use std::path::PathBuf;
use std::sync::{Arc, mpsc};
use std::thread;

use chrono::NaiveDateTime;
use threadpool::ThreadPool;
use tracing::{info, warn};

use crate::analysis::{RegionEvents, detect_region_events};
use crate::config::ProcessingConfig;
use crate::ingest::grid::load_intensity_field;
use crate::model::{AnnualCount, DataKind, EventError, EventParams, IntensityField, ProcessError, RegionMask};
use crate::regions::{self, RegionPolygon};
use crate::report;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of one region's pipeline.
pub type RegionResult = (usize, Result<RegionEvents, EventError>);

/// Outcome of processing one data kind.
#[derive(Debug)]
pub struct KindSummary {
    pub kind: DataKind,
    pub hours: usize,
    pub report_path: PathBuf,
    pub results: Vec<RegionResult>,
}

impl KindSummary {
    pub fn failures(&self) -> Vec<(usize, &EventError)> {
        self.results
            .iter()
            .filter_map(|(region, result)| result.as_ref().err().map(|e| (*region, e)))
            .collect()
    }

    /// `(region, counts)` rows for the regions that succeeded, in
    /// configured order.
    pub fn report_rows(&self) -> Vec<(usize, AnnualCount)> {
        self.results
            .iter()
            .filter_map(|(region, result)| result.as_ref().ok().map(|r| (*region, r.counts.clone())))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Parallel region pipelines
// ---------------------------------------------------------------------------

/// Shared, read-only inputs for every region of one data kind.
#[derive(Debug, Clone)]
pub struct RegionJob {
    pub field: Arc<IntensityField>,
    pub mask: Arc<RegionMask>,
    pub params: EventParams,
    pub record_start: NaiveDateTime,
    pub start_year: i32,
    pub end_year: i32,
}

/// Runs `regions` through the pipeline on a pool of `workers` threads.
///
/// Results come back in the same order as `regions`. A region whose worker
/// panicked never reports back and gets `EventError::WorkerLost`.
pub fn run_regions(job: &RegionJob, regions: &[usize], workers: usize) -> Vec<RegionResult> {
    let pool = ThreadPool::new(workers.max(1));
    let (tx, rx) = mpsc::channel();

    for (slot, &region) in regions.iter().enumerate() {
        let tx = tx.clone();
        let job = job.clone();
        pool.execute(move || {
            let result = detect_region_events(
                &job.field,
                &job.mask,
                region,
                &job.params,
                job.record_start,
                job.start_year,
                job.end_year,
            );
            // Receiver outlives the pool; a send error means the caller is gone.
            let _ = tx.send((slot, result));
        });
    }
    drop(tx);

    let mut received: Vec<Option<Result<RegionEvents, EventError>>> = regions.iter().map(|_| None).collect();
    for (slot, result) in rx.iter() {
        received[slot] = Some(result);
    }

    regions
        .iter()
        .zip(received)
        .map(|(&region, result)| {
            let result = result.unwrap_or_else(|| {
                warn!(region, "region worker stopped without a result");
                Err(EventError::WorkerLost(region))
            });
            (region, result)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

/// Runs the configured data kinds end to end.
pub struct Processor {
    config: ProcessingConfig,
    workers: usize,
}

impl Processor {
    /// Uses one worker per available CPU.
    pub fn new(config: ProcessingConfig) -> Self {
        let workers = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self::with_workers(config, workers)
    }

    pub fn with_workers(config: ProcessingConfig, workers: usize) -> Self {
        Self { config, workers }
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Processes every selected data kind.
    ///
    /// # Errors
    /// Unreadable geojson or grid input, or a report that cannot be written.
    /// Per-region failures are returned inside each `KindSummary` instead.
    pub fn run(&self) -> Result<Vec<KindSummary>, ProcessError> {
        let polygons = regions::load_regions(&self.config.geojson_file)?;
        info!(regions = polygons.len(), file = %self.config.geojson_file.display(), "loaded region polygons");

        self.config
            .data_selection
            .kinds()
            .into_iter()
            .map(|kind| self.process_kind(kind, &polygons))
            .collect()
    }

    /// Processes one data kind and writes its report.
    pub fn process_kind(&self, kind: DataKind, polygons: &[RegionPolygon]) -> Result<KindSummary, ProcessError> {
        let config = &self.config;
        let kind_config = config.kind(kind);

        info!(%kind, start_year = config.start_year, end_year = config.end_year, "processing data");

        let field = load_intensity_field(
            &config.data_dir,
            &kind_config.file_base_name,
            kind,
            config.start_year,
            config.end_year,
        )?;
        let mask = regions::build_region_mask(&field.latitude, &field.longitude, polygons);
        let hours = field.hour_count();

        for &region in &config.regions {
            info!(%kind, region, cells = regions::member_count(&mask, region), "region membership");
        }

        let job = RegionJob {
            field: Arc::new(field),
            mask: Arc::new(mask),
            params: config.params(kind),
            record_start: config.record_start(),
            start_year: config.start_year,
            end_year: config.end_year,
        };
        let workers = self.workers.min(config.regions.len());
        let results = run_regions(&job, &config.regions, workers);

        for (region, result) in &results {
            match result {
                Ok(events) => info!(%kind, region, events = events.counts.total(), "region complete"),
                Err(e) => warn!(%kind, region, error = %e, "region failed"),
            }
        }

        let mut summary = KindSummary {
            kind,
            hours,
            report_path: PathBuf::new(),
            results,
        };
        summary.report_path = report::write_report(
            &config.output_dir,
            kind,
            config.start_year,
            config.end_year,
            config.output_type,
            &summary.report_rows(),
        )?;
        info!(%kind, path = %summary.report_path.display(), "report written");

        Ok(summary)
    }
}
