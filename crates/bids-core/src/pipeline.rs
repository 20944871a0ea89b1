//! Parallel classification stage.
//!
//! Each series is read and classified on a bounded rayon pool. Failures are
//! isolated per series: a read error, timeout, missing identity field, panic
//! or unmatched series is recorded as a [`SkippedSeries`] and logged, and the
//! remaining series carry on. Results are gathered after the pool joins, so
//! the assigner always sees the complete set.

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{info, info_span, warn};

use bids_ingest::{HeaderReader, ReadError, SeriesSource};
use bids_map::Matcher;
use bids_model::{
    AcquisitionTimestamp, ClassifiedRecord, HeaderField, HeaderValues, RuleSet, SeriesLocator,
    SeriesRecord,
};

use crate::error::PipelineError;

/// Worker count used when none is configured.
pub fn default_workers() -> usize {
    num_cpus::get().max(1)
}

/// Why a series was left out of the mapping table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Unreadable(String),
    TimedOut(String),
    MissingField(HeaderField),
    NoMatch,
    Panicked(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable(message) => write!(f, "header read failed: {message}"),
            Self::TimedOut(message) => write!(f, "header read timed out: {message}"),
            Self::MissingField(field) => write!(f, "missing required header field {field}"),
            Self::NoMatch => f.write_str("no heuristic rule matched"),
            Self::Panicked(message) => write!(f, "classification panicked: {message}"),
        }
    }
}

impl From<ReadError> for SkipReason {
    fn from(err: ReadError) -> Self {
        match err {
            ReadError::Timeout { .. } => Self::TimedOut(err.to_string()),
            other => Self::Unreadable(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSeries {
    pub locator: SeriesLocator,
    pub reason: SkipReason,
}

/// Classified and skipped series, both in input order.
#[derive(Debug, Clone, Default)]
pub struct StageReport {
    pub classified: Vec<ClassifiedRecord>,
    pub skipped: Vec<SkippedSeries>,
}

/// Reads and classifies series with a shared reader and rule set.
pub struct ClassificationStage<'a> {
    ruleset: &'a RuleSet,
    matcher: &'a Matcher,
    reader: &'a dyn HeaderReader,
    workers: usize,
}

impl<'a> ClassificationStage<'a> {
    pub fn new(ruleset: &'a RuleSet, matcher: &'a Matcher, reader: &'a dyn HeaderReader) -> Self {
        Self {
            ruleset,
            matcher,
            reader,
            workers: default_workers(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn run(&self, sources: &[SeriesSource]) -> Result<StageReport, PipelineError> {
        self.run_with_progress(sources, &|| {})
    }

    /// Like [`Self::run`], calling `on_series_done` once per finished series
    /// from whichever worker finished it.
    pub fn run_with_progress(
        &self,
        sources: &[SeriesSource],
        on_series_done: &(dyn Fn() + Sync),
    ) -> Result<StageReport, PipelineError> {
        let span = info_span!("classify", series = sources.len(), workers = self.workers);
        let _guard = span.enter();
        let started = Instant::now();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|index| format!("classify-{index}"))
            .build()?;
        let fields = self.ruleset.required_fields();

        let outcomes: Vec<Result<ClassifiedRecord, SkippedSeries>> = pool.install(|| {
            sources
                .par_iter()
                .map(|source| {
                    let outcome = self.classify_isolated(source, &fields);
                    on_series_done();
                    outcome
                })
                .collect()
        });

        let mut report = StageReport::default();
        for outcome in outcomes {
            match outcome {
                Ok(record) => report.classified.push(record),
                Err(skipped) => report.skipped.push(skipped),
            }
        }
        info!(
            classified = report.classified.len(),
            skipped = report.skipped.len(),
            duration_ms = started.elapsed().as_millis(),
            "classification complete"
        );
        Ok(report)
    }

    fn classify_isolated(
        &self,
        source: &SeriesSource,
        fields: &BTreeSet<HeaderField>,
    ) -> Result<ClassifiedRecord, SkippedSeries> {
        let span = info_span!("classify_series", locator = %source.locator);
        let _guard = span.enter();

        let result = catch_unwind(AssertUnwindSafe(|| self.classify_one(source, fields)))
            .unwrap_or_else(|payload| Err(SkipReason::Panicked(panic_message(payload.as_ref()))));
        result.map_err(|reason| {
            warn!(locator = %source.locator, %reason, "skipping series");
            SkippedSeries {
                locator: source.locator.clone(),
                reason,
            }
        })
    }

    fn classify_one(
        &self,
        source: &SeriesSource,
        fields: &BTreeSet<HeaderField>,
    ) -> Result<ClassifiedRecord, SkipReason> {
        let headers = self
            .reader
            .read_fields(source, self.ruleset.tags(), fields)?;
        let series = build_record(source, headers)?;
        self.matcher
            .classify(series)
            .map_err(|_| SkipReason::NoMatch)
    }
}

/// Pairs a discovered series with its header values. The identity fields
/// must all be present.
pub fn build_record(
    source: &SeriesSource,
    headers: HeaderValues,
) -> Result<SeriesRecord, SkipReason> {
    let required = |field: HeaderField| {
        headers
            .get(&field)
            .map(str::to_string)
            .ok_or(SkipReason::MissingField(field))
    };
    let patient_id = required(HeaderField::PatientId)?;
    let date = required(HeaderField::StudyDate)?;
    let time = required(HeaderField::StudyTime)?;
    Ok(SeriesRecord {
        locator: source.locator.clone(),
        patient_id,
        acquisition: AcquisitionTimestamp::new(&date, &time),
        headers,
        physio: source.physio.clone(),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
