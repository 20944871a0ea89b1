use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, info_span};

use bids_core::{ClassificationStage, StageReport, assign, output_name};
use bids_heuristics::{Heuristics, MergeMode, load_heuristics};
use bids_ingest::{
    DcmdumpReader, DicomReader, HeaderReader, HeaderTable, SeriesSource, discover_series,
};
use bids_report::{read_mapping_table, write_mapping_table};

use crate::cli::{HeuristicsArgs, HeuristicsSource, MapArgs, PlanArgs, ReaderArg};
use crate::logging::redact_value;
use crate::summary::heuristics_table;
use crate::types::{MapOutcome, PlannedSeries};

/// File name of the mapping table when `--output` is not given.
pub const DEFAULT_MAPPING_FILE: &str = "bids_map.csv";

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}";

pub fn load_rules(source: &HeuristicsSource) -> Result<Heuristics> {
    let mode = if source.replace_defaults {
        MergeMode::Replace
    } else {
        MergeMode::Extend
    };
    load_heuristics(source.heuristics.as_deref(), mode).with_context(|| match &source.heuristics {
        Some(path) => format!("load heuristics from {}", path.display()),
        None => "load built-in heuristics".to_string(),
    })
}

pub fn run_map(args: &MapArgs) -> Result<MapOutcome> {
    let span = info_span!("map", dicom_dir = %args.dicom_dir.display());
    let _guard = span.enter();
    let started = Instant::now();

    let heuristics = load_rules(&args.source)?;
    let (sources, reader) = open_series(args)?;
    info!(series = sources.len(), "series discovered");

    let mut stage = ClassificationStage::new(
        heuristics.ruleset(),
        heuristics.matcher(),
        reader.as_ref(),
    );
    if let Some(workers) = args.workers {
        stage = stage.with_workers(workers);
    }
    let progress = progress_bar(sources.len());
    let StageReport {
        classified,
        skipped,
    } = stage
        .run_with_progress(&sources, &|| progress.inc(1))
        .context("classify series")?;
    progress.finish_and_clear();

    let table = assign(classified).context("assign subject, session and run ids")?;
    for record in table.records() {
        debug!(
            locator = %record.series.locator,
            patient_id = redact_value(&record.series.patient_id),
            subject = record.subject_id.as_deref().unwrap_or_default(),
            session = record.session_id.as_deref().unwrap_or_default(),
            run = record.run_id.as_deref().unwrap_or_default(),
            "series assigned"
        );
    }

    let output = if args.dry_run {
        info!("dry run, mapping table not written");
        None
    } else {
        let path = mapping_path(args);
        let rows = write_mapping_table(&path, &table)
            .with_context(|| format!("write mapping table {}", path.display()))?;
        info!(path = %path.display(), rows, "wrote mapping table");
        Some(path)
    };

    info!(
        mapped = table.len(),
        skipped = skipped.len(),
        duration_ms = started.elapsed().as_millis(),
        "map complete"
    );
    Ok(MapOutcome {
        dicom_dir: args.dicom_dir.clone(),
        output,
        table,
        skipped,
        workers: stage.workers(),
    })
}

pub fn mapping_path(args: &MapArgs) -> PathBuf {
    args.output
        .clone()
        .unwrap_or_else(|| args.dicom_dir.join(DEFAULT_MAPPING_FILE))
}

/// Series list plus the reader that serves their headers.
fn open_series(args: &MapArgs) -> Result<(Vec<SeriesSource>, Box<dyn HeaderReader>)> {
    if let Some(path) = &args.header_table {
        let table = HeaderTable::read(path)
            .with_context(|| format!("read header table {}", path.display()))?;
        return Ok((table.sources(), Box::new(table)));
    }

    let reader: Box<dyn HeaderReader> = match args.reader {
        ReaderArg::Dicom => Box::new(DicomReader::new()),
        ReaderArg::Dcmdump => {
            let reader =
                DcmdumpReader::new(args.dcmdump.clone(), Duration::from_secs(args.timeout_secs));
            reader
                .check()
                .with_context(|| format!("check header reader {}", args.dcmdump.display()))?;
            Box::new(reader)
        }
    };
    let sources = discover_series(&args.dicom_dir)
        .with_context(|| format!("scan DICOM directory {}", args.dicom_dir.display()))?;
    Ok((sources, reader))
}

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    let style = ProgressStyle::with_template(PROGRESS_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    bar.set_style(style);
    bar.set_message("classifying");
    bar
}

pub fn run_heuristics(args: &HeuristicsArgs) -> Result<()> {
    let heuristics = load_rules(&args.source)?;
    println!("{}", heuristics_table(heuristics.ruleset()));
    Ok(())
}

pub fn run_plan(args: &PlanArgs) -> Result<Vec<PlannedSeries>> {
    let rows = read_mapping_table(&args.mapping)
        .with_context(|| format!("read mapping table {}", args.mapping.display()))?;
    let planned = rows
        .iter()
        .map(|row| PlannedSeries {
            scan_dir: row.scan_dir.clone(),
            target: output_name(row)
                .map(|name| under(args.bids_dir.as_deref(), name.relative_path()))
                .map_err(|err| err.to_string()),
        })
        .collect();
    Ok(planned)
}

fn under(root: Option<&Path>, relative: PathBuf) -> PathBuf {
    match root {
        Some(root) => root.join(relative),
        None => relative,
    }
}
