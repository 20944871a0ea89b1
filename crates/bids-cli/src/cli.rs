//! CLI argument definitions for the DICOM-to-BIDS mapper.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "bids-mapper",
    version,
    about = "Classify DICOM series and assign BIDS subject/session/run ids",
    long_about = "Classify raw MRI series with configurable header heuristics and\n\
                  write the mapping table used to convert them into a BIDS dataset."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Include patient identifiers in log output.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Classify every series under a DICOM directory and write the mapping table.
    Map(MapArgs),

    /// Print the effective heuristic rules in evaluation order.
    Heuristics(HeuristicsArgs),

    /// Show the BIDS path each row of a mapping table converts to.
    Plan(PlanArgs),
}

/// Where the heuristics come from.
#[derive(Args, Clone, Debug, Default)]
pub struct HeuristicsSource {
    /// Heuristics file (TOML or JSON) merged with the built-in rules.
    #[arg(long = "heuristics", value_name = "FILE")]
    pub heuristics: Option<PathBuf>,

    /// Use only the rules from --heuristics instead of extending the built-ins.
    #[arg(long = "replace-defaults", requires = "heuristics")]
    pub replace_defaults: bool,
}

#[derive(Args, Clone, Debug)]
pub struct MapArgs {
    /// Root directory holding one sub-directory per series.
    #[arg(value_name = "DICOM_DIR")]
    pub dicom_dir: PathBuf,

    /// Mapping table path (default: <DICOM_DIR>/bids_map.csv).
    #[arg(long = "output", short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub source: HeuristicsSource,

    /// Number of parallel header readers (default: CPU count).
    #[arg(long = "workers", short = 'j', value_name = "N")]
    pub workers: Option<usize>,

    /// How DICOM headers are read.
    #[arg(long = "reader", value_enum, default_value = "dicom")]
    pub reader: ReaderArg,

    /// Seconds to wait for one dcmdump run before skipping the series.
    #[arg(long = "timeout-secs", value_name = "SECS", default_value_t = 60)]
    pub timeout_secs: u64,

    /// dcmdump executable used with `--reader dcmdump`.
    #[arg(long = "dcmdump", value_name = "PATH", default_value = "dcmdump")]
    pub dcmdump: PathBuf,

    /// Read series and headers from a CSV table instead of DICOM files.
    #[arg(long = "header-table", value_name = "FILE", conflicts_with = "reader")]
    pub header_table: Option<PathBuf>,

    /// Classify and report without writing the mapping table.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Args, Clone, Debug)]
pub struct HeuristicsArgs {
    #[command(flatten)]
    pub source: HeuristicsSource,
}

#[derive(Args, Clone, Debug)]
pub struct PlanArgs {
    /// Mapping table written by `map`.
    #[arg(value_name = "MAPPING_CSV")]
    pub mapping: PathBuf,

    /// Prefix output paths with this BIDS dataset root.
    #[arg(long = "bids-dir", value_name = "DIR")]
    pub bids_dir: Option<PathBuf>,
}

/// Header reader choices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ReaderArg {
    /// Parse files in-process, stopping before pixel data.
    #[default]
    Dicom,
    /// Run DCMTK `dcmdump` per series.
    Dcmdump,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
