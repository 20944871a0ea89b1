pub mod assign;
pub mod error;
pub mod naming;
pub mod pipeline;

pub use assign::{assign, pad_width};
pub use error::{AssignError, NamingError, PipelineError};
pub use naming::{OutputName, output_name};
pub use pipeline::{
    ClassificationStage, SkipReason, SkippedSeries, StageReport, build_record, default_workers,
};
