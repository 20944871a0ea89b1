use thiserror::Error;

/// Internal invariant violations found by the assigner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignError {
    #[error("series {locator} reached assignment without a patient id")]
    MissingPatientId { locator: String },

    #[error("series {locator} reached assignment without a modality")]
    MissingModality { locator: String },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to start classification workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamingError {
    #[error("row for {scan_dir} has no {entity}")]
    MissingEntity { scan_dir: String, entity: &'static str },

    #[error("row for {scan_dir} has unknown bids_type '{bids_type}'")]
    UnknownType { scan_dir: String, bids_type: String },
}
