//! BIDS output paths for mapping rows.

use std::path::PathBuf;

use bids_model::{MappingRow, SemanticType};

use crate::error::NamingError;

/// Suffix used by field maps named only by phase-encoding direction.
const EPI_SUFFIX: &str = "epi";
const DIRECTION_PREFIX: &str = "dir-";

/// Where one mapping row is converted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputName {
    /// `sub-XX/ses-YY/<datatype>`
    pub directory: PathBuf,
    /// File name without extension.
    pub basename: String,
}

impl OutputName {
    pub fn relative_path(&self) -> PathBuf {
        self.directory.join(&self.basename)
    }
}

pub fn output_name(row: &MappingRow) -> Result<OutputName, NamingError> {
    let subject = required(row, &row.subject, "subject")?;
    let session = required(row, &row.session, "session")?;
    let modality = required(row, &row.modality, "modality")?;
    let datatype: SemanticType = row.bids_type.parse().map_err(|_| NamingError::UnknownType {
        scan_dir: row.scan_dir.clone(),
        bids_type: row.bids_type.clone(),
    })?;

    let acq = row.acq.trim();
    let rec = row.rec.trim();
    let run = row.run.trim();
    let entities = match datatype {
        SemanticType::Anat | SemanticType::Perf => {
            vec![subject, session, acq, rec, run, modality]
        }
        SemanticType::Func => {
            let task = required(row, &row.task, "task")?;
            vec![subject, session, task, acq, rec, run, modality]
        }
        SemanticType::Dwi => vec![subject, session, acq, run, "dwi"],
        SemanticType::Fmap if modality.starts_with(DIRECTION_PREFIX) => {
            vec![subject, session, acq, modality, run, EPI_SUFFIX]
        }
        SemanticType::Fmap => vec![subject, session, acq, run, modality],
    };
    Ok(join(subject, session, datatype, &entities))
}

fn required<'r>(
    row: &MappingRow,
    value: &'r str,
    entity: &'static str,
) -> Result<&'r str, NamingError> {
    let value = value.trim();
    if value.is_empty() {
        Err(NamingError::MissingEntity {
            scan_dir: row.scan_dir.clone(),
            entity,
        })
    } else {
        Ok(value)
    }
}

fn join(subject: &str, session: &str, datatype: SemanticType, entities: &[&str]) -> OutputName {
    let basename = entities
        .iter()
        .filter(|entity| !entity.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_");
    OutputName {
        directory: PathBuf::from(subject).join(session).join(datatype.as_str()),
        basename,
    }
}
