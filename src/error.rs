use std::error::Error;
use std::fmt;

use crate::metrics::UnitId;

/// Typed failures of the curation data contract.
///
/// Configuration-level failures (missing folders, unreadable artifacts)
/// are reported as plain `anyhow` errors with path context; this enum
/// covers the failures tests and callers need to tell apart.
#[derive(Debug, Clone, PartialEq)]
pub enum CurationError {
    /// Required metric columns are absent from the available table.
    MissingMetrics(Vec<String>),
    /// No units remain after restricting metrics to the sorting's unit set.
    NoUnits,
    /// The model produced class labels the conversion mapping does not cover.
    LabelMismatch(Vec<i32>),
    /// A caller-supplied table names units the sorting does not own.
    UnknownUnits(Vec<UnitId>),
}

impl fmt::Display for CurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurationError::MissingMetrics(columns) => write!(
                f,
                "input data does not contain all required metrics for classification; missing metrics: {}",
                columns.join(", ")
            ),
            CurationError::NoUnits => write!(f, "no units present in sorting data"),
            CurationError::LabelMismatch(labels) => write!(
                f,
                "labels in predictions do not match those in label conversion: {}",
                labels
                    .iter()
                    .map(|label| label.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            CurationError::UnknownUnits(unit_ids) => write!(
                f,
                "metrics table refers to units that are not in the sorting: {}",
                unit_ids
                    .iter()
                    .map(|unit| unit.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

impl Error for CurationError {}
