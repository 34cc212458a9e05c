use std::fmt;

use crate::model::{ColumnKind, DatasetRole};

#[derive(Debug, Clone, PartialEq)]
pub enum ReconError {
    /// Required columns absent from one dataset (all names for that dataset).
    MissingColumns { dataset: DatasetRole, columns: Vec<String> },
    /// External value block produced nothing usable.
    InvalidValues(String),
    /// External value count differs from the reference row count.
    ValueCountMismatch { values: usize, rows: usize },
    /// Row range with end before start.
    InvalidRange { start: usize, end: usize },
    /// Tolerance outside [MIN_TOLERANCE, MAX_TOLERANCE].
    InvalidTolerance(f64),
    /// A key column is numeric on one side and text on the other.
    KeyTypeMismatch { column: String, reference: ColumnKind, subject: ColumnKind },
    /// Subject value cell holds text.
    ValueNotNumeric { row: usize, value: String },
    /// Progress sink asked the merge to stop.
    Cancelled,
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (unknown export key, bad labels, etc.).
    ConfigValidation(String),
    /// IO error (file read, etc.).
    Io(String),
}

/// Coarse grouping used by callers to pick exit codes and messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Schema,
    Values,
    Parameters,
    Processing,
    Config,
    Io,
}

impl ReconError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingColumns { .. } => ErrorCategory::Schema,
            Self::InvalidValues(_) | Self::ValueCountMismatch { .. } => ErrorCategory::Values,
            Self::InvalidRange { .. } | Self::InvalidTolerance(_) => ErrorCategory::Parameters,
            Self::KeyTypeMismatch { .. } | Self::ValueNotNumeric { .. } | Self::Cancelled => {
                ErrorCategory::Processing
            }
            Self::ConfigParse(_) | Self::ConfigValidation(_) => ErrorCategory::Config,
            Self::Io(_) => ErrorCategory::Io,
        }
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingColumns { dataset, columns } => {
                write!(f, "{dataset} dataset is missing column(s): {}", columns.join(", "))
            }
            Self::InvalidValues(msg) => write!(f, "invalid values: {msg}"),
            Self::ValueCountMismatch { values, rows } => write!(
                f,
                "value count ({values}) does not match the reference row count ({rows})"
            ),
            Self::InvalidRange { start, end } => {
                write!(f, "row range end ({end}) must not be before start ({start})")
            }
            Self::InvalidTolerance(t) => write!(
                f,
                "tolerance {t} is outside [{}, {}]",
                crate::classify::MIN_TOLERANCE,
                crate::classify::MAX_TOLERANCE
            ),
            Self::KeyTypeMismatch { column, reference, subject } => write!(
                f,
                "key column '{column}' is {reference} in the reference dataset but {subject} in the subject dataset"
            ),
            Self::ValueNotNumeric { row, value } => {
                write!(f, "subject row {row}: value '{value}' is not numeric")
            }
            Self::Cancelled => write!(f, "comparison cancelled"),
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
