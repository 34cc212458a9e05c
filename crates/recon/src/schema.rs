use crate::config::{ColumnConfig, CountPolicy};
use crate::error::ReconError;
use crate::model::{Dataset, DatasetRole};

/// Column positions resolved against canonicalized datasets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSchema {
    pub key_names: Vec<String>,
    pub reference_keys: Vec<usize>,
    pub subject_keys: Vec<usize>,
    pub subject_value: usize,
}

pub struct SchemaValidator<'a> {
    columns: &'a ColumnConfig,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(columns: &'a ColumnConfig) -> Self {
        Self { columns }
    }

    /// Check required columns (reference first, then subject) and rewrite both
    /// datasets' headers to upper case. Nothing is rewritten on failure.
    pub fn validate(
        &self,
        reference: &mut Dataset,
        subject: &mut Dataset,
    ) -> Result<ResolvedSchema, ReconError> {
        check_required(reference, DatasetRole::Reference, self.columns.keys.iter())?;
        check_required(
            subject,
            DatasetRole::Subject,
            self.columns.keys.iter().chain(std::iter::once(&self.columns.subject_value)),
        )?;

        reference.canonicalize_columns();
        subject.canonicalize_columns();

        let position = |ds: &Dataset, name: &str| {
            ds.column_index(name).ok_or_else(|| ReconError::ConfigValidation(format!(
                "column '{name}' vanished during canonicalization"
            )))
        };

        let mut reference_keys = Vec::with_capacity(self.columns.keys.len());
        let mut subject_keys = Vec::with_capacity(self.columns.keys.len());
        for key in &self.columns.keys {
            reference_keys.push(position(reference, key)?);
            subject_keys.push(position(subject, key)?);
        }

        Ok(ResolvedSchema {
            key_names: self.columns.keys.iter().map(|k| k.to_uppercase()).collect(),
            reference_keys,
            subject_keys,
            subject_value: position(subject, &self.columns.subject_value)?,
        })
    }
}

fn check_required<'n>(
    dataset: &Dataset,
    role: DatasetRole,
    required: impl Iterator<Item = &'n String>,
) -> Result<(), ReconError> {
    let missing: Vec<String> = required
        .filter(|name| dataset.column_index(name).is_none())
        .map(|name| name.to_uppercase())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ReconError::MissingColumns { dataset: role, columns: missing })
    }
}

/// Align the external values with `rows` reference rows.
///
/// Strict: any length difference is an error. Lenient: pad with missing or
/// truncate, logging a warning. NaN values become missing in both modes.
pub fn align_values(
    values: &[f64],
    rows: usize,
    policy: CountPolicy,
) -> Result<Vec<Option<f64>>, ReconError> {
    if values.len() != rows {
        match policy {
            CountPolicy::Strict => {
                return Err(ReconError::ValueCountMismatch { values: values.len(), rows });
            }
            CountPolicy::Lenient => {
                log::warn!(
                    "value count ({}) differs from reference rows ({}); {}",
                    values.len(),
                    rows,
                    if values.len() < rows { "padding with missing values" } else { "truncating" }
                );
            }
        }
    }

    let mut aligned: Vec<Option<f64>> = values
        .iter()
        .take(rows)
        .map(|v| if v.is_nan() { None } else { Some(*v) })
        .collect();
    aligned.resize(rows, None);
    Ok(aligned)
}
