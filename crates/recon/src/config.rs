use serde::Deserialize;

use crate::classify::{ViewMode, ViewOptions, DEFAULT_TOLERANCE, MAX_TOLERANCE, MIN_TOLERANCE};
use crate::error::ReconError;

pub const DEFAULT_KEY_COLUMNS: [&str; 4] = ["POL_NO", "RIDER_PRD_CODE", "INIT_V_CHECK", "LOA_CODE"];
pub const DEFAULT_SUBJECT_VALUE: &str = "BEL";
pub const DEFAULT_SUBJECT_LABEL: &str = "PATHWISE_BEL";
pub const DEFAULT_REFERENCE_LABEL: &str = "INNOLINC_BEL";

/// Headers the export writes itself; labels may not collide with them.
const RESERVED_HEADERS: [&str; 3] = ["ROW", "INDEX", "DIFF"];

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReconConfig {
    #[serde(default)]
    pub columns: ColumnConfig,
    #[serde(default)]
    pub values: ValuesConfig,
    #[serde(default)]
    pub view: ViewConfig,
}

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    /// Composite key columns, in key order.
    pub keys: Vec<String>,
    /// The subject dataset's own value column.
    pub subject_value: String,
    /// Key columns written to the export, in order.
    pub export_keys: Vec<String>,
    /// Export header for the subject value.
    pub subject_label: String,
    /// Export header for the attached reference value.
    pub reference_label: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            keys: DEFAULT_KEY_COLUMNS.iter().map(|s| s.to_string()).collect(),
            subject_value: DEFAULT_SUBJECT_VALUE.into(),
            export_keys: DEFAULT_KEY_COLUMNS[..2].iter().map(|s| s.to_string()).collect(),
            subject_label: DEFAULT_SUBJECT_LABEL.into(),
            reference_label: DEFAULT_REFERENCE_LABEL.into(),
        }
    }
}

impl ColumnConfig {
    /// Positions of the export keys within `keys`. Valid after `validate`.
    pub fn export_key_positions(&self) -> Vec<usize> {
        self.export_keys
            .iter()
            .filter_map(|e| self.keys.iter().position(|k| k.eq_ignore_ascii_case(e)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ValuesConfig {
    pub count_policy: CountPolicy,
}

/// What to do when the value count differs from the reference row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountPolicy {
    /// Reject the run.
    #[default]
    Strict,
    /// Pad with missing values or truncate, with a warning.
    Lenient,
}

// ---------------------------------------------------------------------------
// View defaults
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub mode: ViewMode,
    pub tolerance: f64,
    pub exclude_missing: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            mode: ViewMode::All,
            tolerance: DEFAULT_TOLERANCE,
            exclude_missing: false,
        }
    }
}

impl ViewConfig {
    pub fn options(&self) -> ViewOptions {
        ViewOptions {
            mode: self.mode,
            tolerance: self.tolerance,
            exclude_missing: self.exclude_missing,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, ReconError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ReconError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let cols = &self.columns;

        if cols.keys.is_empty() {
            return Err(ReconError::ConfigValidation("at least one key column is required".into()));
        }

        for (i, key) in cols.keys.iter().enumerate() {
            if key.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!("key column {i} is blank")));
            }
            if cols.keys[..i].iter().any(|k| k.eq_ignore_ascii_case(key)) {
                return Err(ReconError::ConfigValidation(format!(
                    "key column '{key}' is listed twice"
                )));
            }
        }

        if cols.subject_value.trim().is_empty() {
            return Err(ReconError::ConfigValidation("subject_value is blank".into()));
        }
        if cols.keys.iter().any(|k| k.eq_ignore_ascii_case(&cols.subject_value)) {
            return Err(ReconError::ConfigValidation(format!(
                "subject_value '{}' is also a key column",
                cols.subject_value
            )));
        }

        for export_key in &cols.export_keys {
            if !cols.keys.iter().any(|k| k.eq_ignore_ascii_case(export_key)) {
                return Err(ReconError::ConfigValidation(format!(
                    "export key '{export_key}' is not one of the key columns"
                )));
            }
        }

        for label in [&cols.subject_label, &cols.reference_label] {
            if label.trim().is_empty() {
                return Err(ReconError::ConfigValidation("export labels must not be blank".into()));
            }
            if RESERVED_HEADERS.iter().any(|r| r.eq_ignore_ascii_case(label)) {
                return Err(ReconError::ConfigValidation(format!(
                    "export label '{label}' collides with a reserved header"
                )));
            }
        }
        if cols.subject_label.eq_ignore_ascii_case(&cols.reference_label) {
            return Err(ReconError::ConfigValidation(
                "subject_label and reference_label must differ".into(),
            ));
        }

        let t = self.view.tolerance;
        if !(MIN_TOLERANCE..=MAX_TOLERANCE).contains(&t) {
            return Err(ReconError::InvalidTolerance(t));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
