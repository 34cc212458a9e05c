//! Tolerance classification and view filtering over a comparison table.
//!
//! Two thresholds coexist: a row counts as an *error* when
//! |DIFF| > τ, but the differences view keeps rows with |DIFF| ≥ τ. A row
//! sitting exactly on the tolerance is therefore shown but not counted.

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::ComparisonRow;

pub const MIN_TOLERANCE: f64 = 0.000001;
pub const MAX_TOLERANCE: f64 = 1.0;
pub const DEFAULT_TOLERANCE: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// Every row of the table.
    #[default]
    All,
    /// Rows with a missing DIFF or |DIFF| ≥ τ.
    #[serde(alias = "differences_only")]
    Differences,
}

impl std::fmt::Display for ViewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Differences => write!(f, "differences"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewOptions {
    pub mode: ViewMode,
    pub tolerance: f64,
    /// Drop missing-DIFF rows from the view and from the error count.
    pub exclude_missing: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            mode: ViewMode::All,
            tolerance: DEFAULT_TOLERANCE,
            exclude_missing: false,
        }
    }
}

impl ViewOptions {
    pub fn validate(&self) -> Result<(), ReconError> {
        if (MIN_TOLERANCE..=MAX_TOLERANCE).contains(&self.tolerance) {
            Ok(())
        } else {
            Err(ReconError::InvalidTolerance(self.tolerance))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSummary {
    /// Rows in the raw table.
    pub total_rows: usize,
    /// Rows in this view.
    pub view_rows: usize,
    /// Raw rows with a missing DIFF.
    pub missing_rows: usize,
    pub error_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_abs_diff: Option<f64>,
    pub options: ViewOptions,
}

/// A filtered, renumbered view of the raw table plus its error count.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedView {
    pub rows: Vec<ComparisonRow>,
    pub error_count: usize,
    pub summary: ViewSummary,
}

/// Error rule. Missing counts as an error unless excluded.
pub fn is_error(magnitude: Option<f64>, tolerance: f64, exclude_missing: bool) -> bool {
    match magnitude {
        Some(m) => m > tolerance,
        None => !exclude_missing,
    }
}

/// Differences-view rule. Inclusive at the boundary, unlike [`is_error`].
pub fn shows_as_difference(magnitude: Option<f64>, tolerance: f64) -> bool {
    match magnitude {
        Some(m) => m >= tolerance,
        None => true,
    }
}

pub fn classify(rows: &[ComparisonRow], options: &ViewOptions) -> Result<ClassifiedView, ReconError> {
    options.validate()?;
    let tolerance = options.tolerance;

    let mut error_count = 0usize;
    let mut missing_rows = 0usize;
    let mut max_abs_diff: Option<f64> = None;
    let mut view = Vec::new();

    for row in rows {
        let magnitude = row.diff_magnitude();

        match magnitude {
            Some(m) => max_abs_diff = Some(max_abs_diff.map_or(m, |cur| cur.max(m))),
            None => missing_rows += 1,
        }

        if is_error(magnitude, tolerance, options.exclude_missing) {
            error_count += 1;
        }

        if options.exclude_missing && magnitude.is_none() {
            continue;
        }
        let keep = match options.mode {
            ViewMode::All => true,
            ViewMode::Differences => shows_as_difference(magnitude, tolerance),
        };
        if keep {
            let mut r = row.clone();
            r.row = view.len();
            view.push(r);
        }
    }

    let summary = ViewSummary {
        total_rows: rows.len(),
        view_rows: view.len(),
        missing_rows,
        error_count,
        max_abs_diff,
        options: *options,
    };

    Ok(ClassifiedView { rows: view, error_count, summary })
}
