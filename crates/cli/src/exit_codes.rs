//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success, no rows outside tolerance                   |
//! | 1    | Comparison ran; rows outside tolerance (or missing)  |
//! | 2    | Usage error (bad args, bad range or tolerance)       |
//! | 3    | Required columns missing from a dataset              |
//! | 4    | Value list empty or count mismatch                   |
//! | 5    | Input unreadable or unparseable, output unwritable   |
//! | 6    | Comparison failed while processing                   |
//! | 7    | Configuration file invalid                           |
//!
//! Like `diff(1)`, exit 1 means "inputs differ", not "the tool failed".

use belcheck_recon::ErrorCategory;

pub const EXIT_SUCCESS: u8 = 0;

/// Rows counted as errors by the applied view.
pub const EXIT_ERRORS_FOUND: u8 = 1;

/// Bad arguments, row range with end before start, tolerance out of range.
pub const EXIT_USAGE: u8 = 2;

pub const EXIT_MISSING_COLUMNS: u8 = 3;

/// Empty value block, or value count differs from reference rows (strict policy).
pub const EXIT_INVALID_VALUES: u8 = 4;

/// Dataset or value file could not be read or parsed, or the export could not be written.
pub const EXIT_LOAD: u8 = 5;

/// Key type mismatch, text in the value column, cancellation.
pub const EXIT_PROCESSING: u8 = 6;

pub const EXIT_CONFIG: u8 = 7;

/// Exit code for an engine error.
pub fn recon_exit_code(category: ErrorCategory) -> u8 {
    match category {
        ErrorCategory::Schema => EXIT_MISSING_COLUMNS,
        ErrorCategory::Values => EXIT_INVALID_VALUES,
        ErrorCategory::Parameters => EXIT_USAGE,
        ErrorCategory::Processing => EXIT_PROCESSING,
        ErrorCategory::Config => EXIT_CONFIG,
        ErrorCategory::Io => EXIT_LOAD,
    }
}
