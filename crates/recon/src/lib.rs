//! `belcheck-recon`: keyed BEL reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded datasets and a pasted value list,
//! returns a comparison table and tolerance-classified views of it.
//! No CLI or IO dependencies.

pub mod classify;
pub mod config;
pub mod error;
pub mod format;
pub mod merge;
pub mod model;
pub mod progress;
pub mod schema;
pub mod session;
pub mod values;

pub use classify::{ClassifiedView, ViewMode, ViewOptions, ViewSummary};
pub use config::ReconConfig;
pub use error::{ErrorCategory, ReconError};
pub use model::{Cell, ComparisonRow, ComparisonTable, Dataset, RowRange};
pub use progress::{LogProgress, NoProgress, ProgressSink};
pub use session::ReconciliationSession;
