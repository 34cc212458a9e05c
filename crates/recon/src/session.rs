//! Compute-once / re-filter-many reconciliation session.
//!
//! `run_comparison` does the expensive work and replaces the cached table
//! wholesale. `apply_view` only reads the cache. A failed run leaves the
//! previous table and view untouched.

use std::sync::Arc;
use std::time::Instant;

use crate::classify::{classify, ClassifiedView, ViewOptions};
use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::merge::{merge, MergeInput};
use crate::model::{ComparisonTable, Dataset, RowRange};
use crate::progress::ProgressSink;
use crate::schema::{align_values, SchemaValidator};
use crate::values::parse_value_list;

#[derive(Debug, Default)]
pub struct ReconciliationSession {
    config: ReconConfig,
    table: Option<Arc<ComparisonTable>>,
    last_view: Option<ClassifiedView>,
}

impl ReconciliationSession {
    pub fn new(config: ReconConfig) -> Self {
        Self { config, table: None, last_view: None }
    }

    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    pub fn has_result(&self) -> bool {
        self.table.is_some()
    }

    /// The cached raw table from the last successful run.
    pub fn table(&self) -> Option<&Arc<ComparisonTable>> {
        self.table.as_ref()
    }

    /// The view produced by the last `apply_view` since the last successful run.
    pub fn last_view(&self) -> Option<&ClassifiedView> {
        self.last_view.as_ref()
    }

    /// Validate, merge and cache. On error the error is logged and returned,
    /// and the existing cache is kept.
    pub fn run_comparison(
        &mut self,
        reference: &Dataset,
        subject: &Dataset,
        value_text: &str,
        range: Option<RowRange>,
        progress: &mut dyn ProgressSink,
    ) -> Result<Arc<ComparisonTable>, ReconError> {
        let started = Instant::now();
        log::info!(
            "comparison started: {} reference rows, {} subject rows",
            reference.len(),
            subject.len()
        );

        match self.compute(reference, subject, value_text, range, progress) {
            Ok(table) => {
                let table = Arc::new(table);
                log::info!(
                    "comparison finished in {:?}: {} rows",
                    started.elapsed(),
                    table.len()
                );
                self.table = Some(Arc::clone(&table));
                self.last_view = None;
                Ok(table)
            }
            Err(e) => {
                log::error!("comparison failed: {e}");
                Err(e)
            }
        }
    }

    fn compute(
        &self,
        reference: &Dataset,
        subject: &Dataset,
        value_text: &str,
        range: Option<RowRange>,
        progress: &mut dyn ProgressSink,
    ) -> Result<ComparisonTable, ReconError> {
        let (mut reference, index_offset) = apply_range(reference, range)?;
        let values = parse_value_list(value_text)?;

        let mut subject = subject.clone();
        let schema =
            SchemaValidator::new(&self.config.columns).validate(&mut reference, &mut subject)?;
        let attached = align_values(&values, reference.len(), self.config.values.count_policy)?;

        let input = MergeInput {
            reference: &reference,
            subject: &subject,
            attached: &attached,
            schema: &schema,
            index_offset,
        };
        merge(&input, progress)
    }

    /// Classify the cached table. `Ok(None)` means there is nothing to filter yet.
    pub fn apply_view(&mut self, options: &ViewOptions) -> Result<Option<&ClassifiedView>, ReconError> {
        let Some(table) = &self.table else {
            log::debug!("apply_view: no comparison result yet");
            return Ok(None);
        };
        let view = classify(&table.rows, options).map_err(|e| {
            log::error!("view failed: {e}");
            e
        })?;
        log::debug!(
            "view {} (tolerance {}, exclude missing {}): {} of {} rows, {} error(s)",
            options.mode,
            options.tolerance,
            options.exclude_missing,
            view.rows.len(),
            table.len(),
            view.error_count
        );
        self.last_view = Some(view);
        Ok(self.last_view.as_ref())
    }

    /// `apply_view` with the configured defaults.
    pub fn apply_default_view(&mut self) -> Result<Option<&ClassifiedView>, ReconError> {
        let options = self.config.view.options();
        self.apply_view(&options)
    }
}

/// Slice the reference rows to the inclusive range. Returns the slice and the
/// position of its first row in the full dataset.
///
/// The end is clamped to the row count before comparing it with the start.
pub fn apply_range(reference: &Dataset, range: Option<RowRange>) -> Result<(Dataset, usize), ReconError> {
    let Some(RowRange { start, end }) = range else {
        return Ok((reference.clone(), 0));
    };
    let end = match end {
        Some(end) => {
            let end = end.min(reference.len());
            if end < start {
                return Err(ReconError::InvalidRange { start, end });
            }
            end
        }
        None => reference.len(),
    };
    Ok((reference.slice(start, end), start))
}
