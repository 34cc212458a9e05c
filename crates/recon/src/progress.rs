/// Receives row-granular progress from long merges.
///
/// Progress is advisory. `is_cancelled` is polled between rows of the
/// index-resolution pass; returning true aborts the run with
/// [`crate::ReconError::Cancelled`].
pub trait ProgressSink {
    fn report(&mut self, current: usize, total: usize);

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Discards progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _current: usize, _total: usize) {}
}

/// Logs progress at debug level every `every` rows, and on the last row.
#[derive(Debug, Clone, Copy)]
pub struct LogProgress {
    every: usize,
}

impl LogProgress {
    pub fn new(every: usize) -> Self {
        Self { every: every.max(1) }
    }
}

impl ProgressSink for LogProgress {
    fn report(&mut self, current: usize, total: usize) {
        if current % self.every == 0 || current == total {
            log::debug!("resolving indices: {current}/{total}");
        }
    }
}
