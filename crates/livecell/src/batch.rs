//! Sequential execution of a run of cells.
//!
//! A batch walks its cells strictly in order, one kernel round trip at a
//! time, and stops at the first cell that fails. Sources are read from the
//! store snapshot taken when the batch starts, so edits dispatched while the
//! batch is running apply to the next batch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, info};
use serde::Serialize;

use crate::cell::{CellRenderer, CellResult};
use crate::store::State;

/// Rewrites a cell's source before it is sent to the kernel
pub type Preprocessor = dyn Fn(&str) -> String + Send + Sync;

/// Where a batch is in its run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BatchState {
    /// Not started
    Idle,
    /// Executing the cell at `next`
    Running { next: usize },
    /// Every cell ran successfully
    Completed,
    /// The cell at `failed` did not produce a result
    Aborted { failed: usize },
    /// Stopped by a [`CancelToken`] before the cell at `next`
    Cancelled { next: usize },
}

/// Stops a running batch before its next cell.
///
/// Clones share the flag. The cell currently executing always finishes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub(crate) struct Batch<'a> {
    cells: &'a [CellRenderer],
    kernel_id: &'a str,
    snapshot: Arc<State>,
    preprocessor: Option<&'a Preprocessor>,
    cancel: CancelToken,
    state: BatchState,
    last: Option<CellResult>,
}

impl<'a> Batch<'a> {
    pub(crate) fn new(
        cells: &'a [CellRenderer],
        kernel_id: &'a str,
        snapshot: Arc<State>,
        preprocessor: Option<&'a Preprocessor>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            cells,
            kernel_id,
            snapshot,
            preprocessor,
            cancel,
            state: BatchState::Idle,
            last: None,
        }
    }

    pub(crate) fn state(&self) -> &BatchState {
        &self.state
    }

    /// Mark every cell of the batch busy before anything executes
    pub(crate) fn mark_busy(&self) {
        for cell in self.cells {
            cell.render_busy(true);
        }
    }

    /// Run the batch to the end, returning the last cell's result.
    ///
    /// `None` if any cell failed or the batch was cancelled.
    pub(crate) async fn run(&mut self) -> Option<CellResult> {
        self.cancel.reset();
        self.state = BatchState::Running { next: 0 };

        while let BatchState::Running { next } = self.state {
            self.state = self.step(next).await;
        }

        match self.state {
            BatchState::Completed => self.last.take(),
            BatchState::Aborted { failed } => {
                self.release(failed + 1);
                None
            }
            BatchState::Cancelled { next } => {
                info!(
                    "[notebook] Batch cancelled with {} cell(s) not run",
                    self.cells.len() - next
                );
                self.release(next);
                None
            }
            _ => None,
        }
    }

    async fn step(&mut self, index: usize) -> BatchState {
        let Some(cell) = self.cells.get(index) else {
            return BatchState::Completed;
        };
        if self.cancel.is_cancelled() {
            return BatchState::Cancelled { next: index };
        }

        let Some(source) = self.snapshot.cell_source(cell.id()) else {
            error!("[notebook] Cell {} has no source in the store", cell.id());
            cell.render_failure("SourceMissing", format!("no source for cell {}", cell.id()));
            return BatchState::Aborted { failed: index };
        };
        let source = match self.preprocessor {
            Some(preprocess) => preprocess(source),
            None => source.to_string(),
        };

        debug!("[notebook] Executing cell {} ({}/{})", cell.id(), index + 1, self.cells.len());
        match cell.execute(self.kernel_id, &source).await {
            Some(result) => {
                self.last = Some(result);
                BatchState::Running { next: index + 1 }
            }
            None => {
                error!("[notebook] Error executing cell {}", cell.id());
                BatchState::Aborted { failed: index }
            }
        }
    }

    /// Clear the busy mark on cells from `from` onwards; they never ran.
    fn release(&self, from: usize) {
        for cell in self.cells.iter().skip(from) {
            cell.render_busy(false);
        }
    }
}
