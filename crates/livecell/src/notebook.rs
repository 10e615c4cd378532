//! A notebook: an ordered run of live cells sharing one kernel.
//!
//! The notebook owns its cell renderers; cell sources live in the store.
//! Construction registers the notebook and its cells with the store, hookup
//! binds every cell to one [`WidgetManager`], and the `execute_*` methods run
//! cells through a [`Batch`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::batch::{Batch, CancelToken, Preprocessor};
use crate::cell::{CellRenderer, CellResult};
use crate::context::Context;
use crate::error::NotebookError;
use crate::kernel::KernelHandle;
use crate::manager::WidgetManager;
use crate::settings::MathjaxOptions;
use crate::store::{CellAction, NotebookAction};

/// A block of code lifted from the page, the unit a cell is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub id: String,
    pub source: String,
    /// Any other attributes the page attached to the block
    #[serde(flatten, default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CodeBlock {
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            extra: serde_json::Map::new(),
        }
    }
}

pub struct Notebook {
    id: String,
    ctx: Context,
    cells: Option<Vec<CellRenderer>>,
    manager: StdMutex<Option<Arc<WidgetManager>>>,
    cancel: CancelToken,
}

impl Notebook {
    /// An empty notebook with no cells yet.
    pub fn new(ctx: Context, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ctx,
            cells: None,
            manager: StdMutex::new(None),
            cancel: CancelToken::new(),
        }
    }

    /// Build a notebook from code blocks, registering it and its cells with
    /// the store and the notebook itself with `ctx`.
    ///
    /// Cell ids must be unique; a duplicate is rejected before the store is
    /// touched.
    pub fn from_code_blocks(
        ctx: Context,
        blocks: &[CodeBlock],
        mathjax: &MathjaxOptions,
    ) -> Result<Arc<Self>, NotebookError> {
        let mut seen = HashSet::new();
        for block in blocks {
            if !seen.insert(block.id.as_str()) {
                return Err(NotebookError::DuplicateCellId(block.id.clone()));
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        info!("[notebook] Creating notebook {} with {} cell(s)", id, blocks.len());

        ctx.store.dispatch(NotebookAction::Setup {
            id: id.clone(),
            cells: blocks.iter().map(|b| b.id.clone()).collect(),
        });

        let mut cells = Vec::with_capacity(blocks.len());
        for block in blocks {
            ctx.store.dispatch(CellAction::Add {
                id: block.id.clone(),
                source: block.source.clone(),
            });
            let cell = CellRenderer::new(ctx.clone(), block.id.clone(), id.clone());
            cell.init(mathjax);
            cells.push(cell);
        }

        let notebook = Arc::new(Self {
            id,
            ctx,
            cells: Some(cells),
            manager: StdMutex::new(None),
            cancel: CancelToken::new(),
        });
        notebook.ctx.register_notebook(&notebook);
        Ok(notebook)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Cells in order; empty if the notebook has none
    pub fn cells(&self) -> &[CellRenderer] {
        self.cells.as_deref().unwrap_or_default()
    }

    pub fn num_cells(&self) -> usize {
        self.cells().len()
    }

    pub fn get_cell(&self, index: usize) -> Result<&CellRenderer, NotebookError> {
        let cells = self.cells.as_ref().ok_or(NotebookError::NotInitialized)?;
        cells.get(index).ok_or(NotebookError::IndexOutOfRange {
            index,
            len: cells.len(),
        })
    }

    pub fn get_cell_by_id(&self, id: &str) -> Option<&CellRenderer> {
        self.cells().iter().find(|cell| cell.id() == id)
    }

    pub fn last_cell(&self) -> Result<&CellRenderer, NotebookError> {
        let cells = self.cells.as_ref().ok_or(NotebookError::NotInitialized)?;
        cells
            .last()
            .ok_or(NotebookError::IndexOutOfRange { index: 0, len: 0 })
    }

    /// The widget manager from the latest hookup
    pub fn widget_manager(&self) -> Option<Arc<WidgetManager>> {
        self.hooked_manager().clone()
    }

    fn hooked_manager(&self) -> MutexGuard<'_, Option<Arc<WidgetManager>>> {
        self.manager.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Token that stops the running batch before its next cell
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Bind every cell to `kernel` through a fresh widget manager.
    ///
    /// Does nothing if the kernel has no connection.
    pub fn hookup(&self, kernel: &KernelHandle) {
        let Some(connection) = kernel.connection.clone() else {
            debug!(
                "[notebook] {} hookup skipped, kernel {} has no connection",
                self.id, kernel.id
            );
            return;
        };

        let manager = Arc::new(WidgetManager::new(
            connection,
            self.ctx.module_loader.clone(),
        ));
        for cell in self.cells() {
            cell.hookup(manager.clone());
        }
        *self.hooked_manager() = Some(manager);

        self.ctx.store.dispatch(NotebookAction::AttachKernel {
            id: self.id.clone(),
            kernel_id: kernel.id.clone(),
        });
        info!("[notebook] {} hooked up to kernel {}", self.id, kernel.id);
    }

    fn position(&self, cell_id: &str) -> Option<usize> {
        let index = self
            .cells
            .as_ref()?
            .iter()
            .position(|cell| cell.id() == cell_id);
        if index.is_none() {
            debug!("[notebook] {} has no cell {}", self.id, cell_id);
        }
        index
    }

    /// Execute every cell from the first through `cell_id`, in order.
    ///
    /// Every cell in the range is marked busy before the first one runs.
    /// Stops at the first failure. Returns the last cell's result, or `None`
    /// if the notebook has no such cell, a cell failed, or the batch was
    /// cancelled.
    pub async fn execute_up_to(
        &self,
        kernel_id: &str,
        cell_id: &str,
        preprocessor: Option<&Preprocessor>,
    ) -> Option<CellResult> {
        let index = self.position(cell_id)?;
        self.run_batch(kernel_id, &self.cells()[..=index], preprocessor, true)
            .await
    }

    /// Execute just the cell `cell_id`.
    pub async fn execute_only(
        &self,
        kernel_id: &str,
        cell_id: &str,
        preprocessor: Option<&Preprocessor>,
    ) -> Option<CellResult> {
        let index = self.position(cell_id)?;
        self.run_batch(kernel_id, &self.cells()[index..=index], preprocessor, false)
            .await
    }

    /// Execute every cell in order.
    pub async fn execute_all(
        &self,
        kernel_id: &str,
        preprocessor: Option<&Preprocessor>,
    ) -> Option<CellResult> {
        self.cells.as_ref()?;
        self.run_batch(kernel_id, self.cells(), preprocessor, true)
            .await
    }

    async fn run_batch(
        &self,
        kernel_id: &str,
        cells: &[CellRenderer],
        preprocessor: Option<&Preprocessor>,
        mark_busy: bool,
    ) -> Option<CellResult> {
        let mut batch = Batch::new(
            cells,
            kernel_id,
            self.ctx.store.get_state(),
            preprocessor,
            self.cancel.clone(),
        );
        if mark_busy {
            batch.mark_busy();
        }
        let result = batch.run().await;
        debug!("[notebook] {} batch finished: {:?}", self.id, batch.state());
        result
    }
}

impl std::fmt::Debug for Notebook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notebook")
            .field("id", &self.id)
            .field("cells", &self.cells)
            .field("manager", &*self.hooked_manager())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(ids: &[&str]) -> Vec<CodeBlock> {
        ids.iter()
            .map(|id| CodeBlock::new(*id, format!("print('{}')", id)))
            .collect()
    }

    #[test]
    fn test_from_code_blocks_registers_with_store() {
        let ctx = Context::default();
        let notebook =
            Notebook::from_code_blocks(ctx.clone(), &blocks(&["a", "b"]), &MathjaxOptions::default())
                .unwrap();

        let state = ctx.store.get_state();
        assert_eq!(state.notebooks[notebook.id()].cells, vec!["a", "b"]);
        assert_eq!(state.cell_source("b"), Some("print('b')"));
        assert!(notebook
            .cells()
            .iter()
            .all(|cell| cell.notebook_id() == notebook.id()));
        assert!(notebook.cells()[0].area().mathjax().is_some());
    }

    #[test]
    fn test_notebook_ids_are_unique() {
        let ctx = Context::default();
        let mathjax = MathjaxOptions::default();
        let first = Notebook::from_code_blocks(ctx.clone(), &[], &mathjax).unwrap();
        let second = Notebook::from_code_blocks(ctx.clone(), &[], &mathjax).unwrap();
        assert_ne!(first.id(), second.id());
        assert_eq!(ctx.store.get_state().notebooks.len(), 2);
    }

    #[test]
    fn test_uninitialized_notebook() {
        let notebook = Notebook::new(Context::default(), "nb");
        assert_eq!(notebook.num_cells(), 0);
        assert_eq!(notebook.get_cell(0).unwrap_err(), NotebookError::NotInitialized);
        assert_eq!(notebook.last_cell().unwrap_err(), NotebookError::NotInitialized);
        assert!(notebook.get_cell_by_id("a").is_none());
    }

    #[test]
    fn test_last_cell() {
        let mathjax = MathjaxOptions::default();
        let notebook =
            Notebook::from_code_blocks(Context::default(), &blocks(&["a", "b"]), &mathjax).unwrap();
        assert_eq!(notebook.last_cell().unwrap().id(), "b");

        let empty = Notebook::from_code_blocks(Context::default(), &[], &mathjax).unwrap();
        assert_eq!(
            empty.last_cell().unwrap_err(),
            NotebookError::IndexOutOfRange { index: 0, len: 0 }
        );
    }

    #[test]
    fn test_hookup_without_connection_is_noop() {
        let ctx = Context::default();
        let notebook =
            Notebook::from_code_blocks(ctx.clone(), &blocks(&["a"]), &MathjaxOptions::default())
                .unwrap();
        notebook.hookup(&KernelHandle::disconnected("k1"));

        assert!(notebook.widget_manager().is_none());
        assert!(notebook.cells()[0].manager().is_none());
        assert_eq!(ctx.store.get_state().notebooks[notebook.id()].kernel_id, None);
    }

    #[tokio::test]
    async fn test_execute_on_uninitialized_notebook() {
        let notebook = Notebook::new(Context::default(), "nb");
        assert!(notebook.execute_all("k1", None).await.is_none());
        assert!(notebook.execute_up_to("k1", "a", None).await.is_none());
        assert!(notebook.execute_only("k1", "a", None).await.is_none());
    }

    #[test]
    fn test_code_block_keeps_extra_attributes() {
        let block: CodeBlock = serde_json::from_value(serde_json::json!({
            "id": "a",
            "source": "1",
            "language": "python"
        }))
        .unwrap();
        assert_eq!(block.id, "a");
        assert_eq!(block.extra["language"], "python");
    }
}
