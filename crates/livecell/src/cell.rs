//! A single live cell: executes its source on a kernel and renders the result.
//!
//! The cell never holds its own source text; the store does. What the
//! renderer owns is its output area and the widget manager it was hooked up
//! to. `execute` never fails loudly: any failure (not hooked up, dead
//! connection, transport error, kernel exception) is rendered into the area
//! and reported as `None`, which callers use to decide whether to continue.

use std::sync::{Arc, Mutex as StdMutex, MutexGuard};

use jupyter_protocol::{ExecuteRequest, ReplyStatus};
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::context::Context;
use crate::manager::{widget_model_id, WidgetManager};
use crate::render::{AreaSize, OutputArea, RenderedOutput};
use crate::settings::MathjaxOptions;
use crate::store::{KernelAction, KernelStatus};

/// Outcome of a successful cell execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellResult {
    pub cell_id: String,
    /// Execution count from the `execute_result`, if the cell produced one
    pub execution_count: Option<usize>,
    /// Rendered size of the output area after execution
    pub size: AreaSize,
}

pub struct CellRenderer {
    id: String,
    notebook_id: String,
    ctx: Context,
    area: OutputArea,
    manager: StdMutex<Option<Arc<WidgetManager>>>,
}

impl CellRenderer {
    pub fn new(ctx: Context, id: impl Into<String>, notebook_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            notebook_id: notebook_id.into(),
            ctx,
            area: OutputArea::new(),
            manager: StdMutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn notebook_id(&self) -> &str {
        &self.notebook_id
    }

    /// Handle to the cell's output area
    pub fn area(&self) -> &OutputArea {
        &self.area
    }

    /// The widget manager this cell executes through, once hooked up
    pub fn manager(&self) -> Option<Arc<WidgetManager>> {
        self.hooked_manager().clone()
    }

    fn hooked_manager(&self) -> MutexGuard<'_, Option<Arc<WidgetManager>>> {
        self.manager.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current source from the store
    pub fn source(&self) -> Option<String> {
        self.ctx
            .store
            .get_state()
            .cell_source(&self.id)
            .map(str::to_string)
    }

    /// One-time presentation setup. Must only be called at construction.
    pub fn init(&self, mathjax: &MathjaxOptions) {
        if !self.area.configure(mathjax) {
            warn!("[cell] {} initialized more than once", self.id);
        }
    }

    /// Bind future executions to `manager`.
    pub fn hookup(&self, manager: Arc<WidgetManager>) {
        debug!(
            "[cell] {} hooked up to kernel {}",
            self.id,
            manager.kernel_id()
        );
        *self.hooked_manager() = Some(manager);
    }

    pub fn render_busy(&self, busy: bool) {
        self.area.set_busy(busy);
    }

    pub(crate) fn render_failure(&self, ename: &str, evalue: String) {
        self.area.clear();
        self.area.push(RenderedOutput::Error {
            ename: ename.to_string(),
            evalue,
            traceback: Vec::new(),
        });
        self.area.set_errored(true);
        self.area.set_busy(false);
    }

    fn set_kernel_status(&self, kernel_id: &str, status: KernelStatus) {
        if self.ctx.store.get_state().kernels.contains_key(kernel_id) {
            self.ctx.store.dispatch(KernelAction::SetStatus {
                id: kernel_id.to_string(),
                status,
            });
        }
    }

    /// Execute `source` on the kernel `kernel_id`.
    ///
    /// Returns `None` on any failure; the failure is rendered into the area
    /// and the area is marked errored.
    pub async fn execute(&self, kernel_id: &str, source: &str) -> Option<CellResult> {
        let Some(manager) = self.manager() else {
            error!("[cell] {} executed before hookup", self.id);
            self.render_failure("NotConnected", "cell is not hooked up to a kernel".into());
            return None;
        };

        let connection = manager.connection().clone();
        if connection.id() != kernel_id {
            error!(
                "[cell] {} asked to run on kernel {} but is hooked up to {}",
                self.id,
                kernel_id,
                connection.id()
            );
            self.render_failure(
                "NotConnected",
                format!("cell is not hooked up to kernel {}", kernel_id),
            );
            return None;
        }
        if !connection.is_alive() {
            error!("[cell] {} kernel {} is not connected", self.id, kernel_id);
            self.set_kernel_status(kernel_id, KernelStatus::Dead);
            self.render_failure("NotConnected", format!("kernel {} is not connected", kernel_id));
            return None;
        }

        self.area.clear();
        self.area.set_errored(false);
        self.area.set_busy(true);
        self.set_kernel_status(kernel_id, KernelStatus::Busy);

        info!("[cell] execute_request cell={} kernel={}", self.id, kernel_id);
        let response = connection
            .execute(ExecuteRequest::new(source.to_string()))
            .await;

        let response = match response {
            Ok(response) => {
                self.set_kernel_status(kernel_id, KernelStatus::Idle);
                response
            }
            Err(e) => {
                error!("[cell] {} transport failure: {}", self.id, e);
                let status = if connection.is_alive() {
                    KernelStatus::Idle
                } else {
                    KernelStatus::Dead
                };
                self.set_kernel_status(kernel_id, status);
                self.render_failure("TransportError", e.to_string());
                return None;
            }
        };

        let mut errored = response.status != ReplyStatus::Ok;
        let mut execution_count = None;

        for output in &response.outputs {
            if manager.handle_comm(output).await {
                continue;
            }
            let Some(rendered) = RenderedOutput::from_content(&output.content) else {
                continue;
            };

            match &rendered {
                RenderedOutput::ExecuteResult {
                    execution_count: count,
                    ..
                } => execution_count = Some(*count),
                RenderedOutput::Error { .. } => errored = true,
                _ => {}
            }

            if let RenderedOutput::DisplayData { data, .. }
            | RenderedOutput::ExecuteResult { data, .. } = &rendered
            {
                if let Some(model_id) = widget_model_id(data) {
                    match manager.display_view(model_id, &self.area).await {
                        Ok(_) => continue,
                        Err(e) => warn!(
                            "[cell] {} could not display widget {}: {}",
                            self.id, model_id, e
                        ),
                    }
                }
            }

            self.area.push(rendered);
        }

        self.area.set_busy(false);
        self.area.set_errored(errored);

        if errored {
            debug!("[cell] {} finished with an error", self.id);
            return None;
        }

        Some(CellResult {
            cell_id: self.id.clone(),
            execution_count,
            size: self.area.size(),
        })
    }
}

impl std::fmt::Debug for CellRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellRenderer")
            .field("id", &self.id)
            .field("notebook_id", &self.notebook_id)
            .field("hooked_up", &self.hooked_manager().is_some())
            .finish()
    }
}
