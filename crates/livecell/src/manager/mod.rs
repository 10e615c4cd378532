//! The rendering bridge between a kernel connection and the page.
//!
//! A [`WidgetManager`] is created once per notebook hookup and shared by every
//! cell of that notebook. It is scoped to a single kernel connection: it owns
//! the widget models that connection has opened and the class registry used
//! to turn those models into views. Hooking a notebook up to another kernel
//! builds a new manager rather than reusing this one.

use std::sync::Arc;

use jupyter_protocol::JupyterMessageContent;
use log::{debug, warn};

use crate::error::WidgetError;
use crate::kernel::{KernelConnection, KernelOutput};
use crate::render::{OutputArea, ViewRoot};

pub mod registry;
pub mod widgets;

pub use registry::{
    ClassKind, FnLoader, ModuleExports, ModuleLoader, ModuleRegistry, WidgetClass,
};
pub use widgets::{WidgetModel, WidgetModels, WIDGET_TARGET};

/// Mime type of a display bundle that refers to a widget model
pub const WIDGET_VIEW_MIMETYPE: &str = "application/vnd.jupyter.widget-view+json";

pub struct WidgetManager {
    connection: Arc<dyn KernelConnection>,
    registry: ModuleRegistry,
    models: WidgetModels,
}

impl WidgetManager {
    pub fn new(
        connection: Arc<dyn KernelConnection>,
        loader: Option<Arc<dyn ModuleLoader>>,
    ) -> Self {
        debug!("[widgets] new manager for kernel {}", connection.id());
        Self {
            connection,
            registry: ModuleRegistry::new(loader),
            models: WidgetModels::new(),
        }
    }

    pub fn connection(&self) -> &Arc<dyn KernelConnection> {
        &self.connection
    }

    pub fn kernel_id(&self) -> &str {
        self.connection.id()
    }

    pub fn models(&self) -> &WidgetModels {
        &self.models
    }

    /// Resolve a widget class. Built-in ipywidgets modules resolve directly;
    /// other modules go through the injected loader.
    pub async fn load_class(
        &self,
        class_name: &str,
        module: &str,
        version: &str,
    ) -> Result<WidgetClass, WidgetError> {
        self.registry.load_class(class_name, module, version).await
    }

    /// Apply a comm message to the widget models.
    ///
    /// Returns false if `output` is not a comm message.
    pub async fn handle_comm(&self, output: &KernelOutput) -> bool {
        match &output.content {
            JupyterMessageContent::CommOpen(open) => {
                if open.target_name != WIDGET_TARGET {
                    debug!(
                        "[widgets] ignoring comm_open for target {}",
                        open.target_name
                    );
                    return true;
                }
                let data = serde_json::to_value(&open.data).unwrap_or_default();
                self.models
                    .open(
                        &open.comm_id.0,
                        &open.target_name,
                        &data,
                        output.buffers.clone(),
                    )
                    .await;
                true
            }
            JupyterMessageContent::CommMsg(msg) => {
                let data = serde_json::to_value(&msg.data).unwrap_or_default();
                if data.get("method").and_then(|m| m.as_str()) == Some("update") {
                    if let Some(state) = data.get("state") {
                        self.models.update(&msg.comm_id.0, state).await;
                    }
                }
                true
            }
            JupyterMessageContent::CommClose(close) => {
                self.models.close(&close.comm_id.0).await;
                true
            }
            _ => false,
        }
    }

    /// Create the view for `model_id` and attach its root to `area`.
    pub async fn display_view(
        &self,
        model_id: &str,
        area: &OutputArea,
    ) -> Result<ViewRoot, WidgetError> {
        let model = self
            .models
            .get(model_id)
            .await
            .ok_or_else(|| WidgetError::ModelNotFound(model_id.to_string()))?;

        let (Some(name), Some(module)) = (model.view_name(), model.view_module()) else {
            return Err(WidgetError::ModelNotFound(format!(
                "{} has no view class",
                model_id
            )));
        };
        let version = model.view_module_version().unwrap_or_default();

        let class = self.load_class(name, module, version).await?;
        if !class.is_view() {
            warn!(
                "[widgets] {} is not a view class",
                class.qualified_name()
            );
            return Err(WidgetError::ClassNotFound {
                class_name: name.to_string(),
                module: module.to_string(),
                version: version.to_string(),
            });
        }

        let view = ViewRoot {
            model_id: model.model_id.clone(),
            view_class: class.qualified_name(),
            state: model.state.clone(),
        };
        area.attach(view.clone());
        Ok(view)
    }
}

/// Model id referenced by a widget-view display bundle, if any.
pub fn widget_model_id(data: &serde_json::Value) -> Option<&str> {
    data.get(WIDGET_VIEW_MIMETYPE)?.get("model_id")?.as_str()
}

impl std::fmt::Debug for WidgetManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetManager")
            .field("kernel_id", &self.kernel_id())
            .finish()
    }
}
