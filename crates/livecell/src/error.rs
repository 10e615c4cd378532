//! Error types for notebook orchestration and widget resolution.

/// Errors raised by [`Notebook`](crate::notebook::Notebook) accessors and construction.
///
/// These indicate programmer error (asking for cells that do not exist),
/// not runtime execution failures, which are reported as `None` results.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NotebookError {
    #[error("Notebook not initialized")]
    NotInitialized,

    #[error("Notebook cells index out of range: {index}:{len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Duplicate cell id in code blocks: {0}")]
    DuplicateCellId(String),
}

/// Errors from the widget manager's class registry.
#[derive(Debug, thiserror::Error)]
pub enum WidgetError {
    #[error("Class {class_name} not found in module {module}@{version}")]
    ClassNotFound {
        class_name: String,
        module: String,
        version: String,
    },

    #[error("Module {module}@{version} could not be resolved")]
    ModuleNotFound { module: String, version: String },

    #[error("Module loader failed: {0}")]
    Loader(#[from] anyhow::Error),

    #[error("Widget model not found: {0}")]
    ModelNotFound(String),
}

/// Errors reading or writing the options file.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to access options file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid options JSON: {0}")]
    Json(#[from] serde_json::Error),
}
