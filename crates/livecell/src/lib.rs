//! livecell - Live notebook cells backed by a Jupyter kernel.
//!
//! A page lifts its code blocks into a [`Notebook`], hooks the notebook up to a
//! kernel connection, and then executes cells in order (`execute_all`,
//! `execute_up_to`) or one at a time (`execute_only`). Cell sources, notebook
//! membership, kernels, servers and options live in a shared [`Store`] that
//! any part of the page can read or observe.
//!
//! The kernel transport and the real widget toolkit are outside this crate:
//! transports implement [`KernelConnection`], and widget libraries beyond the
//! built-in ipywidgets modules are resolved through a [`ModuleLoader`].

pub mod batch;
pub mod cell;
pub mod context;
pub mod error;
pub mod kernel;
pub mod manager;
pub mod notebook;
pub mod render;
pub mod settings;
pub mod store;

pub use batch::{BatchState, CancelToken, Preprocessor};
pub use cell::{CellRenderer, CellResult};
pub use context::Context;
pub use error::{NotebookError, SettingsError, WidgetError};
pub use kernel::{ExecuteResponse, KernelConnection, KernelHandle, KernelOutput};
pub use manager::{ModuleLoader, WidgetManager};
pub use notebook::{CodeBlock, Notebook};
pub use render::{AreaSize, OutputArea, RenderedOutput};
pub use settings::{MathjaxOptions, Options};
pub use store::{Action, State, Store};
