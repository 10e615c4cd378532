//! Output areas: the rendering target each cell owns.
//!
//! An [`OutputArea`] stands in for the DOM node a cell renders into. It keeps
//! the rendered outputs plus the busy/error presentation flags, and is cheap
//! to clone (clones share the same area), so the page layer can hold a handle
//! and observe what the cell rendered.

use std::sync::{Arc, Mutex as StdMutex, MutexGuard};

use jupyter_protocol::{JupyterMessageContent, Media, MediaType, Stdio};
use serde::Serialize;

use crate::settings::MathjaxOptions;

/// Rendered size of an output area, measured in text lines and columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AreaSize {
    pub height: usize,
    pub width: usize,
}

/// The visual root of a widget view attached to an area.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewRoot {
    /// Comm id of the widget model backing the view
    pub model_id: String,
    /// `module@version:ClassName` of the view class
    pub view_class: String,
    /// Model state at the time the view was created
    pub state: serde_json::Value,
}

/// One rendered output, in nbformat's shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
pub enum RenderedOutput {
    Stream {
        name: String,
        text: String,
    },
    ExecuteResult {
        execution_count: usize,
        data: serde_json::Value,
        #[serde(skip)]
        text: Option<String>,
    },
    DisplayData {
        data: serde_json::Value,
        #[serde(skip)]
        text: Option<String>,
    },
    Error {
        ename: String,
        evalue: String,
        traceback: Vec<String>,
    },
    Widget {
        view: ViewRoot,
    },
}

impl RenderedOutput {
    /// Convert a kernel message into a rendered output.
    ///
    /// Returns `None` for messages that don't render (status, comms, ...).
    pub fn from_content(content: &JupyterMessageContent) -> Option<Self> {
        match content {
            JupyterMessageContent::StreamContent(stream) => {
                let name = match stream.name {
                    Stdio::Stdout => "stdout",
                    Stdio::Stderr => "stderr",
                };
                Some(RenderedOutput::Stream {
                    name: name.to_string(),
                    text: stream.text.clone(),
                })
            }
            JupyterMessageContent::ExecuteResult(result) => Some(RenderedOutput::ExecuteResult {
                execution_count: result.execution_count.0,
                data: serde_json::to_value(&result.data).unwrap_or_default(),
                text: plain_text(&result.data),
            }),
            JupyterMessageContent::DisplayData(display) => Some(RenderedOutput::DisplayData {
                data: serde_json::to_value(&display.data).unwrap_or_default(),
                text: plain_text(&display.data),
            }),
            JupyterMessageContent::ErrorOutput(error) => Some(RenderedOutput::Error {
                ename: error.ename.clone(),
                evalue: error.evalue.clone(),
                traceback: error.traceback.clone(),
            }),
            _ => None,
        }
    }

    /// Text used to measure the output's footprint
    fn text(&self) -> String {
        match self {
            RenderedOutput::Stream { text, .. } => text.clone(),
            RenderedOutput::ExecuteResult { text, .. } | RenderedOutput::DisplayData { text, .. } => {
                text.clone().unwrap_or_default()
            }
            RenderedOutput::Error { ename, evalue, .. } => format!("{}: {}", ename, evalue),
            RenderedOutput::Widget { view } => view.view_class.clone(),
        }
    }
}

fn plain_text(media: &Media) -> Option<String> {
    media.content.iter().find_map(|m| match m {
        MediaType::Plain(text) => Some(text.clone()),
        _ => None,
    })
}

#[derive(Debug, Default)]
struct AreaState {
    outputs: Vec<RenderedOutput>,
    busy: bool,
    errored: bool,
    mathjax: Option<MathjaxOptions>,
}

/// A cell's rendering target.
#[derive(Debug, Clone, Default)]
pub struct OutputArea {
    inner: Arc<StdMutex<AreaState>>,
}

impl OutputArea {
    pub fn new() -> Self {
        Self::default()
    }

    // Area state is presentation only; a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, AreaState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Configure math typesetting. Returns false if already configured.
    pub(crate) fn configure(&self, mathjax: &MathjaxOptions) -> bool {
        let mut area = self.lock();
        if area.mathjax.is_some() {
            return false;
        }
        area.mathjax = Some(mathjax.clone());
        true
    }

    pub fn mathjax(&self) -> Option<MathjaxOptions> {
        self.lock().mathjax.clone()
    }

    pub fn set_busy(&self, busy: bool) {
        self.lock().busy = busy;
    }

    pub fn is_busy(&self) -> bool {
        self.lock().busy
    }

    pub fn set_errored(&self, errored: bool) {
        self.lock().errored = errored;
    }

    pub fn is_errored(&self) -> bool {
        self.lock().errored
    }

    pub fn clear(&self) {
        self.lock().outputs.clear();
    }

    pub fn push(&self, output: RenderedOutput) {
        self.lock().outputs.push(output);
    }

    /// Attach a widget view's visual root
    pub fn attach(&self, view: ViewRoot) {
        self.push(RenderedOutput::Widget { view });
    }

    pub fn outputs(&self) -> Vec<RenderedOutput> {
        self.lock().outputs.clone()
    }

    /// Measure the rendered outputs: total lines and widest line.
    pub fn size(&self) -> AreaSize {
        let area = self.lock();
        let mut size = AreaSize::default();
        for output in &area.outputs {
            let text = output.text();
            for line in text.lines() {
                size.height += 1;
                size.width = size.width.max(line.chars().count());
            }
        }
        size
    }

    /// Whether two handles refer to the same area
    pub fn same_area(&self, other: &OutputArea) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
