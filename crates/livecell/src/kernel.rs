//! Kernel handle and the connection seam cells execute against.
//!
//! The transport (websocket or ZeroMQ) is not implemented here. Anything that
//! can run an `execute_request` and hand back the iopub output produced for it
//! can be wrapped in a [`KernelHandle`].

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use jupyter_protocol::{ExecuteRequest, JupyterMessageContent, ReplyStatus};

/// One iopub message produced while executing a request.
#[derive(Debug, Clone)]
pub struct KernelOutput {
    pub content: JupyterMessageContent,
    /// Binary buffers attached to the message (widget comm payloads)
    pub buffers: Vec<Bytes>,
}

impl From<JupyterMessageContent> for KernelOutput {
    fn from(content: JupyterMessageContent) -> Self {
        KernelOutput {
            content,
            buffers: Vec::new(),
        }
    }
}

/// Everything a kernel produced for one `execute_request`, in arrival order,
/// plus the status of the shell reply.
#[derive(Debug, Clone)]
pub struct ExecuteResponse {
    pub status: ReplyStatus,
    pub outputs: Vec<KernelOutput>,
}

/// A live connection to a kernel.
///
/// `execute` resolves once the kernel has gone idle for the request, so the
/// returned outputs are complete. Transport failures are returned as errors;
/// kernel-side exceptions arrive as an `error` output and a non-ok status.
#[async_trait]
pub trait KernelConnection: Send + Sync {
    /// Kernel id, as registered in the store's `kernels` slice
    fn id(&self) -> &str;

    /// Whether the transport is still connected
    fn is_alive(&self) -> bool;

    async fn execute(&self, request: ExecuteRequest) -> Result<ExecuteResponse>;
}

/// A kernel as handed to [`Notebook::hookup`](crate::notebook::Notebook::hookup).
///
/// The connection is optional: a handle without one is "not hooked up" yet.
/// The handle does not own the connection lifecycle.
#[derive(Clone)]
pub struct KernelHandle {
    pub id: String,
    pub connection: Option<Arc<dyn KernelConnection>>,
}

impl KernelHandle {
    pub fn new(connection: Arc<dyn KernelConnection>) -> Self {
        Self {
            id: connection.id().to_string(),
            connection: Some(connection),
        }
    }

    /// A handle for a kernel whose connection is not established
    pub fn disconnected(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            connection: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.as_ref().is_some_and(|c| c.is_alive())
    }
}

impl std::fmt::Debug for KernelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelHandle")
            .field("id", &self.id)
            .field("connected", &self.connection.is_some())
            .finish()
    }
}
