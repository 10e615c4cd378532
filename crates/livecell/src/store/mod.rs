//! Process-wide keyed state for cells, notebooks, kernels, servers and config.
//!
//! The store is the single writer-of-record shared by every notebook and cell.
//! All mutation goes through [`Store::dispatch`] with a namespaced [`Action`];
//! reads go through [`Store::get_state`], which hands back an immutable
//! snapshot.
//!
//! ## Snapshots
//!
//! State is held behind an `Arc` and updated copy-on-write, so a snapshot
//! taken before a dispatch never observes that dispatch. Reads never wait on
//! kernel execution: dispatch and read are both synchronous.
//!
//! ## Observing
//!
//! [`Store::subscribe`] returns a `tokio::sync::watch` receiver that is
//! notified after every dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::settings::Options;

pub mod cells;
pub mod config;
pub mod kernels;
pub mod notebooks;
pub mod servers;

pub use cells::{CellAction, CellRecord};
pub use config::ConfigAction;
pub use kernels::{KernelAction, KernelRecord, KernelStatus};
pub use notebooks::{NotebookAction, NotebookRecord};
pub use servers::{ServerAction, ServerRecord};

/// Full store contents. Obtained as a snapshot via [`Store::get_state`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    pub cells: HashMap<String, CellRecord>,
    pub notebooks: HashMap<String, NotebookRecord>,
    pub kernels: HashMap<String, KernelRecord>,
    pub servers: HashMap<String, ServerRecord>,
    pub config: Options,
}

impl State {
    /// Source text of a cell, if registered
    pub fn cell_source(&self, cell_id: &str) -> Option<&str> {
        self.cells.get(cell_id).map(|c| c.source.as_str())
    }

    fn reduce(&mut self, action: Action) {
        match action {
            Action::Cells(action) => cells::reduce(&mut self.cells, action),
            Action::Notebooks(action) => notebooks::reduce(&mut self.notebooks, action),
            Action::Kernels(action) => kernels::reduce(&mut self.kernels, action),
            Action::Servers(action) => servers::reduce(&mut self.servers, action),
            Action::Config(action) => config::reduce(&mut self.config, action),
        }
    }
}

/// A store mutation, namespaced by the slice it targets.
///
/// Serializes as `{"domain": "cells", "action": {"type": "add", ...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "domain", content = "action", rename_all = "snake_case")]
pub enum Action {
    Cells(CellAction),
    Notebooks(NotebookAction),
    Kernels(KernelAction),
    Servers(ServerAction),
    Config(ConfigAction),
}

impl Action {
    /// Namespaced action name, e.g. `cells.add`
    pub fn name(&self) -> String {
        match self {
            Action::Cells(a) => format!("cells.{}", a.name()),
            Action::Notebooks(a) => format!("notebooks.{}", a.name()),
            Action::Kernels(a) => format!("kernels.{}", a.name()),
            Action::Servers(a) => format!("servers.{}", a.name()),
            Action::Config(a) => format!("config.{}", a.name()),
        }
    }
}

impl From<CellAction> for Action {
    fn from(action: CellAction) -> Self {
        Action::Cells(action)
    }
}

impl From<NotebookAction> for Action {
    fn from(action: NotebookAction) -> Self {
        Action::Notebooks(action)
    }
}

impl From<KernelAction> for Action {
    fn from(action: KernelAction) -> Self {
        Action::Kernels(action)
    }
}

impl From<ServerAction> for Action {
    fn from(action: ServerAction) -> Self {
        Action::Servers(action)
    }
}

impl From<ConfigAction> for Action {
    fn from(action: ConfigAction) -> Self {
        Action::Config(action)
    }
}

/// Shared handle to the state store. Cloning shares the same state.
#[derive(Clone)]
pub struct Store {
    tx: Arc<watch::Sender<Arc<State>>>,
}

impl Store {
    pub fn new() -> Self {
        Self::with_state(State::default())
    }

    /// Create a store seeded with `state`
    pub fn with_state(state: State) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(state));
        Self { tx: Arc::new(tx) }
    }

    /// Apply one mutation atomically.
    pub fn dispatch(&self, action: impl Into<Action>) {
        let action = action.into();
        debug!("[store] dispatch {}", action.name());
        self.tx
            .send_modify(|state| Arc::make_mut(state).reduce(action));
    }

    /// Immutable snapshot reflecting every dispatch made so far.
    pub fn get_state(&self) -> Arc<State> {
        self.tx.borrow().clone()
    }

    /// Receiver notified after every dispatch.
    pub fn subscribe(&self) -> watch::Receiver<Arc<State>> {
        self.tx.subscribe()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.get_state();
        f.debug_struct("Store")
            .field("cells", &state.cells.len())
            .field("notebooks", &state.notebooks.len())
            .field("kernels", &state.kernels.len())
            .field("servers", &state.servers.len())
            .finish()
    }
}
