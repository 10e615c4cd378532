//! Shared context handed to notebooks and cells.

use std::collections::HashMap;
use std::sync::{Arc, RwLock as StdRwLock, Weak};

use crate::manager::ModuleLoader;
use crate::notebook::Notebook;
use crate::settings::Options;
use crate::store::{ConfigAction, Store};

/// The store every notebook reads and writes, the notebooks built on it, and
/// the module loader widget managers use for non-builtin widget libraries.
/// Cloning shares all three.
#[derive(Clone, Default)]
pub struct Context {
    pub store: Store,
    pub module_loader: Option<Arc<dyn ModuleLoader>>,
    /// Live notebooks by id. Held weakly: dropping the last `Arc<Notebook>`
    /// makes the id unknown again.
    notebooks: Arc<StdRwLock<HashMap<String, Weak<Notebook>>>>,
}

impl Context {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            module_loader: None,
            notebooks: Arc::default(),
        }
    }

    /// A context with a fresh store seeded with `options`
    pub fn with_options(options: Options) -> Self {
        let store = Store::new();
        store.dispatch(ConfigAction::Set { options });
        Self::new(store)
    }

    pub fn with_module_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.module_loader = Some(loader);
        self
    }

    pub fn options(&self) -> Options {
        self.store.get_state().config.clone()
    }

    /// Look up a live notebook built on this context.
    pub fn notebook(&self, id: &str) -> Option<Arc<Notebook>> {
        self.notebooks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)?
            .upgrade()
    }

    /// Ids of the live notebooks, in no particular order
    pub fn notebook_ids(&self) -> Vec<String> {
        self.notebooks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(_, notebook)| notebook.strong_count() > 0)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub(crate) fn register_notebook(&self, notebook: &Arc<Notebook>) {
        let mut notebooks = self.notebooks.write().unwrap_or_else(|e| e.into_inner());
        notebooks.retain(|_, existing| existing.strong_count() > 0);
        notebooks.insert(notebook.id().to_string(), Arc::downgrade(notebook));
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("store", &self.store)
            .field("module_loader", &self.module_loader.is_some())
            .field("notebooks", &self.notebook_ids().len())
            .finish()
    }
}
