//! `notebooks` slice: ordered cell ids per notebook.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotebookRecord {
    pub id: String,
    /// Cell ids in execution order. Mirrors the notebook's renderer sequence.
    pub cells: Vec<String>,
    /// Kernel the notebook was last hooked up to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotebookAction {
    Setup { id: String, cells: Vec<String> },
    AttachKernel { id: String, kernel_id: String },
    Remove { id: String },
}

impl NotebookAction {
    pub fn name(&self) -> &'static str {
        match self {
            NotebookAction::Setup { .. } => "setup",
            NotebookAction::AttachKernel { .. } => "attach_kernel",
            NotebookAction::Remove { .. } => "remove",
        }
    }
}

pub(crate) fn reduce(notebooks: &mut HashMap<String, NotebookRecord>, action: NotebookAction) {
    match action {
        NotebookAction::Setup { id, cells } => {
            notebooks.insert(
                id.clone(),
                NotebookRecord {
                    id,
                    cells,
                    kernel_id: None,
                },
            );
        }
        NotebookAction::AttachKernel { id, kernel_id } => match notebooks.get_mut(&id) {
            Some(notebook) => notebook.kernel_id = Some(kernel_id),
            None => debug!("[store] notebooks.attach_kernel for unknown notebook {}", id),
        },
        NotebookAction::Remove { id } => {
            notebooks.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_preserves_order() {
        let mut notebooks = HashMap::new();
        reduce(
            &mut notebooks,
            NotebookAction::Setup {
                id: "nb".into(),
                cells: vec!["c".into(), "a".into(), "b".into()],
            },
        );
        assert_eq!(notebooks["nb"].cells, vec!["c", "a", "b"]);
        assert!(notebooks["nb"].kernel_id.is_none());
    }

    #[test]
    fn test_attach_kernel() {
        let mut notebooks = HashMap::new();
        reduce(
            &mut notebooks,
            NotebookAction::Setup {
                id: "nb".into(),
                cells: vec![],
            },
        );
        reduce(
            &mut notebooks,
            NotebookAction::AttachKernel {
                id: "nb".into(),
                kernel_id: "k1".into(),
            },
        );
        assert_eq!(notebooks["nb"].kernel_id.as_deref(), Some("k1"));
    }

    #[test]
    fn test_attach_kernel_to_unknown_notebook_is_ignored() {
        let mut notebooks = HashMap::new();
        reduce(
            &mut notebooks,
            NotebookAction::AttachKernel {
                id: "nope".into(),
                kernel_id: "k1".into(),
            },
        );
        assert!(notebooks.is_empty());
    }
}
