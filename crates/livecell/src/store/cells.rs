//! `cells` slice: source text keyed by cell id.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

/// Stored state for one cell. The store is the source of truth for the
/// source text; renderers only hold behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRecord {
    pub id: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CellAction {
    /// Register a cell (replaces any existing record with the same id)
    Add { id: String, source: String },
    /// Replace the source of an existing cell
    SetSource { id: String, source: String },
    Remove { id: String },
}

impl CellAction {
    pub fn name(&self) -> &'static str {
        match self {
            CellAction::Add { .. } => "add",
            CellAction::SetSource { .. } => "set_source",
            CellAction::Remove { .. } => "remove",
        }
    }
}

pub(crate) fn reduce(cells: &mut HashMap<String, CellRecord>, action: CellAction) {
    match action {
        CellAction::Add { id, source } => {
            cells.insert(id.clone(), CellRecord { id, source });
        }
        CellAction::SetSource { id, source } => match cells.get_mut(&id) {
            Some(cell) => cell.source = source,
            None => debug!("[store] cells.set_source for unknown cell {}", id),
        },
        CellAction::Remove { id } => {
            cells.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_then_set_source() {
        let mut cells = HashMap::new();
        reduce(
            &mut cells,
            CellAction::Add {
                id: "a".into(),
                source: "1 + 1".into(),
            },
        );
        reduce(
            &mut cells,
            CellAction::SetSource {
                id: "a".into(),
                source: "2 + 2".into(),
            },
        );
        assert_eq!(cells["a"].source, "2 + 2");
    }

    #[test]
    fn test_set_source_unknown_cell_is_ignored() {
        let mut cells = HashMap::new();
        reduce(
            &mut cells,
            CellAction::SetSource {
                id: "missing".into(),
                source: "x".into(),
            },
        );
        assert!(cells.is_empty());
    }

    #[test]
    fn test_action_serialization() {
        let action = CellAction::Add {
            id: "a".into(),
            source: "print(1)".into(),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "add");
        assert_eq!(json["id"], "a");
        assert_eq!(json["source"], "print(1)");
    }
}
