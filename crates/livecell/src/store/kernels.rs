//! `kernels` slice: known kernels and their execution status.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

/// Kernel status as seen by the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelStatus {
    #[default]
    Starting,
    Idle,
    Busy,
    Dead,
}

impl std::fmt::Display for KernelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KernelStatus::Starting => write!(f, "starting"),
            KernelStatus::Idle => write!(f, "idle"),
            KernelStatus::Busy => write!(f, "busy"),
            KernelStatus::Dead => write!(f, "dead"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    /// Kernelspec name
    pub name: String,
    #[serde(default)]
    pub status: KernelStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KernelAction {
    Add {
        id: String,
        server_id: Option<String>,
        name: String,
    },
    SetStatus {
        id: String,
        status: KernelStatus,
    },
    Remove {
        id: String,
    },
}

impl KernelAction {
    pub fn name(&self) -> &'static str {
        match self {
            KernelAction::Add { .. } => "add",
            KernelAction::SetStatus { .. } => "set_status",
            KernelAction::Remove { .. } => "remove",
        }
    }
}

pub(crate) fn reduce(kernels: &mut HashMap<String, KernelRecord>, action: KernelAction) {
    match action {
        KernelAction::Add {
            id,
            server_id,
            name,
        } => {
            kernels.insert(
                id.clone(),
                KernelRecord {
                    id,
                    server_id,
                    name,
                    status: KernelStatus::Starting,
                },
            );
        }
        KernelAction::SetStatus { id, status } => match kernels.get_mut(&id) {
            Some(kernel) => kernel.status = status,
            None => debug!("[store] kernels.set_status for unknown kernel {}", id),
        },
        KernelAction::Remove { id } => {
            kernels.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_starts_in_starting_state() {
        let mut kernels = HashMap::new();
        reduce(
            &mut kernels,
            KernelAction::Add {
                id: "k1".into(),
                server_id: Some("s1".into()),
                name: "python3".into(),
            },
        );
        assert_eq!(kernels["k1"].status, KernelStatus::Starting);
        assert_eq!(kernels["k1"].server_id.as_deref(), Some("s1"));
    }

    #[test]
    fn test_set_status() {
        let mut kernels = HashMap::new();
        reduce(
            &mut kernels,
            KernelAction::Add {
                id: "k1".into(),
                server_id: None,
                name: "python3".into(),
            },
        );
        reduce(
            &mut kernels,
            KernelAction::SetStatus {
                id: "k1".into(),
                status: KernelStatus::Busy,
            },
        );
        assert_eq!(kernels["k1"].status, KernelStatus::Busy);
    }

    #[test]
    fn test_kernel_status_serde() {
        assert_eq!(
            serde_json::to_string(&KernelStatus::Idle).unwrap(),
            "\"idle\""
        );
        assert_eq!(
            serde_json::from_str::<KernelStatus>("\"dead\"").unwrap(),
            KernelStatus::Dead
        );
        assert_eq!(KernelStatus::Busy.to_string(), "busy");
    }
}
