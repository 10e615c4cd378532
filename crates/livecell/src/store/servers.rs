//! `servers` slice: Jupyter servers kernels are started on.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRecord {
    pub id: String,
    pub base_url: String,
    pub ws_url: String,
    #[serde(default)]
    pub ready: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerAction {
    Add {
        id: String,
        base_url: String,
        ws_url: String,
    },
    SetReady {
        id: String,
        ready: bool,
    },
    Remove {
        id: String,
    },
}

impl ServerAction {
    pub fn name(&self) -> &'static str {
        match self {
            ServerAction::Add { .. } => "add",
            ServerAction::SetReady { .. } => "set_ready",
            ServerAction::Remove { .. } => "remove",
        }
    }
}

pub(crate) fn reduce(servers: &mut HashMap<String, ServerRecord>, action: ServerAction) {
    match action {
        ServerAction::Add {
            id,
            base_url,
            ws_url,
        } => {
            servers.insert(
                id.clone(),
                ServerRecord {
                    id,
                    base_url,
                    ws_url,
                    ready: false,
                },
            );
        }
        ServerAction::SetReady { id, ready } => match servers.get_mut(&id) {
            Some(server) => server.ready = ready,
            None => debug!("[store] servers.set_ready for unknown server {}", id),
        },
        ServerAction::Remove { id } => {
            servers.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_ready() {
        let mut servers = HashMap::new();
        reduce(
            &mut servers,
            ServerAction::Add {
                id: "s1".into(),
                base_url: "http://localhost:8888".into(),
                ws_url: "ws://localhost:8888".into(),
            },
        );
        assert!(!servers["s1"].ready);

        reduce(
            &mut servers,
            ServerAction::SetReady {
                id: "s1".into(),
                ready: true,
            },
        );
        assert!(servers["s1"].ready);
    }

    #[test]
    fn test_remove() {
        let mut servers = HashMap::new();
        reduce(
            &mut servers,
            ServerAction::Add {
                id: "s1".into(),
                base_url: "http://localhost:8888".into(),
                ws_url: "ws://localhost:8888".into(),
            },
        );
        reduce(&mut servers, ServerAction::Remove { id: "s1".into() });
        assert!(servers.is_empty());
    }
}
