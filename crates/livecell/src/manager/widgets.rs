//! Widget model state tracked from comm messages.
//!
//! ipywidgets drives its models over the Jupyter comm protocol:
//! - `comm_open` creates a model with its initial state
//! - `comm_msg` with `method: "update"` sends a state delta
//! - `comm_close` disposes the model
//!
//! Models are kept per widget manager (so per kernel connection) and are
//! returned in creation order, which matters when one model references
//! another (layouts, styles, box children).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use base64::prelude::*;
use bytes::Bytes;
use serde::{Serialize, Serializer};
use tokio::sync::RwLock;

/// Comm target ipywidgets opens models on
pub const WIDGET_TARGET: &str = "jupyter.widget";

/// A widget model as last reported by the kernel.
#[derive(Debug, Clone, Serialize)]
pub struct WidgetModel {
    /// The comm id, which is also the widget's model id
    pub model_id: String,
    pub target_name: String,
    /// Full model state with all updates merged in
    pub state: serde_json::Value,
    /// Binary buffers sent with the model, base64 encoded for the page
    #[serde(serialize_with = "serialize_buffers")]
    pub buffers: Vec<Bytes>,
}

impl WidgetModel {
    fn state_str(&self, key: &str) -> Option<&str> {
        self.state.get(key).and_then(|v| v.as_str())
    }

    pub fn model_module(&self) -> Option<&str> {
        self.state_str("_model_module")
    }

    pub fn model_name(&self) -> Option<&str> {
        self.state_str("_model_name")
    }

    pub fn model_module_version(&self) -> Option<&str> {
        self.state_str("_model_module_version")
    }

    pub fn view_module(&self) -> Option<&str> {
        self.state_str("_view_module")
    }

    pub fn view_name(&self) -> Option<&str> {
        self.state_str("_view_name")
    }

    pub fn view_module_version(&self) -> Option<&str> {
        self.state_str("_view_module_version")
    }
}

fn serialize_buffers<S>(data: &[Bytes], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    data.iter()
        .map(|bytes| BASE64_STANDARD.encode(bytes))
        .collect::<Vec<_>>()
        .serialize(serializer)
}

struct ModelEntry {
    model: WidgetModel,
    seq: u64,
}

/// Live widget models for one kernel connection.
pub struct WidgetModels {
    models: RwLock<HashMap<String, ModelEntry>>,
    next_seq: AtomicU64,
}

impl WidgetModels {
    pub fn new() -> Self {
        Self {
            models: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Register a model from a `comm_open` payload (`data.state`).
    pub async fn open(
        &self,
        comm_id: &str,
        target_name: &str,
        data: &serde_json::Value,
        buffers: Vec<Bytes>,
    ) {
        let state = data
            .get("state")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}));

        let model = WidgetModel {
            model_id: comm_id.to_string(),
            target_name: target_name.to_string(),
            state,
            buffers,
        };

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let mut models = self.models.write().await;
        models.insert(comm_id.to_string(), ModelEntry { model, seq });
    }

    /// Merge a state delta into an existing model. Unknown ids are ignored
    /// (the update may have raced a close).
    pub async fn update(&self, comm_id: &str, delta: &serde_json::Value) {
        let mut models = self.models.write().await;
        if let Some(entry) = models.get_mut(comm_id) {
            if let (Some(existing), Some(delta)) =
                (entry.model.state.as_object_mut(), delta.as_object())
            {
                for (key, value) in delta {
                    existing.insert(key.clone(), value.clone());
                }
            }
        }
    }

    pub async fn close(&self, comm_id: &str) {
        self.models.write().await.remove(comm_id);
    }

    pub async fn get(&self, model_id: &str) -> Option<WidgetModel> {
        self.models
            .read()
            .await
            .get(model_id)
            .map(|e| e.model.clone())
    }

    /// All live models in creation order.
    pub async fn all(&self) -> Vec<WidgetModel> {
        let models = self.models.read().await;
        let mut entries: Vec<_> = models.values().collect();
        entries.sort_by_key(|e| e.seq);
        entries.into_iter().map(|e| e.model.clone()).collect()
    }

    pub async fn is_empty(&self) -> bool {
        self.models.read().await.is_empty()
    }
}

impl Default for WidgetModels {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slider_state(value: i64) -> serde_json::Value {
        serde_json::json!({
            "state": {
                "_model_name": "IntSliderModel",
                "_model_module": "@jupyter-widgets/controls",
                "_model_module_version": "2.0.0",
                "_view_name": "IntSliderView",
                "_view_module": "@jupyter-widgets/controls",
                "_view_module_version": "2.0.0",
                "value": value,
                "min": 0,
                "max": 100
            }
        })
    }

    #[tokio::test]
    async fn test_open_extracts_model_info() {
        let models = WidgetModels::new();
        models
            .open("comm-1", WIDGET_TARGET, &slider_state(50), vec![])
            .await;

        let model = models.get("comm-1").await.unwrap();
        assert_eq!(model.model_name(), Some("IntSliderModel"));
        assert_eq!(model.view_name(), Some("IntSliderView"));
        assert_eq!(model.view_module(), Some("@jupyter-widgets/controls"));
        assert_eq!(model.view_module_version(), Some("2.0.0"));
        assert_eq!(model.state["value"], 50);
    }

    #[tokio::test]
    async fn test_update_merges_delta() {
        let models = WidgetModels::new();
        models
            .open("comm-1", WIDGET_TARGET, &slider_state(0), vec![])
            .await;
        models
            .update("comm-1", &serde_json::json!({"value": 75}))
            .await;

        let model = models.get("comm-1").await.unwrap();
        assert_eq!(model.state["value"], 75);
        assert_eq!(model.state["max"], 100);
    }

    #[tokio::test]
    async fn test_update_unknown_model_is_ignored() {
        let models = WidgetModels::new();
        models
            .update("nonexistent", &serde_json::json!({"value": 1}))
            .await;
        assert!(models.is_empty().await);
    }

    #[tokio::test]
    async fn test_close_removes_model() {
        let models = WidgetModels::new();
        models
            .open("comm-1", WIDGET_TARGET, &slider_state(0), vec![])
            .await;
        models.close("comm-1").await;
        assert!(models.get("comm-1").await.is_none());
    }

    #[tokio::test]
    async fn test_all_in_creation_order() {
        let models = WidgetModels::new();
        for i in 0..5 {
            models
                .open(&format!("comm-{}", i), WIDGET_TARGET, &slider_state(i), vec![])
                .await;
        }
        let ids: Vec<_> = models.all().await.into_iter().map(|m| m.model_id).collect();
        assert_eq!(ids, vec!["comm-0", "comm-1", "comm-2", "comm-3", "comm-4"]);
    }

    #[tokio::test]
    async fn test_buffers_serialize_as_base64() {
        let models = WidgetModels::new();
        models
            .open(
                "comm-1",
                WIDGET_TARGET,
                &slider_state(0),
                vec![Bytes::from("hello")],
            )
            .await;
        let json = serde_json::to_value(models.get("comm-1").await.unwrap()).unwrap();
        assert_eq!(json["buffers"][0], "aGVsbG8=");
    }
}
