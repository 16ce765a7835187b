use crate::storage::{load_json, save_json, KeyValueStore, StorageError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key of the dashboard record in the store.
pub const STATE_KEY: &str = "dashboard-state";

/// One widget as persisted with the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedWidget {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub config: Value,
}

/// Persisted dashboard state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardState {
    #[serde(default)]
    pub widgets: Vec<SavedWidget>,
    #[serde(default)]
    pub counter: u64,
}

impl DashboardState {
    /// Read the record. `None` when it is missing or corrupt.
    pub fn load(store: &dyn KeyValueStore) -> Option<Self> {
        match load_json::<DashboardState>(store, STATE_KEY) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("ignoring saved dashboard: {e}");
                None
            }
        }
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), StorageError> {
        save_json(store, STATE_KEY, self)
    }
}

impl SavedWidget {
    /// Configuration handed to the restore path: the saved widget config
    /// with `id` and `title` layered on top.
    pub fn restore_config(&self) -> Value {
        let mut cfg = match &self.config {
            Value::Object(map) => map.clone(),
            _ => Default::default(),
        };
        cfg.insert("id".into(), Value::String(self.id.clone()));
        cfg.insert("title".into(), Value::String(self.title.clone()));
        Value::Object(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    #[test]
    fn record_shape_uses_type_tag() {
        let state = DashboardState {
            widgets: vec![SavedWidget {
                id: "widget-1".into(),
                kind: "weather".into(),
                title: "Sky".into(),
                config: json!({"city": "Oslo"}),
            }],
            counter: 3,
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["widgets"][0]["type"], json!("weather"));
        assert_eq!(value["counter"], json!(3));
    }

    #[test]
    fn corrupt_or_missing_record_is_no_state() {
        let store = MemoryStore::new();
        assert_eq!(DashboardState::load(&store), None);
        store.set(STATE_KEY, "{not json").unwrap();
        assert_eq!(DashboardState::load(&store), None);
    }

    #[test]
    fn restore_config_carries_identity() {
        let saved = SavedWidget {
            id: "w".into(),
            kind: "crypto".into(),
            title: "Coins".into(),
            config: json!({"currency": "eur"}),
        };
        assert_eq!(
            saved.restore_config(),
            json!({"id": "w", "title": "Coins", "currency": "eur"})
        );
    }
}
