//! Namespaced per-script storage on top of the host key/value API.
//!
//! Physical keys are `{prefix}{scriptId}_{key}`. Structured values are
//! written as JSON text, primitives as-is, and reads try to JSON-decode any
//! string they get back (falling back to the raw string). Both write paths
//! therefore read back the same value.

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::host::HostStore;

pub struct ScriptStore {
    host: Arc<dyn HostStore>,
    prefix: String,
}

impl ScriptStore {
    pub fn new(host: Arc<dyn HostStore>, prefix: impl Into<String>) -> Self {
        Self {
            host,
            prefix: prefix.into(),
        }
    }

    fn script_prefix(&self, script_id: &str) -> String {
        format!("{}{}_", self.prefix, script_id)
    }

    fn storage_key(&self, script_id: &str, key: &str) -> String {
        format!("{}{}", self.script_prefix(script_id), key)
    }

    /// Read a value, or `default` if the key was never written.
    pub fn get(&self, script_id: &str, key: &str, default: Value) -> Value {
        match self.host.get_value(&self.storage_key(script_id, key), default) {
            Value::String(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
            other => other,
        }
    }

    /// Write a value. Objects and arrays are stored as their JSON text.
    pub fn set(&self, script_id: &str, key: &str, value: Value) {
        let stored = match value {
            Value::Object(_) | Value::Array(_) => Value::String(value.to_string()),
            primitive => primitive,
        };
        self.host.set_value(&self.storage_key(script_id, key), stored);
    }

    pub fn remove(&self, script_id: &str, key: &str) {
        self.host.delete_value(&self.storage_key(script_id, key));
    }

    /// Keys written for `script_id`, with the namespace stripped.
    pub fn list_keys(&self, script_id: &str) -> Vec<String> {
        let prefix = self.script_prefix(script_id);
        self.host
            .list_values()
            .into_iter()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    /// Remove every key of `script_id`, one by one. Not atomic.
    pub fn clear(&self, script_id: &str) {
        for key in self.list_keys(script_id) {
            self.remove(script_id, &key);
        }
    }

    /// Typed read. Values that don't deserialize into `T` yield `default`.
    pub fn get_as<T: DeserializeOwned>(&self, script_id: &str, key: &str, default: T) -> T {
        match self.get(script_id, key, Value::Null) {
            Value::Null => default,
            value => serde_json::from_value(value).unwrap_or(default),
        }
    }

    /// Typed write.
    pub fn set_as<T: Serialize>(&self, script_id: &str, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => self.set(script_id, key, value),
            Err(e) => tracing::error!("[store] Failed to encode {script_id}/{key}: {e}"),
        }
    }
}
