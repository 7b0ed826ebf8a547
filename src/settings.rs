//! Settings resolution: stored value if present, else the declared default.
//!
//! No caching: every `resolve` goes to the store, so a `persist` is visible
//! to the very next read.

use std::sync::Arc;

use serde_json::Value;

use crate::script::ScriptDescriptor;
use crate::store::ScriptStore;

/// Key of the virtual per-script on/off setting.
pub const ENABLED_KEY: &str = "enabled";

#[derive(Clone)]
pub struct Settings {
    store: Arc<ScriptStore>,
}

impl Settings {
    pub fn new(store: Arc<ScriptStore>) -> Self {
        Self { store }
    }

    pub fn resolve(&self, script_id: &str, key: &str, declared_default: Value) -> Value {
        self.store.get(script_id, key, declared_default)
    }

    pub fn persist(&self, script_id: &str, key: &str, value: Value) {
        self.store.set(script_id, key, value);
    }

    /// Effective enabled state: the persisted flag, else the descriptor default.
    pub fn is_enabled(&self, descriptor: &ScriptDescriptor) -> bool {
        truthy(&self.resolve(
            &descriptor.id,
            ENABLED_KEY,
            Value::Bool(descriptor.enabled),
        ))
    }

    pub fn set_enabled(&self, script_id: &str, enabled: bool) {
        self.persist(script_id, ENABLED_KEY, Value::Bool(enabled));
    }
}

/// Page-script truthiness, for enabled flags written by older code paths.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
