//! Script descriptors: metadata, settings schema and lifecycle hooks.
//!
//! A script is registered once and never removed during a session. Hooks are
//! optional; a descriptor without hooks gets [`NoopHooks`].

use std::fmt;
use std::sync::Arc;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;

use crate::deps::{DependencyLoader, LibraryHandle};
use crate::error::DependencyError;
use crate::settings::Settings;
use crate::store::ScriptStore;
use crate::toast::{Severity, Toaster};

pub const DEFAULT_SCRIPT_VERSION: &str = "1.0.0";

// ---------------------------------------------------------------------------
// Settings schema
// ---------------------------------------------------------------------------

/// Widget family of a setting. Unknown tags parse as `Text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingKind {
    Toggle,
    Text,
    Select { options: Vec<String> },
    Color,
}

impl SettingKind {
    /// Map a manifest `type` tag to a kind.
    pub fn from_tag(tag: &str, options: Vec<String>) -> Self {
        match tag {
            "toggle" => Self::Toggle,
            "text" => Self::Text,
            "select" => Self::Select { options },
            "color" => Self::Color,
            other => {
                tracing::debug!("[QoL] Unknown setting type \"{other}\", rendering as text");
                Self::Text
            }
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Toggle => "toggle",
            Self::Text => "text",
            Self::Select { .. } => "select",
            Self::Color => "color",
        }
    }
}

/// One configurable value of a script.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingSpec {
    pub kind: SettingKind,
    pub label: Option<String>,
    pub default: Value,
}

impl SettingSpec {
    pub fn toggle(default: bool) -> Self {
        Self::new(SettingKind::Toggle, Value::Bool(default))
    }

    pub fn text(default: impl Into<String>) -> Self {
        Self::new(SettingKind::Text, Value::String(default.into()))
    }

    pub fn select<I, S>(options: I, default: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = options.into_iter().map(Into::into).collect();
        Self::new(SettingKind::Select { options }, Value::String(default.into()))
    }

    pub fn color(default: impl Into<String>) -> Self {
        Self::new(SettingKind::Color, Value::String(default.into()))
    }

    pub fn new(kind: SettingKind, default: Value) -> Self {
        Self {
            kind,
            label: None,
            default,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Display label; the setting key when no label was declared.
    pub fn label_or<'a>(&'a self, key: &'a str) -> &'a str {
        self.label.as_deref().unwrap_or(key)
    }
}

#[derive(Deserialize)]
struct RawSettingSpec {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    default: Value,
    #[serde(default)]
    options: Vec<String>,
}

impl<'de> Deserialize<'de> for SettingSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawSettingSpec::deserialize(deserializer)?;
        let kind = SettingKind::from_tag(raw.kind.as_deref().unwrap_or("text"), raw.options);
        Ok(Self {
            kind,
            label: raw.label,
            default: raw.default,
        })
    }
}

/// Settings in declaration order. Deserializes from a JSON object without
/// losing key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsSchema(Vec<(String, SettingSpec)>);

impl SettingsSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `key`, keeping its original position on replace.
    pub fn insert(&mut self, key: impl Into<String>, spec: SettingSpec) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = spec,
            None => self.0.push((key, spec)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&SettingSpec> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingSpec)> {
        self.0.iter().map(|(k, s)| (k.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for SettingsSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SchemaVisitor;

        impl<'de> Visitor<'de> for SchemaVisitor {
            type Value = SettingsSchema;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of setting key to setting spec")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut schema = SettingsSchema::new();
                while let Some((key, spec)) = map.next_entry::<String, SettingSpec>()? {
                    if schema.get(&key).is_some() {
                        return Err(de::Error::custom(format!("duplicate setting \"{key}\"")));
                    }
                    schema.insert(key, spec);
                }
                Ok(schema)
            }
        }

        deserializer.deserialize_map(SchemaVisitor)
    }
}

// ---------------------------------------------------------------------------
// Hooks and context
// ---------------------------------------------------------------------------

/// Lifecycle capabilities of a script. Both default to no-ops.
///
/// `destroy` must release everything `init` acquired; the framework only
/// tracks its own widgets.
pub trait ScriptHooks: Send + Sync {
    fn init(&self, _ctx: &ScriptContext) -> anyhow::Result<()> {
        Ok(())
    }

    fn destroy(&self, _ctx: &ScriptContext) {}
}

pub struct NoopHooks;

impl ScriptHooks for NoopHooks {}

/// What a script sees of the framework while one of its hooks runs.
pub struct ScriptContext {
    descriptor: ScriptDescriptor,
    store: Arc<ScriptStore>,
    deps: Arc<DependencyLoader>,
    toaster: Toaster,
}

impl ScriptContext {
    pub(crate) fn new(
        descriptor: ScriptDescriptor,
        store: Arc<ScriptStore>,
        deps: Arc<DependencyLoader>,
        toaster: Toaster,
    ) -> Self {
        Self {
            descriptor,
            store,
            deps,
            toaster,
        }
    }

    pub fn script_id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn descriptor(&self) -> &ScriptDescriptor {
        &self.descriptor
    }

    /// Raw namespaced read for script-private data.
    pub fn get(&self, key: &str, default: Value) -> Value {
        self.store.get(&self.descriptor.id, key, default)
    }

    pub fn set(&self, key: &str, value: Value) {
        self.store.set(&self.descriptor.id, key, value);
    }

    /// Current value of a declared setting (stored value or declared default).
    /// Undeclared keys resolve to `Null` unless stored.
    pub fn setting(&self, key: &str) -> Value {
        let default = self
            .descriptor
            .settings
            .get(key)
            .map(|s| s.default.clone())
            .unwrap_or(Value::Null);
        Settings::new(self.store.clone()).resolve(&self.descriptor.id, key, default)
    }

    /// Effective enabled state right now. Async work started in `init` should
    /// check this before touching the page.
    pub fn is_enabled(&self) -> bool {
        Settings::new(self.store.clone()).is_enabled(&self.descriptor)
    }

    pub async fn load_dependency(&self, name: &str) -> Result<LibraryHandle, DependencyError> {
        self.deps.load(name).await
    }

    pub fn notify(&self, message: impl Into<String>, severity: Severity) {
        self.toaster.notify(message, severity);
    }
}

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// A pluggable feature: metadata, settings schema and hooks.
#[derive(Clone)]
pub struct ScriptDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    /// Default enabled state; a persisted value wins.
    pub enabled: bool,
    pub settings: SettingsSchema,
    hooks: Arc<dyn ScriptHooks>,
}

impl fmt::Debug for ScriptDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("version", &self.version)
            .field("enabled", &self.enabled)
            .field("settings", &self.settings.len())
            .finish()
    }
}

impl ScriptDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            version: DEFAULT_SCRIPT_VERSION.to_string(),
            enabled: true,
            settings: SettingsSchema::new(),
            hooks: Arc::new(NoopHooks),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn setting(mut self, key: impl Into<String>, spec: SettingSpec) -> Self {
        self.settings.insert(key, spec);
        self
    }

    pub fn hooks(mut self, hooks: impl ScriptHooks + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    pub fn shared_hooks(mut self, hooks: Arc<dyn ScriptHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub(crate) fn script_hooks(&self) -> &Arc<dyn ScriptHooks> {
        &self.hooks
    }
}

/// Serializable form of a descriptor, used for statically declared scripts.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptManifest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub settings: SettingsSchema,
}

fn default_version() -> String {
    DEFAULT_SCRIPT_VERSION.to_string()
}

fn default_enabled() -> bool {
    true
}

impl From<ScriptManifest> for ScriptDescriptor {
    fn from(m: ScriptManifest) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            version: m.version,
            enabled: m.enabled,
            settings: m.settings,
            hooks: Arc::new(NoopHooks),
        }
    }
}

/// Parse a bundled manifest: a JSON array of script manifests.
pub fn parse_manifest(json: &str) -> Result<Vec<ScriptDescriptor>, serde_json::Error> {
    let manifests: Vec<ScriptManifest> = serde_json::from_str(json)?;
    Ok(manifests.into_iter().map(ScriptDescriptor::from).collect())
}
