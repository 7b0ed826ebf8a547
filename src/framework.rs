//! The framework context scripts register with.
//!
//! One `Framework` is created at startup from a [`Host`] and a
//! [`FrameworkConfig`] and handed to script modules by reference. It owns the
//! registry, the store adapter, the dependency loader, the toast stack and the
//! view state, and drives each script through its Disabled/Enabled lifecycle.
//!
//! Hooks always run with no framework lock held.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::config::FrameworkConfig;
use crate::deps::DependencyLoader;
use crate::error::RegistrationError;
use crate::host::Host;
use crate::registry::ScriptRegistry;
use crate::script::{ScriptContext, ScriptDescriptor};
use crate::settings::{ENABLED_KEY, Settings, truthy};
use crate::store::ScriptStore;
use crate::styles::{self, DocumentHead, StyleElement};
use crate::toast::{Severity, ToastView, Toaster};
use crate::ui::{ClickTarget, Modal, Toolbar, UiEngine};

pub const FRAMEWORK_VERSION: &str = "1.0.0";

pub struct Framework {
    config: FrameworkConfig,
    host: Host,
    store: Arc<ScriptStore>,
    settings: Settings,
    deps: Arc<DependencyLoader>,
    toaster: Toaster,
    registry: Mutex<ScriptRegistry>,
    ui: Mutex<UiEngine>,
    head: Mutex<DocumentHead>,
}

impl Framework {
    pub fn new(host: Host, config: FrameworkConfig) -> Self {
        let store = Arc::new(ScriptStore::new(
            host.store.clone(),
            config.storage_prefix.clone(),
        ));
        let deps = Arc::new(DependencyLoader::new(
            config.dependencies.clone(),
            host.fetch.clone(),
        ));
        Self {
            settings: Settings::new(store.clone()),
            toaster: Toaster::from_config(&config),
            registry: Mutex::new(ScriptRegistry::new()),
            ui: Mutex::new(UiEngine::new()),
            head: Mutex::new(DocumentHead::new()),
            store,
            deps,
            host,
            config,
        }
    }

    /// Seed the statically declared scripts (e.g. a bundled manifest).
    pub fn with_static_scripts(self, statics: Vec<ScriptDescriptor>) -> Self {
        *self.registry.lock() = ScriptRegistry::with_static(statics);
        self
    }

    /// Use a custom dependency loader (e.g. a different evaluator).
    pub fn with_dependency_loader(mut self, deps: DependencyLoader) -> Self {
        self.deps = Arc::new(deps);
        self
    }

    pub fn version(&self) -> &'static str {
        FRAMEWORK_VERSION
    }

    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ScriptStore> {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn deps(&self) -> &Arc<DependencyLoader> {
        &self.deps
    }

    pub fn toaster(&self) -> &Toaster {
        &self.toaster
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register a script. Invalid or duplicate descriptors are logged and
    /// ignored. An effectively enabled script is initialized right away; an
    /// init failure is reported but the script stays registered.
    ///
    /// After `init`, a script that shares its id with a static entry takes
    /// over that entry: the static script is destroyed if it was running and
    /// its button and section are rebuilt from the new descriptor.
    pub fn register_script(&self, descriptor: ScriptDescriptor) -> Result<(), RegistrationError> {
        let shadowed = {
            let mut registry = self.registry.lock();
            let shadowed = registry.static_entry(&descriptor.id).cloned();
            if let Err(e) = registry.insert(descriptor.clone()) {
                tracing::error!("[QoL] {e}");
                return Err(e);
            }
            shadowed
        };
        tracing::info!(
            "[QoL] Registered script: {} v{}",
            descriptor.name,
            descriptor.version
        );

        let static_running = {
            let mut ui = self.ui.lock();
            let running = ui.is_built()
                && shadowed
                    .as_ref()
                    .is_some_and(|s| self.settings.is_enabled(s));
            if !ui.replace_script(&descriptor, &self.settings) {
                ui.append_script(&descriptor, &self.settings);
            }
            running
        };
        if static_running && let Some(shadowed) = &shadowed {
            tracing::info!("[QoL] {} replaces static entry {}", descriptor.name, shadowed.name);
            self.run_destroy(shadowed);
        }

        if self.settings.is_enabled(&descriptor) {
            self.run_init(&descriptor);
        }
        Ok(())
    }

    /// Runtime-registered scripts in registration order.
    pub fn scripts(&self) -> Vec<ScriptDescriptor> {
        self.registry.lock().scripts().to_vec()
    }

    /// Static and runtime scripts merged as the UI shows them.
    pub fn merged_scripts(&self) -> Vec<ScriptDescriptor> {
        self.registry.lock().merged()
    }

    fn find_script(&self, script_id: &str) -> Option<ScriptDescriptor> {
        self.registry
            .lock()
            .merged()
            .into_iter()
            .find(|d| d.id == script_id)
    }

    // -----------------------------------------------------------------------
    // Startup
    // -----------------------------------------------------------------------

    /// Inject styles and build the toolbar and modal. Only the first call
    /// does anything. Returns the number of scripts shown.
    pub fn init(&self) -> usize {
        let (scripts, dynamic_ids): (Vec<ScriptDescriptor>, Vec<String>) = {
            let registry = self.registry.lock();
            (
                registry.merged(),
                registry.scripts().iter().map(|d| d.id.clone()).collect(),
            )
        };

        {
            let mut ui = self.ui.lock();
            if ui.is_built() {
                return scripts.len();
            }
            tracing::info!("[QoL] Framework v{} initializing...", FRAMEWORK_VERSION);
            styles::inject_styles(self.host.style.as_deref(), &mut self.head.lock());
            ui.build(&scripts, &self.settings, &self.config);
        }

        // Runtime scripts were initialized at registration; static-only ones
        // start here.
        for descriptor in scripts.iter().filter(|d| !dynamic_ids.contains(&d.id)) {
            if self.settings.is_enabled(descriptor) {
                self.run_init(descriptor);
            }
        }

        tracing::info!(
            "[QoL] Framework initialized with {} scripts",
            scripts.len()
        );
        scripts.len()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    fn context(&self, descriptor: &ScriptDescriptor) -> ScriptContext {
        ScriptContext::new(
            descriptor.clone(),
            self.store.clone(),
            self.deps.clone(),
            self.toaster.clone(),
        )
    }

    /// Run `init`, reporting failure. Returns whether it succeeded.
    fn run_init(&self, descriptor: &ScriptDescriptor) -> bool {
        let ctx = self.context(descriptor);
        match descriptor.script_hooks().init(&ctx) {
            Ok(()) => {
                tracing::info!("[QoL] Initialized: {}", descriptor.name);
                true
            }
            Err(e) => {
                tracing::error!("[QoL] Failed to initialize {}: {e:#}", descriptor.name);
                self.toaster.notify(
                    format!("Failed to initialize {}", descriptor.name),
                    Severity::Error,
                );
                false
            }
        }
    }

    fn run_destroy(&self, descriptor: &ScriptDescriptor) {
        let ctx = self.context(descriptor);
        descriptor.script_hooks().destroy(&ctx);
        tracing::info!("[QoL] Destroyed: {}", descriptor.name);
    }

    /// Persist the new state, patch the view, then run the matching hook.
    fn transition(&self, descriptor: &ScriptDescriptor, enabled: bool) {
        self.settings.set_enabled(&descriptor.id, enabled);
        self.ui.lock().set_script_active(&descriptor.id, enabled);

        if enabled {
            if self.run_init(descriptor) {
                self.toaster
                    .notify(format!("{} enabled", descriptor.name), Severity::Success);
            }
        } else {
            self.run_destroy(descriptor);
            self.toaster
                .notify(format!("{} disabled", descriptor.name), Severity::Info);
        }
    }

    /// Toolbar click: flip the script's enabled state. Returns the new state,
    /// or `None` for an unknown script.
    pub fn toggle_script(&self, script_id: &str) -> Option<bool> {
        let descriptor = self.find_script(script_id)?;
        let enabled = !self.settings.is_enabled(&descriptor);
        self.transition(&descriptor, enabled);
        Some(enabled)
    }

    /// Modal enable switch. Setting the current state again changes nothing.
    pub fn set_enabled(&self, script_id: &str, enabled: bool) -> Option<bool> {
        let descriptor = self.find_script(script_id)?;
        if self.settings.is_enabled(&descriptor) != enabled {
            self.transition(&descriptor, enabled);
        }
        Some(enabled)
    }

    pub fn is_enabled(&self, script_id: &str) -> Option<bool> {
        self.find_script(script_id)
            .map(|d| self.settings.is_enabled(&d))
    }

    /// Modal control edit: written through immediately. Editing `enabled`
    /// drives the lifecycle. Returns false for unknown scripts or settings.
    pub fn edit_setting(&self, script_id: &str, key: &str, value: Value) -> bool {
        if key == ENABLED_KEY {
            return self.set_enabled(script_id, truthy(&value)).is_some();
        }
        let Some(descriptor) = self.find_script(script_id) else {
            tracing::warn!("[ui] Edit for unknown script {script_id}");
            return false;
        };
        let Some(spec) = descriptor.settings.get(key) else {
            tracing::warn!("[ui] {script_id} declares no setting \"{key}\"");
            return false;
        };

        self.settings.persist(script_id, key, value);
        let current = self.settings.resolve(script_id, key, spec.default.clone());
        self.ui
            .lock()
            .refresh_setting(script_id, key, &spec.kind, &current);
        true
    }

    /// Current value of a declared setting (stored or default).
    pub fn setting(&self, script_id: &str, key: &str) -> Option<Value> {
        let descriptor = self.find_script(script_id)?;
        let spec = descriptor.settings.get(key)?;
        Some(self.settings.resolve(script_id, key, spec.default.clone()))
    }

    // -----------------------------------------------------------------------
    // Modal and notifications
    // -----------------------------------------------------------------------

    pub fn open_modal(&self) {
        self.ui.lock().open_modal();
    }

    pub fn close_modal(&self) {
        self.ui.lock().close_modal();
    }

    pub fn click_modal(&self, target: ClickTarget) {
        self.ui.lock().click_modal(target);
    }

    pub fn notify(&self, message: impl Into<String>, severity: Severity) {
        self.toaster.notify(message, severity);
    }

    // -----------------------------------------------------------------------
    // View snapshots
    // -----------------------------------------------------------------------

    pub fn toolbar(&self) -> Option<Toolbar> {
        self.ui.lock().toolbar().cloned()
    }

    pub fn modal(&self) -> Option<Modal> {
        self.ui.lock().modal().cloned()
    }

    pub fn toasts(&self) -> Vec<ToastView> {
        self.toaster.visible()
    }

    pub fn head_styles(&self) -> Vec<StyleElement> {
        self.head.lock().styles().to_vec()
    }
}
