//! Userscript plugin host: a registry of pluggable page scripts with
//! persisted per-script settings, an enable/disable lifecycle, a toolbar and
//! settings modal view model, toast notifications, and memoized loading of
//! third-party libraries.
//!
//! Embedders supply a [`Host`] (key-value store, text fetch, optional style
//! injection) and hand the resulting [`Framework`] to each script module.

pub mod config;
pub mod deps;
pub mod error;
pub mod framework;
pub mod host;
pub mod logging;
pub mod registry;
pub mod script;
pub mod settings;
pub mod store;
pub mod styles;
pub mod toast;
pub mod ui;
pub mod utils;

pub use config::{DependencySpec, FrameworkConfig};
pub use deps::{DependencyLoader, IsolatedModule, LibraryEvaluator, LibraryHandle};
pub use error::{DependencyError, Error, RegistrationError, Result};
pub use framework::{FRAMEWORK_VERSION, Framework};
pub use host::{Host, HostFetch, HostStore, HttpFetcher, JsonFileStore, MemoryStore, StyleHost};
pub use script::{
    ScriptContext, ScriptDescriptor, ScriptHooks, SettingKind, SettingSpec, SettingsSchema,
    parse_manifest,
};
pub use toast::{Severity, ToastView, Toaster};
pub use ui::{ClickTarget, Modal, Toolbar, Widget};
