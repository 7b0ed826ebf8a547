//! View state kept in sync with the registry and the store.
//!
//! The toolbar and modal are built once, on framework init, from the merged
//! registry. Afterwards they are patched in place: toggles flip a button and
//! a section, setting edits re-render one control, and scripts registered
//! after init are appended. Neither is ever a source of truth; every value
//! shown comes from [`Settings`].

pub mod modal;
pub mod toolbar;
pub mod widgets;

pub use modal::{ClickTarget, Control, Modal, ModalSection};
pub use toolbar::{Toolbar, ToolbarButton, script_icon};
pub use widgets::{SelectOption, Widget};

use serde_json::Value;

use crate::config::FrameworkConfig;
use crate::script::{ScriptDescriptor, SettingKind};
use crate::settings::Settings;

#[derive(Default)]
pub struct UiEngine {
    toolbar: Option<Toolbar>,
    modal: Option<Modal>,
}

impl UiEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_built(&self) -> bool {
        self.toolbar.is_some()
    }

    /// Build toolbar and modal. A no-op returning false once built.
    pub(crate) fn build(
        &mut self,
        scripts: &[ScriptDescriptor],
        settings: &Settings,
        config: &FrameworkConfig,
    ) -> bool {
        if self.is_built() {
            return false;
        }
        let mut toolbar = Toolbar::new(&config.settings_button_label, &config.modal_title);
        let mut modal = Modal::new(&config.modal_title);
        for descriptor in scripts {
            let enabled = settings.is_enabled(descriptor);
            toolbar.push_script(descriptor, enabled);
            modal.sections.push(ModalSection::build(descriptor, settings, enabled));
        }
        self.toolbar = Some(toolbar);
        self.modal = Some(modal);
        true
    }

    /// Add a button and section for a script registered after the build.
    pub(crate) fn append_script(&mut self, descriptor: &ScriptDescriptor, settings: &Settings) {
        let (Some(toolbar), Some(modal)) = (self.toolbar.as_mut(), self.modal.as_mut()) else {
            return;
        };
        if toolbar.has_script(&descriptor.id) {
            return;
        }
        let enabled = settings.is_enabled(descriptor);
        toolbar.push_script(descriptor, enabled);
        modal.sections.push(ModalSection::build(descriptor, settings, enabled));
        tracing::debug!("[ui] Added controls for late script {}", descriptor.id);
    }

    /// Rebuild the button and section of a script the view already shows,
    /// in place. Returns false when there is nothing to replace.
    pub(crate) fn replace_script(&mut self, descriptor: &ScriptDescriptor, settings: &Settings) -> bool {
        let (Some(toolbar), Some(modal)) = (self.toolbar.as_mut(), self.modal.as_mut()) else {
            return false;
        };
        if !toolbar.has_script(&descriptor.id) {
            return false;
        }
        let enabled = settings.is_enabled(descriptor);
        toolbar.replace_script(descriptor, enabled);
        modal.replace_section(ModalSection::build(descriptor, settings, enabled));
        tracing::debug!("[ui] Replaced controls for {}", descriptor.id);
        true
    }

    /// Mirror a script's enabled state onto its button and section.
    pub(crate) fn set_script_active(&mut self, script_id: &str, enabled: bool) {
        if let Some(toolbar) = self.toolbar.as_mut() {
            toolbar.set_active(script_id, enabled);
        }
        if let Some(modal) = self.modal.as_mut() {
            modal.set_enabled(script_id, enabled);
        }
    }

    pub(crate) fn refresh_setting(&mut self, script_id: &str, key: &str, kind: &SettingKind, value: &Value) {
        if let Some(modal) = self.modal.as_mut() {
            modal.refresh_control(script_id, key, kind, value);
        }
    }

    pub fn open_modal(&mut self) {
        if let Some(modal) = self.modal.as_mut() {
            modal.visible = true;
        }
    }

    pub fn close_modal(&mut self) {
        if let Some(modal) = self.modal.as_mut() {
            modal.visible = false;
        }
    }

    pub fn click_modal(&mut self, target: ClickTarget) {
        if let Some(modal) = self.modal.as_mut() {
            modal.click(target);
        }
    }

    pub fn toolbar(&self) -> Option<&Toolbar> {
        self.toolbar.as_ref()
    }

    pub fn modal(&self) -> Option<&Modal> {
        self.modal.as_ref()
    }
}
