//! Settings modal: a singleton overlay with one section per script.

use serde::Serialize;
use serde_json::Value;

use super::widgets::{self, Widget};
use crate::script::{ScriptDescriptor, SettingKind};
use crate::settings::Settings;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Control {
    pub key: String,
    pub label: String,
    pub widget: Widget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModalSection {
    pub script_id: String,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    /// In setting declaration order.
    pub controls: Vec<Control>,
}

impl ModalSection {
    pub(crate) fn build(descriptor: &ScriptDescriptor, settings: &Settings, enabled: bool) -> Self {
        let controls = descriptor
            .settings
            .iter()
            .map(|(key, spec)| {
                let value = settings.resolve(&descriptor.id, key, spec.default.clone());
                Control {
                    key: key.to_string(),
                    label: spec.label_or(key).to_string(),
                    widget: widgets::render(&spec.kind, &value),
                }
            })
            .collect();
        Self {
            script_id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            enabled,
            controls,
        }
    }

    pub fn control(&self, key: &str) -> Option<&Control> {
        self.controls.iter().find(|c| c.key == key)
    }
}

/// Where a click on the open modal landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    /// The dimmed background around the panel.
    Overlay,
    /// Anything inside the panel.
    Content,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Modal {
    pub title: String,
    pub visible: bool,
    pub sections: Vec<ModalSection>,
}

impl Modal {
    pub(crate) fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            visible: false,
            sections: Vec::new(),
        }
    }

    pub fn section(&self, script_id: &str) -> Option<&ModalSection> {
        self.sections.iter().find(|s| s.script_id == script_id)
    }

    fn section_mut(&mut self, script_id: &str) -> Option<&mut ModalSection> {
        self.sections.iter_mut().find(|s| s.script_id == script_id)
    }

    /// Swap the section with the same script id, keeping its position.
    pub(crate) fn replace_section(&mut self, section: ModalSection) -> bool {
        match self.section_mut(&section.script_id) {
            Some(slot) => {
                *slot = section;
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_enabled(&mut self, script_id: &str, enabled: bool) {
        if let Some(section) = self.section_mut(script_id) {
            section.enabled = enabled;
        }
    }

    pub(crate) fn refresh_control(&mut self, script_id: &str, key: &str, kind: &SettingKind, value: &Value) {
        let Some(section) = self.section_mut(script_id) else {
            return;
        };
        if let Some(control) = section.controls.iter_mut().find(|c| c.key == key) {
            control.widget = widgets::render(kind, value);
        }
    }

    /// Clicks on the overlay background close the modal; clicks inside don't.
    pub(crate) fn click(&mut self, target: ClickTarget) {
        if target == ClickTarget::Overlay {
            self.visible = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryStore;
    use crate::script::SettingSpec;
    use crate::store::ScriptStore;
    use serde_json::json;
    use std::sync::Arc;

    fn settings() -> Settings {
        let store = ScriptStore::new(Arc::new(MemoryStore::new()), "qol_");
        Settings::new(Arc::new(store))
    }

    fn descriptor() -> ScriptDescriptor {
        ScriptDescriptor::new("md", "Page to Markdown")
            .description("Copy the page as markdown")
            .setting("format", SettingSpec::select(["gfm", "commonmark"], "gfm").label("Flavor"))
            .setting("accent", SettingSpec::color(""))
            .setting("images", SettingSpec::toggle(true))
    }

    #[test]
    fn section_controls_follow_declaration_order() {
        let section = ModalSection::build(&descriptor(), &settings(), true);
        let keys: Vec<&str> = section.controls.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["format", "accent", "images"]);
        assert_eq!(section.control("format").unwrap().label, "Flavor");
        assert_eq!(section.control("accent").unwrap().label, "accent");
    }

    #[test]
    fn section_uses_stored_values() {
        let settings = settings();
        settings.persist("md", "format", json!("commonmark"));
        settings.persist("md", "images", json!(false));

        let section = ModalSection::build(&descriptor(), &settings, false);
        let Widget::Select { options } = &section.control("format").unwrap().widget else {
            panic!("expected select");
        };
        assert!(options[1].selected);
        assert_eq!(
            section.control("images").unwrap().widget,
            Widget::Toggle { checked: false }
        );
        assert!(!section.enabled);
    }

    #[test]
    fn overlay_click_closes_content_click_does_not() {
        let mut modal = Modal::new("QoL Settings");
        modal.visible = true;
        modal.click(ClickTarget::Content);
        assert!(modal.visible);
        modal.click(ClickTarget::Overlay);
        assert!(!modal.visible);
    }
}
