//! Toolbar: a settings launcher followed by one button per script.

use regex::Regex;
use serde::Serialize;

use crate::script::ScriptDescriptor;

lazy_static::lazy_static! {
    /// Pictographic characters only; plain digits and `#` do not count.
    static ref EMOJI: Regex =
        Regex::new(r"[\p{Extended_Pictographic}\p{Emoji_Presentation}]").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolbarButton {
    /// `None` for the settings launcher.
    pub script_id: Option<String>,
    pub label: String,
    pub title: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toolbar {
    settings: ToolbarButton,
    scripts: Vec<ToolbarButton>,
}

impl Toolbar {
    pub(crate) fn new(settings_label: &str, settings_title: &str) -> Self {
        Self {
            settings: ToolbarButton {
                script_id: None,
                label: settings_label.to_string(),
                title: settings_title.to_string(),
                active: false,
            },
            scripts: Vec::new(),
        }
    }

    pub fn settings_button(&self) -> &ToolbarButton {
        &self.settings
    }

    /// Script buttons in registry order.
    pub fn script_buttons(&self) -> &[ToolbarButton] {
        &self.scripts
    }

    /// All buttons as rendered: the settings launcher first.
    pub fn buttons(&self) -> impl Iterator<Item = &ToolbarButton> {
        std::iter::once(&self.settings).chain(self.scripts.iter())
    }

    pub fn button(&self, script_id: &str) -> Option<&ToolbarButton> {
        self.scripts
            .iter()
            .find(|b| b.script_id.as_deref() == Some(script_id))
    }

    pub(crate) fn has_script(&self, script_id: &str) -> bool {
        self.button(script_id).is_some()
    }

    pub(crate) fn push_script(&mut self, descriptor: &ScriptDescriptor, active: bool) {
        self.scripts.push(script_button(descriptor, active));
    }

    /// Swap the button for `descriptor.id`, keeping its position.
    pub(crate) fn replace_script(&mut self, descriptor: &ScriptDescriptor, active: bool) -> bool {
        match self
            .scripts
            .iter_mut()
            .find(|b| b.script_id.as_deref() == Some(descriptor.id.as_str()))
        {
            Some(button) => {
                *button = script_button(descriptor, active);
                true
            }
            None => false,
        }
    }

    /// Returns false when the script has no button.
    pub(crate) fn set_active(&mut self, script_id: &str, active: bool) -> bool {
        match self
            .scripts
            .iter_mut()
            .find(|b| b.script_id.as_deref() == Some(script_id))
        {
            Some(button) => {
                button.active = active;
                true
            }
            None => false,
        }
    }
}

fn script_button(descriptor: &ScriptDescriptor, active: bool) -> ToolbarButton {
    ToolbarButton {
        script_id: Some(descriptor.id.clone()),
        label: script_icon(&descriptor.name, &descriptor.description),
        title: format!("{}\n{}", descriptor.name, descriptor.description),
        active,
    }
}

/// Button label: first emoji in `name + description`, else the first letter
/// of `name` uppercased.
pub fn script_icon(name: &str, description: &str) -> String {
    let haystack = format!("{name}{description}");
    if let Some(m) = EMOJI.find(&haystack) {
        return m.as_str().to_string();
    }
    name.chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icon_prefers_emoji_from_name() {
        assert_eq!(script_icon("🌙 Dark Mode", "Force dark theme"), "🌙");
    }

    #[test]
    fn icon_finds_emoji_in_description() {
        assert_eq!(script_icon("Page to Markdown", "Copy page as 📋 markdown"), "📋");
    }

    #[test]
    fn icon_falls_back_to_uppercased_initial() {
        assert_eq!(script_icon("highlighter", "Mark elements"), "H");
        assert_eq!(script_icon("ßeta", ""), "SS");
    }

    #[test]
    fn icon_ignores_digits() {
        assert_eq!(script_icon("page 2 markdown", "v1 #1"), "P");
    }

    #[test]
    fn toolbar_orders_settings_first() {
        let mut toolbar = Toolbar::new("⚙️", "QoL Settings");
        toolbar.push_script(&ScriptDescriptor::new("a", "Alpha"), true);
        toolbar.push_script(&ScriptDescriptor::new("b", "Beta"), false);

        let labels: Vec<&str> = toolbar.buttons().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["⚙️", "A", "B"]);
        assert_eq!(toolbar.button("a").unwrap().title, "Alpha\n");
    }

    #[test]
    fn set_active_updates_only_target() {
        let mut toolbar = Toolbar::new("⚙️", "QoL Settings");
        toolbar.push_script(&ScriptDescriptor::new("a", "Alpha"), true);
        toolbar.push_script(&ScriptDescriptor::new("b", "Beta"), true);

        assert!(toolbar.set_active("a", false));
        assert!(!toolbar.button("a").unwrap().active);
        assert!(toolbar.button("b").unwrap().active);
        assert!(!toolbar.set_active("missing", true));
    }
}
