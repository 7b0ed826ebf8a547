//! Framework stylesheet and its injection into the page.

use crate::host::StyleHost;

/// Id of the `<style>` element used when the host has no `addStyle`.
pub const STYLE_ELEMENT_ID: &str = "qol-styles";

pub const FRAMEWORK_CSS: &str = r#"
.qol-toolbar-btn {
  width: 40px;
  height: 40px;
  border: none;
  background: rgba(30, 41, 59, 0.6);
  color: #94a3b8;
  font-size: 18px;
  border-radius: 10px;
  cursor: pointer;
  transition: all 0.3s ease;
}
.qol-toolbar-btn.active {
  background: linear-gradient(135deg, #6366f1, #8b5cf6);
  color: #fff;
}
.qol-settings-btn {
  border: 1px solid rgba(99, 102, 241, 0.3);
}
@keyframes qol-toast-in {
  from { opacity: 0; transform: translateX(100px); }
  to { opacity: 1; transform: translateX(0); }
}
@keyframes qol-toast-out {
  from { opacity: 1; transform: translateX(0); }
  to { opacity: 0; transform: translateX(100px); }
}
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleElement {
    pub id: String,
    pub css: String,
}

/// The `<head>` of the page as far as the framework is concerned.
#[derive(Debug, Default)]
pub struct DocumentHead {
    styles: Vec<StyleElement>,
}

impl DocumentHead {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn style(&self, id: &str) -> Option<&StyleElement> {
        self.styles.iter().find(|s| s.id == id)
    }

    pub fn styles(&self) -> &[StyleElement] {
        &self.styles
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleInjection {
    /// Handed to the host's `addStyle`.
    Host,
    /// Inserted as a `<style>` element in the head.
    HeadElement,
    /// A `<style>` element with our id was already there.
    AlreadyPresent,
}

/// Inject `css`: through the host when it offers `addStyle`, else as a head
/// element with `id`, never twice.
pub fn inject_css(
    style_host: Option<&dyn StyleHost>,
    head: &mut DocumentHead,
    id: &str,
    css: &str,
) -> StyleInjection {
    if let Some(host) = style_host {
        host.add_style(css);
        return StyleInjection::Host;
    }
    if head.style(id).is_some() {
        return StyleInjection::AlreadyPresent;
    }
    head.styles.push(StyleElement {
        id: id.to_string(),
        css: css.to_string(),
    });
    StyleInjection::HeadElement
}

pub fn inject_styles(style_host: Option<&dyn StyleHost>, head: &mut DocumentHead) -> StyleInjection {
    inject_css(style_host, head, STYLE_ELEMENT_ID, FRAMEWORK_CSS)
}
