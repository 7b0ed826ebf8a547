//! One rendering function per setting kind.

use serde::Serialize;
use serde_json::Value;

use crate::script::SettingKind;
use crate::settings::truthy;

/// Shown by color pickers that have no value yet.
pub const DEFAULT_COLOR: &str = "#6366f1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub selected: bool,
}

/// A form control in the settings modal, populated from a resolved value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Widget {
    Toggle { checked: bool },
    Text { value: String },
    Select { options: Vec<SelectOption> },
    Color { value: String },
}

pub fn render(kind: &SettingKind, value: &Value) -> Widget {
    match kind {
        SettingKind::Toggle => render_toggle(value),
        SettingKind::Text => render_text(value),
        SettingKind::Select { options } => render_select(options, value),
        SettingKind::Color => render_color(value),
    }
}

fn render_toggle(value: &Value) -> Widget {
    Widget::Toggle {
        checked: truthy(value),
    }
}

fn render_text(value: &Value) -> Widget {
    Widget::Text {
        value: display_text(value),
    }
}

fn render_select(options: &[String], value: &Value) -> Widget {
    let current = display_text(value);
    Widget::Select {
        options: options
            .iter()
            .map(|opt| SelectOption {
                value: opt.clone(),
                selected: *opt == current,
            })
            .collect(),
    }
}

fn render_color(value: &Value) -> Widget {
    let value = display_text(value);
    Widget::Color {
        value: if value.is_empty() {
            DEFAULT_COLOR.to_string()
        } else {
            value
        },
    }
}

fn display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
