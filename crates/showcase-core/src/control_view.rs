//! Typed control renderer: maps each control's kind to the widget a host UI
//! should draw, populated from the current [`ControlState`].

use serde_json::Value;

use crate::controls::ControlState;
use crate::showcase::ControlKind;

/// The widget for one control, with everything needed to draw it.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlWidget {
    TextInput {
        value: String,
    },
    Toggle {
        checked: bool,
    },
    Select {
        options: Vec<String>,
        selected: Option<String>,
    },
    NumberInput {
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },
    /// Raw-text editor for object and array controls.
    StructuredEditor {
        text: String,
        error: Option<String>,
    },
}

/// One row of the controls panel.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlField {
    pub key: String,
    /// The declared label, or the key when none was given.
    pub label: String,
    pub widget: ControlWidget,
}

/// Describe every control of the current state in declaration order.
pub fn describe_controls(state: &ControlState) -> Vec<ControlField> {
    state
        .schema()
        .iter()
        .map(|(key, config)| {
            let value = state.values().get(key);
            let widget = match config.kind {
                ControlKind::String => ControlWidget::TextInput {
                    value: value.and_then(Value::as_str).unwrap_or_default().to_string(),
                },
                ControlKind::Boolean => ControlWidget::Toggle {
                    checked: value.and_then(Value::as_bool).unwrap_or(false),
                },
                ControlKind::Select => ControlWidget::Select {
                    options: config.options.clone(),
                    selected: value.and_then(Value::as_str).map(str::to_string),
                },
                ControlKind::Number => ControlWidget::NumberInput {
                    value: value.and_then(Value::as_f64).unwrap_or(0.0),
                    min: config.min,
                    max: config.max,
                },
                ControlKind::Object | ControlKind::Array => ControlWidget::StructuredEditor {
                    text: state.display_text(key).unwrap_or_default(),
                    error: state.draft_error(key).map(str::to_string),
                },
            };
            ControlField {
                key: key.clone(),
                label: config.label.clone().unwrap_or_else(|| key.clone()),
                widget,
            }
        })
        .collect()
}
