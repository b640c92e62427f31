//! Control state: the editable value map of the selected showcase.
//!
//! Committed values live in a [`ControlValues`] map that is replaced, never
//! mutated, on every update so consumers can compare snapshots by pointer.
//! Object and array controls are edited as raw JSON text; text that does not
//! decode is kept as a draft next to the last committed value.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};
use tracing::trace;

use crate::showcase::{ControlKind, Controls, PropControlConfig, Showcase};

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// Committed control values, keyed in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlValues(Arc<IndexMap<String, Value>>);

impl ControlValues {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &IndexMap<String, Value> {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether both handles point at the same snapshot.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl FromIterator<(String, Value)> for ControlValues {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(Arc::new(iter.into_iter().collect()))
    }
}

/// The value a control starts from when it declares no default.
pub fn empty_value(config: &PropControlConfig) -> Value {
    match config.kind {
        ControlKind::String => Value::String(String::new()),
        ControlKind::Boolean => Value::Bool(false),
        ControlKind::Number => clamped_number(config, 0.0),
        ControlKind::Select => config
            .options
            .first()
            .map_or(Value::Null, |o| Value::String(o.clone())),
        ControlKind::Object => Value::Object(Map::new()),
        ControlKind::Array => Value::Array(Vec::new()),
    }
}

/// `value` clamped to the control's bounds. Integral results are stored as
/// integers.
fn clamped_number(config: &PropControlConfig, value: f64) -> Value {
    let mut clamped = value;
    if let Some(min) = config.min {
        clamped = clamped.max(min);
    }
    if let Some(max) = config.max {
        clamped = clamped.min(max);
    }
    if clamped.fract() == 0.0 && clamped.abs() < i64::MAX as f64 {
        Value::from(clamped as i64)
    } else {
        Number::from_f64(clamped).map_or(Value::Null, Value::Number)
    }
}

/// Seed a value for every declared control from its default.
pub fn init_control_values(showcase: &Showcase) -> ControlValues {
    seed(&showcase.controls)
}

fn seed(controls: &Controls) -> ControlValues {
    controls
        .iter()
        .map(|(key, config)| {
            let value = config.default.clone().unwrap_or_else(|| empty_value(config));
            (key.clone(), value)
        })
        .collect()
}

/// A copy of `values` with `key` set to `value`; `values` is left untouched.
pub fn set_control_value(values: &ControlValues, key: &str, value: Value) -> ControlValues {
    let mut next = (*values.0).clone();
    next.insert(key.to_string(), value);
    ControlValues(Arc::new(next))
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A rejected control update.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ControlError {
    #[error("no control named `{key}`")]
    UnknownKey { key: String },

    #[error("control `{key}` is a {kind} control and cannot take a {attempted} value")]
    KindMismatch {
        key: String,
        kind: ControlKind,
        attempted: &'static str,
    },

    #[error("`{value}` is not an option of control `{key}`")]
    NotAnOption { key: String, value: String },

    #[error("control `{key}` needs a finite number")]
    NotFinite { key: String },
}

/// Raw text for an object or array control that did not decode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value for `{key}`: {detail}")]
pub struct ControlDecodeError {
    pub key: String,
    pub detail: String,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Text being typed into a structured editor.
#[derive(Debug, Clone, PartialEq)]
pub struct TextDraft {
    pub text: String,
    pub error: Option<String>,
}

/// A host-facing control edit.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlInput {
    Text(String),
    Toggle(bool),
    Number(f64),
    Select(String),
    /// A keystroke in an object/array editor; carries the whole text.
    Structured(String),
    /// The editor lost focus.
    Blur,
}

/// What an accepted edit did.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlOutcome {
    /// A new value was committed.
    Committed,
    /// The text was kept as a draft; the committed value is unchanged.
    Invalid(ControlDecodeError),
    /// An invalid draft was discarded on blur.
    Reverted,
    Unchanged,
}

/// Committed values plus structured-editor drafts for one showcase.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlState {
    schema: Controls,
    values: ControlValues,
    drafts: HashMap<String, TextDraft>,
}

impl ControlState {
    /// Start from the showcase's declared defaults.
    pub fn new(showcase: &Showcase) -> Self {
        Self {
            schema: showcase.controls.clone(),
            values: init_control_values(showcase),
            drafts: HashMap::new(),
        }
    }

    pub fn values(&self) -> &ControlValues {
        &self.values
    }

    pub fn schema(&self) -> &Controls {
        &self.schema
    }

    /// Re-seed every value from its default and drop all drafts.
    pub fn reset(&mut self) {
        self.values = seed(&self.schema);
        self.drafts.clear();
    }

    pub fn set_string(&mut self, key: &str, value: impl Into<String>) -> Result<(), ControlError> {
        self.expect_kind(key, ControlKind::String, "string")?;
        self.commit(key, Value::String(value.into()));
        Ok(())
    }

    pub fn set_bool(&mut self, key: &str, value: bool) -> Result<(), ControlError> {
        self.expect_kind(key, ControlKind::Boolean, "boolean")?;
        self.commit(key, Value::Bool(value));
        Ok(())
    }

    /// Set a number, clamped to the control's bounds. Integral results are
    /// stored as integers.
    pub fn set_number(&mut self, key: &str, value: f64) -> Result<(), ControlError> {
        let config = self.expect_kind(key, ControlKind::Number, "number")?;
        if !value.is_finite() {
            return Err(ControlError::NotFinite {
                key: key.to_string(),
            });
        }
        let number = clamped_number(config, value);
        self.commit(key, number);
        Ok(())
    }

    pub fn select_option(&mut self, key: &str, option: &str) -> Result<(), ControlError> {
        let config = self.expect_kind(key, ControlKind::Select, "select")?;
        if !config.options.iter().any(|o| o == option) {
            return Err(ControlError::NotAnOption {
                key: key.to_string(),
                value: option.to_string(),
            });
        }
        self.commit(key, Value::String(option.to_string()));
        Ok(())
    }

    /// A keystroke in an object/array editor.
    ///
    /// Text that decodes to the control's shape is committed at once.
    /// Anything else is kept as an invalid draft and the committed value is
    /// left alone.
    pub fn edit_structured(&mut self, key: &str, text: &str) -> Result<ControlOutcome, ControlError> {
        let kind = self.config(key)?.kind;
        if !kind.is_structured() {
            return Err(ControlError::KindMismatch {
                key: key.to_string(),
                kind,
                attempted: "structured",
            });
        }

        match decode_structured(kind, text) {
            Ok(value) => {
                self.values = set_control_value(&self.values, key, value);
                self.drafts.insert(
                    key.to_string(),
                    TextDraft {
                        text: text.to_string(),
                        error: None,
                    },
                );
                Ok(ControlOutcome::Committed)
            }
            Err(detail) => {
                trace!(key, %detail, "structured input did not decode");
                self.drafts.insert(
                    key.to_string(),
                    TextDraft {
                        text: text.to_string(),
                        error: Some(detail.clone()),
                    },
                );
                Ok(ControlOutcome::Invalid(ControlDecodeError {
                    key: key.to_string(),
                    detail,
                }))
            }
        }
    }

    /// The editor for `key` lost focus: an invalid draft is discarded so the
    /// displayed text matches the committed value again.
    pub fn blur(&mut self, key: &str) -> Result<ControlOutcome, ControlError> {
        self.config(key)?;
        if self.is_invalid(key) {
            self.drafts.remove(key);
            return Ok(ControlOutcome::Reverted);
        }
        Ok(ControlOutcome::Unchanged)
    }

    /// The text an editor for `key` should show.
    pub fn display_text(&self, key: &str) -> Option<String> {
        if let Some(draft) = self.drafts.get(key) {
            return Some(draft.text.clone());
        }
        self.values.get(key).map(|value| match value {
            Value::String(s) => s.clone(),
            Value::Object(_) | Value::Array(_) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            other => other.to_string(),
        })
    }

    pub fn draft_error(&self, key: &str) -> Option<&str> {
        self.drafts.get(key).and_then(|d| d.error.as_deref())
    }

    pub fn is_invalid(&self, key: &str) -> bool {
        self.draft_error(key).is_some()
    }

    /// Apply a host input to `key`.
    pub fn apply(&mut self, key: &str, input: &ControlInput) -> Result<ControlOutcome, ControlError> {
        match input {
            ControlInput::Text(text) => self.set_string(key, text.as_str()),
            ControlInput::Toggle(on) => self.set_bool(key, *on),
            ControlInput::Number(n) => self.set_number(key, *n),
            ControlInput::Select(option) => self.select_option(key, option),
            ControlInput::Structured(text) => return self.edit_structured(key, text),
            ControlInput::Blur => return self.blur(key),
        }
        .map(|()| ControlOutcome::Committed)
    }

    fn config(&self, key: &str) -> Result<&PropControlConfig, ControlError> {
        self.schema.get(key).ok_or_else(|| ControlError::UnknownKey {
            key: key.to_string(),
        })
    }

    fn expect_kind(
        &self,
        key: &str,
        expected: ControlKind,
        attempted: &'static str,
    ) -> Result<&PropControlConfig, ControlError> {
        let config = self.config(key)?;
        if config.kind != expected {
            return Err(ControlError::KindMismatch {
                key: key.to_string(),
                kind: config.kind,
                attempted,
            });
        }
        Ok(config)
    }

    fn commit(&mut self, key: &str, value: Value) {
        self.values = set_control_value(&self.values, key, value);
        self.drafts.remove(key);
    }
}

fn decode_structured(kind: ControlKind, text: &str) -> Result<Value, String> {
    let value: Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
    match (kind, &value) {
        (ControlKind::Object, Value::Object(_)) | (ControlKind::Array, Value::Array(_)) => Ok(value),
        _ => Err(format!("expected {kind}, got {}", json_type(&value))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::showcase::RenderableRef;
    use serde_json::json;

    fn showcase(controls: Vec<(&str, PropControlConfig)>) -> Showcase {
        Showcase::new("T", "E", RenderableRef::new("c"))
            .with_controls(controls.into_iter().map(|(k, c)| (k.to_string(), c)).collect())
    }

    fn sample() -> ControlState {
        let mut bounded = PropControlConfig::new(ControlKind::Number).with_default(json!(5));
        bounded.min = Some(0.0);
        bounded.max = Some(10.0);
        ControlState::new(&showcase(vec![
            ("label", PropControlConfig::new(ControlKind::String)),
            ("on", PropControlConfig::new(ControlKind::Boolean)),
            ("size", bounded),
            (
                "variant",
                PropControlConfig::new(ControlKind::Select).with_options(["a", "b"]),
            ),
            (
                "style",
                PropControlConfig::new(ControlKind::Object).with_default(json!({"color": "red"})),
            ),
            ("items", PropControlConfig::new(ControlKind::Array)),
        ]))
    }

    #[test]
    fn init_uses_defaults_then_kind_empty_values() {
        let s = showcase(vec![
            ("size", PropControlConfig::new(ControlKind::Number).with_default(json!(16))),
            ("label", PropControlConfig::new(ControlKind::String)),
        ]);
        let values = init_control_values(&s);
        assert_eq!(values.as_map().get("size"), Some(&json!(16)));
        assert_eq!(values.as_map().get("label"), Some(&json!("")));
        assert_eq!(values.as_map().keys().collect::<Vec<_>>(), vec!["size", "label"]);

        let state = sample();
        assert_eq!(state.values().get("on"), Some(&json!(false)));
        assert_eq!(state.values().get("variant"), Some(&json!("a")));
        assert_eq!(state.values().get("items"), Some(&json!([])));
    }

    #[test]
    fn set_control_value_never_mutates_the_previous_map() {
        let before: ControlValues = vec![("a".to_string(), json!(1))].into_iter().collect();
        let after = set_control_value(&before, "a", json!(2));
        assert_eq!(before.get("a"), Some(&json!(1)));
        assert_eq!(after.get("a"), Some(&json!(2)));
        assert!(!before.ptr_eq(&after));
    }

    #[test]
    fn typed_updates_check_kind_and_key() {
        let mut state = sample();
        state.set_string("label", "Hi").unwrap();
        state.set_bool("on", true).unwrap();
        assert_eq!(state.values().get("label"), Some(&json!("Hi")));
        assert_eq!(state.values().get("on"), Some(&json!(true)));

        assert!(matches!(
            state.set_bool("label", true),
            Err(ControlError::KindMismatch { kind: ControlKind::String, .. })
        ));
        assert_eq!(
            state.set_string("nope", "x"),
            Err(ControlError::UnknownKey { key: "nope".into() })
        );
    }

    #[test]
    fn numbers_are_clamped_and_must_be_finite() {
        let mut state = sample();
        state.set_number("size", 42.0).unwrap();
        assert_eq!(state.values().get("size"), Some(&json!(10)));
        state.set_number("size", 2.5).unwrap();
        assert_eq!(state.values().get("size"), Some(&json!(2.5)));
        assert!(matches!(
            state.set_number("size", f64::NAN),
            Err(ControlError::NotFinite { .. })
        ));
    }

    #[test]
    fn number_without_default_starts_inside_its_bounds() {
        let mut above = PropControlConfig::new(ControlKind::Number);
        above.min = Some(5.0);
        let mut below = PropControlConfig::new(ControlKind::Number);
        below.max = Some(-1.5);
        let values = init_control_values(&showcase(vec![
            ("above", above),
            ("below", below),
            ("free", PropControlConfig::new(ControlKind::Number)),
        ]));
        assert_eq!(values.get("above"), Some(&json!(5)));
        assert_eq!(values.get("below"), Some(&json!(-1.5)));
        assert_eq!(values.get("free"), Some(&json!(0)));
    }

    #[test]
    fn select_rejects_values_outside_options() {
        let mut state = sample();
        state.select_option("variant", "b").unwrap();
        assert_eq!(state.values().get("variant"), Some(&json!("b")));
        assert!(matches!(
            state.select_option("variant", "c"),
            Err(ControlError::NotAnOption { .. })
        ));
        assert_eq!(state.values().get("variant"), Some(&json!("b")));
    }

    #[test]
    fn invalid_structured_text_keeps_committed_value() {
        let mut state = sample();
        let committed = state.values().clone();

        let outcome = state.edit_structured("style", "{\"color\": ").unwrap();
        assert!(matches!(outcome, ControlOutcome::Invalid(_)));
        assert!(state.is_invalid("style"));
        assert_eq!(state.display_text("style").as_deref(), Some("{\"color\": "));
        assert!(state.values().ptr_eq(&committed));

        assert_eq!(state.blur("style").unwrap(), ControlOutcome::Reverted);
        assert!(!state.is_invalid("style"));
        let shown: Value = serde_json::from_str(&state.display_text("style").unwrap()).unwrap();
        assert_eq!(shown, json!({"color": "red"}));
    }

    #[test]
    fn valid_structured_text_commits_immediately() {
        let mut state = sample();
        let outcome = state.edit_structured("items", "[1, 2]").unwrap();
        assert_eq!(outcome, ControlOutcome::Committed);
        assert_eq!(state.values().get("items"), Some(&json!([1, 2])));
        assert_eq!(state.display_text("items").as_deref(), Some("[1, 2]"));
        assert_eq!(state.blur("items").unwrap(), ControlOutcome::Unchanged);
    }

    #[test]
    fn structured_text_of_the_wrong_shape_is_invalid() {
        let mut state = sample();
        let outcome = state.edit_structured("style", "[1]").unwrap();
        match outcome {
            ControlOutcome::Invalid(e) => assert!(e.detail.contains("expected object")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(state.values().get("style"), Some(&json!({"color": "red"})));
        assert!(state.edit_structured("label", "{}").is_err());
    }

    #[test]
    fn reset_restores_defaults_and_clears_drafts() {
        let mut state = sample();
        state.set_number("size", 1.0).unwrap();
        state.edit_structured("items", "[").unwrap();
        state.reset();
        assert_eq!(state.values().get("size"), Some(&json!(5)));
        assert!(!state.is_invalid("items"));
    }

    #[test]
    fn apply_dispatches_inputs() {
        let mut state = sample();
        assert_eq!(
            state.apply("label", &ControlInput::Text("x".into())).unwrap(),
            ControlOutcome::Committed
        );
        state.apply("on", &ControlInput::Toggle(true)).unwrap();
        state.apply("size", &ControlInput::Number(3.0)).unwrap();
        state.apply("variant", &ControlInput::Select("b".into())).unwrap();
        state
            .apply("items", &ControlInput::Structured("[true]".into()))
            .unwrap();
        assert_eq!(
            state.values().as_map().values().cloned().collect::<Vec<_>>(),
            vec![json!("x"), json!(true), json!(3), json!("b"), json!({"color": "red"}), json!([true])]
        );
        assert_eq!(state.apply("items", &ControlInput::Blur).unwrap(), ControlOutcome::Unchanged);
    }
}
