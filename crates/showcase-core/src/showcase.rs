use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Separator between a module title and an export name in a showcase title.
pub const TITLE_SEPARATOR: &str = " / ";

/// Export name used for the synthetic showcase built from a module's
/// default renderable.
pub const DEFAULT_EXPORT_NAME: &str = "Default";

/// The canonical control kinds. Other spellings are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    String,
    Boolean,
    Select,
    Number,
    Object,
    Array,
}

impl ControlKind {
    pub const ALL: [ControlKind; 6] = [
        ControlKind::String,
        ControlKind::Boolean,
        ControlKind::Select,
        ControlKind::Number,
        ControlKind::Object,
        ControlKind::Array,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ControlKind::String => "string",
            ControlKind::Boolean => "boolean",
            ControlKind::Select => "select",
            ControlKind::Number => "number",
            ControlKind::Object => "object",
            ControlKind::Array => "array",
        }
    }

    /// Object and array controls are edited as raw text.
    pub fn is_structured(self) -> bool {
        matches!(self, ControlKind::Object | ControlKind::Array)
    }
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A control kind spelling outside the canonical set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown control kind `{0}`")]
pub struct UnknownControlKind(pub String);

impl FromStr for ControlKind {
    type Err = UnknownControlKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ControlKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownControlKind(s.to_string()))
    }
}

/// A validated control declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct PropControlConfig {
    pub kind: ControlKind,
    pub label: Option<String>,
    pub default: Option<Value>,
    /// Non-empty when `kind` is `Select`, empty otherwise.
    pub options: Vec<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PropControlConfig {
    pub fn new(kind: ControlKind) -> Self {
        Self {
            kind,
            label: None,
            default: None,
            options: Vec::new(),
            min: None,
            max: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_options<S: Into<String>>(mut self, options: impl IntoIterator<Item = S>) -> Self {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }
}

/// Control schema of a showcase, in declaration order.
pub type Controls = IndexMap<String, PropControlConfig>;

/// Which library component a showcase renders, with its fixed props.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderableRef {
    pub component: String,
    pub args: IndexMap<String, Value>,
}

impl RenderableRef {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            args: IndexMap::new(),
        }
    }
}

/// One browsable variant of a demonstration module.
#[derive(Debug, Clone, PartialEq)]
pub struct Showcase {
    /// `"<title>-<exportName>"`, unique within a registry.
    pub id: String,
    /// The export name.
    pub name: String,
    /// `"<title> / <exportName>"`.
    pub title: String,
    pub renderable: RenderableRef,
    pub controls: Controls,
    pub description: Option<String>,
    /// The module file this showcase came from.
    pub source: PathBuf,
}

impl Showcase {
    /// Build a showcase for `export_name` of a module titled `module_title`.
    pub fn new(module_title: &str, export_name: &str, renderable: RenderableRef) -> Self {
        Self {
            id: format!("{module_title}-{export_name}"),
            name: export_name.to_string(),
            title: format!("{module_title}{TITLE_SEPARATOR}{export_name}"),
            renderable,
            controls: Controls::new(),
            description: None,
            source: PathBuf::new(),
        }
    }

    pub fn with_controls(mut self, controls: Controls) -> Self {
        self.controls = controls;
        self
    }

    /// The grouping key: the title up to the first separator.
    pub fn group(&self) -> &str {
        self.title
            .split(TITLE_SEPARATOR)
            .next()
            .unwrap_or(&self.title)
    }
}
