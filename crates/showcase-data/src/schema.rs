//! Serde structs for demonstration-module files.
//!
//! A demonstration module is a RON, TOML, or JSON file declaring one
//! metadata block and an ordered list of exports. Each export is an explicit
//! tagged union: a renderable (a component reference plus optional control
//! schema) or plain data. Control kinds are kept as strings here; the parser
//! validates them against the canonical set.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

/// Top-level demonstration-module file.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleData {
    pub meta: MetaData,
    #[serde(default)]
    pub exports: Vec<ExportData>,
}

/// The metadata export of a module.
#[derive(Debug, Clone, Deserialize)]
pub struct MetaData {
    pub title: String,
    /// Default renderable, used when the module has no renderable exports.
    #[serde(default)]
    pub renderable: Option<RenderableData>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A named export, in declaration order.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportData {
    pub name: String,
    pub value: ExportKindData,
}

/// What an export holds.
#[derive(Debug, Clone, Deserialize)]
pub enum ExportKindData {
    /// A renderable variant.
    Renderable(RenderableData),
    /// Plain data; never becomes a showcase.
    Data(Value),
}

/// A reference to a library component, with fixed arguments and controls.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderableData {
    /// Name the component is registered under in the component library.
    pub component: String,
    /// Fixed props, overlaid by control values at render time.
    #[serde(default)]
    pub args: IndexMap<String, Value>,
    #[serde(default)]
    pub controls: IndexMap<String, ControlData>,
}

/// A control declaration as authored.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlData {
    pub kind: String,
    #[serde(default)]
    pub label: Option<String>,
    /// `null` (or absent) means "no declared default".
    #[serde(default)]
    pub default: Value,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}
