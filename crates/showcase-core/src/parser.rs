//! Converts a demonstration module's exports into showcases.
//!
//! Renderable exports become showcases in declaration order; data exports
//! are skipped. A module with no renderable exports but a default
//! renderable in its metadata yields a single `Default` showcase.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::Value;
use showcase_data::schema::{ControlData, ExportKindData, RenderableData};
use tracing::trace;

use crate::module::DemonstrationModule;
use crate::showcase::{
    ControlKind, Controls, DEFAULT_EXPORT_NAME, PropControlConfig, RenderableRef, Showcase,
};

/// An authoring error in a demonstration module.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("{module}: metadata title must not be empty")]
    EmptyTitle { module: PathBuf },

    #[error("{module}: export `{export}` is declared more than once")]
    DuplicateExport { module: PathBuf, export: String },

    #[error(
        "{module}: control `{key}` on `{export}` has unknown kind `{kind}` \
         (expected string, boolean, select, number, object, or array)"
    )]
    UnknownControlKind {
        module: PathBuf,
        export: String,
        key: String,
        kind: String,
    },

    #[error("{module}: select control `{key}` on `{export}` needs at least one option")]
    MissingOptions {
        module: PathBuf,
        export: String,
        key: String,
    },

    #[error("{module}: control `{key}` on `{export}` is invalid: {reason}")]
    InvalidControl {
        module: PathBuf,
        export: String,
        key: String,
        reason: String,
    },
}

/// Parse every renderable export of `module` into a showcase.
pub fn parse(module: &DemonstrationModule) -> Result<Vec<Showcase>, ParseError> {
    let title = module.meta.title.as_str();
    if title.trim().is_empty() {
        return Err(ParseError::EmptyTitle {
            module: module.path.clone(),
        });
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut showcases = Vec::new();

    for export in &module.exports {
        if !seen.insert(export.name.as_str()) {
            return Err(ParseError::DuplicateExport {
                module: module.path.clone(),
                export: export.name.clone(),
            });
        }
        match &export.value {
            ExportKindData::Renderable(renderable) => {
                showcases.push(build_showcase(module, &export.name, renderable)?);
            }
            ExportKindData::Data(_) => {
                trace!(module = %module.path.display(), export = %export.name, "skipping data export");
            }
        }
    }

    if showcases.is_empty() {
        if let Some(default) = &module.meta.renderable {
            showcases.push(build_showcase(module, DEFAULT_EXPORT_NAME, default)?);
        }
    }

    Ok(showcases)
}

fn build_showcase(
    module: &DemonstrationModule,
    export: &str,
    data: &RenderableData,
) -> Result<Showcase, ParseError> {
    let mut renderable = RenderableRef::new(&data.component);
    renderable.args = data.args.clone();

    let controls = parse_controls(&module.path, export, &data.controls)?;
    let mut showcase = Showcase::new(&module.meta.title, export, renderable).with_controls(controls);
    showcase.description = module.meta.description.clone();
    showcase.source = module.path.clone();
    Ok(showcase)
}

/// Validate a control mapping, keeping declaration order.
pub fn parse_controls(
    module: &Path,
    export: &str,
    controls: &IndexMap<String, ControlData>,
) -> Result<Controls, ParseError> {
    controls
        .iter()
        .map(|(key, data)| {
            parse_control(module, export, key, data).map(|config| (key.clone(), config))
        })
        .collect()
}

fn parse_control(
    module: &Path,
    export: &str,
    key: &str,
    data: &ControlData,
) -> Result<PropControlConfig, ParseError> {
    let invalid = |reason: String| ParseError::InvalidControl {
        module: module.to_path_buf(),
        export: export.to_string(),
        key: key.to_string(),
        reason,
    };

    let kind: ControlKind = data
        .kind
        .parse()
        .map_err(|_| ParseError::UnknownControlKind {
            module: module.to_path_buf(),
            export: export.to_string(),
            key: key.to_string(),
            kind: data.kind.clone(),
        })?;

    let options = data.options.clone().unwrap_or_default();
    if kind == ControlKind::Select && options.is_empty() {
        return Err(ParseError::MissingOptions {
            module: module.to_path_buf(),
            export: export.to_string(),
            key: key.to_string(),
        });
    }

    if let (Some(min), Some(max)) = (data.min, data.max) {
        if min > max {
            return Err(invalid(format!("min {min} exceeds max {max}")));
        }
    }

    let default = match &data.default {
        Value::Null => None,
        value => {
            check_default(kind, value, &options, data.min, data.max).map_err(invalid)?;
            Some(value.clone())
        }
    };

    Ok(PropControlConfig {
        kind,
        label: data.label.clone(),
        default,
        options: if kind == ControlKind::Select {
            options
        } else {
            Vec::new()
        },
        min: data.min,
        max: data.max,
    })
}

fn check_default(
    kind: ControlKind,
    value: &Value,
    options: &[String],
    min: Option<f64>,
    max: Option<f64>,
) -> Result<(), String> {
    let fits = match kind {
        ControlKind::String => value.is_string(),
        ControlKind::Boolean => value.is_boolean(),
        ControlKind::Number => value.is_number(),
        ControlKind::Select => value.is_string(),
        ControlKind::Object => value.is_object(),
        ControlKind::Array => value.is_array(),
    };
    if !fits {
        return Err(format!("default {value} is not a valid {kind} value"));
    }

    if kind == ControlKind::Select {
        let chosen = value.as_str().unwrap_or_default();
        if !options.iter().any(|o| o == chosen) {
            return Err(format!("default `{chosen}` is not one of the options"));
        }
    }

    if let Some(n) = value.as_f64().filter(|_| kind == ControlKind::Number) {
        if min.is_some_and(|m| n < m) || max.is_some_and(|m| n > m) {
            return Err(format!("default {n} is outside the declared bounds"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use showcase_data::schema::ModuleData;

    fn module(json: &str) -> DemonstrationModule {
        let data: ModuleData = serde_json::from_str(json).unwrap();
        DemonstrationModule::from_data("button.showcase.json", data)
    }

    #[test]
    fn parses_renderable_exports_in_order() {
        let m = module(
            r#"{
                "meta": {"title": "Button"},
                "exports": [
                    {"name": "Primary", "value": {"Renderable": {"component": "button"}}},
                    {"name": "Secondary", "value": {"Renderable": {
                        "component": "button",
                        "controls": {"variant": {"kind": "select", "options": ["a", "b"], "default": "a"}}
                    }}}
                ]
            }"#,
        );

        let showcases = parse(&m).unwrap();
        assert_eq!(showcases.len(), 2);

        assert_eq!(showcases[0].id, "Button-Primary");
        assert_eq!(showcases[0].name, "Primary");
        assert_eq!(showcases[0].title, "Button / Primary");
        assert!(showcases[0].controls.is_empty());

        assert_eq!(showcases[1].id, "Button-Secondary");
        assert_eq!(showcases[1].title, "Button / Secondary");
        let variant = &showcases[1].controls["variant"];
        assert_eq!(variant.kind, ControlKind::Select);
        assert_eq!(variant.options, vec!["a", "b"]);
        assert_eq!(variant.default, Some(Value::from("a")));
        assert_eq!(showcases[1].source, PathBuf::from("button.showcase.json"));
    }

    #[test]
    fn data_exports_are_skipped() {
        let m = module(
            r#"{
                "meta": {"title": "Card"},
                "exports": [
                    {"name": "SIZES", "value": {"Data": [1, 2]}},
                    {"name": "Basic", "value": {"Renderable": {"component": "card"}}},
                    {"name": "THEME", "value": {"Data": {"dark": true}}}
                ]
            }"#,
        );
        let showcases = parse(&m).unwrap();
        assert_eq!(showcases.len(), 1);
        assert_eq!(showcases[0].name, "Basic");
    }

    #[test]
    fn default_renderable_yields_synthetic_showcase() {
        let m = module(
            r#"{
                "meta": {"title": "Badge", "renderable": {"component": "badge"}, "description": "Small."},
                "exports": [{"name": "COLORS", "value": {"Data": ["red"]}}]
            }"#,
        );
        let showcases = parse(&m).unwrap();
        assert_eq!(showcases.len(), 1);
        assert_eq!(showcases[0].id, "Badge-Default");
        assert_eq!(showcases[0].title, "Badge / Default");
        assert_eq!(showcases[0].renderable.component, "badge");
        assert_eq!(showcases[0].description.as_deref(), Some("Small."));
    }

    #[test]
    fn default_renderable_ignored_when_named_exports_exist() {
        let m = module(
            r#"{
                "meta": {"title": "Badge", "renderable": {"component": "badge"}},
                "exports": [{"name": "Red", "value": {"Renderable": {"component": "badge"}}}]
            }"#,
        );
        let showcases = parse(&m).unwrap();
        assert_eq!(showcases.len(), 1);
        assert_eq!(showcases[0].name, "Red");
    }

    #[test]
    fn module_without_renderables_yields_nothing() {
        let m = module(r#"{"meta": {"title": "Tokens"}, "exports": [{"name": "X", "value": {"Data": 1}}]}"#);
        assert!(parse(&m).unwrap().is_empty());
    }

    #[test]
    fn non_canonical_control_kind_is_rejected() {
        let m = module(
            r#"{
                "meta": {"title": "Input"},
                "exports": [{"name": "Basic", "value": {"Renderable": {
                    "component": "input",
                    "controls": {"placeholder": {"kind": "text"}}
                }}}]
            }"#,
        );
        match parse(&m).unwrap_err() {
            ParseError::UnknownControlKind { export, key, kind, .. } => {
                assert_eq!((export.as_str(), key.as_str(), kind.as_str()), ("Basic", "placeholder", "text"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn select_without_options_is_rejected() {
        let m = module(
            r#"{
                "meta": {"title": "Input"},
                "exports": [{"name": "Basic", "value": {"Renderable": {
                    "component": "input",
                    "controls": {"size": {"kind": "select", "options": []}}
                }}}]
            }"#,
        );
        assert!(matches!(parse(&m), Err(ParseError::MissingOptions { .. })));
    }

    #[test]
    fn mistyped_defaults_are_rejected() {
        for control in [
            r#"{"kind": "number", "default": "16"}"#,
            r#"{"kind": "boolean", "default": 1}"#,
            r#"{"kind": "object", "default": []}"#,
            r#"{"kind": "select", "options": ["a"], "default": "b"}"#,
            r#"{"kind": "number", "default": 3, "min": 5}"#,
            r#"{"kind": "number", "min": 5, "max": 1}"#,
        ] {
            let json = format!(
                r#"{{"meta": {{"title": "T"}}, "exports": [{{"name": "E", "value": {{"Renderable": {{
                    "component": "c", "controls": {{"k": {control}}}
                }}}}}}]}}"#
            );
            let result = parse(&module(&json));
            assert!(
                matches!(result, Err(ParseError::InvalidControl { .. })),
                "{control} should be rejected, got {result:?}"
            );
        }
    }

    #[test]
    fn duplicate_export_and_empty_title_are_rejected() {
        let dup = module(
            r#"{"meta": {"title": "T"}, "exports": [
                {"name": "A", "value": {"Data": 1}},
                {"name": "A", "value": {"Renderable": {"component": "c"}}}
            ]}"#,
        );
        assert!(matches!(parse(&dup), Err(ParseError::DuplicateExport { .. })));

        let untitled = module(r#"{"meta": {"title": "  "}}"#);
        assert!(matches!(parse(&untitled), Err(ParseError::EmptyTitle { .. })));
    }

    #[test]
    fn controls_keep_declaration_order_and_args() {
        let m = module(
            r#"{
                "meta": {"title": "Slider"},
                "exports": [{"name": "Basic", "value": {"Renderable": {
                    "component": "slider",
                    "args": {"step": 1},
                    "controls": {
                        "value": {"kind": "number", "default": 5, "min": 0, "max": 10},
                        "label": {"kind": "string", "label": "Label"},
                        "disabled": {"kind": "boolean", "default": false}
                    }
                }}}]
            }"#,
        );
        let showcase = &parse(&m).unwrap()[0];
        let keys: Vec<&str> = showcase.controls.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["value", "label", "disabled"]);
        assert_eq!(showcase.controls["label"].label.as_deref(), Some("Label"));
        assert_eq!(showcase.controls["value"].max, Some(10.0));
        assert_eq!(showcase.renderable.args["step"], 1);
    }
}
