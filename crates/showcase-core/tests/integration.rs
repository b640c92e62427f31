//! End-to-end tests over the sample `showcases/` directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;
use showcase_core::persistence::{SHOWCASE_ID_KEY, THEME_KEY};
use showcase_core::{
    ComponentLibrary, ControlInput, ControlWidget, Diagnostic, FsModuleSource, KeyValueStore,
    ManualThemeSignal, MemoryStore, ParseError, Preview, PreviewStatus, Props, RenderError,
    RenderedOutput, ResolvedTheme, Runtime, ShowcaseRegistry, ThemePreference, ViewCommand,
    Viewport, init_control_values,
};
use showcase_data::config;

fn samples_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../showcases")
}

fn copy_dir(from: &Path, to: &Path) {
    fs::create_dir_all(to).unwrap();
    for entry in fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_dir(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), target).unwrap();
        }
    }
}

/// A project directory holding a copy of the samples and a config.
fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    copy_dir(&samples_dir(), &dir.path().join("showcases"));
    fs::write(
        dir.path().join("showcase.config.toml"),
        "discoveryPatterns = [\"./showcases/**/*.showcase.*\"]\nglobalStylesPath = \"styles/app.css\"\n",
    )
    .unwrap();
    dir
}

fn library() -> ComponentLibrary {
    let echo = |name: &'static str| {
        move |props: &Props| -> Result<RenderedOutput, RenderError> {
            Ok(RenderedOutput::new(format!(
                "<{name} {}/>",
                serde_json::to_string(props).unwrap_or_default()
            )))
        }
    };
    ComponentLibrary::new()
        .with("button", echo("button"))
        .with("card", echo("card"))
        .with("badge", echo("badge"))
        .with("input", |_: &Props| -> Result<RenderedOutput, RenderError> {
            panic!("input exploded")
        })
}

fn registry_for(dir: &Path) -> ShowcaseRegistry {
    let loaded = config::load(dir).unwrap();
    let source = FsModuleSource::from_config(&loaded);
    ShowcaseRegistry::build(&showcase_core::ModuleSource::list(&source))
}

fn start_runtime(dir: &Path, store: MemoryStore) -> Runtime {
    let loaded = config::load(dir).unwrap();
    Runtime::from_config(
        &loaded,
        library(),
        Box::new(store),
        Arc::new(ManualThemeSignal::new(ResolvedTheme::Light)),
        false,
    )
    .unwrap()
}

#[test]
fn samples_parse_into_grouped_showcases() {
    let dir = project();
    let registry = registry_for(dir.path());

    assert!(registry.diagnostics().is_empty(), "{:?}", registry.diagnostics());
    assert_eq!(registry.len(), 5);

    let button = registry.group("Button").unwrap();
    let ids: Vec<&str> = button.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["Button-Primary", "Button-Secondary"]);
    assert_eq!(button[1].title, "Button / Secondary");
    assert_eq!(button[1].controls["variant"].options, vec!["a", "b"]);
    assert_eq!(button[1].controls["variant"].default, Some(json!("a")));
    assert!(button[0].controls.is_empty());

    assert_eq!(registry.group("Card").unwrap().len(), 1);
    assert_eq!(registry.group("Badge").unwrap()[0].id, "Badge-Default");
    assert_eq!(registry.group("Forms").unwrap()[0].title, "Forms / Input / Basic");
    assert!(registry.get("Button-VARIANTS").is_none());
}

#[test]
fn control_values_seed_from_defaults() {
    let dir = project();
    let registry = registry_for(dir.path());
    let card = registry.get("Card-Basic").unwrap();
    let values = init_control_values(card);
    assert_eq!(values.get("title"), Some(&json!("Hello")));
    assert_eq!(values.get("style"), Some(&json!({"padding": 8})));
    assert_eq!(values.get("tags"), Some(&json!([])));
}

#[test]
fn broken_module_does_not_hide_the_rest() {
    let dir = project();
    fs::write(
        dir.path().join("showcases/broken.showcase.json"),
        r#"{"meta": {"title": "Broken"}, "exports": [
            {"name": "X", "value": {"Renderable": {"component": "x", "controls": {"c": {"kind": "text"}}}}}
        ]}"#,
    )
    .unwrap();
    fs::write(dir.path().join("showcases/garbage.showcase.ron"), "(((").unwrap();

    let registry = registry_for(dir.path());
    assert_eq!(registry.len(), 5);
    assert!(registry.diagnostics().iter().any(|d| matches!(
        d,
        Diagnostic::ParseFailed(ParseError::UnknownControlKind { kind, .. }) if kind == "text"
    )));
    assert!(registry
        .diagnostics()
        .iter()
        .any(|d| matches!(d, Diagnostic::LoadFailed(_))));
}

#[test]
fn stale_persisted_selection_falls_back_to_first_in_group_order() {
    let dir = project();
    let store = MemoryStore::new();
    store.set(SHOWCASE_ID_KEY, "Gone-Away").unwrap();
    let runtime = start_runtime(dir.path(), store);

    let expected = runtime.registry().first().unwrap().id.clone();
    assert_eq!(runtime.session().selected_id(), Some(expected.as_str()));
}

#[test]
fn selection_and_theme_are_written_through() {
    let dir = project();
    let mut runtime = start_runtime(dir.path(), MemoryStore::new());

    runtime.select("Card-Basic").unwrap();
    runtime.set_theme(ThemePreference::Dark).unwrap();
    assert_eq!(runtime.theme().resolved(), ResolvedTheme::Dark);
    assert!(!runtime.theme().is_following_system());

    match runtime.preview().status() {
        PreviewStatus::Rendered(r) => {
            assert_eq!(r.showcase_id, "Card-Basic");
            assert!(r.global_styles.as_ref().unwrap().ends_with("styles/app.css"));
        }
        other => panic!("unexpected {other:?}"),
    }

    let store = MemoryStore::new();
    store.set(SHOWCASE_ID_KEY, "Card-Basic").unwrap();
    store.set(THEME_KEY, "dark").unwrap();
    let restored = start_runtime(dir.path(), store);
    assert_eq!(restored.session().selected_id(), Some("Card-Basic"));
    assert_eq!(restored.session().theme(), ThemePreference::Dark);
}

#[test]
fn structured_controls_keep_last_valid_value() {
    let dir = project();
    let mut runtime = start_runtime(dir.path(), MemoryStore::new());
    runtime.select("Card-Basic").unwrap();

    runtime
        .set_control("style", ControlInput::Structured("{\"padding\": ".into()))
        .unwrap();
    let style = runtime
        .control_fields()
        .into_iter()
        .find(|f| f.key == "style")
        .unwrap();
    match style.widget {
        ControlWidget::StructuredEditor { text, error } => {
            assert_eq!(text, "{\"padding\": ");
            assert!(error.is_some());
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(runtime.session().values().get("style"), Some(&json!({"padding": 8})));

    runtime.set_control("style", ControlInput::Blur).unwrap();
    assert_eq!(runtime.session().controls().unwrap().draft_error("style"), None);

    runtime
        .set_control("style", ControlInput::Structured("{\"padding\": 24}".into()))
        .unwrap();
    assert_eq!(runtime.session().values().get("style"), Some(&json!({"padding": 24})));
    match runtime.preview().status() {
        PreviewStatus::Rendered(r) => assert!(r.output.markup.contains("\"padding\":24")),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn failing_showcase_is_recoverable_and_retryable() {
    let dir = project();
    let mut runtime = start_runtime(dir.path(), MemoryStore::new());

    runtime.select("Forms / Input-Basic").unwrap();
    let failure = runtime.preview().visible_failure().unwrap().clone();
    assert_eq!(failure.message, "input exploded");
    assert_eq!(failure.attempt, 1);

    runtime.dismiss_failure();
    assert!(runtime.preview().visible_failure().is_none());

    runtime.retry();
    assert_eq!(runtime.preview().visible_failure().unwrap().attempt, 2);

    runtime.select("Button-Primary").unwrap();
    assert!(matches!(runtime.preview().status(), PreviewStatus::Rendered(_)));
}

#[test]
fn rescan_after_deleting_the_selection_reconciles() {
    let dir = project();
    let loaded = config::load(dir.path()).unwrap();
    let source = Arc::new(FsModuleSource::from_config(&loaded));
    let mut runtime = Runtime::start(
        source.clone(),
        library(),
        Box::new(MemoryStore::new()),
        Arc::new(ManualThemeSignal::default()),
        Preview::new(),
    );
    runtime.select("Card-Basic").unwrap();

    fs::remove_file(dir.path().join("showcases/card.showcase.ron")).unwrap();
    source.rescan();
    runtime.pump().unwrap();

    assert!(runtime.registry().get("Card-Basic").is_none());
    let first = runtime.registry().first().unwrap().id.clone();
    assert_eq!(runtime.session().selected_id(), Some(first.as_str()));
}

#[test]
fn view_state_is_local_to_the_preview() {
    let dir = project();
    let mut runtime = start_runtime(dir.path(), MemoryStore::new());
    runtime.set_viewport(Viewport::Tablet);
    runtime.view(ViewCommand::Zoom(10.0));
    runtime.select("Button-Secondary").unwrap();

    let layout = runtime.layout();
    assert_eq!(layout.surface_width, Some(768));
    assert_eq!(layout.view.zoom, 2.0);
}

#[test]
fn missing_config_is_generated_from_layout() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src/components")).unwrap();
    fs::write(
        dir.path().join("src/components/button.showcase.ron"),
        fs::read_to_string(samples_dir().join("button.showcase.ron")).unwrap(),
    )
    .unwrap();

    let loaded = config::load(dir.path()).unwrap();
    assert!(loaded.generated);
    assert!(dir.path().join("showcase.config.toml").is_file());

    let registry = registry_for(dir.path());
    assert_eq!(registry.len(), 2);
}

fn runtime_with_wrapper(dir: &Path, wrapper_path: &str) -> Runtime {
    fs::write(
        dir.join("showcase.config.toml"),
        format!(
            "discoveryPatterns = [\"./showcases/**/*.showcase.*\"]\nglobalWrapperPath = \"{wrapper_path}\"\n"
        ),
    )
    .unwrap();
    let loaded = config::load(dir).unwrap();
    let library = library().with("Shell", |props: &Props| -> Result<RenderedOutput, RenderError> {
        Ok(RenderedOutput::new(format!(
            "<shell theme=\"{}\">{}</shell>",
            props["theme"].as_str().unwrap_or_default(),
            props["children"].as_str().unwrap_or_default()
        )))
    });
    Runtime::from_config(
        &loaded,
        library,
        Box::new(MemoryStore::new()),
        Arc::new(ManualThemeSignal::new(ResolvedTheme::Dark)),
        false,
    )
    .unwrap()
}

#[test]
fn configured_wrapper_wraps_every_render() {
    let dir = project();
    let mut runtime = runtime_with_wrapper(dir.path(), "src/Shell.tsx");
    assert!(runtime.preview().has_wrapper());

    runtime.select("Button-Primary").unwrap();
    match runtime.preview().status() {
        PreviewStatus::Rendered(r) => {
            assert!(r.output.markup.starts_with("<shell theme=\"dark\"><button "));
            assert!(r.output.markup.ends_with("</shell>"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn unresolved_wrapper_renders_unwrapped() {
    let dir = project();
    let mut runtime = runtime_with_wrapper(dir.path(), "src/Missing.tsx");
    assert!(!runtime.preview().has_wrapper());

    runtime.select("Button-Primary").unwrap();
    match runtime.preview().status() {
        PreviewStatus::Rendered(r) => assert!(r.output.markup.starts_with("<button ")),
        other => panic!("unexpected {other:?}"),
    }
}
