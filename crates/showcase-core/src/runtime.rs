//! The composition root: wires a module source, the registry, the session
//! reducer, persistence, theming and the preview together.
//!
//! Change notifications (module reloads, ambient theme changes) may arrive
//! on any thread. They are queued and applied on the owning thread by
//! [`Runtime::pump`].

use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use showcase_data::LoadedConfig;
use tracing::{debug, warn};

use crate::control_view::{ControlField, describe_controls};
use crate::controls::ControlInput;
use crate::discovery::ModuleCollection;
use crate::error::ShowcaseError;
use crate::persistence::{self, KeyValueStore};
use crate::preview::{DeviceFrame, Preview, PreviewLayout, PreviewStatus, ViewCommand, Viewport};
use crate::registry::{RegistryHandle, ShowcaseRegistry};
use crate::renderable::{ComponentLibrary, Renderable};
use crate::session::{Effect, SessionEvent, SessionState};
use crate::source::{FsModuleSource, ModuleSource};
use crate::subscription::SubscriptionId;
use crate::theme::{AmbientThemeSignal, ResolvedTheme, ThemeController, ThemePreference};
use crate::watcher::ModuleWatcher;

enum Notice {
    Modules(Arc<ModuleCollection>),
    Theme(ResolvedTheme),
}

/// A running showcase session.
pub struct Runtime {
    source: Arc<dyn ModuleSource>,
    subscription: SubscriptionId,
    notices: Receiver<Notice>,
    registry: RegistryHandle,
    session: SessionState,
    store: Box<dyn KeyValueStore>,
    theme: ThemeController,
    library: ComponentLibrary,
    preview: Preview,
    watcher: Option<ModuleWatcher>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("session", &self.session)
            .field("theme", &self.theme)
            .field("library", &self.library)
            .field("preview", &self.preview)
            .field("watcher", &self.watcher)
            .finish()
    }
}

impl Runtime {
    /// Build the registry from `source`, restore the persisted selection
    /// and render it.
    pub fn start(
        source: Arc<dyn ModuleSource>,
        library: ComponentLibrary,
        store: Box<dyn KeyValueStore>,
        signal: Arc<dyn AmbientThemeSignal>,
        preview: Preview,
    ) -> Self {
        let (tx, notices) = mpsc::channel();

        let modules_tx: Sender<Notice> = tx.clone();
        let subscription = source.subscribe(Box::new(move |collection: &Arc<ModuleCollection>| {
            let _ = modules_tx.send(Notice::Modules(Arc::clone(collection)));
        }));

        let registry = RegistryHandle::new(ShowcaseRegistry::build(&source.list()));
        let persisted = persistence::read_selection(store.as_ref());
        let (session, effects) = SessionState::start(registry.snapshot(), &persisted);

        let theme = ThemeController::with_hook(
            signal,
            persisted.theme,
            Arc::new(move |theme: ResolvedTheme| {
                let _ = tx.send(Notice::Theme(theme));
            }),
        );

        let mut runtime = Self {
            source,
            subscription,
            notices,
            registry,
            session,
            store,
            theme,
            library,
            preview,
            watcher: None,
        };
        // Startup effects are Render only; nothing to persist.
        if let Err(e) = runtime.run_effects(&effects) {
            warn!(error = %e, "startup effects failed");
        }
        runtime
    }

    /// Start over a filesystem source for `loaded`, optionally watching the
    /// project root for changes.
    pub fn from_config(
        loaded: &LoadedConfig,
        library: ComponentLibrary,
        store: Box<dyn KeyValueStore>,
        signal: Arc<dyn AmbientThemeSignal>,
        watch: bool,
    ) -> Result<Self, ShowcaseError> {
        let source = Arc::new(FsModuleSource::from_config(loaded));
        let watcher = if watch {
            Some(ModuleWatcher::spawn(Arc::clone(&source))?)
        } else {
            None
        };

        let mut preview = Preview::new();
        if let Some(styles) = &loaded.config.global_styles_path {
            preview = preview.with_global_styles(styles);
        }
        if let Some(path) = &loaded.config.global_wrapper_path {
            let wrapper = wrapper_component_name(path).and_then(|name| library.get(name));
            if wrapper.is_none() {
                warn!(
                    path = %path.display(),
                    "global wrapper does not name a registered component; rendering unwrapped"
                );
            }
            preview.set_wrapper(wrapper);
        }

        let mut runtime = Self::start(source, library, store, signal, preview);
        runtime.watcher = watcher;
        Ok(runtime)
    }

    // -- event handling -----------------------------------------------------

    /// Feed an event through the session reducer and carry out its effects.
    pub fn dispatch(&mut self, event: SessionEvent) -> Result<Vec<Effect>, ShowcaseError> {
        let (session, effects) = std::mem::take(&mut self.session).reduce(event);
        self.session = session;
        self.theme.set_preference(self.session.theme());
        self.run_effects(&effects)?;
        Ok(effects)
    }

    pub fn select(&mut self, id: &str) -> Result<(), ShowcaseError> {
        let effects = self.dispatch(SessionEvent::Select(id.to_string()))?;
        if effects.iter().any(|e| matches!(e, Effect::SelectionRejected { .. })) {
            return Err(ShowcaseError::ShowcaseNotFound { id: id.to_string() });
        }
        Ok(())
    }

    pub fn set_theme(&mut self, theme: ThemePreference) -> Result<(), ShowcaseError> {
        self.dispatch(SessionEvent::SetTheme(theme)).map(drop)
    }

    pub fn set_control(&mut self, key: &str, input: ControlInput) -> Result<(), ShowcaseError> {
        if self.session.selection().is_none() {
            return Err(ShowcaseError::NoSelection);
        }
        let effects = self.dispatch(SessionEvent::Control {
            key: key.to_string(),
            input,
        })?;
        match effects.into_iter().find_map(|e| match e {
            Effect::ControlRejected(err) => Some(err),
            _ => None,
        }) {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    pub fn reset_controls(&mut self) -> Result<(), ShowcaseError> {
        self.dispatch(SessionEvent::ResetControls).map(drop)
    }

    /// Apply queued notifications. Several queued reloads collapse into the
    /// most recent one. Returns the number of notifications drained.
    pub fn pump(&mut self) -> Result<usize, ShowcaseError> {
        let mut latest = None;
        let mut theme_changed = false;
        let mut drained = 0;
        while let Ok(notice) = self.notices.try_recv() {
            drained += 1;
            match notice {
                Notice::Modules(collection) => latest = Some(collection),
                Notice::Theme(_) => theme_changed = true,
            }
        }

        if let Some(collection) = latest {
            self.apply_collection(&collection)?;
        } else if theme_changed {
            self.render();
        }
        Ok(drained)
    }

    /// Rebuild the registry from the source's current list right away.
    pub fn reload_now(&mut self) -> Result<(), ShowcaseError> {
        let collection = self.source.list();
        self.apply_collection(&collection)
    }

    fn apply_collection(&mut self, collection: &ModuleCollection) -> Result<(), ShowcaseError> {
        let registry = self.registry.publish(ShowcaseRegistry::build(collection));
        debug!(showcases = registry.len(), "registry reloaded");
        self.dispatch(SessionEvent::ModuleSetChanged(registry)).map(drop)
    }

    fn run_effects(&mut self, effects: &[Effect]) -> Result<(), ShowcaseError> {
        for effect in effects {
            match effect {
                Effect::PersistShowcase(id) => {
                    persistence::write_selection_id(self.store.as_ref(), id)?;
                }
                Effect::PersistTheme(theme) => {
                    persistence::write_theme(self.store.as_ref(), *theme)?;
                }
                Effect::Render => self.render(),
                Effect::ControlRejected(e) => debug!(error = %e, "control update rejected"),
                Effect::SelectionRejected { id } => debug!(%id, "selection rejected"),
            }
        }
        Ok(())
    }

    fn render(&mut self) {
        match self.session.selected() {
            Some(showcase) => {
                let values = self.session.values();
                self.preview
                    .render(&self.library, showcase, &values, self.theme.resolved());
            }
            None => self.preview.clear(),
        }
    }

    // -- preview ------------------------------------------------------------

    /// Clear the failure and render the same showcase again.
    pub fn retry(&mut self) -> &PreviewStatus {
        let values = self.session.values();
        self.preview
            .retry(&self.library, &values, self.theme.resolved())
    }

    /// Replace the global wrapper and render again.
    pub fn set_wrapper(&mut self, wrapper: Option<Arc<dyn Renderable>>) {
        self.preview.set_wrapper(wrapper);
        self.render();
    }

    pub fn dismiss_failure(&mut self) {
        self.preview.dismiss();
    }

    pub fn view(&mut self, command: ViewCommand) {
        self.preview.apply(command);
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.preview.set_viewport(viewport);
    }

    pub fn set_device_frame(&mut self, frame: Option<DeviceFrame>) {
        self.preview.set_device_frame(frame);
    }

    pub fn layout(&self) -> PreviewLayout {
        self.preview.layout()
    }

    // -- accessors ----------------------------------------------------------

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn registry(&self) -> Arc<ShowcaseRegistry> {
        self.registry.snapshot()
    }

    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    pub fn theme(&self) -> &ThemeController {
        &self.theme
    }

    pub fn library(&self) -> &ComponentLibrary {
        &self.library
    }

    /// The controls panel for the current selection.
    pub fn control_fields(&self) -> Vec<ControlField> {
        self.session
            .controls()
            .map(describe_controls)
            .unwrap_or_default()
    }
}

/// The component a wrapper path names: its file name up to the first `.`,
/// so `src/AppShell.wrapper.ron` names `AppShell`.
pub fn wrapper_component_name(path: &Path) -> Option<&str> {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.split('.').next())
        .filter(|name| !name.is_empty())
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.source.unsubscribe(self.subscription);
    }
}
