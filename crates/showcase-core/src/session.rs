//! The session reducer.
//!
//! All selection, theme and control changes go through
//! [`SessionState::reduce`], which returns the next state plus the effects
//! the caller must carry out (persisting, re-rendering). The reducer itself
//! performs no I/O.

use std::sync::Arc;

use tracing::{debug, info};

use crate::controls::{ControlError, ControlInput, ControlOutcome, ControlState, ControlValues};
use crate::persistence::PersistedSelection;
use crate::registry::ShowcaseRegistry;
use crate::showcase::Showcase;
use crate::theme::ThemePreference;

/// The selected showcase and its control state.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSelection {
    pub showcase: Arc<Showcase>,
    pub controls: ControlState,
}

impl ActiveSelection {
    pub fn new(showcase: Arc<Showcase>) -> Self {
        let controls = ControlState::new(&showcase);
        Self { showcase, controls }
    }

    pub fn id(&self) -> &str {
        &self.showcase.id
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A new registry was published after a reload.
    ModuleSetChanged(Arc<ShowcaseRegistry>),
    /// The user picked a showcase.
    Select(String),
    /// The user picked a theme.
    SetTheme(ThemePreference),
    Control { key: String, input: ControlInput },
    ResetControls,
}

/// Work the reducer asks its caller to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    PersistShowcase(String),
    PersistTheme(ThemePreference),
    /// The preview is stale.
    Render,
    ControlRejected(ControlError),
    SelectionRejected { id: String },
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    registry: Arc<ShowcaseRegistry>,
    selection: Option<ActiveSelection>,
    theme: ThemePreference,
}

impl SessionState {
    /// Restore a session from the persisted selection.
    ///
    /// A stale or missing id falls back to the first showcase; the fallback
    /// is not written back.
    pub fn start(registry: Arc<ShowcaseRegistry>, persisted: &PersistedSelection) -> (Self, Vec<Effect>) {
        let selection =
            reconcile_selection(persisted.showcase_id.as_deref(), &registry).map(ActiveSelection::new);
        if let (Some(wanted), Some(active)) = (&persisted.showcase_id, &selection) {
            if wanted != active.id() {
                info!(stale = %wanted, selected = %active.id(), "persisted showcase not found");
            }
        }
        let state = Self {
            registry,
            selection,
            theme: persisted.theme,
        };
        (state, vec![Effect::Render])
    }

    pub fn registry(&self) -> &Arc<ShowcaseRegistry> {
        &self.registry
    }

    pub fn selection(&self) -> Option<&ActiveSelection> {
        self.selection.as_ref()
    }

    pub fn selected(&self) -> Option<&Arc<Showcase>> {
        self.selection.as_ref().map(|s| &s.showcase)
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selection.as_ref().map(ActiveSelection::id)
    }

    pub fn controls(&self) -> Option<&ControlState> {
        self.selection.as_ref().map(|s| &s.controls)
    }

    /// Current control values; empty when nothing is selected.
    pub fn values(&self) -> ControlValues {
        self.controls()
            .map(|c| c.values().clone())
            .unwrap_or_default()
    }

    pub fn theme(&self) -> ThemePreference {
        self.theme
    }

    pub fn reduce(mut self, event: SessionEvent) -> (Self, Vec<Effect>) {
        let mut effects = Vec::new();
        match event {
            SessionEvent::ModuleSetChanged(registry) => {
                let previous = self.selection.take();
                let next = reconcile_selection(previous.as_ref().map(ActiveSelection::id), &registry);
                self.selection = match (previous, next) {
                    (Some(prev), Some(next))
                        if prev.id() == next.id && prev.showcase.controls == next.controls =>
                    {
                        Some(ActiveSelection {
                            showcase: next,
                            controls: prev.controls,
                        })
                    }
                    (_, next) => next.map(ActiveSelection::new),
                };
                self.registry = registry;
                debug!(selected = ?self.selected_id(), "module set changed");
                effects.push(Effect::Render);
            }
            SessionEvent::Select(id) => match self.registry.get(&id).cloned() {
                Some(showcase) => {
                    if self.selected_id() != Some(id.as_str()) {
                        self.selection = Some(ActiveSelection::new(showcase));
                        effects.push(Effect::PersistShowcase(id));
                        effects.push(Effect::Render);
                    }
                }
                None => effects.push(Effect::SelectionRejected { id }),
            },
            SessionEvent::SetTheme(theme) => {
                if theme != self.theme {
                    self.theme = theme;
                    effects.push(Effect::PersistTheme(theme));
                    effects.push(Effect::Render);
                }
            }
            SessionEvent::Control { key, input } => match self.selection.as_mut() {
                Some(active) => match active.controls.apply(&key, &input) {
                    Ok(ControlOutcome::Committed) => effects.push(Effect::Render),
                    Ok(_) => {}
                    Err(e) => effects.push(Effect::ControlRejected(e)),
                },
                None => effects.push(Effect::ControlRejected(ControlError::UnknownKey { key })),
            },
            SessionEvent::ResetControls => {
                if let Some(active) = self.selection.as_mut() {
                    active.controls.reset();
                    effects.push(Effect::Render);
                }
            }
        }
        (self, effects)
    }
}

/// Resolve `previous` against `registry`: the same showcase if it still
/// exists, else the first in group order, else nothing.
pub fn reconcile_selection(previous: Option<&str>, registry: &ShowcaseRegistry) -> Option<Arc<Showcase>> {
    previous
        .and_then(|id| registry.get(id))
        .or_else(|| registry.first())
        .cloned()
}
