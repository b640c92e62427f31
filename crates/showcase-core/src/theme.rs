//! Theme preference and resolution.
//!
//! `light` and `dark` are applied as-is. `system` follows the host's ambient
//! preference signal for as long as it stays selected.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::subscription::{Listener, ListenerSet, SubscriptionId};

/// The persisted theme choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    Light,
    Dark,
    #[default]
    System,
}

impl ThemePreference {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemePreference::Light => "light",
            ThemePreference::Dark => "dark",
            ThemePreference::System => "system",
        }
    }
}

impl fmt::Display for ThemePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A theme name outside `light`, `dark`, `system`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown theme `{0}` (expected light, dark, or system)")]
pub struct UnknownTheme(pub String);

impl FromStr for ThemePreference {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(ThemePreference::Light),
            "dark" => Ok(ThemePreference::Dark),
            "system" => Ok(ThemePreference::System),
            other => Err(UnknownTheme(other.to_string())),
        }
    }
}

/// The theme actually applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedTheme {
    #[default]
    Light,
    Dark,
}

impl ResolvedTheme {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolvedTheme::Light => "light",
            ResolvedTheme::Dark => "dark",
        }
    }
}

// ---------------------------------------------------------------------------
// Ambient signal
// ---------------------------------------------------------------------------

/// The host's light/dark preference and its change events.
pub trait AmbientThemeSignal: Send + Sync {
    fn current(&self) -> ResolvedTheme;

    fn subscribe(&self, listener: Listener<ResolvedTheme>) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// An in-process signal whose value is set explicitly.
#[derive(Debug, Default)]
pub struct ManualThemeSignal {
    current: RwLock<ResolvedTheme>,
    listeners: ListenerSet<ResolvedTheme>,
}

impl ManualThemeSignal {
    pub fn new(initial: ResolvedTheme) -> Self {
        Self {
            current: RwLock::new(initial),
            listeners: ListenerSet::new(),
        }
    }

    /// Change the ambient theme; listeners hear only actual changes.
    pub fn set(&self, theme: ResolvedTheme) {
        {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            if *current == theme {
                return;
            }
            *current = theme;
        }
        self.listeners.notify(&theme);
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }
}

impl AmbientThemeSignal for ManualThemeSignal {
    fn current(&self) -> ResolvedTheme {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribe(&self, listener: Listener<ResolvedTheme>) -> SubscriptionId {
        self.listeners.add(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.remove(id)
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Called with the resolved theme every time it is (re)applied.
pub type ThemeHook = Arc<dyn Fn(ResolvedTheme) + Send + Sync>;

/// Applies a [`ThemePreference`], holding an ambient subscription only while
/// the preference is `system`.
pub struct ThemeController {
    signal: Arc<dyn AmbientThemeSignal>,
    preference: ThemePreference,
    resolved: Arc<RwLock<ResolvedTheme>>,
    subscription: Option<SubscriptionId>,
    hook: Option<ThemeHook>,
}

impl fmt::Debug for ThemeController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThemeController")
            .field("preference", &self.preference)
            .field("resolved", &self.resolved())
            .field("subscription", &self.subscription)
            .finish()
    }
}

impl ThemeController {
    pub fn new(signal: Arc<dyn AmbientThemeSignal>, preference: ThemePreference) -> Self {
        Self::build(signal, preference, None)
    }

    /// Like [`ThemeController::new`], calling `hook` on every application.
    pub fn with_hook(
        signal: Arc<dyn AmbientThemeSignal>,
        preference: ThemePreference,
        hook: ThemeHook,
    ) -> Self {
        Self::build(signal, preference, Some(hook))
    }

    fn build(
        signal: Arc<dyn AmbientThemeSignal>,
        preference: ThemePreference,
        hook: Option<ThemeHook>,
    ) -> Self {
        let mut controller = Self {
            signal,
            preference,
            resolved: Arc::new(RwLock::new(ResolvedTheme::default())),
            subscription: None,
            hook,
        };
        controller.apply(preference);
        controller
    }

    pub fn preference(&self) -> ThemePreference {
        self.preference
    }

    pub fn resolved(&self) -> ResolvedTheme {
        *self.resolved.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether an ambient subscription is currently held.
    pub fn is_following_system(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn set_preference(&mut self, preference: ThemePreference) {
        if preference != self.preference {
            self.apply(preference);
        }
    }

    fn apply(&mut self, preference: ThemePreference) {
        self.preference = preference;
        let theme = match preference {
            ThemePreference::Light => {
                self.release();
                ResolvedTheme::Light
            }
            ThemePreference::Dark => {
                self.release();
                ResolvedTheme::Dark
            }
            ThemePreference::System => {
                if self.subscription.is_none() {
                    let resolved = Arc::clone(&self.resolved);
                    let hook = self.hook.clone();
                    let id = self.signal.subscribe(Box::new(move |theme: &ResolvedTheme| {
                        *resolved.write().unwrap_or_else(PoisonError::into_inner) = *theme;
                        if let Some(hook) = &hook {
                            hook(*theme);
                        }
                    }));
                    debug!(?id, "following ambient theme");
                    self.subscription = Some(id);
                }
                self.signal.current()
            }
        };
        *self.resolved.write().unwrap_or_else(PoisonError::into_inner) = theme;
        if let Some(hook) = &self.hook {
            hook(theme);
        }
    }

    fn release(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.signal.unsubscribe(id);
            debug!(?id, "stopped following ambient theme");
        }
    }
}

impl Drop for ThemeController {
    fn drop(&mut self) {
        self.release();
    }
}
