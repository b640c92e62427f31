//! The aggregated, grouped collection of every known showcase.
//!
//! A registry is built in one pass from a module collection and is immutable
//! afterwards. Hot reload builds a new registry and swaps it into a
//! [`RegistryHandle`]; readers hold an `Arc` snapshot and never observe a
//! partially built registry.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::discovery::{DiscoveryError, ModuleCollection};
use crate::module::ModuleLoadError;
use crate::parser::{self, ParseError};
use crate::showcase::Showcase;

/// A module-level problem recorded while building a registry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Diagnostic {
    #[error(transparent)]
    LoadFailed(ModuleLoadError),

    #[error(transparent)]
    ParseFailed(ParseError),

    #[error("duplicate showcase id '{id}': kept {kept}, dropped {dropped}")]
    DuplicateId {
        id: String,
        kept: PathBuf,
        dropped: PathBuf,
    },

    #[error(transparent)]
    NoMatches(DiscoveryError),
}

/// Every parsed showcase, indexed by id and grouped by component name.
#[derive(Debug, Default)]
pub struct ShowcaseRegistry {
    showcases: Vec<Arc<Showcase>>,
    by_id: HashMap<String, usize>,
    groups: IndexMap<String, Vec<usize>>,
    diagnostics: Vec<Diagnostic>,
}

impl ShowcaseRegistry {
    /// Load and parse every module of `collection`.
    ///
    /// Modules that fail to load or parse are left out and recorded as
    /// diagnostics; they never prevent the rest from being browsed.
    pub fn build(collection: &ModuleCollection) -> Self {
        let mut diagnostics: Vec<Diagnostic> = collection
            .problems()
            .iter()
            .cloned()
            .map(Diagnostic::NoMatches)
            .collect();
        let mut parsed = Vec::new();

        for result in collection.load_all() {
            let module = match result {
                Ok(module) => module,
                Err(e) => {
                    warn!(error = %e, "skipping module");
                    diagnostics.push(Diagnostic::LoadFailed(e));
                    continue;
                }
            };
            match parser::parse(&module) {
                Ok(showcases) => parsed.extend(showcases),
                Err(e) => {
                    warn!(error = %e, "skipping module");
                    diagnostics.push(Diagnostic::ParseFailed(e));
                }
            }
        }

        let mut registry = Self::from_showcases(parsed);
        diagnostics.append(&mut registry.diagnostics);
        registry.diagnostics = diagnostics;
        debug!(
            showcases = registry.len(),
            groups = registry.groups.len(),
            diagnostics = registry.diagnostics.len(),
            "registry built"
        );
        registry
    }

    /// Aggregate already parsed showcases. Later duplicates of an id are
    /// dropped with a diagnostic.
    pub fn from_showcases(showcases: impl IntoIterator<Item = Showcase>) -> Self {
        let mut registry = Self::default();
        for showcase in showcases {
            if let Some(&existing) = registry.by_id.get(&showcase.id) {
                let kept = registry.showcases[existing].source.clone();
                warn!(id = %showcase.id, "dropping duplicate showcase");
                registry.diagnostics.push(Diagnostic::DuplicateId {
                    id: showcase.id.clone(),
                    kept,
                    dropped: showcase.source.clone(),
                });
                continue;
            }
            let index = registry.showcases.len();
            registry.by_id.insert(showcase.id.clone(), index);
            registry
                .groups
                .entry(showcase.group().to_string())
                .or_default()
                .push(index);
            registry.showcases.push(Arc::new(showcase));
        }
        registry
    }

    /// Every showcase, in parse order.
    pub fn all(&self) -> &[Arc<Showcase>] {
        &self.showcases
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Showcase>> {
        self.by_id.get(id).map(|&i| &self.showcases[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// The first showcase in group order.
    pub fn first(&self) -> Option<&Arc<Showcase>> {
        self.groups
            .values()
            .next()
            .and_then(|indices| indices.first())
            .map(|&i| &self.showcases[i])
    }

    /// Groups in first-seen order, each with its showcases in parse order.
    pub fn groups(&self) -> impl Iterator<Item = (&str, Vec<&Arc<Showcase>>)> {
        self.groups.iter().map(|(name, indices)| {
            (
                name.as_str(),
                indices.iter().map(|&i| &self.showcases[i]).collect(),
            )
        })
    }

    pub fn group(&self, name: &str) -> Option<Vec<&Arc<Showcase>>> {
        self.groups
            .get(name)
            .map(|indices| indices.iter().map(|&i| &self.showcases[i]).collect())
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Showcases whose title contains `query`, ignoring case, in group order.
    pub fn filter(&self, query: &str) -> Vec<&Arc<Showcase>> {
        let needle = query.to_lowercase();
        self.groups
            .values()
            .flatten()
            .map(|&i| &self.showcases[i])
            .filter(|s| s.title.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.showcases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.showcases.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Shared slot holding the current registry.
#[derive(Debug, Default)]
pub struct RegistryHandle {
    current: RwLock<Arc<ShowcaseRegistry>>,
}

impl RegistryHandle {
    pub fn new(registry: ShowcaseRegistry) -> Self {
        Self {
            current: RwLock::new(Arc::new(registry)),
        }
    }

    /// The registry as of now.
    pub fn snapshot(&self) -> Arc<ShowcaseRegistry> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the registry in one step and return the new snapshot.
    pub fn publish(&self, registry: ShowcaseRegistry) -> Arc<ShowcaseRegistry> {
        let registry = Arc::new(registry);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&registry);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::DemonstrationModule;
    use crate::showcase::RenderableRef;

    fn showcase(title: &str, name: &str) -> Showcase {
        Showcase::new(title, name, RenderableRef::new("c"))
    }

    #[test]
    fn groups_by_title_prefix_in_first_seen_order() {
        let registry = ShowcaseRegistry::from_showcases(vec![
            showcase("Button", "Primary"),
            showcase("Card", "Basic"),
            showcase("Button", "Secondary"),
        ]);

        let groups: Vec<(&str, usize)> = registry.groups().map(|(n, s)| (n, s.len())).collect();
        assert_eq!(groups, vec![("Button", 2), ("Card", 1)]);

        let names: Vec<&str> = registry
            .group("Button")
            .unwrap()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["Primary", "Secondary"]);
        assert_eq!(registry.group_names().collect::<Vec<_>>(), vec!["Button", "Card"]);
        assert!(registry.group("Dialog").is_none());
    }

    #[test]
    fn first_follows_group_order() {
        let registry = ShowcaseRegistry::from_showcases(vec![
            showcase("Button", "Primary"),
            showcase("Card", "Basic"),
            showcase("Button", "Secondary"),
        ]);
        assert_eq!(registry.first().unwrap().id, "Button-Primary");
        assert!(ShowcaseRegistry::default().first().is_none());
    }

    #[test]
    fn lookup_and_filter() {
        let registry = ShowcaseRegistry::from_showcases(vec![
            showcase("Button", "Primary"),
            showcase("Card", "Basic"),
        ]);
        assert_eq!(registry.get("Card-Basic").unwrap().title, "Card / Basic");
        assert!(registry.get("Card-Missing").is_none());
        assert!(registry.contains("Button-Primary"));

        let hits: Vec<&str> = registry.filter("bUtToN").iter().map(|s| s.id.as_str()).collect();
        assert_eq!(hits, vec!["Button-Primary"]);
        assert_eq!(registry.filter("").len(), 2);
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let mut first = showcase("Button", "Primary");
        first.source = PathBuf::from("a.ron");
        let mut second = showcase("Button", "Primary");
        second.source = PathBuf::from("b.ron");

        let registry = ShowcaseRegistry::from_showcases(vec![first, second]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("Button-Primary").unwrap().source, PathBuf::from("a.ron"));
        assert_eq!(
            registry.diagnostics(),
            &[Diagnostic::DuplicateId {
                id: "Button-Primary".into(),
                kept: "a.ron".into(),
                dropped: "b.ron".into(),
            }]
        );
    }

    #[test]
    fn build_isolates_broken_modules() {
        let good = serde_json::from_str(
            r#"{"meta": {"title": "Button"}, "exports": [
                {"name": "Primary", "value": {"Renderable": {"component": "button"}}}
            ]}"#,
        )
        .unwrap();
        let bad = serde_json::from_str(
            r#"{"meta": {"title": "Input"}, "exports": [
                {"name": "Basic", "value": {"Renderable": {
                    "component": "input", "controls": {"v": {"kind": "text"}}
                }}}
            ]}"#,
        )
        .unwrap();
        let collection = ModuleCollection::from_modules(vec![
            DemonstrationModule::from_data("input.json", bad),
            DemonstrationModule::from_data("button.json", good),
        ]);

        let registry = ShowcaseRegistry::build(&collection);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("Button-Primary"));
        assert!(matches!(
            registry.diagnostics(),
            [Diagnostic::ParseFailed(ParseError::UnknownControlKind { .. })]
        ));
    }

    #[test]
    fn handle_swaps_whole_registries() {
        let handle = RegistryHandle::new(ShowcaseRegistry::from_showcases(vec![showcase("A", "x")]));
        let old = handle.snapshot();
        let new = handle.publish(ShowcaseRegistry::from_showcases(vec![
            showcase("B", "y"),
            showcase("B", "z"),
        ]));

        assert_eq!(old.len(), 1);
        assert!(old.contains("A-x"));
        assert_eq!(new.len(), 2);
        assert!(Arc::ptr_eq(&new, &handle.snapshot()));
    }
}
