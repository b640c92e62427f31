//! The module-source capability: where the current module list comes from
//! and how consumers hear that it changed.
//!
//! Sources are owned by the composition root and passed down; consumers
//! never reach for global state to find the module list.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use showcase_data::config::{self, LoadedConfig};
use tracing::info;

use crate::discovery::{Discovery, ModuleCollection};
use crate::error::ShowcaseError;
use crate::module::DemonstrationModule;
use crate::subscription::{Listener, ListenerSet, SubscriptionId};

/// Listener invoked with the newly published collection.
pub type ModuleListener = Listener<Arc<ModuleCollection>>;

/// Supplies the current module collection and change notifications.
pub trait ModuleSource: Send + Sync {
    /// The most recently published collection.
    fn list(&self) -> Arc<ModuleCollection>;

    /// Be told about every future publication.
    fn subscribe(&self, listener: ModuleListener) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// Current collection plus its listeners; publication swaps the collection
/// in one step and then notifies.
#[derive(Debug, Default)]
struct Published {
    current: RwLock<Arc<ModuleCollection>>,
    listeners: ListenerSet<Arc<ModuleCollection>>,
}

impl Published {
    fn new(initial: ModuleCollection) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
            listeners: ListenerSet::new(),
        }
    }

    fn current(&self) -> Arc<ModuleCollection> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn publish(&self, collection: ModuleCollection) -> Arc<ModuleCollection> {
        let collection = Arc::new(collection);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&collection);
        self.listeners.notify(&collection);
        collection
    }
}

// ---------------------------------------------------------------------------
// Filesystem source
// ---------------------------------------------------------------------------

/// A glob-backed source. [`FsModuleSource::rescan`] recomputes the match set
/// from scratch and publishes a fresh collection.
#[derive(Debug)]
pub struct FsModuleSource {
    discovery: Discovery,
    published: Published,
}

impl FsModuleSource {
    /// Create the source and perform the initial scan.
    pub fn new(discovery: Discovery) -> Self {
        let initial = ModuleCollection::from_scan(discovery.scan());
        info!(modules = initial.len(), "discovered demonstration modules");
        Self {
            discovery,
            published: Published::new(initial),
        }
    }

    pub fn from_config(loaded: &LoadedConfig) -> Self {
        Self::new(Discovery::from_config(loaded))
    }

    /// Load the configuration for `working_dir` and scan it.
    pub fn open(working_dir: &Path) -> Result<(LoadedConfig, Self), ShowcaseError> {
        let loaded = config::load(working_dir)?;
        let source = Self::from_config(&loaded);
        Ok((loaded, source))
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    /// Re-run discovery and publish the result to subscribers.
    pub fn rescan(&self) -> Arc<ModuleCollection> {
        let collection = ModuleCollection::from_scan(self.discovery.scan());
        info!(modules = collection.len(), "module set changed");
        self.published.publish(collection)
    }
}

impl ModuleSource for FsModuleSource {
    fn list(&self) -> Arc<ModuleCollection> {
        self.published.current()
    }

    fn subscribe(&self, listener: ModuleListener) -> SubscriptionId {
        self.published.listeners.add(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.published.listeners.remove(id)
    }
}

// ---------------------------------------------------------------------------
// In-memory source
// ---------------------------------------------------------------------------

/// A source over already materialized modules, for embedding and tests.
#[derive(Debug, Default)]
pub struct StaticModuleSource {
    published: Published,
}

impl StaticModuleSource {
    pub fn new(modules: impl IntoIterator<Item = DemonstrationModule>) -> Self {
        Self {
            published: Published::new(ModuleCollection::from_modules(modules)),
        }
    }

    /// Replace the whole module set and notify subscribers.
    pub fn replace(&self, modules: impl IntoIterator<Item = DemonstrationModule>) {
        self.published
            .publish(ModuleCollection::from_modules(modules));
    }
}

impl ModuleSource for StaticModuleSource {
    fn list(&self) -> Arc<ModuleCollection> {
        self.published.current()
    }

    fn subscribe(&self, listener: ModuleListener) -> SubscriptionId {
        self.published.listeners.add(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.published.listeners.remove(id)
    }
}
