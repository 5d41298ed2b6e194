//! Helper registry: lazy, plugin-aware loading of view helpers

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use crate::core::config::Config;
use crate::core::event::{EventBus, ListenerId};
use crate::core::helper::Helper;
use crate::core::locator::{plugin_split, ClassLocator, ClassName};
use crate::core::view::View;
use crate::error::{Result, ViewError};
use crate::runtime::object_registry::{normalize, LoadError, ObjectFactory, ObjectRegistry, Target};

pub const HELPER_NAMESPACE: &str = "View/Helper";
pub const HELPER_SUFFIX: &str = "Helper";

/// Helper-specific resolution, construction and event wiring.
pub struct HelperFactory {
    view: View,
    locator: Arc<ClassLocator>,
    event_bus: Arc<EventBus>,
    subscriptions: HashMap<String, ListenerId>,
}

impl HelperFactory {
    pub fn new(view: View, locator: Arc<ClassLocator>, event_bus: Arc<EventBus>) -> Self {
        Self {
            view,
            locator,
            event_bus,
            subscriptions: HashMap::new(),
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn is_subscribed(&self, alias: &str) -> bool {
        self.subscriptions.contains_key(alias)
    }

    fn subscribe(&mut self, alias: &str, helper: &Arc<dyn Helper>) {
        let id = self.event_bus.register(Arc::clone(helper));
        if let Some(previous) = self.subscriptions.insert(alias.to_string(), id) {
            self.event_bus.unregister(previous);
        }
        debug!(alias, events = ?helper.implemented_events(), "helper attached to event bus");
    }
}

impl ObjectFactory for HelperFactory {
    type Object = dyn Helper;
    type Class = ClassName;
    type Error = ViewError;

    fn resolve_class_name(&self, name: &str) -> Option<ClassName> {
        self.locator.resolve(name, HELPER_NAMESPACE, HELPER_SUFFIX)
    }

    fn create(&mut self, target: Target<ClassName, dyn Helper>, alias: &str, config: Config) -> Result<Arc<dyn Helper>> {
        let class = match target {
            Target::Instance(helper) => return Ok(helper),
            Target::Class(class) => class,
        };

        let constructor = self.locator.constructor(&class).ok_or_else(|| ViewError::MissingHelper {
            class: class.name().to_string(),
            plugin: None,
        })?;

        let enabled = config.enabled();
        let helper = constructor(&self.view, config)?;
        info!(alias, class = %class, "helper created");

        if enabled {
            self.subscribe(alias, &helper);
        }

        Ok(helper)
    }

    fn missing_class_error(&self, class: &str, plugin: Option<&str>) -> ViewError {
        ViewError::MissingHelper {
            class: format!("{}{}", class, HELPER_SUFFIX),
            plugin: plugin.map(str::to_string),
        }
    }

    fn on_set(&mut self, alias: &str, helper: &Arc<dyn Helper>) {
        self.subscribe(alias, helper);
    }

    fn on_unload(&mut self, alias: &str, _helper: &Arc<dyn Helper>) {
        if let Some(id) = self.subscriptions.remove(alias) {
            self.event_bus.unregister(id);
            debug!(alias, "helper detached from event bus");
        }
    }
}

/// Registry of the helpers loaded for one view.
///
/// Members are loaded on first access. A name that cannot be resolved in the
/// application and core namespaces is retried in the namespace of the view's
/// active plugin before a [`ViewError::MissingHelper`] is reported.
pub struct HelperRegistry {
    registry: ObjectRegistry<HelperFactory>,
}

impl HelperRegistry {
    pub fn new(view: View, locator: Arc<ClassLocator>, event_bus: Arc<EventBus>) -> Self {
        Self {
            registry: ObjectRegistry::new(HelperFactory::new(view, locator, event_bus)),
        }
    }

    /// Registry using the view's own event bus.
    pub fn for_view(view: &View, locator: Arc<ClassLocator>) -> Self {
        let event_bus = Arc::clone(view.event_bus());
        Self::new(view.clone(), locator, event_bus)
    }

    pub fn view(&self) -> &View {
        self.registry.factory().view()
    }

    /// Whether `name` is available, loading it on first access.
    ///
    /// Never returns `Ok(false)`: a name that resolves nowhere is an error.
    /// When the default namespaces miss and the view has an active plugin, the
    /// plugin namespace is tried with the same short name; if that fails too,
    /// the plugin attempt's error is the one returned. Plugin-qualified names
    /// are never retried.
    pub fn has(&mut self, name: &str) -> Result<bool> {
        if self.registry.contains(name) {
            return Ok(true);
        }

        let missing = match self.registry.try_load(name, Config::new()) {
            Ok(_) => return Ok(true),
            Err(err @ LoadError::ClassNotFound { .. }) => self.registry.terminal_error(err),
            Err(LoadError::Create(err)) => return Err(err),
        };

        // Names that already carry a plugin are not re-qualified.
        if plugin_split(name).0.is_some() {
            return Err(missing);
        }

        let Some(plugin) = self.view().plugin() else {
            return Err(missing);
        };

        debug!(helper = name, plugin = %plugin, "retrying helper in plugin namespace");
        self.registry
            .load(name, Config::for_class(format!("{}.{}", plugin, name)))?;
        Ok(true)
    }

    /// The helper stored under `name`, loading it on first access.
    ///
    /// `None` only when loading succeeded under a different alias, which is
    /// the case for plugin-qualified names (`Blog.Comment` is stored as
    /// `Comment`).
    pub fn get(&mut self, name: &str) -> Result<Option<Arc<dyn Helper>>> {
        if !self.has(name)? {
            return Ok(None);
        }
        Ok(self.registry.get(name).cloned())
    }

    pub fn load(&mut self, name: &str, config: Config) -> Result<Arc<dyn Helper>> {
        self.registry.load(name, config)
    }

    /// Load every `(name, config)` entry in order.
    pub fn load_many<I, S>(&mut self, entries: I) -> Result<Vec<Arc<dyn Helper>>>
    where
        I: IntoIterator<Item = (S, Config)>,
        S: AsRef<str>,
    {
        normalize(entries)
            .into_iter()
            .map(|(alias, config)| self.registry.load(&alias, config))
            .collect()
    }

    /// Store a pre-built helper without constructing or subscribing it.
    pub fn load_instance(&mut self, alias: &str, helper: Arc<dyn Helper>) -> Result<Arc<dyn Helper>> {
        self.registry.load_instance(alias, helper)
    }

    /// Replace whatever is loaded under `name` and attach `helper` to the event bus.
    pub fn set(&mut self, name: &str, helper: Arc<dyn Helper>) {
        self.registry.set(name, helper);
    }

    pub fn unload(&mut self, alias: &str) -> Result<Arc<dyn Helper>> {
        self.registry
            .unload(alias)
            .ok_or_else(|| ViewError::NotLoaded(alias.to_string()))
    }

    pub fn reload(&mut self, name: &str, config: Config) -> Result<Arc<dyn Helper>> {
        self.registry.reload(name, config)
    }

    pub fn reset(&mut self) {
        self.registry.reset();
    }

    /// Plain lookup; never loads.
    pub fn loaded_helper(&self, alias: &str) -> Option<&Arc<dyn Helper>> {
        self.registry.get(alias)
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.registry.contains(alias)
    }

    pub fn is_subscribed(&self, alias: &str) -> bool {
        self.registry.factory().is_subscribed(alias)
    }

    pub fn loaded(&self) -> Vec<&str> {
        self.registry.loaded()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Helper>)> {
        self.registry.iter()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}
