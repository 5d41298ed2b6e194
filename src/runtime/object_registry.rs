//! Generic alias → instance registry
//!
//! [`ObjectRegistry`] owns the loaded table and the load algorithm. Everything
//! specific to a kind of object (how a name resolves to a class, how a class is
//! constructed, what error a missing class produces) comes from an injected
//! [`ObjectFactory`].

use std::sync::Arc;
use indexmap::IndexMap;
use tracing::debug;
use crate::core::config::Config;
use crate::core::locator::plugin_split;

/// What [`ObjectFactory::create`] is asked to produce an instance from.
pub enum Target<C, O: ?Sized> {
    Class(C),
    /// Pre-built instance, returned as is.
    Instance(Arc<O>),
}

/// Failure of [`ObjectRegistry::try_load`].
#[derive(Debug)]
pub enum LoadError<E> {
    /// No class matched the requested short name in the searched namespace.
    ClassNotFound {
        class: String,
        plugin: Option<String>,
    },
    Create(E),
}

/// Strategy supplying the object-specific parts of an [`ObjectRegistry`].
pub trait ObjectFactory {
    type Object: ?Sized;
    type Class;
    type Error;

    fn resolve_class_name(&self, name: &str) -> Option<Self::Class>;

    fn create(
        &mut self,
        target: Target<Self::Class, Self::Object>,
        alias: &str,
        config: Config,
    ) -> Result<Arc<Self::Object>, Self::Error>;

    /// Terminal error for a name no class could be found for.
    fn missing_class_error(&self, class: &str, plugin: Option<&str>) -> Self::Error;

    /// Called after [`ObjectRegistry::set`] stores an instance.
    fn on_set(&mut self, _alias: &str, _object: &Arc<Self::Object>) {}

    /// Called after an instance was removed from the registry.
    fn on_unload(&mut self, _alias: &str, _object: &Arc<Self::Object>) {}
}

pub struct ObjectRegistry<F: ObjectFactory> {
    loaded: IndexMap<String, Arc<F::Object>>,
    factory: F,
}

impl<F: ObjectFactory> ObjectRegistry<F> {
    pub fn new(factory: F) -> Self {
        Self {
            loaded: IndexMap::new(),
            factory,
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Load `name`, or return the instance already stored under its alias.
    ///
    /// The alias is the short part of `name` unless `config` carries a
    /// `className`, in which case `name` is the alias and `className` is
    /// resolved instead. Config is ignored for aliases that are already loaded.
    pub fn load(&mut self, name: &str, config: Config) -> Result<Arc<F::Object>, F::Error> {
        self.try_load(name, config).map_err(|err| self.terminal_error(err))
    }

    /// Same as [`ObjectRegistry::load`], but reports an unresolved class as
    /// [`LoadError::ClassNotFound`] so the caller can retry elsewhere.
    pub fn try_load(&mut self, name: &str, config: Config) -> Result<Arc<F::Object>, LoadError<F::Error>> {
        let (object_name, alias) = match config.class_name() {
            Some(class_name) => (class_name.to_string(), name.to_string()),
            None => (name.to_string(), plugin_split(name).1.to_string()),
        };

        if let Some(existing) = self.loaded.get(&alias) {
            return Ok(Arc::clone(existing));
        }

        let Some(class) = self.factory.resolve_class_name(&object_name) else {
            let (plugin, short) = plugin_split(&object_name);
            debug!(alias = %alias, requested = %object_name, "class not found");
            return Err(LoadError::ClassNotFound {
                class: short.to_string(),
                plugin: plugin.map(str::to_string),
            });
        };

        let object = self
            .factory
            .create(Target::Class(class), &alias, config)
            .map_err(LoadError::Create)?;

        debug!(alias = %alias, requested = %object_name, "loaded");
        self.loaded.insert(alias, Arc::clone(&object));
        Ok(object)
    }

    /// Convert a [`LoadError`] into the factory's terminal error.
    pub fn terminal_error(&self, err: LoadError<F::Error>) -> F::Error {
        match err {
            LoadError::ClassNotFound { class, plugin } => {
                self.factory.missing_class_error(&class, plugin.as_deref())
            }
            LoadError::Create(err) => err,
        }
    }

    /// Store a pre-built instance through the factory's pass-through path.
    ///
    /// Like [`ObjectRegistry::load`], an alias that is already loaded wins.
    pub fn load_instance(&mut self, alias: &str, object: Arc<F::Object>) -> Result<Arc<F::Object>, F::Error> {
        if let Some(existing) = self.loaded.get(alias) {
            return Ok(Arc::clone(existing));
        }

        let object = self.factory.create(Target::Instance(object), alias, Config::new())?;
        self.loaded.insert(alias.to_string(), Arc::clone(&object));
        Ok(object)
    }

    /// Store `object` under the short part of `name`, replacing anything loaded there.
    pub fn set(&mut self, name: &str, object: Arc<F::Object>) {
        let alias = plugin_split(name).1.to_string();
        self.unload(&alias);
        self.factory.on_set(&alias, &object);
        self.loaded.insert(alias, object);
    }

    /// Remove `alias`, keeping the load order of the remaining instances.
    pub fn unload(&mut self, alias: &str) -> Option<Arc<F::Object>> {
        let object = self.loaded.shift_remove(alias)?;
        self.factory.on_unload(alias, &object);
        debug!(alias, "unloaded");
        Some(object)
    }

    /// Unload `name` if present and load it again with `config`.
    pub fn reload(&mut self, name: &str, config: Config) -> Result<Arc<F::Object>, F::Error> {
        let alias = match config.class_name() {
            Some(_) => name,
            None => plugin_split(name).1,
        };
        self.unload(alias);
        self.load(name, config)
    }

    /// Unload everything, in load order.
    pub fn reset(&mut self) {
        let aliases: Vec<String> = self.loaded.keys().cloned().collect();
        for alias in aliases {
            self.unload(&alias);
        }
    }

    pub fn get(&self, alias: &str) -> Option<&Arc<F::Object>> {
        self.loaded.get(alias)
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.loaded.contains_key(alias)
    }

    /// Aliases in load order.
    pub fn loaded(&self) -> Vec<&str> {
        self.loaded.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<F::Object>)> {
        self.loaded.iter().map(|(alias, object)| (alias.as_str(), object))
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }
}

/// Turn `(name, config)` entries into an alias-keyed, ordered config map.
///
/// Plugin-qualified names are stored under their short alias with the full
/// name kept as `className`. Later entries for the same alias win.
pub fn normalize<I, S>(entries: I) -> IndexMap<String, Config>
where
    I: IntoIterator<Item = (S, Config)>,
    S: AsRef<str>,
{
    let mut normal = IndexMap::new();
    for (name, mut config) in entries {
        let name = name.as_ref();
        let (plugin, alias) = plugin_split(name);
        if plugin.is_some() && config.class_name().is_none() {
            config.insert(crate::core::config::CLASS_NAME, name);
        }
        normal.insert(alias.to_string(), config);
    }
    normal
}
