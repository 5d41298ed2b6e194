//! Application-wide class locator
//!
//! Maps a short name such as `Html` or `Blog.Comment` plus a namespace hint
//! (`View/Helper`) and a suffix (`Helper`) to a registered class. Unqualified
//! names are searched in the application namespace, then in the core
//! namespace. Plugin-qualified names are searched in that plugin only.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};
use crate::core::config::Config;
use crate::core::helper::{ConstructHelper, Helper};
use crate::core::view::View;
use crate::error::Result;

pub const DEFAULT_APP_NAMESPACE: &str = "App";
pub const DEFAULT_CORE_NAMESPACE: &str = "Cake";

pub type HelperConstructor = Arc<dyn Fn(&View, Config) -> Result<Arc<dyn Helper>> + Send + Sync>;

/// Split `Plugin.Name` into its plugin and short name.
///
/// An empty plugin part (`.Name`) counts as no plugin.
pub fn plugin_split(name: &str) -> (Option<&str>, &str) {
    match name.split_once('.') {
        Some((plugin, short)) if !plugin.is_empty() => (Some(plugin), short),
        Some((_, short)) => (None, short),
        None => (None, name),
    }
}

/// Fully-qualified class identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassName {
    base: String,
    namespace: String,
    name: String,
}

impl ClassName {
    pub fn new(base: impl Into<String>, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Application, core or plugin namespace the class lives in.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.base, self.namespace.replace('/', "::"), self.name)
    }
}

/// Namespace a self-registered helper class belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    App,
    Core,
    Plugin(&'static str),
}

pub type ConstructFn = fn(&View, Config) -> Result<Arc<dyn Helper>>;

/// Compile-time record submitted by [`register_helper!`](crate::register_helper)
#[derive(Clone, Copy)]
pub struct HelperClass {
    pub scope: Scope,
    pub name: &'static str,
    pub construct: ConstructFn,
}

impl HelperClass {
    pub const fn new(scope: Scope, name: &'static str, construct: ConstructFn) -> Self {
        Self { scope, name, construct }
    }
}

inventory::collect!(HelperClass);

/// Type-erased constructor for a [`ConstructHelper`] implementation.
pub fn construct<H: ConstructHelper>(view: &View, config: Config) -> Result<Arc<dyn Helper>> {
    Ok(Arc::new(H::construct(view, config)?))
}

/// Register a helper type with the class locator's auto-discovery
///
/// ```ignore
/// register_helper!(HtmlHelper, "Html");
/// register_helper!(CommentHelper, "Comment", plugin = "Blog");
/// register_helper!(UrlHelper, "Url", core);
/// ```
#[macro_export]
macro_rules! register_helper {
    (@submit $helper_ty:ty, $scope:expr, $name:expr) => {
        $crate::inventory::submit! {
            $crate::core::locator::HelperClass::new(
                $scope,
                $name,
                $crate::core::locator::construct::<$helper_ty>,
            )
        }
    };
    ($helper_ty:ty, $name:expr) => {
        $crate::register_helper!(@submit $helper_ty, $crate::core::locator::Scope::App, $name);
    };
    ($helper_ty:ty, $name:expr, core) => {
        $crate::register_helper!(@submit $helper_ty, $crate::core::locator::Scope::Core, $name);
    };
    ($helper_ty:ty, $name:expr, plugin = $plugin:expr) => {
        $crate::register_helper!(@submit $helper_ty, $crate::core::locator::Scope::Plugin($plugin), $name);
    };
}

#[derive(Debug, Clone)]
pub struct LocatorConfig {
    pub app_namespace: String,
    pub core_namespace: Option<String>,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            app_namespace: DEFAULT_APP_NAMESPACE.to_string(),
            core_namespace: Some(DEFAULT_CORE_NAMESPACE.to_string()),
        }
    }
}

impl LocatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_app_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.app_namespace = namespace.into();
        self
    }

    pub fn with_core_namespace(mut self, namespace: Option<String>) -> Self {
        self.core_namespace = namespace;
        self
    }
}

#[derive(Clone, Default)]
pub struct ClassLocator {
    config: LocatorConfig,
    classes: HashMap<ClassName, HelperConstructor>,
}

impl ClassLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LocatorConfig) -> Self {
        Self {
            config,
            classes: HashMap::new(),
        }
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    pub fn register<F>(&mut self, class: ClassName, constructor: F) -> &mut Self
    where
        F: Fn(&View, Config) -> Result<Arc<dyn Helper>> + Send + Sync + 'static,
    {
        debug!(class = %class, "registering class");
        self.classes.insert(class, Arc::new(constructor));
        self
    }

    /// Register a class under the application namespace.
    pub fn register_app<F>(&mut self, namespace: &str, name: &str, constructor: F) -> &mut Self
    where
        F: Fn(&View, Config) -> Result<Arc<dyn Helper>> + Send + Sync + 'static,
    {
        let class = ClassName::new(self.config.app_namespace.clone(), namespace, name);
        self.register(class, constructor)
    }

    /// Register a class under a plugin namespace.
    pub fn register_plugin<F>(&mut self, plugin: &str, namespace: &str, name: &str, constructor: F) -> &mut Self
    where
        F: Fn(&View, Config) -> Result<Arc<dyn Helper>> + Send + Sync + 'static,
    {
        self.register(ClassName::new(plugin, namespace, name), constructor)
    }

    /// Pull in every helper submitted through [`register_helper!`](crate::register_helper).
    ///
    /// Core-scoped helpers are skipped when the core namespace is disabled.
    pub fn discover(&mut self, namespace: &str, suffix: &str) -> usize {
        let mut count = 0;
        for class in inventory::iter::<HelperClass> {
            let base = match class.scope {
                Scope::App => self.config.app_namespace.clone(),
                Scope::Plugin(plugin) => plugin.to_string(),
                Scope::Core => match &self.config.core_namespace {
                    Some(core) => core.clone(),
                    None => continue,
                },
            };
            let name = format!("{}{}", class.name, suffix);
            self.register(ClassName::new(base, namespace, name), class.construct);
            count += 1;
        }
        count
    }

    pub fn contains(&self, class: &ClassName) -> bool {
        self.classes.contains_key(class)
    }

    pub fn constructor(&self, class: &ClassName) -> Option<HelperConstructor> {
        self.classes.get(class).cloned()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn resolve(&self, name: &str, namespace: &str, suffix: &str) -> Option<ClassName> {
        let (plugin, short) = plugin_split(name);
        let class_name = format!("{}{}", short, suffix);

        let bases: Vec<&str> = match plugin {
            Some(plugin) => vec![plugin],
            None => std::iter::once(self.config.app_namespace.as_str())
                .chain(self.config.core_namespace.as_deref())
                .collect(),
        };

        let found = bases
            .into_iter()
            .map(|base| ClassName::new(base, namespace, class_name.as_str()))
            .find(|candidate| self.classes.contains_key(candidate));

        trace!(requested = name, namespace, found = ?found, "class lookup");
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::helper::FunctionHelper;

    fn noop(view: &View, config: Config) -> Result<Arc<dyn Helper>> {
        let _ = view;
        Ok(Arc::new(FunctionHelper::new("Noop", config, |_| Ok(()))))
    }

    #[test]
    fn test_plugin_split() {
        assert_eq!(plugin_split("Html"), (None, "Html"));
        assert_eq!(plugin_split("Blog.Comment"), (Some("Blog"), "Comment"));
        assert_eq!(plugin_split(".Comment"), (None, "Comment"));
        assert_eq!(plugin_split("Vendor/Blog.Comment"), (Some("Vendor/Blog"), "Comment"));
    }

    #[test]
    fn test_class_name_display() {
        let class = ClassName::new("Blog", "View/Helper", "CommentHelper");
        assert_eq!(class.to_string(), "Blog::View::Helper::CommentHelper");
        assert_eq!(class.base(), "Blog");
    }

    #[test]
    fn test_resolve_prefers_app_over_core() {
        let mut locator = ClassLocator::new();
        locator.register(ClassName::new("Cake", "View/Helper", "HtmlHelper"), noop);
        assert_eq!(
            locator.resolve("Html", "View/Helper", "Helper"),
            Some(ClassName::new("Cake", "View/Helper", "HtmlHelper"))
        );

        locator.register_app("View/Helper", "HtmlHelper", noop);
        assert_eq!(
            locator.resolve("Html", "View/Helper", "Helper"),
            Some(ClassName::new("App", "View/Helper", "HtmlHelper"))
        );
    }

    #[test]
    fn test_plugin_names_search_only_the_plugin() {
        let mut locator = ClassLocator::new();
        locator.register_app("View/Helper", "CommentHelper", noop);

        assert_eq!(locator.resolve("Blog.Comment", "View/Helper", "Helper"), None);

        locator.register_plugin("Blog", "View/Helper", "CommentHelper", noop);
        assert_eq!(
            locator.resolve("Blog.Comment", "View/Helper", "Helper"),
            Some(ClassName::new("Blog", "View/Helper", "CommentHelper"))
        );
    }

    #[test]
    fn test_plugin_classes_are_not_searched_by_default() {
        let mut locator = ClassLocator::new();
        locator.register_plugin("Blog", "View/Helper", "CommentHelper", noop);
        assert_eq!(locator.resolve("Comment", "View/Helper", "Helper"), None);
    }

    #[test]
    fn test_disabled_core_namespace() {
        let mut locator = ClassLocator::with_config(LocatorConfig::new().with_core_namespace(None));
        locator.register(ClassName::new("Cake", "View/Helper", "UrlHelper"), noop);
        assert_eq!(locator.resolve("Url", "View/Helper", "Helper"), None);
    }

    #[test]
    fn test_custom_app_namespace() {
        let mut locator = ClassLocator::with_config(LocatorConfig::new().with_app_namespace("Shop"));
        locator.register_app("View/Helper", "CartHelper", noop);
        let class = locator.resolve("Cart", "View/Helper", "Helper").unwrap();
        assert_eq!(class.base(), "Shop");
        assert!(locator.constructor(&class).is_some());
        assert_eq!(locator.len(), 1);
    }
}
