//! Application runtime

use crate::core::{ClassLocator, Config, EventBus, Helper, LocatorConfig, View};
use crate::core::locator::{ClassName, HelperConstructor};
use crate::error::{Result, ViewError};
use crate::runtime::helper_registry::{HelperRegistry, HELPER_NAMESPACE, HELPER_SUFFIX};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::info;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub name: String,
    pub version: String,
    pub description: String,
    pub locator: LocatorConfig,
    pub discover_helpers: bool,
    pub graceful_shutdown_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "ViewHelpersApp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: String::new(),
            locator: LocatorConfig::default(),
            discover_helpers: true,
            graceful_shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl AppConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn with_app_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.locator.app_namespace = namespace.into();
        self
    }

    pub fn with_core_namespace(mut self, namespace: Option<String>) -> Self {
        self.locator.core_namespace = namespace;
        self
    }

    /// Whether `register_helper!` submissions are picked up at build time.
    pub fn with_helper_discovery(mut self, enable: bool) -> Self {
        self.discover_helpers = enable;
        self
    }

    pub fn with_graceful_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.graceful_shutdown_timeout = timeout;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.locator.app_namespace.is_empty() {
            return Err(ViewError::ConfigError("app namespace must not be empty".to_string()));
        }
        if matches!(&self.locator.core_namespace, Some(core) if core.is_empty()) {
            return Err(ViewError::ConfigError("core namespace must not be empty".to_string()));
        }
        Ok(())
    }
}

struct PendingHelper {
    plugin: Option<String>,
    name: String,
    constructor: HelperConstructor,
}

pub struct AppBuilder {
    config: Option<AppConfig>,
    helpers: Vec<PendingHelper>,
    event_bus: Option<Arc<EventBus>>,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            helpers: Vec::new(),
            event_bus: None,
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Register an application helper under its short name (`Html` → `HtmlHelper`).
    pub fn add_helper<F>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&View, Config) -> Result<Arc<dyn Helper>> + Send + Sync + 'static,
    {
        self.helpers.push(PendingHelper {
            plugin: None,
            name: name.into(),
            constructor: Arc::new(constructor),
        });
        self
    }

    /// Register a helper inside a plugin namespace.
    pub fn add_plugin_helper<F>(mut self, plugin: impl Into<String>, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&View, Config) -> Result<Arc<dyn Helper>> + Send + Sync + 'static,
    {
        self.helpers.push(PendingHelper {
            plugin: Some(plugin.into()),
            name: name.into(),
            constructor: Arc::new(constructor),
        });
        self
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn build(mut self) -> Result<App> {
        let config = self.config.take().unwrap_or_default();
        config.validate()?;
        let event_bus = self.event_bus.unwrap_or_else(|| Arc::new(EventBus::new()));

        let mut locator = ClassLocator::with_config(config.locator.clone());
        if config.discover_helpers {
            let found = locator.discover(HELPER_NAMESPACE, HELPER_SUFFIX);
            info!(found, "discovered helper classes");
        }

        for pending in self.helpers {
            let base = pending.plugin.unwrap_or_else(|| config.locator.app_namespace.clone());
            let class = ClassName::new(base, HELPER_NAMESPACE, format!("{}{}", pending.name, HELPER_SUFFIX));
            let constructor = pending.constructor;
            locator.register(class, move |view: &View, config: Config| constructor(view, config));
        }

        Ok(App {
            config,
            event_bus,
            locator: Arc::new(locator),
            is_running: Arc::new(tokio::sync::RwLock::new(false)),
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct App {
    config: AppConfig,
    event_bus: Arc<EventBus>,
    locator: Arc<ClassLocator>,
    is_running: Arc<tokio::sync::RwLock<bool>>,
}

impl App {
    pub fn build() -> AppBuilder {
        AppBuilder::new()
    }

    /// Start the queued event dispatcher.
    pub async fn start(&self) -> Result<()> {
        let mut running = self.is_running.write().await;
        if *running {
            return Err(ViewError::RuntimeError("Application already running".to_string()));
        }

        self.event_bus.start().await?;
        *running = true;
        info!(app = %self.config.name, "application started");
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        {
            let running = self.is_running.read().await;
            if !*running {
                return Ok(());
            }
        }

        match timeout(self.config.graceful_shutdown_timeout, self.event_bus.stop()).await {
            Ok(result) => result?,
            Err(_) => return Err(ViewError::TimeoutError("Shutdown timeout".to_string())),
        }

        let mut running = self.is_running.write().await;
        *running = false;
        info!(app = %self.config.name, "application stopped");
        Ok(())
    }

    pub fn view(&self, name: impl Into<String>) -> View {
        View::new(name, Arc::clone(&self.event_bus))
    }

    pub fn plugin_view(&self, name: impl Into<String>, plugin: impl Into<String>) -> View {
        self.view(name).with_plugin(plugin)
    }

    /// Fresh helper registry for `view`, sharing the application's class locator.
    pub fn helpers(&self, view: &View) -> HelperRegistry {
        HelperRegistry::new(view.clone(), Arc::clone(&self.locator), Arc::clone(&self.event_bus))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn locator(&self) -> &ClassLocator {
        &self.locator
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ConstructHelper, EventWrapper, FunctionHelper};
    use crate::core::view::{ViewEvent, AFTER_RENDER};
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static GREETINGS: AtomicUsize = AtomicUsize::new(0);

    struct GreetingHelper {
        config: Config,
    }

    impl Helper for GreetingHelper {
        fn name(&self) -> &str {
            "Greeting"
        }

        fn config(&self) -> &Config {
            &self.config
        }

        fn implemented_events(&self) -> Vec<String> {
            vec![AFTER_RENDER.to_string()]
        }

        fn handle_event(&self, _event: &EventWrapper) -> Result<()> {
            GREETINGS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    impl ConstructHelper for GreetingHelper {
        fn construct(_view: &View, config: Config) -> Result<Self> {
            Ok(Self { config })
        }
    }

    crate::register_helper!(GreetingHelper, "Greeting");
    crate::register_helper!(GreetingHelper, "Salute", plugin = "Ceremony");

    fn function_helper(name: &'static str) -> impl Fn(&View, Config) -> Result<Arc<dyn Helper>> + Send + Sync + 'static {
        move |_view: &View, config: Config| -> Result<Arc<dyn Helper>> {
            Ok(Arc::new(FunctionHelper::new(name, config, |_| Ok(()))))
        }
    }

    #[test]
    fn test_app_config_builder() {
        let config = AppConfig::new("my-app")
            .with_version("1.0.0")
            .with_description("A test app")
            .with_app_namespace("Shop")
            .with_core_namespace(None)
            .with_helper_discovery(false);

        assert_eq!(config.name, "my-app");
        assert_eq!(config.version, "1.0.0");
        assert_eq!(config.description, "A test app");
        assert_eq!(config.locator.app_namespace, "Shop");
        assert_eq!(config.locator.core_namespace, None);
        assert!(!config.discover_helpers);
    }

    #[test]
    fn test_invalid_namespace_rejected() {
        let result = App::build()
            .with_config(AppConfig::new("bad").with_app_namespace(""))
            .build();
        assert!(matches!(result, Err(ViewError::ConfigError(_))));
    }

    #[test]
    fn test_builder_registers_helpers() {
        let app = App::build()
            .with_config(AppConfig::new("blog").with_helper_discovery(false))
            .add_helper("Html", function_helper("Html"))
            .add_plugin_helper("Blog", "Comment", function_helper("Comment"))
            .build()
            .unwrap();

        assert_eq!(app.locator().len(), 2);

        let view = app.plugin_view("Articles/view", "Blog");
        let mut helpers = app.helpers(&view);

        assert_eq!(helpers.get("Html").unwrap().unwrap().name(), "Html");
        assert_eq!(helpers.get("Comment").unwrap().unwrap().name(), "Comment");

        let plain = app.view("Pages/home");
        let mut helpers = app.helpers(&plain);
        assert!(matches!(helpers.get("Comment"), Err(ref e) if e.is_missing_helper()));
    }

    #[test]
    fn test_discovered_helpers() {
        let app = App::build().build().unwrap();

        let view = app.plugin_view("Ceremonies/index", "Ceremony");
        let mut helpers = app.helpers(&view);

        let greeting = helpers.get("Greeting").unwrap().unwrap();
        assert!(greeting.is::<GreetingHelper>());
        assert!(helpers.has("Salute").unwrap());

        let before = GREETINGS.load(Ordering::SeqCst);
        view.dispatch(ViewEvent::AfterRender { view_file: "Ceremonies/index".into() }).unwrap();
        assert_eq!(GREETINGS.load(Ordering::SeqCst), before + 2);
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let app = App::build()
            .with_config(AppConfig::new("lifecycle").with_helper_discovery(false))
            .build()
            .unwrap();

        assert!(!app.is_running().await);
        app.start().await.unwrap();
        assert!(app.is_running().await);
        assert!(app.start().await.is_err());

        app.shutdown().await.unwrap();
        assert!(!app.is_running().await);
        assert!(!app.event_bus().is_running());
        assert!(app.event_bus().publish_wrapper(EventWrapper::named(AFTER_RENDER)).is_err());
        app.shutdown().await.unwrap();

        app.start().await.unwrap();
        assert!(app.event_bus().is_running());
        app.shutdown().await.unwrap();
    }
}
