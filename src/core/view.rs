//! View context helpers are created for

use std::collections::HashMap;
use std::any::Any;
use std::sync::Arc;
use parking_lot::RwLock;
use serde_json::Value;
use crate::core::event::{Event, EventBus, EventWrapper};
use crate::error::{Result, ViewError};

pub const BEFORE_RENDER: &str = "View.beforeRender";
pub const BEFORE_RENDER_FILE: &str = "View.beforeRenderFile";
pub const AFTER_RENDER_FILE: &str = "View.afterRenderFile";
pub const AFTER_RENDER: &str = "View.afterRender";
pub const BEFORE_LAYOUT: &str = "View.beforeLayout";
pub const AFTER_LAYOUT: &str = "View.afterLayout";

/// Render lifecycle events helpers can subscribe to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    BeforeRender { view_file: String },
    BeforeRenderFile { file: String },
    AfterRenderFile { file: String, content: String },
    AfterRender { view_file: String },
    BeforeLayout { layout_file: String },
    AfterLayout { layout_file: String },
}

impl Event for ViewEvent {
    fn event_name(&self) -> &'static str {
        match self {
            ViewEvent::BeforeRender { .. } => BEFORE_RENDER,
            ViewEvent::BeforeRenderFile { .. } => BEFORE_RENDER_FILE,
            ViewEvent::AfterRenderFile { .. } => AFTER_RENDER_FILE,
            ViewEvent::AfterRender { .. } => AFTER_RENDER,
            ViewEvent::BeforeLayout { .. } => BEFORE_LAYOUT,
            ViewEvent::AfterLayout { .. } => AFTER_LAYOUT,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct ViewState {
    name: String,
    plugin: RwLock<Option<String>>,
    vars: RwLock<HashMap<String, Value>>,
    event_bus: Arc<EventBus>,
}

/// Cheaply clonable handle to a view.
///
/// Supplies the active plugin scope and the shared event bus to helper
/// registries and helper constructors.
#[derive(Clone)]
pub struct View {
    state: Arc<ViewState>,
}

impl View {
    pub fn new(name: impl Into<String>, event_bus: Arc<EventBus>) -> Self {
        Self {
            state: Arc::new(ViewState {
                name: name.into(),
                plugin: RwLock::new(None),
                vars: RwLock::new(HashMap::new()),
                event_bus,
            }),
        }
    }

    pub fn with_plugin(self, plugin: impl Into<String>) -> Self {
        self.set_plugin(Some(plugin.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Plugin the view is currently rendering for, if any.
    pub fn plugin(&self) -> Option<String> {
        self.state.plugin.read().clone()
    }

    pub fn set_plugin(&self, plugin: Option<String>) {
        *self.state.plugin.write() = plugin.filter(|p| !p.is_empty());
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.state.vars.write().insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.state.vars.read().get(key).cloned()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.state.event_bus
    }

    /// Dispatch a lifecycle event synchronously to subscribed helpers.
    pub fn dispatch(&self, event: ViewEvent) -> Result<usize> {
        let wrapper = EventWrapper::new(event).with_source(self.state.name.clone());
        self.state.event_bus.dispatch(wrapper)
    }
}

impl std::fmt::Debug for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("name", &self.state.name)
            .field("plugin", &self.plugin())
            .finish()
    }
}

pub struct ViewBuilder {
    name: String,
    plugin: Option<String>,
    event_bus: Option<Arc<EventBus>>,
}

impl ViewBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            plugin: None,
            event_bus: None,
        }
    }

    pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn build(self) -> Result<View> {
        let event_bus = self.event_bus
            .ok_or_else(|| ViewError::RuntimeError("EventBus is required".to_string()))?;

        let view = View::new(self.name, event_bus);
        view.set_plugin(self.plugin);
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::listener;
    use parking_lot::Mutex;

    #[test]
    fn test_view_plugin_scope() {
        let view = View::new("Posts/index", Arc::new(EventBus::new()));
        assert_eq!(view.plugin(), None);

        let view = view.with_plugin("Blog");
        assert_eq!(view.plugin().as_deref(), Some("Blog"));

        view.set_plugin(Some(String::new()));
        assert_eq!(view.plugin(), None);
    }

    #[test]
    fn test_clones_share_state() {
        let view = View::new("Posts/index", Arc::new(EventBus::new()));
        let other = view.clone();

        other.set_plugin(Some("Blog".into()));
        other.set("title", "Hello");

        assert_eq!(view.plugin().as_deref(), Some("Blog"));
        assert_eq!(view.get("title"), Some(Value::from("Hello")));
        assert_eq!(view.get("missing"), None);
    }

    #[test]
    fn test_dispatch_lifecycle_event() {
        let bus = Arc::new(EventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        bus.register(listener("recorder", &[BEFORE_LAYOUT], move |event| {
            if let Some(ViewEvent::BeforeLayout { layout_file }) = event.downcast::<ViewEvent>() {
                sink.lock().push((event.source.clone(), layout_file.clone()));
            }
            Ok(())
        }));

        let view = View::new("Posts/index", bus);
        assert_eq!(view.dispatch(ViewEvent::BeforeLayout { layout_file: "default".into() }).unwrap(), 1);
        assert_eq!(view.dispatch(ViewEvent::AfterLayout { layout_file: "default".into() }).unwrap(), 0);

        assert_eq!(
            *seen.lock(),
            vec![(Some("Posts/index".to_string()), "default".to_string())]
        );
    }

    #[test]
    fn test_view_builder() {
        let bus = Arc::new(EventBus::new());
        let view = ViewBuilder::new("Articles/view")
            .with_plugin("Blog")
            .with_event_bus(bus.clone())
            .build()
            .unwrap();

        assert_eq!(view.name(), "Articles/view");
        assert_eq!(view.plugin().as_deref(), Some("Blog"));
        assert!(Arc::ptr_eq(view.event_bus(), &bus));

        assert!(ViewBuilder::new("orphan").build().is_err());
    }
}
