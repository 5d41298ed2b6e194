//! Helper capability

use std::any::Any;
use std::sync::Arc;
use crate::core::config::Config;
use crate::core::event::{EventListener, EventWrapper};
use crate::core::view::View;
use crate::error::Result;

/// Behavioral object stored in a helper registry.
///
/// Helpers that want view lifecycle events return their names from
/// [`Helper::implemented_events`]; the registry attaches them to the event bus
/// unless they were loaded with `enabled: false`.
pub trait Helper: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn config(&self) -> &Config;

    fn implemented_events(&self) -> Vec<String> {
        Vec::new()
    }

    fn handle_event(&self, _event: &EventWrapper) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;
}

/// Helpers the class locator can build from `(view, config)`.
pub trait ConstructHelper: Helper + Sized {
    fn construct(view: &View, config: Config) -> Result<Self>;
}

impl dyn Helper {
    pub fn downcast_ref<T: Helper>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Helper>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

impl EventListener for Arc<dyn Helper> {
    fn implemented_events(&self) -> Vec<String> {
        (**self).implemented_events()
    }

    fn handle(&self, event: &EventWrapper) -> Result<()> {
        (**self).handle_event(event)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Function helper wrapper
pub struct FunctionHelper<F> {
    name: String,
    config: Config,
    events: Vec<String>,
    func: F,
}

impl<F> FunctionHelper<F>
where
    F: Fn(&EventWrapper) -> Result<()> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, config: Config, func: F) -> Self {
        Self {
            name: name.into(),
            config,
            events: Vec::new(),
            func,
        }
    }

    pub fn on(mut self, event: impl Into<String>) -> Self {
        self.events.push(event.into());
        self
    }
}

impl<F> Helper for FunctionHelper<F>
where
    F: Fn(&EventWrapper) -> Result<()> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn implemented_events(&self) -> Vec<String> {
        self.events.clone()
    }

    fn handle_event(&self, event: &EventWrapper) -> Result<()> {
        (self.func)(event)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
