//! Core module: event system, helper capability, class locator and view context

pub mod config;
pub mod event;
pub mod helper;
pub mod locator;
pub mod view;

pub use config::Config;
pub use event::{listener, Event, EventBus, EventListener, EventWrapper, ListenerId, Priority};
pub use helper::{ConstructHelper, FunctionHelper, Helper};
pub use locator::{plugin_split, ClassLocator, ClassName, HelperClass, LocatorConfig, Scope};
pub use view::{View, ViewBuilder, ViewEvent};
pub use crate::impl_event;
