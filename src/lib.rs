//! View Helpers - lazy, plugin-aware helper registry
//!
//! Resolves short helper names to registered classes, builds them on first
//! access and attaches them to the view's event bus.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod core;
pub mod runtime;
pub mod error;

#[doc(hidden)]
pub use inventory;

pub mod prelude {
    //! Commonly used types and traits

    pub use crate::core::{Config, Event, EventBus, EventListener, EventWrapper, Priority};
    pub use crate::core::{ClassLocator, ClassName, LocatorConfig};
    pub use crate::core::{ConstructHelper, FunctionHelper, Helper, View, ViewBuilder, ViewEvent};
    pub use crate::core::listener;
    pub use crate::runtime::{App, AppBuilder, AppConfig};
    pub use crate::runtime::{HelperRegistry, ObjectFactory, ObjectRegistry};
    pub use crate::error::{Result, ViewError};
    pub use crate::{impl_event, register_helper};
}

pub use crate::error::{Result, ViewError};
pub use crate::core::{Config, Helper, View};
pub use crate::runtime::{App, HelperRegistry};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn build_info() -> String {
    format!("View Helpers {}", VERSION)
}
