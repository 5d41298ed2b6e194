//! Runtime module: object registries and application wiring

pub mod app;
pub mod helper_registry;
pub mod object_registry;

pub use app::{App, AppBuilder, AppConfig};
pub use helper_registry::{HelperFactory, HelperRegistry, HELPER_NAMESPACE, HELPER_SUFFIX};
pub use object_registry::{normalize, LoadError, ObjectFactory, ObjectRegistry, Target};
