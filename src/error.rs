//! Error handling system

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewError {
    #[error("Helper class {class} could not be found{}", plugin_suffix(.plugin))]
    MissingHelper {
        class: String,
        plugin: Option<String>,
    },

    #[error("Helper not loaded: {0}")]
    NotLoaded(String),

    #[error("Helper failed: {0}")]
    HelperError(String),

    #[error("Event processing failed: {0}")]
    EventError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Runtime error: {0}")]
    RuntimeError(String),

    #[error("Operation timeout: {0}")]
    TimeoutError(String),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

fn plugin_suffix(plugin: &Option<String>) -> String {
    match plugin {
        Some(plugin) => format!(" in plugin {}", plugin),
        None => String::new(),
    }
}

impl ViewError {
    /// True for the terminal "not found anywhere" failure.
    pub fn is_missing_helper(&self) -> bool {
        matches!(self, ViewError::MissingHelper { .. })
    }
}

pub type Result<T> = std::result::Result<T, ViewError>;

#[macro_export]
macro_rules! bail {
    ($msg:literal) => {
        return Err($crate::error::ViewError::Other($msg.to_string()))
    };
    ($err:expr) => {
        return Err($crate::error::ViewError::Other($err.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::error::ViewError::Other(format!($fmt, $($arg)*)))
    };
}
