//! Unified error handling for the route-viewer library.
//!
//! Navigation never fails: out-of-range steps and scrubs are clamped by the
//! view controller. Errors only surface at the edges, when host input is
//! parsed or when lifecycle calls arrive out of order.

use thiserror::Error;

/// Unified error type for route-viewer operations.
#[derive(Debug, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error), uniffi(flat_error))]
pub enum RouteViewError {
    /// Widget options failed validation
    #[error("Configuration error: {message}")]
    InvalidConfig { message: String },

    /// A host record could not be read as a position sample
    #[error("Sample {index} is malformed: {message}")]
    MalformedSample { index: usize, message: String },

    /// Host payload was not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Event or update delivered before mount or after unmount
    #[error("Widget '{container}' is not mounted")]
    NotMounted { container: String },

    /// Mount delivered twice without an unmount in between
    #[error("Widget '{container}' is already mounted")]
    AlreadyMounted { container: String },

    /// No widget registered under the given container id
    #[error("No widget registered for container '{container}'")]
    UnknownWidget { container: String },
}

/// Result type alias for route-viewer operations.
pub type Result<T> = std::result::Result<T, RouteViewError>;

/// Extension trait for converting Option to RouteViewError.
pub trait OptionExt<T> {
    /// Convert Option to Result with a not-mounted error.
    fn ok_or_not_mounted(self, container: &str) -> Result<T>;

    /// Convert Option to Result with an unknown-widget error.
    fn ok_or_unknown_widget(self, container: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_mounted(self, container: &str) -> Result<T> {
        self.ok_or_else(|| RouteViewError::NotMounted {
            container: container.to_string(),
        })
    }

    fn ok_or_unknown_widget(self, container: &str) -> Result<T> {
        self.ok_or_else(|| RouteViewError::UnknownWidget {
            container: container.to_string(),
        })
    }
}
