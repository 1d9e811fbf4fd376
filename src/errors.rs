//! Error handling for the analytics engine

/// Result type alias for the analytics engine
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the analytics engine
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Missing or invalid required input
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// The upstream tally source returned no data
    #[error("Data unavailable from {source_name}")]
    DataUnavailable { source_name: String },

    /// A snapshot write failed and was rolled back in full
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create a new validation error
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a new data-unavailable error
    pub fn data_unavailable(source_name: impl Into<String>) -> Self {
        Self::DataUnavailable {
            source_name: source_name.into(),
        }
    }

    /// Create a new persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the caller may retry the whole operation unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence { .. } | Self::DataUnavailable { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::persistence(err.to_string())
    }
}

/// Convenience macros for creating specific error types
#[macro_export]
macro_rules! validation_error {
    ($field:expr, $reason:expr) => {
        $crate::Error::validation($field, $reason)
    };
    ($field:expr, $fmt:expr, $($arg:tt)*) => {
        $crate::Error::validation($field, format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! persistence_error {
    ($msg:expr) => {
        $crate::Error::persistence($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::persistence(format!($fmt, $($arg)*))
    };
}
