use std::fmt;

use clai_types::ServiceError;

/// Result type for clai-runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the runtime layer
#[derive(Debug)]
pub enum Error {
    /// Store layer error
    Store(clai_store::Error),

    /// Path/identity layer error
    Core(clai_core::Error),

    /// IO operation failed
    Io(std::io::Error),

    /// Configuration error
    Config(String),

    /// Invalid operation or state
    InvalidOperation(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Store(err) => write!(f, "Store error: {}", err),
            Error::Core(err) => write!(f, "Core error: {}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store(err) => Some(err),
            Error::Core(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Config(_) | Error::InvalidOperation(_) => None,
        }
    }
}

impl From<clai_store::Error> for Error {
    fn from(err: clai_store::Error) -> Self {
        Error::Store(err)
    }
}

impl From<clai_core::Error> for Error {
    fn from(err: clai_core::Error) -> Self {
        Error::Core(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Map an internal error onto the service error surface.
pub fn to_service_error(err: Error) -> ServiceError {
    match err {
        Error::Store(clai_store::Error::AmbiguousPrefix(prefix)) => {
            ServiceError::AmbiguousPrefix(prefix)
        }
        Error::Store(clai_store::Error::Migration(msg)) => ServiceError::Unavailable(msg),
        Error::Store(other) => ServiceError::Unavailable(other.to_string()),
        Error::Config(msg) => ServiceError::InvalidArgument(msg),
        Error::InvalidOperation(msg) => ServiceError::InvalidArgument(msg),
        other => ServiceError::Internal(other.to_string()),
    }
}
