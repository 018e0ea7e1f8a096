use std::fmt;

/// Result type for clai-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the store layer
#[derive(Debug)]
pub enum Error {
    /// Database operation failed
    Database(rusqlite::Error),

    /// IO operation failed
    Io(std::io::Error),

    /// Schema version on disk is ahead of this binary
    Migration(String),

    /// Query-specific error (invalid input, not found, etc.)
    Query(String),

    /// A session prefix matched more than one session
    AmbiguousPrefix(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Database(err) => write!(f, "Database error: {}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Migration(msg) => write!(f, "Migration error: {}", msg),
            Error::Query(msg) => write!(f, "Query error: {}", msg),
            Error::AmbiguousPrefix(msg) => write!(f, "Ambiguous session prefix: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Database(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Migration(_) | Error::Query(_) | Error::AmbiguousPrefix(_) => None,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
