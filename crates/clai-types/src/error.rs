use std::fmt;

/// Result type for service-level operations.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Error kinds crossing the service boundary. Ingest never surfaces these to
/// hooks; suggest surfaces them only when no partial result exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Missing required field, empty identifier, malformed event.
    InvalidArgument(String),

    /// Session or command id unknown.
    NotFound(String),

    /// Session prefix matches multiple sessions in query.
    AmbiguousPrefix(String),

    /// Store cannot be opened or is migrating.
    Unavailable(String),

    /// Hard timeout hit; partial results may accompany.
    DeadlineExceeded(String),

    /// Unexpected invariant violation; logged with context.
    Internal(String),
}

impl ServiceError {
    /// Stable wire identifier for the kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::InvalidArgument(_) => "invalid_argument",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::AmbiguousPrefix(_) => "ambiguous_prefix",
            ServiceError::Unavailable(_) => "unavailable",
            ServiceError::DeadlineExceeded(_) => "deadline_exceeded",
            ServiceError::Internal(_) => "internal",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ServiceError::InvalidArgument(msg)
            | ServiceError::NotFound(msg)
            | ServiceError::AmbiguousPrefix(msg)
            | ServiceError::Unavailable(msg)
            | ServiceError::DeadlineExceeded(msg)
            | ServiceError::Internal(msg) => msg,
        }
    }

    /// Reconstruct from wire kind + message; unknown kinds map to Internal.
    pub fn from_kind(kind: &str, message: String) -> Self {
        match kind {
            "invalid_argument" => ServiceError::InvalidArgument(message),
            "not_found" => ServiceError::NotFound(message),
            "ambiguous_prefix" => ServiceError::AmbiguousPrefix(message),
            "unavailable" => ServiceError::Unavailable(message),
            "deadline_exceeded" => ServiceError::DeadlineExceeded(message),
            _ => ServiceError::Internal(message),
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

impl std::error::Error for ServiceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips() {
        let errors = [
            ServiceError::InvalidArgument("a".to_string()),
            ServiceError::NotFound("b".to_string()),
            ServiceError::AmbiguousPrefix("c".to_string()),
            ServiceError::Unavailable("d".to_string()),
            ServiceError::DeadlineExceeded("e".to_string()),
            ServiceError::Internal("f".to_string()),
        ];
        for err in errors {
            let back = ServiceError::from_kind(err.kind(), err.message().to_string());
            assert_eq!(back, err);
        }
    }

    #[test]
    fn unknown_kind_becomes_internal() {
        let err = ServiceError::from_kind("martian", "boom".to_string());
        assert_eq!(err, ServiceError::Internal("boom".to_string()));
    }
}
