use thiserror::Error;

/// Errors surfaced by the shortening and resolution services.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShortenerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("failed to create a unique short code after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("failed to generate short code: {0}")]
    Generator(String),
}

impl ShortenerError {
    /// Whether the caller can correct the request (as opposed to a service fault).
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::NotFound(_))
    }
}

/// Errors returned by [`Repository`](crate::Repository) implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("short code already exists: {0}")]
    Duplicate(String),
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl From<StorageError> for ShortenerError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::NotFound(code) => Self::NotFound(code),
            other => Self::StorageUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_become_storage_unavailable() {
        let err: ShortenerError = StorageError::Timeout("find".into()).into();
        assert!(matches!(err, ShortenerError::StorageUnavailable(_)));
        assert!(!err.is_caller_error());
    }

    #[test]
    fn storage_not_found_stays_not_found() {
        let err: ShortenerError = StorageError::NotFound("abc".into()).into();
        assert_eq!(err, ShortenerError::NotFound("abc".into()));
        assert!(err.is_caller_error());
    }
}
