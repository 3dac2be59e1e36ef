//! Error types for the board engine

use thiserror::Error;

/// Result type for board operations
pub type Result<T> = std::result::Result<T, BoardError>;

/// Errors that can occur in board operations
#[derive(Debug, Clone, Error)]
pub enum BoardError {
    /// Item not found
    #[error("item not found: {id}")]
    ItemNotFound { id: String },

    /// Container not found
    #[error("container not found: {id}")]
    ContainerNotFound { id: String },

    /// Duplicate ID
    #[error("duplicate {item_type} ID: {id}")]
    DuplicateId { item_type: String, id: String },

    /// A snapshot broke one of the membership invariants
    #[error("invariant violated: {message}")]
    InvariantViolation { message: String },

    /// The remote store refused the request
    #[error("rejected by store: {message}")]
    Rejected { message: String },

    /// The remote store could not be reached
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    /// The remote store did not answer in time
    #[error("request timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// Configuration could not be loaded or is invalid
    #[error("configuration error: {message}")]
    Config { message: String },

    /// IO error
    #[error("IO error: {message}")]
    Io { message: String },

    /// JSON serialization error
    #[error("JSON error: {message}")]
    Json { message: String },
}

impl BoardError {
    /// Create an item-not-found error
    pub fn item_not_found(id: impl Into<String>) -> Self {
        Self::ItemNotFound { id: id.into() }
    }

    /// Create a container-not-found error
    pub fn container_not_found(id: impl Into<String>) -> Self {
        Self::ContainerNotFound { id: id.into() }
    }

    /// Create a duplicate ID error
    pub fn duplicate_id(item_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::DuplicateId {
            item_type: item_type.into(),
            id: id.into(),
        }
    }

    /// Create an invariant violation error
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Create a rejection error
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Create an unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

impl From<std::io::Error> for BoardError {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for BoardError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json {
            message: error.to_string(),
        }
    }
}

impl From<figment::Error> for BoardError {
    fn from(error: figment::Error) -> Self {
        Self::Config {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BoardError::ItemNotFound {
            id: "abc123".into(),
        };
        assert_eq!(err.to_string(), "item not found: abc123");
        assert_eq!(
            BoardError::Timeout { elapsed_ms: 50 }.to_string(),
            "request timed out after 50ms"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(BoardError::unavailable("connection reset").is_retryable());
        assert!(BoardError::Timeout { elapsed_ms: 10 }.is_retryable());
        assert!(!BoardError::rejected("stale column").is_retryable());
        assert!(!BoardError::item_not_found("x").is_retryable());
    }
}
