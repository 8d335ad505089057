use thiserror::Error;

/// Main error type for shard log retrieval
#[derive(Debug, Error)]
pub enum ShardLogError {
    // Raised before any I/O is attempted
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid configuration file: {0}")]
    InvalidConfig(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // Retrieval errors
    #[error("Failed to list shards under '{prefix}': {reason}")]
    Listing { prefix: String, reason: String },

    #[error("Failed to fetch shard '{key}': {reason}")]
    Fetch { key: String, reason: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid log path: {0}")]
    InvalidLogPath(String),

    // IO errors (automatically converted from std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`ShardLogError`]
///
/// Lets callers tell "cannot even attempt" apart from "attempted and failed"
/// without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Listing,
    Fetch,
    Cancelled,
    Io,
}

impl ShardLogError {
    pub fn listing(prefix: impl Into<String>, reason: impl ToString) -> Self {
        Self::Listing {
            prefix: prefix.into(),
            reason: reason.to_string(),
        }
    }

    pub fn fetch(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_)
            | Self::InvalidConfig(_)
            | Self::ConfigValidationError(_)
            | Self::InvalidLogPath(_) => ErrorKind::Configuration,
            Self::Listing { .. } => ErrorKind::Listing,
            Self::Fetch { .. } => ErrorKind::Fetch,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

/// Result type alias for shardlog operations
pub type Result<T> = std::result::Result<T, ShardLogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_distinct() {
        assert_eq!(
            ShardLogError::Configuration("no key".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            ShardLogError::listing("logs/", "boom").kind(),
            ErrorKind::Listing
        );
        assert_eq!(ShardLogError::fetch("logs/a", "boom").kind(), ErrorKind::Fetch);
        assert_eq!(ShardLogError::Cancelled.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_fetch_error_names_key() {
        let err = ShardLogError::fetch("logs/2024/3-file", "access denied");
        assert_eq!(
            err.to_string(),
            "Failed to fetch shard 'logs/2024/3-file': access denied"
        );
    }
}
