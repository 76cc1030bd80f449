//! Error types for the cache layer
//!
//! Capacity pressure and expiry are never errors: reads simply come back empty.
//! The only failure the caches report is a bad configuration at construction time.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for cache construction and configuration loading.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A cache policy or configuration value was rejected
    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),
}

impl CacheError {
    /// Shorthand for building an [`CacheError::InvalidConfig`].
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        CacheError::InvalidConfig(msg.into())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_message() {
        let err = CacheError::invalid_config("max_size must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid cache configuration: max_size must be positive"
        );
    }
}
