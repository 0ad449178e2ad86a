//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating a `strata.toml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed into the configuration types.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A value is outside its permitted range.
    #[error("invalid value for {field}: {reason}")]
    ValidationError {
        /// Dotted path of the offending field, e.g. `placer.timing_tradeoff`.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
