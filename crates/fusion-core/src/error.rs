//! Error types for the fusion engine.

use thiserror::Error;

/// Result type alias using FusionError.
pub type Result<T> = std::result::Result<T, FusionError>;

/// Errors that can occur around hybrid result fusion.
///
/// The fusion pass itself never fails on data content; these errors come from
/// configuration, input loading and the provider orchestration around it.
#[derive(Error, Debug)]
pub enum FusionError {
    /// Invalid fusion configuration.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid argument provided.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// An upstream search provider failed.
    #[error("Provider {provider} failed: {message}")]
    Provider { provider: String, message: String },

    /// An upstream search provider did not answer in time.
    #[error("Provider {provider} timed out after {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FusionError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a provider error.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Get the stable error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "CONFIG_ERROR",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::Provider { .. } => "PROVIDER_ERROR",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Whether this error came from configuration validation.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}
