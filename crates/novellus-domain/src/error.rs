//! Error handling types

use thiserror::Error;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the Novellus AI-content core
#[derive(Error, Debug)]
pub enum Error {
    /// Vector dimension disagrees with the configured schema dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    Dimension {
        /// Dimension the schema expects
        expected: usize,
        /// Dimension actually supplied
        actual: usize,
    },

    /// Model identifier not present in the configuration
    #[error("Unknown model: {model}")]
    UnknownModel {
        /// The unresolvable model identifier
        model: String,
    },

    /// Capability requested that no configured model declares
    #[error("Unknown capability: {capability}")]
    UnknownCapability {
        /// The unresolvable capability name
        capability: String,
    },

    /// Malformed prompt, oversize input, or content-policy refusal
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of what made the request invalid
        message: String,
    },

    /// Transport failure, 5xx, or network error from a provider
    #[error("Provider '{provider}' unavailable: {message}")]
    ProviderUnavailable {
        /// Provider that failed
        provider: String,
        /// Description of the failure
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Local admission rejection or provider 429
    #[error("Rate limited for model '{model}'")]
    RateLimited {
        /// Model whose budget is exhausted
        model: String,
        /// Milliseconds until the earliest admission, when known
        retry_after_ms: Option<u64>,
    },

    /// Per-call or per-request deadline exceeded
    #[error("Timeout after {elapsed_ms}ms ({scope})")]
    Timeout {
        /// Which deadline fired ("call" or "request")
        scope: &'static str,
        /// Milliseconds elapsed when the deadline fired
        elapsed_ms: u64,
    },

    /// No model passed capability filter + admission within the deadline
    #[error("No eligible model for capability '{capability}'")]
    NoEligibleModel {
        /// The capability that could not be served
        capability: String,
    },

    /// Retry budget consumed; carries the last underlying cause
    #[error("All models exhausted after {attempts} attempts (tried: {})", tried.join(", "))]
    AllModelsExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Models tried, in order
        tried: Vec<String>,
        /// Last underlying error
        #[source]
        last: Box<Error>,
    },

    /// Request cancelled via its cancellation token
    #[error("Request cancelled")]
    Cancelled,

    /// Vector store or cache backend error
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage failure
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Embedding provider operation error
    #[error("Embedding provider error: {message}")]
    Embedding {
        /// Description of the embedding failure
        message: String,
    },

    /// Configuration-related error
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Missing configuration field
    #[error("Missing configuration: {0}")]
    ConfigMissing(String),

    /// Invalid configuration value
    #[error("Invalid configuration for '{key}': {message}")]
    ConfigInvalid {
        /// The configuration key that is invalid
        key: String,
        /// Reason why it is invalid
        message: String,
    },

    /// Invalid argument provided to a function
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument
        message: String,
    },

    /// JSON parsing or serialization error
    #[error("JSON parsing error: {source}")]
    Json {
        /// The underlying JSON error
        #[from]
        source: serde_json::Error,
    },

    /// I/O operation error
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error
        #[from]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a dimension mismatch error
    pub fn dimension(expected: usize, actual: usize) -> Self {
        Self::Dimension { expected, actual }
    }

    /// Create an unknown model error
    pub fn unknown_model<S: Into<String>>(model: S) -> Self {
        Self::UnknownModel {
            model: model.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an embedding provider error
    pub fn embedding<S: Into<String>>(message: S) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    /// Create a provider-unavailable error
    pub fn provider_unavailable<P: Into<String>, S: Into<String>>(provider: P, message: S) -> Self {
        Self::ProviderUnavailable {
            provider: provider.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a provider-unavailable error with source
    pub fn provider_unavailable_with_source<
        P: Into<String>,
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    >(
        provider: P,
        message: S,
        source: E,
    ) -> Self {
        Self::ProviderUnavailable {
            provider: provider.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a rate limited error
    pub fn rate_limited<S: Into<String>>(model: S, retry_after_ms: Option<u64>) -> Self {
        Self::RateLimited {
            model: model.into(),
            retry_after_ms,
        }
    }

    /// Create a storage error
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Create a storage error with source
    pub fn storage_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        message: S,
        source: E,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with source
    pub fn configuration_with_source<
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    >(
        message: S,
        source: E,
    ) -> Self {
        Self::Configuration {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether a failed attempt with this error may be retried on another
    /// model (or the same model after its window refills).
    ///
    /// `Storage` is retryable once for reads; that single-retry policy is
    /// enforced by the vector store, not here.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable { .. }
                | Self::RateLimited { .. }
                | Self::Timeout { .. }
                | Self::Storage { .. }
        )
    }
}
