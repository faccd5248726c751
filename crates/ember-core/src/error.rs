//! Error types for ember operations.
//!
//! Only configuration problems, ambiguous requests and storage failures are
//! errors. Degraded signals (a failed embedding call, a vector with the wrong
//! dimension, a pattern with too little history) are modelled as `Option`s in
//! the results and never surface here.

use thiserror::Error;

/// Result type alias for ember operations.
pub type EmberResult<T> = Result<T, EmberError>;

/// Main error type for all ember operations.
#[derive(Error, Debug)]
pub enum EmberError {
    /// Input validation failed for a named field.
    #[error("Validation error on '{field}': {message}")]
    Validation {
        field: String,
        message: String,
        code: ErrorCode,
        suggestion: Option<String>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Provider not supported.
    #[error("Provider not supported: {provider}")]
    UnsupportedProvider { provider: String },

    /// Embedding generation failed.
    #[error("Embedding error: {message}")]
    Embedding {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Storage collaborator failed.
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Network error talking to an external provider.
    #[error("Network error: {message}")]
    Network {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (VAL_xxx)
    ValInvalidInput,
    ValInvalidGroupBy,
    ValOutOfRange,

    // Configuration (CFG_xxx)
    CfgInvalid,
    CfgUnsupportedProvider,

    // Embedding (EMB_xxx)
    EmbGenerationFailed,
    EmbProviderUnavailable,

    // Storage (STO_xxx)
    StoReadFailed,

    // Network (NET_xxx)
    NetConnectionFailed,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValInvalidGroupBy => "VAL_002",
            ErrorCode::ValOutOfRange => "VAL_003",
            ErrorCode::CfgInvalid => "CFG_001",
            ErrorCode::CfgUnsupportedProvider => "CFG_002",
            ErrorCode::EmbGenerationFailed => "EMB_001",
            ErrorCode::EmbProviderUnavailable => "EMB_002",
            ErrorCode::StoReadFailed => "STO_001",
            ErrorCode::NetConnectionFailed => "NET_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl EmberError {
    /// Create a validation error for a field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            suggestion: None,
        }
    }

    /// Create a validation error with suggestion.
    pub fn validation_with_suggestion(
        field: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            suggestion: Some(suggestion.into()),
        }
    }

    /// Create an error for an unrecognised grouping key.
    pub fn invalid_group_by(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::Validation {
            field: "group_by".to_string(),
            message: format!("unknown grouping key '{}'", key),
            code: ErrorCode::ValInvalidGroupBy,
            suggestion: Some(
                "Use one of: experiencer, date, qualities, perspective, similarity".to_string(),
            ),
        }
    }

    /// Create a value out of range error.
    pub fn out_of_range(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
            code: ErrorCode::ValOutOfRange,
            suggestion: None,
        }
    }

    /// Create an embedding error.
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
            code: ErrorCode::EmbGenerationFailed,
            source: None,
        }
    }

    /// Create an error for a provider that is configured but not usable.
    pub fn provider_unavailable(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
            code: ErrorCode::EmbProviderUnavailable,
            source: None,
        }
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            code: ErrorCode::StoReadFailed,
            source: None,
        }
    }

    /// Create an API error.
    pub fn api(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            code: ErrorCode::NetConnectionFailed,
            source: None,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::Configuration(_) => ErrorCode::CfgInvalid,
            Self::UnsupportedProvider { .. } => ErrorCode::CfgUnsupportedProvider,
            Self::Embedding { code, .. } => *code,
            Self::Storage { code, .. } => *code,
            Self::Network { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::UnsupportedProvider { .. } => {
                Some("Supported embedding providers are: none, openai, ollama, voyage")
            }
            Self::Embedding { .. } => Some("Please check your embedding provider configuration"),
            Self::Storage { .. } => Some("Please check the storage backend is reachable"),
            _ => None,
        }
    }

    /// Whether this error belongs to the fail-fast configuration class.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::UnsupportedProvider { .. } | Self::Validation { .. }
        )
    }
}
