//! Error types and handling for authtunnel

use thiserror::Error;

/// Result type alias for authtunnel operations
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Main error type for the proxy
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Authentication errors (missing or malformed client credentials)
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Invalid authorization grant or flow state. The message is for logs only;
    /// clients always see a generic `invalid_grant`.
    #[error("Invalid grant: {message}")]
    Grant { message: String },

    /// Connection errors (outbound calls to downstream servers and IdPs)
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// HTTP client errors
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic errors
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ProxyError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create an invalid-grant error
    pub fn grant<S: Into<String>>(message: S) -> Self {
        Self::Grant {
            message: message.into(),
        }
    }

    /// Create a connection error
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Get the error category for logging/metrics
    pub fn category(&self) -> &'static str {
        match self {
            ProxyError::Config { .. } => "config",
            ProxyError::Validation { .. } => "validation",
            ProxyError::Auth { .. } => "auth",
            ProxyError::Grant { .. } => "grant",
            ProxyError::Connection { .. } => "connection",
            ProxyError::Io(_) => "io",
            ProxyError::Serde(_) => "serialization",
            ProxyError::Toml(_) => "toml",
            ProxyError::Http(_) => "http",
            ProxyError::Internal(_) => "internal",
        }
    }
}
