// ! Error types for soak
// !
// ! Module defines all error types that can occur while querying the plugin
// ! repository, resolving dependencies and writing artifacts.

use thiserror::Error;

/// The main error type for soak
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SoakError {
    /// A plugin or dependency is absent from the remote repository
    #[error("Not found: {0}")]
    NotFound(String),

    /// A version string could not be parsed
    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    /// Network or service call failure (connection refused, reset, timeout)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The repository answered with an unexpected HTTP status
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(String),

    /// Operator input was rejected before any work was scheduled
    #[error("Validation error: {0}")]
    Validation(String),

    /// Local filesystem errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON / YAML serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(String),

    /// Downloaded archive is unreadable or holds no entries
    #[error("Archive error: {0}")]
    Archive(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors that shouldn't normally occur
    #[error("Internal error: {0}")]
    Internal(String),
}

// Manual From implementations for types that don't implement Clone
impl From<serde_json::Error> for SoakError {
    fn from(err: serde_json::Error) -> Self {
        SoakError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for SoakError {
    fn from(err: serde_yaml::Error) -> Self {
        SoakError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for SoakError {
    fn from(err: std::io::Error) -> Self {
        SoakError::Io(err.to_string())
    }
}

impl From<url::ParseError> for SoakError {
    fn from(err: url::ParseError) -> Self {
        SoakError::Url(err.to_string())
    }
}

impl From<chrono::ParseError> for SoakError {
    fn from(err: chrono::ParseError) -> Self {
        SoakError::Serialization(format!("invalid timestamp: {err}"))
    }
}

/// Result type alias for soak operations
pub type SoakResult<T> = Result<T, SoakError>;

impl SoakError {
    /// Create a new not-found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new archive error
    pub fn archive<S: Into<String>>(message: S) -> Self {
        Self::Archive(message.into())
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors may succeed when the same operation is issued
    /// again later; nothing in soak retries automatically.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SoakError::Transport(_) => true,
            #[cfg(feature = "http")]
            SoakError::Http(_) => true,
            SoakError::Io(_) => true,
            SoakError::NotFound(_) => false,
            SoakError::InvalidVersion(_) => false,
            SoakError::Validation(_) => false,
            SoakError::Serialization(_) => false,
            SoakError::Url(_) => false,
            SoakError::Archive(_) => false,
            SoakError::Config(_) => false,
            SoakError::Internal(_) => false,
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            SoakError::NotFound(_) => "not_found",
            SoakError::InvalidVersion(_) => "version",
            SoakError::Transport(_) => "transport",
            #[cfg(feature = "http")]
            SoakError::Http(_) => "http",
            SoakError::Validation(_) => "validation",
            SoakError::Io(_) => "io",
            SoakError::Serialization(_) => "serialization",
            SoakError::Url(_) => "validation",
            SoakError::Archive(_) => "archive",
            SoakError::Config(_) => "config",
            SoakError::Internal(_) => "internal",
        }
    }
}

// Connection-level failures are transport errors, status failures are HTTP errors
#[cfg(feature = "http")]
impl From<reqwest::Error> for SoakError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            SoakError::Transport(err.to_string())
        } else if err.is_decode() {
            SoakError::Serialization(err.to_string())
        } else {
            SoakError::Http(err.to_string())
        }
    }
}

#[cfg(feature = "http")]
impl From<zip::result::ZipError> for SoakError {
    fn from(err: zip::result::ZipError) -> Self {
        SoakError::Archive(err.to_string())
    }
}
