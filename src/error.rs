//! ═══════════════════════════════════════════════════════════════════════════════
//! ERROR — Unified Error Type for Keel
//! ═══════════════════════════════════════════════════════════════════════════════
//! Centralized error handling for the fallible edges (config, snapshot
//! encoding). Domain rejections and missing-id lookups are values, not errors.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::fmt;

/// The unified error type for the Keel crate
#[derive(Debug)]
pub enum KeelError {
    /// I/O error (config files, journal paths)
    Io(std::io::Error),
    /// JSON serialization/deserialization error
    Json(serde_json::Error),
    /// Configuration error
    Config(ConfigError),
    /// Validation error
    Validation(ValidationError),
    /// Internal error (should not happen)
    Internal(String),
}

impl std::error::Error for KeelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KeelError::Io(e) => Some(e),
            KeelError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for KeelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeelError::Io(e) => write!(f, "I/O error: {}", e),
            KeelError::Json(e) => write!(f, "JSON error: {}", e),
            KeelError::Config(e) => write!(f, "Configuration error: {}", e),
            KeelError::Validation(e) => write!(f, "Validation error: {}", e),
            KeelError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl From<std::io::Error> for KeelError {
    fn from(err: std::io::Error) -> Self {
        KeelError::Io(err)
    }
}

impl From<serde_json::Error> for KeelError {
    fn from(err: serde_json::Error) -> Self {
        KeelError::Json(err)
    }
}

/// Configuration-specific errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Missing required field
    MissingField(String),
    /// Invalid value
    InvalidValue { field: String, message: String },
    /// File not found
    FileNotFound(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingField(field) => write!(f, "Missing required field: {}", field),
            ConfigError::InvalidValue { field, message } => {
                write!(f, "Invalid value for '{}': {}", field, message)
            }
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {}", path),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for KeelError {
    fn from(err: ConfigError) -> Self {
        KeelError::Config(err)
    }
}

/// Validation-specific errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    /// Input validation failed
    InvalidInput { field: String, message: String },
    /// Invariant violation (capacity exceeded, metric outside bounds)
    InvariantViolation(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidInput { field, message } => {
                write!(f, "Invalid input for '{}': {}", field, message)
            }
            ValidationError::InvariantViolation(msg) => {
                write!(f, "Invariant violation: {}", msg)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for KeelError {
    fn from(err: ValidationError) -> Self {
        KeelError::Validation(err)
    }
}

/// Type alias for Result with KeelError
pub type KeelResult<T> = Result<T, KeelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KeelError::Config(ConfigError::MissingField("capacity".to_string()));
        assert!(err.to_string().contains("capacity"));

        let err = KeelError::Validation(ValidationError::InvariantViolation(
            "ring length exceeds capacity".to_string(),
        ));
        assert!(err.to_string().contains("capacity"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let keel_err: KeelError = io_err.into();
        assert!(matches!(keel_err, KeelError::Io(_)));
    }
}
