//! Error types and handling for the discharge controller
//!
//! Missing data is not an error here: it travels as `Option::None` through the
//! decision pipeline. The variants below cover configuration problems detected
//! at activation time and failures reported by collaborators.

use thiserror::Error;

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, DischargeError>;

/// Main error type for the discharge controller
#[derive(Debug, Error)]
pub enum DischargeError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// A predictor, tariff or ESS collaborator failed
    #[error("Collaborator error: {component} - {message}")]
    Collaborator { component: String, message: String },
}

impl DischargeError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        DischargeError::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<F: Into<String>, S: Into<String>>(field: F, message: S) -> Self {
        DischargeError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        DischargeError::Io {
            message: message.into(),
        }
    }

    /// Create a new collaborator error
    pub fn collaborator<C: Into<String>, S: Into<String>>(component: C, message: S) -> Self {
        DischargeError::Collaborator {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Whether the error is fatal for activation (as opposed to a per-cycle failure)
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DischargeError::Config { .. } | DischargeError::Validation { .. }
        )
    }
}

impl From<std::io::Error> for DischargeError {
    fn from(err: std::io::Error) -> Self {
        DischargeError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for DischargeError {
    fn from(err: serde_yaml::Error) -> Self {
        DischargeError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for DischargeError {
    fn from(err: serde_json::Error) -> Self {
        DischargeError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<chrono::ParseError> for DischargeError {
    fn from(err: chrono::ParseError) -> Self {
        DischargeError::validation("datetime", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = DischargeError::config("test config error");
        assert!(matches!(err, DischargeError::Config { .. }));

        let err = DischargeError::collaborator("ess0", "capacity unavailable");
        assert!(matches!(err, DischargeError::Collaborator { .. }));

        let err = DischargeError::validation("field", "test validation error");
        assert!(matches!(err, DischargeError::Validation { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = DischargeError::config("test error");
        assert_eq!(format!("{}", err), "Configuration error: test error");

        let err = DischargeError::validation("window", "start equals end");
        assert_eq!(
            format!("{}", err),
            "Validation error: window - start equals end"
        );

        let err = DischargeError::collaborator("predictor0", "timeout");
        assert_eq!(
            format!("{}", err),
            "Collaborator error: predictor0 - timeout"
        );
    }

    #[test]
    fn configuration_errors_are_flagged() {
        assert!(DischargeError::config("x").is_configuration());
        assert!(DischargeError::validation("f", "m").is_configuration());
        assert!(!DischargeError::collaborator("c", "m").is_configuration());
        assert!(!DischargeError::io("x").is_configuration());
    }
}
