//! Error types and handling for the budget estimator

use thiserror::Error;

/// Main error type for the `travelbudget` crate
#[derive(Error, Debug)]
pub enum TravelBudgetError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Input validation errors. The only error a caller of the estimator sees.
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Rate-rule store errors
    #[error("Store error: {message}")]
    Store { message: String },
}

impl TravelBudgetError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new store error
    pub fn store<S: Into<String>>(message: S) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// True for malformed caller input
    #[must_use]
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            TravelBudgetError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            TravelBudgetError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            TravelBudgetError::Store { .. } => {
                "Rate rule store unavailable. Please check the store location.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = TravelBudgetError::config("missing API key");
        assert!(matches!(config_err, TravelBudgetError::Config { .. }));

        let validation_err = TravelBudgetError::validation("party size must be positive");
        assert!(validation_err.is_invalid_request());

        let store_err = TravelBudgetError::store("keyspace closed");
        assert!(!store_err.is_invalid_request());
    }

    #[test]
    fn test_user_messages() {
        let config_err = TravelBudgetError::config("test");
        assert!(config_err.user_message().contains("Configuration error"));

        let validation_err = TravelBudgetError::validation("unknown season 'monsoon'");
        assert!(validation_err.user_message().contains("monsoon"));

        let store_err = TravelBudgetError::store("keyspace closed");
        assert!(store_err.user_message().contains("store unavailable"));
    }
}
