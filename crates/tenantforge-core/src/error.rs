//! Error types for tenantforge-core

use thiserror::Error;

/// Result type alias using tenantforge-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for tenantforge
#[derive(Error, Debug)]
pub enum Error {
    /// Organization identifier rejected by the path resolver
    #[error("Invalid organization identifier: {reason}")]
    InvalidOrganization { reason: String },

    /// Invalid configuration value
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Missing required configuration field
    #[error("Missing required field: {field}")]
    MissingField { field: String },
}

impl Error {
    /// Create an invalid organization error
    pub fn invalid_organization(reason: impl Into<String>) -> Self {
        Self::InvalidOrganization {
            reason: reason.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}
