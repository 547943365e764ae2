//! Error types for Vault interactions

use thiserror::Error;

/// Failure talking to the secrets backend
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection, TLS or timeout failure before a response arrived
    #[error("Vault request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Mount rejected because the tenant namespace already exists
    #[error("Mount already exists at '{namespace}'")]
    AlreadyMounted { namespace: String },

    /// Vault answered with a non-2xx status
    #[error("Vault rejected request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// Response body could not be decoded
    #[error("Malformed Vault response: {0}")]
    MalformedResponse(String),

    /// Lease payload lacked a required credential field
    #[error("Malformed lease response: field '{field}' is missing or not a string")]
    MalformedLease { field: &'static str },
}

impl BackendError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    pub fn already_mounted(namespace: impl Into<String>) -> Self {
        Self::AlreadyMounted {
            namespace: namespace.into(),
        }
    }

    /// True when a mount failed because the namespace is taken
    pub fn is_already_mounted(&self) -> bool {
        matches!(self, Self::AlreadyMounted { .. })
    }
}

pub type Result<T> = std::result::Result<T, BackendError>;
