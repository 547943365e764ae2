//! HTTP error mapping
//!
//! Handlers return library errors through `AppError`. Everything the caller
//! or Vault got wrong is a 400 carrying the error text; failures of the apply
//! engine itself are a 500 so they are not mistaken for tenant mistakes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tenantforge_apply::ApplyError;
use tenantforge_secrets::{BackendError, ProvisionError};
use thiserror::Error;
use tracing::error;

/// Body sent when a request body cannot be decoded
pub const INVALID_REQUEST: &str = "Invalid Request";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn invalid_request() -> Self {
        AppError::BadRequest(INVALID_REQUEST.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        }
        (status, self.to_string()).into_response()
    }
}

impl From<tenantforge_core::Error> for AppError {
    fn from(value: tenantforge_core::Error) -> Self {
        AppError::BadRequest(value.to_string())
    }
}

impl From<BackendError> for AppError {
    fn from(value: BackendError) -> Self {
        AppError::BadRequest(value.to_string())
    }
}

impl From<ProvisionError> for AppError {
    fn from(value: ProvisionError) -> Self {
        AppError::BadRequest(value.to_string())
    }
}

impl From<ApplyError> for AppError {
    fn from(value: ApplyError) -> Self {
        if value.is_engine_failure() {
            AppError::Internal(value.to_string())
        } else {
            AppError::BadRequest(value.to_string())
        }
    }
}
