//! HTTP routes
//!
//! Every tenant route takes the organization id from the path. Provisioning
//! routes hold the tenant's lock for their duration; `run-tf` relies on the
//! orchestrator's own serialization and runs on its own task.

use crate::error::AppError;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tenantforge_core::OrganizationId;
use tenantforge_secrets::{Lease, RootCredential};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/initialize/{organization}", post(initialize))
        .route("/configure/{organization}", post(configure))
        .route(
            "/generate-credentials/{organization}",
            post(generate_credentials),
        )
        .route("/run-tf/{organization}", post(run_terraform))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Root credential submitted to `/configure`. `aws_secret_key` carries the
/// root access key id.
#[derive(Deserialize)]
struct ConfigureRequest {
    aws_secret_key: String,
    secret_key: String,
    region: String,
}

impl From<ConfigureRequest> for RootCredential {
    fn from(value: ConfigureRequest) -> Self {
        RootCredential::new(value.aws_secret_key, value.secret_key, value.region)
    }
}

/// Lease fields returned by `/generate-credentials`
#[derive(Serialize)]
struct CredentialsResponse {
    access_key: String,
    secret_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    security_token: Option<String>,
    lease_id: String,
    lease_duration: u64,
    renewable: bool,
}

impl From<&Lease> for CredentialsResponse {
    fn from(lease: &Lease) -> Self {
        Self {
            access_key: lease.access_key.as_str().to_string(),
            secret_key: lease.secret_key.as_str().to_string(),
            security_token: lease.security_token.as_ref().map(|t| t.as_str().to_string()),
            lease_id: lease.lease_id.clone(),
            lease_duration: lease.ttl.as_secs(),
            renewable: lease.renewable,
        }
    }
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn initialize(
    State(state): State<AppState>,
    Path(organization): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let org = OrganizationId::parse(organization)?;
    let _guard = state.locks.acquire(&org.namespace()).await;

    state.provisioning.mount(&org).await?;
    Ok("Organization mounted")
}

async fn configure(
    State(state): State<AppState>,
    Path(organization): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let org = OrganizationId::parse(organization)?;
    let request: ConfigureRequest = serde_json::from_slice(&body).map_err(|e| {
        debug!(organization = %org, "Rejecting configure body: {}", e);
        AppError::invalid_request()
    })?;

    let _guard = state.locks.acquire(&org.namespace()).await;
    state.provisioning.configure(&org, request.into()).await?;
    Ok("AWS configured")
}

async fn generate_credentials(
    State(state): State<AppState>,
    Path(organization): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let org = OrganizationId::parse(organization)?;
    let lease = state
        .leases
        .issue(&org.namespace(), org.role_name())
        .await?;

    Ok(Json(CredentialsResponse::from(&lease)))
}

async fn run_terraform(
    State(state): State<AppState>,
    Path(organization): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let org = OrganizationId::parse(organization)?;

    // Detached from the request so a client disconnect cannot cut a run
    // short while it holds the execution slot
    let orchestrator = state.orchestrator.clone();
    let report = tokio::spawn(async move { orchestrator.run(&org).await })
        .await
        .map_err(|e| AppError::Internal(format!("apply task failed: {}", e)))??;

    info!(
        organization = %report.organization,
        lease_id = %report.lease_id,
        "Terraform applied after {:?} propagation wait",
        report.propagation_wait
    );
    Ok("terraform applied")
}
