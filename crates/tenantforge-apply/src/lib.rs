//! Terraform apply orchestration for tenantforge
//!
//! Leases per-tenant AWS keys, injects them into the apply engine's
//! execution context, waits for AWS to accept them, then applies.

pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod terraform;

pub use engine::{ApplyEngine, ExecutionContext, ACCESS_KEY_VAR, SECRET_KEY_VAR};
pub use error::{ApplyError, ApplyStage, EngineError};
pub use orchestrator::{ApplyOrchestrator, ApplyReport};
pub use terraform::TerraformEngine;
