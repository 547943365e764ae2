//! Terraform apply engine
//!
//! Runs the terraform CLI in a fixed working directory. Leased credentials
//! reach terraform only through the child process environment, so the
//! server's own environment never holds tenant keys. A child whose future is
//! dropped is killed, so it never outlives the execution slot.

use crate::engine::{ApplyEngine, ExecutionContext};
use crate::error::EngineError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tenantforge_core::TerraformConfig;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Keep error bodies readable; terraform can be very chatty on failure
const MAX_STDERR_BYTES: usize = 4096;

pub struct TerraformEngine {
    binary: PathBuf,
    working_dir: PathBuf,
}

impl TerraformEngine {
    /// Resolve the binary and check the working directory exists
    pub fn new(config: &TerraformConfig) -> Result<Self, EngineError> {
        let binary = which::which(&config.binary).map_err(|_| EngineError::BinaryNotFound {
            path: config.binary.clone(),
        })?;

        if !config.working_dir.is_dir() {
            return Err(EngineError::WorkingDirNotFound {
                path: config.working_dir.clone(),
            });
        }

        debug!("Using terraform at {}", binary.display());
        Ok(Self {
            binary,
            working_dir: config.working_dir.clone(),
        })
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    async fn run(&self, args: &[&str], context: Option<&ExecutionContext>) -> Result<(), EngineError> {
        let command = format!("terraform {}", args.join(" "));
        debug!("Running: {} in {}", command, self.working_dir.display());

        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .current_dir(&self.working_dir)
            .env("TF_IN_AUTOMATION", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(context) = context {
            cmd.envs(context.env_vars());
        }

        let output = cmd.output().await.map_err(|source| EngineError::Spawn {
            command: command.clone(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!("{} output:\n{}", command, stdout.trim_end());
        }

        if !output.status.success() {
            let stderr = tail(&String::from_utf8_lossy(&output.stderr), MAX_STDERR_BYTES);
            warn!("Command failed: {}\nStderr: {}", command, stderr);
            return Err(EngineError::Failed {
                command,
                exit_code: output.status.code(),
                stderr,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl ApplyEngine for TerraformEngine {
    fn name(&self) -> &'static str {
        "terraform"
    }

    async fn init(&self) -> Result<(), EngineError> {
        self.run(&["init", "-upgrade", "-input=false", "-no-color"], None)
            .await?;
        info!("Terraform initialized in {}", self.working_dir.display());
        Ok(())
    }

    async fn apply(&self, context: &ExecutionContext) -> Result<(), EngineError> {
        if context.is_empty() {
            return Err(EngineError::MissingCredentials);
        }
        self.run(
            &["apply", "-auto-approve", "-input=false", "-no-color"],
            Some(context),
        )
        .await
    }
}

/// Last `max` bytes of `s`, cut on a char boundary
fn tail(s: &str, max: usize) -> String {
    let s = s.trim();
    if s.len() <= max {
        return s.to_string();
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &s[start..])
}
