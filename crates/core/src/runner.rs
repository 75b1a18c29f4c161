//! Process execution.
//!
//! [`CommandRunner`] is the seam between the bootstrap sequence and the
//! machine. [`SystemRunner`] spawns real processes; tests substitute a
//! recording fake.

use std::future::Future;
use std::process::Stdio;
use std::time::Instant;

use tokio::process::Command;

use crate::command::{CommandOutcome, CommandSpec};
use crate::error::{BootstrapError, BootstrapResult};

/// Runs one external command to completion.
pub trait CommandRunner: Send + Sync {
    /// Spawn `spec` and wait for it. A non-zero exit is an `Ok` outcome;
    /// only failing to start or wait on the process is an error.
    fn run(
        &self,
        spec: &CommandSpec,
    ) -> impl Future<Output = BootstrapResult<CommandOutcome>> + Send;
}

/// Run `spec` and turn a non-zero exit into [`BootstrapError::CommandFailed`].
pub async fn run_checked<R: CommandRunner>(
    runner: &R,
    spec: &CommandSpec,
) -> BootstrapResult<CommandOutcome> {
    tracing::info!(label = %spec.label, command = %spec, "Running");
    let outcome = runner.run(spec).await?;
    if outcome.success() {
        tracing::debug!(label = %spec.label, duration_ms = outcome.duration_ms, "Command succeeded");
        Ok(outcome)
    } else {
        tracing::error!(
            label = %spec.label,
            exit_code = ?outcome.exit_code,
            duration_ms = outcome.duration_ms,
            "Command failed",
        );
        Err(BootstrapError::CommandFailed {
            label: spec.label.clone(),
            command: spec.display(),
            exit_code: outcome.exit_code,
        })
    }
}

/// Runner backed by real child processes.
///
/// Output is inherited so the operator sees clone progress and role output
/// live. Commands with `run_as` go through `sudo -u <user> -H`; their extra
/// environment is passed with `env` on the far side of sudo, which would
/// otherwise drop it.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    fn build(spec: &CommandSpec) -> Command {
        match &spec.run_as {
            Some(user) => {
                let mut cmd = Command::new("sudo");
                cmd.args(["-u", user.as_str(), "-H", "--"]);
                if !spec.env.is_empty() {
                    cmd.arg("env");
                    for (key, value) in &spec.env {
                        cmd.arg(format!("{key}={value}"));
                    }
                }
                cmd.arg(&spec.program).args(&spec.args);
                cmd
            }
            None => {
                let mut cmd = Command::new(&spec.program);
                cmd.args(&spec.args);
                for (key, value) in &spec.env {
                    cmd.env(key, value);
                }
                cmd
            }
        }
    }
}

impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> BootstrapResult<CommandOutcome> {
        let mut cmd = Self::build(spec);
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let start = Instant::now();
        let status = cmd
            .status()
            .await
            .map_err(|source| BootstrapError::Spawn {
                label: spec.label.clone(),
                program: spec.program.clone(),
                source,
            })?;

        Ok(CommandOutcome {
            exit_code: status.code(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
