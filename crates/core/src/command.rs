//! External command descriptions.
//!
//! A [`CommandSpec`] is plain data: what to run, as whom, and which
//! substrings must be masked whenever the command is shown. Runners turn it
//! into a real process.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::invocation::Secret;

/// Shown in place of redacted values.
const REDACTED: &str = "***";

/// One external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Human-readable label used in logs and error messages.
    pub label: String,
    pub program: String,
    pub args: Vec<String>,
    /// Extra environment variables for the child.
    pub env: Vec<(String, String)>,
    /// Run as this user instead of the invoking one.
    pub run_as: Option<String>,
    redactions: Vec<String>,
}

impl CommandSpec {
    pub fn new(label: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            run_as: None,
            redactions: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn run_as(mut self, user: impl Into<String>) -> Self {
        self.run_as = Some(user.into());
        self
    }

    /// Mask `secret` wherever this command is displayed.
    pub fn redact(mut self, secret: &Secret) -> Self {
        if !secret.expose().is_empty() {
            self.redactions.push(secret.expose().to_string());
        }
        self
    }

    /// The command line as it is safe to print.
    pub fn display(&self) -> String {
        self.to_string()
    }

    fn mask(&self, text: &str) -> String {
        self.redactions
            .iter()
            .fold(text.to_string(), |acc, secret| acc.replace(secret, REDACTED))
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(user) = &self.run_as {
            write!(f, "[as {user}] ")?;
        }
        for (key, value) in &self.env {
            write!(f, "{key}={} ", self.mask(value))?;
        }
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", self.mask(arg))?;
        }
        Ok(())
    }
}

/// Result of a finished command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    /// Process exit code (`None` if killed by a signal).
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
