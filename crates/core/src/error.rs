use std::path::PathBuf;

/// Broad failure category. Every class is fatal; the class only decides
/// the process exit code and how the failure is labeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Missing or malformed arguments, or invalid configuration.
    Usage,
    /// The machine or the private repository is not in the expected shape.
    Precondition,
    /// An external command or filesystem primitive failed.
    Command,
}

/// Errors raised while parsing configuration overrides.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must contain the {{api_key}} placeholder")]
    MissingPlaceholder { var: &'static str },

    #[error("{var} must not be empty")]
    Empty { var: &'static str },

    #[error("{var} is set but is not valid UTF-8")]
    NotUnicode { var: &'static str },

    #[error("{var} must be an absolute path, got '{value}'")]
    RelativePath { var: &'static str, value: String },

    #[error("{var} entry '{entry}' is malformed: {reason}")]
    MalformedEntry {
        var: &'static str,
        entry: String,
        reason: &'static str,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Usage: {0}")]
    Usage(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("No inventory entry for '{server}' at {}", .path.display())]
    MissingInventory { server: String, path: PathBuf },

    #[error("No host variables for '{server}' at {}", .path.display())]
    MissingHostVars { server: String, path: PathBuf },

    #[error("Persistent storage mount point {} does not exist", .path.display())]
    MissingStore { path: PathBuf },

    #[error("{label} failed (exit code {exit_code:?}): {command}")]
    CommandFailed {
        label: String,
        command: String,
        exit_code: Option<i32>,
    },

    #[error("{label}: could not start '{program}': {source}")]
    Spawn {
        label: String,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not render the plan as JSON: {0}")]
    PlanRender(#[source] serde_json::Error),

    #[error("{context} {}: {source}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias used across the crate.
pub type BootstrapResult<T> = Result<T, BootstrapError>;

impl BootstrapError {
    /// Wrap an I/O error with the operation and path it belongs to.
    pub fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.into(),
            source,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Usage(_) | Self::Config(_) => ErrorClass::Usage,
            Self::MissingInventory { .. } | Self::MissingHostVars { .. } | Self::MissingStore { .. } => {
                ErrorClass::Precondition
            }
            Self::CommandFailed { .. }
            | Self::Spawn { .. }
            | Self::PlanRender(_)
            | Self::Io { .. } => ErrorClass::Command,
        }
    }

    /// Process exit code for this failure. Usage errors match clap's `2`.
    pub fn exit_code(&self) -> i32 {
        match self.class() {
            ErrorClass::Usage => 2,
            ErrorClass::Precondition | ErrorClass::Command => 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
