//! The ordered bootstrap sequence.
//!
//! The plan is data: a list of [`Step`]s, each of which carries its own
//! existence guard when executed. Building it touches nothing on disk, so
//! it can be printed or inspected before a run.

use std::fmt;

use serde::Serialize;

use crate::config::{BootstrapConfig, Checkout};
use crate::error::{BootstrapError, BootstrapResult};

/// Provisioning roles, in the order they are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    CoreNetwork,
    CoreUsers,
    CoreSudo,
    CoreDiskmgmt,
}

impl Role {
    pub const ALL: [Self; 4] = [
        Self::CoreNetwork,
        Self::CoreUsers,
        Self::CoreSudo,
        Self::CoreDiskmgmt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CoreNetwork => "core_network",
            Self::CoreUsers => "core_users",
            Self::CoreSudo => "core_sudo",
            Self::CoreDiskmgmt => "core_diskmgmt",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two bootstrap-time repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Repo {
    /// Host inventory, variables and secrets. Cloned with the API key.
    Private,
    /// Playbooks and roles. Cloned anonymously.
    Scripts,
}

/// Why `core_diskmgmt` runs again after the initial role pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// At least one persistent checkout was cloned in this run.
    CheckoutOccurred,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    ValidateInvocation,
    CloneRepo { repo: Repo },
    VerifyHostEntries,
    LinkWorkspace,
    RunRole { role: Role },
    PromoteInventory,
    RequireStore,
    /// Creates the SSH directory and, only when it was created, re-runs
    /// `core_diskmgmt` so it gets bind-mounted.
    EnsureSshDir,
    WriteSshConfig,
    GenerateKey { host: String },
    EnsurePersistentDir,
    Checkout { checkout: Checkout },
    RerunDiskMgmt { when: Trigger },
    RemoveWorkspace,
    Reboot,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidateInvocation => f.write_str("validate invocation"),
            Self::CloneRepo { repo: Repo::Private } => f.write_str("clone private repository"),
            Self::CloneRepo { repo: Repo::Scripts } => f.write_str("clone scripts repository"),
            Self::VerifyHostEntries => f.write_str("verify inventory and host variables"),
            Self::LinkWorkspace => f.write_str("link bootstrap workspace"),
            Self::RunRole { role } => write!(f, "run role {role}"),
            Self::PromoteInventory => f.write_str("promote inventory"),
            Self::RequireStore => f.write_str("require persistent storage"),
            Self::EnsureSshDir => f.write_str("ensure ssh directory"),
            Self::WriteSshConfig => f.write_str("write ssh config"),
            Self::GenerateKey { host } => write!(f, "generate ssh key for {host}"),
            Self::EnsurePersistentDir => f.write_str("ensure persistent directory"),
            Self::Checkout { checkout } => write!(f, "checkout {}", checkout.name),
            Self::RerunDiskMgmt { .. } => f.write_str("re-run core_diskmgmt after checkouts"),
            Self::RemoveWorkspace => f.write_str("remove bootstrap workspace"),
            Self::Reboot => f.write_str("reboot"),
        }
    }
}

/// Ordered list of steps for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub steps: Vec<Step>,
}

impl Plan {
    /// The standard bootstrap sequence for `config`.
    pub fn standard(config: &BootstrapConfig) -> Self {
        let mut steps = vec![
            Step::ValidateInvocation,
            Step::CloneRepo { repo: Repo::Private },
            Step::VerifyHostEntries,
            Step::CloneRepo { repo: Repo::Scripts },
            Step::LinkWorkspace,
        ];
        steps.extend(Role::ALL.into_iter().map(|role| Step::RunRole { role }));
        steps.extend([
            Step::PromoteInventory,
            Step::RequireStore,
            Step::EnsureSshDir,
            Step::WriteSshConfig,
        ]);
        steps.extend(
            config
                .ssh_hosts
                .iter()
                .map(|host| Step::GenerateKey { host: host.clone() }),
        );
        steps.push(Step::EnsurePersistentDir);
        steps.extend(
            config
                .checkouts
                .iter()
                .map(|checkout| Step::Checkout {
                    checkout: checkout.clone(),
                }),
        );
        steps.extend([
            Step::RerunDiskMgmt {
                when: Trigger::CheckoutOccurred,
            },
            Step::RemoveWorkspace,
            Step::Reboot,
        ]);
        Self { steps }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn to_json(&self) -> BootstrapResult<String> {
        serde_json::to_string_pretty(self).map_err(BootstrapError::PlanRender)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
