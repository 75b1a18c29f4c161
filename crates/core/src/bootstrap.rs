//! Plan execution.
//!
//! [`Bootstrapper`] walks a [`Plan`] top to bottom and stops at the first
//! failure. Nothing is rolled back: every step is guarded by an existence
//! check, so re-running with the same parameters resumes where the last
//! run stopped.

use std::path::Path;

use serde::Serialize;

use crate::command::CommandSpec;
use crate::config::{BootstrapConfig, Checkout};
use crate::ensure::{self, Ensure};
use crate::error::{BootstrapError, BootstrapResult};
use crate::gate::{Confirm, KeyPrompt};
use crate::invocation::Invocation;
use crate::layout::Layout;
use crate::plan::{Plan, Repo, Role, Step, Trigger};
use crate::runner::{run_checked, CommandRunner};
use crate::ssh;

/// Permissions of the per-user SSH directory.
const SSH_DIR_MODE: u32 = 0o700;
/// Permissions of the SSH client config.
const SSH_CONFIG_MODE: u32 = 0o600;
/// Permissions of the persistent automation directory.
const PERSISTENT_DIR_MODE: u32 = 0o750;

/// Accepts unknown host keys on first contact only; the persistent
/// checkouts run unattended after the key gates.
const GIT_SSH_COMMAND: &str = "ssh -o StrictHostKeyChecking=accept-new";

/// What a single step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// Unguarded work that always runs (roles, checks, copy, reboot).
    Ran,
    /// The guarded target was missing and has been created.
    Created,
    /// The guarded target already existed; nothing was done.
    AlreadyPresent,
    /// A conditional step whose condition did not hold.
    Skipped,
}

impl From<Ensure> for StepOutcome {
    fn from(value: Ensure) -> Self {
        match value {
            Ensure::Created => Self::Created,
            Ensure::AlreadyPresent => Self::AlreadyPresent,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub step: Step,
    pub outcome: StepOutcome,
}

/// Per-step outcomes of a completed run, in execution order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub steps: Vec<StepRecord>,
    /// How many times `core_diskmgmt` was applied.
    pub diskmgmt_runs: usize,
}

impl RunReport {
    pub fn count(&self, outcome: StepOutcome) -> usize {
        self.steps.iter().filter(|r| r.outcome == outcome).count()
    }

    pub fn outcome_of(&self, step: &Step) -> Option<StepOutcome> {
        self.steps
            .iter()
            .find(|r| &r.step == step)
            .map(|r| r.outcome)
    }
}

/// Conditions collected while the plan runs.
#[derive(Debug, Default)]
struct RunState {
    checkout_occurred: bool,
}

/// Executes bootstrap plans against one invocation.
pub struct Bootstrapper<'a, R, C> {
    config: &'a BootstrapConfig,
    invocation: &'a Invocation,
    layout: Layout,
    runner: &'a R,
    confirm: &'a C,
}

impl<'a, R, C> Bootstrapper<'a, R, C>
where
    R: CommandRunner,
    C: Confirm,
{
    pub fn new(
        config: &'a BootstrapConfig,
        invocation: &'a Invocation,
        runner: &'a R,
        confirm: &'a C,
    ) -> Self {
        Self {
            config,
            invocation,
            layout: Layout::new(config.root.clone()),
            runner,
            confirm,
        }
    }

    /// Run every step of `plan` in order, stopping at the first error.
    pub async fn run(&self, plan: &Plan) -> BootstrapResult<RunReport> {
        let mut report = RunReport::default();
        let mut state = RunState::default();

        tracing::info!(
            server = %self.invocation.server(),
            user = %self.invocation.user(),
            root = %self.layout.root().display(),
            steps = plan.len(),
            "Starting bootstrap",
        );

        for step in plan.iter() {
            tracing::info!(step = %step, "Step started");
            let outcome = match self.execute(step, &mut state, &mut report).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(step = %step, error = %e, "Step failed");
                    return Err(e);
                }
            };
            tracing::info!(step = %step, outcome = ?outcome, "Step finished");
            report.steps.push(StepRecord {
                step: step.clone(),
                outcome,
            });
        }

        tracing::info!(
            created = report.count(StepOutcome::Created),
            already_present = report.count(StepOutcome::AlreadyPresent),
            diskmgmt_runs = report.diskmgmt_runs,
            "Bootstrap complete",
        );
        Ok(report)
    }

    async fn execute(
        &self,
        step: &Step,
        state: &mut RunState,
        report: &mut RunReport,
    ) -> BootstrapResult<StepOutcome> {
        match step {
            // The type can only be built from validated input; this step
            // exists so the plan reads the way the run happens.
            Step::ValidateInvocation => Ok(StepOutcome::Ran),
            Step::CloneRepo { repo } => self.clone_repo(*repo).await.map(Into::into),
            Step::VerifyHostEntries => self.verify_host_entries().await.map(|()| StepOutcome::Ran),
            Step::LinkWorkspace => self.link_workspace().await.map(Into::into),
            Step::RunRole { role } => {
                self.run_role(*role, report).await?;
                Ok(StepOutcome::Ran)
            }
            Step::PromoteInventory => self.promote_inventory().await.map(|()| StepOutcome::Ran),
            Step::RequireStore => self.require_store().await.map(|()| StepOutcome::Ran),
            Step::EnsureSshDir => {
                let outcome = self.ensure_ssh_dir().await?;
                if outcome.created() {
                    self.run_role(Role::CoreDiskmgmt, report).await?;
                }
                Ok(outcome.into())
            }
            Step::WriteSshConfig => self.write_ssh_config().await.map(Into::into),
            Step::GenerateKey { host } => self.generate_key(host).await.map(Into::into),
            Step::EnsurePersistentDir => self.ensure_persistent_dir().await.map(Into::into),
            Step::Checkout { checkout } => {
                let outcome = self.checkout(checkout).await?;
                if outcome.created() {
                    state.checkout_occurred = true;
                }
                Ok(outcome.into())
            }
            Step::RerunDiskMgmt { when } => {
                let triggered = match when {
                    Trigger::CheckoutOccurred => state.checkout_occurred,
                };
                if triggered {
                    self.run_role(Role::CoreDiskmgmt, report).await?;
                    Ok(StepOutcome::Ran)
                } else {
                    Ok(StepOutcome::Skipped)
                }
            }
            Step::RemoveWorkspace => self.remove_workspace().await,
            Step::Reboot => {
                let spec = CommandSpec::new("reboot", "systemctl").arg("reboot");
                run_checked(self.runner, &spec).await?;
                Ok(StepOutcome::Ran)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Repositories and workspace
    // -----------------------------------------------------------------------

    async fn clone_repo(&self, repo: Repo) -> BootstrapResult<Ensure> {
        ensure::ensure_dir(&self.layout.ansible_dir()).await?;

        let (dest, spec) = match repo {
            Repo::Private => {
                let dest = self.layout.private_repo();
                let url = self.config.private_repo_url_for(self.invocation.api_key());
                let spec = CommandSpec::new("clone private repository", "git")
                    .args(["clone", "--quiet", url.as_str()])
                    .path_arg(&dest)
                    .redact(self.invocation.api_key());
                (dest, spec)
            }
            Repo::Scripts => {
                let dest = self.layout.scripts_repo();
                let spec = CommandSpec::new("clone scripts repository", "git")
                    .args(["clone", "--quiet", self.config.scripts_repo_url.as_str()])
                    .path_arg(&dest);
                (dest, spec)
            }
        };

        ensure::ensure(&dest, || async {
            run_checked(self.runner, &spec).await.map(|_| ())
        })
        .await
    }

    async fn verify_host_entries(&self) -> BootstrapResult<()> {
        let server = self.invocation.server();

        let inventory = self.layout.inventory_source(server);
        if !is_file(&inventory).await {
            return Err(BootstrapError::MissingInventory {
                server: server.to_string(),
                path: inventory,
            });
        }

        let host_vars = self.layout.host_vars_source(server);
        if !is_dir(&host_vars).await {
            return Err(BootstrapError::MissingHostVars {
                server: server.to_string(),
                path: host_vars,
            });
        }
        Ok(())
    }

    /// Lay out the scratch directory the way `ansible-playbook` expects:
    /// inventory next to `host_vars/`, playbooks and roles as siblings.
    async fn link_workspace(&self) -> BootstrapResult<Ensure> {
        let server = self.invocation.server();
        let scripts = self.layout.scripts_repo();

        ensure::ensure_dir(&self.layout.bootstrap_dir()).await?;
        ensure::ensure_dir(&self.layout.bootstrap_host_vars_dir()).await?;

        let links = [
            (
                self.layout.inventory_source(server),
                self.layout.bootstrap_inventory(),
            ),
            (
                self.layout.host_vars_source(server),
                self.layout.bootstrap_host_vars(server),
            ),
            (scripts.join("playbooks"), self.layout.bootstrap_playbooks()),
            (scripts.join("roles"), self.layout.bootstrap_roles()),
        ];

        let mut outcome = Ensure::AlreadyPresent;
        for (target, link) in &links {
            if ensure::ensure_symlink(target, link).await?.created() {
                outcome = Ensure::Created;
            }
        }
        Ok(outcome)
    }

    async fn run_role(&self, role: Role, report: &mut RunReport) -> BootstrapResult<()> {
        let playbook = self.layout.bootstrap_playbooks().join(&self.config.playbook);
        let spec = CommandSpec::new(format!("role {role}"), "ansible-playbook")
            .arg("-i")
            .path_arg(&self.layout.bootstrap_inventory())
            .path_arg(&playbook)
            .args([
                "-e".to_string(),
                format!("host={}", self.invocation.server()),
                "-e".to_string(),
                format!("role={role}"),
            ]);
        run_checked(self.runner, &spec).await?;
        if role == Role::CoreDiskmgmt {
            report.diskmgmt_runs += 1;
        }
        Ok(())
    }

    async fn promote_inventory(&self) -> BootstrapResult<()> {
        let source = self.layout.bootstrap_inventory();
        let dest = self.layout.system_inventory();
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BootstrapError::io("creating directory", parent, e))?;
        }
        // `copy` follows the symlink, so the real inventory content lands here.
        tokio::fs::copy(&source, &dest)
            .await
            .map_err(|e| BootstrapError::io("copying inventory to", &dest, e))?;
        tracing::info!(path = %dest.display(), "Inventory promoted");
        Ok(())
    }

    async fn require_store(&self) -> BootstrapResult<()> {
        let store = self.layout.store();
        if is_dir(&store).await {
            Ok(())
        } else {
            Err(BootstrapError::MissingStore { path: store })
        }
    }

    // -----------------------------------------------------------------------
    // SSH identity
    // -----------------------------------------------------------------------

    async fn ensure_ssh_dir(&self) -> BootstrapResult<Ensure> {
        let dir = self.layout.ssh_dir(self.invocation.user());
        ensure::ensure(&dir, || async {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| BootstrapError::io("creating directory", &dir, e))?;
            self.chown(&dir).await?;
            ensure::set_mode(&dir, SSH_DIR_MODE).await
        })
        .await
    }

    async fn write_ssh_config(&self) -> BootstrapResult<Ensure> {
        let path = self.layout.ssh_dir(self.invocation.user()).join("config");
        let contents = ssh::render_config(&self.config.ssh_hosts);
        ensure::ensure(&path, || async {
            tokio::fs::write(&path, &contents)
                .await
                .map_err(|e| BootstrapError::io("writing", &path, e))?;
            self.chown(&path).await?;
            ensure::set_mode(&path, SSH_CONFIG_MODE).await
        })
        .await
    }

    /// Generate the key pair for `host` and block on the operator.
    ///
    /// Only the private key file is checked: if the run aborts at the gate,
    /// a re-run finds the key and does not show it again.
    async fn generate_key(&self, host: &str) -> BootstrapResult<Ensure> {
        let dir = self.layout.ssh_dir(self.invocation.user());
        let key = ssh::key_path(&dir, host);
        let public = ssh::public_key_path(&dir, host);
        let comment = format!("{}@{}", self.invocation.user(), self.invocation.server());

        ensure::ensure(&key, || async {
            run_checked(self.runner, &ssh::keygen_command(&key, &comment, host)).await?;
            self.chown(&key).await?;
            self.chown(&public).await?;

            let public_key = tokio::fs::read_to_string(&public)
                .await
                .map_err(|e| BootstrapError::io("reading", &public, e))?;
            self.confirm
                .confirm_key(KeyPrompt {
                    host,
                    public_key_path: &public,
                    public_key: public_key.trim(),
                })
                .await
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Persistent checkouts
    // -----------------------------------------------------------------------

    async fn ensure_persistent_dir(&self) -> BootstrapResult<Ensure> {
        let dir = self.layout.persistent_dir();
        ensure::ensure(&dir, || async {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| BootstrapError::io("creating directory", &dir, e))?;
            self.chown(&dir).await?;
            ensure::set_mode(&dir, PERSISTENT_DIR_MODE).await
        })
        .await
    }

    async fn checkout(&self, checkout: &Checkout) -> BootstrapResult<Ensure> {
        let dest = self.layout.persistent_dir().join(&checkout.name);
        let spec = CommandSpec::new(format!("checkout {}", checkout.name), "git")
            .args(["clone", "--quiet", checkout.url.as_str()])
            .path_arg(&dest)
            .env("GIT_SSH_COMMAND", GIT_SSH_COMMAND)
            .run_as(self.invocation.user());
        ensure::ensure(&dest, || async {
            run_checked(self.runner, &spec).await.map(|_| ())
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Cleanup
    // -----------------------------------------------------------------------

    async fn remove_workspace(&self) -> BootstrapResult<StepOutcome> {
        let dir = self.layout.bootstrap_dir();
        if !ensure::exists(&dir).await? {
            return Ok(StepOutcome::Skipped);
        }
        // Symlinks are removed, never followed.
        tokio::fs::remove_dir_all(&dir)
            .await
            .map_err(|e| BootstrapError::io("removing", &dir, e))?;
        Ok(StepOutcome::Ran)
    }

    async fn chown(&self, path: &Path) -> BootstrapResult<()> {
        let user = self.invocation.user();
        let spec = CommandSpec::new(format!("chown {}", path.display()), "chown")
            .arg(format!("{user}:{user}"))
            .path_arg(path);
        run_checked(self.runner, &spec).await.map(|_| ())
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}
