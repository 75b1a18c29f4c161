//! Shared fixtures for bootstrap integration tests.
//!
//! [`FakeRunner`] records every command and simulates the on-disk effects
//! of `git clone` and `ssh-keygen`, so a full plan can run inside a
//! temporary root without network access or privileges.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use hostboot_core::command::{CommandOutcome, CommandSpec};
use hostboot_core::config::BootstrapConfig;
use hostboot_core::error::{BootstrapError, BootstrapResult};
use hostboot_core::gate::{Confirm, KeyPrompt};
use hostboot_core::invocation::Invocation;
use hostboot_core::runner::CommandRunner;

pub const SERVER: &str = "web1";
pub const API_KEY: &str = "tok_s3cret";
pub const USER: &str = "alice";

pub const INVENTORY: &str = "[all]\nweb1 ansible_host=10.0.0.5\n";

/// Records commands and fakes their side effects.
pub struct FakeRunner {
    commands: Mutex<Vec<CommandSpec>>,
    /// Server whose inventory entry the fake private clone contains.
    inventory_for: Option<String>,
    /// Commands whose label equals this value exit with status 1.
    fail_label: Option<String>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            inventory_for: Some(SERVER.to_string()),
            fail_label: None,
        }
    }

    /// The private clone will hold entries for `server` instead.
    pub fn with_inventory_for(mut self, server: Option<&str>) -> Self {
        self.inventory_for = server.map(ToString::to_string);
        self
    }

    pub fn failing_on(mut self, label: &str) -> Self {
        self.fail_label = Some(label.to_string());
        self
    }

    pub fn commands(&self) -> Vec<CommandSpec> {
        self.commands.lock().expect("lock").clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.commands().into_iter().map(|c| c.program).collect()
    }

    /// Role names passed to `ansible-playbook`, in order.
    pub fn roles(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|c| c.program == "ansible-playbook")
            .filter_map(|c| {
                c.args
                    .iter()
                    .find_map(|a| a.strip_prefix("role=").map(ToString::to_string))
            })
            .collect()
    }

    pub fn clones(&self) -> Vec<CommandSpec> {
        self.commands()
            .into_iter()
            .filter(|c| c.program == "git" && c.args.first().map(String::as_str) == Some("clone"))
            .collect()
    }

    pub fn count(&self, program: &str) -> usize {
        self.commands().iter().filter(|c| c.program == program).count()
    }

    fn simulate(&self, spec: &CommandSpec) {
        match spec.program.as_str() {
            "git" if spec.args.first().map(String::as_str) == Some("clone") => {
                let dest = PathBuf::from(spec.args.last().expect("clone destination"));
                std::fs::create_dir_all(&dest).expect("fake clone");
                match dest.file_name().and_then(|n| n.to_str()) {
                    Some("ansible-private") if spec.run_as.is_none() => {
                        if let Some(server) = &self.inventory_for {
                            seed_private_repo(&dest, server);
                        }
                    }
                    Some("ansible-scripts") if spec.run_as.is_none() => seed_scripts_repo(&dest),
                    _ => {}
                }
            }
            "ssh-keygen" => {
                let pos = spec.args.iter().position(|a| a == "-f").expect("-f flag");
                let key = PathBuf::from(&spec.args[pos + 1]);
                std::fs::write(&key, "PRIVATE KEY").expect("fake key");
                std::fs::write(
                    format!("{}.pub", key.display()),
                    "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIFake alice@web1\n",
                )
                .expect("fake public key");
            }
            _ => {}
        }
    }
}

impl CommandRunner for FakeRunner {
    async fn run(&self, spec: &CommandSpec) -> BootstrapResult<CommandOutcome> {
        self.commands.lock().expect("lock").push(spec.clone());
        if self.fail_label.as_deref() == Some(spec.label.as_str()) {
            return Ok(CommandOutcome {
                exit_code: Some(1),
                duration_ms: 0,
            });
        }
        self.simulate(spec);
        Ok(CommandOutcome {
            exit_code: Some(0),
            duration_ms: 0,
        })
    }
}

/// Confirms every key immediately and remembers which hosts were asked.
#[derive(Default)]
pub struct AutoConfirm {
    prompted: Mutex<Vec<(String, String)>>,
}

impl AutoConfirm {
    /// `(host, public key)` pairs in prompt order.
    pub fn prompted(&self) -> Vec<(String, String)> {
        self.prompted.lock().expect("lock").clone()
    }
}

impl Confirm for AutoConfirm {
    async fn confirm_key(&self, prompt: KeyPrompt<'_>) -> BootstrapResult<()> {
        self.prompted
            .lock()
            .expect("lock")
            .push((prompt.host.to_string(), prompt.public_key.to_string()));
        Ok(())
    }
}

/// Confirms every key, noting how many keys the runner had generated at
/// the moment each prompt appeared.
pub struct KeygenAwareConfirm<'a> {
    runner: &'a FakeRunner,
    seen: Mutex<Vec<(String, usize)>>,
}

impl<'a> KeygenAwareConfirm<'a> {
    pub fn new(runner: &'a FakeRunner) -> Self {
        Self {
            runner,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// `(host, keys generated so far)` in prompt order.
    pub fn seen(&self) -> Vec<(String, usize)> {
        self.seen.lock().expect("lock").clone()
    }
}

impl Confirm for KeygenAwareConfirm<'_> {
    async fn confirm_key(&self, prompt: KeyPrompt<'_>) -> BootstrapResult<()> {
        let generated = self.runner.count("ssh-keygen");
        self.seen
            .lock()
            .expect("lock")
            .push((prompt.host.to_string(), generated));
        Ok(())
    }
}

/// Declines the first key it is shown, as an operator closing the
/// terminal would.
#[derive(Default)]
pub struct DecliningConfirm {
    prompted: Mutex<Vec<String>>,
}

impl DecliningConfirm {
    pub fn prompted(&self) -> Vec<String> {
        self.prompted.lock().expect("lock").clone()
    }
}

impl Confirm for DecliningConfirm {
    async fn confirm_key(&self, prompt: KeyPrompt<'_>) -> BootstrapResult<()> {
        self.prompted.lock().expect("lock").push(prompt.host.to_string());
        Err(BootstrapError::Usage(format!(
            "key for {} was not confirmed",
            prompt.host
        )))
    }
}

pub fn seed_private_repo(repo: &Path, server: &str) {
    std::fs::create_dir_all(repo.join("hosts")).expect("hosts dir");
    std::fs::write(repo.join("hosts").join(server), INVENTORY).expect("inventory");
    std::fs::create_dir_all(repo.join("host_vars").join(server)).expect("host_vars");
    std::fs::write(
        repo.join("host_vars").join(server).join("main.yml"),
        "timezone: UTC\n",
    )
    .expect("host vars file");
}

pub fn seed_scripts_repo(repo: &Path) {
    std::fs::create_dir_all(repo.join("playbooks")).expect("playbooks");
    std::fs::write(repo.join("playbooks").join("role.yml"), "- hosts: all\n").expect("playbook");
    std::fs::create_dir_all(repo.join("roles").join("core_network")).expect("roles");
}

/// A temporary root with `/store` mounted.
pub fn root_with_store() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir_all(tmp.path().join("store")).expect("store");
    tmp
}

pub fn config_for(root: &Path) -> BootstrapConfig {
    BootstrapConfig {
        root: root.to_path_buf(),
        ..BootstrapConfig::default()
    }
}

pub fn invocation() -> Invocation {
    Invocation::new(SERVER, API_KEY, USER).expect("valid invocation")
}
