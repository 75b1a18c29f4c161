//! Filesystem locations the bootstrap reads and writes.
//!
//! All paths hang off a configurable root so the same code runs against `/`
//! in production and a temporary directory in tests.

use std::path::{Path, PathBuf};

/// Well-known directory names.
pub const ANSIBLE_DIR: &str = ".ansible";
pub const PRIVATE_REPO_DIR: &str = "ansible-private";
pub const SCRIPTS_REPO_DIR: &str = "ansible-scripts";
pub const BOOTSTRAP_DIR: &str = "bootstrap";
pub const STORE_DIR: &str = "store";

/// Resolved paths for one run.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `/.ansible`
    pub fn ansible_dir(&self) -> PathBuf {
        self.root.join(ANSIBLE_DIR)
    }

    /// `/.ansible/ansible-private`
    pub fn private_repo(&self) -> PathBuf {
        self.ansible_dir().join(PRIVATE_REPO_DIR)
    }

    /// `/.ansible/ansible-scripts`
    pub fn scripts_repo(&self) -> PathBuf {
        self.ansible_dir().join(SCRIPTS_REPO_DIR)
    }

    /// Inventory entry for `server` inside the private repository.
    pub fn inventory_source(&self, server: &str) -> PathBuf {
        self.private_repo().join("hosts").join(server)
    }

    /// Host variables directory for `server` inside the private repository.
    pub fn host_vars_source(&self, server: &str) -> PathBuf {
        self.private_repo().join("host_vars").join(server)
    }

    /// `/.ansible/bootstrap`, the scratch workspace.
    pub fn bootstrap_dir(&self) -> PathBuf {
        self.ansible_dir().join(BOOTSTRAP_DIR)
    }

    pub fn bootstrap_inventory(&self) -> PathBuf {
        self.bootstrap_dir().join("hosts")
    }

    pub fn bootstrap_host_vars_dir(&self) -> PathBuf {
        self.bootstrap_dir().join("host_vars")
    }

    pub fn bootstrap_host_vars(&self, server: &str) -> PathBuf {
        self.bootstrap_host_vars_dir().join(server)
    }

    pub fn bootstrap_playbooks(&self) -> PathBuf {
        self.bootstrap_dir().join("playbooks")
    }

    pub fn bootstrap_roles(&self) -> PathBuf {
        self.bootstrap_dir().join("roles")
    }

    /// `/etc/ansible/hosts`
    pub fn system_inventory(&self) -> PathBuf {
        self.root.join("etc").join("ansible").join("hosts")
    }

    /// `/store`, the persistent-storage mount point.
    pub fn store(&self) -> PathBuf {
        self.root.join(STORE_DIR)
    }

    /// `/store/ssh/<user>`
    pub fn ssh_dir(&self, user: &str) -> PathBuf {
        self.store().join("ssh").join(user)
    }

    /// `/store/ansible`
    pub fn persistent_dir(&self) -> PathBuf {
        self.store().join("ansible")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
