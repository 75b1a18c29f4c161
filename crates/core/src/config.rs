use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::ConfigError;
use crate::invocation::Secret;

/// Placeholder replaced by the API key in the private repository URL.
pub const API_KEY_PLACEHOLDER: &str = "{api_key}";

const DEFAULT_ROOT: &str = "/";
const DEFAULT_PRIVATE_REPO_URL: &str = "https://{api_key}@github.com/hostboot/ansible-private.git";
const DEFAULT_SCRIPTS_REPO_URL: &str = "https://github.com/hostboot/ansible-scripts.git";
const DEFAULT_PLAYBOOK: &str = "role.yml";
const DEFAULT_SSH_HOSTS: &str = "github.com,gitlab.com";
const DEFAULT_CHECKOUTS: &str = "ansible-private=git@github.com:hostboot/ansible-private.git,\
                                 ansible-scripts=git@github.com:hostboot/ansible-scripts.git";

/// Every variable read by [`BootstrapConfig::from_env`].
const ENV_VARS: [&str; 6] = [
    "HOSTBOOT_ROOT",
    "HOSTBOOT_PRIVATE_REPO_URL",
    "HOSTBOOT_SCRIPTS_REPO_URL",
    "HOSTBOOT_PLAYBOOK",
    "HOSTBOOT_SSH_HOSTS",
    "HOSTBOOT_CHECKOUTS",
];

/// A repository cloned into the persistent directory as the target user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Checkout {
    /// Directory name under the persistent directory.
    pub name: String,
    /// Clone URL, normally SSH so it uses the generated keys.
    pub url: String,
}

/// Bootstrap configuration loaded from environment variables.
///
/// Every field has a default; with no overrides the tool works against the
/// real filesystem root and the standard repositories.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Prefix for every path the tool touches (default: `/`).
    pub root: PathBuf,
    /// Authenticated clone URL template for the private repository.
    pub private_repo_url: String,
    /// Anonymous clone URL for the public scripts repository.
    pub scripts_repo_url: String,
    /// Playbook file name under the scripts repository's `playbooks/`.
    pub playbook: String,
    /// Remote hosts that get an SSH key pair and a `config` entry.
    pub ssh_hosts: Vec<String>,
    /// Repositories cloned into the persistent directory.
    pub checkouts: Vec<Checkout>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            private_repo_url: DEFAULT_PRIVATE_REPO_URL.to_string(),
            scripts_repo_url: DEFAULT_SCRIPTS_REPO_URL.to_string(),
            playbook: DEFAULT_PLAYBOOK.to_string(),
            ssh_hosts: split_list(DEFAULT_SSH_HOSTS),
            checkouts: parse_checkouts("HOSTBOOT_CHECKOUTS", DEFAULT_CHECKOUTS)
                .unwrap_or_default(),
        }
    }
}

impl BootstrapConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                     | Default                                                   |
    /// |-----------------------------|-----------------------------------------------------------|
    /// | `HOSTBOOT_ROOT`             | `/`                                                       |
    /// | `HOSTBOOT_PRIVATE_REPO_URL` | `https://{api_key}@github.com/hostboot/ansible-private.git` |
    /// | `HOSTBOOT_SCRIPTS_REPO_URL` | `https://github.com/hostboot/ansible-scripts.git`         |
    /// | `HOSTBOOT_PLAYBOOK`         | `role.yml`                                                |
    /// | `HOSTBOOT_SSH_HOSTS`        | `github.com,gitlab.com`                                   |
    /// | `HOSTBOOT_CHECKOUTS`        | `ansible-private=git@github.com:...,ansible-scripts=...`  |
    ///
    /// A variable that is set but not valid UTF-8 is an error, never a
    /// fallback to the default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars = read_vars(|key| std::env::var_os(key))?;
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let root = get("HOSTBOOT_ROOT", DEFAULT_ROOT);
        if !root.starts_with('/') {
            return Err(ConfigError::RelativePath {
                var: "HOSTBOOT_ROOT",
                value: root,
            });
        }

        let private_repo_url = get("HOSTBOOT_PRIVATE_REPO_URL", DEFAULT_PRIVATE_REPO_URL);
        if !private_repo_url.contains(API_KEY_PLACEHOLDER) {
            return Err(ConfigError::MissingPlaceholder {
                var: "HOSTBOOT_PRIVATE_REPO_URL",
            });
        }

        let scripts_repo_url = get("HOSTBOOT_SCRIPTS_REPO_URL", DEFAULT_SCRIPTS_REPO_URL);
        if scripts_repo_url.trim().is_empty() {
            return Err(ConfigError::Empty {
                var: "HOSTBOOT_SCRIPTS_REPO_URL",
            });
        }

        let playbook = get("HOSTBOOT_PLAYBOOK", DEFAULT_PLAYBOOK);
        if playbook.trim().is_empty() {
            return Err(ConfigError::Empty {
                var: "HOSTBOOT_PLAYBOOK",
            });
        }

        let ssh_hosts = split_list(&get("HOSTBOOT_SSH_HOSTS", DEFAULT_SSH_HOSTS));
        if ssh_hosts.is_empty() {
            return Err(ConfigError::Empty {
                var: "HOSTBOOT_SSH_HOSTS",
            });
        }

        let checkouts = parse_checkouts(
            "HOSTBOOT_CHECKOUTS",
            &get("HOSTBOOT_CHECKOUTS", DEFAULT_CHECKOUTS),
        )?;

        Ok(Self {
            root: PathBuf::from(root),
            private_repo_url,
            scripts_repo_url,
            playbook,
            ssh_hosts,
            checkouts,
        })
    }

    /// The private repository URL with the API key substituted.
    pub fn private_repo_url_for(&self, api_key: &Secret) -> String {
        self.private_repo_url
            .replace(API_KEY_PLACEHOLDER, api_key.expose())
    }
}

/// Collect the set variables from `source`, rejecting non-UTF-8 values.
fn read_vars<F>(source: F) -> Result<HashMap<&'static str, String>, ConfigError>
where
    F: Fn(&str) -> Option<OsString>,
{
    let mut vars = HashMap::new();
    for var in ENV_VARS {
        if let Some(raw) = source(var) {
            let value = raw
                .into_string()
                .map_err(|_| ConfigError::NotUnicode { var })?;
            vars.insert(var, value);
        }
    }
    Ok(vars)
}

/// Split a comma-separated list, dropping blanks.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse `name=url` pairs separated by commas.
fn parse_checkouts(var: &'static str, raw: &str) -> Result<Vec<Checkout>, ConfigError> {
    let mut checkouts = Vec::new();
    for entry in split_list(raw) {
        let Some((name, url)) = entry.split_once('=') else {
            return Err(ConfigError::MalformedEntry {
                var,
                entry,
                reason: "expected name=url",
            });
        };
        let (name, url) = (name.trim(), url.trim());
        if name.is_empty() || url.is_empty() {
            return Err(ConfigError::MalformedEntry {
                var,
                entry,
                reason: "name and url must both be set",
            });
        }
        if name.contains('/') || name.starts_with('.') {
            return Err(ConfigError::MalformedEntry {
                var,
                entry,
                reason: "name must be a plain directory name",
            });
        }
        checkouts.push(Checkout {
            name: name.to_string(),
            url: url.to_string(),
        });
    }
    if checkouts.is_empty() {
        return Err(ConfigError::Empty { var });
    }
    Ok(checkouts)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
