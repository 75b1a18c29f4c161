//! SSH client material for the target user.
//!
//! The directory lives on persistent storage and is bind-mounted over
//! `~/.ssh` by the disk-management role, so `IdentityFile` entries point at
//! `~/.ssh` rather than at the storage path.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::command::CommandSpec;

/// Key type passed to `ssh-keygen`.
pub const KEY_TYPE: &str = "ed25519";

/// File name of the private key for `host`.
pub fn key_file_name(host: &str) -> String {
    format!("id_{KEY_TYPE}_{host}")
}

pub fn key_path(ssh_dir: &Path, host: &str) -> PathBuf {
    ssh_dir.join(key_file_name(host))
}

pub fn public_key_path(ssh_dir: &Path, host: &str) -> PathBuf {
    ssh_dir.join(format!("{}.pub", key_file_name(host)))
}

/// Render `~/.ssh/config` with one block per host.
pub fn render_config(hosts: &[String]) -> String {
    let mut out = String::new();
    for (i, host) in hosts.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        // Writing to a String cannot fail.
        let _ = write!(
            out,
            "Host {host}\n    HostName {host}\n    User git\n    IdentityFile ~/.ssh/{}\n    IdentitiesOnly yes\n",
            key_file_name(host),
        );
    }
    out
}

/// `ssh-keygen` invocation for a passphrase-less key pair.
pub fn keygen_command(key: &Path, comment: &str, host: &str) -> CommandSpec {
    CommandSpec::new(format!("generate ssh key for {host}"), "ssh-keygen")
        .args(["-q", "-t", KEY_TYPE, "-N", "", "-C", comment, "-f"])
        .path_arg(key)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
