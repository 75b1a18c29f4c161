//! Ensure-or-skip primitives.
//!
//! Every mutating step of the bootstrap goes through [`ensure`]: it checks
//! the target path and only runs the constructor when nothing is there.
//! The check and the creation are not atomic.

use std::future::Future;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use serde::Serialize;

use crate::error::{BootstrapError, BootstrapResult};

/// Outcome of an ensure operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ensure {
    Created,
    AlreadyPresent,
}

impl Ensure {
    pub fn created(self) -> bool {
        self == Self::Created
    }
}

/// Whether anything (file, directory or symlink, dangling or not) exists
/// at `path`.
pub async fn exists(path: &Path) -> BootstrapResult<bool> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(BootstrapError::io("inspecting", path, e)),
    }
}

/// Run `construct` unless `path` already exists.
pub async fn ensure<F, Fut>(path: &Path, construct: F) -> BootstrapResult<Ensure>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = BootstrapResult<()>>,
{
    if exists(path).await? {
        tracing::debug!(path = %path.display(), "Already present");
        return Ok(Ensure::AlreadyPresent);
    }
    construct().await?;
    tracing::debug!(path = %path.display(), "Created");
    Ok(Ensure::Created)
}

/// Create `path` (and missing parents) unless it exists.
pub async fn ensure_dir(path: &Path) -> BootstrapResult<Ensure> {
    ensure(path, || async {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| BootstrapError::io("creating directory", path, e))
    })
    .await
}

/// Create the symlink `link -> target` unless `link` exists.
///
/// The target is not required to exist; an existing link is never
/// re-pointed.
pub async fn ensure_symlink(target: &Path, link: &Path) -> BootstrapResult<Ensure> {
    ensure(link, || async {
        tokio::fs::symlink(target, link)
            .await
            .map_err(|e| BootstrapError::io("linking", link, e))
    })
    .await
}

/// Set the Unix permission bits of `path`.
pub async fn set_mode(path: &Path, mode: u32) -> BootstrapResult<()> {
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .map_err(|e| BootstrapError::io("changing permissions of", path, e))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
