//! Operator confirmation after a key pair is generated.
//!
//! The public key has to be registered with the remote service by hand
//! before the persistent checkouts can clone over SSH, so the run blocks
//! here until the operator says it is done.

use std::future::Future;
use std::path::Path;

use crate::error::BootstrapResult;

/// A freshly generated key waiting for out-of-band registration.
#[derive(Debug, Clone, Copy)]
pub struct KeyPrompt<'a> {
    /// Remote host the key belongs to.
    pub host: &'a str,
    /// Path of the `.pub` file.
    pub public_key_path: &'a Path,
    /// Contents of the `.pub` file.
    pub public_key: &'a str,
}

/// Blocks until the operator confirms a key has been registered.
pub trait Confirm: Send + Sync {
    fn confirm_key(&self, prompt: KeyPrompt<'_>)
        -> impl Future<Output = BootstrapResult<()>> + Send;
}
