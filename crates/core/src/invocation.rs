//! Validated run parameters.
//!
//! The three positional arguments end up in paths, command lines and a
//! clone URL, so they are checked once here and never re-validated.

use std::fmt;

use crate::error::{BootstrapError, BootstrapResult};

/// Longest accepted server or user name.
const MAX_NAME_LEN: usize = 64;

/// Host and user names: alphanumeric, hyphen, underscore, dot. No leading
/// `-` (would read as an option) and no leading `.` (would escape into a
/// hidden or parent path).
fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && !name.starts_with(['-', '.'])
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

/// API keys are spliced into the userinfo part of a URL; only the
/// RFC 3986 unreserved set is accepted.
fn is_safe_api_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'))
}

/// A value that must never reach logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Server, API key and target user for one bootstrap run.
#[derive(Debug, Clone)]
pub struct Invocation {
    server: String,
    api_key: Secret,
    user: String,
}

impl Invocation {
    pub fn new(
        server: impl Into<String>,
        api_key: impl Into<String>,
        user: impl Into<String>,
    ) -> BootstrapResult<Self> {
        let server = server.into();
        let api_key = api_key.into();
        let user = user.into();

        if server.is_empty() || api_key.is_empty() || user.is_empty() {
            return Err(BootstrapError::Usage(
                "server, api key and user are all required".to_string(),
            ));
        }
        if !is_safe_name(&server) {
            return Err(BootstrapError::Usage(format!(
                "invalid server name '{server}'"
            )));
        }
        if !is_safe_name(&user) {
            return Err(BootstrapError::Usage(format!("invalid user name '{user}'")));
        }
        if !is_safe_api_key(&api_key) {
            return Err(BootstrapError::Usage(
                "api key contains characters that are not URL-safe".to_string(),
            ));
        }

        Ok(Self {
            server,
            api_key: Secret::new(api_key),
            user,
        })
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn api_key(&self) -> &Secret {
        &self.api_key
    }

    pub fn user(&self) -> &str {
        &self.user
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
