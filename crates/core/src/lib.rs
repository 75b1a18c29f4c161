//! `hostboot-core` -- bootstrap a fresh machine into managed configuration.
//!
//! Clones the private host-configuration and public role repositories,
//! applies the base provisioning roles, sets up SSH identity and persistent
//! checkouts for the target user, then reboots. Every step is guarded by an
//! existence check so a failed run is recovered by running it again.

pub mod bootstrap;
pub mod command;
pub mod config;
pub mod ensure;
pub mod error;
pub mod gate;
pub mod invocation;
pub mod layout;
pub mod plan;
pub mod runner;
pub mod ssh;
