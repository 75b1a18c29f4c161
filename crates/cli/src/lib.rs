//! `hostboot-cli` library crate.
//!
//! Wires the core bootstrap to the real machine: argument parsing,
//! environment configuration, child processes and the terminal gate. The
//! binary entrypoint lives in `main.rs`.

pub mod args;
pub mod confirm;

use hostboot_core::bootstrap::Bootstrapper;
use hostboot_core::config::BootstrapConfig;
use hostboot_core::error::BootstrapResult;
use hostboot_core::plan::Plan;
use hostboot_core::runner::SystemRunner;

pub use args::Cli;
pub use confirm::TerminalConfirm;

/// Validate arguments, load configuration and run (or print) the plan.
pub async fn run(cli: Cli) -> BootstrapResult<()> {
    let invocation = cli.invocation()?;
    let config = BootstrapConfig::from_env()?;
    let plan = Plan::standard(&config);

    if cli.print_plan {
        println!("{}", plan.to_json()?);
        return Ok(());
    }

    tracing::info!(
        server = %invocation.server(),
        user = %invocation.user(),
        root = %config.root.display(),
        "hostboot starting",
    );

    let bootstrapper = Bootstrapper::new(&config, &invocation, &SystemRunner, &TerminalConfirm);
    bootstrapper.run(&plan).await.map(|_| ())
}
