//! `hostboot` -- bootstrap a fresh machine into managed configuration.
//!
//! ```text
//! hostboot [--print-plan] <SERVER> <API_KEY> <USER>
//! ```
//!
//! Runs as root. Clones the configuration repositories, applies the base
//! roles, provisions SSH identity and persistent checkouts for `USER`, then
//! reboots. Safe to re-run after a failure.
//!
//! # Environment variables
//!
//! | Variable                    | Required | Default   | Description                                |
//! |-----------------------------|----------|-----------|--------------------------------------------|
//! | `RUST_LOG`                  | no       | `hostboot=info,hostboot_cli=info,hostboot_core=info` | Log filter          |
//! | `HOSTBOOT_ROOT`             | no       | `/`       | Prefix for every path touched              |
//! | `HOSTBOOT_PRIVATE_REPO_URL` | no       | see `BootstrapConfig` | Must contain `{api_key}`       |
//! | `HOSTBOOT_SCRIPTS_REPO_URL` | no       | see `BootstrapConfig` | Public roles repository        |
//! | `HOSTBOOT_PLAYBOOK`         | no       | `role.yml` | Playbook applying a single role           |
//! | `HOSTBOOT_SSH_HOSTS`        | no       | `github.com,gitlab.com` | Hosts that get a key pair    |
//! | `HOSTBOOT_CHECKOUTS`        | no       | see `BootstrapConfig` | `name=url` pairs               |

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hostboot_cli::Cli;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hostboot=info,hostboot_cli=info,hostboot_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = hostboot_cli::run(cli).await {
        tracing::error!(error = %e, exit_code = e.exit_code(), "Bootstrap aborted");
        std::process::exit(e.exit_code());
    }
}
