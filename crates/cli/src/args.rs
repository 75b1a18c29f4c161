//! Command-line arguments.

use clap::Parser;

use hostboot_core::error::BootstrapResult;
use hostboot_core::invocation::Invocation;

#[derive(Parser, Debug)]
#[command(
    name = "hostboot",
    version,
    about = "Bootstrap a fresh machine into managed configuration, then reboot"
)]
pub struct Cli {
    /// Inventory name of the machine being bootstrapped.
    pub server: String,

    /// API key for cloning the private configuration repository.
    pub api_key: String,

    /// Account that owns the SSH identity and the persistent checkouts.
    pub user: String,

    /// Print the resolved plan as JSON and exit without changing anything.
    #[arg(long)]
    pub print_plan: bool,
}

impl Cli {
    /// Validate the positional arguments.
    pub fn invocation(&self) -> BootstrapResult<Invocation> {
        Invocation::new(self.server.as_str(), self.api_key.as_str(), self.user.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use clap::error::ErrorKind;
    use hostboot_core::error::BootstrapError;

    use super::*;

    #[test]
    fn parses_three_positionals() {
        let cli = Cli::try_parse_from(["hostboot", "web1", "tok123", "alice"]).expect("parse");
        assert_eq!(cli.server, "web1");
        assert_eq!(cli.api_key, "tok123");
        assert_eq!(cli.user, "alice");
        assert!(!cli.print_plan);
    }

    #[test]
    fn print_plan_flag() {
        let cli = Cli::try_parse_from(["hostboot", "--print-plan", "web1", "tok123", "alice"])
            .expect("parse");
        assert!(cli.print_plan);
    }

    #[test]
    fn each_missing_positional_is_rejected() {
        for argv in [
            vec!["hostboot"],
            vec!["hostboot", "web1"],
            vec!["hostboot", "web1", "tok123"],
        ] {
            let err = Cli::try_parse_from(argv.iter().copied()).expect_err("missing argument");
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument, "argv {argv:?}");
            assert_eq!(err.exit_code(), 2);
        }
    }

    #[test]
    fn blank_positional_is_a_usage_error() {
        let cli = Cli::try_parse_from(["hostboot", "web1", "", "alice"]).expect("parse");
        let err = cli.invocation().expect_err("blank api key");
        assert_matches!(err, BootstrapError::Usage(_));
        assert_eq!(err.exit_code(), 2);
    }
}
