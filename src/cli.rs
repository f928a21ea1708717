use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::provision::ProvisionParams;

#[derive(Parser, Debug)]
#[command(name = "torbridge")]
#[command(version)]
#[command(about = "Provision a Debian host as a Tor bridge relay with obfs4", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Which host to act on. Overrides the config file.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetArgs {
    /// SSH destination (`host` or `user@host`)
    #[arg(short = 'H', long = "host", global = true, value_name = "DESTINATION")]
    pub host: Option<String>,

    /// SSH port
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// SSH private key
    #[arg(short, long = "identity", global = true, value_name = "FILE")]
    pub identity: Option<PathBuf>,

    /// Provision the machine this command runs on instead of a remote host
    #[arg(long, global = true, conflicts_with = "host")]
    pub local: bool,

    /// Wrap every remote command in `sudo -n`
    #[arg(long, global = true)]
    pub sudo: bool,

    /// Config file (default: ~/.config/torbridge/config.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install and activate a bridge relay on the target
    Run(RunArgs),

    /// Check that the target is reachable and report what it runs
    Status {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Operator contact published in the relay descriptor
    #[arg(value_parser = parse_contact_info)]
    pub contact_info: String,

    /// Relay OR port
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    pub or_port: u16,

    /// obfs4 listen port
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    pub transport_port: u16,

    /// Show what would change without touching the host
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Flags for a run that are not provisioning parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunFlags {
    pub dry_run: bool,
    pub yes: bool,
}

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Run(ProvisionParams, RunFlags),
    Status { json: bool },
    Completions(Shell),
    Help,
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub operation: Operation,
    pub target: TargetArgs,
    pub verbose: u8,
    pub quiet: bool,
}

impl From<Cli> for Invocation {
    fn from(cli: Cli) -> Self {
        let operation = match cli.command {
            None => Operation::Help,
            Some(Commands::Run(args)) => Operation::Run(
                ProvisionParams {
                    contact_info: args.contact_info,
                    or_port: args.or_port,
                    transport_port: args.transport_port,
                },
                RunFlags {
                    dry_run: args.dry_run,
                    yes: args.yes,
                },
            ),
            Some(Commands::Status { json }) => Operation::Status { json },
            Some(Commands::Completions { shell }) => Operation::Completions(shell),
        };

        Self {
            operation,
            target: cli.target,
            verbose: cli.verbose,
            quiet: cli.quiet,
        }
    }
}

/// Contact info lands on a single torrc line, so it must be one line of text.
fn parse_contact_info(value: &str) -> Result<String, String> {
    if value.trim().is_empty() {
        return Err("contact info cannot be empty".to_string());
    }
    if value.chars().any(char::is_control) {
        return Err("contact info cannot contain newlines or control characters".to_string());
    }
    Ok(value.to_string())
}

/// Parse a command line (including the program name) into an [`Invocation`].
///
/// Pure: nothing is read or printed. `--help`, `--version` and usage errors
/// come back as a [`clap::Error`] for the caller to report.
pub fn parse_operation<I, T>(args: I) -> Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(args).map(Invocation::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Invocation, clap::Error> {
        parse_operation(std::iter::once("torbridge").chain(args.iter().copied()))
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_is_help() {
        let invocation = parse(&[]).unwrap();
        assert_eq!(invocation.operation, Operation::Help);
    }

    #[test]
    fn test_run_positional_arguments() {
        let invocation = parse(&["run", "ops@example.org", "443", "8443"]).unwrap();
        assert_eq!(
            invocation.operation,
            Operation::Run(
                ProvisionParams {
                    contact_info: "ops@example.org".to_string(),
                    or_port: 443,
                    transport_port: 8443,
                },
                RunFlags::default()
            )
        );
    }

    #[test]
    fn test_run_flags() {
        let invocation = parse(&["run", "--dry-run", "-y", "a@b", "9001", "9002"]).unwrap();
        assert!(matches!(
            invocation.operation,
            Operation::Run(_, RunFlags { dry_run: true, yes: true })
        ));
    }

    #[test]
    fn test_run_rejects_bad_ports() {
        for args in [
            ["run", "a@b", "0", "8443"],
            ["run", "a@b", "443", "65536"],
            ["run", "a@b", "https", "8443"],
        ] {
            assert!(parse(&args).is_err(), "{args:?}");
        }
    }

    #[test]
    fn test_run_rejects_multiline_contact_info() {
        let err = parse(&["run", "a@b\nExitRelay 1", "443", "8443"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);

        for contact in ["", "   ", "a@b\r", "tab\there"] {
            assert!(parse(&["run", contact, "443", "8443"]).is_err(), "{contact:?}");
        }
    }

    #[test]
    fn test_run_accepts_spaces_in_contact_info() {
        let invocation = parse(&["run", "Jane Ops <ops@example.org>", "443", "8443"]).unwrap();
        assert!(matches!(
            invocation.operation,
            Operation::Run(ProvisionParams { ref contact_info, .. }, _)
                if contact_info == "Jane Ops <ops@example.org>"
        ));
    }

    #[test]
    fn test_run_requires_all_positionals() {
        let err = parse(&["run", "a@b", "443"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_unknown_subcommand_is_usage_error() {
        let err = parse(&["provision"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn test_status_json() {
        assert_eq!(
            parse(&["status", "--json"]).unwrap().operation,
            Operation::Status { json: true }
        );
        assert_eq!(
            parse(&["status"]).unwrap().operation,
            Operation::Status { json: false }
        );
    }

    #[test]
    fn test_completions() {
        assert_eq!(
            parse(&["completions", "zsh"]).unwrap().operation,
            Operation::Completions(Shell::Zsh)
        );
    }

    #[test]
    fn test_global_target_options_after_subcommand() {
        let invocation = parse(&[
            "status", "-H", "root@bridge", "-p", "2222", "-i", "~/.ssh/key", "--sudo", "-vv",
        ])
        .unwrap();

        assert_eq!(
            invocation.target,
            TargetArgs {
                host: Some("root@bridge".to_string()),
                port: Some(2222),
                identity: Some(PathBuf::from("~/.ssh/key")),
                local: false,
                sudo: true,
                config: None,
            }
        );
        assert_eq!(invocation.verbose, 2);
    }

    #[test]
    fn test_local_conflicts_with_host() {
        assert!(parse(&["--local", "-H", "bridge", "status"]).is_err());
        assert!(parse(&["--local", "status"]).unwrap().target.local);
    }

    #[test]
    fn test_help_flag_is_reported_as_error_kind() {
        let err = parse(&["--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }
}
