mod cli;
mod commands;
mod config;
mod progress;
mod provision;
mod templates;
mod ui;

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::generate;
use std::io;
use std::process::ExitCode;

use cli::{Cli, Invocation, Operation};
use commands::HostSettings;
use config::Config;
use provision::ProvisionError;
use provision::error::EXIT_FAILURE;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> ExitCode {
    let invocation = match cli::parse_operation(std::env::args_os()) {
        Ok(invocation) => invocation,
        Err(e) => e.exit(),
    };

    // Initialize logging based on verbosity
    let log_level = match invocation.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if invocation.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    match dispatch(invocation) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = match err.downcast_ref::<ProvisionError>() {
                Some(provision) => {
                    ui::error(&provision.to_string());
                    if let Some(host_error) = provision.host_error() {
                        let category = host_error.category();
                        ui::error_hint(&format!(
                            "{}: {}",
                            category.description(),
                            category.advice()
                        ));
                    }
                    provision.exit_code()
                }
                None => {
                    ui::error(&format!("{err:#}"));
                    EXIT_FAILURE
                }
            };
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn dispatch(invocation: Invocation) -> Result<()> {
    let ctx = Context {
        verbose: invocation.verbose,
        quiet: invocation.quiet,
    };

    match invocation.operation {
        Operation::Help => {
            Cli::command().print_help()?;
            Ok(())
        }
        Operation::Completions(shell) => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "torbridge", &mut io::stdout());
            Ok(())
        }
        Operation::Status { json } => {
            let host = connect(&invocation.target)?;
            commands::status::run(&ctx, host.as_ref(), json)
        }
        Operation::Run(params, flags) => {
            let host = connect(&invocation.target)?;
            commands::run::run(&ctx, host.as_ref(), &params, flags)
        }
    }
}

fn connect(target: &cli::TargetArgs) -> Result<Box<dyn hostkit::Host>> {
    let config = Config::load(target.config.as_deref())?;
    let settings = HostSettings::resolve(&config.host, target)?;
    log::debug!("host settings: {settings:?}");
    settings.connect()
}
