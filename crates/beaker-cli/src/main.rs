//! Beaker CLI binary entrypoint.
//!
//! This is the main entry point for the `beaker` command-line tool.

use std::error::Error as _;
use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use beaker_cli::cli::{Cli, Commands};
use beaker_cli::commands::{ExecutorCommand, NodeCommand, SessionCommand};
use beaker_cli::config::Config;
use beaker_cli::context::AppContext;
use beaker_cli::error::CliError;
use beaker_cli::output::OutputFormat;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let debug = cli.debug;
    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if debug {
                // Print the full cause chain.
                eprintln!("Error: {e}");
                let mut source = e.source();
                while let Some(cause) = source {
                    eprintln!("caused by: {cause}");
                    source = cause.source();
                }
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = Config::load()?;
    if let Some(address) = &cli.address {
        config.address.clone_from(address);
    }

    let ctx = AppContext::new(config, cli.quiet)?;

    // Ctrl-C cancels in-flight waits instead of killing the process
    // outright, so compensating actions still run.
    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Session { command } => {
            let cmd = SessionCommand::new(&ctx);
            cmd.execute(&mut stdout, &format, &command).await?;
        }
        Commands::Node { command } => {
            let cmd = NodeCommand::new(&ctx);
            cmd.execute(&mut stdout, &format, &command).await?;
        }
        Commands::Executor { command } => {
            let cmd = ExecutorCommand::new(&ctx);
            cmd.execute(&mut stdout, &format, &command).await?;
        }
    }

    Ok(())
}
