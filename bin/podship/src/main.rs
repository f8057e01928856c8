//! podship is a CLI tool that copies the HopsFS benchmark harness into a running Kubernetes pod.

mod cli;

use std::{ffi::OsString, process::ExitCode};

use anyhow::Result;
use clap::{CommandFactory, Parser, error::ErrorKind};

use cli::Cli;
use podship_deploy::{Deployer, ProcessRunner};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = parse_args();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let layer = cli.config_layer().merge(cli.config.as_deref())?;
    if !layer.has_pod() {
        // A config file lifted the --pod requirement but did not provide one.
        let _ = Cli::command()
            .error(
                ErrorKind::MissingRequiredArgument,
                "no pod name given on the command line or in the configuration file (use --pod <POD_NAME>)",
            )
            .print();
        std::process::exit(1);
    }
    let config = layer.resolve()?;

    let deployer = Deployer::new(config, ProcessRunner);
    let report = deployer.deploy_until(shutdown_signal()).await?;

    report.log();

    Ok(())
}

/// Parse the command line. Usage errors exit with status 1, help and version with 0.
fn parse_args() -> Cli {
    let args: Vec<OsString> = std::env::args_os().collect();

    if cli::wants_help(&args) {
        let _ = Cli::command().print_help();
        std::process::exit(0);
    }

    Cli::try_parse_from(args).unwrap_or_else(|e| match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
        _ => {
            let _ = e.print();
            std::process::exit(1);
        }
    })
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = ?e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = ?e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
