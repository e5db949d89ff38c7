//! Apps CLI
//!
//! Entry point for the `apps` binary: parses the command line, sets up
//! logging and the cluster client, then hands over to the command handlers.

use anyhow::Context;
use apps_cli::cli::{self, Cli};
use apps_cli::commands::CommandContext;
use apps_cli::output::Printer;
use clap::Parser;
use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use workload_client::KubeWorkloadClient;

/// Log to stderr so stdout only carries command output.
fn init_logger(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(&cli.log_level);

    // Use ring as the rustls crypto provider
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        debug!("rustls crypto provider already installed");
    }

    let config = cli.app_config(std::io::stdout().is_terminal());
    let printer = Printer::stdio(config.color);

    let client = match KubeWorkloadClient::new(config.kubeconfig.clone(), config.context.clone())
        .await
        .context("unable to connect to the cluster")
    {
        Ok(client) => client,
        Err(e) => {
            printer.eerror_line(format!("{e:#}"));
            return ExitCode::FAILURE;
        }
    };

    let mut ctx = CommandContext {
        client: Arc::new(client),
        config,
        printer: printer.clone(),
        stdin: Box::new(std::io::BufReader::new(std::io::stdin())),
    };

    match cli::dispatch(cli.command, &mut ctx).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_silent() => {
            debug!("Command failed: {e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            printer.eerror_line(&e);
            ExitCode::FAILURE
        }
    }
}
