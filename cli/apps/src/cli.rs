//! Command line definition and dispatch.

use crate::commands::apply::{self, ApplyArgs};
use crate::commands::create::{self, CreateArgs};
use crate::commands::delete::{self, DeleteArgs};
use crate::commands::get::{self, GetArgs};
use crate::commands::list::{self, ListArgs};
use crate::commands::tail::{self, TailArgs};
use crate::commands::update::{self, UpdateArgs};
use crate::commands::CommandContext;
use crate::config::{AppConfig, DEFAULT_CLI_NAME};
use crate::error::CliError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Applications on Kubernetes
#[derive(Parser, Debug)]
#[command(name = "apps", version, about, propagate_version = true)]
pub struct Cli {
    /// Kubeconfig file, defaults to $KUBECONFIG or ~/.kube/config
    #[arg(long, global = true, value_name = "FILE")]
    pub kubeconfig: Option<PathBuf>,

    /// Name of the kubeconfig context to use
    #[arg(long, global = true)]
    pub context: Option<String>,

    /// Log filter, e.g. `debug` or `workload_client=trace`; overridden by RUST_LOG
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Disable color output in terminals
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top level command groups.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Workload lifecycle management
    #[command(visible_aliases = ["workloads", "wld"])]
    Workload {
        #[command(subcommand)]
        command: WorkloadCommand,
    },
}

/// Subcommands of `workload`.
#[derive(Subcommand, Debug)]
pub enum WorkloadCommand {
    /// Create a workload with specified configuration
    Create(CreateArgs),
    /// Update configuration of an existing workload (deprecated, use apply)
    Update(UpdateArgs),
    /// Apply configurations to a new or existing workload
    Apply(ApplyArgs),
    /// Get details from a workload
    Get(GetArgs),
    /// Table listing of workloads
    #[command(visible_alias = "ls")]
    List(ListArgs),
    /// Watch workload related logs
    Tail(TailArgs),
    /// Delete workload(s)
    Delete(DeleteArgs),
}

impl Cli {
    /// Runtime configuration derived from the global flags.
    pub fn app_config(&self, color: bool) -> AppConfig {
        AppConfig {
            name: DEFAULT_CLI_NAME.to_string(),
            color: color && !self.no_color,
            kubeconfig: self.kubeconfig.clone(),
            context: self.context.clone(),
        }
    }
}

/// Run the selected subcommand.
pub async fn dispatch(command: Commands, ctx: &mut CommandContext) -> Result<(), CliError> {
    let Commands::Workload { command } = command;
    match command {
        WorkloadCommand::Create(args) => create::run(args, ctx).await,
        WorkloadCommand::Update(args) => update::run(args, ctx).await,
        WorkloadCommand::Apply(args) => apply::run(args, ctx).await,
        WorkloadCommand::Get(args) => get::run(args, ctx).await,
        WorkloadCommand::List(args) => list::run(args, ctx).await,
        WorkloadCommand::Tail(args) => tail::run(args, ctx).await,
        WorkloadCommand::Delete(args) => delete::run(args, ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{context, workload};
    use clap::CommandFactory;
    use workload_client::MockWorkloadClient;

    #[test]
    fn test_command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["apps", "workload", "list", "--context", "dev", "--no-color"]).unwrap();
        assert_eq!(cli.context.as_deref(), Some("dev"));
        assert!(!cli.app_config(true).color);
        assert_eq!(cli.log_level, "warn");
    }

    #[test]
    fn test_workload_aliases() {
        for alias in ["workload", "workloads", "wld"] {
            let cli = Cli::try_parse_from(["apps", alias, "get", "my-workload"]).unwrap();
            let Commands::Workload { command } = cli.command;
            assert!(matches!(command, WorkloadCommand::Get(_)));
        }
    }

    #[test]
    fn test_unknown_debug_value_rejected() {
        assert!(Cli::try_parse_from(["apps", "workload", "create", "w", "--debug=maybe"]).is_err());
    }

    #[tokio::test]
    async fn test_dispatch_routes_to_handler() {
        let client = MockWorkloadClient::new("default");
        client.add_workload(workload("default", "api"));
        let (mut ctx, out) = context(&client, "");

        let cli = Cli::try_parse_from(["apps", "workload", "ls"]).unwrap();
        dispatch(cli.command, &mut ctx).await.unwrap();

        assert!(out.stdout().starts_with("NAME"));
    }
}
