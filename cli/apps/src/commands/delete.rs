//! `workload delete`

use crate::commands::options::{self, STDIN_FILE};
use crate::commands::CommandContext;
use crate::duration::parse_duration;
use crate::error::CliError;
use crate::prompt::confirm;
use crate::validation;
use crate::wait::{self, WaitError, Worker};
use clap::Args;
use crds::{FieldError, FieldErrors};
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const NAME_ARG: &str = "name";
const ALL_FLAG: &str = "--all";
const FILE_FLAG: &str = "--file";

/// Delete one or more workloads by name, or all workloads in a namespace.
#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Workload names
    pub names: Vec<String>,

    /// Kubernetes namespace, defaults to the kubeconfig context namespace
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Delete all workloads within the namespace
    #[arg(long)]
    pub all: bool,

    /// File path containing the workload to delete, `-` for stdin
    #[arg(short, long)]
    pub file: Option<String>,

    /// Accept all prompts
    #[arg(short, long)]
    pub yes: bool,

    /// Wait for the workloads to be deleted
    #[arg(long)]
    pub wait: bool,

    /// Timeout for --wait
    #[arg(long, value_parser = parse_duration, default_value = "1m")]
    pub wait_timeout: Duration,
}

impl DeleteArgs {
    /// Check the names and flags before any cluster access.
    pub fn validate(&self) -> FieldErrors {
        let mut errs = FieldErrors::new();
        if let Some(namespace) = &self.namespace {
            errs = errs.also(validation::namespace(namespace, "--namespace"));
        }
        for name in &self.names {
            errs = errs.also(validation::k8s_name(name, NAME_ARG));
        }

        let selected = [!self.names.is_empty(), self.all, self.file.is_some()]
            .into_iter()
            .filter(|s| *s)
            .count();
        match selected {
            0 => errs.push(FieldError::missing_one_of(&[NAME_ARG, ALL_FLAG, FILE_FLAG])),
            1 => {}
            _ => errs.push(FieldError::multiple_one_of(&[NAME_ARG, ALL_FLAG, FILE_FLAG])),
        }
        errs
    }

    fn reads_stdin(&self) -> bool {
        self.file.as_deref() == Some(STDIN_FILE)
    }
}

/// Run the delete command.
pub async fn run(args: DeleteArgs, ctx: &mut CommandContext) -> Result<(), CliError> {
    args.validate().into_result()?;
    let mut namespace = ctx.namespace(args.namespace.as_deref());

    if args.all {
        return delete_all(&args, ctx, &namespace).await;
    }

    let names = match args.file.as_deref() {
        Some(path) => {
            let workload = options::read_workload_file(ctx, path)?;
            if args.namespace.is_none() && !workload.namespace_or_empty().is_empty() {
                namespace = workload.namespace_or_empty().to_string();
            }
            vec![workload.name_or_empty().to_string()]
        }
        None => args.names.clone(),
    };

    let mut failed = 0;
    for name in &names {
        if !delete_one(&args, ctx, &namespace, name).await? {
            failed += 1;
        }
    }
    if failed > 0 {
        return Err(CliError::silent(format!("{failed} workload(s) could not be deleted")));
    }
    Ok(())
}

/// Delete a single workload. Returns `false` when it did not exist.
async fn delete_one(args: &DeleteArgs, ctx: &mut CommandContext, namespace: &str, name: &str) -> Result<bool, CliError> {
    if !confirmed(args, ctx, &format!("Really delete the workload {name:?}?")) {
        ctx.printer.info(format!("Skipping workload {name:?}"));
        return Ok(true);
    }

    match ctx.client.delete_workload(namespace, name).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => {
            options::validate_namespace(ctx, namespace).await?;
            ctx.printer.error(format!("Workload \"{namespace}/{name}\" not found"));
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    }
    ctx.printer.success(format!("Deleted workload {name:?}"));

    if args.wait {
        wait_until_deleted(args, ctx, namespace, name).await?;
    }
    Ok(true)
}

async fn delete_all(args: &DeleteArgs, ctx: &mut CommandContext, namespace: &str) -> Result<(), CliError> {
    if !confirmed(args, ctx, &format!("Really delete all workloads in the namespace {namespace:?}?")) {
        ctx.printer.info(format!("Skipping workloads in namespace {namespace:?}"));
        return Ok(());
    }

    let workloads = ctx.client.list_workloads(Some(namespace)).await?;
    if workloads.is_empty() {
        options::validate_namespace(ctx, namespace).await?;
        ctx.printer.info("No workloads found.");
        return Ok(());
    }

    for workload in &workloads {
        let name = workload.name_or_empty();
        match ctx.client.delete_workload(namespace, name).await {
            Ok(()) => debug!("Deleted workload {namespace}/{name}"),
            // deleted concurrently
            Err(e) if e.is_not_found() => debug!("Workload {namespace}/{name} already gone"),
            Err(e) => return Err(e.into()),
        }
    }
    ctx.printer.success(format!("Deleted workloads in namespace {namespace:?}"));

    if args.wait {
        for workload in &workloads {
            wait_until_deleted(args, ctx, namespace, workload.name_or_empty()).await?;
        }
    }
    Ok(())
}

fn confirmed(args: &DeleteArgs, ctx: &mut CommandContext, message: &str) -> bool {
    if args.yes {
        return true;
    }
    if args.reads_stdin() {
        ctx.printer.error(
            "Skipping workload, cannot confirm intent. Run command with --yes flag to confirm intent when providing input from stdin",
        );
        return false;
    }
    confirm(&ctx.printer, ctx.stdin.as_mut(), message).unwrap_or_else(|e| {
        debug!("Prompt failed: {e}");
        false
    })
}

async fn wait_until_deleted(args: &DeleteArgs, ctx: &CommandContext, namespace: &str, name: &str) -> Result<(), CliError> {
    ctx.printer.info(format!("Waiting for workload {name:?} to be deleted..."));

    let client = Arc::clone(&ctx.client);
    let (ns, n) = (namespace.to_string(), name.to_string());
    let worker: Worker = async move {
        let events = client.watch_workload(&ns, &n).await?;
        wait::until_deleted(events).await
    }
    .boxed();

    match wait::race(args.wait_timeout, worker, None).await {
        Ok(()) => {
            ctx.printer.success(format!("Workload {name:?} was deleted"));
            Ok(())
        }
        Err(err @ WaitError::Timeout(_)) => {
            ctx.printer.error_line(format!("{err} waiting for {name:?} to be deleted"));
            Err(CliError::silent(err))
        }
        Err(err) => {
            ctx.printer.eerror_line(&err);
            Err(CliError::silent(err))
        }
    }
}
