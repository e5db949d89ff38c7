//! `workload tail`

use crate::commands::options;
use crate::commands::CommandContext;
use crate::duration::parse_duration;
use crate::error::CliError;
use crate::logs;
use crate::validation;
use clap::Args;
use crds::{FieldErrors, COMPONENT_LABEL, WORKLOAD_NAME_LABEL};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use workload_client::LogRequest;

/// Watch workload related logs.
///
/// Logs are streamed from every pod of the workload, including pods started
/// after the command, until interrupted.
#[derive(Args, Debug, Clone)]
pub struct TailArgs {
    /// Workload name
    pub name: String,

    /// Kubernetes namespace, defaults to the kubeconfig context namespace
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Workload component used to filter pods, e.g. `build` or `run`
    #[arg(long)]
    pub component: Option<String>,

    /// Time duration to start reading logs from
    #[arg(long, value_parser = parse_duration, default_value = "1s")]
    pub since: Duration,

    /// Print timestamp for each log line
    #[arg(short, long)]
    pub timestamp: bool,
}

impl TailArgs {
    /// Check the name and namespace.
    pub fn validate(&self) -> FieldErrors {
        let mut errs = validation::k8s_name(&self.name, "name");
        if let Some(namespace) = &self.namespace {
            errs = errs.also(validation::namespace(namespace, "--namespace"));
        }
        errs
    }

    /// Pods of the workload, narrowed to the component when given.
    pub fn selector(&self) -> String {
        let mut selector = format!("{WORKLOAD_NAME_LABEL}={}", self.name);
        if let Some(component) = self.component.as_deref().filter(|c| !c.is_empty()) {
            selector.push_str(&format!(",{COMPONENT_LABEL}={component}"));
        }
        selector
    }
}

/// Run the tail command until the stream ends or the user interrupts it.
pub async fn run(args: TailArgs, ctx: &mut CommandContext) -> Result<(), CliError> {
    args.validate().into_result()?;
    let namespace = ctx.namespace(args.namespace.as_deref());

    if let Err(e) = ctx.client.get_workload(&namespace, &args.name).await {
        if !e.is_not_found() {
            return Err(e.into());
        }
        options::validate_namespace(ctx, &namespace).await?;
        ctx.printer.error(format!("Workload \"{namespace}/{}\" not found", args.name));
        return Err(CliError::silent(e));
    }

    let request = LogRequest {
        namespace,
        selector: args.selector(),
        containers: Vec::new(),
        since: args.since,
        timestamps: args.timestamp,
    };
    info!("Tailing logs for {}", request.selector);

    tokio::select! {
        result = logs::tail(Arc::clone(&ctx.client), ctx.printer.clone(), request) => result?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted, stopped tailing logs"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{context, workload};
    use clap::Parser;
    use workload_client::{LogLine, MockWorkloadClient};

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: TailArgs,
    }

    fn args(argv: &[&str]) -> TailArgs {
        TestCli::try_parse_from(std::iter::once("tail").chain(argv.iter().copied()))
            .unwrap()
            .args
    }

    #[test]
    fn test_selector_with_component() {
        assert_eq!(args(&["my-workload"]).selector(), "carto.run/workload-name=my-workload");
        assert_eq!(
            args(&["my-workload", "--component", "build"]).selector(),
            "carto.run/workload-name=my-workload,app.kubernetes.io/component=build"
        );
    }

    #[test]
    fn test_since_default_and_override() {
        assert_eq!(args(&["my-workload"]).since, Duration::from_secs(1));
        assert_eq!(args(&["my-workload", "--since", "1h"]).since, Duration::from_secs(3600));
        assert!(TestCli::try_parse_from(["tail", "my-workload", "--since", "soon"]).is_err());
    }

    #[tokio::test]
    async fn test_tail_streams_logs() {
        let client = MockWorkloadClient::new("default");
        client.add_workload(workload("default", "my-workload"));
        client.set_log_lines(vec![LogLine::new("my-workload-pod", "workload", "hello")]);
        let (mut ctx, out) = context(&client, "");

        let task = run(args(&["my-workload", "--timestamp", "--since", "5m"]), &mut ctx);
        // the mock stream stays open after the scripted lines
        let _ = tokio::time::timeout(Duration::from_millis(50), task).await;

        assert_eq!(out.stdout(), "my-workload-pod[workload] hello\n");
        let requests = client.tail_requests();
        let request = &requests[0];
        assert_eq!(request.namespace, "default");
        assert_eq!(request.since, Duration::from_secs(300));
        assert!(request.timestamps);
    }

    #[tokio::test]
    async fn test_tail_missing_workload() {
        let client = MockWorkloadClient::new("default");
        let (mut ctx, out) = context(&client, "");

        let err = run(args(&["my-workload"]), &mut ctx).await.unwrap_err();

        assert!(err.is_silent());
        assert_eq!(out.stderr(), "Workload \"default/my-workload\" not found\n");
        assert!(client.tail_requests().is_empty());
    }

    #[tokio::test]
    async fn test_tail_missing_namespace() {
        let client = MockWorkloadClient::new("default");
        let (mut ctx, out) = context(&client, "");

        let err = run(args(&["my-workload", "-n", "foo"]), &mut ctx).await.unwrap_err();

        assert!(err.is_silent());
        assert!(out.stderr().starts_with("Error: namespace \"foo\" not found"));
    }
}
