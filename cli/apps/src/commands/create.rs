//! `workload create`

use crate::commands::options::{self, WorkloadOptions};
use crate::commands::CommandContext;
use crate::error::CliError;
use clap::Args;
use tracing::debug;

/// Create a workload with specified configuration.
///
/// Workload configuration options include source code to build, runtime
/// resource limits, environment variables and services to bind.
#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    #[command(flatten)]
    pub options: WorkloadOptions,
}

/// Run the create command.
pub async fn run(args: CreateArgs, ctx: &mut CommandContext) -> Result<(), CliError> {
    let opts = &args.options;
    opts.validate().into_result()?;
    if opts.dry_run {
        ctx.printer = ctx.printer.clone().with_info_to_stderr();
    }

    let mut workload = opts.load_input_workload(ctx)?;
    opts.apply_identity(ctx, &mut workload);
    let namespace = workload.namespace_or_empty().to_string();
    let name = workload.name_or_empty().to_string();
    debug!("Creating workload {namespace}/{name}");

    match ctx.client.get_workload(&namespace, &name).await {
        Ok(_) => {
            ctx.printer.error_line(format!("workload {:?} already exists", format!("{namespace}/{name}")));
            return Err(CliError::silent(format!("workload {namespace}/{name} already exists")));
        }
        Err(e) if e.is_not_found() => options::validate_namespace(ctx, &namespace).await?,
        Err(e) => return Err(e.into()),
    }

    options::submit_create(opts, ctx, workload).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{context, ready_workload, workload};
    use clap::Parser;
    use workload_client::{MockFailure, MockOperation, MockWorkloadClient, WorkloadEvent};

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: CreateArgs,
    }

    fn args(argv: &[&str]) -> CreateArgs {
        TestCli::try_parse_from(std::iter::once("create").chain(argv.iter().copied()))
            .unwrap()
            .args
    }

    const GIT_ARGS: &[&str] = &[
        "my-workload",
        "--git-repo",
        "https://example.com/repo.git",
        "--git-branch",
        "main",
    ];

    fn git_args(extra: &[&str]) -> CreateArgs {
        let argv: Vec<&str> = GIT_ARGS.iter().chain(extra.iter()).copied().collect();
        args(&argv)
    }

    const CREATE_DIFF: &str = "Create workload:
      1 + |---
      2 + |apiVersion: carto.run/v1alpha1
      3 + |kind: Workload
      4 + |metadata:
      5 + |  name: my-workload
      6 + |  namespace: default
      7 + |spec:
      8 + |  source:
      9 + |    git:
     10 + |      ref:
     11 + |        branch: main
     12 + |      url: https://example.com/repo.git
";

    const NEXT_STEPS: &str = "
To see logs:   \"tanzu apps workload tail my-workload\"
To get status: \"tanzu apps workload get my-workload\"
";

    #[tokio::test]
    async fn test_create_with_yes() {
        let client = MockWorkloadClient::new("default");
        let (mut ctx, out) = context(&client, "");

        run(git_args(&["--yes"]), &mut ctx).await.unwrap();

        assert_eq!(
            out.stdout(),
            format!("{CREATE_DIFF}\nCreated workload \"my-workload\"\n{NEXT_STEPS}\n")
        );
        let created = client.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].name_or_empty(), "my-workload");
    }

    #[tokio::test]
    async fn test_create_prompt_accepted() {
        let client = MockWorkloadClient::new("default");
        let (mut ctx, out) = context(&client, "y\n");

        run(git_args(&[]), &mut ctx).await.unwrap();

        assert!(out.stdout().contains("? Do you want to create this workload? [y/N]: Created workload \"my-workload\""));
        assert_eq!(client.created().len(), 1);
    }

    #[tokio::test]
    async fn test_create_prompt_declined() {
        let client = MockWorkloadClient::new("default");
        let (mut ctx, out) = context(&client, "n\n");

        run(git_args(&[]), &mut ctx).await.unwrap();

        assert!(out.stdout().ends_with("[y/N]: Skipping workload \"my-workload\"\n"));
        assert!(client.created().is_empty());
    }

    #[tokio::test]
    async fn test_create_from_stdin_requires_yes() {
        let client = MockWorkloadClient::new("default");
        let (mut ctx, out) = context(&client, "metadata:\n  name: my-workload\nspec:\n  image: nginx\n");

        run(args(&["--file", "-"]), &mut ctx).await.unwrap();

        assert!(client.created().is_empty());
        assert_eq!(
            out.stderr(),
            "Skipping workload, cannot confirm intent. Run command with --yes flag to confirm intent when providing input from stdin\n"
        );
    }

    #[tokio::test]
    async fn test_create_from_stdin_with_yes() {
        let client = MockWorkloadClient::new("default");
        let (mut ctx, _) = context(&client, "metadata:\n  name: from-file\n  namespace: default\nspec:\n  image: nginx\n");

        run(args(&["--file", "-", "--env", "A=1", "--yes"]), &mut ctx).await.unwrap();

        let created = client.created();
        assert_eq!(created[0].name_or_empty(), "from-file");
        assert_eq!(created[0].spec.image.as_deref(), Some("nginx"));
        assert_eq!(created[0].spec.env[0].name, "A");
    }

    #[tokio::test]
    async fn test_create_existing_workload() {
        let client = MockWorkloadClient::new("default");
        client.add_workload(workload("default", "my-workload"));
        let (mut ctx, out) = context(&client, "");

        let err = run(git_args(&["--yes"]), &mut ctx).await.unwrap_err();

        assert!(err.is_silent());
        assert_eq!(out.stdout(), "Error: workload \"default/my-workload\" already exists\n");
    }

    #[tokio::test]
    async fn test_create_in_missing_namespace() {
        let client = MockWorkloadClient::new("default");
        let (mut ctx, out) = context(&client, "");

        let err = run(git_args(&["--namespace", "foo", "--yes"]), &mut ctx).await.unwrap_err();

        assert!(err.is_silent());
        assert_eq!(
            out.stderr(),
            "Error: namespace \"foo\" not found, it may not exist or user does not have permissions to read it.\n"
        );
        assert!(client.created().is_empty());
    }

    #[tokio::test]
    async fn test_create_get_failure() {
        let client = MockWorkloadClient::new("default");
        client.induce_failure(MockOperation::GetWorkload, MockFailure::Api("boom".to_string()));
        let (mut ctx, _) = context(&client, "");

        let err = run(git_args(&["--yes"]), &mut ctx).await.unwrap_err();
        assert!(!err.is_silent());
    }

    #[tokio::test]
    async fn test_create_dry_run() {
        let client = MockWorkloadClient::new("default");
        let (mut ctx, out) = context(&client, "");

        run(git_args(&["--dry-run", "--yes"]), &mut ctx).await.unwrap();

        assert_eq!(
            out.stdout(),
            "---
apiVersion: carto.run/v1alpha1
kind: Workload
metadata:
  name: my-workload
  namespace: default
spec:
  source:
    git:
      ref:
        branch: main
      url: https://example.com/repo.git
"
        );
        assert!(client.created().is_empty());
    }

    #[tokio::test]
    async fn test_create_invalid_source() {
        let client = MockWorkloadClient::new("default");
        let (mut ctx, _) = context(&client, "");

        let err = run(args(&["my-workload", "--sub-path", "./app", "--yes"]), &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_and_wait_until_ready() {
        let client = MockWorkloadClient::new("default");
        client.set_watch_events(vec![WorkloadEvent::Applied(ready_workload("default", "my-workload"))]);
        let (mut ctx, out) = context(&client, "");

        run(git_args(&["--yes", "--wait"]), &mut ctx).await.unwrap();

        assert!(out.stdout().ends_with(
            "Waiting for workload \"my-workload\" to become ready...\nWorkload \"my-workload\" is ready\n"
        ));
    }

    #[tokio::test]
    async fn test_create_wait_timeout() {
        let client = MockWorkloadClient::new("default");
        client.set_watch_events(vec![WorkloadEvent::Applied(workload("default", "my-workload"))]);
        let (mut ctx, out) = context(&client, "");

        let err = run(git_args(&["--yes", "--wait", "--wait-timeout", "1ns"]), &mut ctx)
            .await
            .unwrap_err();

        assert!(err.is_silent());
        assert!(out.stdout().ends_with("Error: timeout after 1ns waiting for \"my-workload\" to become ready\n"));
    }

    #[tokio::test]
    async fn test_create_wait_failed_condition() {
        let client = MockWorkloadClient::new("default");
        client.set_watch_events(vec![WorkloadEvent::Applied(crate::test_utils::workload_with_ready(
            "default",
            "my-workload",
            "False",
            "OopsieDoodle",
            "a hopefully informative message about what went wrong",
        ))]);
        let (mut ctx, out) = context(&client, "");

        let err = run(git_args(&["--yes", "--wait"]), &mut ctx).await.unwrap_err();

        assert!(err.is_silent());
        assert_eq!(
            out.stderr(),
            "Error: Failed to become ready: a hopefully informative message about what went wrong\n"
        );
    }

    #[tokio::test]
    async fn test_create_tail_while_waiting() {
        let client = MockWorkloadClient::new("default");
        client.set_watch_events(vec![WorkloadEvent::Applied(ready_workload("default", "my-workload"))]);
        let (mut ctx, _) = context(&client, "");

        run(git_args(&["--yes", "--tail-timestamp"]), &mut ctx).await.unwrap();

        let requests = client.tail_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].selector, "carto.run/workload-name=my-workload");
        assert!(requests[0].timestamps);
    }
}
