//! `workload apply`: create or update, whichever fits.

use crate::commands::options::{self, WorkloadOptions};
use crate::commands::CommandContext;
use crate::error::CliError;
use clap::Args;
use tracing::debug;

/// Apply configurations to a new or existing workload.
#[derive(Args, Debug, Clone)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub options: WorkloadOptions,
}

/// Run the apply command.
pub async fn run(args: ApplyArgs, ctx: &mut CommandContext) -> Result<(), CliError> {
    let opts = &args.options;
    opts.validate().into_result()?;
    if opts.dry_run {
        ctx.printer = ctx.printer.clone().with_info_to_stderr();
    }

    let mut from_file = opts.load_input_workload(ctx)?;
    opts.apply_identity(ctx, &mut from_file);
    let namespace = from_file.namespace_or_empty().to_string();
    let name = from_file.name_or_empty().to_string();

    match ctx.client.get_workload(&namespace, &name).await {
        Ok(current) => {
            debug!("Workload {namespace}/{name} exists, updating");
            options::submit_update(opts, ctx, current, &from_file).await
        }
        Err(e) if e.is_not_found() => {
            debug!("Workload {namespace}/{name} not found, creating");
            options::validate_namespace(ctx, &namespace).await?;
            options::submit_create(opts, ctx, from_file).await
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{context, workload};
    use clap::Parser;
    use workload_client::{MockFailure, MockOperation, MockWorkloadClient};

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: ApplyArgs,
    }

    fn args(argv: &[&str]) -> ApplyArgs {
        TestCli::try_parse_from(std::iter::once("apply").chain(argv.iter().copied()))
            .unwrap()
            .args
    }

    #[tokio::test]
    async fn test_apply_creates_missing_workload() {
        let client = MockWorkloadClient::new("default");
        let (mut ctx, out) = context(&client, "");

        run(
            args(&["my-workload", "--git-repo", "https://example.com/repo.git", "--git-branch", "main", "--sub-path", "./app", "--yes"]),
            &mut ctx,
        )
        .await
        .unwrap();

        assert!(out.stdout().starts_with("Create workload:\n"));
        assert!(out.stdout().contains("     13 + |    subPath: ./app\n"));
        assert!(out.stdout().contains("Created workload \"my-workload\""));
        assert_eq!(client.created().len(), 1);
    }

    #[tokio::test]
    async fn test_apply_updates_existing_workload_without_deprecation() {
        let client = MockWorkloadClient::new("default");
        let mut existing = workload("default", "my-workload");
        existing.spec.merge_image("ubuntu:bionic");
        client.add_workload(existing);
        let (mut ctx, out) = context(&client, "");

        run(args(&["my-workload", "--env", "A=1", "--yes"]), &mut ctx).await.unwrap();

        assert!(out.stdout().starts_with("Update workload:\n"));
        assert!(!out.stdout().contains("deprecated"));
        assert_eq!(client.updated().len(), 1);
    }

    #[tokio::test]
    async fn test_apply_noop() {
        let client = MockWorkloadClient::new("default");
        let mut existing = workload("default", "my-workload");
        existing.spec.merge_image("ubuntu:bionic");
        client.add_workload(existing);
        let (mut ctx, out) = context(&client, "");

        run(args(&["my-workload"]), &mut ctx).await.unwrap();

        assert_eq!(out.stdout(), "Workload is unchanged, skipping update\n");
    }

    #[tokio::test]
    async fn test_apply_file_layers_onto_existing() {
        let client = MockWorkloadClient::new("default");
        let mut existing = workload("default", "spring-petclinic");
        existing.spec.merge_image("ubuntu:bionic");
        existing.spec.merge_env(crds::EnvVar::new("OVERRIDE_VAR", "doesnt matter"));
        client.add_workload(existing);
        let stdin = "apiVersion: carto.run/v1alpha1
kind: Workload
metadata:
  name: spring-petclinic
  labels:
    app.kubernetes.io/part-of: spring-petclinic
spec:
  env:
  - name: SPRING_PROFILES_ACTIVE
    value: mysql
";
        let (mut ctx, _) = context(&client, stdin);

        run(args(&["--file", "-", "--yes"]), &mut ctx).await.unwrap();

        let updated = client.workload("default", "spring-petclinic").unwrap();
        let names: Vec<&str> = updated.spec.env.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["OVERRIDE_VAR", "SPRING_PROFILES_ACTIVE"]);
        assert_eq!(
            updated.metadata.labels.unwrap().get(crds::APP_PART_OF_LABEL).map(String::as_str),
            Some("spring-petclinic")
        );
    }

    #[tokio::test]
    async fn test_apply_missing_namespace() {
        let client = MockWorkloadClient::new("default");
        let (mut ctx, out) = context(&client, "");

        let err = run(args(&["my-workload", "--image", "nginx", "-n", "foo", "--yes"]), &mut ctx)
            .await
            .unwrap_err();

        assert!(err.is_silent());
        assert!(out.stderr().contains("namespace \"foo\" not found"));
    }

    #[tokio::test]
    async fn test_apply_get_failure() {
        let client = MockWorkloadClient::new("default");
        client.induce_failure(MockOperation::GetWorkload, MockFailure::Api("boom".to_string()));
        let (mut ctx, _) = context(&client, "");

        let err = run(args(&["my-workload", "--image", "nginx"]), &mut ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "API error: boom");
    }
}
