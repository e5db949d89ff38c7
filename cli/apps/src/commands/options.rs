//! Flags shared by `create`, `update` and `apply`, and the lifecycle they
//! drive: layering flags onto a workload, previewing the change, confirming
//! it, submitting it and optionally waiting for the workload to become ready.

use crate::commands::CommandContext;
use crate::config::TYPE_ENV_VAR;
use crate::diff::resource_diff;
use crate::duration::parse_duration;
use crate::error::CliError;
use crate::logs;
use crate::parsers;
use crate::printer;
use crate::prompt::confirm;
use crate::validation;
use crate::wait::{self, WaitError, Worker};
use clap::Args;
use crds::{
    GitRef, GitSource, MavenSource, ResourceRequirements, Workload, WorkloadServiceClaim, APP_PART_OF_LABEL,
    DEBUG_PARAM, LIVE_UPDATE_PARAM, MAVEN_PARAM, WORKLOAD_NAME_LABEL, WORKLOAD_TYPE_LABEL,
};
use futures::FutureExt;
use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use workload_client::LogRequest;

/// `--file` value that reads the workload from stdin
pub const STDIN_FILE: &str = "-";

/// Notice emitted when maven flags win over a `maven` entry in `--param-yaml`
pub const MAVEN_OVERWRITTEN_NOTICE: &str =
    "Maven configuration flags have overwritten values provided by \"--params-yaml\".";

const API_VERSION: &str = "carto.run/v1alpha1";
const KIND: &str = "Workload";

/// Flags describing the desired state of a workload.
#[derive(Args, Debug, Clone, Default)]
pub struct WorkloadOptions {
    /// Name of the workload
    pub name: Option<String>,

    /// Kubernetes namespace (defaulted from kubeconfig)
    #[arg(short = 'n', long)]
    pub namespace: Option<String>,

    /// File path containing the description of a single workload, other flags
    /// are layered on top of this resource. Use value "-" to read from stdin
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub file: Option<String>,

    /// Application name the workload is a part of
    #[arg(long)]
    pub app: Option<String>,

    /// Distinguish workload type
    #[arg(long = "type", env = TYPE_ENV_VAR)]
    pub workload_type: Option<String>,

    /// Label represented as a "key=value" pair ("key-" to remove, flag can be used multiple times)
    #[arg(long = "label", value_name = "KEY=VALUE", value_delimiter = ',')]
    pub labels: Vec<String>,

    /// Annotation represented as a "key=value" pair ("key-" to remove, flag can be used multiple times)
    #[arg(long = "annotation", value_name = "KEY=VALUE", value_delimiter = ',')]
    pub annotations: Vec<String>,

    /// Additional parameters represented as a "key=value" pair ("key-" to remove, flag can be used multiple times)
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Nested parameters using YAML or JSON formatted values represented as a "key=value" pair
    /// ("key-" to remove, flag can be used multiple times)
    #[arg(long = "param-yaml", value_name = "KEY=VALUE")]
    pub params_yaml: Vec<String>,

    /// Put the workload in debug mode (--debug=false to disable)
    #[arg(long, num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    pub debug: Option<bool>,

    /// Put the workload in live update mode (--live-update=false to disable)
    #[arg(long, num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    pub live_update: Option<bool>,

    /// Git url to remote source code
    #[arg(long, value_name = "URL")]
    pub git_repo: Option<String>,

    /// Branch within the git repo to checkout
    #[arg(long, value_name = "BRANCH")]
    pub git_branch: Option<String>,

    /// Tag within the git repo to checkout
    #[arg(long, value_name = "TAG")]
    pub git_tag: Option<String>,

    /// Commit SHA within the git repo to checkout
    #[arg(long, value_name = "SHA")]
    pub git_commit: Option<String>,

    /// Destination image repository where source code is staged before being built
    #[arg(short = 's', long, value_name = "IMAGE")]
    pub source_image: Option<String>,

    /// Relative path inside the repo or image to treat as application root (to unset, pass empty string "")
    #[arg(long, value_name = "PATH")]
    pub sub_path: Option<String>,

    /// Pre-built image, skips the source resolution and build phases of the supply chain
    #[arg(long, value_name = "IMAGE")]
    pub image: Option<String>,

    /// Environment variables represented as a "key=value" pair ("key-" to remove, flag can be used multiple times)
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Build environment variables represented as a "key=value" pair ("key-" to remove, flag can be used multiple times)
    #[arg(long = "build-env", value_name = "KEY=VALUE")]
    pub build_env: Vec<String>,

    /// Object reference for a service to bind to the workload
    /// "service-ref-name=apiVersion:kind:service-binding-name" ("service-ref-name-" to remove, flag can be used multiple times)
    #[arg(long = "service-ref", value_name = "OBJECT REFERENCE")]
    pub service_refs: Vec<String>,

    /// Name of service account permitted to create resources submitted by the supply chain (to unset, pass empty string "")
    #[arg(long = "service-account")]
    pub service_account: Option<String>,

    /// The maximum amount of cpu allowed, in CPU cores (500m = .5 cores)
    #[arg(long, value_name = "CORES")]
    pub limit_cpu: Option<String>,

    /// The maximum amount of memory allowed, in bytes (500Mi = 500MiB = 500 * 1024 * 1024)
    #[arg(long, value_name = "BYTES")]
    pub limit_memory: Option<String>,

    /// The minimum amount of cpu required, in CPU cores (500m = .5 cores)
    #[arg(long, value_name = "CORES")]
    pub request_cpu: Option<String>,

    /// The minimum amount of memory required, in bytes (500Mi = 500MiB = 500 * 1024 * 1024)
    #[arg(long, value_name = "BYTES")]
    pub request_memory: Option<String>,

    /// Name of maven artifact
    #[arg(long)]
    pub maven_artifact: Option<String>,

    /// Version number of maven artifact
    #[arg(long)]
    pub maven_version: Option<String>,

    /// Maven project to pull artifact from
    #[arg(long)]
    pub maven_group: Option<String>,

    /// Maven packaging type, defaults to jar
    #[arg(long)]
    pub maven_type: Option<String>,

    /// Waits for workload to become ready
    #[arg(long)]
    pub wait: bool,

    /// Timeout for workload to become ready when waiting
    #[arg(long, value_parser = parse_duration, default_value = "10m")]
    pub wait_timeout: Duration,

    /// Show logs while waiting for workload to become ready
    #[arg(long)]
    pub tail: bool,

    /// Show logs and add timestamp to each log line while waiting for workload to become ready
    #[arg(long)]
    pub tail_timestamp: bool,

    /// Print kubernetes resources to stdout rather than apply them to the cluster,
    /// messages normally on stdout will be sent to stderr
    #[arg(long)]
    pub dry_run: bool,

    /// Accept all prompts
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl WorkloadOptions {
    /// Check flag values before any cluster access.
    pub fn validate(&self) -> crds::FieldErrors {
        let mut errs = crds::FieldErrors::new();

        if let Some(namespace) = &self.namespace {
            errs = errs.also(validation::namespace(namespace, "--namespace"));
        }
        if self.file.is_none() {
            errs = errs.also(validation::k8s_name(self.name.as_deref().unwrap_or_default(), "name"));
        }
        errs = errs
            .also(validation::deletable_key_values(&self.labels, "--label"))
            .also(validation::deletable_key_values(&self.annotations, "--annotation"))
            .also(validation::deletable_key_values(&self.params, "--param"))
            .also(validation::json_or_yaml_key_values(&self.params_yaml, "--param-yaml"))
            .also(validation::deletable_env_vars(&self.env, "--env"))
            .also(validation::deletable_env_vars(&self.build_env, "--build-env"))
            .also(validation::deletable_key_object_references(&self.service_refs, "--service-ref"));

        for (value, field) in [
            (&self.limit_cpu, "--limit-cpu"),
            (&self.limit_memory, "--limit-memory"),
            (&self.request_cpu, "--request-cpu"),
            (&self.request_memory, "--request-memory"),
        ] {
            if let Some(value) = value {
                errs = errs.also(validation::quantity(value, field));
            }
        }
        if let (Some(limit), Some(request)) = (&self.limit_cpu, &self.request_cpu) {
            errs = errs.also(validation::compare_quantity(limit, request, "--request-cpu"));
        }
        if let (Some(limit), Some(request)) = (&self.limit_memory, &self.request_memory) {
            errs = errs.also(validation::compare_quantity(limit, request, "--request-memory"));
        }

        errs
    }

    /// `true` when the workload is read from stdin.
    pub fn reads_stdin(&self) -> bool {
        self.file.as_deref() == Some(STDIN_FILE)
    }

    /// Layer every flag onto `workload`, returning notices for the user.
    pub fn apply_options_to_workload(&self, workload: &mut Workload) -> Vec<String> {
        let mut notices = Vec::new();

        for label in &self.labels {
            match parsers::deletable_key_value(label) {
                (key, Some(value)) => workload.merge_label(&key, &value),
                (key, None) => workload.remove_label(&key),
            }
        }
        for annotation in &self.annotations {
            match parsers::deletable_key_value(annotation) {
                (key, Some(value)) => workload.spec.merge_annotation_param(&key, &value),
                (key, None) => workload.spec.remove_annotation_param(&key),
            }
        }
        for param in &self.params {
            match parsers::deletable_key_value(param) {
                (key, Some(value)) => workload.spec.merge_param(&key, value),
                (key, None) => workload.spec.remove_param(&key),
            }
        }

        let maven_via_flags = [&self.maven_artifact, &self.maven_version, &self.maven_group, &self.maven_type]
            .iter()
            .any(|v| non_empty(v.as_deref()).is_some());
        if maven_via_flags {
            workload.spec.merge_maven_source(MavenSource {
                artifact_id: non_empty(self.maven_artifact.as_deref()).map(str::to_string),
                group_id: non_empty(self.maven_group.as_deref()).map(str::to_string),
                version: non_empty(self.maven_version.as_deref()).map(str::to_string),
                packaging: non_empty(self.maven_type.as_deref()).map(str::to_string),
            });
        }

        for param in &self.params_yaml {
            match parsers::deletable_key_value(param) {
                (key, None) => workload.spec.remove_param(&key),
                (key, Some(_)) if key == MAVEN_PARAM && maven_via_flags => {
                    notices.push(MAVEN_OVERWRITTEN_NOTICE.to_string());
                }
                (key, Some(raw)) => match parsers::json_yaml_to_object(&raw) {
                    Ok(value) => workload.spec.merge_param(&key, value),
                    Err(e) => debug!("Skipping unparseable --param-yaml {key}: {e}"),
                },
            }
        }

        if let Some(app) = non_empty(self.app.as_deref()) {
            workload.merge_label(APP_PART_OF_LABEL, app);
        }
        if let Some(workload_type) = non_empty(self.workload_type.as_deref()) {
            workload.merge_label(WORKLOAD_TYPE_LABEL, workload_type);
        }

        for (flag, param) in [(self.debug, DEBUG_PARAM), (self.live_update, LIVE_UPDATE_PARAM)] {
            match flag {
                Some(true) => workload.spec.merge_param(param, "true"),
                Some(false) => workload.spec.remove_param(param),
                None => {}
            }
        }

        let git_ref = GitRef {
            branch: non_empty(self.git_branch.as_deref()).map(str::to_string),
            tag: non_empty(self.git_tag.as_deref()).map(str::to_string),
            commit: non_empty(self.git_commit.as_deref()).map(str::to_string),
        };
        let git_repo = non_empty(self.git_repo.as_deref());
        if git_repo.is_some() || git_ref.branch.is_some() || git_ref.tag.is_some() || git_ref.commit.is_some() {
            workload.spec.merge_git(GitSource {
                url: git_repo.unwrap_or_default().to_string(),
                git_ref,
            });
        }
        if let Some(image) = non_empty(self.source_image.as_deref()) {
            workload.spec.merge_source_image(image);
        }
        // an empty sub path is a request to clear it
        if let Some(sub_path) = &self.sub_path {
            workload.spec.merge_sub_path(sub_path);
        }
        if let Some(image) = non_empty(self.image.as_deref()) {
            workload.spec.merge_image(image);
        }

        for env in &self.env {
            match parsers::deletable_env_var(env) {
                (env, true) => workload.spec.remove_env(&env.name),
                (env, false) => workload.spec.merge_env(env),
            }
        }
        for env in &self.build_env {
            match parsers::deletable_env_var(env) {
                (env, true) => workload.spec.remove_build_env(&env.name),
                (env, false) => workload.spec.merge_build_env(env),
            }
        }

        for service_ref in &self.service_refs {
            match parsers::deletable_key_value(service_ref) {
                (claim, None) => {
                    workload.spec.delete_service_claim(&claim);
                    workload.delete_service_claim_annotation(&claim);
                }
                (claim, Some(reference)) => {
                    workload
                        .spec
                        .merge_service_claim(WorkloadServiceClaim::new(&claim, parsers::object_reference(&reference)));
                    match parsers::object_reference_namespace(&reference) {
                        Some(namespace) => workload.merge_service_claim_annotation(&claim, &namespace),
                        None => workload.delete_service_claim_annotation(&claim),
                    }
                }
            }
        }

        for (value, key, is_limit) in [
            (&self.limit_cpu, "cpu", true),
            (&self.limit_memory, "memory", true),
            (&self.request_cpu, "cpu", false),
            (&self.request_memory, "memory", false),
        ] {
            if let Some(value) = value {
                let list = Some(BTreeMap::from([(key.to_string(), value.clone())]));
                let resources = if is_limit {
                    ResourceRequirements { limits: list, requests: None }
                } else {
                    ResourceRequirements { limits: None, requests: list }
                };
                workload.spec.merge_resources(&resources);
            }
        }

        if let Some(service_account) = &self.service_account {
            workload.spec.merge_service_account_name(service_account);
        }

        notices
    }

    /// Read the workload given with `--file`, or start from an empty one.
    pub fn load_input_workload(&self, ctx: &mut CommandContext) -> Result<Workload, CliError> {
        match self.file.as_deref() {
            Some(path) => read_workload_file(ctx, path),
            None => Ok(Workload::default()),
        }
    }

    /// Apply the name and namespace flags to a loaded workload.
    ///
    /// The namespace flag wins over the file, and the kubeconfig default is
    /// used when neither sets one.
    pub fn apply_identity(&self, ctx: &CommandContext, workload: &mut Workload) {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            workload.metadata.name = Some(name.to_string());
        }
        if workload.namespace_or_empty().is_empty() || self.namespace.is_some() {
            workload.metadata.namespace = Some(ctx.namespace(self.namespace.as_deref()));
        }
    }

    /// Layer the flags, then reject invalid combinations.
    pub fn apply_and_validate(&self, workload: &mut Workload) -> Result<Vec<String>, CliError> {
        let notices = self.apply_options_to_workload(workload);
        workload.validate().into_result()?;
        Ok(notices)
    }

    /// Print the resource that would be submitted.
    pub fn dry_run(ctx: &CommandContext, workload: &Workload) -> Result<(), CliError> {
        let doc = printer::yaml_document(&printer::to_sorted_value(workload)?)?;
        ctx.printer.print(doc);
        Ok(())
    }

    /// Preview, confirm and create `workload`. Returns whether it was created.
    pub async fn create(&self, ctx: &mut CommandContext, workload: &Workload, notices: &[String]) -> Result<bool, CliError> {
        print_warnings(ctx, workload);

        let (diff, _) = resource_diff(None, workload, ctx.printer.color())?;
        ctx.printer.println("Create workload:");
        ctx.printer.println(diff);

        print_notices(ctx, notices);

        if !self.confirmed(ctx, workload, "Do you want to create this workload?") {
            return Ok(false);
        }

        ctx.client.create_workload(workload).await?;
        ctx.printer.success(format!("Created workload {:?}", workload.name_or_empty()));
        Ok(true)
    }

    /// Preview, confirm and update `current` to `workload`. Returns whether it
    /// was updated.
    pub async fn update(
        &self,
        ctx: &mut CommandContext,
        current: &Workload,
        workload: &Workload,
        notices: &[String],
    ) -> Result<bool, CliError> {
        print_warnings(ctx, workload);

        let (diff, unchanged) = resource_diff(Some(current), workload, ctx.printer.color())?;
        if unchanged {
            ctx.printer.info("Workload is unchanged, skipping update");
            return Ok(false);
        }
        ctx.printer.println("Update workload:");
        ctx.printer.println(diff);

        print_notices(ctx, notices);

        let message = format!("Really update the workload {:?}?", workload.name_or_empty());
        if !self.confirmed(ctx, workload, &message) {
            return Ok(false);
        }

        if let Err(e) = ctx.client.update_workload(workload).await {
            if e.is_conflict() {
                ctx.printer.error_line(
                    "conflict updating workload, the object was modified by another user; please run the update command again",
                );
                return Err(CliError::silent(e));
            }
            return Err(e.into());
        }
        ctx.printer.success(format!("Updated workload {:?}", workload.name_or_empty()));
        Ok(true)
    }

    fn confirmed(&self, ctx: &mut CommandContext, workload: &Workload, message: &str) -> bool {
        if self.yes {
            return true;
        }
        if self.reads_stdin() {
            ctx.printer.error(
                "Skipping workload, cannot confirm intent. Run command with --yes flag to confirm intent when providing input from stdin",
            );
            return false;
        }
        let accepted = confirm(&ctx.printer, ctx.stdin.as_mut(), message).unwrap_or_else(|e| {
            debug!("Prompt failed: {e}");
            false
        });
        if !accepted {
            ctx.printer.info(format!("Skipping workload {:?}", workload.name_or_empty()));
        }
        accepted
    }

    /// Block until the workload is ready when `--wait` or `--tail` is set,
    /// following its logs for `--tail`.
    pub async fn wait_and_tail(&self, ctx: &CommandContext, workload: &Workload) -> Result<(), CliError> {
        let tail = self.tail || self.tail_timestamp;
        if !self.wait && !tail {
            return Ok(());
        }

        let namespace = workload.namespace_or_empty().to_string();
        let name = workload.name_or_empty().to_string();
        ctx.printer.info(format!("Waiting for workload {name:?} to become ready..."));

        let client = Arc::clone(&ctx.client);
        let (ns, n) = (namespace.clone(), name.clone());
        let wait_worker: Worker = async move {
            let events = client.watch_workload(&ns, &n).await?;
            wait::until_condition(events, crds::workload_ready_condition).await
        }
        .boxed();

        let tail_worker: Option<Worker> = tail.then(|| {
            let client = Arc::clone(&ctx.client);
            let printer = ctx.printer.clone();
            let request = LogRequest {
                namespace: namespace.clone(),
                selector: format!("{WORKLOAD_NAME_LABEL}={name}"),
                containers: Vec::new(),
                since: Duration::from_secs(1),
                timestamps: self.tail_timestamp,
            };
            async move { logs::tail(client, printer, request).await.map_err(WaitError::from) }.boxed()
        });

        match wait::race(self.wait_timeout, wait_worker, tail_worker).await {
            Ok(()) => {
                ctx.printer.info(format!("Workload {name:?} is ready"));
                Ok(())
            }
            Err(WaitError::Timeout(timeout)) => {
                let err = WaitError::Timeout(timeout);
                ctx.printer.error_line(format!("{err} waiting for {name:?} to become ready"));
                Err(CliError::silent(err))
            }
            Err(err) => {
                ctx.printer.eerror_line(&err);
                Err(CliError::silent(err))
            }
        }
    }
}

/// Read a workload from `path`, or from stdin for `-`.
pub fn read_workload_file(ctx: &mut CommandContext, path: &str) -> Result<Workload, CliError> {
    let mut raw = String::new();
    if path == STDIN_FILE {
        ctx.stdin
            .read_to_string(&mut raw)
            .map_err(|e| CliError::Input(format!("unable to open file {path:?}: {e}")))?;
    } else {
        raw = std::fs::read_to_string(path)
            .map_err(|e| CliError::Input(format!("unable to open file {path:?}: {e}")))?;
    }

    parse_workload(&raw).map_err(|e| CliError::Input(format!("unable to load file {path:?}: {e}")))
}

/// Parse a single workload document, rejecting other resource kinds.
pub fn parse_workload(raw: &str) -> Result<Workload, CliError> {
    let mut value: serde_json::Value = serde_yaml::from_str(raw)?;
    let serde_json::Value::Object(object) = &mut value else {
        return Err(CliError::Input("expected a single Workload resource".to_string()));
    };

    for (field, expected) in [("apiVersion", API_VERSION), ("kind", KIND)] {
        match object.get(field).and_then(serde_json::Value::as_str) {
            Some(actual) if actual != expected => {
                return Err(CliError::Input(format!("{field} {actual:?} is not {expected:?}")));
            }
            Some(_) => {}
            None => {
                object.insert(field.to_string(), serde_json::Value::String(expected.to_string()));
            }
        }
    }

    Ok(serde_json::from_value(value)?)
}

fn print_warnings(ctx: &CommandContext, workload: &Workload) {
    for warning in workload.deprecation_warnings() {
        ctx.printer.info(format!("WARNING: {warning}"));
    }
}

fn print_notices(ctx: &CommandContext, notices: &[String]) {
    for notice in notices {
        ctx.printer.info(format!("NOTICE: {notice}\n"));
    }
}

/// Print where to follow up on a submitted workload.
pub fn display_next_steps(ctx: &CommandContext, workload: &Workload) {
    let command = ctx.config.workload_command();
    let name = workload.name_or_empty();
    let hint = ctx.namespace_hint(workload.namespace_or_empty());
    ctx.printer.info(format!("To see logs:   \"{command} tail {name}{hint}\""));
    ctx.printer.info(format!("To get status: \"{command} get {name}{hint}\""));
}

/// Fail with a readable message when `namespace` does not exist.
pub async fn validate_namespace(ctx: &CommandContext, namespace: &str) -> Result<(), CliError> {
    match ctx.client.get_namespace(namespace).await {
        Err(e) if e.is_not_found() => {
            ctx.printer.eerror_line(format!(
                "namespace {namespace:?} not found, it may not exist or user does not have permissions to read it."
            ));
            Err(CliError::silent(e))
        }
        Err(e) => {
            debug!("Unable to read namespace {namespace}: {e}");
            Ok(())
        }
        Ok(_) => Ok(()),
    }
}

/// Create `workload` after the caller checked it does not exist yet.
pub async fn submit_create(opts: &WorkloadOptions, ctx: &mut CommandContext, mut workload: Workload) -> Result<(), CliError> {
    let notices = opts.apply_and_validate(&mut workload)?;

    if opts.dry_run {
        return WorkloadOptions::dry_run(ctx, &workload);
    }

    if !opts.create(ctx, &workload, &notices).await? {
        return Ok(());
    }
    ctx.printer.info("");
    display_next_steps(ctx, &workload);
    ctx.printer.info("");

    opts.wait_and_tail(ctx, &workload).await
}

/// Update `current` with the file contents and flags.
pub async fn submit_update(
    opts: &WorkloadOptions,
    ctx: &mut CommandContext,
    current: Workload,
    from_file: &Workload,
) -> Result<(), CliError> {
    let mut workload = current.clone();
    workload.merge(from_file);
    let notices = opts.apply_and_validate(&mut workload)?;

    if opts.dry_run {
        return WorkloadOptions::dry_run(ctx, &workload);
    }

    if !opts.update(ctx, &current, &workload, &notices).await? {
        return Ok(());
    }
    ctx.printer.info("");
    display_next_steps(ctx, &workload);
    ctx.printer.info("");

    opts.wait_and_tail(ctx, &workload).await
}

/// Flag value, treating an empty string the same as an absent flag.
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
