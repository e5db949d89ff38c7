//! `workload get`: details, status and related resources of one workload.

use crate::commands::options;
use crate::commands::CommandContext;
use crate::error::CliError;
use crate::printer::{self, OutputFormat, EMPTY, NONE, OUTPUT_FORMATS, UNKNOWN};
use crate::validation;
use clap::Args;
use crds::{
    condition_status, Deliverable, FieldErrors, KnativeService, RealizedResource, Workload, APP_PART_OF_LABEL,
    CONDITION_HEALTHY, CONDITION_READY, DELIVERABLE_KIND, WORKLOAD_NAME_LABEL, WORKLOAD_TYPE_LABEL,
};
use k8s_openapi::api::core::v1::Pod;
use tracing::{debug, warn};

const INDENT: &str = "   ";

/// Get details from a workload.
#[derive(Args, Debug, Clone)]
pub struct GetArgs {
    /// Workload name
    pub name: String,

    /// Kubernetes namespace, defaults to the kubeconfig context namespace
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Export the workload without status or server managed fields
    #[arg(long)]
    pub export: bool,

    /// Output the workload formatted (json, yaml, yml)
    #[arg(short, long)]
    pub output: Option<String>,
}

impl GetArgs {
    /// Check the name, namespace and output format.
    pub fn validate(&self) -> FieldErrors {
        let mut errs = validation::k8s_name(&self.name, "name");
        if let Some(namespace) = &self.namespace {
            errs = errs.also(validation::namespace(namespace, "--namespace"));
        }
        if let Some(output) = &self.output {
            errs = errs.also(validation::one_of(output, "--output", OUTPUT_FORMATS));
        }
        errs
    }
}

/// Run the get command.
pub async fn run(args: GetArgs, ctx: &mut CommandContext) -> Result<(), CliError> {
    args.validate().into_result()?;
    let namespace = ctx.namespace(args.namespace.as_deref());

    let workload = match ctx.client.get_workload(&namespace, &args.name).await {
        Ok(workload) => workload,
        Err(e) if e.is_not_found() => {
            options::validate_namespace(ctx, &namespace).await?;
            ctx.printer.error(format!("Workload \"{namespace}/{}\" not found", args.name));
            return Err(CliError::silent(e));
        }
        Err(e) => return Err(e.into()),
    };

    let format = args.output.as_deref().and_then(OutputFormat::parse);
    if args.export {
        let value = printer::clean_resource(&workload)?;
        ctx.printer.print(format.unwrap_or(OutputFormat::Yaml).render(&value)?);
        return Ok(());
    }
    if let Some(format) = format {
        ctx.printer.print(format.render(&printer::to_sorted_value(&workload)?)?);
        return Ok(());
    }

    let report = Report::collect(ctx, workload).await;
    ctx.printer.print(report.render(ctx)?);
    Ok(())
}

/// Workload plus the resources gathered around it.
struct Report {
    workload: Workload,
    deliverable: Option<Deliverable>,
    pods: Vec<Pod>,
    knative_services: Vec<KnativeService>,
}

impl Report {
    async fn collect(ctx: &CommandContext, workload: Workload) -> Self {
        let namespace = workload.namespace_or_empty().to_string();
        let selector = format!("{WORKLOAD_NAME_LABEL}={}", workload.name_or_empty());

        let deliverable = match workload.deliverable_ref() {
            Some(reference) => {
                let name = reference.name.as_deref().unwrap_or(workload.name_or_empty());
                match ctx.client.get_deliverable(&namespace, name).await {
                    Ok(deliverable) => Some(deliverable),
                    Err(e) if e.is_not_found() => {
                        debug!("Deliverable {namespace}/{name} not stamped yet");
                        None
                    }
                    Err(e) => {
                        warn!("Unable to get deliverable {namespace}/{name}: {e}");
                        None
                    }
                }
            }
            None => None,
        };

        let pods = ctx.client.list_pods(&namespace, &selector).await.unwrap_or_else(|e| {
            warn!("Unable to list pods for {selector}: {e}");
            Vec::new()
        });

        let knative_services = ctx
            .client
            .list_knative_services(&namespace, &selector)
            .await
            .unwrap_or_else(|e| {
                warn!("Unable to list knative services for {selector}: {e}");
                Vec::new()
            });

        Self {
            workload,
            deliverable,
            pods,
            knative_services,
        }
    }

    fn render(&self, ctx: &CommandContext) -> Result<String, CliError> {
        let heading = |text: &str| format!("{}\n", ctx.printer.heading(text));
        let mut out = String::new();

        out += &heading("📡 Overview");
        out += &self.overview()?;
        out += "\n";

        if let Some(source) = self.source()? {
            out += &heading("💾 Source");
            out += &source;
            out += "\n";
        }

        out += &self.supply_chain(&heading)?;
        out += &self.delivery(&heading)?;

        out += &heading("💬 Messages");
        out += &self.messages()?;
        out += "\n";

        if !self.workload.spec.service_claims.is_empty() {
            out += &heading("🔁 Services");
            out += &self.services()?;
            out += "\n";
        }

        if self.pods.is_empty() {
            out += "No pods found for workload.\n";
        } else {
            out += &heading("🛶 Pods");
            out += &self.pods_table()?;
        }
        out += "\n";

        if !self.knative_services.is_empty() {
            out += &heading("🚢 Knative Services");
            out += &self.knative_table()?;
            out += "\n";
        }

        let name = self.workload.name_or_empty();
        let hint = ctx.namespace_hint(self.workload.namespace_or_empty());
        out += &format!("To see logs: \"{} tail {name}{hint}\"\n\n", ctx.config.workload_command());
        Ok(out)
    }

    fn overview(&self) -> Result<String, CliError> {
        let workload_type = label(&self.workload, WORKLOAD_TYPE_LABEL).unwrap_or(EMPTY);
        printer::table(
            INDENT,
            vec![vec!["name:", self.workload.name_or_empty()], vec!["type:", workload_type]],
        )
    }

    fn source(&self) -> Result<Option<String>, CliError> {
        let spec = &self.workload.spec;
        let source = spec.source.as_ref();
        let mut rows: Vec<Vec<&str>> = Vec::new();
        if let Some(git) = source.and_then(|s| s.git.as_ref()) {
            rows.push(vec!["type:", "git"]);
            rows.push(vec!["url:", git.url.as_str()]);
            for (key, value) in [
                ("branch:", &git.git_ref.branch),
                ("tag:", &git.git_ref.tag),
                ("commit:", &git.git_ref.commit),
            ] {
                if let Some(value) = value {
                    rows.push(vec![key, value.as_str()]);
                }
            }
        } else if let Some(image) = source.and_then(|s| s.image.as_deref()) {
            rows.push(vec!["type:", "source image"]);
            rows.push(vec!["image:", image]);
        } else if let Some(image) = spec.image.as_deref() {
            rows.push(vec!["type:", "image"]);
            rows.push(vec!["image:", image]);
        } else {
            return Ok(None);
        }
        if let Some(sub_path) = source.and_then(|s| s.sub_path.as_deref()) {
            rows.push(vec!["sub-path:", sub_path]);
        }
        printer::table(INDENT, rows).map(Some)
    }

    fn supply_chain(&self, heading: &dyn Fn(&str) -> String) -> Result<String, CliError> {
        let status = self
            .workload
            .status
            .as_ref()
            .filter(|s| !s.conditions.is_empty() || s.supply_chain_ref.is_some() || !s.resources.is_empty());

        let mut out = match status {
            Some(status) => {
                let name = status
                    .supply_chain_ref
                    .as_ref()
                    .and_then(|r| r.name.as_deref())
                    .unwrap_or(NONE);
                format!("{}{}", heading("📦 Supply Chain"), printer::table(INDENT, vec![vec!["name:", name]])?)
            }
            None => "Supply Chain reference not found.\n".to_string(),
        };
        out += "\n";

        let resources: Vec<&RealizedResource> = status
            .map(|s| s.resources.iter().filter(|r| !is_deliverable_stamp(r)).collect())
            .unwrap_or_default();
        if resources.is_empty() {
            out += &format!("{INDENT}Supply Chain resources not found.\n");
        } else {
            out += &resources_table(&resources)?;
        }
        out += "\n";
        Ok(out)
    }

    fn delivery(&self, heading: &dyn Fn(&str) -> String) -> Result<String, CliError> {
        let mut out = heading("🚚 Delivery");
        let status = self.deliverable.as_ref().and_then(|d| d.status.as_ref());
        match status {
            Some(status) => {
                let name = status.delivery_ref.as_ref().and_then(|r| r.name.as_deref()).unwrap_or(NONE);
                out += &printer::table(INDENT, vec![vec!["name:", name]])?;
                out += "\n";
                let resources: Vec<&RealizedResource> = status.resources.iter().collect();
                if resources.is_empty() {
                    out += &format!("{INDENT}Delivery resources not found.\n");
                } else {
                    out += &resources_table(&resources)?;
                }
            }
            None => out += &format!("\n{INDENT}Delivery resources not found.\n"),
        }
        out += "\n";
        Ok(out)
    }

    fn messages(&self) -> Result<String, CliError> {
        let workload_rows = message_rows("Workload", self.workload.status.as_ref().map(|s| s.conditions.as_slice()));
        let deliverable_rows = message_rows(
            "Deliverable",
            self.deliverable
                .as_ref()
                .and_then(|d| d.status.as_ref())
                .map(|s| s.conditions.as_slice()),
        );
        if workload_rows.is_empty() && deliverable_rows.is_empty() {
            return Ok(format!("{INDENT}No messages found.\n"));
        }

        // each owner gets its own column alignment
        let mut out = String::new();
        for rows in [workload_rows, deliverable_rows] {
            if !rows.is_empty() {
                out += &printer::table(INDENT, rows)?;
            }
        }
        Ok(out)
    }

    fn services(&self) -> Result<String, CliError> {
        let mut rows = vec![vec![
            "CLAIM".to_string(),
            "NAME".to_string(),
            "KIND".to_string(),
            "API VERSION".to_string(),
        ]];
        for claim in &self.workload.spec.service_claims {
            let (name, kind, api_version) = match &claim.claim_ref {
                Some(r) => (r.name.clone(), r.kind.clone(), r.api_version.clone()),
                None => (EMPTY.to_string(), EMPTY.to_string(), EMPTY.to_string()),
            };
            rows.push(vec![claim.name.clone(), name, kind, api_version]);
        }
        printer::table(INDENT, rows)
    }

    fn pods_table(&self) -> Result<String, CliError> {
        let mut rows = vec![vec![
            "NAME".to_string(),
            "READY".to_string(),
            "STATUS".to_string(),
            "RESTARTS".to_string(),
            "AGE".to_string(),
        ]];
        rows.extend(self.pods.iter().map(pod_row));
        printer::table(INDENT, rows)
    }

    fn knative_table(&self) -> Result<String, CliError> {
        let mut rows = vec![vec!["NAME".to_string(), "READY".to_string(), "URL".to_string()]];
        for service in &self.knative_services {
            rows.push(vec![
                service.metadata.name.clone().unwrap_or_default(),
                if service.is_ready() { "Ready" } else { "not-Ready" }.to_string(),
                service.url().unwrap_or(EMPTY).to_string(),
            ]);
        }
        printer::table(INDENT, rows)
    }
}

fn label<'a>(workload: &'a Workload, key: &str) -> Option<&'a str> {
    workload.metadata.labels.as_ref()?.get(key).map(String::as_str)
}

/// `Owner [reason]:` rows for the Ready and Healthy conditions that are not true.
fn message_rows(owner: &str, conditions: Option<&[crds::Condition]>) -> Vec<Vec<String>> {
    let conditions = conditions.unwrap_or_default();
    [CONDITION_READY, CONDITION_HEALTHY]
        .into_iter()
        .filter_map(|type_| crds::find_condition(conditions, type_))
        .filter(|c| !c.is_true())
        .filter_map(|c| {
            let message = c.message.as_deref().filter(|m| !m.is_empty())?;
            let reason = c.reason.as_deref().unwrap_or_default();
            Some(vec![format!("{owner} [{reason}]:"), message.to_string()])
        })
        .collect()
}

fn is_deliverable_stamp(resource: &RealizedResource) -> bool {
    resource
        .stamped_ref
        .as_ref()
        .is_some_and(|r| r.kind.as_deref() == Some(DELIVERABLE_KIND))
}

fn resources_table(resources: &[&RealizedResource]) -> Result<String, CliError> {
    let mut rows = vec![vec![
        "RESOURCE".to_string(),
        "READY".to_string(),
        "HEALTHY".to_string(),
        "TIME".to_string(),
        "OUTPUT".to_string(),
    ]];
    for resource in resources {
        let since = crds::find_condition(&resource.conditions, CONDITION_READY).and_then(|c| c.last_transition_time);
        let output = match &resource.stamped_ref {
            Some(r) => format!(
                "{}/{}",
                r.kind.as_deref().unwrap_or_default(),
                r.name.as_deref().unwrap_or_default()
            ),
            None => "not found".to_string(),
        };
        rows.push(vec![
            resource.name.clone(),
            condition_status(&resource.conditions, CONDITION_READY),
            condition_status(&resource.conditions, CONDITION_HEALTHY),
            printer::age(since),
            output,
        ]);
    }
    printer::table(INDENT, rows)
}

fn pod_row(pod: &Pod) -> Vec<String> {
    let status = pod.status.as_ref();
    let containers = status.and_then(|s| s.container_statuses.as_deref()).unwrap_or_default();
    let ready = containers.iter().filter(|c| c.ready).count();
    let restarts: i32 = containers.iter().map(|c| c.restart_count).sum();
    let phase = status
        .and_then(|s| s.reason.clone().or_else(|| s.phase.clone()))
        .unwrap_or_default();
    let age = match pod.metadata.creation_timestamp.as_ref() {
        Some(time) => printer::age(printer::timestamp(time)),
        None => UNKNOWN.to_string(),
    };
    vec![
        pod.metadata.name.clone().unwrap_or_default(),
        format!("{ready}/{}", containers.len()),
        phase,
        restarts.to_string(),
        age,
    ]
}

/// Part-of label shown in the `APP` column of `workload list`.
pub(crate) fn app_label(workload: &Workload) -> Option<&str> {
    label(workload, APP_PART_OF_LABEL)
}

/// `type` label shown in the `TYPE` column of `workload list`.
pub(crate) fn type_label(workload: &Workload) -> Option<&str> {
    label(workload, WORKLOAD_TYPE_LABEL)
}
