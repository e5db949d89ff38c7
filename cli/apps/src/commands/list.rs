//! `workload list`

use crate::commands::get::{app_label, type_label};
use crate::commands::CommandContext;
use crate::error::CliError;
use crate::printer::{self, OutputFormat, EMPTY, OUTPUT_FORMATS, UNKNOWN};
use crate::validation;
use clap::Args;
use crds::{FieldErrors, Workload};
use serde_json::json;
use tracing::debug;

/// Table of workloads present in a namespace or across all namespaces.
#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Kubernetes namespace, defaults to the kubeconfig context namespace
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Use all kubernetes namespaces
    #[arg(short = 'A', long)]
    pub all_namespaces: bool,

    /// Application the workloads are part of
    #[arg(long)]
    pub app: Option<String>,

    /// Output the workloads formatted (json, yaml, yml)
    #[arg(short, long)]
    pub output: Option<String>,
}

impl ListArgs {
    /// Check the namespace and output format.
    pub fn validate(&self) -> FieldErrors {
        let mut errs = FieldErrors::new();
        if let Some(namespace) = &self.namespace {
            errs = errs.also(validation::namespace(namespace, "--namespace"));
        }
        if let Some(output) = &self.output {
            errs = errs.also(validation::one_of(output, "--output", OUTPUT_FORMATS));
        }
        errs
    }
}

/// Run the list command.
pub async fn run(args: ListArgs, ctx: &mut CommandContext) -> Result<(), CliError> {
    args.validate().into_result()?;

    let namespace = (!args.all_namespaces).then(|| ctx.namespace(args.namespace.as_deref()));
    let mut workloads = ctx.client.list_workloads(namespace.as_deref()).await?;
    if let Some(app) = args.app.as_deref() {
        workloads.retain(|w| app_label(w) == Some(app));
    }
    workloads.sort_by(|a, b| {
        (a.namespace_or_empty(), a.name_or_empty()).cmp(&(b.namespace_or_empty(), b.name_or_empty()))
    });
    debug!("Listed {} workloads", workloads.len());

    if let Some(format) = args.output.as_deref().and_then(OutputFormat::parse) {
        let items = workloads.iter().map(printer::to_sorted_value).collect::<Result<Vec<_>, _>>()?;
        let list = json!({
            "apiVersion": "carto.run/v1alpha1",
            "items": items,
            "kind": "WorkloadList",
            "metadata": {},
        });
        ctx.printer.print(format.render(&list)?);
        return Ok(());
    }

    if workloads.is_empty() {
        ctx.printer.info("No workloads found.");
        return Ok(());
    }

    let mut header = vec!["NAME", "TYPE", "APP", "READY", "AGE"];
    if args.all_namespaces {
        header.insert(0, "NAMESPACE");
    }
    let mut rows = vec![header.into_iter().map(str::to_string).collect::<Vec<_>>()];
    rows.extend(workloads.iter().map(|w| row(w, args.all_namespaces)));
    ctx.printer.print(printer::table("", rows)?);
    Ok(())
}

fn row(workload: &Workload, with_namespace: bool) -> Vec<String> {
    let ready = workload
        .ready_condition()
        .map(|c| c.status.clone())
        .unwrap_or_else(|| UNKNOWN.to_string());
    let age = printer::age(workload.metadata.creation_timestamp.as_ref().and_then(printer::timestamp));

    let mut cells = Vec::with_capacity(6);
    if with_namespace {
        cells.push(workload.namespace_or_empty().to_string());
    }
    cells.extend([
        workload.name_or_empty().to_string(),
        type_label(workload).unwrap_or(EMPTY).to_string(),
        app_label(workload).unwrap_or(EMPTY).to_string(),
        ready,
        age,
    ]);
    cells
}
