//! Builders shared by command tests.

use crate::commands::CommandContext;
use crate::config::AppConfig;
use crate::output::CapturedOutput;
use crds::{Condition, Deliverable, KnativeService, KnativeServiceStatus, Workload, WorkloadStatus};
use k8s_openapi::api::core::v1::{ContainerStatus, Pod, PodStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::Arc;
use workload_client::MockWorkloadClient;

pub fn meta(namespace: &str, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

pub fn workload(namespace: &str, name: &str) -> Workload {
    Workload {
        metadata: meta(namespace, name),
        ..Default::default()
    }
}

/// Workload with a `Ready` condition for its current generation.
pub fn workload_with_ready(namespace: &str, name: &str, status: &str, reason: &str, message: &str) -> Workload {
    let mut w = workload(namespace, name);
    w.metadata.generation = Some(1);
    w.status = Some(WorkloadStatus {
        observed_generation: Some(1),
        conditions: vec![Condition::new("Ready", status).with_reason(reason).with_message(message)],
        ..Default::default()
    });
    w
}

pub fn ready_workload(namespace: &str, name: &str) -> Workload {
    workload_with_ready(namespace, name, "True", "Ready", "")
}

pub fn deliverable(namespace: &str, name: &str) -> Deliverable {
    Deliverable {
        metadata: meta(namespace, name),
        ..Default::default()
    }
}

/// Running pod labelled for `workload` with `ready` of two containers ready.
pub fn pod(namespace: &str, name: &str, workload: &str, ready: usize) -> Pod {
    let mut metadata = meta(namespace, name);
    metadata.labels = Some(BTreeMap::from([(crds::WORKLOAD_NAME_LABEL.to_string(), workload.to_string())]));
    let statuses = (0..2)
        .map(|i| ContainerStatus {
            name: format!("c{i}"),
            ready: i < ready,
            restart_count: 1,
            ..Default::default()
        })
        .collect();
    Pod {
        metadata,
        status: Some(PodStatus {
            phase: Some("Running".to_string()),
            container_statuses: Some(statuses),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn knative_service(namespace: &str, name: &str, workload: &str, ready: bool, url: Option<&str>) -> KnativeService {
    let mut metadata = meta(namespace, name);
    metadata.labels = Some(BTreeMap::from([(crds::WORKLOAD_NAME_LABEL.to_string(), workload.to_string())]));
    KnativeService {
        metadata,
        spec: Default::default(),
        status: Some(KnativeServiceStatus {
            conditions: vec![Condition::new("Ready", if ready { "True" } else { "Unknown" })],
            url: url.map(str::to_string),
            ..Default::default()
        }),
    }
}

/// Command context over `client` with captured output and scripted stdin.
pub fn context(client: &MockWorkloadClient, stdin: &str) -> (CommandContext, CapturedOutput) {
    let (printer, out) = CapturedOutput::printer(false);
    let ctx = CommandContext {
        client: Arc::new(client.clone()),
        config: AppConfig::default(),
        printer,
        stdin: Box::new(Cursor::new(stdin.as_bytes().to_vec())),
    };
    (ctx, out)
}
