//! WorkloadClient trait for mocking
//!
//! This trait abstracts cluster access so that command handlers can be unit
//! tested. The kube backed [`KubeWorkloadClient`](crate::KubeWorkloadClient)
//! implements it, and tests use [`MockWorkloadClient`](crate::MockWorkloadClient)
//! behind the `test-util` feature.

use crate::error::ClientError;
use crate::models::{LogLine, LogRequest, WorkloadEvent};
use crds::{Deliverable, KnativeService, Workload};
use futures::stream::BoxStream;
use k8s_openapi::api::core::v1::{Namespace, Pod};

/// Stream of workload changes.
pub type WorkloadEventStream = BoxStream<'static, Result<WorkloadEvent, ClientError>>;

/// Stream of log lines.
pub type LogStream = BoxStream<'static, Result<LogLine, ClientError>>;

/// Trait for cluster operations used by the CLI
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait WorkloadClientTrait: Send + Sync {
    /// Namespace selected by the kubeconfig context
    fn default_namespace(&self) -> &str;

    /// Fetch a namespace, failing with `NotFound` when it is not readable
    async fn get_namespace(&self, name: &str) -> Result<Namespace, ClientError>;

    // Workload operations
    async fn get_workload(&self, namespace: &str, name: &str) -> Result<Workload, ClientError>;
    /// List workloads in `namespace`, or across all namespaces for `None`
    async fn list_workloads(&self, namespace: Option<&str>) -> Result<Vec<Workload>, ClientError>;
    async fn create_workload(&self, workload: &Workload) -> Result<Workload, ClientError>;
    /// Replace a workload, failing with `Conflict` when its resourceVersion is stale
    async fn update_workload(&self, workload: &Workload) -> Result<Workload, ClientError>;
    async fn delete_workload(&self, namespace: &str, name: &str) -> Result<(), ClientError>;

    // Related resources
    async fn get_deliverable(&self, namespace: &str, name: &str) -> Result<Deliverable, ClientError>;
    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>, ClientError>;
    async fn list_knative_services(&self, namespace: &str, selector: &str) -> Result<Vec<KnativeService>, ClientError>;

    // Streaming
    /// Watch a single workload by name
    async fn watch_workload(&self, namespace: &str, name: &str) -> Result<WorkloadEventStream, ClientError>;
    /// Follow logs of every pod matching the request selector, including pods started later
    async fn tail_logs(&self, request: LogRequest) -> Result<LogStream, ClientError>;
}
