//! Mock WorkloadClient for unit testing
//!
//! This module provides a mock implementation of WorkloadClientTrait that can
//! be used in unit tests without a running cluster. Objects live in memory,
//! failures can be induced per operation, and watch and log streams are
//! scripted up front.

use crate::error::ClientError;
use crate::models::{LogLine, LogRequest, WorkloadEvent};
use crate::workload_trait::{LogStream, WorkloadClientTrait, WorkloadEventStream};
use crds::{Deliverable, KnativeService, Workload};
use futures::stream::{self, StreamExt};
use k8s_openapi::api::core::v1::{Namespace, Pod};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    /// `get_namespace`
    GetNamespace,
    /// `get_workload`
    GetWorkload,
    /// `list_workloads`
    ListWorkloads,
    /// `create_workload`
    CreateWorkload,
    /// `update_workload`
    UpdateWorkload,
    /// `delete_workload`
    DeleteWorkload,
    /// `get_deliverable`
    GetDeliverable,
    /// `list_pods`
    ListPods,
    /// `list_knative_services`
    ListKnativeServices,
    /// `watch_workload`
    WatchWorkload,
    /// `tail_logs`
    TailLogs,
}

/// Failure returned for an induced operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    /// Respond with `NotFound`
    NotFound,
    /// Respond with `Conflict`
    Conflict,
    /// Respond with a generic API error
    Api(String),
}

type Key = (String, String);

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

fn selector_matches(selector: &str, labels: Option<&BTreeMap<String, String>>) -> bool {
    selector
        .split(',')
        .filter(|s| !s.is_empty())
        .all(|term| match term.split_once('=') {
            Some((k, v)) => labels.and_then(|l| l.get(k)).is_some_and(|actual| actual == v),
            None => labels.is_some_and(|l| l.contains_key(term)),
        })
}

/// Mock WorkloadClient for testing
///
/// Cloning shares the underlying state, so a test can keep a handle to
/// inspect recorded calls after handing a clone to the code under test.
#[derive(Clone, Debug)]
pub struct MockWorkloadClient {
    default_namespace: String,
    namespaces: Arc<Mutex<HashSet<String>>>,
    workloads: Arc<Mutex<BTreeMap<Key, Workload>>>,
    deliverables: Arc<Mutex<HashMap<Key, Deliverable>>>,
    pods: Arc<Mutex<Vec<Pod>>>,
    knative_services: Arc<Mutex<Vec<KnativeService>>>,
    failures: Arc<Mutex<HashMap<MockOperation, MockFailure>>>,
    watch_events: Arc<Mutex<Option<Vec<WorkloadEvent>>>>,
    log_lines: Arc<Mutex<Vec<LogLine>>>,
    creates: Arc<Mutex<Vec<Workload>>>,
    updates: Arc<Mutex<Vec<Workload>>>,
    deletes: Arc<Mutex<Vec<Key>>>,
    tail_requests: Arc<Mutex<Vec<LogRequest>>>,
    // Counter for generating resource versions
    next_resource_version: Arc<Mutex<u64>>,
}

impl MockWorkloadClient {
    /// Create a new mock client; `default_namespace` exists from the start.
    pub fn new(default_namespace: impl Into<String>) -> Self {
        let default_namespace = default_namespace.into();
        Self {
            namespaces: Arc::new(Mutex::new(HashSet::from([default_namespace.clone()]))),
            default_namespace,
            workloads: Arc::new(Mutex::new(BTreeMap::new())),
            deliverables: Arc::new(Mutex::new(HashMap::new())),
            pods: Arc::new(Mutex::new(Vec::new())),
            knative_services: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            watch_events: Arc::new(Mutex::new(None)),
            log_lines: Arc::new(Mutex::new(Vec::new())),
            creates: Arc::new(Mutex::new(Vec::new())),
            updates: Arc::new(Mutex::new(Vec::new())),
            deletes: Arc::new(Mutex::new(Vec::new())),
            tail_requests: Arc::new(Mutex::new(Vec::new())),
            next_resource_version: Arc::new(Mutex::new(1000)),
        }
    }

    /// Add a namespace (for test setup)
    pub fn add_namespace(&self, name: &str) {
        lock(&self.namespaces).insert(name.to_string());
    }

    /// Add a workload (for test setup); a missing resourceVersion is assigned
    pub fn add_workload(&self, mut workload: Workload) {
        if workload.metadata.resource_version.is_none() {
            workload.metadata.resource_version = Some("999".to_string());
        }
        let k = key(workload.namespace_or_empty(), workload.name_or_empty());
        lock(&self.workloads).insert(k, workload);
    }

    /// Add a deliverable (for test setup)
    pub fn add_deliverable(&self, deliverable: Deliverable) {
        let meta = &deliverable.metadata;
        let k = key(
            meta.namespace.as_deref().unwrap_or_default(),
            meta.name.as_deref().unwrap_or_default(),
        );
        lock(&self.deliverables).insert(k, deliverable);
    }

    /// Add a pod (for test setup)
    pub fn add_pod(&self, pod: Pod) {
        lock(&self.pods).push(pod);
    }

    /// Add a knative service (for test setup)
    pub fn add_knative_service(&self, service: KnativeService) {
        lock(&self.knative_services).push(service);
    }

    /// Make every call of `operation` fail with `failure`
    pub fn induce_failure(&self, operation: MockOperation, failure: MockFailure) {
        lock(&self.failures).insert(operation, failure);
    }

    /// Script the events returned by `watch_workload`.
    ///
    /// Without a script the watch reports the stored workload, or `Missing`.
    /// Either way the stream stays open afterwards, like a real watch.
    pub fn set_watch_events(&self, events: Vec<WorkloadEvent>) {
        *lock(&self.watch_events) = Some(events);
    }

    /// Script the lines returned by `tail_logs`
    pub fn set_log_lines(&self, lines: Vec<LogLine>) {
        *lock(&self.log_lines) = lines;
    }

    /// Current stored copy of a workload
    pub fn workload(&self, namespace: &str, name: &str) -> Option<Workload> {
        lock(&self.workloads).get(&key(namespace, name)).cloned()
    }

    /// Workloads passed to `create_workload`, as submitted
    pub fn created(&self) -> Vec<Workload> {
        lock(&self.creates).clone()
    }

    /// Workloads passed to `update_workload`, as submitted
    pub fn updated(&self) -> Vec<Workload> {
        lock(&self.updates).clone()
    }

    /// `(namespace, name)` pairs passed to `delete_workload`
    pub fn deleted(&self) -> Vec<(String, String)> {
        lock(&self.deletes).clone()
    }

    /// Requests passed to `tail_logs`
    pub fn tail_requests(&self) -> Vec<LogRequest> {
        lock(&self.tail_requests).clone()
    }

    fn check_failure(&self, operation: MockOperation, kind: &str, name: &str) -> Result<(), ClientError> {
        match lock(&self.failures).get(&operation) {
            None => Ok(()),
            Some(MockFailure::NotFound) => Err(not_found(kind, name)),
            Some(MockFailure::Conflict) => Err(ClientError::Conflict {
                kind: kind.to_string(),
                name: name.to_string(),
                message: "the object has been modified; please apply your changes to the latest version and try again".to_string(),
            }),
            Some(MockFailure::Api(message)) => Err(ClientError::Api(message.clone())),
        }
    }

    fn next_resource_version(&self) -> String {
        let mut next = lock(&self.next_resource_version);
        *next += 1;
        next.to_string()
    }
}

fn not_found(kind: &str, name: &str) -> ClientError {
    ClientError::NotFound {
        kind: kind.to_string(),
        name: name.to_string(),
    }
}

fn now() -> Option<Time> {
    let stamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    serde_json::from_value(serde_json::Value::String(stamp)).ok()
}

fn in_namespace(meta: &ObjectMeta, namespace: &str) -> bool {
    meta.namespace.as_deref() == Some(namespace)
}

#[async_trait::async_trait]
impl WorkloadClientTrait for MockWorkloadClient {
    fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    async fn get_namespace(&self, name: &str) -> Result<Namespace, ClientError> {
        self.check_failure(MockOperation::GetNamespace, "namespace", name)?;
        if !lock(&self.namespaces).contains(name) {
            return Err(not_found("namespace", name));
        }
        Ok(Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    async fn get_workload(&self, namespace: &str, name: &str) -> Result<Workload, ClientError> {
        let display = format!("{namespace}/{name}");
        self.check_failure(MockOperation::GetWorkload, "Workload", &display)?;
        self.workload(namespace, name)
            .ok_or_else(|| not_found("Workload", &display))
    }

    async fn list_workloads(&self, namespace: Option<&str>) -> Result<Vec<Workload>, ClientError> {
        self.check_failure(MockOperation::ListWorkloads, "Workload", "")?;
        Ok(lock(&self.workloads)
            .iter()
            .filter(|((ns, _), _)| namespace.is_none_or(|n| n == ns))
            .map(|(_, w)| w.clone())
            .collect())
    }

    async fn create_workload(&self, workload: &Workload) -> Result<Workload, ClientError> {
        let name = workload.name_or_empty().to_string();
        self.check_failure(MockOperation::CreateWorkload, "Workload", &name)?;
        lock(&self.creates).push(workload.clone());

        let k = key(workload.namespace_or_empty(), &name);
        if lock(&self.workloads).contains_key(&k) {
            return Err(ClientError::Api(format!("workloads.carto.run {name:?} already exists")));
        }

        let mut stored = workload.clone();
        stored.metadata.resource_version = Some(self.next_resource_version());
        stored.metadata.generation = Some(1);
        if stored.metadata.creation_timestamp.is_none() {
            stored.metadata.creation_timestamp = now();
        }
        lock(&self.workloads).insert(k, stored.clone());
        Ok(stored)
    }

    async fn update_workload(&self, workload: &Workload) -> Result<Workload, ClientError> {
        let name = workload.name_or_empty().to_string();
        self.check_failure(MockOperation::UpdateWorkload, "Workload", &name)?;
        lock(&self.updates).push(workload.clone());

        let k = key(workload.namespace_or_empty(), &name);
        let mut workloads = lock(&self.workloads);
        let Some(current) = workloads.get(&k) else {
            return Err(not_found("Workload", &format!("{}/{}", k.0, k.1)));
        };
        if workload.metadata.resource_version.is_some()
            && workload.metadata.resource_version != current.metadata.resource_version
        {
            return Err(ClientError::Conflict {
                kind: "Workload".to_string(),
                name,
                message: "resourceVersion is stale".to_string(),
            });
        }

        let mut stored = workload.clone();
        stored.metadata.resource_version = Some(self.next_resource_version());
        stored.metadata.generation = Some(current.metadata.generation.unwrap_or_default() + 1);
        workloads.insert(k, stored.clone());
        Ok(stored)
    }

    async fn delete_workload(&self, namespace: &str, name: &str) -> Result<(), ClientError> {
        let display = format!("{namespace}/{name}");
        self.check_failure(MockOperation::DeleteWorkload, "Workload", &display)?;
        if lock(&self.workloads).remove(&key(namespace, name)).is_none() {
            return Err(not_found("Workload", &display));
        }
        lock(&self.deletes).push(key(namespace, name));
        Ok(())
    }

    async fn get_deliverable(&self, namespace: &str, name: &str) -> Result<Deliverable, ClientError> {
        let display = format!("{namespace}/{name}");
        self.check_failure(MockOperation::GetDeliverable, "Deliverable", &display)?;
        lock(&self.deliverables)
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| not_found("Deliverable", &display))
    }

    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>, ClientError> {
        self.check_failure(MockOperation::ListPods, "Pod", "")?;
        Ok(lock(&self.pods)
            .iter()
            .filter(|p| in_namespace(&p.metadata, namespace))
            .filter(|p| selector_matches(selector, p.metadata.labels.as_ref()))
            .cloned()
            .collect())
    }

    async fn list_knative_services(&self, namespace: &str, selector: &str) -> Result<Vec<KnativeService>, ClientError> {
        self.check_failure(MockOperation::ListKnativeServices, "Service", "")?;
        Ok(lock(&self.knative_services)
            .iter()
            .filter(|s| in_namespace(&s.metadata, namespace))
            .filter(|s| selector_matches(selector, s.metadata.labels.as_ref()))
            .cloned()
            .collect())
    }

    async fn watch_workload(&self, namespace: &str, name: &str) -> Result<WorkloadEventStream, ClientError> {
        self.check_failure(MockOperation::WatchWorkload, "Workload", name)?;
        let events = lock(&self.watch_events).clone().unwrap_or_else(|| {
            match self.workload(namespace, name) {
                Some(w) => vec![WorkloadEvent::Applied(w)],
                None => vec![WorkloadEvent::Missing],
            }
        });
        Ok(stream::iter(events.into_iter().map(Ok))
            .chain(stream::pending())
            .boxed())
    }

    async fn tail_logs(&self, request: LogRequest) -> Result<LogStream, ClientError> {
        self.check_failure(MockOperation::TailLogs, "Pod", &request.selector)?;
        lock(&self.tail_requests).push(request);
        let lines = lock(&self.log_lines).clone();
        Ok(stream::iter(lines.into_iter().map(Ok))
            .chain(stream::pending())
            .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn workload(namespace: &str, name: &str) -> Workload {
        Workload {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let client = MockWorkloadClient::new("default");
        let created = client.create_workload(&workload("default", "petclinic")).await.unwrap();
        assert!(created.metadata.resource_version.is_some());

        let fetched = client.get_workload("default", "petclinic").await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(client.created().len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_workload_is_not_found() {
        let client = MockWorkloadClient::new("default");
        let err = client.get_workload("default", "nope").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), r#"Workload "default/nope" not found"#);
    }

    #[tokio::test]
    async fn test_update_with_stale_resource_version_conflicts() {
        let client = MockWorkloadClient::new("default");
        client.add_workload(workload("default", "petclinic"));

        let mut stale = client.workload("default", "petclinic").unwrap();
        stale.metadata.resource_version = Some("1".to_string());
        let err = client.update_workload(&stale).await.unwrap_err();
        assert!(err.is_conflict());

        let current = client.workload("default", "petclinic").unwrap();
        client.update_workload(&current).await.unwrap();
        assert_eq!(client.updated().len(), 2);
    }

    #[tokio::test]
    async fn test_induced_failure() {
        let client = MockWorkloadClient::new("default");
        client.induce_failure(MockOperation::ListPods, MockFailure::Api("boom".to_string()));
        let err = client.list_pods("default", "").await.unwrap_err();
        assert_eq!(err.to_string(), "API error: boom");
    }

    #[tokio::test]
    async fn test_list_pods_filters_by_selector() {
        let client = MockWorkloadClient::new("default");
        let labelled = Pod {
            metadata: ObjectMeta {
                name: Some("pod1".to_string()),
                namespace: Some("default".to_string()),
                labels: Some(BTreeMap::from([(
                    "carto.run/workload-name".to_string(),
                    "petclinic".to_string(),
                )])),
                ..Default::default()
            },
            ..Default::default()
        };
        let other = Pod {
            metadata: ObjectMeta {
                name: Some("pod2".to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        client.add_pod(labelled);
        client.add_pod(other);

        let pods = client
            .list_pods("default", "carto.run/workload-name=petclinic")
            .await
            .unwrap();
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].metadata.name.as_deref(), Some("pod1"));
    }

    #[tokio::test]
    async fn test_watch_reports_missing_workload() {
        let client = MockWorkloadClient::new("default");
        let mut stream = client.watch_workload("default", "petclinic").await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), WorkloadEvent::Missing);
    }
}
