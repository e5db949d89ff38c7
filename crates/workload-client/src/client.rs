//! Kubernetes backed workload client.
//!
//! Talks to the API server through `kube::Api` for typed resources and
//! `kube_runtime::watcher` for watches. Log tailing follows every pod matching
//! a selector, including pods that start after the tail began.

use crate::error::ClientError;
use crate::models::{LogLine, LogRequest, WorkloadEvent};
use crate::workload_trait::{LogStream, WorkloadClientTrait, WorkloadEventStream};
use crds::{Deliverable, KnativeService, Workload};
use futures::channel::mpsc::UnboundedSender;
use futures::{future, AsyncBufReadExt, StreamExt, TryStreamExt};
use k8s_openapi::api::core::v1::{Namespace, Pod};
use kube::api::{DeleteParams, ListParams, LogParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use kube_runtime::watcher;
use kube_runtime::WatchStreamExt;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Workload client backed by a live cluster.
#[derive(Clone)]
pub struct KubeWorkloadClient {
    client: Client,
    default_namespace: String,
}

impl std::fmt::Debug for KubeWorkloadClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeWorkloadClient")
            .field("default_namespace", &self.default_namespace)
            .finish_non_exhaustive()
    }
}

impl KubeWorkloadClient {
    /// Create a client from a kubeconfig.
    ///
    /// Without an explicit path or context the configuration is inferred the
    /// same way `kubectl` does (`KUBECONFIG`, `~/.kube/config`, in-cluster).
    pub async fn new(kubeconfig: Option<PathBuf>, context: Option<String>) -> Result<Self, ClientError> {
        let options = KubeConfigOptions {
            context,
            ..Default::default()
        };

        let config = match kubeconfig {
            Some(path) => {
                debug!("Loading kubeconfig from {}", path.display());
                let kubeconfig = Kubeconfig::read_from(&path)
                    .map_err(|e| ClientError::Kubeconfig(format!("unable to read {}: {}", path.display(), e)))?;
                Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .map_err(|e| ClientError::Kubeconfig(e.to_string()))?
            }
            None if options.context.is_some() => Config::from_kubeconfig(&options)
                .await
                .map_err(|e| ClientError::Kubeconfig(e.to_string()))?,
            None => Config::infer()
                .await
                .map_err(|e| ClientError::Kubeconfig(e.to_string()))?,
        };

        let default_namespace = config.default_namespace.clone();
        let client = Client::try_from(config)?;
        debug!("Kubernetes client ready, default namespace {}", default_namespace);

        Ok(Self::from_client(client, default_namespace))
    }

    /// Wrap an existing client.
    pub fn from_client(client: Client, default_namespace: impl Into<String>) -> Self {
        Self {
            client,
            default_namespace: default_namespace.into(),
        }
    }

    fn workloads(&self, namespace: &str) -> Api<Workload> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn list_params(selector: &str) -> ListParams {
    if selector.is_empty() {
        ListParams::default()
    } else {
        ListParams::default().labels(selector)
    }
}

#[async_trait::async_trait]
impl WorkloadClientTrait for KubeWorkloadClient {
    fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    async fn get_namespace(&self, name: &str) -> Result<Namespace, ClientError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        api.get(name)
            .await
            .map_err(|e| ClientError::from_api(e, "namespace", name))
    }

    async fn get_workload(&self, namespace: &str, name: &str) -> Result<Workload, ClientError> {
        debug!("Getting workload {}/{}", namespace, name);
        self.workloads(namespace)
            .get(name)
            .await
            .map_err(|e| ClientError::from_api(e, "Workload", &format!("{namespace}/{name}")))
    }

    async fn list_workloads(&self, namespace: Option<&str>) -> Result<Vec<Workload>, ClientError> {
        let api: Api<Workload> = match namespace {
            Some(ns) => self.workloads(ns),
            None => Api::all(self.client.clone()),
        };
        let list = api.list(&ListParams::default()).await?;
        debug!("Listed {} workloads", list.items.len());
        Ok(list.items)
    }

    async fn create_workload(&self, workload: &Workload) -> Result<Workload, ClientError> {
        let namespace = workload.namespace_or_empty();
        let name = workload.name_or_empty();
        debug!("Creating workload {}/{}", namespace, name);
        self.workloads(namespace)
            .create(&PostParams::default(), workload)
            .await
            .map_err(|e| ClientError::from_api(e, "Workload", name))
    }

    async fn update_workload(&self, workload: &Workload) -> Result<Workload, ClientError> {
        let namespace = workload.namespace_or_empty();
        let name = workload.name_or_empty();
        debug!("Updating workload {}/{}", namespace, name);
        self.workloads(namespace)
            .replace(name, &PostParams::default(), workload)
            .await
            .map_err(|e| ClientError::from_api(e, "Workload", name))
    }

    async fn delete_workload(&self, namespace: &str, name: &str) -> Result<(), ClientError> {
        debug!("Deleting workload {}/{}", namespace, name);
        self.workloads(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| ClientError::from_api(e, "Workload", &format!("{namespace}/{name}")))?;
        Ok(())
    }

    async fn get_deliverable(&self, namespace: &str, name: &str) -> Result<Deliverable, ClientError> {
        let api: Api<Deliverable> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| ClientError::from_api(e, "Deliverable", &format!("{namespace}/{name}")))
    }

    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>, ClientError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.list(&list_params(selector)).await?.items)
    }

    async fn list_knative_services(&self, namespace: &str, selector: &str) -> Result<Vec<KnativeService>, ClientError> {
        let api: Api<KnativeService> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.list(&list_params(selector)).await?.items)
    }

    async fn watch_workload(&self, namespace: &str, name: &str) -> Result<WorkloadEventStream, ClientError> {
        info!("Starting watch for workload {}/{}", namespace, name);
        let config = watcher::Config::default().fields(&format!("metadata.name={name}"));

        let stream = watcher(self.workloads(namespace), config)
            .default_backoff()
            .map_err(|e| ClientError::Watch(format!("Watcher stream error: {}", e)))
            .scan(false, |seen, event| {
                let mapped = match event {
                    Ok(watcher::Event::Apply(w) | watcher::Event::InitApply(w)) => {
                        *seen = true;
                        Some(Ok(WorkloadEvent::Applied(w)))
                    }
                    Ok(watcher::Event::Delete(w)) => {
                        *seen = false;
                        Some(Ok(WorkloadEvent::Deleted(w)))
                    }
                    Ok(watcher::Event::Init) => {
                        *seen = false;
                        None
                    }
                    Ok(watcher::Event::InitDone) => (!*seen).then_some(Ok(WorkloadEvent::Missing)),
                    Err(e) => Some(Err(e)),
                };
                future::ready(Some(mapped))
            })
            .filter_map(future::ready)
            .boxed();

        Ok(stream)
    }

    async fn tail_logs(&self, request: LogRequest) -> Result<LogStream, ClientError> {
        info!("Tailing logs for pods matching {} in {}", request.selector, request.namespace);
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &request.namespace);
        let (tx, rx) = futures::channel::mpsc::unbounded();
        tokio::spawn(follow_pods(api, request, tx));
        Ok(rx.boxed())
    }
}

type LogSender = UnboundedSender<Result<LogLine, ClientError>>;

/// Watch pods matching the selector and follow each container once.
async fn follow_pods(api: Api<Pod>, request: LogRequest, tx: LogSender) {
    let config = watcher::Config::default().labels(&request.selector);
    let mut stream = Box::pin(watcher(api.clone(), config).default_backoff());
    let mut followed: HashSet<(String, String)> = HashSet::new();

    while !tx.is_closed() {
        let event = match stream.try_next().await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(e) => {
                warn!("Pod watch error while tailing logs: {}", e);
                continue;
            }
        };

        match event {
            watcher::Event::Apply(pod) | watcher::Event::InitApply(pod) => {
                let name = pod.metadata.name.clone().unwrap_or_default();
                let phase = pod.status.as_ref().and_then(|s| s.phase.as_deref());
                if matches!(phase, None | Some("Pending")) {
                    debug!("Pod {} not started yet", name);
                    continue;
                }
                for container in pod_containers(&pod, &request.containers) {
                    if !followed.insert((name.clone(), container.clone())) {
                        continue;
                    }
                    debug!("Following logs of {}[{}]", name, container);
                    tokio::spawn(follow_container(
                        api.clone(),
                        name.clone(),
                        container,
                        request.since,
                        request.timestamps,
                        tx.clone(),
                    ));
                }
            }
            watcher::Event::Delete(pod) => {
                debug!("Pod deleted: {}", pod.metadata.name.as_deref().unwrap_or("<unknown>"));
            }
            watcher::Event::Init | watcher::Event::InitDone => {}
        }
    }
}

fn pod_containers(pod: &Pod, only: &[String]) -> Vec<String> {
    pod.spec
        .as_ref()
        .map(|spec| {
            spec.containers
                .iter()
                .map(|c| c.name.clone())
                .filter(|name| only.is_empty() || only.contains(name))
                .collect()
        })
        .unwrap_or_default()
}

async fn follow_container(
    api: Api<Pod>,
    pod: String,
    container: String,
    since: Duration,
    timestamps: bool,
    tx: LogSender,
) {
    let params = LogParams {
        container: Some(container.clone()),
        follow: true,
        since_seconds: Some(i64::try_from(since.as_secs()).unwrap_or(i64::MAX).max(1)),
        timestamps,
        ..Default::default()
    };

    let reader = match api.log_stream(&pod, &params).await {
        Ok(reader) => reader,
        Err(e) => {
            warn!("Unable to follow logs of {}[{}]: {}", pod, container, e);
            return;
        }
    };

    let mut lines = Box::pin(reader.lines());
    while let Some(line) = lines.next().await {
        let item = line
            .map(|line| LogLine::new(pod.clone(), container.clone(), line))
            .map_err(|e| ClientError::Logs(format!("{}[{}]: {}", pod, container, e)));
        let failed = item.is_err();
        if tx.unbounded_send(item).is_err() || failed {
            break;
        }
    }
    debug!("Stopped following {}[{}]", pod, container);
}
