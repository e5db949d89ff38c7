//! Request and event types exchanged with the workload client.

use crds::Workload;
use std::time::Duration;

/// A change observed while watching a single workload.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkloadEvent {
    /// The workload was created or updated (also emitted for the initial state)
    Applied(Workload),
    /// The workload was deleted
    Deleted(Workload),
    /// The initial listing did not contain the workload
    Missing,
}

/// Parameters for following the logs of pods matching a selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRequest {
    /// Namespace of the pods
    pub namespace: String,
    /// Label selector, e.g. `carto.run/workload-name=petclinic`
    pub selector: String,
    /// Containers to follow, all containers when empty
    pub containers: Vec<String>,
    /// Only return logs newer than this
    pub since: Duration,
    /// Prefix each line with its RFC3339 timestamp
    pub timestamps: bool,
}

/// A single log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Pod the line came from
    pub pod: String,
    /// Container the line came from
    pub container: String,
    /// Line content without trailing newline
    pub line: String,
}

impl LogLine {
    /// Build a log line.
    pub fn new(pod: impl Into<String>, container: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            pod: pod.into(),
            container: container.into(),
            line: line.into(),
        }
    }
}
