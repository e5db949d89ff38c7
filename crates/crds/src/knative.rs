//! Knative Serving `Service`
//!
//! Only the parts of the status needed to report a running workload are
//! modelled; the template is kept as opaque JSON.

use crate::condition::{find_condition, Condition, CONDITION_READY};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[kube(
    group = "serving.knative.dev",
    version = "v1",
    kind = "Service",
    root = "KnativeService",
    namespaced,
    status = "KnativeServiceStatus",
    shortname = "ksvc",
    derive = "PartialEq",
    derive = "Default"
)]
#[serde(rename_all = "camelCase")]
pub struct KnativeServiceSpec {
    /// Revision template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KnativeServiceStatus {
    /// Status conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Public URL of the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Most recent revision that became ready
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_ready_revision_name: Option<String>,
}

impl KnativeService {
    /// `true` when the `Ready` condition is `True`.
    pub fn is_ready(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|s| find_condition(&s.conditions, CONDITION_READY))
            .is_some_and(Condition::is_true)
    }

    /// Public URL, if assigned.
    pub fn url(&self) -> Option<&str> {
        self.status.as_ref()?.url.as_deref()
    }
}
