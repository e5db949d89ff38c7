//! Deliverable CRD
//!
//! Stamped by a supply chain for each workload and picked up by a delivery.
//! The CLI only reads it to report delivery progress.

use crate::condition::Condition;
use crate::workload::{ObjectReference, Param, RealizedResource, Source};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[kube(
    group = "carto.run",
    version = "v1alpha1",
    kind = "Deliverable",
    namespaced,
    status = "DeliverableStatus",
    derive = "PartialEq",
    derive = "Default"
)]
#[serde(rename_all = "camelCase")]
pub struct DeliverableSpec {
    /// Parameters passed to the delivery templates
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,

    /// Location of the configuration to deliver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,

    /// Service account used to stamp delivery resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeliverableStatus {
    /// Generation last processed by the delivery controller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Status conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Delivery selected for this deliverable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_ref: Option<ObjectReference>,

    /// Resources stamped by the delivery
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<RealizedResource>,
}
