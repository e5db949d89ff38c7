//! Status conditions shared by Cartographer and Knative resources.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition type reporting overall readiness.
pub const CONDITION_READY: &str = "Ready";

/// Condition type reporting workload health.
pub const CONDITION_HEALTHY: &str = "Healthy";

/// Condition type reporting whether a stamped resource was submitted.
pub const CONDITION_RESOURCE_SUBMITTED: &str = "ResourceSubmitted";

/// Condition status values.
pub const CONDITION_TRUE: &str = "True";
/// Condition is known to be false.
pub const CONDITION_FALSE: &str = "False";
/// Condition has not been determined yet.
pub const CONDITION_UNKNOWN: &str = "Unknown";

/// A single status condition.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type (e.g. `Ready`)
    #[serde(rename = "type")]
    pub type_: String,

    /// `True`, `False` or `Unknown`
    pub status: String,

    /// Machine readable reason for the last transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition changed status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<chrono::DateTime<chrono::Utc>>,

    /// Generation the condition was computed for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl Condition {
    /// Build a condition with the given type and status.
    pub fn new(type_: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            status: status.into(),
            ..Default::default()
        }
    }

    /// Set the reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Set the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// `true` when status is `True`.
    pub fn is_true(&self) -> bool {
        self.status == CONDITION_TRUE
    }

    /// `true` when status is `False`.
    pub fn is_false(&self) -> bool {
        self.status == CONDITION_FALSE
    }
}

/// Find a condition by type.
pub fn find_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

/// Render the status of a condition for tables, `Unknown` when absent.
pub fn condition_status(conditions: &[Condition], type_: &str) -> String {
    find_condition(conditions, type_)
        .map(|c| c.status.clone())
        .unwrap_or_else(|| CONDITION_UNKNOWN.to_string())
}
