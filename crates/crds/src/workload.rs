//! Workload CRD
//!
//! A Cartographer `Workload` describes an application to be built and run by
//! a supply chain: where its source lives, how it should be configured at
//! runtime and which services it binds to.

use crate::condition::{find_condition, Condition, CONDITION_HEALTHY, CONDITION_READY};
use crate::labels::{MAVEN_PARAM, SERVICE_CLAIMS_EXTENSION_ANNOTATION};
use crate::validation::{FieldError, FieldErrors};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Kind of the resource stamped for delivery.
pub const DELIVERABLE_KIND: &str = "Deliverable";

const GIT_FLAGS: &str = "--git-*";
const MAVEN_FLAGS: &str = "--maven-*";
const IMAGE_FLAG: &str = "--image";
const SOURCE_IMAGE_FLAG: &str = "--source-image";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[kube(
    group = "carto.run",
    version = "v1alpha1",
    kind = "Workload",
    namespaced,
    status = "WorkloadStatus",
    shortname = "wld",
    derive = "PartialEq",
    derive = "Default"
)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadSpec {
    /// Parameters passed to the supply chain templates
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,

    /// Pre-built image, skips source resolution and build
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Source code location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,

    /// Build configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<WorkloadBuild>,

    /// Runtime environment variables
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,

    /// Runtime resource requirements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    /// Service account used to stamp supply chain resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,

    /// Services bound to the workload
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_claims: Vec<WorkloadServiceClaim>,
}

/// A named supply chain parameter holding an arbitrary JSON value.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Param {
    /// Parameter name
    pub name: String,

    /// Parameter value
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// Git repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitSource>,

    /// Image holding source code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Path inside the repository or image to treat as application root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GitSource {
    /// Remote repository URL
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,

    /// Revision to check out
    #[serde(rename = "ref", default)]
    pub git_ref: GitRef,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GitRef {
    /// Branch name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    /// Tag name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Commit SHA
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

impl GitRef {
    /// `true` when no revision is selected.
    pub fn is_empty(&self) -> bool {
        self.branch.is_none() && self.tag.is_none() && self.commit.is_none()
    }
}

/// Maven artifact coordinates, stored in the `maven` param.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MavenSource {
    /// Artifact identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,

    /// Group identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,

    /// Artifact version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Packaging type, defaults to jar
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub packaging: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadBuild {
    /// Build time environment variables
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

/// Environment variable, either a literal value or a reference.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    /// Variable name
    pub name: String,

    /// Literal value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Value source (secret, config map, field reference)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from: Option<serde_json::Value>,
}

impl EnvVar {
    /// Environment variable with a literal value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            value_from: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequirements {
    /// Maximum amounts (`cpu`, `memory`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<BTreeMap<String, String>>,

    /// Minimum amounts (`cpu`, `memory`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadServiceClaim {
    /// Claim name, unique within the workload
    pub name: String,

    /// Service the claim binds to
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub claim_ref: Option<WorkloadServiceClaimReference>,
}

impl WorkloadServiceClaim {
    /// Claim named `name` pointing at `claim_ref`.
    pub fn new(name: impl Into<String>, claim_ref: WorkloadServiceClaimReference) -> Self {
        Self {
            name: name.into(),
            claim_ref: Some(claim_ref),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadServiceClaimReference {
    /// API version of the bound service
    pub api_version: String,

    /// Kind of the bound service
    pub kind: String,

    /// Name of the bound service
    pub name: String,
}

/// Reference to another Kubernetes object.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    /// API version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    /// Kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadStatus {
    /// Generation last processed by the supply chain controller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Status conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Supply chain selected for this workload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supply_chain_ref: Option<ObjectReference>,

    /// Resources stamped by the supply chain
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<RealizedResource>,
}

/// A resource stamped out by a supply chain or delivery.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RealizedResource {
    /// Resource name within the supply chain
    pub name: String,

    /// The stamped object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stamped_ref: Option<ObjectReference>,

    /// Template the object was stamped from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_ref: Option<ObjectReference>,

    /// Resource conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// Failure reported while waiting on a workload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReadinessError {
    /// The Ready condition turned `False`
    #[error("Failed to become ready: {0}")]
    Failed(String),
}

impl Workload {
    /// Namespace, empty when unset.
    pub fn namespace_or_empty(&self) -> &str {
        self.metadata.namespace.as_deref().unwrap_or_default()
    }

    /// Name, empty when unset.
    pub fn name_or_empty(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    /// The `Ready` condition, if reported.
    pub fn ready_condition(&self) -> Option<&Condition> {
        self.status
            .as_ref()
            .and_then(|s| find_condition(&s.conditions, CONDITION_READY))
    }

    /// The `Healthy` condition, if reported.
    pub fn healthy_condition(&self) -> Option<&Condition> {
        self.status
            .as_ref()
            .and_then(|s| find_condition(&s.conditions, CONDITION_HEALTHY))
    }

    /// Reference to the stamped Deliverable, if the supply chain created one.
    pub fn deliverable_ref(&self) -> Option<&ObjectReference> {
        self.status.as_ref()?.resources.iter().find_map(|r| {
            r.stamped_ref
                .as_ref()
                .filter(|s| s.kind.as_deref() == Some(DELIVERABLE_KIND))
        })
    }

    /// Validate combinations of fields that the flags alone cannot catch.
    pub fn validate(&self) -> FieldErrors {
        self.spec.validate()
    }

    /// Warnings about deprecated configuration carried by the workload.
    pub fn deprecation_warnings(&self) -> Vec<String> {
        let has_extension = self
            .metadata
            .annotations
            .as_ref()
            .is_some_and(|a| a.contains_key(SERVICE_CLAIMS_EXTENSION_ANNOTATION));
        if has_extension {
            vec![
                "Cross namespace service claims are deprecated. Please use `tanzu service claim create` instead."
                    .to_string(),
            ]
        } else {
            Vec::new()
        }
    }
}

impl WorkloadSpec {
    /// Validate the mutually exclusive source options.
    pub fn validate(&self) -> FieldErrors {
        let mut errs = FieldErrors::new();

        if self.image.is_some() && self.source.is_some() {
            errs.push(FieldError::multiple_one_of(&[GIT_FLAGS, IMAGE_FLAG, SOURCE_IMAGE_FLAG]));
        }
        if let Some(source) = &self.source {
            errs = errs.also(source.validate());
        }
        if self.param(MAVEN_PARAM).is_some() && (self.image.is_some() || self.source.is_some()) {
            errs.push(FieldError::multiple_one_of(&[
                MAVEN_FLAGS,
                GIT_FLAGS,
                IMAGE_FLAG,
                SOURCE_IMAGE_FLAG,
            ]));
        }

        errs
    }

    /// Look up a param value by name.
    pub fn param(&self, name: &str) -> Option<&serde_json::Value> {
        self.params.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    /// The `maven` param decoded as coordinates.
    pub fn maven_source(&self) -> Option<MavenSource> {
        self.param(MAVEN_PARAM)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

impl Source {
    /// Validate that exactly one source kind is set.
    pub fn validate(&self) -> FieldErrors {
        let mut errs = FieldErrors::new();

        match (&self.git, &self.image) {
            (Some(_), Some(_)) => {
                errs.push(FieldError::multiple_one_of(&[GIT_FLAGS, SOURCE_IMAGE_FLAG]));
            }
            (None, None) => {
                errs.push(FieldError::missing_one_of(&[GIT_FLAGS, SOURCE_IMAGE_FLAG]));
            }
            _ => {}
        }

        if let Some(git) = &self.git {
            if git.url.is_empty() {
                errs.push(FieldError::missing_field("--git-repo"));
            }
            if git.git_ref.is_empty() {
                errs.push(FieldError::missing_one_of(&[
                    "--git-branch",
                    "--git-tag",
                    "--git-commit",
                ]));
            }
        }

        errs
    }
}

/// Readiness predicate used while waiting on a workload.
///
/// Returns `Ok(true)` once the workload is ready, `Ok(false)` while the
/// supply chain is still working on it and an error once it has failed.
pub fn workload_ready_condition(workload: &Workload) -> Result<bool, ReadinessError> {
    let generation = workload.metadata.generation.unwrap_or_default();
    let observed = workload
        .status
        .as_ref()
        .and_then(|s| s.observed_generation)
        .unwrap_or_default();
    if observed < generation {
        return Ok(false);
    }

    match workload.ready_condition() {
        Some(ready) if ready.is_true() => Ok(true),
        Some(ready) if ready.is_false() => Err(ReadinessError::Failed(
            ready.message.clone().unwrap_or_default(),
        )),
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{CONDITION_FALSE, CONDITION_TRUE, CONDITION_UNKNOWN};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn workload_with_conditions(conditions: Vec<Condition>) -> Workload {
        Workload {
            metadata: ObjectMeta {
                name: Some("my-workload".to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            spec: WorkloadSpec::default(),
            status: Some(WorkloadStatus {
                conditions,
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_empty_spec_serializes_as_empty_map() {
        let yaml = serde_yaml::to_string(&WorkloadSpec::default()).unwrap();
        assert_eq!(yaml.trim(), "{}");
    }

    #[test]
    fn test_workload_parses_from_yaml() {
        let yaml = r"
apiVersion: carto.run/v1alpha1
kind: Workload
metadata:
  name: spring-petclinic
  labels:
    app.kubernetes.io/part-of: spring-petclinic
spec:
  env:
  - name: SPRING_PROFILES_ACTIVE
    value: mysql
  source:
    git:
      url: https://github.com/spring-projects/spring-petclinic.git
      ref:
        branch: main
    subPath: ./app
  serviceAccountName: builder
";
        let workload: Workload = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(workload.name_or_empty(), "spring-petclinic");
        let source = workload.spec.source.as_ref().unwrap();
        assert_eq!(source.sub_path.as_deref(), Some("./app"));
        assert_eq!(
            source.git.as_ref().unwrap().git_ref.branch.as_deref(),
            Some("main")
        );
        assert_eq!(workload.spec.env, vec![EnvVar::new("SPRING_PROFILES_ACTIVE", "mysql")]);
        assert_eq!(workload.spec.service_account_name.as_deref(), Some("builder"));
    }

    #[test]
    fn test_validate_image_and_source_conflict() {
        let spec = WorkloadSpec {
            image: Some("ubuntu:bionic".to_string()),
            source: Some(Source {
                image: Some("registry.example/src".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let errs = spec.validate();
        assert_eq!(
            errs.to_string(),
            "expected exactly one, got both: --git-*, --image, --source-image"
        );
    }

    #[test]
    fn test_validate_git_requires_url_and_ref() {
        let source = Source {
            git: Some(GitSource::default()),
            ..Default::default()
        };
        let errs = source.validate();
        assert_eq!(errs.len(), 2);
        assert!(errs.to_string().contains("missing field(s): --git-repo"));
    }

    #[test]
    fn test_validate_accepts_git_with_branch() {
        let spec = WorkloadSpec {
            source: Some(Source {
                git: Some(GitSource {
                    url: "https://example.com/repo.git".to_string(),
                    git_ref: GitRef {
                        branch: Some("main".to_string()),
                        ..Default::default()
                    },
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(spec.validate().is_empty());
    }

    #[test]
    fn test_ready_condition_states() {
        let ready = workload_with_conditions(vec![Condition::new(CONDITION_READY, CONDITION_TRUE)]);
        assert_eq!(workload_ready_condition(&ready), Ok(true));

        let unknown = workload_with_conditions(vec![Condition::new(CONDITION_READY, CONDITION_UNKNOWN)]);
        assert_eq!(workload_ready_condition(&unknown), Ok(false));

        let failed = workload_with_conditions(vec![
            Condition::new(CONDITION_READY, CONDITION_FALSE).with_message("it broke"),
        ]);
        let err = workload_ready_condition(&failed).unwrap_err();
        assert_eq!(err.to_string(), "Failed to become ready: it broke");
    }

    #[test]
    fn test_ready_condition_waits_for_observed_generation() {
        let mut stale = workload_with_conditions(vec![Condition::new(CONDITION_READY, CONDITION_TRUE)]);
        stale.metadata.generation = Some(2);
        if let Some(status) = stale.status.as_mut() {
            status.observed_generation = Some(1);
        }
        assert_eq!(workload_ready_condition(&stale), Ok(false));
    }

    #[test]
    fn test_deliverable_ref_found_in_resources() {
        let mut workload = workload_with_conditions(Vec::new());
        if let Some(status) = workload.status.as_mut() {
            status.resources = vec![
                RealizedResource {
                    name: "source-provider".to_string(),
                    ..Default::default()
                },
                RealizedResource {
                    name: "deliverable".to_string(),
                    stamped_ref: Some(ObjectReference {
                        kind: Some(DELIVERABLE_KIND.to_string()),
                        name: Some("my-workload".to_string()),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            ];
        }
        assert_eq!(
            workload.deliverable_ref().and_then(|r| r.name.as_deref()),
            Some("my-workload")
        );
    }
}
