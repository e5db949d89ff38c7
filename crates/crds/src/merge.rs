//! Workload merge operations.
//!
//! Every CLI flag and every field of a workload file is layered onto an
//! existing workload through these methods. They are idempotent: applying the
//! same change twice leaves the workload as applying it once. Empty
//! collections are normalised away so that the rendered YAML stays minimal.

use crate::labels::{ANNOTATIONS_PARAM, MAVEN_PARAM, SERVICE_CLAIMS_EXTENSION_ANNOTATION};
use crate::workload::{
    EnvVar, GitSource, MavenSource, Param, ResourceRequirements, Source, Workload, WorkloadBuild,
    WorkloadServiceClaim, WorkloadSpec,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

const SERVICE_CLAIMS_EXTENSION_KIND: &str = "ServiceClaimsExtension";
const SERVICE_CLAIMS_EXTENSION_API_VERSION: &str = "supplychain.apps.x-tanzu.vmware.com/v1alpha1";

/// Annotation payload recording the namespace of cross namespace claims.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceClaimsExtension {
    /// Always `ServiceClaimsExtension`
    pub kind: String,
    /// Always `supplychain.apps.x-tanzu.vmware.com/v1alpha1`
    pub api_version: String,
    /// Claims keyed by name
    pub spec: ServiceClaimsExtensionSpec,
}

/// Body of [`ServiceClaimsExtension`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceClaimsExtensionSpec {
    /// Claim name to namespace of the referenced service
    #[serde(default)]
    pub service_claims: BTreeMap<String, ServiceClaimNamespace>,
}

/// Namespace of a referenced service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceClaimNamespace {
    /// Namespace holding the service
    pub namespace: String,
}

fn merge_map(map: &mut Option<BTreeMap<String, String>>, key: &str, value: &str) {
    map.get_or_insert_with(BTreeMap::new)
        .insert(key.to_string(), value.to_string());
}

fn remove_from_map(map: &mut Option<BTreeMap<String, String>>, key: &str) {
    if let Some(m) = map.as_mut() {
        m.remove(key);
        if m.is_empty() {
            *map = None;
        }
    }
}

fn merge_env_list(list: &mut Vec<EnvVar>, env: EnvVar) {
    match list.iter_mut().find(|e| e.name == env.name) {
        Some(existing) => *existing = env,
        None => list.push(env),
    }
}

impl Workload {
    /// Set a label.
    pub fn merge_label(&mut self, key: &str, value: &str) {
        merge_map(&mut self.metadata.labels, key, value);
    }

    /// Remove a label, dropping the label map when it becomes empty.
    pub fn remove_label(&mut self, key: &str) {
        remove_from_map(&mut self.metadata.labels, key);
    }

    /// Set an annotation on the workload object itself.
    pub fn merge_annotation(&mut self, key: &str, value: &str) {
        merge_map(&mut self.metadata.annotations, key, value);
    }

    /// Remove an annotation from the workload object itself.
    pub fn remove_annotation(&mut self, key: &str) {
        remove_from_map(&mut self.metadata.annotations, key);
    }

    /// Record the namespace of a cross namespace service claim.
    pub fn merge_service_claim_annotation(&mut self, claim: &str, namespace: &str) {
        let mut extension = self.service_claims_extension().unwrap_or_else(|| ServiceClaimsExtension {
            kind: SERVICE_CLAIMS_EXTENSION_KIND.to_string(),
            api_version: SERVICE_CLAIMS_EXTENSION_API_VERSION.to_string(),
            spec: ServiceClaimsExtensionSpec::default(),
        });
        extension.spec.service_claims.insert(
            claim.to_string(),
            ServiceClaimNamespace {
                namespace: namespace.to_string(),
            },
        );
        self.store_service_claims_extension(&extension);
    }

    /// Forget the namespace of a service claim.
    pub fn delete_service_claim_annotation(&mut self, claim: &str) {
        let Some(mut extension) = self.service_claims_extension() else {
            return;
        };
        extension.spec.service_claims.remove(claim);
        if extension.spec.service_claims.is_empty() {
            self.remove_annotation(SERVICE_CLAIMS_EXTENSION_ANNOTATION);
        } else {
            self.store_service_claims_extension(&extension);
        }
    }

    /// Decode the service claims extension annotation.
    pub fn service_claims_extension(&self) -> Option<ServiceClaimsExtension> {
        self.metadata
            .annotations
            .as_ref()?
            .get(SERVICE_CLAIMS_EXTENSION_ANNOTATION)
            .and_then(|raw| serde_json::from_str(raw).ok())
    }

    fn store_service_claims_extension(&mut self, extension: &ServiceClaimsExtension) {
        match serde_json::to_string(extension) {
            Ok(raw) => self.merge_annotation(SERVICE_CLAIMS_EXTENSION_ANNOTATION, &raw),
            Err(e) => warn!("Skipping {SERVICE_CLAIMS_EXTENSION_ANNOTATION} annotation: {e}"),
        }
    }

    /// Layer `updates` on top of this workload.
    ///
    /// Labels and annotations are merged key by key, the spec is merged with
    /// [`WorkloadSpec::merge`]. Name and namespace are left untouched.
    pub fn merge(&mut self, updates: &Workload) {
        if let Some(annotations) = &updates.metadata.annotations {
            for (k, v) in annotations {
                self.merge_annotation(k, v);
            }
        }
        if let Some(labels) = &updates.metadata.labels {
            for (k, v) in labels {
                self.merge_label(k, v);
            }
        }
        self.spec.merge(&updates.spec);
    }
}

impl WorkloadSpec {
    /// Layer `updates` on top of this spec.
    pub fn merge(&mut self, updates: &WorkloadSpec) {
        for p in &updates.params {
            self.merge_param(&p.name, p.value.clone());
        }
        if let Some(image) = &updates.image {
            self.merge_image(image);
        }
        if let Some(source) = &updates.source {
            self.merge_source(source.clone());
        }
        for env in &updates.env {
            self.merge_env(env.clone());
        }
        if let Some(build) = &updates.build {
            for env in &build.env {
                self.merge_build_env(env.clone());
            }
        }
        if let Some(resources) = &updates.resources {
            self.merge_resources(resources);
        }
        for claim in &updates.service_claims {
            self.merge_service_claim(claim.clone());
        }
        if let Some(sa) = &updates.service_account_name {
            self.merge_service_account_name(sa);
        }
    }

    /// Set a param, replacing any existing value with the same name.
    pub fn merge_param(&mut self, name: &str, value: impl Into<serde_json::Value>) {
        let value = value.into();
        match self.params.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.value = value,
            None => self.params.push(Param {
                name: name.to_string(),
                value,
            }),
        }
    }

    /// Remove a param by name.
    pub fn remove_param(&mut self, name: &str) {
        self.params.retain(|p| p.name != name);
    }

    /// Set a key in the `annotations` param.
    pub fn merge_annotation_param(&mut self, key: &str, value: &str) {
        let mut annotations = self.annotation_params();
        annotations.insert(key.to_string(), serde_json::Value::String(value.to_string()));
        self.merge_param(ANNOTATIONS_PARAM, serde_json::Value::Object(annotations));
    }

    /// Remove a key from the `annotations` param, dropping the param when empty.
    pub fn remove_annotation_param(&mut self, key: &str) {
        let mut annotations = self.annotation_params();
        if annotations.remove(key).is_none() {
            return;
        }
        if annotations.is_empty() {
            self.remove_param(ANNOTATIONS_PARAM);
        } else {
            self.merge_param(ANNOTATIONS_PARAM, serde_json::Value::Object(annotations));
        }
    }

    fn annotation_params(&self) -> serde_json::Map<String, serde_json::Value> {
        match self.param(ANNOTATIONS_PARAM) {
            Some(serde_json::Value::Object(map)) => map.clone(),
            _ => serde_json::Map::new(),
        }
    }

    /// Replace the source, clearing any image or maven artifact.
    pub fn merge_source(&mut self, source: Source) {
        self.source = Some(source);
        self.image = None;
        self.remove_param(MAVEN_PARAM);
    }

    /// Point the workload at a git repository.
    ///
    /// An empty URL keeps the previously configured repository, and a sub
    /// path configured for a previous git source is carried over.
    pub fn merge_git(&mut self, mut git: GitSource) {
        let previous = self.source.take().unwrap_or_default();
        let mut sub_path = None;
        if let Some(prev_git) = previous.git {
            if git.url.is_empty() {
                git.url = prev_git.url;
            }
            sub_path = previous.sub_path;
        }
        self.merge_source(Source {
            git: Some(git),
            image: None,
            sub_path,
        });
    }

    /// Point the workload at an image holding its source code.
    pub fn merge_source_image(&mut self, image: &str) {
        let previous = self.source.take().unwrap_or_default();
        let sub_path = if previous.image.is_some() { previous.sub_path } else { None };
        self.merge_source(Source {
            git: None,
            image: Some(image.to_string()),
            sub_path,
        });
    }

    /// Set or clear (empty string) the source sub path.
    ///
    /// Setting a sub path without a source leaves an incomplete source that
    /// fails validation.
    pub fn merge_sub_path(&mut self, sub_path: &str) {
        let sub_path = (!sub_path.is_empty()).then(|| sub_path.to_string());
        match self.source.as_mut() {
            Some(source) => source.sub_path = sub_path,
            None if sub_path.is_some() => {
                self.source = Some(Source {
                    sub_path,
                    ..Default::default()
                });
            }
            None => {}
        }
    }

    /// Use a pre-built image, dropping any source.
    pub fn merge_image(&mut self, image: &str) {
        self.image = Some(image.to_string());
        self.source = None;
        self.remove_param(MAVEN_PARAM);
    }

    /// Build from a maven artifact. Unset coordinates keep their existing value.
    pub fn merge_maven_source(&mut self, maven: MavenSource) {
        let existing = self.maven_source().unwrap_or_default();
        let merged = MavenSource {
            artifact_id: maven.artifact_id.or(existing.artifact_id),
            group_id: maven.group_id.or(existing.group_id),
            version: maven.version.or(existing.version),
            packaging: maven.packaging.or(existing.packaging),
        };
        match serde_json::to_value(&merged) {
            Ok(value) => self.merge_param(MAVEN_PARAM, value),
            Err(e) => warn!("Skipping {MAVEN_PARAM} param: {e}"),
        }
        self.source = None;
        self.image = None;
    }

    /// Set a runtime environment variable.
    pub fn merge_env(&mut self, env: EnvVar) {
        merge_env_list(&mut self.env, env);
    }

    /// Remove a runtime environment variable.
    pub fn remove_env(&mut self, name: &str) {
        self.env.retain(|e| e.name != name);
    }

    /// Set a build environment variable.
    pub fn merge_build_env(&mut self, env: EnvVar) {
        let build = self.build.get_or_insert_with(WorkloadBuild::default);
        merge_env_list(&mut build.env, env);
    }

    /// Remove a build environment variable.
    pub fn remove_build_env(&mut self, name: &str) {
        if let Some(build) = self.build.as_mut() {
            build.env.retain(|e| e.name != name);
            if build.env.is_empty() {
                self.build = None;
            }
        }
    }

    /// Merge resource limits and requests key by key.
    pub fn merge_resources(&mut self, updates: &ResourceRequirements) {
        let resources = self.resources.get_or_insert_with(ResourceRequirements::default);
        if let Some(limits) = &updates.limits {
            for (k, v) in limits {
                merge_map(&mut resources.limits, k, v);
            }
        }
        if let Some(requests) = &updates.requests {
            for (k, v) in requests {
                merge_map(&mut resources.requests, k, v);
            }
        }
        if resources.limits.is_none() && resources.requests.is_none() {
            self.resources = None;
        }
    }

    /// Add or replace a service claim by name.
    pub fn merge_service_claim(&mut self, claim: WorkloadServiceClaim) {
        match self.service_claims.iter_mut().find(|c| c.name == claim.name) {
            Some(existing) => *existing = claim,
            None => self.service_claims.push(claim),
        }
    }

    /// Remove a service claim by name.
    pub fn delete_service_claim(&mut self, name: &str) {
        self.service_claims.retain(|c| c.name != name);
    }

    /// Set or clear (empty string) the service account.
    pub fn merge_service_account_name(&mut self, name: &str) {
        self.service_account_name = if name.is_empty() { None } else { Some(name.to_string()) };
    }
}
