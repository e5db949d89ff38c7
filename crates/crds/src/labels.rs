//! Well-known labels, annotations and param names.
//!
//! These keys are shared between the CLI (which writes them) and the
//! supply chain (which reads them back when stamping resources).

/// Label grouping workloads into a logical application.
pub const APP_PART_OF_LABEL: &str = "app.kubernetes.io/part-of";

/// Label distinguishing the workload type (e.g. `web`).
pub const WORKLOAD_TYPE_LABEL: &str = "apps.tanzu.vmware.com/workload-type";

/// Label stamped by Cartographer onto every resource created for a workload.
pub const WORKLOAD_NAME_LABEL: &str = "carto.run/workload-name";

/// Label identifying the component of a stamped resource.
pub const COMPONENT_LABEL: &str = "app.kubernetes.io/component";

/// Annotation carrying the cross namespace service claim extension.
pub const SERVICE_CLAIMS_EXTENSION_ANNOTATION: &str =
    "serviceclaims.supplychain.apps.x-tanzu.vmware.com/extensions";

/// Param enabling debug mode.
pub const DEBUG_PARAM: &str = "debug";

/// Param enabling live update mode.
pub const LIVE_UPDATE_PARAM: &str = "live-update";

/// Param holding maven artifact coordinates.
pub const MAVEN_PARAM: &str = "maven";

/// Param holding annotations to apply to stamped resources.
pub const ANNOTATIONS_PARAM: &str = "annotations";
