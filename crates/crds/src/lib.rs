//! Cartographer CRD Definitions
//!
//! Kubernetes resource types read and written by the `apps` CLI: the
//! Cartographer `Workload` and `Deliverable`, and Knative `Service` for
//! reporting running workloads. The workload merge operations used to layer
//! flags and files onto existing resources live here as well.

pub mod condition;
pub mod deliverable;
pub mod knative;
pub mod labels;
pub mod merge;
pub mod validation;
pub mod workload;

pub use condition::*;
pub use deliverable::*;
pub use knative::*;
pub use labels::*;
pub use merge::*;
pub use validation::*;
pub use workload::*;
