//! Workload Client
//!
//! Cluster access for the `apps` CLI: reading and writing Cartographer
//! workloads, inspecting the resources stamped for them and following their
//! progress through watches and pod logs.
//!
//! # Example
//!
//! ```no_run
//! use workload_client::{KubeWorkloadClient, WorkloadClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = KubeWorkloadClient::new(None, None).await?;
//! let workloads = client.list_workloads(Some(client.default_namespace())).await?;
//! for w in &workloads {
//!     println!("{}", w.name_or_empty());
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod workload_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::KubeWorkloadClient;
pub use error::ClientError;
pub use models::*;
pub use workload_trait::{LogStream, WorkloadClientTrait, WorkloadEventStream};
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockFailure, MockOperation, MockWorkloadClient};
