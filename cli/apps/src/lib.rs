//! Apps CLI
//!
//! `kubectl` style management of Cartographer workloads: create, update and
//! apply them from flags or files, inspect their supply chain progress, follow
//! their logs and delete them.
//!
//! The binary is a thin shell over [`cli::dispatch`]; every command handler
//! talks to the cluster through a
//! [`WorkloadClientTrait`](workload_client::WorkloadClientTrait) and writes
//! through an [`output::Printer`], so handlers are tested against the mock
//! client with captured output.

pub mod cli;
pub mod commands;
pub mod config;
pub mod diff;
pub mod duration;
pub mod error;
pub mod logs;
pub mod output;
pub mod parsers;
pub mod printer;
pub mod prompt;
pub mod validation;
pub mod wait;

#[cfg(test)]
pub mod test_utils;

pub use error::CliError;
