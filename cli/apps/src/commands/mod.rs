//! Workload subcommand handlers.
//!
//! Each handler takes its parsed arguments and a [`CommandContext`] and
//! reports progress through the context's printer. Errors already shown to
//! the user come back as [`CliError::Silent`](crate::error::CliError::Silent).

use crate::config::AppConfig;
use crate::output::Printer;
use std::io::BufRead;
use std::sync::Arc;
use workload_client::WorkloadClientTrait;

pub mod apply;
pub mod create;
pub mod delete;
pub mod get;
pub mod list;
pub mod options;
pub mod tail;
pub mod update;

/// Everything a command handler needs besides its arguments.
pub struct CommandContext {
    /// Cluster access
    pub client: Arc<dyn WorkloadClientTrait>,
    /// Global configuration
    pub config: AppConfig,
    /// Output streams
    pub printer: Printer,
    /// Answers to confirmation prompts, and `--file -` input
    pub stdin: Box<dyn BufRead + Send>,
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("config", &self.config)
            .field("printer", &self.printer)
            .finish_non_exhaustive()
    }
}

impl CommandContext {
    /// Namespace from `--namespace`, falling back to the kubeconfig default.
    pub fn namespace(&self, flag: Option<&str>) -> String {
        flag.unwrap_or_else(|| self.client.default_namespace()).to_string()
    }

    /// `true` when `namespace` differs from the kubeconfig default, so hints
    /// need an explicit `--namespace`.
    pub fn is_foreign_namespace(&self, namespace: &str) -> bool {
        namespace != self.client.default_namespace()
    }

    /// ` --namespace <ns>` for hints, empty for the default namespace.
    pub fn namespace_hint(&self, namespace: &str) -> String {
        if self.is_foreign_namespace(namespace) {
            format!(" --namespace {namespace}")
        } else {
            String::new()
        }
    }
}
