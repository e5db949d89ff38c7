//! Runtime configuration shared by every command.

use std::path::PathBuf;

/// Name the CLI is invoked as, used in hints such as `To see logs: ...`
pub const DEFAULT_CLI_NAME: &str = "tanzu apps";

/// Environment variable supplying the default for `--type`.
///
/// It is the only `TANZU_APPS_*` variable honoured; others are ignored.
pub const TYPE_ENV_VAR: &str = "TANZU_APPS_TYPE";

/// Configuration resolved from global flags.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Display name of the CLI
    pub name: String,
    /// Colourise output
    pub color: bool,
    /// Explicit kubeconfig path
    pub kubeconfig: Option<PathBuf>,
    /// Kubeconfig context override
    pub context: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_CLI_NAME.to_string(),
            color: false,
            kubeconfig: None,
            context: None,
        }
    }
}

impl AppConfig {
    /// Full command prefix for workload subcommands, e.g. `tanzu apps workload`
    pub fn workload_command(&self) -> String {
        format!("{} workload", self.name)
    }
}
