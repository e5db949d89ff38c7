//! CLI error types.
//!
//! Most failures are reported to the user where they happen, in the wording
//! of the command. Those are returned as [`CliError::Silent`] so that `main`
//! only sets the exit code.

use crate::wait::WaitError;
use crds::FieldErrors;
use thiserror::Error;
use workload_client::ClientError;

/// Errors returned by command handlers.
#[derive(Debug, Error)]
pub enum CliError {
    /// Cluster access failed
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Flags or the resulting workload are invalid
    #[error(transparent)]
    Validation(#[from] FieldErrors),

    /// Waiting for the workload failed
    #[error(transparent)]
    Wait(#[from] WaitError),

    /// Input file could not be read or parsed
    #[error("{0}")]
    Input(String),

    /// Resource could not be rendered
    #[error("unable to render resource: {0}")]
    Render(String),

    /// Terminal I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Already reported to the user
    #[error("{0}")]
    Silent(String),
}

impl CliError {
    /// Wrap an error whose message was already printed.
    pub fn silent(err: impl std::fmt::Display) -> Self {
        Self::Silent(err.to_string())
    }

    /// `true` when `main` should not print anything.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Silent(_))
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Render(err.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Render(err.to_string())
    }
}
