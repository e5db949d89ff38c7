//! Blocking on workload state.
//!
//! A wait consumes the workload watch until a predicate is satisfied. It can
//! be raced against a log tail and a timeout, where the first worker to
//! finish decides the outcome.

use crds::{ReadinessError, Workload};
use futures::future::BoxFuture;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use workload_client::{ClientError, WorkloadEvent, WorkloadEventStream};

use crate::duration::format_duration;

/// Reasons a wait can end unsuccessfully.
#[derive(Debug, Error)]
pub enum WaitError {
    /// No worker finished in time
    #[error("timeout after {}", format_duration(*.0))]
    Timeout(Duration),

    /// The workload reported a terminal failure
    #[error(transparent)]
    Failed(#[from] ReadinessError),

    /// The workload disappeared while waiting for it to become ready
    #[error("workload was deleted")]
    Deleted,

    /// The watch ended before the condition was met
    #[error("watch closed before the condition was met")]
    StreamClosed,

    /// Watch or log stream failure
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// A unit of work raced by [`race`].
pub type Worker = BoxFuture<'static, Result<(), WaitError>>;

/// Consume workload states until `condition` returns `Ok(true)`.
pub async fn until_condition<F>(mut events: WorkloadEventStream, condition: F) -> Result<(), WaitError>
where
    F: Fn(&Workload) -> Result<bool, ReadinessError>,
{
    while let Some(event) = events.next().await {
        match event? {
            WorkloadEvent::Applied(workload) => {
                if condition(&workload)? {
                    return Ok(());
                }
                debug!("Workload {} not ready yet", workload.name_or_empty());
            }
            WorkloadEvent::Deleted(_) => return Err(WaitError::Deleted),
            WorkloadEvent::Missing => debug!("Workload not found yet"),
        }
    }
    Err(WaitError::StreamClosed)
}

/// Consume workload states until the workload is gone.
pub async fn until_deleted(mut events: WorkloadEventStream) -> Result<(), WaitError> {
    while let Some(event) = events.next().await {
        match event? {
            WorkloadEvent::Deleted(_) | WorkloadEvent::Missing => return Ok(()),
            WorkloadEvent::Applied(workload) => {
                debug!("Workload {} still present", workload.name_or_empty());
            }
        }
    }
    Err(WaitError::StreamClosed)
}

/// Run `wait` and the optional `tail` concurrently, bounded by `timeout`.
///
/// The first worker to finish decides the result. A tail that ends cleanly
/// does not end the race; only its failure does.
pub async fn race(timeout: Duration, wait: Worker, tail: Option<Worker>) -> Result<(), WaitError> {
    let tail = async move {
        if let Some(tail) = tail {
            tail.await?;
        }
        futures::future::pending::<Result<(), WaitError>>().await
    };

    let workers = async move {
        // the tail is polled first so it starts even when the wait is already done
        tokio::select! {
            biased;
            result = tail => result,
            result = wait => result,
        }
    };

    tokio::time::timeout(timeout, workers)
        .await
        .map_err(|_| WaitError::Timeout(timeout))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ready_workload, workload, workload_with_ready};
    use crds::workload_ready_condition;
    use futures::stream;
    use futures::FutureExt;

    fn events(events: Vec<WorkloadEvent>) -> WorkloadEventStream {
        stream::iter(events.into_iter().map(Ok)).boxed()
    }

    #[tokio::test]
    async fn test_until_condition_ready() {
        let stream = events(vec![
            WorkloadEvent::Missing,
            WorkloadEvent::Applied(workload("default", "my-workload")),
            WorkloadEvent::Applied(ready_workload("default", "my-workload")),
        ]);
        until_condition(stream, workload_ready_condition).await.unwrap();
    }

    #[tokio::test]
    async fn test_until_condition_failed() {
        let failed = workload_with_ready("default", "my-workload", "False", "OopsieDoodle", "went wrong");
        let err = until_condition(events(vec![WorkloadEvent::Applied(failed)]), workload_ready_condition)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to become ready: went wrong");
    }

    #[tokio::test]
    async fn test_until_condition_closed_stream() {
        let err = until_condition(events(vec![]), workload_ready_condition).await.unwrap_err();
        assert!(matches!(err, WaitError::StreamClosed));
    }

    #[tokio::test]
    async fn test_until_deleted() {
        let stream = events(vec![
            WorkloadEvent::Applied(workload("default", "my-workload")),
            WorkloadEvent::Deleted(workload("default", "my-workload")),
        ]);
        until_deleted(stream).await.unwrap();
    }

    #[tokio::test]
    async fn test_race_times_out() {
        let wait = futures::future::pending().boxed();
        let err = race(Duration::from_nanos(1), wait, None).await.unwrap_err();
        assert_eq!(err.to_string(), "timeout after 1ns");
    }

    #[tokio::test]
    async fn test_race_ignores_finished_tail() {
        let wait = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(())
        }
        .boxed();
        let tail = async { Ok(()) }.boxed();
        race(Duration::from_secs(5), wait, Some(tail)).await.unwrap();
    }

    #[tokio::test]
    async fn test_race_tail_failure_wins() {
        let wait = futures::future::pending().boxed();
        let tail = async { Err(WaitError::Client(ClientError::Logs("boom".to_string()))) }.boxed();
        let err = race(Duration::from_secs(5), wait, Some(tail)).await.unwrap_err();
        assert_eq!(err.to_string(), "Log streaming failed: boom");
    }
}
