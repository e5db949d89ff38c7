//! Log tailing for workload pods.

use crate::output::Printer;
use futures::StreamExt;
use std::sync::Arc;
use tracing::debug;
use workload_client::{ClientError, LogLine, LogRequest, WorkloadClientTrait};

/// Print every log line of pods matching `request` until the stream ends.
pub async fn tail(client: Arc<dyn WorkloadClientTrait>, printer: Printer, request: LogRequest) -> Result<(), ClientError> {
    debug!("Tailing logs for {} in {}", request.selector, request.namespace);
    let mut lines = client.tail_logs(request).await?;
    while let Some(line) = lines.next().await {
        printer.println(format_line(&printer, &line?));
    }
    Ok(())
}

/// `<pod>[<container>] <line>`, with the prefix coloured per pod.
pub fn format_line(printer: &Printer, line: &LogLine) -> String {
    let prefix = format!("{}[{}]", line.pod, line.container);
    format!("{} {}", printer.pod_prefix(&line.pod, &prefix), line.line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::CapturedOutput;
    use std::time::Duration;
    use workload_client::MockWorkloadClient;

    #[tokio::test]
    async fn test_tail_prints_prefixed_lines() {
        let client = MockWorkloadClient::new("default");
        client.set_log_lines(vec![
            LogLine::new("my-workload-00001-deployment-abc", "workload", "Started Application"),
            LogLine::new("my-workload-build-1-pod", "prepare", "Preparing"),
        ]);
        let (printer, out) = CapturedOutput::printer(false);

        let request = LogRequest {
            namespace: "default".to_string(),
            selector: "carto.run/workload-name=my-workload".to_string(),
            containers: vec![],
            since: Duration::from_secs(1),
            timestamps: false,
        };
        let run = tail(Arc::new(client.clone()), printer, request);
        // the mock stream stays open after the scripted lines, like a real follow
        let _ = tokio::time::timeout(Duration::from_millis(50), run).await;

        assert_eq!(
            out.stdout(),
            "my-workload-00001-deployment-abc[workload] Started Application\nmy-workload-build-1-pod[prepare] Preparing\n"
        );
        assert_eq!(client.tail_requests()[0].selector, "carto.run/workload-name=my-workload");
    }
}
