use async_trait::async_trait;
use devflow_runner::{CommandSpec, ProcessOutput, ProcessRunner};
use tokio_util::sync::CancellationToken;

/// Seam between the sequencer and process execution.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        spec: &CommandSpec,
        cancel: &CancellationToken,
    ) -> devflow_runner::Result<ProcessOutput>;
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        spec: &CommandSpec,
        cancel: &CancellationToken,
    ) -> devflow_runner::Result<ProcessOutput> {
        ProcessRunner::run(self, spec, cancel).await
    }
}
