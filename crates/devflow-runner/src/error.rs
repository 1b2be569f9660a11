use std::time::Duration;

use thiserror::Error;

use crate::process::CapturedOutput;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("process timed out after {}ms", .after.as_millis())]
    Timeout {
        after: Duration,
        /// Output captured before the process was killed.
        output: Box<CapturedOutput>,
    },

    #[error("process cancelled")]
    Cancelled { output: Box<CapturedOutput> },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunnerError {
    /// Output captured before the failure, if the process got that far.
    pub fn partial_output(&self) -> Option<&CapturedOutput> {
        match self {
            RunnerError::Timeout { output, .. } | RunnerError::Cancelled { output } => {
                Some(output)
            }
            RunnerError::Launch { .. } | RunnerError::Io(_) => None,
        }
    }
}
