use chrono::{DateTime, Utc};
use devflow_runner::{ProcessOutput, RunnerError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::registry::ResolvedAction;
use crate::types::Flag;

// ---------------------------------------------------------------------------
// ActionFailure
// ---------------------------------------------------------------------------

/// Why an attempted action did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionFailure {
    /// The process ran and exited non-zero.
    Exit { code: i32 },
    /// The process was terminated by a signal it did not ask for.
    Signal,
    Launch { message: String },
    Timeout { after_ms: u64 },
    Cancelled,
    Precondition { missing: Flag },
}

impl ActionFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            ActionFailure::Exit { .. } => "exit",
            ActionFailure::Signal => "signal",
            ActionFailure::Launch { .. } => "launch",
            ActionFailure::Timeout { .. } => "timeout",
            ActionFailure::Cancelled => "cancelled",
            ActionFailure::Precondition { .. } => "precondition",
        }
    }
}

impl fmt::Display for ActionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionFailure::Exit { code } => write!(f, "exited with code {code}"),
            ActionFailure::Signal => f.write_str("terminated by signal"),
            ActionFailure::Launch { message } => write!(f, "launch failed: {message}"),
            ActionFailure::Timeout { after_ms } => write!(f, "timed out after {after_ms}ms"),
            ActionFailure::Cancelled => f.write_str("cancelled"),
            ActionFailure::Precondition { missing } => write!(f, "precondition failed: requires {missing}"),
        }
    }
}

// ---------------------------------------------------------------------------
// ExecutionResult
// ---------------------------------------------------------------------------

/// Outcome of one attempted action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub action: String,
    pub argv: Vec<String>,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    #[serde(default)]
    pub truncated: bool,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    /// The action's target state already held; no process ran.
    #[serde(default)]
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<ActionFailure>,
}

impl ExecutionResult {
    fn empty(action: &ResolvedAction, started_at: DateTime<Utc>) -> Self {
        Self {
            action: action.name.clone(),
            argv: action.argv.clone(),
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            truncated: false,
            duration_ms: 0,
            started_at,
            skipped: false,
            failure: None,
        }
    }

    pub(crate) fn from_output(
        action: &ResolvedAction,
        started_at: DateTime<Utc>,
        output: ProcessOutput,
    ) -> Self {
        let failure = match output.exit_code {
            Some(0) => None,
            Some(code) => Some(ActionFailure::Exit { code }),
            None => Some(ActionFailure::Signal),
        };
        Self {
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            truncated: output.truncated,
            duration_ms: millis(output.duration),
            failure,
            ..Self::empty(action, started_at)
        }
    }

    pub(crate) fn from_error(
        action: &ResolvedAction,
        started_at: DateTime<Utc>,
        elapsed: Duration,
        err: RunnerError,
    ) -> Self {
        let mut result = Self {
            duration_ms: millis(elapsed),
            ..Self::empty(action, started_at)
        };
        if let Some(partial) = err.partial_output() {
            result.stdout = partial.stdout.clone();
            result.stderr = partial.stderr.clone();
            result.truncated = partial.truncated;
        }
        result.failure = Some(match err {
            RunnerError::Timeout { after, .. } => ActionFailure::Timeout {
                after_ms: millis(after),
            },
            RunnerError::Cancelled { .. } => ActionFailure::Cancelled,
            RunnerError::Launch { .. } => ActionFailure::Launch {
                message: err.to_string(),
            },
            RunnerError::Io(e) => ActionFailure::Launch {
                message: e.to_string(),
            },
        });
        result
    }

    pub(crate) fn precondition_failed(action: &ResolvedAction, missing: Flag) -> Self {
        Self {
            failure: Some(ActionFailure::Precondition { missing }),
            ..Self::empty(action, Utc::now())
        }
    }

    pub(crate) fn cancelled(action: &ResolvedAction) -> Self {
        Self {
            failure: Some(ActionFailure::Cancelled),
            ..Self::empty(action, Utc::now())
        }
    }

    pub(crate) fn skipped(action: &ResolvedAction) -> Self {
        Self {
            exit_code: Some(0),
            skipped: true,
            ..Self::empty(action, Utc::now())
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.failure, Some(ActionFailure::Cancelled))
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ActionDescriptor;
    use devflow_runner::CapturedOutput;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn resolved() -> ResolvedAction {
        ResolvedAction {
            name: "status".to_string(),
            argv: vec!["git".to_string(), "status".to_string()],
            args: BTreeMap::new(),
            cwd: None,
            descriptor: Arc::new(ActionDescriptor::new("status", "", &["git", "status"])),
        }
    }

    fn output(code: Option<i32>) -> ProcessOutput {
        ProcessOutput {
            pid: Some(1),
            exit_code: code,
            stdout: "out".to_string(),
            stderr: "err".to_string(),
            truncated: false,
            duration: Duration::from_millis(1500),
        }
    }

    #[test]
    fn zero_exit_is_success() {
        let r = ExecutionResult::from_output(&resolved(), Utc::now(), output(Some(0)));
        assert!(r.succeeded());
        assert_eq!(r.duration_ms, 1500);
        assert_eq!(r.stdout, "out");
    }

    #[test]
    fn non_zero_and_signal_are_failures() {
        let r = ExecutionResult::from_output(&resolved(), Utc::now(), output(Some(128)));
        assert_eq!(r.failure, Some(ActionFailure::Exit { code: 128 }));
        let r = ExecutionResult::from_output(&resolved(), Utc::now(), output(None));
        assert_eq!(r.failure, Some(ActionFailure::Signal));
    }

    #[test]
    fn timeout_keeps_partial_stderr() {
        let err = RunnerError::Timeout {
            after: Duration::from_secs(2),
            output: Box::new(CapturedOutput {
                stdout: String::new(),
                stderr: "still working".to_string(),
                truncated: false,
            }),
        };
        let r = ExecutionResult::from_error(&resolved(), Utc::now(), Duration::from_secs(2), err);
        assert_eq!(r.failure, Some(ActionFailure::Timeout { after_ms: 2000 }));
        assert_eq!(r.stderr, "still working");
        assert_eq!(r.exit_code, None);
    }

    #[test]
    fn failure_json_is_tagged() {
        let json = serde_json::to_string(&ActionFailure::Precondition {
            missing: Flag::EnvInactive,
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"precondition","missing":"env-inactive"}"#);
    }

    #[test]
    fn result_json_roundtrip() {
        let r = ExecutionResult::from_output(&resolved(), Utc::now(), output(Some(1)));
        let json = serde_json::to_string(&r).unwrap();
        let parsed: ExecutionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, r);
    }
}
