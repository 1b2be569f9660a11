//! Process exit codes.
//!
//! | code | meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | every attempted action succeeded                     |
//! | 1    | an action exited non-zero, or any other failure      |
//! | 2    | usage, resolution, or configuration error            |
//! | 3    | precondition not met                                 |
//! | 4    | command could not be launched                        |
//! | 5    | command timed out                                    |
//! | 130  | cancelled                                            |

use devflow_core::{ActionFailure, DevflowError, ExecutionResult};

pub const OK: i32 = 0;
pub const FAILURE: i32 = 1;
pub const USAGE: i32 = 2;
pub const PRECONDITION: i32 = 3;
pub const LAUNCH: i32 = 4;
pub const TIMEOUT: i32 = 5;
pub const CANCELLED: i32 = 130;

/// A failure whose details were already reported; `main` only exits.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct Exit {
    pub code: i32,
    pub message: String,
}

impl Exit {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

pub fn for_failure(failure: &ActionFailure) -> i32 {
    match failure {
        ActionFailure::Exit { .. } | ActionFailure::Signal => FAILURE,
        ActionFailure::Precondition { .. } => PRECONDITION,
        ActionFailure::Launch { .. } => LAUNCH,
        ActionFailure::Timeout { .. } => TIMEOUT,
        ActionFailure::Cancelled => CANCELLED,
    }
}

/// The first failed result decides the code.
pub fn for_results(results: &[ExecutionResult]) -> i32 {
    results
        .iter()
        .find_map(|r| r.failure.as_ref())
        .map(for_failure)
        .unwrap_or(OK)
}

pub fn for_devflow(err: &DevflowError) -> i32 {
    match err.root_cause() {
        DevflowError::UnknownAction(_)
        | DevflowError::MissingArgument { .. }
        | DevflowError::UnexpectedArgument { .. }
        | DevflowError::DuplicateName(_)
        | DevflowError::InvalidTemplate { .. }
        | DevflowError::InvalidSequence { .. }
        | DevflowError::InvalidStep { .. }
        | DevflowError::InvalidValue { .. }
        | DevflowError::Yaml(_) => USAGE,
        DevflowError::Precondition { .. } => PRECONDITION,
        _ => FAILURE,
    }
}

/// Walk the error chain for something that carries a code.
pub fn for_error(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(exit) = cause.downcast_ref::<Exit>() {
            return exit.code;
        }
        if let Some(e) = cause.downcast_ref::<DevflowError>() {
            return for_devflow(e);
        }
    }
    FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use devflow_core::Flag;

    #[test]
    fn resolution_errors_are_usage() {
        let err = anyhow::Error::new(DevflowError::UnknownAction("deploy".into()));
        assert_eq!(for_error(&err), USAGE);
        let err: anyhow::Error = Err::<(), _>(DevflowError::MissingArgument {
            action: "commit".into(),
            placeholder: "message".into(),
        })
        .context("failed to resolve")
        .unwrap_err();
        assert_eq!(for_error(&err), USAGE);
    }

    #[test]
    fn aborted_maps_through_to_precondition() {
        let err = anyhow::Error::new(DevflowError::Aborted {
            completed: Vec::new(),
            source: Box::new(DevflowError::Precondition {
                action: "remove".into(),
                missing: Flag::EnvInactive,
            }),
        });
        assert_eq!(for_error(&err), PRECONDITION);
    }

    #[test]
    fn explicit_exit_wins() {
        let err = anyhow::Error::new(Exit::new(TIMEOUT, "timed out"));
        assert_eq!(for_error(&err), TIMEOUT);
        assert_eq!(for_error(&anyhow::anyhow!("boom")), FAILURE);
    }

    #[test]
    fn failure_bands() {
        assert_eq!(for_failure(&ActionFailure::Exit { code: 7 }), FAILURE);
        assert_eq!(for_failure(&ActionFailure::Launch { message: String::new() }), LAUNCH);
        assert_eq!(for_failure(&ActionFailure::Timeout { after_ms: 1 }), TIMEOUT);
        assert_eq!(for_failure(&ActionFailure::Cancelled), CANCELLED);
        assert_eq!(for_results(&[]), OK);
    }
}
