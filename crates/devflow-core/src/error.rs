use thiserror::Error;

use crate::result::ExecutionResult;
use crate::types::Flag;

#[derive(Debug, Error)]
pub enum DevflowError {
    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("action '{action}' is missing required argument '{placeholder}'")]
    MissingArgument { action: String, placeholder: String },

    #[error("action '{action}' got an unexpected argument '{value}'")]
    UnexpectedArgument { action: String, value: String },

    #[error("action already registered: {0}")]
    DuplicateName(String),

    #[error("invalid command template for '{action}': {reason}")]
    InvalidTemplate { action: String, reason: String },

    #[error("precondition failed for '{action}': requires {missing}")]
    Precondition { action: String, missing: Flag },

    #[error("sequence aborted after {} action(s): {source}", .completed.len())]
    Aborted {
        /// Results of the actions that ran before the abort.
        completed: Vec<ExecutionResult>,
        #[source]
        source: Box<DevflowError>,
    },

    #[error("invalid sequence file (line {line}): {reason}")]
    InvalidSequence { line: usize, reason: String },

    #[error("invalid sequence file (step {step}): {reason}")]
    InvalidStep { step: usize, reason: String },

    #[error("invalid {what}: '{value}'")]
    InvalidValue { what: &'static str, value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl DevflowError {
    /// The innermost error, looking through [`DevflowError::Aborted`].
    pub fn root_cause(&self) -> &DevflowError {
        match self {
            DevflowError::Aborted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, DevflowError>;
