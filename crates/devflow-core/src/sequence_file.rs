//! Sequence files: ordered step lists read from disk.
//!
//! Plain text holds one step per line (`name key=value ...`, `#` comments),
//! split into words with shell quoting so `message="first commit"` is one
//! value.
//!
//! Files ending in `.yaml`/`.yml` hold either a list of steps or a map with
//! `steps` and an optional `policy`.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{DevflowError, Result};
use crate::step::Step;
use crate::types::FailurePolicy;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceFile {
    pub steps: Vec<Step>,
    /// Policy named in the file; the command line overrides it.
    pub policy: Option<FailurePolicy>,
}

impl SequenceFile {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml")
        );
        let file = if yaml {
            Self::parse_yaml(&data)?
        } else {
            Self::parse_text(&data)?
        };
        tracing::debug!(path = %path.display(), steps = file.steps.len(), "loaded sequence file");
        Ok(file)
    }

    pub fn parse_text(data: &str) -> Result<Self> {
        let mut steps = Vec::new();
        for (i, line) in data.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let step = parse_line(line).map_err(|reason| DevflowError::InvalidSequence {
                line: i + 1,
                reason,
            })?;
            steps.push(step);
        }
        Ok(Self {
            steps,
            policy: None,
        })
    }

    pub fn parse_yaml(data: &str) -> Result<Self> {
        let doc: YamlDoc = serde_yaml::from_str(data)?;
        let (raw, policy) = match doc {
            YamlDoc::List(steps) => (steps, None),
            YamlDoc::Map { steps, policy } => (steps, policy),
        };
        let policy = policy
            .map(|p| p.parse::<FailurePolicy>())
            .transpose()?;
        let steps = raw
            .into_iter()
            .enumerate()
            .map(|(i, s)| s.into_step(i + 1))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { steps, policy })
    }
}

/// Split a step line into words with shell quoting rules. Nothing is
/// expanded or executed.
fn parse_line(line: &str) -> std::result::Result<Step, String> {
    let words = shell_words::split(line).map_err(|e| e.to_string())?;
    match words.split_first() {
        Some((action, rest)) => Ok(Step::from_tokens(action, rest)),
        None => Err("empty step".to_string()),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum YamlDoc {
    List(Vec<YamlStep>),
    Map {
        steps: Vec<YamlStep>,
        #[serde(default)]
        policy: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum YamlStep {
    Line(String),
    Full {
        action: String,
        #[serde(default)]
        args: BTreeMap<String, serde_yaml::Value>,
        #[serde(default)]
        positional: Vec<serde_yaml::Value>,
    },
}

impl YamlStep {
    fn into_step(self, step: usize) -> Result<Step> {
        match self {
            YamlStep::Line(text) => {
                parse_line(text.trim()).map_err(|reason| DevflowError::InvalidStep { step, reason })
            }
            YamlStep::Full {
                action,
                args,
                positional,
            } => {
                let mut built = Step::new(action);
                for (key, value) in args {
                    let value = scalar(&value).ok_or_else(|| DevflowError::InvalidStep {
                        step,
                        reason: format!("argument '{key}' must be a scalar"),
                    })?;
                    built = built.arg(key, value);
                }
                for value in positional {
                    let value = scalar(&value).ok_or_else(|| DevflowError::InvalidStep {
                        step,
                        reason: "positional values must be scalars".to_string(),
                    })?;
                    built = built.positional(value);
                }
                Ok(built)
            }
        }
    }
}

fn scalar(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
