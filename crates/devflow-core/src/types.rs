use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DevflowError;

// ---------------------------------------------------------------------------
// EnvLifecycle
// ---------------------------------------------------------------------------

/// Lifecycle of the session's virtual environment.
///
/// `Removed` is terminal: no built-in action transitions out of it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EnvLifecycle {
    #[default]
    Uninitialized,
    Created,
    Activated,
    Deactivated,
    Removed,
}

impl EnvLifecycle {
    pub fn as_str(self) -> &'static str {
        match self {
            EnvLifecycle::Uninitialized => "uninitialized",
            EnvLifecycle::Created => "created",
            EnvLifecycle::Activated => "activated",
            EnvLifecycle::Deactivated => "deactivated",
            EnvLifecycle::Removed => "removed",
        }
    }
}

impl fmt::Display for EnvLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Flag
// ---------------------------------------------------------------------------

/// A precondition an action may require. Flags are derived from the
/// session state rather than stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Flag {
    /// No environment has been created yet.
    EnvAbsent,
    /// An environment exists (created, activated, or deactivated).
    EnvPresent,
    EnvActive,
    /// An environment exists and is not active.
    EnvInactive,
    /// A version-control repository is known.
    Repository,
    /// A branch hint has been recorded.
    Branch,
}

impl Flag {
    pub fn all() -> &'static [Flag] {
        &[
            Flag::EnvAbsent,
            Flag::EnvPresent,
            Flag::EnvActive,
            Flag::EnvInactive,
            Flag::Repository,
            Flag::Branch,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Flag::EnvAbsent => "env-absent",
            Flag::EnvPresent => "env-present",
            Flag::EnvActive => "env-active",
            Flag::EnvInactive => "env-inactive",
            Flag::Repository => "repository",
            Flag::Branch => "branch",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Flag {
    type Err = DevflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Flag::all()
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| DevflowError::InvalidValue {
                what: "flag",
                value: s.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Effect
// ---------------------------------------------------------------------------

/// A session mutation applied after an action exits with status 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Effect {
    /// Uninitialized → Created; records the `venv` argument as the path.
    CreateEnv,
    ActivateEnv,
    DeactivateEnv,
    RemoveEnv,
    InitRepository,
    /// Records the `branch` argument as the branch hint.
    SelectBranch,
}

impl Effect {
    pub fn as_str(self) -> &'static str {
        match self {
            Effect::CreateEnv => "create-env",
            Effect::ActivateEnv => "activate-env",
            Effect::DeactivateEnv => "deactivate-env",
            Effect::RemoveEnv => "remove-env",
            Effect::InitRepository => "init-repository",
            Effect::SelectBranch => "select-branch",
        }
    }

    /// The flag that must hold for this effect to be a legal lifecycle
    /// transition. Removed satisfies none of them, so it is terminal.
    pub fn guard(self) -> Option<Flag> {
        match self {
            Effect::CreateEnv => Some(Flag::EnvAbsent),
            Effect::ActivateEnv | Effect::RemoveEnv => Some(Flag::EnvInactive),
            Effect::DeactivateEnv => Some(Flag::EnvActive),
            Effect::InitRepository | Effect::SelectBranch => None,
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FailurePolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort the remaining actions after the first failure.
    #[default]
    StopOnFirstFailure,
    /// Run every action and report every result.
    ContinueCollecting,
}

impl FailurePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            FailurePolicy::StopOnFirstFailure => "stop-on-first-failure",
            FailurePolicy::ContinueCollecting => "continue-collecting",
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FailurePolicy {
    type Err = DevflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stop-on-first-failure" => Ok(FailurePolicy::StopOnFirstFailure),
            "continue-collecting" => Ok(FailurePolicy::ContinueCollecting),
            _ => Err(DevflowError::InvalidValue {
                what: "failure policy",
                value: s.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Reentry
// ---------------------------------------------------------------------------

/// What happens when an action's target state already holds, e.g.
/// `activate` on an already activated environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Reentry {
    /// Fail with a precondition error.
    #[default]
    Strict,
    /// Succeed without launching a process.
    Idempotent,
}

impl Reentry {
    pub fn as_str(self) -> &'static str {
        match self {
            Reentry::Strict => "strict",
            Reentry::Idempotent => "idempotent",
        }
    }
}

impl fmt::Display for Reentry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Reentry {
    type Err = DevflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Reentry::Strict),
            "idempotent" => Ok(Reentry::Idempotent),
            _ => Err(DevflowError::InvalidValue {
                what: "re-entry mode",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_str_roundtrip() {
        for flag in Flag::all() {
            let parsed: Flag = flag.as_str().parse().unwrap();
            assert_eq!(parsed, *flag);
        }
        assert!("env-missing".parse::<Flag>().is_err());
    }

    #[test]
    fn serde_names_match_display() {
        let yaml = serde_yaml::to_string(&Flag::EnvInactive).unwrap();
        assert_eq!(yaml.trim(), "env-inactive");
        let yaml = serde_yaml::to_string(&Effect::SelectBranch).unwrap();
        assert_eq!(yaml.trim(), Effect::SelectBranch.as_str());
        let yaml = serde_yaml::to_string(&FailurePolicy::ContinueCollecting).unwrap();
        assert_eq!(yaml.trim(), "continue-collecting");
    }

    #[test]
    fn defaults() {
        assert_eq!(EnvLifecycle::default(), EnvLifecycle::Uninitialized);
        assert_eq!(FailurePolicy::default(), FailurePolicy::StopOnFirstFailure);
        assert_eq!(Reentry::default(), Reentry::Strict);
    }

    #[test]
    fn reentry_parses() {
        assert_eq!("idempotent".parse::<Reentry>().unwrap(), Reentry::Idempotent);
        assert!("lenient".parse::<Reentry>().is_err());
    }
}
