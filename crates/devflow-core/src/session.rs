use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tokio::sync::{Mutex, MutexGuard};

use crate::types::{Effect, EnvLifecycle, Flag};

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// What the session knows about the developer environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub env: EnvLifecycle,
    /// Path of the session's environment, recorded when it is created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_branch_hint: Option<String>,
    #[serde(default)]
    pub repository: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment path while the environment is activated.
    pub fn active_environment_path(&self) -> Option<&PathBuf> {
        match self.env {
            EnvLifecycle::Activated => self.environment_path.as_ref(),
            _ => None,
        }
    }

    pub fn satisfies(&self, flag: Flag) -> bool {
        use EnvLifecycle::*;
        match flag {
            Flag::EnvAbsent => self.env == Uninitialized,
            Flag::EnvPresent => matches!(self.env, Created | Activated | Deactivated),
            Flag::EnvActive => self.env == Activated,
            Flag::EnvInactive => matches!(self.env, Created | Deactivated),
            Flag::Repository => self.repository,
            Flag::Branch => self.active_branch_hint.is_some(),
        }
    }

    /// Every flag that currently holds.
    pub fn flags(&self) -> BTreeSet<Flag> {
        Flag::all()
            .iter()
            .copied()
            .filter(|f| self.satisfies(*f))
            .collect()
    }

    /// The first flag in `requires` that does not hold.
    pub fn missing<'a>(&self, requires: impl IntoIterator<Item = &'a Flag>) -> Option<Flag> {
        requires.into_iter().copied().find(|f| !self.satisfies(*f))
    }

    /// Apply `effect`, reading `venv`/`branch` from the action's bound args.
    pub fn apply(&mut self, effect: Effect, args: &BTreeMap<String, String>) {
        match effect {
            Effect::CreateEnv => {
                self.env = EnvLifecycle::Created;
                self.environment_path = args.get("venv").map(PathBuf::from);
            }
            Effect::ActivateEnv => {
                self.env = EnvLifecycle::Activated;
                if self.environment_path.is_none() {
                    self.environment_path = args.get("venv").map(PathBuf::from);
                }
            }
            Effect::DeactivateEnv => self.env = EnvLifecycle::Deactivated,
            Effect::RemoveEnv => {
                self.env = EnvLifecycle::Removed;
                self.environment_path = None;
            }
            Effect::InitRepository => self.repository = true,
            Effect::SelectBranch => {
                if let Some(branch) = args.get("branch") {
                    self.active_branch_hint = Some(branch.clone());
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One session: the unit of serialized state mutation.
///
/// Readers get copies through [`Session::snapshot`]. Only the sequencer
/// mutates the state, while holding the lock across its
/// check → run → apply region.
#[derive(Debug, Default)]
pub struct Session {
    initial: SessionState,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(initial: SessionState) -> Self {
        Self {
            state: Mutex::new(initial.clone()),
            initial,
        }
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    /// Reset to the state the session was created with.
    pub async fn teardown(&self) {
        let mut state = self.state.lock().await;
        *state = self.initial.clone();
        tracing::debug!("session torn down");
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn venv_args() -> BTreeMap<String, String> {
        BTreeMap::from([("venv".to_string(), ".venv".to_string())])
    }

    #[test]
    fn lifecycle_flags() {
        let mut s = SessionState::new();
        assert_eq!(s.flags(), BTreeSet::from([Flag::EnvAbsent]));

        s.apply(Effect::CreateEnv, &venv_args());
        assert!(s.satisfies(Flag::EnvPresent));
        assert!(s.satisfies(Flag::EnvInactive));
        assert!(!s.satisfies(Flag::EnvActive));
        assert_eq!(s.environment_path, Some(PathBuf::from(".venv")));
        assert_eq!(s.active_environment_path(), None);

        s.apply(Effect::ActivateEnv, &venv_args());
        assert!(s.satisfies(Flag::EnvActive));
        assert!(!s.satisfies(Flag::EnvInactive));
        assert_eq!(s.active_environment_path(), Some(&PathBuf::from(".venv")));

        s.apply(Effect::DeactivateEnv, &venv_args());
        assert!(s.satisfies(Flag::EnvInactive));

        s.apply(Effect::RemoveEnv, &venv_args());
        assert_eq!(s.env, EnvLifecycle::Removed);
        assert!(s.environment_path.is_none());
    }

    #[test]
    fn removed_satisfies_no_environment_flag() {
        let s = SessionState {
            env: EnvLifecycle::Removed,
            ..Default::default()
        };
        for flag in [Flag::EnvAbsent, Flag::EnvPresent, Flag::EnvActive, Flag::EnvInactive] {
            assert!(!s.satisfies(flag), "{flag} should not hold after removal");
        }
    }

    #[test]
    fn no_lifecycle_effect_is_legal_from_removed() {
        let s = SessionState {
            env: EnvLifecycle::Removed,
            ..Default::default()
        };
        for effect in [Effect::CreateEnv, Effect::ActivateEnv, Effect::DeactivateEnv, Effect::RemoveEnv] {
            let guard = effect.guard().unwrap();
            assert!(!s.satisfies(guard), "{effect} should not leave Removed");
        }
        assert!(!SessionState::new().satisfies(Effect::ActivateEnv.guard().unwrap()));
    }

    #[test]
    fn missing_reports_first_unmet_flag() {
        let s = SessionState::new();
        let requires = BTreeSet::from([Flag::EnvAbsent, Flag::Repository]);
        assert_eq!(s.missing(&requires), Some(Flag::Repository));
    }

    #[test]
    fn select_branch_records_hint() {
        let mut s = SessionState::new();
        let args = BTreeMap::from([("branch".to_string(), "feature/x".to_string())]);
        s.apply(Effect::SelectBranch, &args);
        assert_eq!(s.active_branch_hint.as_deref(), Some("feature/x"));
        assert!(s.satisfies(Flag::Branch));
    }

    #[tokio::test]
    async fn snapshot_is_a_copy_and_teardown_restores() {
        let initial = SessionState {
            repository: true,
            ..Default::default()
        };
        let session = Session::new(initial.clone());
        {
            let mut guard = session.lock().await;
            guard.apply(Effect::CreateEnv, &venv_args());
        }
        let mut snap = session.snapshot().await;
        assert_eq!(snap.env, EnvLifecycle::Created);

        snap.env = EnvLifecycle::Removed;
        assert_eq!(session.snapshot().await.env, EnvLifecycle::Created);

        session.teardown().await;
        assert_eq!(session.snapshot().await, initial);
    }
}
