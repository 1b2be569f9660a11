//! Static precondition check for a whole sequence.
//!
//! Simulates the sequence against a snapshot, assuming every action
//! succeeds, and reports the first precondition no earlier action (or the
//! initial state) can satisfy.

use crate::error::DevflowError;
use crate::registry::ResolvedAction;
use crate::session::SessionState;
use crate::types::{Flag, Reentry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanMiss {
    /// Zero-based position in the sequence.
    pub step: usize,
    pub action: String,
    pub missing: Flag,
}

impl From<PlanMiss> for DevflowError {
    fn from(miss: PlanMiss) -> Self {
        DevflowError::Precondition {
            action: miss.action,
            missing: miss.missing,
        }
    }
}

pub fn check(
    initial: &SessionState,
    plan: &[ResolvedAction],
    reentry: Reentry,
) -> Result<(), PlanMiss> {
    let mut state = initial.clone();
    for (step, action) in plan.iter().enumerate() {
        let descriptor = &action.descriptor;
        if reentry == Reentry::Idempotent
            && descriptor
                .already_satisfied
                .is_some_and(|f| state.satisfies(f))
        {
            continue;
        }
        if let Some(missing) = state.missing(&descriptor.requires) {
            return Err(PlanMiss {
                step,
                action: action.name.clone(),
                missing,
            });
        }
        for effect in &descriptor.mutates {
            state.apply(*effect, &action.args);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::types::EnvLifecycle;
    use std::collections::BTreeMap;

    fn plan(names: &[&str]) -> Vec<ResolvedAction> {
        let reg = Registry::builtin(BTreeMap::new()).unwrap();
        names
            .iter()
            .map(|n| reg.resolve(n, &BTreeMap::new()).unwrap())
            .collect()
    }

    #[test]
    fn full_lifecycle_is_satisfiable() {
        let p = plan(&["create-venv", "activate", "deactivate", "remove"]);
        assert!(check(&SessionState::new(), &p, Reentry::Strict).is_ok());
    }

    #[test]
    fn activate_before_create_misses() {
        let p = plan(&["activate", "create-venv"]);
        let miss = check(&SessionState::new(), &p, Reentry::Strict).unwrap_err();
        assert_eq!(miss.step, 0);
        assert_eq!(miss.missing, Flag::EnvInactive);
    }

    #[test]
    fn remove_while_active_misses() {
        let initial = SessionState {
            env: EnvLifecycle::Activated,
            ..Default::default()
        };
        let miss = check(&initial, &plan(&["remove"]), Reentry::Strict).unwrap_err();
        assert_eq!(miss.action, "remove");
        assert_eq!(miss.missing, Flag::EnvInactive);
    }

    #[test]
    fn nothing_follows_removal() {
        let p = plan(&["create-venv", "remove", "create-venv"]);
        let miss = check(&SessionState::new(), &p, Reentry::Strict).unwrap_err();
        assert_eq!(miss.step, 2);
        assert_eq!(miss.missing, Flag::EnvAbsent);
    }

    #[test]
    fn repository_from_prior_init() {
        let p = plan(&["init", "status", "add"]);
        assert!(check(&SessionState::new(), &p, Reentry::Strict).is_ok());
        let miss = check(&SessionState::new(), &plan(&["status"]), Reentry::Strict).unwrap_err();
        assert_eq!(miss.missing, Flag::Repository);
    }

    #[test]
    fn double_activate_depends_on_reentry() {
        let p = plan(&["create-venv", "activate", "activate"]);
        let miss = check(&SessionState::new(), &p, Reentry::Strict).unwrap_err();
        assert_eq!(miss.step, 2);
        assert!(check(&SessionState::new(), &p, Reentry::Idempotent).is_ok());
    }
}
