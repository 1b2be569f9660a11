use devflow_core::paths;
use devflow_core::{EnvLifecycle, SessionState};
use std::ffi::OsStr;
use std::path::Path;

/// Derive the starting session state from the project directory.
///
/// A venv directory holding `pyvenv.cfg` is Created, or Activated when
/// `virtual_env` (the caller's `VIRTUAL_ENV`) names the same directory. A
/// `.git` entry at the root sets the repository flag.
pub fn probe(root: &Path, venv: &str, virtual_env: Option<&OsStr>) -> SessionState {
    let mut state = SessionState::new();
    let venv_dir = root.join(venv);
    if paths::venv_marker(root, venv).is_file() {
        state.env = EnvLifecycle::Created;
        if virtual_env.is_some_and(|active| same_dir(Path::new(active), &venv_dir)) {
            state.env = EnvLifecycle::Activated;
        }
        state.environment_path = Some(venv_dir);
    }
    state.repository = paths::git_dir(root).exists();
    tracing::debug!(env = %state.env.as_str(), repository = state.repository, "probed session state");
    state
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_venv(dir: &TempDir) {
        std::fs::create_dir_all(dir.path().join(".venv")).unwrap();
        std::fs::write(dir.path().join(".venv/pyvenv.cfg"), "home = /usr/bin\n").unwrap();
    }

    #[test]
    fn empty_directory_is_uninitialized() {
        let dir = TempDir::new().unwrap();
        let state = probe(dir.path(), ".venv", None);
        assert_eq!(state.env, EnvLifecycle::Uninitialized);
        assert!(!state.repository);
    }

    #[test]
    fn venv_marker_means_created() {
        let dir = TempDir::new().unwrap();
        make_venv(&dir);
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        let state = probe(dir.path(), ".venv", None);
        assert_eq!(state.env, EnvLifecycle::Created);
        assert!(state.repository);
    }

    #[test]
    fn directory_without_marker_is_not_a_venv() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".venv")).unwrap();
        assert_eq!(probe(dir.path(), ".venv", None).env, EnvLifecycle::Uninitialized);
    }

    #[test]
    fn matching_virtual_env_means_activated() {
        let dir = TempDir::new().unwrap();
        make_venv(&dir);
        let active = dir.path().join(".venv");
        let state = probe(dir.path(), ".venv", Some(active.as_os_str()));
        assert_eq!(state.env, EnvLifecycle::Activated);

        let other = TempDir::new().unwrap();
        let state = probe(dir.path(), ".venv", Some(other.path().as_os_str()));
        assert_eq!(state.env, EnvLifecycle::Created);
    }
}
