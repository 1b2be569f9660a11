use std::path::{Path, PathBuf};

pub const DEVFLOW_DIR: &str = ".devflow";
pub const CONFIG_FILE: &str = ".devflow/config.yaml";
pub const SEQUENCES_DIR: &str = ".devflow/sequences";

/// Marker written inside every virtual environment by `python -m venv`.
pub const VENV_MARKER: &str = "pyvenv.cfg";
pub const GIT_DIR: &str = ".git";

pub fn devflow_dir(root: &Path) -> PathBuf {
    root.join(DEVFLOW_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn sequences_dir(root: &Path) -> PathBuf {
    root.join(SEQUENCES_DIR)
}

pub fn venv_marker(root: &Path, venv: &str) -> PathBuf {
    root.join(venv).join(VENV_MARKER)
}

pub fn git_dir(root: &Path) -> PathBuf {
    root.join(GIT_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_rooted() {
        let root = Path::new("/work/app");
        assert_eq!(config_path(root), PathBuf::from("/work/app/.devflow/config.yaml"));
        assert_eq!(
            venv_marker(root, ".venv"),
            PathBuf::from("/work/app/.venv/pyvenv.cfg")
        );
        assert_eq!(git_dir(root), PathBuf::from("/work/app/.git"));
    }
}
