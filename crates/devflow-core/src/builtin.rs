//! The standard action table: virtual environments, dependencies, and git.
//!
//! Programs are referenced through registry variables (`{python}`, `{git}`,
//! `{venv}`) so the configuration can point them elsewhere.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::registry::{ActionDescriptor, Registry};
use crate::types::{Effect, Flag};

pub const DEFAULT_PYTHON: &str = "python3";
pub const DEFAULT_GIT: &str = "git";
pub const DEFAULT_VENV: &str = ".venv";

/// Registry variables used when nothing is configured.
pub fn default_vars() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("python".to_string(), DEFAULT_PYTHON.to_string()),
        ("git".to_string(), DEFAULT_GIT.to_string()),
        ("venv".to_string(), DEFAULT_VENV.to_string()),
    ])
}

pub fn environment_actions() -> Vec<ActionDescriptor> {
    vec![
        ActionDescriptor::new(
            "create-venv",
            "Create the virtual environment",
            &["{python}", "-m", "venv", "{venv}"],
        )
        .requires(Flag::EnvAbsent)
        .mutates(Effect::CreateEnv),
        ActionDescriptor::new(
            "activate",
            "Activate the virtual environment (prints its prefix)",
            &["{venv}/bin/python", "-c", "import sys; print(sys.prefix)"],
        )
        .requires(Flag::EnvInactive)
        .mutates(Effect::ActivateEnv)
        .already_satisfied(Flag::EnvActive),
        ActionDescriptor::new(
            "deactivate",
            "Deactivate the virtual environment (prints the base prefix)",
            &["{python}", "-c", "import sys; print(sys.base_prefix)"],
        )
        .requires(Flag::EnvActive)
        .mutates(Effect::DeactivateEnv),
        ActionDescriptor::new(
            "remove",
            "Delete the virtual environment directory",
            &[
                "{python}",
                "-c",
                "import shutil, sys; shutil.rmtree(sys.argv[1])",
                "{venv}",
            ],
        )
        .requires(Flag::EnvInactive)
        .mutates(Effect::RemoveEnv),
    ]
}

pub fn dependency_actions() -> Vec<ActionDescriptor> {
    vec![
        ActionDescriptor::new(
            "install",
            "Install dependencies from a manifest",
            &["{venv}/bin/python", "-m", "pip", "install", "-r", "{manifest}"],
        )
        .default_arg("manifest", "requirements.txt")
        .requires(Flag::EnvActive),
        ActionDescriptor::new(
            "install-package",
            "Install a single package",
            &["{venv}/bin/python", "-m", "pip", "install", "{package}"],
        )
        .requires(Flag::EnvActive),
        ActionDescriptor::new(
            "freeze",
            "Print installed packages in manifest format",
            &["{venv}/bin/python", "-m", "pip", "freeze"],
        )
        .requires(Flag::EnvActive),
    ]
}

pub fn git_actions() -> Vec<ActionDescriptor> {
    vec![
        ActionDescriptor::new("init", "Create a repository", &["{git}", "init"])
            .mutates(Effect::InitRepository),
        ActionDescriptor::new(
            "clone",
            "Clone a repository",
            &["{git}", "clone", "{url}", "{directory}"],
        )
        .default_arg("directory", ".")
        .mutates(Effect::InitRepository),
        ActionDescriptor::new("status", "Show working tree status", &["{git}", "status"])
            .requires(Flag::Repository),
        ActionDescriptor::new("add", "Stage changes", &["{git}", "add", "{path}"])
            .default_arg("path", ".")
            .requires(Flag::Repository),
        ActionDescriptor::new(
            "commit",
            "Commit staged changes",
            &["{git}", "commit", "-m", "{message}"],
        )
        .requires(Flag::Repository),
        ActionDescriptor::new(
            "push",
            "Push to a remote",
            &["{git}", "push", "{remote}", "{branch}"],
        )
        .default_arg("remote", "origin")
        .default_arg("branch", "HEAD")
        .requires(Flag::Repository),
        ActionDescriptor::new(
            "pull",
            "Pull from a remote",
            &["{git}", "pull", "{remote}", "{branch}"],
        )
        .default_arg("remote", "origin")
        .default_arg("branch", "HEAD")
        .requires(Flag::Repository),
        ActionDescriptor::new(
            "log",
            "Show recent commits",
            &["{git}", "log", "--oneline", "-n", "{count}"],
        )
        .default_arg("count", "10")
        .requires(Flag::Repository),
        ActionDescriptor::new(
            "remote-add",
            "Add a remote",
            &["{git}", "remote", "add", "{name}", "{url}"],
        )
        .default_arg("name", "origin")
        .requires(Flag::Repository),
        ActionDescriptor::new("branches", "List branches", &["{git}", "branch", "--list"])
            .requires(Flag::Repository),
        ActionDescriptor::new(
            "branch",
            "Create and switch to a branch",
            &["{git}", "checkout", "-b", "{branch}"],
        )
        .requires(Flag::Repository)
        .mutates(Effect::SelectBranch),
        ActionDescriptor::new(
            "checkout",
            "Switch to an existing branch",
            &["{git}", "checkout", "{branch}"],
        )
        .requires(Flag::Repository)
        .mutates(Effect::SelectBranch),
    ]
}

pub fn actions() -> Vec<ActionDescriptor> {
    let mut all = environment_actions();
    all.extend(dependency_actions());
    all.extend(git_actions());
    all
}

impl Registry {
    /// A registry holding the standard action table. `vars` are layered
    /// over [`default_vars`].
    pub fn builtin(vars: BTreeMap<String, String>) -> Result<Self> {
        let mut merged = default_vars();
        merged.extend(vars);
        let mut registry = Registry::with_vars(merged);
        for descriptor in actions() {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }
}
