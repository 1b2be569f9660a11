use crate::builtin;
use crate::error::Result;
use crate::paths;
use crate::registry::{ActionDescriptor, Registry};
use crate::types::{FailurePolicy, Reentry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Virtual environment directory, relative to the project root.
    #[serde(default = "default_venv")]
    pub venv: String,
    /// Per-action timeout. `0` disables it.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Per stream; older output is dropped first.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub reentry: Reentry,
    /// Program variables (`python`, `git`, ...) available to every command.
    #[serde(default = "default_tools")]
    pub tools: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub actions: BTreeMap<String, ActionDescriptor>,
}

fn default_version() -> u32 {
    1
}

fn default_venv() -> String {
    builtin::DEFAULT_VENV.to_string()
}

fn default_timeout_seconds() -> u64 {
    300
}

fn default_max_output_bytes() -> usize {
    64 * 1024
}

fn default_tools() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("python".to_string(), builtin::DEFAULT_PYTHON.to_string()),
        ("git".to_string(), builtin::DEFAULT_GIT.to_string()),
    ])
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            venv: default_venv(),
            timeout_seconds: default_timeout_seconds(),
            max_output_bytes: default_max_output_bytes(),
            failure_policy: FailurePolicy::default(),
            reentry: Reentry::default(),
            tools: default_tools(),
            actions: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load `.devflow/config.yaml`; a missing file yields the defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file; using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let mut cfg: Config = serde_yaml::from_str(&data)?;
        for (name, action) in cfg.actions.iter_mut() {
            action.name = name.clone();
        }
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Registry variables: the configured tools plus `venv`.
    pub fn registry_vars(&self, venv_override: Option<&str>) -> BTreeMap<String, String> {
        let mut vars = self.tools.clone();
        vars.insert(
            "venv".to_string(),
            venv_override.unwrap_or(&self.venv).to_string(),
        );
        vars
    }

    /// The standard actions plus the configured ones. A configured action
    /// reusing a standard name fails with `DuplicateName`.
    pub fn build_registry(&self, venv_override: Option<&str>) -> Result<Registry> {
        let mut registry = Registry::builtin(self.registry_vars(venv_override))?;
        for (name, action) in &self.actions {
            let mut action = action.clone();
            action.name = name.clone();
            registry.register(action)?;
        }
        Ok(registry)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let error = |message: String| ConfigWarning {
            level: WarnLevel::Error,
            message,
        };
        let warning = |message: String| ConfigWarning {
            level: WarnLevel::Warning,
            message,
        };

        if self.max_output_bytes == 0 {
            warnings.push(error(
                "max_output_bytes=0 discards all command output".to_string(),
            ));
        }
        if self.venv.trim().is_empty() {
            warnings.push(error("venv is empty".to_string()));
        }
        for (tool, program) in &self.tools {
            if program.trim().is_empty() {
                warnings.push(error(format!("tool '{tool}' has an empty program")));
            }
        }

        let builtin_names: Vec<String> = builtin::actions().into_iter().map(|a| a.name).collect();
        for (name, action) in &self.actions {
            if builtin_names.contains(name) {
                warnings.push(error(format!(
                    "action '{name}' shadows a standard action"
                )));
                continue;
            }
            let mut action = action.clone();
            action.name = name.clone();
            if let Err(e) = action.validate() {
                warnings.push(error(e.to_string()));
                continue;
            }
            if action.timeout_seconds.is_some_and(|t| t > 24 * 60 * 60) {
                warnings.push(warning(format!(
                    "action '{name}': timeout_seconds over a day is unusual"
                )));
            }
            let implied = action.implied_requires();
            if !implied.is_empty() {
                let flags: Vec<&str> = implied.iter().map(|f| f.as_str()).collect();
                warnings.push(warning(format!(
                    "action '{name}' changes the environment lifecycle; it also requires: {}",
                    flags.join(", ")
                )));
            }
            let vars = self.registry_vars(None);
            let unknown: Vec<String> = action
                .placeholders()
                .into_iter()
                .filter(|p| !vars.contains_key(p) && !action.defaults.contains_key(p))
                .collect();
            if !unknown.is_empty() {
                warnings.push(warning(format!(
                    "action '{name}' requires arguments: {}",
                    unknown.join(", ")
                )));
            }
        }
        warnings
    }
}
