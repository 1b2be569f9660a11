use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::{DevflowError, Result};
use crate::step::Step;
use crate::template::{self, RenderError};
use crate::types::{Effect, Flag};

// ---------------------------------------------------------------------------
// ActionDescriptor
// ---------------------------------------------------------------------------

/// A named external-command invocation with declared state effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionDescriptor {
    /// Taken from the map key when loaded from configuration.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Argument tokens; `command[0]` is the program.
    pub command: Vec<String>,
    /// Per-action placeholder defaults.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub defaults: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub requires: BTreeSet<Flag>,
    /// Applied in order after a zero exit status.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mutates: Vec<Effect>,
    /// When this flag already holds and re-entry is idempotent, the action
    /// succeeds without running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub already_satisfied: Option<Flag>,
    /// Working directory template, relative to the project root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    /// Overrides the configured timeout. `0` disables the timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl ActionDescriptor {
    pub fn new(name: &str, description: &str, command: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            command: command.iter().map(|s| s.to_string()).collect(),
            defaults: BTreeMap::new(),
            requires: BTreeSet::new(),
            mutates: Vec::new(),
            already_satisfied: None,
            cwd: None,
            timeout_seconds: None,
        }
    }

    pub fn requires(mut self, flag: Flag) -> Self {
        self.requires.insert(flag);
        self
    }

    pub fn mutates(mut self, effect: Effect) -> Self {
        self.mutates.push(effect);
        self
    }

    pub fn default_arg(mut self, key: &str, value: &str) -> Self {
        self.defaults.insert(key.to_string(), value.to_string());
        self
    }

    pub fn already_satisfied(mut self, flag: Flag) -> Self {
        self.already_satisfied = Some(flag);
        self
    }

    /// Every placeholder in the command and cwd templates, in order.
    /// Flags the `mutates` list demands that `requires` does not declare.
    pub fn implied_requires(&self) -> Vec<Flag> {
        self.mutates
            .iter()
            .filter_map(|e| e.guard())
            .filter(|f| !self.requires.contains(f))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn placeholders(&self) -> Vec<String> {
        template::placeholders(
            self.command
                .iter()
                .chain(self.cwd.iter())
                .map(String::as_str),
        )
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let invalid = |reason: String| DevflowError::InvalidTemplate {
            action: self.name.clone(),
            reason,
        };
        if !template::is_valid_name(&self.name) {
            return Err(invalid(
                "name must be lowercase alphanumeric with hyphens".to_string(),
            ));
        }
        if self.command.is_empty() || self.command[0].trim().is_empty() {
            return Err(invalid("command is empty".to_string()));
        }
        for token in self.command.iter().chain(self.cwd.iter()) {
            template::parse(token).map_err(invalid)?;
        }
        let placeholders = self.placeholders();
        for key in self.defaults.keys() {
            if !placeholders.contains(key) {
                return Err(invalid(format!("default for unknown placeholder '{key}'")));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ResolvedAction
// ---------------------------------------------------------------------------

/// A descriptor with every placeholder filled, ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAction {
    pub name: String,
    pub argv: Vec<String>,
    /// The value bound to each placeholder, whatever its source.
    pub args: BTreeMap<String, String>,
    pub cwd: Option<String>,
    pub descriptor: Arc<ActionDescriptor>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Name → descriptor table plus registry-wide variables (tool bindings,
/// `venv`) that fill placeholders no argument or default covers.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    actions: BTreeMap<String, Arc<ActionDescriptor>>,
    vars: BTreeMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vars(vars: BTreeMap<String, String>) -> Self {
        Self {
            actions: BTreeMap::new(),
            vars,
        }
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    /// Add `descriptor`. Lifecycle effects also require their guard flag,
    /// whether or not the descriptor declares it.
    pub fn register(&mut self, mut descriptor: ActionDescriptor) -> Result<()> {
        if self.actions.contains_key(&descriptor.name) {
            return Err(DevflowError::DuplicateName(descriptor.name));
        }
        descriptor.validate()?;
        for flag in descriptor.implied_requires() {
            tracing::debug!(action = %descriptor.name, %flag, "adding lifecycle requirement");
            descriptor.requires.insert(flag);
        }
        tracing::debug!(action = %descriptor.name, "registered action");
        self.actions
            .insert(descriptor.name.clone(), Arc::new(descriptor));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ActionDescriptor>> {
        self.actions.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionDescriptor> {
        self.actions.values().map(|d| d.as_ref())
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    fn lookup(&self, name: &str) -> Result<&Arc<ActionDescriptor>> {
        self.actions
            .get(name)
            .ok_or_else(|| DevflowError::UnknownAction(name.to_string()))
    }

    /// Placeholders a caller may bind: everything not supplied by a
    /// registry variable.
    pub fn parameters(&self, name: &str) -> Result<Vec<String>> {
        let descriptor = self.lookup(name)?;
        Ok(descriptor
            .placeholders()
            .into_iter()
            .filter(|p| !self.vars.contains_key(p))
            .collect())
    }

    /// Parameters without any default; these must be supplied to `resolve`.
    pub fn required_args(&self, name: &str) -> Result<Vec<String>> {
        let descriptor = self.lookup(name)?;
        Ok(self
            .parameters(name)?
            .into_iter()
            .filter(|p| !descriptor.defaults.contains_key(p))
            .collect())
    }

    /// Fill `name`'s template. Supplied args win over descriptor defaults,
    /// which win over registry variables.
    pub fn resolve(&self, name: &str, args: &BTreeMap<String, String>) -> Result<ResolvedAction> {
        let descriptor = self.lookup(name)?;
        let placeholders = descriptor.placeholders();

        if let Some(key) = args.keys().find(|k| !placeholders.contains(k)) {
            return Err(DevflowError::UnexpectedArgument {
                action: name.to_string(),
                value: key.clone(),
            });
        }

        let value_of = |p: &str| {
            args.get(p)
                .or_else(|| descriptor.defaults.get(p))
                .or_else(|| self.vars.get(p))
                .map(String::as_str)
        };
        let render = |token: &str| {
            template::render(token, value_of).map_err(|e| match e {
                RenderError::Unfilled(placeholder) => DevflowError::MissingArgument {
                    action: name.to_string(),
                    placeholder,
                },
                RenderError::Malformed(reason) => DevflowError::InvalidTemplate {
                    action: name.to_string(),
                    reason,
                },
            })
        };

        let argv = descriptor
            .command
            .iter()
            .map(|t| render(t))
            .collect::<Result<Vec<_>>>()?;
        let cwd = descriptor.cwd.as_deref().map(render).transpose()?;
        let bound = placeholders
            .iter()
            .filter_map(|p| value_of(p).map(|v| (p.clone(), v.to_string())))
            .collect();

        Ok(ResolvedAction {
            name: name.to_string(),
            argv,
            args: bound,
            cwd,
            descriptor: Arc::clone(descriptor),
        })
    }

    /// Resolve a [`Step`], binding its positional values to the action's
    /// parameters in template order, skipping those already named.
    pub fn resolve_step(&self, step: &Step) -> Result<ResolvedAction> {
        let parameters = self.parameters(&step.action)?;
        let (mut args, positional) = step.bind(&self.lookup(&step.action)?.placeholders());
        let free: Vec<String> = parameters
            .into_iter()
            .filter(|p| !args.contains_key(p))
            .collect();
        if positional.len() > free.len() {
            return Err(DevflowError::UnexpectedArgument {
                action: step.action.clone(),
                value: positional[free.len()].clone(),
            });
        }
        for (name, value) in free.into_iter().zip(&positional) {
            args.insert(name, value.clone());
        }
        self.resolve(&step.action, &args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn registry() -> Registry {
        let mut reg = Registry::with_vars(args(&[("git", "git")]));
        reg.register(
            ActionDescriptor::new("commit", "Commit staged changes", &["{git}", "commit", "-m", "{message}"])
                .requires(Flag::Repository),
        )
        .unwrap();
        reg.register(
            ActionDescriptor::new("push", "Push a branch", &["{git}", "push", "{remote}", "{branch}"])
                .default_arg("remote", "origin")
                .default_arg("branch", "HEAD"),
        )
        .unwrap();
        reg
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut reg = registry();
        let err = reg
            .register(ActionDescriptor::new("commit", "", &["true"]))
            .unwrap_err();
        assert!(matches!(err, DevflowError::DuplicateName(n) if n == "commit"));
    }

    #[test]
    fn malformed_template_rejected() {
        let mut reg = Registry::new();
        let err = reg
            .register(ActionDescriptor::new("bad", "", &["echo", "{oops"]))
            .unwrap_err();
        assert!(matches!(err, DevflowError::InvalidTemplate { .. }));

        let err = reg.register(ActionDescriptor::new("empty", "", &[])).unwrap_err();
        assert!(matches!(err, DevflowError::InvalidTemplate { .. }));

        let err = reg
            .register(ActionDescriptor::new("stray", "", &["echo"]).default_arg("nope", "x"))
            .unwrap_err();
        assert!(matches!(err, DevflowError::InvalidTemplate { .. }));
    }

    #[test]
    fn unknown_action() {
        let err = registry().resolve("deploy", &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, DevflowError::UnknownAction(n) if n == "deploy"));
    }

    #[test]
    fn missing_argument_names_placeholder() {
        let err = registry().resolve("commit", &BTreeMap::new()).unwrap_err();
        match err {
            DevflowError::MissingArgument { action, placeholder } => {
                assert_eq!(action, "commit");
                assert_eq!(placeholder, "message");
            }
            other => panic!("expected MissingArgument, got {other:?}"),
        }
    }

    #[test]
    fn resolve_fills_vars_defaults_and_args() {
        let reg = registry();
        let resolved = reg.resolve("push", &args(&[("branch", "main")])).unwrap();
        assert_eq!(resolved.argv, vec!["git", "push", "origin", "main"]);
        assert_eq!(resolved.args.get("remote").map(String::as_str), Some("origin"));
        assert_eq!(resolved.args.get("git").map(String::as_str), Some("git"));
    }

    #[test]
    fn supplied_args_override_vars() {
        let reg = registry();
        let resolved = reg
            .resolve("commit", &args(&[("message", "wip"), ("git", "/usr/bin/git")]))
            .unwrap();
        assert_eq!(resolved.argv[0], "/usr/bin/git");
    }

    #[test]
    fn unknown_named_argument_rejected() {
        let err = registry()
            .resolve("commit", &args(&[("mesage", "typo")]))
            .unwrap_err();
        assert!(matches!(err, DevflowError::UnexpectedArgument { .. }));
    }

    #[test]
    fn required_args_excludes_defaults_and_vars() {
        let reg = registry();
        assert_eq!(reg.required_args("commit").unwrap(), vec!["message"]);
        assert!(reg.required_args("push").unwrap().is_empty());
        assert_eq!(reg.parameters("push").unwrap(), vec!["remote", "branch"]);
    }

    #[test]
    fn resolve_step_binds_positional_in_order() {
        let reg = registry();
        let step = Step::new("push").positional("upstream").positional("feature");
        let resolved = reg.resolve_step(&step).unwrap();
        assert_eq!(resolved.argv, vec!["git", "push", "upstream", "feature"]);

        let step = Step::new("push").arg("remote", "upstream").positional("feature");
        let resolved = reg.resolve_step(&step).unwrap();
        assert_eq!(resolved.argv, vec!["git", "push", "upstream", "feature"]);
    }

    #[test]
    fn resolve_step_rejects_extra_positional() {
        let step = Step::new("commit").positional("one").positional("two");
        let err = registry().resolve_step(&step).unwrap_err();
        assert!(matches!(err, DevflowError::UnexpectedArgument { value, .. } if value == "two"));
    }

    #[test]
    fn resolve_step_binds_unknown_key_value_positionally() {
        let step = Step::from_tokens("commit", &["wip=done"]);
        let resolved = registry().resolve_step(&step).unwrap();
        assert_eq!(resolved.argv, vec!["git", "commit", "-m", "wip=done"]);

        let step = Step::from_tokens("push", &["branch=main", "upstream"]);
        let resolved = registry().resolve_step(&step).unwrap();
        assert_eq!(resolved.argv, vec!["git", "push", "upstream", "main"]);
    }

    #[test]
    fn descriptor_yaml_roundtrip() {
        let desc = ActionDescriptor::new("lint", "Run the linter", &["{venv}/bin/ruff", "check", "{path}"])
            .default_arg("path", ".")
            .requires(Flag::EnvActive);
        let yaml = serde_yaml::to_string(&desc).unwrap();
        assert!(yaml.contains("env-active"));
        let parsed: ActionDescriptor = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, desc);
    }
}
