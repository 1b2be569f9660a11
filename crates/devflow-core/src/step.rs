use std::collections::BTreeMap;

/// One requested action in a sequence, with its arguments as supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Step {
    pub action: String,
    pub args: BTreeMap<String, String>,
    /// Values bound to the action's parameters in template order.
    pub positional: Vec<String>,
    /// Command-line style tokens, classified against the action's
    /// parameters when the step is resolved.
    pub tokens: Vec<String>,
}

impl Step {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    pub fn positional(mut self, value: impl Into<String>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Build a step from command-line style tokens.
    pub fn from_tokens<S: AsRef<str>>(action: &str, tokens: &[S]) -> Self {
        Self {
            tokens: tokens.iter().map(|t| t.as_ref().to_string()).collect(),
            ..Step::new(action)
        }
    }

    /// Named and positional values after classifying `tokens`.
    ///
    /// `key=value` binds `key` only when it names one of `placeholders`;
    /// any other token is positional, as is everything after a literal `--`.
    pub fn bind(&self, placeholders: &[String]) -> (BTreeMap<String, String>, Vec<String>) {
        let mut args = self.args.clone();
        let mut positional = self.positional.clone();
        let mut escaped = false;
        for token in &self.tokens {
            if escaped {
                positional.push(token.clone());
                continue;
            }
            if token == "--" {
                escaped = true;
                continue;
            }
            match token.split_once('=') {
                Some((key, value)) if placeholders.iter().any(|p| p == key) => {
                    args.insert(key.to_string(), value.to_string());
                }
                _ => positional.push(token.clone()),
            }
        }
        (args, positional)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn splits_named_and_positional() {
        let step = Step::from_tokens("push", &["remote=upstream", "main"]);
        assert_eq!(step.action, "push");
        let (args, positional) = step.bind(&params(&["remote", "branch"]));
        assert_eq!(args.get("remote").map(String::as_str), Some("upstream"));
        assert_eq!(positional, vec!["main"]);
    }

    #[test]
    fn values_with_equals_and_spaces_stay_positional() {
        let step = Step::from_tokens("commit", &["fix a=b handling"]);
        let (args, positional) = step.bind(&params(&["message"]));
        assert!(args.is_empty());
        assert_eq!(positional, vec!["fix a=b handling"]);
    }

    #[test]
    fn equals_inside_value_is_kept() {
        let step = Step::from_tokens("commit", &["message=x=y"]);
        let (args, _) = step.bind(&params(&["message"]));
        assert_eq!(args.get("message").map(String::as_str), Some("x=y"));
    }

    #[test]
    fn unknown_key_is_a_positional_value() {
        let step = Step::from_tokens("commit", &["wip=done"]);
        let (args, positional) = step.bind(&params(&["message"]));
        assert!(args.is_empty());
        assert_eq!(positional, vec!["wip=done"]);
    }

    #[test]
    fn double_dash_makes_the_rest_positional() {
        let step = Step::from_tokens("commit", &["--", "message=literal"]);
        let (args, positional) = step.bind(&params(&["message"]));
        assert!(args.is_empty());
        assert_eq!(positional, vec!["message=literal"]);
    }
}
