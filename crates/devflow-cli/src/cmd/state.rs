use crate::output::print_json;
use crate::workspace::{Overrides, Workspace};
use std::path::Path;

pub fn run(root: &Path, overrides: &Overrides, json: bool) -> anyhow::Result<()> {
    let ws = Workspace::load(root, overrides)?;
    let state = ws.probe();
    let flags: Vec<&str> = state.flags().into_iter().map(|f| f.as_str()).collect();

    if json {
        #[derive(serde::Serialize)]
        struct StateOutput<'a> {
            root: String,
            venv: &'a str,
            #[serde(flatten)]
            state: &'a devflow_core::SessionState,
            flags: Vec<&'a str>,
        }
        return print_json(&StateOutput {
            root: ws.root.display().to_string(),
            venv: &ws.venv,
            state: &state,
            flags,
        });
    }

    println!("Root:        {}", ws.root.display());
    println!("Environment: {} ({})", state.env.as_str(), ws.venv);
    println!("Repository:  {}", if state.repository { "yes" } else { "no" });
    println!(
        "Flags:       {}",
        if flags.is_empty() { "-".to_string() } else { flags.join(", ") }
    );
    Ok(())
}
