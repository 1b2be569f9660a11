use crate::output::{print_json, print_table};
use crate::workspace::{Overrides, Workspace};
use clap::Subcommand;
use devflow_core::DevflowError;
use std::path::Path;

#[derive(Subcommand)]
pub enum ActionsSubcommand {
    /// List every registered action
    List,

    /// Show one action's command template, arguments and state effects
    Show { name: String },
}

pub fn run(
    root: &Path,
    overrides: &Overrides,
    subcmd: Option<ActionsSubcommand>,
    json: bool,
) -> anyhow::Result<()> {
    let ws = Workspace::load(root, overrides)?;
    let registry = ws.registry()?;
    match subcmd.unwrap_or(ActionsSubcommand::List) {
        ActionsSubcommand::List => {
            if json {
                return print_json(&registry.iter().collect::<Vec<_>>());
            }
            let rows = registry
                .iter()
                .map(|a| {
                    vec![
                        a.name.clone(),
                        join(a.requires.iter().map(|f| f.as_str())),
                        join(a.mutates.iter().map(|e| e.as_str())),
                        a.description.clone(),
                    ]
                })
                .collect();
            print_table(&["NAME", "REQUIRES", "MUTATES", "DESCRIPTION"], rows);
            Ok(())
        }
        ActionsSubcommand::Show { name } => {
            let descriptor = registry
                .get(&name)
                .ok_or_else(|| DevflowError::UnknownAction(name.clone()))?;
            let parameters = registry.parameters(&name)?;
            let required = registry.required_args(&name)?;
            if json {
                return print_json(&serde_json::json!({
                    "action": &**descriptor,
                    "parameters": parameters,
                    "required": required,
                }));
            }
            println!("Action:      {}", descriptor.name);
            if !descriptor.description.is_empty() {
                println!("Description: {}", descriptor.description);
            }
            println!("Command:     {}", descriptor.command.join(" "));
            println!("Parameters:  {}", join(parameters.iter().map(|p| {
                match descriptor.defaults.get(p) {
                    Some(default) => format!("{p}={default}"),
                    None => p.clone(),
                }
            })));
            println!("Requires:    {}", join(descriptor.requires.iter().map(|f| f.as_str())));
            println!("Mutates:     {}", join(descriptor.mutates.iter().map(|e| e.as_str())));
            if let Some(flag) = descriptor.already_satisfied {
                println!("Satisfied:   when {flag} holds (idempotent re-entry)");
            }
            Ok(())
        }
    }
}

fn join<S: AsRef<str>>(items: impl Iterator<Item = S>) -> String {
    let parts: Vec<String> = items.map(|s| s.as_ref().to_string()).collect();
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(", ")
    }
}
