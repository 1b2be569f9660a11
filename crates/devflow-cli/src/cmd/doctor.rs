use crate::exit::{self, Exit};
use crate::output::{print_json, print_table};
use crate::workspace::{Overrides, Workspace};
use std::path::Path;

#[derive(serde::Serialize)]
struct ToolCheck {
    tool: String,
    program: String,
    found: Option<String>,
}

/// Check that every configured tool resolves on PATH.
pub fn run(root: &Path, overrides: &Overrides, json: bool) -> anyhow::Result<()> {
    let ws = Workspace::load(root, overrides)?;
    let checks: Vec<ToolCheck> = ws
        .config
        .tools
        .iter()
        .map(|(tool, program)| ToolCheck {
            tool: tool.clone(),
            program: program.clone(),
            found: devflow_runner::locate(program).map(|p| p.display().to_string()),
        })
        .collect();

    if json {
        print_json(&checks)?;
    } else {
        let rows = checks
            .iter()
            .map(|c| {
                vec![
                    c.tool.clone(),
                    c.program.clone(),
                    c.found.clone().unwrap_or_else(|| "MISSING".to_string()),
                ]
            })
            .collect();
        print_table(&["TOOL", "PROGRAM", "PATH"], rows);
    }

    let missing: Vec<&str> = checks
        .iter()
        .filter(|c| c.found.is_none())
        .map(|c| c.tool.as_str())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Exit::new(exit::FAILURE, format!("missing tools: {}", missing.join(", "))).into())
    }
}
