use crate::exit::{self, Exit};
use crate::output::{print_json, print_result};
use crate::workspace::{self, Overrides, Workspace};
use devflow_core::{DevflowError, Step};
use std::path::Path;

/// `devflow run <action> [key=value | value]...`
pub fn run(
    root: &Path,
    overrides: &Overrides,
    action: &str,
    args: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let ws = Workspace::load(root, overrides)?;
    let sequencer = ws.sequencer()?;
    let session = ws.session();
    let step = Step::from_tokens(action, args);

    let outcome = workspace::block_on(|cancel| async move {
        sequencer.run_action(&session, &step, &cancel).await
    })?;
    let result = match outcome {
        Ok(result) => result,
        // A single action has no partial results worth reporting.
        Err(DevflowError::Aborted { source, .. }) => return Err((*source).into()),
        Err(e) => return Err(e.into()),
    };

    if json {
        print_json(&result)?;
    } else {
        print_result(&result);
    }

    match &result.failure {
        None => Ok(()),
        Some(failure) => Err(Exit::new(
            exit::for_failure(failure),
            format!("action '{}' failed: {failure}", result.action),
        )
        .into()),
    }
}
