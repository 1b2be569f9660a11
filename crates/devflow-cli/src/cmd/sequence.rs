use crate::exit::{self, Exit};
use crate::output::{failure_summary, print_json, print_results, SequenceReport};
use crate::workspace::{self, Overrides, Workspace};
use anyhow::Context;
use devflow_core::plan;
use devflow_core::sequence_file::SequenceFile;
use devflow_core::{DevflowError, FailurePolicy, Session};
use std::path::Path;

/// `devflow run-sequence <file> [--continue] [--check]`
pub fn run(
    root: &Path,
    overrides: &Overrides,
    file: &Path,
    keep_going: bool,
    check_only: bool,
    json: bool,
) -> anyhow::Result<()> {
    let ws = Workspace::load(root, overrides)?;
    let sequence = SequenceFile::load(file)
        .with_context(|| format!("failed to read sequence file {}", file.display()))?;
    let policy = if keep_going {
        FailurePolicy::ContinueCollecting
    } else {
        sequence.policy.unwrap_or(ws.config.failure_policy)
    };
    let sequencer = ws.sequencer()?;
    let initial = ws.probe();

    if check_only {
        let actions = sequencer.resolve(&sequence.steps)?;
        if let Err(miss) = plan::check(&initial, &actions, ws.reentry) {
            let step = miss.step + 1;
            return Err(anyhow::Error::new(DevflowError::from(miss))
                .context(format!("step {step} cannot run")));
        }
        if json {
            print_json(&serde_json::json!({
                "ok": true,
                "policy": policy,
                "steps": actions.iter().map(|a| &a.argv).collect::<Vec<_>>(),
            }))?;
        } else {
            for (i, action) in actions.iter().enumerate() {
                println!("{:>3}. {:<16} {}", i + 1, action.name, action.argv.join(" "));
            }
            println!("Plan OK: {} step(s), policy {policy}", actions.len());
        }
        return Ok(());
    }

    let session = Session::new(initial);
    let steps = sequence.steps;
    let outcome = workspace::block_on(|cancel| async move {
        sequencer.run_sequence(&session, &steps, policy, &cancel).await
    })?;

    match outcome {
        Ok(results) => {
            report(policy, &results, None, json)?;
            match exit::for_results(&results) {
                exit::OK => Ok(()),
                code => Err(Exit::new(code, failure_summary(&results)).into()),
            }
        }
        Err(DevflowError::Aborted { completed, source }) => {
            report(policy, &completed, Some(source.to_string()), json)?;
            Err(anyhow::Error::new(*source).context(format!(
                "sequence stopped after {} action(s)",
                completed.len()
            )))
        }
        Err(e) => Err(e.into()),
    }
}

fn report(
    policy: FailurePolicy,
    results: &[devflow_core::ExecutionResult],
    error: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    if json {
        print_json(&SequenceReport {
            policy,
            results,
            error,
        })
    } else {
        print_results(results);
        Ok(())
    }
}
