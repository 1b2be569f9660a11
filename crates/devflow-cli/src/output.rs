use devflow_core::{ExecutionResult, FailurePolicy};
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    // Calculate column widths
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  ").trim_end());

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}

/// JSON shape of a sequence run.
#[derive(Serialize)]
pub struct SequenceReport<'a> {
    pub policy: FailurePolicy,
    pub results: &'a [ExecutionResult],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Human rendering of one result. Action output goes to stdout; failures
/// and their captured stderr go to stderr.
pub fn print_result(result: &ExecutionResult) {
    if result.skipped {
        println!("[skip] {}: already satisfied", result.action);
        return;
    }
    if !result.stdout.is_empty() {
        print!("{}", result.stdout);
        if !result.stdout.ends_with('\n') {
            println!();
        }
    }
    match &result.failure {
        None => println!("[ok] {} ({} ms)", result.action, result.duration_ms),
        Some(failure) => {
            eprintln!("[fail] {} ({}): {}", result.action, failure.kind(), failure);
            let stderr = result.stderr.trim_end();
            if !stderr.is_empty() {
                if result.truncated {
                    eprintln!("  ... (earlier output truncated)");
                }
                for line in stderr.lines() {
                    eprintln!("  {line}");
                }
            }
        }
    }
}

pub fn print_results(results: &[ExecutionResult]) {
    for result in results {
        print_result(result);
    }
}

/// One-line summary of the first failure, for the final error message.
pub fn failure_summary(results: &[ExecutionResult]) -> String {
    let failed = results.iter().filter(|r| !r.succeeded()).count();
    match results.iter().find(|r| !r.succeeded()) {
        Some(first) => {
            let reason = first
                .failure
                .as_ref()
                .map(|f| f.to_string())
                .unwrap_or_default();
            format!(
                "{failed} of {} action(s) failed; first: '{}' {reason}",
                results.len(),
                first.action
            )
        }
        None => format!("{} action(s) succeeded", results.len()),
    }
}
