use chrono::Utc;
use devflow_runner::CommandSpec;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{DevflowError, Result};
use crate::exec::CommandRunner;
use crate::plan;
use crate::registry::{Registry, ResolvedAction};
use crate::result::ExecutionResult;
use crate::session::Session;
use crate::step::Step;
use crate::types::{FailurePolicy, Reentry};

#[derive(Debug, Clone)]
pub struct SequencerOptions {
    /// Working directory for every action; descriptor `cwd` is relative to it.
    pub root: PathBuf,
    /// Applies when the descriptor sets no timeout. `None` waits forever.
    pub default_timeout: Option<Duration>,
    pub reentry: Reentry,
}

impl Default for SequencerOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            default_timeout: None,
            reentry: Reentry::Strict,
        }
    }
}

/// Runs ordered lists of actions against a [`Session`].
pub struct Sequencer<R> {
    registry: Arc<Registry>,
    runner: R,
    options: SequencerOptions,
}

impl<R: CommandRunner> Sequencer<R> {
    pub fn new(registry: Arc<Registry>, runner: R, options: SequencerOptions) -> Self {
        Self {
            registry,
            runner,
            options,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Resolve every step up front. Nothing runs if any step is unknown or
    /// missing an argument.
    pub fn resolve(&self, steps: &[Step]) -> Result<Vec<ResolvedAction>> {
        steps.iter().map(|s| self.registry.resolve_step(s)).collect()
    }

    /// Run `steps` in order under `policy`.
    ///
    /// Returns one result per attempted action. Under
    /// [`FailurePolicy::StopOnFirstFailure`] a precondition miss aborts with
    /// [`DevflowError::Aborted`] carrying the results so far; the plan is
    /// checked before anything runs, so a sequence that cannot be satisfied
    /// aborts without launching a process. Under
    /// [`FailurePolicy::ContinueCollecting`] the miss becomes that action's
    /// result. Cancellation stops the sequence under either policy.
    pub async fn run_sequence(
        &self,
        session: &Session,
        steps: &[Step],
        policy: FailurePolicy,
        cancel: &CancellationToken,
    ) -> Result<Vec<ExecutionResult>> {
        let plan = self.resolve(steps)?;

        if policy == FailurePolicy::StopOnFirstFailure {
            let snapshot = session.snapshot().await;
            if let Err(miss) = plan::check(&snapshot, &plan, self.options.reentry) {
                tracing::info!(action = %miss.action, step = miss.step, missing = %miss.missing, "sequence cannot be satisfied");
                return Err(DevflowError::Aborted {
                    completed: Vec::new(),
                    source: Box::new(miss.into()),
                });
            }
        }

        let mut results: Vec<ExecutionResult> = Vec::with_capacity(plan.len());
        for action in &plan {
            if cancel.is_cancelled() {
                tracing::info!(action = %action.name, "cancelled before start");
                break;
            }

            let result = match self.run_one(session, action, cancel).await {
                Ok(result) => result,
                Err(missing) => match policy {
                    FailurePolicy::StopOnFirstFailure => {
                        return Err(DevflowError::Aborted {
                            completed: results,
                            source: Box::new(DevflowError::Precondition {
                                action: action.name.clone(),
                                missing,
                            }),
                        });
                    }
                    FailurePolicy::ContinueCollecting => {
                        ExecutionResult::precondition_failed(action, missing)
                    }
                },
            };

            let stop = result.is_cancelled()
                || (!result.succeeded() && policy == FailurePolicy::StopOnFirstFailure);
            results.push(result);
            if stop {
                break;
            }
        }
        Ok(results)
    }

    /// Run a single step; same semantics as a one-element sequence. A token
    /// cancelled before the action starts yields a cancelled result.
    pub async fn run_action(
        &self,
        session: &Session,
        step: &Step,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult> {
        let resolved = self.registry.resolve_step(step)?;
        let mut results = self
            .run_sequence(
                session,
                std::slice::from_ref(step),
                FailurePolicy::StopOnFirstFailure,
                cancel,
            )
            .await?;
        Ok(results
            .pop()
            .unwrap_or_else(|| ExecutionResult::cancelled(&resolved)))
    }

    /// The check → run → apply region for one action, under the session
    /// lock. `Err` carries the unmet precondition.
    async fn run_one(
        &self,
        session: &Session,
        action: &ResolvedAction,
        cancel: &CancellationToken,
    ) -> std::result::Result<ExecutionResult, crate::types::Flag> {
        let mut state = session.lock().await;
        let descriptor = &action.descriptor;

        if self.options.reentry == Reentry::Idempotent
            && descriptor
                .already_satisfied
                .is_some_and(|f| state.satisfies(f))
        {
            tracing::info!(action = %action.name, "already satisfied; skipping");
            return Ok(ExecutionResult::skipped(action));
        }

        if let Some(missing) = state.missing(&descriptor.requires) {
            tracing::info!(action = %action.name, %missing, "precondition not met");
            return Err(missing);
        }

        let spec = self.command_spec(action);
        let started_at = Utc::now();
        let start = Instant::now();
        let result = match self.runner.run(&spec, cancel).await {
            Ok(output) => {
                if output.success() {
                    for effect in &descriptor.mutates {
                        state.apply(*effect, &action.args);
                    }
                }
                ExecutionResult::from_output(action, started_at, output)
            }
            Err(err) => ExecutionResult::from_error(action, started_at, start.elapsed(), err),
        };

        match &result.failure {
            None => tracing::info!(action = %action.name, duration_ms = result.duration_ms, "action succeeded"),
            Some(failure) => tracing::info!(action = %action.name, %failure, "action failed"),
        }
        Ok(result)
    }

    fn command_spec(&self, action: &ResolvedAction) -> CommandSpec {
        let cwd = match &action.cwd {
            Some(dir) => self.options.root.join(dir),
            None => self.options.root.clone(),
        };
        let timeout = match action.descriptor.timeout_seconds {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => self.options.default_timeout,
        };
        CommandSpec {
            argv: action.argv.clone(),
            cwd: Some(cwd),
            timeout,
            env: Vec::new(),
        }
    }
}
