use anyhow::Context;
use devflow_core::config::Config;
use devflow_core::{Reentry, Registry, Sequencer, SequencerOptions, Session, SessionState};
use devflow_runner::ProcessRunner;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::probe;

/// Command-line overrides shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub timeout_seconds: Option<u64>,
    pub venv: Option<String>,
    pub reentry: Option<Reentry>,
}

/// A project root with its configuration and overrides applied.
pub struct Workspace {
    pub root: PathBuf,
    pub config: Config,
    pub venv: String,
    pub reentry: Reentry,
    pub timeout: Option<Duration>,
}

impl Workspace {
    pub fn load(root: &Path, overrides: &Overrides) -> anyhow::Result<Self> {
        let mut config = Config::load(root).context("failed to load config")?;
        if let Some(secs) = overrides.timeout_seconds {
            config.timeout_seconds = secs;
        }
        Ok(Self {
            root: root.to_path_buf(),
            venv: overrides.venv.clone().unwrap_or_else(|| config.venv.clone()),
            reentry: overrides.reentry.unwrap_or(config.reentry),
            timeout: config.timeout(),
            config,
        })
    }

    pub fn registry(&self) -> anyhow::Result<Registry> {
        Ok(self
            .config
            .build_registry(Some(&self.venv))
            .context("failed to build action registry")?)
    }

    pub fn sequencer(&self) -> anyhow::Result<Sequencer<ProcessRunner>> {
        Ok(Sequencer::new(
            Arc::new(self.registry()?),
            ProcessRunner::new(self.config.max_output_bytes),
            SequencerOptions {
                root: self.root.clone(),
                default_timeout: self.timeout,
                reentry: self.reentry,
            },
        ))
    }

    /// The session state observed in the project directory right now.
    pub fn probe(&self) -> SessionState {
        let active = std::env::var_os("VIRTUAL_ENV");
        probe::probe(&self.root, &self.venv, active.as_deref())
    }

    pub fn session(&self) -> Session {
        Session::new(self.probe())
    }
}

/// Drive `f` on a fresh runtime. Ctrl-C cancels the token handed to `f`.
/// The interrupt handler is registered before `f` starts.
pub fn block_on<F, Fut, T>(f: F) -> anyhow::Result<T>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = T>,
{
    let rt = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let interrupted = {
        let _guard = rt.enter();
        interrupts().context("failed to install interrupt handler")?
    };
    let cancel = CancellationToken::new();
    Ok(rt.block_on(async {
        let watcher = cancel.clone();
        let ctrl_c = tokio::spawn(async move {
            interrupted.await;
            tracing::warn!("interrupted; cancelling running action");
            watcher.cancel();
        });
        let out = f(cancel.clone()).await;
        ctrl_c.abort();
        out
    }))
}

#[cfg(unix)]
fn interrupts() -> std::io::Result<impl Future<Output = ()> + Send + 'static> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut stream = signal(SignalKind::interrupt())?;
    Ok(async move {
        stream.recv().await;
    })
}

#[cfg(not(unix))]
fn interrupts() -> std::io::Result<impl Future<Output = ()> + Send + 'static> {
    Ok(async {
        let _ = tokio::signal::ctrl_c().await;
    })
}
