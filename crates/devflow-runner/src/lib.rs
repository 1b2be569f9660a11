//! `devflow-runner`: supervised execution of a single external command.
//!
//! Every call launches exactly one OS process from an explicit argument
//! vector (no shell is involved), captures stdout/stderr into bounded
//! buffers, and guarantees the process is terminated and reaped on every
//! exit path.
//!
//! # Architecture
//!
//! ```text
//! CommandSpec
//!     │
//!     ▼
//! ProcessRunner::run   ← spawns argv[0] with argv[1..], stdin closed
//!     │                  stdout/stderr drained by background tasks
//!     ▼
//! select! { exit | timeout | cancel }
//!     │                  timeout/cancel → SIGKILL process group → wait
//!     ▼
//! ProcessOutput | RunnerError
//! ```
//!
//! A non-zero exit status is data, not an error: it is reported in
//! [`ProcessOutput::exit_code`] for the caller to interpret.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use devflow_runner::{CommandSpec, ProcessRunner};
//! use tokio_util::sync::CancellationToken;
//!
//! let spec = CommandSpec::new(["git", "status", "--short"])
//!     .with_timeout(Some(std::time::Duration::from_secs(30)));
//! let out = ProcessRunner::default().run(&spec, &CancellationToken::new()).await?;
//! println!("{}", out.stdout);
//! ```

pub mod buffer;
pub mod error;
pub(crate) mod process;


pub use buffer::BoundedBuffer;
pub use error::RunnerError;
pub use process::{locate, CapturedOutput, CommandSpec, ProcessOutput, ProcessRunner};

/// Default per-stream capture limit (64 KiB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 64 * 1024;

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, RunnerError>;
