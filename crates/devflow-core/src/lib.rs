pub mod builtin;
pub mod config;
pub mod error;
pub mod exec;
pub mod io;
pub mod paths;
pub mod plan;
pub mod registry;
pub mod result;
pub mod sequence_file;
pub mod sequencer;
pub mod session;
pub mod step;
pub mod template;
pub mod types;

pub use error::{DevflowError, Result};
pub use exec::CommandRunner;
pub use registry::{ActionDescriptor, Registry, ResolvedAction};
pub use result::{ActionFailure, ExecutionResult};
pub use sequencer::{Sequencer, SequencerOptions};
pub use session::{Session, SessionState};
pub use step::Step;
pub use types::{Effect, EnvLifecycle, FailurePolicy, Flag, Reentry};
