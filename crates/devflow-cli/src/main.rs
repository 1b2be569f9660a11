mod cmd;
mod exit;
mod output;
mod probe;
mod root;
mod workspace;

use clap::{Parser, Subcommand};
use cmd::{actions::ActionsSubcommand, config::ConfigSubcommand};
use devflow_core::Reentry;
use std::path::PathBuf;
use workspace::Overrides;

#[derive(Parser)]
#[command(
    name = "devflow",
    about = "Run virtualenv and git chores as supervised, state-checked actions",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .devflow/ or .git/)
    #[arg(long, global = true, env = "DEVFLOW_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log at debug level
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    /// Per-action timeout in seconds (0 = none); overrides config
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    /// Virtual environment directory; overrides config
    #[arg(long, global = true, value_name = "DIR")]
    venv: Option<String>,

    /// Behaviour when an action's target state already holds: strict or idempotent
    #[arg(long, global = true, value_name = "MODE")]
    reentry: Option<Reentry>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .devflow/ with a default config and a sample sequence
    Init {
        /// Overwrite an existing config.yaml
        #[arg(long)]
        force: bool,
    },

    /// Run one action
    Run {
        /// Action name (see `devflow actions`)
        action: String,
        /// Arguments as key=value, or bare values filling parameters in order
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Run a sequence file (text or YAML)
    RunSequence {
        file: PathBuf,
        /// Keep going after failures and report every result
        #[arg(long = "continue")]
        keep_going: bool,
        /// Resolve and check preconditions without running anything
        #[arg(long)]
        check: bool,
    },

    /// List or inspect registered actions
    Actions {
        #[command(subcommand)]
        subcommand: Option<ActionsSubcommand>,
    },

    /// Show the session state probed from the project directory
    State,

    /// Check that configured tools are on PATH
    Doctor,

    /// Validate or print the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let overrides = Overrides {
        timeout_seconds: cli.timeout,
        venv: cli.venv,
        reentry: cli.reentry,
    };
    let json = cli.json;

    let result = match cli.command {
        Commands::Init { force } => cmd::init::run(&root, force),
        Commands::Run { action, args } => cmd::run::run(&root, &overrides, &action, &args, json),
        Commands::RunSequence {
            file,
            keep_going,
            check,
        } => cmd::sequence::run(&root, &overrides, &file, keep_going, check, json),
        Commands::Actions { subcommand } => cmd::actions::run(&root, &overrides, subcommand, json),
        Commands::State => cmd::state::run(&root, &overrides, json),
        Commands::Doctor => cmd::doctor::run(&root, &overrides, json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(exit::for_error(&e));
    }
}
