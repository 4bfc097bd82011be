//! Command-line argument parsing with clap.

use clap::{Parser, Subcommand, ValueEnum};

/// Default image for interactive sessions.
pub const DEFAULT_SESSION_IMAGE: &str = "allenai/base:cuda11.2-ubuntu20.04";

/// Beaker CLI - interactive sessions, node admin, executor lifecycle.
#[derive(Parser, Debug, Clone)]
#[command(name = "beaker")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Beaker API address.
    #[arg(long, env = "BEAKER_ADDR")]
    pub address: Option<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Suppress progress output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Print verbose error chains and debug logs.
    #[arg(long)]
    pub debug: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Interactive session commands.
    Session {
        /// Session subcommand to execute.
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Node administration commands.
    Node {
        /// Node subcommand to execute.
        #[command(subcommand)]
        command: NodeCommands,
    },

    /// Executor lifecycle commands.
    Executor {
        /// Executor subcommand to execute.
        #[command(subcommand)]
        command: ExecutorCommands,
    },
}

/// Session subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum SessionCommands {
    /// Create a new interactive session and attach to it.
    Create(CreateArgs),

    /// Attach to a running session.
    Attach {
        /// Session ID to attach to.
        session: String,
    },

    /// Run a command inside a running session.
    Exec {
        /// Session ID to exec into.
        session: String,

        /// Command to run; defaults to an interactive shell.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Show one or more sessions.
    Get {
        /// Session IDs to fetch.
        #[arg(required = true)]
        sessions: Vec<String>,
    },

    /// List sessions.
    List(ListArgs),

    /// Update a session.
    Update {
        /// Session ID to update.
        session: String,

        /// Request cancellation of the session.
        #[arg(long)]
        cancel: bool,
    },
}

/// Arguments for session create.
#[derive(Parser, Debug, Clone)]
pub struct CreateArgs {
    /// Friendly name for the session.
    #[arg(short, long)]
    pub name: Option<String>,

    /// Node to run the session on; defaults to the current host's node.
    #[arg(long)]
    pub node: Option<String>,

    /// Number of GPUs to request.
    #[arg(long, default_value_t = 0)]
    pub gpus: u32,

    /// Container image to run.
    #[arg(long, default_value = DEFAULT_SESSION_IMAGE)]
    pub image: String,

    /// Command to run; defaults to the image's default.
    #[arg(last = true)]
    pub command: Vec<String>,
}

/// Arguments for session list.
#[derive(Parser, Debug, Clone)]
pub struct ListArgs {
    /// List all sessions instead of the default node-scoped view.
    #[arg(long)]
    pub all: bool,

    /// Restrict to a cluster.
    #[arg(long)]
    pub cluster: Option<String>,

    /// Restrict to a node; defaults to the current host's node.
    #[arg(long)]
    pub node: Option<String>,

    /// Restrict by finalization state.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub finalized: Option<bool>,
}

/// Node subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum NodeCommands {
    /// Mark a node ineligible for new scheduling.
    ///
    /// Work already running on the node is unaffected.
    Cordon {
        /// Node ID to cordon.
        node: String,
    },

    /// Make a cordoned node schedulable again.
    Uncordon {
        /// Node ID to uncordon.
        node: String,
    },

    /// Show one or more nodes.
    Inspect {
        /// Node IDs to fetch.
        #[arg(required = true)]
        nodes: Vec<String>,
    },

    /// List executions assigned to a node.
    Executions {
        /// Node ID; defaults to the current host's node.
        node: Option<String>,
    },
}

/// Executor subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ExecutorCommands {
    /// Install and start the executor.
    ///
    /// Requires access to /etc, /var, /usr/bin, and systemd.
    Install {
        /// Cluster the executor registers into.
        cluster: String,

        /// Writeable directory for executor-managed data.
        #[arg(long, default_value = crate::executor::DEFAULT_STORAGE_DIR)]
        storage_dir: String,
    },

    /// Start the executor.
    Start,

    /// Stop the executor and all running jobs.
    ///
    /// To reload executor config without stopping jobs, use restart.
    Stop {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Restart the executor without stopping running jobs.
    Restart,

    /// Upgrade the executor binary to the latest version.
    ///
    /// To update executor configuration, run uninstall then install.
    Upgrade,

    /// Uninstall the executor and delete all executor data.
    Uninstall {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
}
