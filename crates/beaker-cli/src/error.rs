//! CLI error types.

use thiserror::Error;

/// Errors surfaced by CLI commands.
///
/// All errors bubble to the top-level dispatcher in `main`, the only
/// place user-facing formatting happens.
#[derive(Debug, Error)]
pub enum CliError {
    /// Remote scheduler API failure, propagated verbatim.
    #[error(transparent)]
    Api(#[from] beaker_api::ApiError),

    /// Container runtime failure.
    #[error(transparent)]
    Runtime(#[from] beaker_runtime::RuntimeError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The current node could not be determined.
    #[error("failed to detect node; use --node flag: {0}")]
    NodeDetection(String),

    /// The session has not started, so it has no container yet.
    #[error("session not started")]
    SessionNotStarted,

    /// The session's container already exited.
    #[error("session already ended")]
    SessionEnded,

    /// The session's results are already settled server-side.
    #[error("session already finalized")]
    SessionFinalized,

    /// No container carrying the session label was found.
    #[error("container not found")]
    ContainerNotFound,

    /// The operation was interrupted.
    #[error("operation canceled")]
    Canceled,

    /// Install refused because the executor binary already exists.
    #[error("executor is already installed; run \"upgrade\" to install the latest version or run \"uninstall\" before installing")]
    AlreadyInstalled,

    /// An attached container exited with a non-benign code.
    #[error("exited with code {0}")]
    ContainerExit(i64),

    /// The invoking OS user could not be resolved.
    #[error("failed to resolve current user: {0}")]
    UserIdentity(String),

    /// Executor binary download failure.
    #[error("download failed: {0}")]
    Download(String),

    /// A subprocess exited unsuccessfully.
    #[error("{command} failed: {message}")]
    Subprocess {
        /// The command line that failed.
        command: String,
        /// The failure description.
        message: String,
    },

    /// One or more teardown steps failed.
    #[error("uninstall incomplete: {0}")]
    Teardown(String),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Output serialization error.
    #[error("format error: {0}")]
    Format(String),
}
