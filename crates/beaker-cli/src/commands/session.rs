//! Session lifecycle command implementation.
//!
//! Creation ends with the terminal attached to the session container;
//! attach and exec find that container again later via its session
//! label.

use std::io::Write;

use beaker_api::{ListSessionOpts, Session, SessionPatch, SessionSpec, TaskResources};
use beaker_runtime::ContainerRuntime;
use tracing::warn;

use crate::cli::SessionCommands;
use crate::context::AppContext;
use crate::error::CliError;
use crate::launch::{
    check_attach_exit, launch_session, SCHEDULE_POLL_INTERVAL, SESSION_CONTAINER_LABEL,
};
use crate::output::{OutputFormat, SessionList};

/// Command run in a session when exec is given no arguments.
const DEFAULT_EXEC_COMMAND: &str = "/bin/bash";

/// Session command executor.
pub struct SessionCommand<'a> {
    ctx: &'a AppContext,
}

impl<'a> SessionCommand<'a> {
    /// Create a new session command.
    #[must_use]
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    /// Execute a session subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        command: &SessionCommands,
    ) -> Result<(), CliError> {
        match command {
            SessionCommands::Create(args) => {
                let node = match &args.node {
                    Some(node) => node.clone(),
                    None => self.ctx.current_node()?,
                };

                let spec = SessionSpec {
                    name: args.name.clone(),
                    node,
                    resources: TaskResources { gpu_count: args.gpus },
                };
                let session = self.ctx.api.create_session(&spec).await?;

                let command = if args.command.is_empty() {
                    None
                } else {
                    Some(args.command.clone())
                };

                let runtime = self.ctx.runtime()?;
                let launched = launch_session(
                    &self.ctx.api,
                    &runtime,
                    &session.id,
                    &args.image,
                    command,
                    SCHEDULE_POLL_INTERVAL,
                    &self.ctx.cancel,
                    self.ctx.quiet,
                )
                .await;

                if let Err(err) = launched {
                    // Cancel the session so the executor reclaims its
                    // resources right away. An interrupt during the
                    // scheduling wait is not a launch failure and must
                    // not mutate remote state.
                    if !matches!(err, CliError::Canceled) {
                        if let Err(patch_err) = self
                            .ctx
                            .api
                            .patch_session(&session.id, &SessionPatch::cancel_now())
                            .await
                        {
                            warn!(session = %session.id, error = %patch_err,
                                "failed to cancel session after launch failure");
                        }
                    }
                    return Err(err);
                }
                Ok(())
            }
            SessionCommands::Attach { session } => {
                let info = self.ctx.api.get_session(session).await?;
                check_session_attachable(&info)?;

                let runtime = self.ctx.runtime()?;
                let container = find_session_container(runtime.as_ref(), &info.id).await?;
                let status = runtime.attach(&container).await?;
                check_attach_exit(status.code)
            }
            SessionCommands::Exec { session, command } => {
                let info = self.ctx.api.get_session(session).await?;
                check_session_attachable(&info)?;

                let command = if command.is_empty() {
                    vec![DEFAULT_EXEC_COMMAND.to_string()]
                } else {
                    command.clone()
                };

                let runtime = self.ctx.runtime()?;
                let container = find_session_container(runtime.as_ref(), &info.id).await?;
                let status = runtime.exec(&container, &command).await?;
                check_attach_exit(status.code)
            }
            SessionCommands::Get { sessions } => {
                let mut fetched = Vec::with_capacity(sessions.len());
                for id in sessions {
                    fetched.push(self.ctx.api.get_session(id).await?);
                }
                format.write(writer, &SessionList { sessions: fetched })
            }
            SessionCommands::List(args) => {
                let mut opts = ListSessionOpts::default();
                if !args.all {
                    opts.finalized = Some(args.finalized.unwrap_or(false));
                    opts.cluster = args.cluster.clone();
                    opts.node = match (&args.node, &args.cluster) {
                        (Some(node), _) => Some(node.clone()),
                        (None, Some(_)) => None,
                        (None, None) => Some(self.ctx.current_node()?),
                    };
                }

                let sessions = self.ctx.api.list_sessions(&opts).await?;
                format.write(writer, &SessionList { sessions })
            }
            SessionCommands::Update { session, cancel } => {
                let patch = if *cancel {
                    SessionPatch::cancel_now()
                } else {
                    SessionPatch::default()
                };
                let updated = self.ctx.api.patch_session(session, &patch).await?;
                format.write(
                    writer,
                    &SessionList {
                        sessions: vec![updated],
                    },
                )
            }
        }
    }
}

/// Check that a session currently has an attachable container.
///
/// Each rejected state is a distinct error so the operator knows
/// whether to wait, give up, or look elsewhere.
///
/// # Errors
///
/// Returns [`CliError::SessionNotStarted`], [`CliError::SessionEnded`],
/// or [`CliError::SessionFinalized`].
pub fn check_session_attachable(session: &Session) -> Result<(), CliError> {
    if session.state.started.is_none() {
        return Err(CliError::SessionNotStarted);
    }
    if session.state.ended.is_some() {
        return Err(CliError::SessionEnded);
    }
    if session.state.finalized.is_some() {
        return Err(CliError::SessionFinalized);
    }
    Ok(())
}

/// Find the running container labeled with the given session ID.
///
/// Containers are not addressable by session ID directly; the label
/// written at launch is the only link.
///
/// # Errors
///
/// Returns [`CliError::ContainerNotFound`] if no running container
/// carries the label.
pub async fn find_session_container(
    runtime: &dyn ContainerRuntime,
    session_id: &str,
) -> Result<String, CliError> {
    for id in runtime.list().await? {
        let info = runtime.info(&id).await?;
        if info.labels.get(SESSION_CONTAINER_LABEL).map(String::as_str) == Some(session_id) {
            return Ok(id);
        }
    }
    Err(CliError::ContainerNotFound)
}
