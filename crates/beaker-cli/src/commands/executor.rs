//! Executor lifecycle command implementation.
//!
//! Thin orchestration over [`crate::executor`]: each subcommand is one
//! state-machine transition, with confirmation gates in front of the
//! destructive ones.

use std::io::Write;
use std::path::Path;

use tracing::warn;

use crate::cli::ExecutorCommands;
use crate::commands::confirm;
use crate::context::AppContext;
use crate::error::CliError;
use crate::executor::{
    best_effort_stop, download_executor, ensure_not_installed, remove_install_files, run_cleanup,
    start_service, stop_service, teardown_result, write_install_files, ExecutorConfig,
    ExecutorPaths, InitSystem, ReleaseEndpoints, Systemd,
};
use crate::output::{Message, OutputFormat};

const STOP_PROMPT: &str = "Stopping the executor will kill all running tasks.\n\
    Are you sure you want to stop the executor?";

/// Executor command executor.
pub struct ExecutorCommand<'a> {
    ctx: &'a AppContext,
    paths: ExecutorPaths,
    endpoints: ReleaseEndpoints,
    init: Box<dyn InitSystem>,
    http: reqwest::Client,
}

impl<'a> ExecutorCommand<'a> {
    /// Create an executor command against the real system layout.
    #[must_use]
    pub fn new(ctx: &'a AppContext) -> Self {
        Self::with_parts(
            ctx,
            ExecutorPaths::default(),
            ReleaseEndpoints::default(),
            Box::new(Systemd::default()),
        )
    }

    /// Create an executor command with explicit collaborators.
    #[must_use]
    pub fn with_parts(
        ctx: &'a AppContext,
        paths: ExecutorPaths,
        endpoints: ReleaseEndpoints,
        init: Box<dyn InitSystem>,
    ) -> Self {
        Self {
            ctx,
            paths,
            endpoints,
            init,
            http: reqwest::Client::new(),
        }
    }

    /// Execute an executor subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        command: &ExecutorCommands,
    ) -> Result<(), CliError> {
        match command {
            ExecutorCommands::Install {
                cluster,
                storage_dir,
            } => {
                self.install(cluster, Path::new(storage_dir)).await?;
                format.write(writer, &Message::success("Executor installed and started"))
            }
            ExecutorCommands::Start => {
                start_service(self.init.as_ref()).await?;
                format.write(writer, &Message::success("Executor started"))
            }
            ExecutorCommands::Stop { yes } => {
                let confirmed = *yes || confirm(STOP_PROMPT)?;
                self.stop(writer, format, confirmed).await
            }
            ExecutorCommands::Restart => {
                stop_service(self.init.as_ref()).await?;
                start_service(self.init.as_ref()).await?;
                format.write(writer, &Message::success("Executor restarted"))
            }
            ExecutorCommands::Upgrade => {
                stop_service(self.init.as_ref()).await?;
                download_executor(&self.http, &self.endpoints, &self.paths.binary).await?;
                start_service(self.init.as_ref()).await?;
                format.write(writer, &Message::success("Executor upgraded"))
            }
            ExecutorCommands::Uninstall { yes } => {
                let config = ExecutorConfig::load(&self.paths.config)?;
                let prompt = format!(
                    "Uninstalling the executor will kill all running tasks\n\
                     and delete all data in {:?}.\n\n\
                     Are you sure you want to uninstall the executor?",
                    config.storage_path
                );
                let confirmed = *yes || confirm(&prompt)?;
                self.uninstall(writer, format, &config, confirmed).await
            }
        }
    }

    /// Install, configure, and start the executor.
    ///
    /// Fails fast if a binary is already installed, and validates the
    /// cluster against the scheduler before touching local state.
    ///
    /// # Errors
    ///
    /// Returns the first failing install step.
    pub async fn install(&self, cluster: &str, storage_dir: &Path) -> Result<(), CliError> {
        ensure_not_installed(&self.paths)?;

        // Fail closed on an invalid cluster before writing anything.
        self.ctx.api.get_cluster(cluster).await?;

        write_install_files(
            &self.paths,
            &self.ctx.config.user_token,
            cluster,
            storage_dir,
        )?;
        download_executor(&self.http, &self.endpoints, &self.paths.binary).await?;
        start_service(self.init.as_ref()).await
    }

    /// Stop the executor if confirmed; a decline is a successful no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot be stopped.
    pub async fn stop<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        confirmed: bool,
    ) -> Result<(), CliError> {
        if !confirmed {
            return Ok(());
        }

        stop_service(self.init.as_ref()).await?;

        // The stop itself already succeeded; a cleanup failure is
        // reported without failing the command.
        if let Err(e) = run_cleanup(&self.paths).await {
            warn!(error = %e, "executor cleanup failed");
            eprintln!("error cleaning up executor: {e}");
        }

        format.write(writer, &Message::success("Executor stopped"))
    }

    /// Tear down the executor if confirmed; a decline is a successful
    /// no-op.
    ///
    /// Stop and cleanup failures never block teardown; each filesystem
    /// removal proceeds independently and tolerates "already absent".
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Teardown`] if any removal actually failed.
    pub async fn uninstall<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        config: &ExecutorConfig,
        confirmed: bool,
    ) -> Result<(), CliError> {
        if !confirmed {
            return Ok(());
        }

        best_effort_stop(self.init.as_ref(), &self.paths).await;

        let reports = remove_install_files(&self.paths, &config.storage_path);
        teardown_result(&reports)?;

        format.write(writer, &Message::success("Executor uninstalled"))
    }
}
