//! Per-invocation application context.
//!
//! Built once at startup and passed by reference into every command
//! handler: the API client, the resolved configuration, the process-wide
//! cancellation token (fired on Ctrl-C), and the lazily-selected
//! container runtime driver.

use std::sync::{Arc, Mutex};

use beaker_api::ApiClient;
use beaker_runtime::{ContainerRuntime, DockerRuntime};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::CliError;

/// Everything a command handler needs.
pub struct AppContext {
    /// Scheduler API client.
    pub api: ApiClient,

    /// Resolved CLI configuration.
    pub config: Config,

    /// Canceled when the process is interrupted.
    pub cancel: CancellationToken,

    /// Suppress progress output.
    pub quiet: bool,

    // The runtime driver is selected on first use so commands that never
    // touch containers work without a runtime daemon present.
    runtime: Mutex<Option<Arc<dyn ContainerRuntime>>>,
}

impl AppContext {
    /// Build the context from a resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the API address is invalid.
    pub fn new(config: Config, quiet: bool) -> Result<Self, CliError> {
        let api = ApiClient::new(&config.address, config.user_token.clone())?;
        Ok(Self {
            api,
            config,
            cancel: CancellationToken::new(),
            quiet,
            runtime: Mutex::new(None),
        })
    }

    /// The container runtime driver, connecting on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime daemon is unreachable.
    pub fn runtime(&self) -> Result<Arc<dyn ContainerRuntime>, CliError> {
        let mut slot = self
            .runtime
            .lock()
            .map_err(|_| CliError::Config("runtime slot poisoned".into()))?;

        if let Some(runtime) = slot.as_ref() {
            return Ok(Arc::clone(runtime));
        }

        let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerRuntime::connect()?);
        *slot = Some(Arc::clone(&runtime));
        Ok(runtime)
    }

    /// Identity of the node this host is registered as.
    ///
    /// Read from the node file the executor maintains; hosts without a
    /// running executor have no node identity.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::NodeDetection`] if the file is missing or
    /// empty.
    pub fn current_node(&self) -> Result<String, CliError> {
        let path = &self.config.node_file;
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::NodeDetection(format!("failed to read '{}': {e}", path.display()))
        })?;

        let node = content.trim();
        if node.is_empty() {
            return Err(CliError::NodeDetection(format!(
                "node file '{}' is empty",
                path.display()
            )));
        }
        Ok(node.to_string())
    }
}
