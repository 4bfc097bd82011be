//! Container runtime capability trait and the in-memory fake.

use std::collections::HashMap;
use std::sync::Mutex;

use futures::future::BoxFuture;

use crate::error::RuntimeError;
use crate::spec::ContainerOpts;

/// Exit outcome of an attached or exec'd process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    /// Process exit code.
    pub code: i64,
}

impl ExitStatus {
    /// Whether the process exited cleanly.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// Identifying information about a container.
#[derive(Debug, Clone, Default)]
pub struct ContainerInfo {
    /// Container identifier.
    pub id: String,

    /// Container name.
    pub name: String,

    /// Container labels.
    pub labels: HashMap<String, String>,

    /// Whether the container is currently running.
    pub running: bool,
}

/// Capability interface over the local container runtime.
///
/// Object-safe: the concrete driver is selected once at startup and used
/// behind `Arc<dyn ContainerRuntime>` everywhere else. `attach` and
/// `exec` block for the lifetime of the remote process and take over the
/// CLI's standard streams.
pub trait ContainerRuntime: Send + Sync {
    /// Pull an image, optionally suppressing progress output.
    fn pull_image<'a>(
        &'a self,
        image: &'a str,
        quiet: bool,
    ) -> BoxFuture<'a, Result<(), RuntimeError>>;

    /// Create a container, returning its identifier.
    fn create<'a>(
        &'a self,
        opts: &'a ContainerOpts,
    ) -> BoxFuture<'a, Result<String, RuntimeError>>;

    /// Start a created container.
    fn start<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), RuntimeError>>;

    /// Attach the process's stdio to a running container until it exits.
    fn attach<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<ExitStatus, RuntimeError>>;

    /// Run a command inside a running container, attached to stdio.
    fn exec<'a>(
        &'a self,
        id: &'a str,
        command: &'a [String],
    ) -> BoxFuture<'a, Result<ExitStatus, RuntimeError>>;

    /// List the identifiers of running containers.
    fn list(&self) -> BoxFuture<'_, Result<Vec<String>, RuntimeError>>;

    /// Fetch identifying information for a container.
    fn info<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<ContainerInfo, RuntimeError>>;
}

/// The lifecycle of a fake container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FakeState {
    Created,
    Running,
}

#[derive(Debug)]
struct FakeContainer {
    opts: ContainerOpts,
    state: FakeState,
}

#[derive(Debug, Default)]
struct FakeInner {
    containers: HashMap<String, FakeContainer>,
    pulled: Vec<String>,
    attached: Vec<String>,
    execed: Vec<(String, Vec<String>)>,
    next_id: u64,
}

/// In-memory runtime for tests.
///
/// Containers are tracked in a map; `attach`/`exec` return a
/// configurable exit code instead of touching real stdio.
#[derive(Debug, Default)]
pub struct FakeRuntime {
    inner: Mutex<FakeInner>,
    exit_code: Mutex<i64>,
}

impl FakeRuntime {
    /// Create an empty fake runtime whose attach/exec exit with code 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the exit code returned by `attach` and `exec`.
    pub fn set_exit_code(&self, code: i64) {
        if let Ok(mut exit) = self.exit_code.lock() {
            *exit = code;
        }
    }

    /// Images pulled so far.
    #[must_use]
    pub fn pulled_images(&self) -> Vec<String> {
        self.inner
            .lock()
            .map(|inner| inner.pulled.clone())
            .unwrap_or_default()
    }

    /// Container IDs attached so far.
    #[must_use]
    pub fn attached_containers(&self) -> Vec<String> {
        self.inner
            .lock()
            .map(|inner| inner.attached.clone())
            .unwrap_or_default()
    }

    /// Commands exec'd so far, as `(container, command)` pairs.
    #[must_use]
    pub fn exec_calls(&self) -> Vec<(String, Vec<String>)> {
        self.inner
            .lock()
            .map(|inner| inner.execed.clone())
            .unwrap_or_default()
    }

    /// The options the named container was created from, if any.
    #[must_use]
    pub fn container_opts(&self, id: &str) -> Option<ContainerOpts> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.containers.get(id).map(|c| c.opts.clone()))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, FakeInner>, RuntimeError> {
        self.inner
            .lock()
            .map_err(|_| RuntimeError::Internal("fake runtime poisoned".into()))
    }
}

impl ContainerRuntime for FakeRuntime {
    fn pull_image<'a>(
        &'a self,
        image: &'a str,
        _quiet: bool,
    ) -> BoxFuture<'a, Result<(), RuntimeError>> {
        Box::pin(async move {
            self.lock()?.pulled.push(image.to_string());
            Ok(())
        })
    }

    fn create<'a>(
        &'a self,
        opts: &'a ContainerOpts,
    ) -> BoxFuture<'a, Result<String, RuntimeError>> {
        Box::pin(async move {
            let mut inner = self.lock()?;
            inner.next_id += 1;
            let id = format!("container-{:08x}", inner.next_id);
            inner.containers.insert(
                id.clone(),
                FakeContainer {
                    opts: opts.clone(),
                    state: FakeState::Created,
                },
            );
            Ok(id)
        })
    }

    fn start<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), RuntimeError>> {
        Box::pin(async move {
            let mut inner = self.lock()?;
            let container = inner
                .containers
                .get_mut(id)
                .ok_or_else(|| RuntimeError::NotFound { id: id.to_string() })?;
            container.state = FakeState::Running;
            Ok(())
        })
    }

    fn attach<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<ExitStatus, RuntimeError>> {
        Box::pin(async move {
            {
                let mut inner = self.lock()?;
                if !inner.containers.contains_key(id) {
                    return Err(RuntimeError::NotFound { id: id.to_string() });
                }
                inner.attached.push(id.to_string());
            }
            let code = self.exit_code.lock().map(|c| *c).unwrap_or(0);
            Ok(ExitStatus { code })
        })
    }

    fn exec<'a>(
        &'a self,
        id: &'a str,
        command: &'a [String],
    ) -> BoxFuture<'a, Result<ExitStatus, RuntimeError>> {
        Box::pin(async move {
            {
                let mut inner = self.lock()?;
                if !inner.containers.contains_key(id) {
                    return Err(RuntimeError::NotFound { id: id.to_string() });
                }
                inner.execed.push((id.to_string(), command.to_vec()));
            }
            let code = self.exit_code.lock().map(|c| *c).unwrap_or(0);
            Ok(ExitStatus { code })
        })
    }

    fn list(&self) -> BoxFuture<'_, Result<Vec<String>, RuntimeError>> {
        Box::pin(async move {
            let inner = self.lock()?;
            Ok(inner
                .containers
                .iter()
                .filter(|(_, c)| c.state == FakeState::Running)
                .map(|(id, _)| id.clone())
                .collect())
        })
    }

    fn info<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<ContainerInfo, RuntimeError>> {
        Box::pin(async move {
            let inner = self.lock()?;
            let container = inner
                .containers
                .get(id)
                .ok_or_else(|| RuntimeError::NotFound { id: id.to_string() })?;
            Ok(ContainerInfo {
                id: id.to_string(),
                name: container.opts.name.clone(),
                labels: container.opts.labels.clone(),
                running: container.state == FakeState::Running,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_runtime_create_and_start() {
        let runtime = FakeRuntime::new();
        let opts = ContainerOpts::new("session-abc", "allenai/base:latest");

        let id = runtime.create(&opts).await.expect("create");
        assert!(id.starts_with("container-"));

        // Not running yet, so not listed.
        assert!(runtime.list().await.expect("list").is_empty());

        runtime.start(&id).await.expect("start");
        assert_eq!(runtime.list().await.expect("list"), vec![id.clone()]);

        let info = runtime.info(&id).await.expect("info");
        assert_eq!(info.name, "session-abc");
        assert!(info.running);
    }

    #[tokio::test]
    async fn fake_runtime_attach_returns_configured_exit_code() {
        let runtime = FakeRuntime::new();
        let id = runtime
            .create(&ContainerOpts::new("session-abc", "img"))
            .await
            .expect("create");
        runtime.start(&id).await.expect("start");

        runtime.set_exit_code(130);
        let status = runtime.attach(&id).await.expect("attach");
        assert_eq!(status.code, 130);
        assert!(!status.is_success());
        assert_eq!(runtime.attached_containers(), vec![id]);
    }

    #[tokio::test]
    async fn fake_runtime_exec_records_command() {
        let runtime = FakeRuntime::new();
        let id = runtime
            .create(&ContainerOpts::new("session-abc", "img"))
            .await
            .expect("create");
        runtime.start(&id).await.expect("start");

        let command = vec!["echo".to_string(), "hi".to_string()];
        let status = runtime.exec(&id, &command).await.expect("exec");
        assert!(status.is_success());
        assert_eq!(runtime.exec_calls(), vec![(id, command)]);
    }

    #[tokio::test]
    async fn fake_runtime_unknown_container_errors() {
        let runtime = FakeRuntime::new();
        assert!(runtime.start("missing").await.is_err());
        assert!(runtime.attach("missing").await.is_err());
        assert!(runtime.info("missing").await.is_err());
    }
}
