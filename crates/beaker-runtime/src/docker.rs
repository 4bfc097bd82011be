//! Docker driver implemented with bollard.

use std::collections::HashMap;

use bollard::container::{
    AttachContainerOptions, Config, CreateContainerOptions, InspectContainerOptions,
    ListContainersOptions, LogOutput, WaitContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::image::CreateImageOptions;
use bollard::models::{DeviceRequest, HostConfig, Mount as DockerMount, MountTypeEnum};
use bollard::Docker;
use futures::future::BoxFuture;
use futures::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::error::RuntimeError;
use crate::runtime::{ContainerInfo, ContainerRuntime, ExitStatus};
use crate::spec::ContainerOpts;

/// Docker-backed container runtime.
pub struct DockerRuntime {
    client: Docker,
}

impl DockerRuntime {
    /// Connect to the Docker daemon using the default socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon is unreachable.
    pub fn connect() -> Result<Self, RuntimeError> {
        let client = Docker::connect_with_local_defaults()
            .map_err(|e| RuntimeError::Connection(e.to_string()))?;
        Ok(Self { client })
    }

    fn build_host_config(opts: &ContainerOpts) -> HostConfig {
        let mut host_config = HostConfig::default();

        if opts.memory > 0 {
            host_config.memory = Some(opts.memory);
        }
        if opts.cpu_count > 0.0 {
            host_config.nano_cpus = Some((opts.cpu_count * 1_000_000_000.0) as i64);
        }

        if !opts.mounts.is_empty() {
            host_config.mounts = Some(
                opts.mounts
                    .iter()
                    .map(|m| DockerMount {
                        source: Some(m.host_path.clone()),
                        target: Some(m.container_path.clone()),
                        typ: Some(MountTypeEnum::BIND),
                        read_only: Some(m.read_only),
                        ..Default::default()
                    })
                    .collect(),
            );
        }

        if !opts.gpus.is_empty() {
            host_config.device_requests = Some(vec![DeviceRequest {
                driver: Some("nvidia".to_string()),
                device_ids: Some(opts.gpus.clone()),
                capabilities: Some(vec![vec!["gpu".to_string()]]),
                ..Default::default()
            }]);
        }

        host_config
    }

    /// Forward an attached output stream to the process's stdio until it
    /// closes, keeping a writer task feeding stdin.
    async fn forward_stdio(
        mut output: impl futures::Stream<Item = Result<LogOutput, bollard::errors::Error>>
            + Unpin,
        mut input: std::pin::Pin<Box<dyn AsyncWrite + Send>>,
    ) -> Result<(), RuntimeError> {
        let stdin_task = tokio::spawn(async move {
            let mut stdin = tokio::io::stdin();
            let _ = tokio::io::copy(&mut stdin, &mut input).await;
        });

        let mut stdout = tokio::io::stdout();
        let mut stderr = tokio::io::stderr();
        while let Some(chunk) = output.next().await {
            let chunk = chunk.map_err(|e| RuntimeError::AttachFailed(e.to_string()))?;
            match chunk {
                LogOutput::StdErr { message } => {
                    stderr
                        .write_all(&message)
                        .await
                        .map_err(|e| RuntimeError::AttachFailed(e.to_string()))?;
                    stderr
                        .flush()
                        .await
                        .map_err(|e| RuntimeError::AttachFailed(e.to_string()))?;
                }
                LogOutput::StdOut { message } | LogOutput::Console { message } => {
                    stdout
                        .write_all(&message)
                        .await
                        .map_err(|e| RuntimeError::AttachFailed(e.to_string()))?;
                    stdout
                        .flush()
                        .await
                        .map_err(|e| RuntimeError::AttachFailed(e.to_string()))?;
                }
                LogOutput::StdIn { .. } => {}
            }
        }

        // The remote process is gone; stop feeding stdin.
        stdin_task.abort();
        Ok(())
    }
}

impl ContainerRuntime for DockerRuntime {
    fn pull_image<'a>(
        &'a self,
        image: &'a str,
        quiet: bool,
    ) -> BoxFuture<'a, Result<(), RuntimeError>> {
        Box::pin(async move {
            debug!(image = %image, "pulling image");

            let options = CreateImageOptions {
                from_image: image.to_string(),
                ..Default::default()
            };

            let mut stream = self.client.create_image(Some(options), None, None);
            while let Some(progress) = stream.next().await {
                let progress = progress.map_err(|e| match e {
                    bollard::errors::Error::DockerResponseServerError {
                        status_code: 404,
                        ..
                    } => RuntimeError::ImageNotFound {
                        image: image.to_string(),
                    },
                    _ => RuntimeError::PullFailed {
                        image: image.to_string(),
                        reason: e.to_string(),
                    },
                })?;

                if !quiet {
                    if let Some(status) = progress.status {
                        debug!(image = %image, status = %status, "pull progress");
                    }
                }
            }

            info!(image = %image, "image pulled");
            Ok(())
        })
    }

    fn create<'a>(
        &'a self,
        opts: &'a ContainerOpts,
    ) -> BoxFuture<'a, Result<String, RuntimeError>> {
        Box::pin(async move {
            debug!(name = %opts.name, image = %opts.image, "creating container");

            let env: Vec<String> = opts
                .env
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();

            let labels: HashMap<String, String> = opts.labels.clone();

            let config = Config {
                image: Some(opts.image.clone()),
                cmd: opts.command.clone(),
                env: Some(env),
                labels: Some(labels),
                user: if opts.user.is_empty() {
                    None
                } else {
                    Some(opts.user.clone())
                },
                working_dir: if opts.working_dir.is_empty() {
                    None
                } else {
                    Some(opts.working_dir.clone())
                },
                tty: Some(opts.interactive),
                open_stdin: Some(opts.interactive),
                attach_stdin: Some(opts.interactive),
                attach_stdout: Some(true),
                attach_stderr: Some(true),
                host_config: Some(Self::build_host_config(opts)),
                ..Default::default()
            };

            let options = CreateContainerOptions {
                name: opts.name.clone(),
                platform: None,
            };

            let response = self
                .client
                .create_container(Some(options), config)
                .await
                .map_err(|e| match e {
                    bollard::errors::Error::DockerResponseServerError {
                        status_code: 404,
                        ..
                    } => RuntimeError::ImageNotFound {
                        image: opts.image.clone(),
                    },
                    _ => RuntimeError::CreateFailed(e.to_string()),
                })?;

            info!(id = %response.id, name = %opts.name, "container created");
            Ok(response.id)
        })
    }

    fn start<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), RuntimeError>> {
        Box::pin(async move {
            self.client
                .start_container::<String>(id, None)
                .await
                .map_err(|e| match e {
                    bollard::errors::Error::DockerResponseServerError {
                        status_code: 404,
                        ..
                    } => RuntimeError::NotFound { id: id.to_string() },
                    _ => RuntimeError::StartFailed {
                        id: id.to_string(),
                        reason: e.to_string(),
                    },
                })?;

            info!(id = %id, "container started");
            Ok(())
        })
    }

    fn attach<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<ExitStatus, RuntimeError>> {
        Box::pin(async move {
            debug!(id = %id, "attaching to container");

            let options = AttachContainerOptions::<String> {
                stdin: Some(true),
                stdout: Some(true),
                stderr: Some(true),
                stream: Some(true),
                logs: Some(true),
                ..Default::default()
            };

            let results = self
                .client
                .attach_container(id, Some(options))
                .await
                .map_err(|e| RuntimeError::AttachFailed(e.to_string()))?;

            Self::forward_stdio(results.output, results.input).await?;

            // The attach stream closing means the container exited; fetch
            // the exit code from the wait endpoint.
            let mut wait = self
                .client
                .wait_container(id, None::<WaitContainerOptions<String>>);
            let code = match wait.next().await {
                Some(Ok(response)) => response.status_code,
                Some(Err(bollard::errors::Error::DockerContainerWaitError {
                    code, ..
                })) => code,
                Some(Err(e)) => return Err(RuntimeError::AttachFailed(e.to_string())),
                None => 0,
            };

            debug!(id = %id, code, "container exited");
            Ok(ExitStatus { code })
        })
    }

    fn exec<'a>(
        &'a self,
        id: &'a str,
        command: &'a [String],
    ) -> BoxFuture<'a, Result<ExitStatus, RuntimeError>> {
        Box::pin(async move {
            debug!(id = %id, ?command, "executing command in container");

            let exec = self
                .client
                .create_exec(
                    id,
                    CreateExecOptions {
                        cmd: Some(command.to_vec()),
                        attach_stdin: Some(true),
                        attach_stdout: Some(true),
                        attach_stderr: Some(true),
                        tty: Some(true),
                        ..Default::default()
                    },
                )
                .await
                .map_err(|e| RuntimeError::AttachFailed(e.to_string()))?;

            match self
                .client
                .start_exec(&exec.id, None)
                .await
                .map_err(|e| RuntimeError::AttachFailed(e.to_string()))?
            {
                StartExecResults::Attached { output, input } => {
                    Self::forward_stdio(output, input).await?;
                }
                StartExecResults::Detached => {
                    warn!(id = %id, "exec unexpectedly detached");
                }
            }

            let inspect = self
                .client
                .inspect_exec(&exec.id)
                .await
                .map_err(|e| RuntimeError::AttachFailed(e.to_string()))?;

            Ok(ExitStatus {
                code: inspect.exit_code.unwrap_or(0),
            })
        })
    }

    fn list(&self) -> BoxFuture<'_, Result<Vec<String>, RuntimeError>> {
        Box::pin(async move {
            let options = ListContainersOptions::<String> {
                all: false,
                ..Default::default()
            };

            let summaries = self
                .client
                .list_containers(Some(options))
                .await
                .map_err(|e| RuntimeError::Internal(e.to_string()))?;

            Ok(summaries.into_iter().filter_map(|s| s.id).collect())
        })
    }

    fn info<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<ContainerInfo, RuntimeError>> {
        Box::pin(async move {
            let inspect = self
                .client
                .inspect_container(id, None::<InspectContainerOptions>)
                .await
                .map_err(|e| match e {
                    bollard::errors::Error::DockerResponseServerError {
                        status_code: 404,
                        ..
                    } => RuntimeError::NotFound { id: id.to_string() },
                    _ => RuntimeError::Internal(e.to_string()),
                })?;

            Ok(ContainerInfo {
                id: inspect.id.unwrap_or_else(|| id.to_string()),
                name: inspect
                    .name
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_default(),
                labels: inspect
                    .config
                    .as_ref()
                    .and_then(|c| c.labels.clone())
                    .unwrap_or_default(),
                running: inspect
                    .state
                    .as_ref()
                    .and_then(|s| s.running)
                    .unwrap_or(false),
            })
        })
    }
}
