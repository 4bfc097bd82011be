//! Executor lifecycle management.
//!
//! The executor is the long-running node-local agent that runs scheduled
//! work. This CLI installs, upgrades, and removes it but never executes
//! work itself. The lifecycle is a small state machine over the local
//! filesystem plus systemd: absent, installed-stopped, running.

use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CliError;

/// Responds to GET with the latest executor version as plain text.
pub const VERSION_URL: &str = "https://storage.googleapis.com/ai2-beaker-public/bin/latest";

/// Per-version binary URL; the version segment is substituted in.
pub const BINARY_URL_BASE: &str = "https://storage.googleapis.com/ai2-beaker-public/bin";

/// Name of the executor's systemd service.
pub const EXECUTOR_SERVICE: &str = "beaker-executor";

/// Default directory for executor-managed data.
pub const DEFAULT_STORAGE_DIR: &str = "/var/beaker";

/// Filesystem layout of an executor installation.
///
/// Fixed in production; `rooted` relocates everything under a prefix so
/// tests never touch the real system paths.
#[derive(Debug, Clone)]
pub struct ExecutorPaths {
    /// Executor binary.
    pub binary: PathBuf,

    /// Configuration directory.
    pub config_dir: PathBuf,

    /// Executor configuration file.
    pub config: PathBuf,

    /// Auth token file, mode 0600.
    pub token: PathBuf,

    /// Systemd unit file.
    pub unit: PathBuf,
}

impl Default for ExecutorPaths {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("/usr/bin/beaker-executor"),
            config_dir: PathBuf::from("/etc/beaker"),
            config: PathBuf::from("/etc/beaker/config.yml"),
            token: PathBuf::from("/etc/beaker/executor-token"),
            unit: PathBuf::from(format!("/etc/systemd/system/{EXECUTOR_SERVICE}.service")),
        }
    }
}

impl ExecutorPaths {
    /// The production layout relocated under `root`.
    #[must_use]
    pub fn rooted(root: &Path) -> Self {
        Self {
            binary: root.join("usr/bin/beaker-executor"),
            config_dir: root.join("etc/beaker"),
            config: root.join("etc/beaker/config.yml"),
            token: root.join("etc/beaker/executor-token"),
            unit: root.join(format!("etc/systemd/system/{EXECUTOR_SERVICE}.service")),
        }
    }
}

/// Executor configuration, written at install time and read back for
/// uninstall (the storage path lives only here).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Directory for executor-managed data.
    #[serde(rename = "storagePath")]
    pub storage_path: PathBuf,

    /// Scheduler-facing settings.
    pub beaker: BeakerSection,
}

/// The `beaker:` section of the executor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeakerSection {
    /// Path of the auth token file.
    #[serde(rename = "tokenPath")]
    pub token_path: PathBuf,

    /// Cluster the executor registers into.
    pub cluster: String,
}

impl ExecutorConfig {
    /// Build the configuration written at install time.
    #[must_use]
    pub fn new(storage_path: PathBuf, token_path: PathBuf, cluster: impl Into<String>) -> Self {
        Self {
            storage_path,
            beaker: BeakerSection {
                token_path,
                cluster: cluster.into(),
            },
        }
    }

    /// Read the configuration back from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or not valid YAML.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!(
                "failed to read executor config '{}': {e}",
                path.display()
            ))
        })?;
        serde_yaml::from_str(&content).map_err(|e| {
            CliError::Config(format!(
                "invalid executor config '{}': {e}",
                path.display()
            ))
        })
    }
}

/// Where executor binaries are published.
#[derive(Debug, Clone)]
pub struct ReleaseEndpoints {
    /// URL serving the latest version string.
    pub version_url: String,

    /// Base URL for versioned binaries.
    pub binary_base: String,
}

impl Default for ReleaseEndpoints {
    fn default() -> Self {
        Self {
            version_url: VERSION_URL.to_string(),
            binary_base: BINARY_URL_BASE.to_string(),
        }
    }
}

impl ReleaseEndpoints {
    /// Download URL for a specific version.
    #[must_use]
    pub fn binary_url(&self, version: &str) -> String {
        format!("{}/{version}/executor", self.binary_base)
    }
}

/// Init-system operations the lifecycle manager needs.
///
/// Object-safe so tests can substitute a recording fake for systemd.
pub trait InitSystem: Send + Sync {
    /// Reload unit definitions.
    fn daemon_reload(&self) -> BoxFuture<'_, Result<(), CliError>>;

    /// Enable the executor service at boot.
    fn enable(&self) -> BoxFuture<'_, Result<(), CliError>>;

    /// Start the executor service.
    fn start(&self) -> BoxFuture<'_, Result<(), CliError>>;

    /// Disable the executor service at boot.
    fn disable(&self) -> BoxFuture<'_, Result<(), CliError>>;

    /// Stop the executor service.
    fn stop(&self) -> BoxFuture<'_, Result<(), CliError>>;
}

/// Systemd-backed init system, driven through `systemctl`.
#[derive(Debug, Clone)]
pub struct Systemd {
    service: String,
}

impl Systemd {
    /// Control the named service.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    async fn systemctl(&self, args: &[&str]) -> Result<(), CliError> {
        run_host_command("systemctl", args, &HashMap::new()).await
    }
}

impl Default for Systemd {
    fn default() -> Self {
        Self::new(EXECUTOR_SERVICE)
    }
}

impl InitSystem for Systemd {
    fn daemon_reload(&self) -> BoxFuture<'_, Result<(), CliError>> {
        Box::pin(async move { self.systemctl(&["daemon-reload"]).await })
    }

    fn enable(&self) -> BoxFuture<'_, Result<(), CliError>> {
        Box::pin(async move { self.systemctl(&["enable", self.service.as_str()]).await })
    }

    fn start(&self) -> BoxFuture<'_, Result<(), CliError>> {
        Box::pin(async move { self.systemctl(&["start", self.service.as_str()]).await })
    }

    fn disable(&self) -> BoxFuture<'_, Result<(), CliError>> {
        Box::pin(async move { self.systemctl(&["disable", self.service.as_str()]).await })
    }

    fn stop(&self) -> BoxFuture<'_, Result<(), CliError>> {
        Box::pin(async move { self.systemctl(&["stop", self.service.as_str()]).await })
    }
}

/// Run a host command, surfacing its combined output on failure.
async fn run_host_command(
    program: &str,
    args: &[&str],
    env: &HashMap<String, String>,
) -> Result<(), CliError> {
    let rendered = std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");
    debug!(command = %rendered, "running host command");

    let output = tokio::process::Command::new(program)
        .args(args)
        .envs(env)
        .output()
        .await
        .map_err(|e| CliError::Subprocess {
            command: rendered.clone(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        if !combined.is_empty() {
            println!("Output from \"{rendered}\":\n{combined}");
        }
        return Err(CliError::Subprocess {
            command: rendered,
            message: format!("exited with {}", output.status),
        });
    }
    Ok(())
}

/// Recording init system for tests.
#[derive(Debug, Default)]
pub struct FakeInit {
    calls: Mutex<Vec<String>>,
    fail_on: Mutex<Option<String>>,
}

impl FakeInit {
    /// Create a fake whose operations all succeed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the named operation fail.
    pub fn fail_on(&self, op: &str) {
        if let Ok(mut fail) = self.fail_on.lock() {
            *fail = Some(op.to_string());
        }
    }

    /// Operations invoked so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, op: &str) -> Result<(), CliError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(op.to_string());
        }
        let failing = self
            .fail_on
            .lock()
            .map(|fail| fail.as_deref() == Some(op))
            .unwrap_or(false);
        if failing {
            return Err(CliError::Subprocess {
                command: format!("systemctl {op}"),
                message: "injected failure".into(),
            });
        }
        Ok(())
    }
}

impl InitSystem for FakeInit {
    fn daemon_reload(&self) -> BoxFuture<'_, Result<(), CliError>> {
        Box::pin(async move { self.record("daemon-reload") })
    }

    fn enable(&self) -> BoxFuture<'_, Result<(), CliError>> {
        Box::pin(async move { self.record("enable") })
    }

    fn start(&self) -> BoxFuture<'_, Result<(), CliError>> {
        Box::pin(async move { self.record("start") })
    }

    fn disable(&self) -> BoxFuture<'_, Result<(), CliError>> {
        Box::pin(async move { self.record("disable") })
    }

    fn stop(&self) -> BoxFuture<'_, Result<(), CliError>> {
        Box::pin(async move { self.record("stop") })
    }
}

/// Register and start the executor service.
///
/// # Errors
///
/// Returns the first failing init-system operation.
pub async fn start_service(init: &dyn InitSystem) -> Result<(), CliError> {
    init.daemon_reload().await?;
    init.enable().await?;
    init.start().await
}

/// Deregister and stop the executor service.
///
/// # Errors
///
/// Returns the first failing init-system operation.
pub async fn stop_service(init: &dyn InitSystem) -> Result<(), CliError> {
    init.disable().await?;
    init.stop().await
}

/// Run the executor's own `cleanup` subcommand, which removes any
/// containers it left behind.
///
/// # Errors
///
/// Returns an error if the executor binary fails or is missing.
pub async fn run_cleanup(paths: &ExecutorPaths) -> Result<(), CliError> {
    let binary = paths.binary.to_string_lossy().into_owned();
    let mut env = HashMap::new();
    env.insert(
        "CONFIG_PATH".to_string(),
        paths.config.to_string_lossy().into_owned(),
    );
    run_host_command(&binary, &["cleanup"], &env).await
}

/// Fail if an executor binary is already present.
///
/// Install never overwrites: the operator must uninstall or upgrade.
///
/// # Errors
///
/// Returns [`CliError::AlreadyInstalled`] if the binary path exists.
pub fn ensure_not_installed(paths: &ExecutorPaths) -> Result<(), CliError> {
    if paths.binary.exists() {
        return Err(CliError::AlreadyInstalled);
    }
    Ok(())
}

/// Write the install-time files: config directory, token (mode 0600),
/// executor config, and the systemd unit.
///
/// # Errors
///
/// Returns an error on the first file that cannot be written.
pub fn write_install_files(
    paths: &ExecutorPaths,
    token: &str,
    cluster: &str,
    storage_dir: &Path,
) -> Result<(), CliError> {
    std::fs::create_dir_all(&paths.config_dir)?;
    if let Some(unit_dir) = paths.unit.parent() {
        std::fs::create_dir_all(unit_dir)?;
    }

    std::fs::write(&paths.token, token)?;
    std::fs::set_permissions(&paths.token, std::fs::Permissions::from_mode(0o600))?;

    let config = ExecutorConfig::new(storage_dir.to_path_buf(), paths.token.clone(), cluster);
    let yaml = serde_yaml::to_string(&config)
        .map_err(|e| CliError::Config(format!("failed to render executor config: {e}")))?;
    std::fs::write(&paths.config, yaml)?;

    std::fs::write(&paths.unit, render_unit(paths))?;
    Ok(())
}

/// Render the executor's systemd unit.
#[must_use]
pub fn render_unit(paths: &ExecutorPaths) -> String {
    format!(
        "[Unit]\n\
         Description=Beaker executor\n\
         After=network.target\n\
         StartLimitIntervalSec=0\n\
         \n\
         [Service]\n\
         Type=simple\n\
         Restart=always\n\
         RestartSec=1\n\
         ExecStart={binary}\n\
         Environment=CONFIG_PATH={config}\n\
         \n\
         [Install]\n\
         WantedBy=multi-user.target\n",
        binary = paths.binary.display(),
        config = paths.config.display()
    )
}

/// Download the latest executor binary to its install path.
///
/// The version string comes from the latest-version URL; the binary
/// streams into a temporary file beside the target and is renamed into
/// place, so an interrupted download never leaves a partial binary.
///
/// # Errors
///
/// Returns an error if either fetch fails or the file cannot be
/// persisted.
pub async fn download_executor(
    http: &reqwest::Client,
    endpoints: &ReleaseEndpoints,
    binary: &Path,
) -> Result<(), CliError> {
    use futures::StreamExt;

    let version = http
        .get(&endpoints.version_url)
        .send()
        .await
        .map_err(|e| CliError::Download(format!("failed to fetch latest version: {e}")))?
        .error_for_status()
        .map_err(|e| CliError::Download(format!("version endpoint: {e}")))?
        .text()
        .await
        .map_err(|e| CliError::Download(format!("failed to read version: {e}")))?;
    let version = version.trim();

    debug!(%version, "downloading executor binary");

    let url = endpoints.binary_url(version);
    let response = http
        .get(&url)
        .send()
        .await
        .map_err(|e| CliError::Download(format!("failed to fetch {url}: {e}")))?
        .error_for_status()
        .map_err(|e| CliError::Download(format!("binary endpoint: {e}")))?;

    let parent = binary
        .parent()
        .ok_or_else(|| CliError::Download(format!("'{}' has no parent", binary.display())))?;
    let mut staged = tempfile::NamedTempFile::new_in(parent)?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|e| CliError::Download(format!("download interrupted: {e}")))?;
        std::io::Write::write_all(&mut staged, &chunk)?;
    }

    let staged = staged
        .persist(binary)
        .map_err(|e| CliError::Download(format!("failed to persist binary: {e}")))?;
    staged.set_permissions(std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}

/// Outcome of one teardown step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The path existed and was removed.
    Removed,

    /// The path was already gone.
    AlreadyAbsent,

    /// Removal failed.
    Failed(String),
}

/// One teardown step and what happened to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// Step name, for diagnostics.
    pub step: String,

    /// What happened.
    pub outcome: StepOutcome,
}

fn remove_step(step: &str, path: &Path, recursive: bool) -> StepReport {
    let result = if recursive {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    let outcome = match result {
        Ok(()) => StepOutcome::Removed,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => StepOutcome::AlreadyAbsent,
        Err(e) => StepOutcome::Failed(e.to_string()),
    };
    StepReport {
        step: step.to_string(),
        outcome,
    }
}

/// Remove every file an installation put on disk, plus the storage
/// directory.
///
/// Every step runs regardless of earlier failures; already-absent paths
/// are not failures.
#[must_use]
pub fn remove_install_files(paths: &ExecutorPaths, storage_dir: &Path) -> Vec<StepReport> {
    vec![
        remove_step("storage directory", storage_dir, true),
        remove_step("token file", &paths.token, false),
        remove_step("service unit", &paths.unit, false),
        remove_step("executor config", &paths.config, false),
        remove_step("executor binary", &paths.binary, false),
    ]
}

/// Collapse teardown step reports into an overall result.
///
/// # Errors
///
/// Returns [`CliError::Teardown`] naming each failed step, if any
/// failed.
pub fn teardown_result(reports: &[StepReport]) -> Result<(), CliError> {
    let failures: Vec<String> = reports
        .iter()
        .filter_map(|report| match &report.outcome {
            StepOutcome::Failed(reason) => Some(format!("{}: {reason}", report.step)),
            _ => None,
        })
        .collect();
    if failures.is_empty() {
        Ok(())
    } else {
        Err(CliError::Teardown(failures.join("; ")))
    }
}

/// Stop the service and run cleanup, logging failures instead of
/// propagating them.
///
/// Used by uninstall, where a dead service or missing binary must not
/// block teardown.
pub async fn best_effort_stop(init: &dyn InitSystem, paths: &ExecutorPaths) {
    if let Err(e) = stop_service(init).await {
        warn!(error = %e, "error stopping executor");
        eprintln!("error stopping executor: {e}");
    }
    if let Err(e) = run_cleanup(paths).await {
        warn!(error = %e, "error cleaning up executor");
        eprintln!("error cleaning up executor: {e}");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[test]
    fn default_paths_match_install_layout() {
        let paths = ExecutorPaths::default();
        assert_eq!(paths.binary, PathBuf::from("/usr/bin/beaker-executor"));
        assert_eq!(paths.token, PathBuf::from("/etc/beaker/executor-token"));
        assert_eq!(
            paths.unit,
            PathBuf::from("/etc/systemd/system/beaker-executor.service")
        );
    }

    #[test]
    fn rooted_paths_stay_under_root() {
        let paths = ExecutorPaths::rooted(Path::new("/tmp/sandbox"));
        assert_eq!(
            paths.binary,
            PathBuf::from("/tmp/sandbox/usr/bin/beaker-executor")
        );
        assert_eq!(paths.config, PathBuf::from("/tmp/sandbox/etc/beaker/config.yml"));
    }

    #[test]
    fn binary_url_substitutes_version() {
        let endpoints = ReleaseEndpoints::default();
        assert_eq!(
            endpoints.binary_url("v1.2.3"),
            "https://storage.googleapis.com/ai2-beaker-public/bin/v1.2.3/executor"
        );
    }

    #[test]
    fn config_yaml_uses_camel_case_keys() {
        let config = ExecutorConfig::new(
            PathBuf::from("/var/beaker"),
            PathBuf::from("/etc/beaker/executor-token"),
            "my-cluster",
        );
        let yaml = serde_yaml::to_string(&config).expect("serialize");

        assert!(yaml.contains("storagePath: /var/beaker"));
        assert!(yaml.contains("tokenPath: /etc/beaker/executor-token"));
        assert!(yaml.contains("cluster: my-cluster"));

        let parsed: ExecutorConfig = serde_yaml::from_str(&yaml).expect("parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn ensure_not_installed_rejects_existing_binary() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = ExecutorPaths::rooted(dir.path());

        // Absent binary passes.
        ensure_not_installed(&paths).expect("not installed");

        std::fs::create_dir_all(paths.binary.parent().expect("parent")).expect("mkdir");
        std::fs::write(&paths.binary, b"elf").expect("write");
        assert!(matches!(
            ensure_not_installed(&paths),
            Err(CliError::AlreadyInstalled)
        ));
    }

    #[test]
    fn install_files_written_with_expected_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = ExecutorPaths::rooted(dir.path());

        write_install_files(&paths, "secret-token", "my-cluster", Path::new("/var/beaker"))
            .expect("write");

        let token_mode = std::fs::metadata(&paths.token)
            .expect("token metadata")
            .permissions()
            .mode();
        assert_eq!(token_mode & 0o777, 0o600);
        assert_eq!(
            std::fs::read_to_string(&paths.token).expect("token"),
            "secret-token"
        );

        let config = ExecutorConfig::load(&paths.config).expect("config");
        assert_eq!(config.beaker.cluster, "my-cluster");
        assert_eq!(config.storage_path, PathBuf::from("/var/beaker"));

        let unit = std::fs::read_to_string(&paths.unit).expect("unit");
        assert!(unit.contains(&format!("ExecStart={}", paths.binary.display())));
        assert!(unit.contains(&format!("Environment=CONFIG_PATH={}", paths.config.display())));
        assert!(unit.contains("WantedBy=multi-user.target"));
    }

    #[tokio::test]
    async fn start_service_orders_operations() {
        let init = FakeInit::new();
        start_service(&init).await.expect("start");
        assert_eq!(init.calls(), vec!["daemon-reload", "enable", "start"]);
    }

    #[tokio::test]
    async fn stop_service_orders_operations() {
        let init = FakeInit::new();
        stop_service(&init).await.expect("stop");
        assert_eq!(init.calls(), vec!["disable", "stop"]);
    }

    #[tokio::test]
    async fn start_service_stops_at_first_failure() {
        let init = FakeInit::new();
        init.fail_on("enable");
        assert!(start_service(&init).await.is_err());
        assert_eq!(init.calls(), vec!["daemon-reload", "enable"]);
    }

    #[test]
    fn teardown_tolerates_absent_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = ExecutorPaths::rooted(dir.path());
        let storage = dir.path().join("var/beaker");

        let reports = remove_install_files(&paths, &storage);
        assert_eq!(reports.len(), 5);
        assert!(reports
            .iter()
            .all(|r| r.outcome == StepOutcome::AlreadyAbsent));
        teardown_result(&reports).expect("absent is not failure");
    }

    #[test]
    fn teardown_removes_installed_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = ExecutorPaths::rooted(dir.path());
        let storage = dir.path().join("var/beaker");

        write_install_files(&paths, "tok", "cluster", &storage).expect("install files");
        std::fs::create_dir_all(&storage).expect("storage");
        std::fs::create_dir_all(paths.binary.parent().expect("parent")).expect("bin dir");
        std::fs::write(&paths.binary, b"elf").expect("binary");

        let reports = remove_install_files(&paths, &storage);
        teardown_result(&reports).expect("teardown");
        assert!(!paths.binary.exists());
        assert!(!paths.token.exists());
        assert!(!storage.exists());
    }

    #[test]
    fn teardown_result_names_failed_steps() {
        let reports = vec![
            StepReport {
                step: "storage directory".into(),
                outcome: StepOutcome::Removed,
            },
            StepReport {
                step: "executor binary".into(),
                outcome: StepOutcome::Failed("permission denied".into()),
            },
        ];
        let err = teardown_result(&reports).expect_err("should fail");
        assert!(err.to_string().contains("executor binary"));
        assert!(err.to_string().contains("permission denied"));
    }

    /// Serve the version string and binary body over plain HTTP.
    pub(crate) async fn spawn_release_server(
        version: &'static str,
        body: &'static [u8],
    ) -> ReleaseEndpoints {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]).into_owned();

                    let payload: Vec<u8> = if request.starts_with("GET /latest") {
                        version.as_bytes().to_vec()
                    } else {
                        body.to_vec()
                    };
                    let header = format!(
                        "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                        payload.len()
                    );
                    let _ = socket.write_all(header.as_bytes()).await;
                    let _ = socket.write_all(&payload).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        ReleaseEndpoints {
            version_url: format!("http://{addr}/latest"),
            binary_base: format!("http://{addr}"),
        }
    }

    #[tokio::test]
    async fn download_stages_binary_and_marks_it_executable() {
        let endpoints = spawn_release_server("v1.2.3\n", b"fake-executor-elf").await;
        let dir = tempfile::tempdir().expect("tempdir");
        let binary = dir.path().join("beaker-executor");

        let http = reqwest::Client::new();
        download_executor(&http, &endpoints, &binary)
            .await
            .expect("download");

        assert_eq!(
            std::fs::read(&binary).expect("binary"),
            b"fake-executor-elf"
        );
        let mode = std::fs::metadata(&binary)
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o700);

        // No staging leftovers beside the binary.
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read dir")
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn rendered_unit_restarts_always() {
        let unit = render_unit(&ExecutorPaths::default());
        assert!(unit.contains("Restart=always"));
        assert!(unit.contains("After=network.target"));
    }
}
