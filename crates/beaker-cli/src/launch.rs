//! Session launch pipeline.
//!
//! Takes a freshly created session from "submitted" to "attached":
//! poll until the scheduler assigns resources, translate the grant into
//! container options, then pull, create, start, and attach.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use beaker_api::{ApiClient, ResourceGrant, Session};
use beaker_runtime::{ContainerOpts, ContainerRuntime, Mount};
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::CliError;

/// Container label carrying the owning session's identifier.
pub const SESSION_CONTAINER_LABEL: &str = "beaker.org/session";

/// Container label carrying the assigned GPU indices, comma-joined.
pub const SESSION_GPU_LABEL: &str = "beaker.org/gpus";

/// Exit code of a process terminated by SIGINT (128 + 2).
///
/// The only non-zero attach exit treated as benign: it is what the
/// session's shell reports when the user detaches with Ctrl-C.
pub const INTERRUPT_EXIT_CODE: i64 = 130;

/// Interval between scheduling polls.
pub const SCHEDULE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Source of session state, abstracted for tests.
pub trait SessionSource: Send + Sync {
    /// Fetch the current state of a session.
    fn fetch_session<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Session, CliError>>;
}

impl SessionSource for ApiClient {
    fn fetch_session<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Session, CliError>> {
        Box::pin(async move { Ok(self.get_session(id).await?) })
    }
}

/// Poll until the scheduler assigns the session to a node.
///
/// The first poll happens immediately; subsequent polls are spaced by
/// `interval` with a dot of progress between them. There is no timeout:
/// the wait ends only on assignment, a fetch error, or cancellation.
///
/// # Errors
///
/// Returns [`CliError::Canceled`] if `cancel` fires, or the first fetch
/// error encountered.
pub async fn await_session_schedule(
    source: &dyn SessionSource,
    id: &str,
    interval: Duration,
    cancel: &CancellationToken,
    quiet: bool,
) -> Result<Session, CliError> {
    let mut waited = false;
    loop {
        let session = source.fetch_session(id).await?;
        if session.state.is_scheduled() && session.limits.is_some() {
            if waited && !quiet {
                println!();
            }
            return Ok(session);
        }

        if !quiet {
            if !waited {
                print!("Waiting for session to start.");
            } else {
                print!(".");
            }
            let _ = std::io::stdout().flush();
        }
        waited = true;

        tokio::select! {
            () = cancel.cancelled() => {
                if !quiet {
                    println!();
                }
                return Err(CliError::Canceled);
            }
            () = tokio::time::sleep(interval) => {}
        }
    }
}

/// The invoking OS user, mapped into the session container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    /// Numeric user ID.
    pub uid: u32,

    /// Numeric group ID.
    pub gid: u32,

    /// Home directory.
    pub home: String,
}

impl UserIdentity {
    /// `uid:gid` as the runtime expects it.
    #[must_use]
    pub fn user_spec(&self) -> String {
        format!("{}:{}", self.uid, self.gid)
    }

    /// Resolve the identity of the invoking user.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` fails or `HOME` is unset.
    pub async fn current() -> Result<Self, CliError> {
        let uid = run_id_command("-u").await?;
        let gid = run_id_command("-g").await?;
        let home = std::env::var("HOME")
            .map_err(|_| CliError::UserIdentity("HOME is not set".into()))?;
        Ok(Self { uid, gid, home })
    }
}

async fn run_id_command(flag: &str) -> Result<u32, CliError> {
    let output = tokio::process::Command::new("id")
        .arg(flag)
        .output()
        .await
        .map_err(|e| CliError::UserIdentity(format!("failed to run id {flag}: {e}")))?;
    if !output.status.success() {
        return Err(CliError::UserIdentity(format!(
            "id {flag} exited with {}",
            output.status
        )));
    }
    let text = String::from_utf8_lossy(&output.stdout);
    text.trim()
        .parse()
        .map_err(|e| CliError::UserIdentity(format!("unparseable id {flag} output: {e}")))
}

/// Deterministic container name for a session.
#[must_use]
pub fn container_name(session_id: &str) -> String {
    format!("session-{session_id}").to_lowercase()
}

/// Translate a scheduled session and its grant into container options.
///
/// Pure: all host inspection (user identity, `/net` presence) happens in
/// the caller.
#[must_use]
pub fn build_container_opts(
    session: &Session,
    grant: &ResourceGrant,
    image: &str,
    command: Option<Vec<String>>,
    user: &UserIdentity,
    mount_net: bool,
) -> ContainerOpts {
    let mut labels = HashMap::new();
    labels.insert(SESSION_CONTAINER_LABEL.to_string(), session.id.clone());
    labels.insert(SESSION_GPU_LABEL.to_string(), grant.gpus.join(","));

    let mut env = HashMap::new();
    env.insert("HOME".to_string(), user.home.clone());

    let mut mounts = vec![Mount::passthrough(&user.home)];
    if mount_net {
        mounts.push(Mount::passthrough("/net"));
    }

    let mut opts = ContainerOpts::new(container_name(&session.id), image);
    opts.command = command;
    opts.labels = labels;
    opts.env = env;
    opts.mounts = mounts;
    opts.cpu_count = grant.cpu_count;
    opts.gpus = grant.gpus.clone();
    opts.memory = grant.memory;
    opts.interactive = true;
    opts.user = user.user_spec();
    opts.working_dir = user.home.clone();
    opts
}

/// Classify an attach exit code.
///
/// Zero and [`INTERRUPT_EXIT_CODE`] are benign; any other code is an
/// error carrying the code.
///
/// # Errors
///
/// Returns [`CliError::ContainerExit`] for non-benign codes.
pub fn check_attach_exit(code: i64) -> Result<(), CliError> {
    if code == 0 || code == INTERRUPT_EXIT_CODE {
        Ok(())
    } else {
        Err(CliError::ContainerExit(code))
    }
}

/// Take a freshly created session all the way to an attached container.
///
/// # Errors
///
/// Returns the first failure in the wait/pull/create/start/attach
/// pipeline; the caller decides whether to cancel the session.
#[allow(clippy::too_many_arguments)]
pub async fn launch_session(
    source: &dyn SessionSource,
    runtime: &Arc<dyn ContainerRuntime>,
    session_id: &str,
    image: &str,
    command: Option<Vec<String>>,
    interval: Duration,
    cancel: &CancellationToken,
    quiet: bool,
) -> Result<(), CliError> {
    let session = await_session_schedule(source, session_id, interval, cancel, quiet).await?;
    let grant = session
        .limits
        .clone()
        .ok_or(CliError::SessionNotStarted)?;

    if !quiet {
        println!(
            "Reserved {} GPU, {} CPU, {:.1}GiB memory",
            grant.gpus.len(),
            grant.cpu_count,
            grant.memory as f64 / f64::from(1 << 30)
        );
    }

    let user = UserIdentity::current().await?;
    let mount_net = Path::new("/net").exists();
    let opts = build_container_opts(&session, &grant, image, command, &user, mount_net);

    debug!(session = %session.id, container = %opts.name, "launching session container");

    runtime.pull_image(image, quiet).await?;
    let container_id = runtime.create(&opts).await?;
    runtime.start(&container_id).await?;
    let status = runtime.attach(&container_id).await?;
    check_attach_exit(status.code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beaker_api::{ApiError, ExecutionState};
    use chrono::Utc;
    use std::sync::Mutex;

    /// Session source that serves a scripted sequence of responses.
    struct ScriptedSource {
        responses: Mutex<Vec<Result<Session, CliError>>>,
        polls: Mutex<u32>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<Session, CliError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                polls: Mutex::new(0),
            }
        }

        fn poll_count(&self) -> u32 {
            *self.polls.lock().expect("lock")
        }
    }

    impl SessionSource for ScriptedSource {
        fn fetch_session<'a>(
            &'a self,
            _id: &'a str,
        ) -> BoxFuture<'a, Result<Session, CliError>> {
            Box::pin(async move {
                *self.polls.lock().expect("lock") += 1;
                let mut responses = self.responses.lock().expect("lock");
                if responses.is_empty() {
                    Err(CliError::Api(ApiError::Api {
                        status: 404,
                        message: "script exhausted".into(),
                    }))
                } else {
                    responses.remove(0)
                }
            })
        }
    }

    fn pending_session() -> Session {
        Session {
            id: "01ABC".into(),
            name: None,
            node: "node-1".into(),
            state: ExecutionState::default(),
            limits: None,
        }
    }

    fn scheduled_session(gpus: Vec<&str>) -> Session {
        let mut session = pending_session();
        session.state.scheduled = Some(Utc::now());
        session.limits = Some(ResourceGrant {
            gpus: gpus.into_iter().map(String::from).collect(),
            cpu_count: 4.0,
            memory: 8 * 1024 * 1024 * 1024,
        });
        session
    }

    fn test_user() -> UserIdentity {
        UserIdentity {
            uid: 1000,
            gid: 1000,
            home: "/home/tester".into(),
        }
    }

    #[tokio::test]
    async fn wait_returns_after_repeated_polls() {
        let source = ScriptedSource::new(vec![
            Ok(pending_session()),
            Ok(pending_session()),
            Ok(scheduled_session(vec!["0", "1"])),
        ]);
        let cancel = CancellationToken::new();

        let session = await_session_schedule(
            &source,
            "01ABC",
            Duration::from_millis(1),
            &cancel,
            true,
        )
        .await
        .expect("scheduled");

        assert_eq!(source.poll_count(), 3);
        let grant = session.limits.expect("limits");
        assert_eq!(grant.gpus, vec!["0", "1"]);
    }

    #[tokio::test]
    async fn wait_returns_immediately_when_already_scheduled() {
        let source = ScriptedSource::new(vec![Ok(scheduled_session(vec![]))]);
        let cancel = CancellationToken::new();

        await_session_schedule(&source, "01ABC", Duration::from_secs(60), &cancel, true)
            .await
            .expect("scheduled");
        assert_eq!(source.poll_count(), 1);
    }

    #[tokio::test]
    async fn wait_propagates_fetch_errors() {
        let source = ScriptedSource::new(vec![Err(CliError::Api(ApiError::Api {
            status: 500,
            message: "boom".into(),
        }))]);
        let cancel = CancellationToken::new();

        let err = await_session_schedule(
            &source,
            "01ABC",
            Duration::from_millis(1),
            &cancel,
            true,
        )
        .await
        .expect_err("should fail");
        assert!(matches!(err, CliError::Api(_)));
    }

    #[tokio::test]
    async fn wait_stops_on_cancellation() {
        let source = ScriptedSource::new(vec![Ok(pending_session()), Ok(pending_session())]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = await_session_schedule(
            &source,
            "01ABC",
            Duration::from_secs(60),
            &cancel,
            true,
        )
        .await
        .expect_err("should cancel");
        assert!(matches!(err, CliError::Canceled));
        // One fetch happens before the first sleep.
        assert_eq!(source.poll_count(), 1);
    }

    #[test]
    fn container_name_is_lowercased() {
        assert_eq!(container_name("01ABCdef"), "session-01abcdef");
    }

    #[test]
    fn container_opts_carry_labels_and_grant() {
        let session = scheduled_session(vec!["2", "5"]);
        let grant = session.limits.clone().expect("limits");
        let opts = build_container_opts(
            &session,
            &grant,
            "allenai/base:cuda11.2-ubuntu20.04",
            None,
            &test_user(),
            false,
        );

        assert_eq!(opts.name, "session-01abc");
        assert_eq!(opts.labels[SESSION_CONTAINER_LABEL], "01ABC");
        assert_eq!(opts.labels[SESSION_GPU_LABEL], "2,5");
        assert_eq!(opts.gpus, vec!["2", "5"]);
        assert_eq!(opts.cpu_count, 4.0);
        assert_eq!(opts.user, "1000:1000");
        assert_eq!(opts.working_dir, "/home/tester");
        assert_eq!(opts.env["HOME"], "/home/tester");
        assert!(opts.interactive);
        assert_eq!(opts.mounts, vec![Mount::passthrough("/home/tester")]);
    }

    #[test]
    fn container_opts_gpu_label_empty_without_gpus() {
        let session = scheduled_session(vec![]);
        let grant = session.limits.clone().expect("limits");
        let opts =
            build_container_opts(&session, &grant, "img", None, &test_user(), true);

        assert_eq!(opts.labels[SESSION_GPU_LABEL], "");
        assert!(opts.gpus.is_empty());
        // /net passthrough requested by the caller.
        assert!(opts.mounts.contains(&Mount::passthrough("/net")));
    }

    #[test]
    fn attach_exit_classification() {
        assert!(check_attach_exit(0).is_ok());
        assert!(check_attach_exit(INTERRUPT_EXIT_CODE).is_ok());
        assert!(matches!(
            check_attach_exit(1),
            Err(CliError::ContainerExit(1))
        ));
        assert!(matches!(
            check_attach_exit(137),
            Err(CliError::ContainerExit(137))
        ));
    }

    #[tokio::test]
    async fn launch_pipeline_pulls_creates_starts_attaches() {
        use beaker_runtime::FakeRuntime;

        let source = ScriptedSource::new(vec![
            Ok(pending_session()),
            Ok(pending_session()),
            Ok(pending_session()),
            Ok(scheduled_session(vec!["0", "1"])),
        ]);
        let fake = Arc::new(FakeRuntime::new());
        let runtime: Arc<dyn ContainerRuntime> = fake.clone();
        let cancel = CancellationToken::new();

        launch_session(
            &source,
            &runtime,
            "01ABC",
            "allenai/base:cuda11.2-ubuntu20.04",
            None,
            Duration::from_millis(1),
            &cancel,
            true,
        )
        .await
        .expect("launch");

        assert_eq!(source.poll_count(), 4);
        assert_eq!(
            fake.pulled_images(),
            vec!["allenai/base:cuda11.2-ubuntu20.04"]
        );

        let attached = fake.attached_containers();
        assert_eq!(attached.len(), 1);
        let opts = fake.container_opts(&attached[0]).expect("opts");
        assert_eq!(opts.name, "session-01abc");
        assert_eq!(opts.gpus, vec!["0", "1"]);
    }

    #[tokio::test]
    async fn launch_surfaces_non_benign_exit() {
        use beaker_runtime::FakeRuntime;

        let source = ScriptedSource::new(vec![Ok(scheduled_session(vec![]))]);
        let fake = Arc::new(FakeRuntime::new());
        fake.set_exit_code(1);
        let runtime: Arc<dyn ContainerRuntime> = fake;
        let cancel = CancellationToken::new();

        let err = launch_session(
            &source,
            &runtime,
            "01ABC",
            "img",
            None,
            Duration::from_millis(1),
            &cancel,
            true,
        )
        .await
        .expect_err("should fail");
        assert!(matches!(err, CliError::ContainerExit(1)));
    }
}
