//! Container specification types.

use std::collections::HashMap;

/// A host path mounted into a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    /// Path on the host.
    pub host_path: String,

    /// Path inside the container.
    pub container_path: String,

    /// Mount read-only.
    pub read_only: bool,
}

impl Mount {
    /// Bind-mount a host path at the same path inside the container.
    #[must_use]
    pub fn passthrough(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            host_path: path.clone(),
            container_path: path,
            read_only: false,
        }
    }
}

/// Everything needed to create a session container.
///
/// Derived from a resource grant and discarded after creation.
#[derive(Debug, Clone, Default)]
pub struct ContainerOpts {
    /// Deterministic container name.
    pub name: String,

    /// Image reference to run.
    pub image: String,

    /// Command to run; `None` uses the image's default.
    pub command: Option<Vec<String>>,

    /// Identifying labels.
    pub labels: HashMap<String, String>,

    /// Environment variables.
    pub env: HashMap<String, String>,

    /// Bind mounts.
    pub mounts: Vec<Mount>,

    /// CPU limit, in CPUs.
    pub cpu_count: f64,

    /// Assigned GPU indices.
    pub gpus: Vec<String>,

    /// Memory limit in bytes; zero means unlimited.
    pub memory: i64,

    /// Allocate a TTY and keep stdin open.
    pub interactive: bool,

    /// Effective user as `uid:gid`.
    pub user: String,

    /// Working directory inside the container.
    pub working_dir: String,
}

impl ContainerOpts {
    /// Create options for the given name and image.
    #[must_use]
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            ..Self::default()
        }
    }
}
