//! Error types for container runtime operations.

use thiserror::Error;

/// Errors that can occur when driving the container runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Could not reach the runtime daemon.
    #[error("failed to connect to container runtime: {0}")]
    Connection(String),

    /// The requested image does not exist.
    #[error("image not found: {image}")]
    ImageNotFound {
        /// Image reference that failed to resolve.
        image: String,
    },

    /// Image pull failed.
    #[error("failed to pull image {image}: {reason}")]
    PullFailed {
        /// Image reference.
        image: String,
        /// Underlying cause.
        reason: String,
    },

    /// Container creation failed.
    #[error("failed to create container: {0}")]
    CreateFailed(String),

    /// Container start failed.
    #[error("failed to start container {id}: {reason}")]
    StartFailed {
        /// Container identifier.
        id: String,
        /// Underlying cause.
        reason: String,
    },

    /// Attach or exec stream failure.
    #[error("attach failed: {0}")]
    AttachFailed(String),

    /// No container with the given identifier.
    #[error("container not found: {id}")]
    NotFound {
        /// Container identifier.
        id: String,
    },

    /// Any other runtime failure.
    #[error("container runtime error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_not_found_display() {
        let err = RuntimeError::ImageNotFound {
            image: "allenai/base:latest".into(),
        };
        assert_eq!(err.to_string(), "image not found: allenai/base:latest");
    }

    #[test]
    fn start_failed_display_includes_id_and_reason() {
        let err = RuntimeError::StartFailed {
            id: "abc123".into(),
            reason: "port in use".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to start container abc123: port in use"
        );
    }
}
