//! # beaker-runtime
//!
//! Container runtime interface for Beaker sessions.
//!
//! The CLI talks to the local container runtime exclusively through the
//! [`ContainerRuntime`] capability trait, which exposes exactly the
//! operations session handling needs: pull, create, start, attach, exec,
//! list, and info. The concrete driver is selected once at startup; no
//! caller ever downcasts to it.
//!
//! [`DockerRuntime`] is the production driver (bollard). [`FakeRuntime`]
//! is an in-memory stand-in for tests.

pub mod docker;
pub mod error;
pub mod runtime;
pub mod spec;

pub use docker::DockerRuntime;
pub use error::RuntimeError;
pub use runtime::{ContainerInfo, ContainerRuntime, ExitStatus, FakeRuntime};
pub use spec::{ContainerOpts, Mount};
