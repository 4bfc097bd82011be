//! # beaker-api
//!
//! Types and HTTP client for the Beaker scheduler API.
//!
//! The scheduler owns all session and node state; this crate exposes the
//! surface the CLI consumes: session create/get/patch/list, node
//! get/patch/executions, and cluster get. All calls are synchronous
//! request/response from the caller's perspective and errors are
//! propagated verbatim with no retry policy.

pub mod client;
pub mod error;
pub mod types;

pub use client::ApiClient;
pub use error::ApiError;
pub use types::{
    Cluster, Execution, ExecutionState, ListSessionOpts, Node, NodePatch, ResourceGrant,
    Session, SessionPatch, SessionSpec, TaskResources,
};
