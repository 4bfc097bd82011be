//! # beaker-cli
//!
//! Beaker command-line interface.
//!
//! Provides commands for:
//! - Interactive sessions (create, attach, exec, get, list, update)
//! - Node administration (cordon, uncordon, inspect, executions)
//! - Executor lifecycle (install, start, stop, restart, upgrade, uninstall)
//!
//! # Architecture
//!
//! The CLI talks to two collaborators: the remote scheduler API (via
//! [`beaker_api::ApiClient`]) and the local container runtime (via the
//! [`beaker_runtime::ContainerRuntime`] capability trait). An
//! [`context::AppContext`] is constructed once in `main` and passed by
//! reference into every command handler.
//!
//! ```text
//! ┌────────────┐   HTTPS   ┌────────────────┐
//! │ beaker CLI │◄─────────►│  scheduler API │
//! └─────┬──────┘           └────────────────┘
//!       │ unix socket
//!       ▼
//! ┌────────────┐
//! │   Docker   │
//! └────────────┘
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod launch;
pub mod output;

pub use cli::{Cli, Commands, Format};
pub use config::Config;
pub use context::AppContext;
pub use error::CliError;
pub use output::OutputFormat;
