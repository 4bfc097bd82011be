//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use beaker_api::{Execution, ExecutionState, Node, Session};
use serde::Serialize;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Get the current format.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// Human-readable lifecycle status derived from timestamps.
///
/// Later timestamps win: a session that is both canceled and finalized
/// reports `finalized`.
#[must_use]
pub fn session_status(state: &ExecutionState) -> &'static str {
    if state.finalized.is_some() {
        "finalized"
    } else if state.canceled.is_some() {
        "canceling"
    } else if state.ended.is_some() {
        "ended"
    } else if state.started.is_some() {
        "running"
    } else if state.scheduled.is_some() {
        "scheduled"
    } else {
        "pending"
    }
}

/// List of sessions for display.
#[derive(Debug, Clone, Serialize)]
pub struct SessionList {
    /// Sessions to display.
    pub sessions: Vec<Session>,
}

impl TableDisplay for SessionList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.sessions.is_empty() {
            writeln!(writer, "No sessions found")?;
            return Ok(());
        }

        // Header
        writeln!(
            writer,
            "{:<28}  {:<20}  {:<20}  {:<10}  {:>4}",
            "ID", "NAME", "NODE", "STATUS", "GPUS"
        )?;
        writeln!(writer, "{}", "─".repeat(92))?;

        // Rows
        for session in &self.sessions {
            let gpus = session
                .limits
                .as_ref()
                .map_or(0, |limits| limits.gpus.len());
            writeln!(
                writer,
                "{:<28}  {:<20}  {:<20}  {:<10}  {:>4}",
                session.id,
                truncate(session.name.as_deref().unwrap_or(""), 20),
                truncate(&session.node, 20),
                session_status(&session.state),
                gpus
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} session(s)", self.sessions.len())?;
        Ok(())
    }
}

/// List of nodes for display.
#[derive(Debug, Clone, Serialize)]
pub struct NodeList {
    /// Nodes to display.
    pub nodes: Vec<Node>,
}

impl TableDisplay for NodeList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.nodes.is_empty() {
            writeln!(writer, "No nodes found")?;
            return Ok(());
        }

        // Header
        writeln!(
            writer,
            "{:<28}  {:<24}  {:<10}  {:>4}  {:>6}",
            "ID", "HOSTNAME", "STATUS", "GPUS", "CPUS"
        )?;
        writeln!(writer, "{}", "─".repeat(82))?;

        // Rows
        for node in &self.nodes {
            let (gpus, cpus) = node
                .limits
                .as_ref()
                .map_or((0, 0.0), |limits| (limits.gpus.len(), limits.cpu_count));
            writeln!(
                writer,
                "{:<28}  {:<24}  {:<10}  {:>4}  {:>6}",
                node.id,
                truncate(&node.hostname, 24),
                if node.cordoned { "cordoned" } else { "ok" },
                gpus,
                cpus
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} node(s)", self.nodes.len())?;
        Ok(())
    }
}

/// List of executions for display.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionList {
    /// Executions to display.
    pub executions: Vec<Execution>,
}

impl TableDisplay for ExecutionList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.executions.is_empty() {
            writeln!(writer, "No executions found")?;
            return Ok(());
        }

        // Header
        writeln!(
            writer,
            "{:<28}  {:<20}  {:<10}",
            "ID", "NODE", "STATUS"
        )?;
        writeln!(writer, "{}", "─".repeat(62))?;

        // Rows
        for execution in &self.executions {
            writeln!(
                writer,
                "{:<28}  {:<20}  {:<10}",
                execution.id,
                truncate(&execution.node, 20),
                session_status(&execution.state)
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} execution(s)", self.executions.len())?;
        Ok(())
    }
}

/// Simple message output.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Message text.
    pub message: String,
    /// Whether this is a success message.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub success: bool,
}

impl Message {
    /// Create a success message.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }

    /// Create an informational message.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: false,
        }
    }
}

impl TableDisplay for Message {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.success {
            writeln!(writer, "✓ {}", self.message)?;
        } else {
            writeln!(writer, "{}", self.message)?;
        }
        Ok(())
    }
}

/// Truncate a string to a maximum number of characters.
///
/// Counts characters rather than bytes so names containing multi-byte
/// UTF-8 never split inside a code point.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beaker_api::ResourceGrant;
    use chrono::Utc;

    fn session(id: &str, state: ExecutionState) -> Session {
        Session {
            id: id.into(),
            name: None,
            node: "node-1".into(),
            state,
            limits: None,
        }
    }

    #[test]
    fn output_format_default_is_table() {
        let fmt = OutputFormat::default();
        assert_eq!(fmt.format(), Format::Table);
        assert!(!fmt.is_json());
    }

    #[test]
    fn status_pending_when_no_timestamps() {
        assert_eq!(session_status(&ExecutionState::default()), "pending");
    }

    #[test]
    fn status_prefers_latest_lifecycle_stage() {
        let now = Some(Utc::now());
        let state = ExecutionState {
            scheduled: now,
            started: now,
            ended: now,
            finalized: now,
            canceled: now,
        };
        assert_eq!(session_status(&state), "finalized");

        let state = ExecutionState {
            scheduled: now,
            started: now,
            ..ExecutionState::default()
        };
        assert_eq!(session_status(&state), "running");
    }

    #[test]
    fn status_canceling_before_finalized() {
        let state = ExecutionState {
            canceled: Some(Utc::now()),
            ..ExecutionState::default()
        };
        assert_eq!(session_status(&state), "canceling");
    }

    #[test]
    fn session_list_empty() {
        let list = SessionList { sessions: vec![] };
        let fmt = OutputFormat::new(Format::Table);
        let output = fmt.to_string(&list).expect("should format");

        assert!(output.contains("No sessions found"));
    }

    #[test]
    fn session_list_with_sessions() {
        let mut first = session("01AAA", ExecutionState::default());
        first.name = Some("interactive-dev".into());
        first.limits = Some(ResourceGrant {
            gpus: vec!["0".into(), "1".into()],
            cpu_count: 4.0,
            memory: 0,
        });

        let list = SessionList {
            sessions: vec![first, session("01BBB", ExecutionState::default())],
        };

        let fmt = OutputFormat::new(Format::Table);
        let output = fmt.to_string(&list).expect("should format");

        assert!(output.contains("01AAA"));
        assert!(output.contains("interactive-dev"));
        assert!(output.contains("pending"));
        assert!(output.contains("Total: 2 session(s)"));
    }

    #[test]
    fn node_list_shows_cordoned_status() {
        let list = NodeList {
            nodes: vec![Node {
                id: "node-abc".into(),
                hostname: "gpu-worker-01".into(),
                cordoned: true,
                limits: None,
            }],
        };

        let fmt = OutputFormat::new(Format::Table);
        let output = fmt.to_string(&list).expect("should format");

        assert!(output.contains("node-abc"));
        assert!(output.contains("cordoned"));
    }

    #[test]
    fn execution_list_empty() {
        let list = ExecutionList { executions: vec![] };
        let fmt = OutputFormat::new(Format::Table);
        let output = fmt.to_string(&list).expect("should format");

        assert!(output.contains("No executions found"));
    }

    #[test]
    fn message_success() {
        let msg = Message::success("Node cordoned");
        let fmt = OutputFormat::new(Format::Table);
        let output = fmt.to_string(&msg).expect("should format");

        assert!(output.contains("✓ Node cordoned"));
    }

    #[test]
    fn json_output_parses() {
        let list = SessionList {
            sessions: vec![session("01AAA", ExecutionState::default())],
        };

        let fmt = OutputFormat::new(Format::Json);
        let output = fmt.to_string(&list).expect("should format");
        let parsed: serde_json::Value = serde_json::from_str(&output).expect("valid json");

        assert_eq!(parsed["sessions"][0]["id"], "01AAA");
    }

    #[test]
    fn truncate_long_string() {
        assert_eq!(truncate("hello world", 8), "hello...");
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate("ααααα", 8), "ααααα");
        assert_eq!(truncate("αβγδεζηθικ", 8), "αβγδε...");
        assert_eq!(truncate("αβγδ", 2), "αβ");
    }

    #[test]
    fn session_list_renders_multibyte_names() {
        // 20 characters but 23 bytes; fits the column untruncated.
        let mut short = session("01AAA", ExecutionState::default());
        short.name = Some("interactive-sess-ααα".into());
        // 23 characters; truncated on a character boundary.
        let mut long = session("01BBB", ExecutionState::default());
        long.name = Some("interactive-session-ααα".into());

        let list = SessionList {
            sessions: vec![short, long],
        };

        let fmt = OutputFormat::new(Format::Table);
        let output = fmt.to_string(&list).expect("should format");

        assert!(output.contains("interactive-sess-ααα"));
        assert!(output.contains("interactive-sessi..."));
    }
}
