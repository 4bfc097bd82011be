//! Node administration command implementation.
//!
//! Cordoning marks a node ineligible for new scheduling without
//! touching work already running on it.

use std::io::Write;

use beaker_api::NodePatch;

use crate::cli::NodeCommands;
use crate::context::AppContext;
use crate::error::CliError;
use crate::output::{ExecutionList, Message, NodeList, OutputFormat};

/// Node command executor.
pub struct NodeCommand<'a> {
    ctx: &'a AppContext,
}

impl<'a> NodeCommand<'a> {
    /// Create a new node command.
    #[must_use]
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    /// Execute a node subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        command: &NodeCommands,
    ) -> Result<(), CliError> {
        match command {
            NodeCommands::Cordon { node } => {
                self.set_cordoned(node, true).await?;
                format.write(writer, &Message::success(format!("Node {node} cordoned")))
            }
            NodeCommands::Uncordon { node } => {
                self.set_cordoned(node, false).await?;
                format.write(writer, &Message::success(format!("Node {node} uncordoned")))
            }
            NodeCommands::Inspect { nodes } => {
                let mut fetched = Vec::with_capacity(nodes.len());
                for id in nodes {
                    fetched.push(self.ctx.api.get_node(id).await?);
                }
                format.write(writer, &NodeList { nodes: fetched })
            }
            NodeCommands::Executions { node } => {
                let node = match node {
                    Some(node) => node.clone(),
                    None => self.ctx.current_node()?,
                };
                let executions = self.ctx.api.list_executions(&node).await?;
                format.write(writer, &ExecutionList { executions })
            }
        }
    }

    async fn set_cordoned(&self, node: &str, cordoned: bool) -> Result<(), CliError> {
        let patch = NodePatch {
            cordoned: Some(cordoned),
        };
        self.ctx.api.patch_node(node, &patch).await?;
        Ok(())
    }
}
