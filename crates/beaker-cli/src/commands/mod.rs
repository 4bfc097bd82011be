//! CLI command implementations.
//!
//! Each submodule implements one command group:
//! - [`session`] - Interactive session lifecycle
//! - [`node`] - Node administration
//! - [`executor`] - Executor install, upgrade, and removal

pub mod executor;
pub mod node;
pub mod session;

pub use executor::ExecutorCommand;
pub use node::NodeCommand;
pub use session::SessionCommand;

use std::io::{BufRead, Write};

use crate::error::CliError;

/// Interpret one line of confirmation input.
///
/// `None` means the answer was unrecognized and the prompt should
/// repeat. An empty line declines.
#[must_use]
pub fn parse_confirmation(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "" | "n" | "no" => Some(false),
        _ => None,
    }
}

/// Prompt until the reader answers yes or no.
///
/// # Errors
///
/// Returns an error if the prompt cannot be written or input ends.
pub fn confirm_with<R: BufRead, W: Write>(
    reader: &mut R,
    writer: &mut W,
    prompt: &str,
) -> Result<bool, CliError> {
    loop {
        write!(writer, "{prompt} [y/N]: ")?;
        writer.flush()?;

        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            // EOF declines.
            return Ok(false);
        }
        if let Some(answer) = parse_confirmation(&line) {
            return Ok(answer);
        }
        writeln!(writer, "Please answer \"y\" or \"n\".")?;
    }
}

/// Prompt on the terminal until the user answers yes or no.
///
/// # Errors
///
/// Returns an error if stdin or stdout fails.
pub fn confirm(prompt: &str) -> Result<bool, CliError> {
    let stdin = std::io::stdin();
    let mut reader = stdin.lock();
    let mut writer = std::io::stdout();
    confirm_with(&mut reader, &mut writer, prompt)
}
