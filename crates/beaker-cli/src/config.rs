//! Local CLI configuration.
//!
//! Read from `~/.beaker/config.toml` with environment overrides
//! (`BEAKER_TOKEN`, `BEAKER_ADDR`). Holds the user token, the scheduler
//! API address, and the path of the node-identity file the executor
//! maintains on managed hosts.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::CliError;

/// Default scheduler API address.
pub const DEFAULT_ADDRESS: &str = "https://beaker.org";

/// Default path of the node-identity file written by the executor.
pub const DEFAULT_NODE_FILE: &str = "/var/beaker/node";

/// Resolved CLI configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// User API token.
    pub user_token: String,

    /// Scheduler API address.
    pub address: String,

    /// Path of the node-identity file on this host.
    pub node_file: PathBuf,
}

/// On-disk configuration file; every field optional.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    user_token: Option<String>,
    address: Option<String>,
    node_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default file location and the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed, or if
    /// no user token is configured anywhere.
    pub fn load() -> Result<Self, CliError> {
        let path = Self::default_path();
        let file = match path {
            Some(ref path) if path.exists() => Self::read_file(path)?,
            _ => FileConfig::default(),
        };

        let user_token = std::env::var("BEAKER_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .or(file.user_token)
            .ok_or_else(|| {
                CliError::Config(
                    "no user token found; set BEAKER_TOKEN or user_token in ~/.beaker/config.toml"
                        .into(),
                )
            })?;

        let address = std::env::var("BEAKER_ADDR")
            .ok()
            .filter(|a| !a.is_empty())
            .or(file.address)
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());

        let node_file = file
            .node_file
            .unwrap_or_else(|| PathBuf::from(DEFAULT_NODE_FILE));

        Ok(Self {
            user_token,
            address,
            node_file,
        })
    }

    /// Build a configuration from a TOML string, applying defaults for
    /// unset fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or no token is present.
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        let file: FileConfig = toml::from_str(content)
            .map_err(|e| CliError::Config(format!("invalid TOML: {e}")))?;

        let user_token = file
            .user_token
            .ok_or_else(|| CliError::Config("user_token is required".into()))?;

        Ok(Self {
            user_token,
            address: file.address.unwrap_or_else(|| DEFAULT_ADDRESS.to_string()),
            node_file: file
                .node_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_NODE_FILE)),
        })
    }

    fn read_file(path: &Path) -> Result<FileConfig, CliError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("failed to read '{}': {e}", path.display()))
        })?;
        toml::from_str(&content)
            .map_err(|e| CliError::Config(format!("invalid '{}': {e}", path.display())))
    }

    fn default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("BEAKER_CONFIG") {
            return Some(PathBuf::from(path));
        }
        dirs::home_dir().map(|home| home.join(".beaker").join("config.toml"))
    }
}
