//! Server configuration
//!
//! Defaults cover the stock six boards on `127.0.0.1:12345`; a JSON file
//! can override any field.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Default listen address
pub const DEFAULT_ADDR: &str = "127.0.0.1:12345";

/// Default upper bound on an inbound line, in bytes
pub const DEFAULT_MAX_LINE_LENGTH: usize = 8192;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the listener binds to
    pub listen_addr: String,
    /// Board names, in the order GROUPS reports them
    pub boards: Vec<String>,
    /// Longest accepted inbound line; longer lines end the session
    pub max_line_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_ADDR.to_string(),
            boards: ["Public", "Group1", "Group2", "Group3", "Group4", "Group5"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl ServerConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check board names and limits
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.boards.is_empty() {
            return Err(ConfigError::NoBoards);
        }
        if self.max_line_length == 0 {
            return Err(ConfigError::ZeroLineLength);
        }

        let mut seen = HashSet::new();
        for name in &self.boards {
            if name.is_empty() || name.contains(['|', '\r', '\n']) {
                return Err(ConfigError::InvalidBoardName(name.clone()));
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicateBoard(name.clone()));
            }
        }
        Ok(())
    }
}
