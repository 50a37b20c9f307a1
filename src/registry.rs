//! Board registry
//!
//! The fixed set of boards, built once at startup and shared read-only by
//! every session. Lookups are by exact name.

use std::collections::HashMap;
use std::sync::Arc;

use crate::board::Board;
use crate::config::ServerConfig;

/// Immutable name → board mapping
///
/// Iteration follows the order the boards were registered in.
#[derive(Debug)]
pub struct BoardRegistry {
    boards: Vec<Arc<Board>>,
    index: HashMap<String, usize>,
}

impl BoardRegistry {
    /// Build a registry from board names
    ///
    /// A repeated name keeps its first position.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut boards = Vec::new();
        let mut index = HashMap::new();
        for name in names {
            let name = name.into();
            if index.contains_key(&name) {
                continue;
            }
            index.insert(name.clone(), boards.len());
            boards.push(Arc::new(Board::new(name)));
        }
        Self { boards, index }
    }

    /// Build the registry described by a validated config
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.boards.iter().cloned())
    }

    /// Look up a board by exact name
    pub fn get(&self, name: &str) -> Option<&Arc<Board>> {
        self.index.get(name).map(|&i| &self.boards[i])
    }

    /// All board names in registration order
    pub fn names(&self) -> Vec<String> {
        self.boards.iter().map(|b| b.name().to_string()).collect()
    }

    /// Number of boards
    pub fn len(&self) -> usize {
        self.boards.len()
    }

    /// Whether no boards are registered
    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }
}

impl Default for BoardRegistry {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}
