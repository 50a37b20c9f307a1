//! Multi-group bulletin board server library
//!
//! A line-oriented TCP server where each connection can join any number
//! of named boards, post to them, and hear about joins, leaves and new
//! posts from everyone else on the same board.
//!
//! # Protocol
//! UTF-8, one command per line, fields separated by `|`:
//! `GROUPS`, `JOIN|group|name`, `POST|group|subject|content`,
//! `LEAVE|group`, `VIEW|group|id`, `USERS|group`, `PING`, `EXIT`.
//! Invalid requests get no reply.
//!
//! # Architecture
//! - `BoardRegistry` is built once at startup and shared read-only
//! - Each `Board` guards its members and messages with its own lock and
//!   broadcasts after every mutation
//! - Each connection gets a `Session`, a read loop and a single writer task
//! - Each inbound line runs as its own `CommandTask`
//! - On disconnect the session waits for its tasks, leaves every board,
//!   then closes
//!
//! # Example
//! ```ignore
//! use bulletin_board::{BulletinServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = BulletinServer::bind(&ServerConfig::default()).await.unwrap();
//!     server.run_until_ctrl_c().await;
//! }
//! ```

pub mod board;
pub mod command;
pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use board::{Board, JoinSnapshot};
pub use command::CommandTask;
pub use config::ServerConfig;
pub use error::{AppError, ConfigError, SendError};
pub use handler::handle_connection;
pub use message::Message;
pub use protocol::{Command, Reply};
pub use registry::BoardRegistry;
pub use server::BulletinServer;
pub use session::{Session, SessionState};
pub use types::{MessageId, SessionId};
