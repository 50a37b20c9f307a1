//! Command dispatch
//!
//! One [`CommandTask`] per inbound line. It validates the command against
//! the registry and the issuing session's memberships, calls into the
//! board, and writes any replies back to the issuing session.
//! Invalid requests produce no reply.

use std::sync::Arc;

use tracing::debug;

use crate::board::Board;
use crate::protocol::{Command, Reply};
use crate::registry::BoardRegistry;
use crate::session::Session;
use crate::types::MessageId;

/// A single unit of dispatch work
#[derive(Debug)]
pub struct CommandTask {
    command: Command,
    session: Arc<Session>,
    registry: Arc<BoardRegistry>,
}

impl CommandTask {
    /// Create a task for an already-parsed command
    pub fn new(command: Command, session: Arc<Session>, registry: Arc<BoardRegistry>) -> Self {
        Self {
            command,
            session,
            registry,
        }
    }

    /// Parse an inbound line into a task
    ///
    /// Returns `None` for anything malformed.
    pub fn from_line(
        line: &str,
        session: Arc<Session>,
        registry: Arc<BoardRegistry>,
    ) -> Option<Self> {
        Command::parse(line).map(|command| Self::new(command, session, registry))
    }

    /// Synthesized LEAVE used when a session drains
    pub fn leave(group: String, session: Arc<Session>, registry: Arc<BoardRegistry>) -> Self {
        Self::new(Command::Leave { group }, session, registry)
    }

    /// The command this task will run
    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Execute the command to completion
    pub async fn run(self) {
        match &self.command {
            Command::Groups => self.reply(Reply::Groups(self.registry.names())),
            Command::Ping => self.reply(Reply::Ping),
            Command::Join { group, name } => self.run_join(group, name).await,
            Command::Post {
                group,
                subject,
                content,
            } => self.run_post(group, subject, content).await,
            Command::Leave { group } => self.run_leave(group).await,
            Command::View { group, id } => self.run_view(group, *id).await,
            Command::Users { group } => self.run_users(group).await,
            Command::Exit => {
                debug!("Session {}: EXIT reached dispatch, ignoring", self.session.id);
            }
        }
    }

    async fn run_join(&self, group: &str, name: &str) {
        let Some(board) = self.registry.get(group) else {
            return;
        };

        let snapshot = {
            let mut joined = self.session.joined().await;
            if joined.contains(group) {
                return;
            }
            let snapshot = board.join(&self.session, name).await;
            joined.insert(group.to_string());
            snapshot.unwrap_or_default()
        };

        self.reply(Reply::Join {
            group: group.to_string(),
            name: name.to_string(),
        });

        // Catch up: last two messages, then everyone else on the board
        for id in snapshot.recent {
            self.reply(Reply::Message {
                group: group.to_string(),
                id,
            });
        }
        for user in snapshot.others {
            self.reply(Reply::Join {
                group: group.to_string(),
                name: user,
            });
        }
    }

    async fn run_post(&self, group: &str, subject: &str, content: &str) {
        let Some(board) = self.registry.get(group) else {
            return;
        };
        board
            .post(self.session.id, subject.to_string(), content.to_string())
            .await;
    }

    async fn run_leave(&self, group: &str) {
        let Some(board) = self.registry.get(group) else {
            return;
        };

        let mut joined = self.session.joined().await;
        if !joined.contains(group) {
            return;
        }
        board.leave(self.session.id).await;
        joined.remove(group);
    }

    async fn run_view(&self, group: &str, id: MessageId) {
        let Some(board) = self.joined_board(group).await else {
            return;
        };
        let Some(message) = board.view(id).await else {
            return;
        };

        self.reply(Reply::View {
            group: group.to_string(),
            message,
        });
    }

    async fn run_users(&self, group: &str) {
        let Some(board) = self.joined_board(group).await else {
            return;
        };
        let names = board.users().await;

        self.reply(Reply::Users {
            group: group.to_string(),
            names,
        });
    }

    /// Board by name, only if the issuing session has joined it
    async fn joined_board(&self, group: &str) -> Option<&Arc<Board>> {
        let board = self.registry.get(group)?;
        self.session.has_joined(group).await.then_some(board)
    }

    fn reply(&self, reply: Reply) {
        if let Err(e) = self.session.send(reply) {
            debug!("Session {}: reply dropped: {}", self.session.id, e);
        }
    }
}
