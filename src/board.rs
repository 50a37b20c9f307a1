//! Board struct definition
//!
//! A named group with a membership roster and a message archive.
//! Every operation runs under the board's own lock, and any broadcast it
//! makes happens while that lock is held, after the mutation.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::message::Message;
use crate::protocol::Reply;
use crate::session::Session;
use crate::types::{MessageId, SessionId};

/// A current member of a board
#[derive(Debug)]
struct Member {
    session: Arc<Session>,
    display_name: String,
}

/// An archived message plus its posting order on this board
#[derive(Debug)]
struct Entry {
    seq: u64,
    message: Message,
}

#[derive(Debug, Default)]
struct BoardState {
    members: HashMap<SessionId, Member>,
    messages: HashMap<MessageId, Entry>,
    next_seq: u64,
}

impl BoardState {
    fn recent_two(&self) -> Vec<MessageId> {
        let mut entries: Vec<&Entry> = self.messages.values().collect();
        entries.sort_by_key(|e| (e.message.posted_at, e.seq));

        let skip = entries.len().saturating_sub(2);
        entries[skip..].iter().map(|e| e.message.id).collect()
    }

    fn users_except(&self, session_id: SessionId) -> Vec<String> {
        self.members
            .iter()
            .filter(|(id, _)| **id != session_id)
            .map(|(_, m)| m.display_name.clone())
            .collect()
    }

    fn broadcast(&self, board: &str, reply: Reply) {
        for (id, member) in &self.members {
            if let Err(e) = member.session.send(reply.clone()) {
                debug!("Board {}: dropped line for session {}: {}", board, id, e);
            }
        }
    }
}

/// What a newly joined session needs to catch up
///
/// Taken under the same lock as the join, so nothing in it is also
/// broadcast to the joiner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinSnapshot {
    /// Up to two most recent message ids, oldest first
    pub recent: Vec<MessageId>,
    /// Display names of the other members
    pub others: Vec<String>,
}

/// Bulletin board
#[derive(Debug)]
pub struct Board {
    name: String,
    state: Mutex<BoardState>,
}

impl Board {
    /// Create an empty board
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(BoardState::default()),
        }
    }

    /// Board name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a session under a display name
    ///
    /// Existing members are told `JOIN|board|name` before the session is
    /// added, so the joiner does not hear about itself. Sending the catch-up
    /// to the joiner is the caller's job; the returned snapshot holds it.
    /// Returns `None` if it was already a member.
    pub async fn join(&self, session: &Arc<Session>, display_name: &str) -> Option<JoinSnapshot> {
        let mut state = self.state.lock().await;
        if state.members.contains_key(&session.id) {
            return None;
        }

        let snapshot = JoinSnapshot {
            recent: state.recent_two(),
            others: state.users_except(session.id),
        };

        state.broadcast(
            &self.name,
            Reply::Join {
                group: self.name.clone(),
                name: display_name.to_string(),
            },
        );
        state.members.insert(
            session.id,
            Member {
                session: Arc::clone(session),
                display_name: display_name.to_string(),
            },
        );

        info!("Session {} joined {} as '{}'", session.id, self.name, display_name);
        Some(snapshot)
    }

    /// Remove a session
    ///
    /// The remaining members are told `LEAVE|board|name`.
    /// Returns the display name it had, or `None` if it was not a member.
    pub async fn leave(&self, session_id: SessionId) -> Option<String> {
        let mut state = self.state.lock().await;
        let member = state.members.remove(&session_id)?;

        state.broadcast(
            &self.name,
            Reply::Leave {
                group: self.name.clone(),
                name: member.display_name.clone(),
            },
        );

        info!(
            "Session {} left {} ('{}')",
            session_id, self.name, member.display_name
        );
        Some(member.display_name)
    }

    /// Post a message on behalf of a member
    ///
    /// Silently ignored for non-members. Every member, the poster included,
    /// is told `MESSAGE|board|id`.
    pub async fn post(
        &self,
        session_id: SessionId,
        subject: String,
        content: String,
    ) -> Option<MessageId> {
        let mut state = self.state.lock().await;
        let sender = state.members.get(&session_id)?.display_name.clone();

        // Generate an id not already used on this board
        let id = loop {
            let id = MessageId::generate();
            if !state.messages.contains_key(&id) {
                break id;
            }
        };

        let seq = state.next_seq;
        state.next_seq += 1;
        state.messages.insert(
            id,
            Entry {
                seq,
                message: Message::new(id, sender, subject, content),
            },
        );

        state.broadcast(
            &self.name,
            Reply::Message {
                group: self.name.clone(),
                id,
            },
        );

        debug!("Board {}: message {} posted by session {}", self.name, id, session_id);
        Some(id)
    }

    /// Display names of all current members
    pub async fn users(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .members
            .values()
            .map(|m| m.display_name.clone())
            .collect()
    }

    /// Display names of all current members other than `session_id`
    pub async fn users_except(&self, session_id: SessionId) -> Vec<String> {
        self.state.lock().await.users_except(session_id)
    }

    /// Ids of the (up to) two most recent messages, oldest first
    ///
    /// Ordered by timestamp, ties broken by posting order.
    pub async fn recent_two(&self) -> Vec<MessageId> {
        self.state.lock().await.recent_two()
    }

    /// Look up a message posted to this board
    pub async fn view(&self, id: MessageId) -> Option<Message> {
        let state = self.state.lock().await;
        state.messages.get(&id).map(|e| e.message.clone())
    }

    /// Whether the session is currently a member
    pub async fn is_member(&self, session_id: SessionId) -> bool {
        self.state.lock().await.members.contains_key(&session_id)
    }

    /// Number of current members
    pub async fn member_count(&self) -> usize {
        self.state.lock().await.members.len()
    }

    /// Number of archived messages
    pub async fn message_count(&self) -> usize {
        self.state.lock().await.messages.len()
    }
}
