//! Session struct definition
//!
//! Server-side state for one client connection: its identity, lifecycle
//! state, the set of boards it has joined, and its outbound channel.
//!
//! The outbound channel is drained by a single writer task (see
//! [`crate::handler`]), so concurrent senders never interleave lines.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use crate::error::SendError;
use crate::protocol::Reply;
use crate::types::SessionId;

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Streams being set up
    Connecting,
    /// Read loop running, commands dispatched
    Active,
    /// Input finished; waiting for tasks and leaving boards
    Draining,
    /// Outbound path closed, no more sends
    Closed,
}

/// Connected session
///
/// Shared as `Arc<Session>` by the read loop, every command task it spawns
/// and every board it is a member of.
#[derive(Debug)]
pub struct Session {
    /// Unique identifier for this session
    pub id: SessionId,
    /// Remote address, for logs
    pub peer: String,
    state: Mutex<SessionState>,
    /// Boards this session considers itself joined to.
    ///
    /// Held across the board call by JOIN and LEAVE, so the lock order is
    /// always session set → board.
    joined: AsyncMutex<HashSet<String>>,
    /// Server → Client channel, `None` once closed
    outbound: Mutex<Option<mpsc::UnboundedSender<Reply>>>,
}

impl Session {
    /// Create a new session writing to the given channel
    pub fn new(peer: impl Into<String>, outbound: mpsc::UnboundedSender<Reply>) -> Self {
        Self {
            id: SessionId::new(),
            peer: peer.into(),
            state: Mutex::new(SessionState::Connecting),
            joined: AsyncMutex::new(HashSet::new()),
            outbound: Mutex::new(Some(outbound)),
        }
    }

    /// Send a line to this session
    ///
    /// Never blocks. Returns an error once the session is closed or its
    /// writer has gone away.
    pub fn send(&self, reply: Reply) -> Result<(), SendError> {
        let outbound = self.outbound.lock().unwrap_or_else(PoisonError::into_inner);
        match outbound.as_ref() {
            Some(tx) => tx.send(reply).map_err(|_| SendError::Closed),
            None => Err(SendError::Closed),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to a new lifecycle state
    pub fn set_state(&self, next: SessionState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        debug!("Session {} {:?} -> {:?}", self.id, *state, next);
        *state = next;
    }

    /// Close the outbound path and enter `Closed`
    ///
    /// Dropping the sender lets the writer task flush what is queued and exit.
    pub fn close(&self) {
        self.outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.set_state(SessionState::Closed);
    }

    /// Lock the joined-board set
    pub async fn joined(&self) -> tokio::sync::MutexGuard<'_, HashSet<String>> {
        self.joined.lock().await
    }

    /// Whether this session has joined the named board
    pub async fn has_joined(&self, group: &str) -> bool {
        self.joined.lock().await.contains(group)
    }

    /// Snapshot of joined board names
    pub async fn joined_boards(&self) -> Vec<String> {
        self.joined.lock().await.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_creation() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = Session::new("127.0.0.1:1", tx);

        assert_eq!(session.state(), SessionState::Connecting);
        assert!(session.joined_boards().await.is_empty());
        assert!(!session.has_joined("Public").await);
    }

    #[tokio::test]
    async fn test_send_delivers_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Session::new("peer", tx);

        session.send(Reply::Ping).unwrap();
        session.send(Reply::Groups(vec!["Public".to_string()])).unwrap();

        assert_eq!(rx.recv().await, Some(Reply::Ping));
        assert_eq!(
            rx.recv().await,
            Some(Reply::Groups(vec!["Public".to_string()]))
        );
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Session::new("peer", tx);

        session.close();

        assert_eq!(session.state(), SessionState::Closed);
        assert!(matches!(session.send(Reply::Ping), Err(SendError::Closed)));
        // Sender dropped: the writer side observes end of channel
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_send_to_dropped_writer_fails() {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session::new("peer", tx);
        drop(rx);

        assert!(session.send(Reply::Ping).is_err());
    }
}
