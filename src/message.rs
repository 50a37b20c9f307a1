//! Posted message value
//!
//! One immutable record per successful POST.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::types::MessageId;

/// A message posted to a board
///
/// Identity is `id`, which is only unique within the owning board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Board-scoped identifier
    pub id: MessageId,
    /// Display name the poster used on the board
    pub sender: String,
    /// Wall-clock time of posting
    pub posted_at: DateTime<Utc>,
    /// Subject line
    pub subject: String,
    /// Body text
    pub content: String,
}

impl Message {
    /// Create a message stamped with the current time
    pub fn new(id: MessageId, sender: String, subject: String, content: String) -> Self {
        Self::with_timestamp(id, sender, Utc::now(), subject, content)
    }

    /// Create a message with an explicit timestamp
    pub fn with_timestamp(
        id: MessageId,
        sender: String,
        posted_at: DateTime<Utc>,
        subject: String,
        content: String,
    ) -> Self {
        Self {
            id,
            sender,
            posted_at,
            subject,
            content,
        }
    }

    /// ISO-8601 instant, e.g. `2024-05-01T12:30:00.250Z`
    pub fn timestamp(&self) -> String {
        self.posted_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}
