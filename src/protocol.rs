//! Wire protocol definitions
//!
//! UTF-8, newline-delimited, `|`-separated fields with the verb first.
//! Inbound lines parse into [`Command`]; outbound lines are rendered
//! from [`Reply`] through `Display`.
//!
//! Parsing is fail-quiet: anything that is not an exact, well-formed
//! command yields `None` and the caller drops it.

use std::fmt;

use crate::message::Message;
use crate::types::MessageId;

/// Client → Server command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List every board
    Groups,
    /// Join a board under a display name
    Join { group: String, name: String },
    /// Post to a joined board
    Post {
        group: String,
        subject: String,
        content: String,
    },
    /// Leave a joined board
    Leave { group: String },
    /// Fetch a message from a joined board
    View { group: String, id: MessageId },
    /// List the members of a joined board
    Users { group: String },
    /// Liveness check
    Ping,
    /// End the session (handled by the read loop, never dispatched)
    Exit,
}

impl Command {
    /// Parse one inbound line
    ///
    /// Field counts are exact, except that POST content keeps any
    /// further `|` characters.
    pub fn parse(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split('|').collect();

        let command = match fields.as_slice() {
            ["GROUPS"] => Command::Groups,
            ["PING"] => Command::Ping,
            ["EXIT"] => Command::Exit,
            ["JOIN", group, name] => Command::Join {
                group: required(group)?,
                name: required(name)?,
            },
            ["LEAVE", group] => Command::Leave {
                group: required(group)?,
            },
            ["USERS", group] => Command::Users {
                group: required(group)?,
            },
            ["VIEW", group, id] => Command::View {
                group: required(group)?,
                id: id.parse().ok()?,
            },
            ["POST", group, subject, _, ..] => Command::Post {
                group: required(group)?,
                subject: subject.to_string(),
                content: line.splitn(4, '|').nth(3)?.to_string(),
            },
            _ => return None,
        };

        Some(command)
    }
}

fn required(field: &str) -> Option<String> {
    (!field.is_empty()).then(|| field.to_string())
}

/// Server → Client line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `GROUPS|<name>|...`
    Groups(Vec<String>),
    /// `JOIN|<group>|<name>`
    Join { group: String, name: String },
    /// `LEAVE|<group>|<name>`
    Leave { group: String, name: String },
    /// `MESSAGE|<group>|<id>`
    Message { group: String, id: MessageId },
    /// `VIEW|<group>|<id>|<sender>|<timestamp>|<subject>|<content>`
    View { group: String, message: Message },
    /// `USERS|<group>|<name>|...`
    Users { group: String, names: Vec<String> },
    /// `PING`
    Ping,
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Groups(names) => {
                f.write_str("GROUPS")?;
                for name in names {
                    write!(f, "|{}", name)?;
                }
                Ok(())
            }
            Reply::Join { group, name } => write!(f, "JOIN|{}|{}", group, name),
            Reply::Leave { group, name } => write!(f, "LEAVE|{}|{}", group, name),
            Reply::Message { group, id } => write!(f, "MESSAGE|{}|{}", group, id),
            Reply::View { group, message } => write!(
                f,
                "VIEW|{}|{}|{}|{}|{}|{}",
                group,
                message.id,
                message.sender,
                message.timestamp(),
                message.subject,
                message.content
            ),
            Reply::Users { group, names } => {
                write!(f, "USERS|{}", group)?;
                for name in names {
                    write!(f, "|{}", name)?;
                }
                Ok(())
            }
            Reply::Ping => f.write_str("PING"),
        }
    }
}
