//! WebSocket Protocol Types
//!
//! JSON frames exchanged between browser clients and the relay.
//! Clients send `{action, username, message}`; the relay answers with
//! `{action, message, message_type, connected_users}`.

use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::RelayError;

/// Greeting delivered to a connection right after its upgrade completes.
pub const CONNECTED_MESSAGE: &str = "Connected to server";

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a live connection, handed out from a process-wide counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocate the next unused id.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for ConnectionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a client asks the relay to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientAction {
    /// Set the display name for this connection
    #[serde(rename = "username")]
    Identify,
    /// The client is going away
    #[serde(rename = "left")]
    Leave,
    /// Relay a chat line to everyone
    #[serde(rename = "broadcast")]
    Broadcast,
}

/// Messages sent FROM the client TO the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMessage {
    pub action: ClientAction,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub message: String,
}

impl ClientMessage {
    pub fn into_event(self, source: ConnectionId) -> InboundEvent {
        InboundEvent {
            kind: self.action,
            username: self.username,
            message: self.message,
            source,
        }
    }
}

/// A decoded client message tagged with the connection it arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub kind: ClientAction,
    pub username: String,
    pub message: String,
    pub source: ConnectionId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerAction {
    ListUsers,
    Broadcast,
}

/// Messages sent FROM the server TO the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundNotification {
    pub action: ServerAction,
    #[serde(default)]
    pub message: String,
    /// Reserved by the browser client; always empty.
    #[serde(default)]
    pub message_type: String,
    #[serde(default)]
    pub connected_users: Vec<String>,
}

impl OutboundNotification {
    /// The greeting a new connection receives before anything else.
    pub fn connected() -> Self {
        Self {
            action: ServerAction::Broadcast,
            message: CONNECTED_MESSAGE.to_string(),
            message_type: String::new(),
            connected_users: Vec::new(),
        }
    }

    pub fn user_list(connected_users: Vec<String>) -> Self {
        Self {
            action: ServerAction::ListUsers,
            message: String::new(),
            message_type: String::new(),
            connected_users,
        }
    }

    /// A chat line rendered as `"<username>: <message>"`.
    pub fn chat(username: &str, message: &str, connected_users: Vec<String>) -> Self {
        Self {
            action: ServerAction::Broadcast,
            message: format!("{username}: {message}"),
            message_type: String::new(),
            connected_users,
        }
    }

    /// Encode as a WebSocket text frame.
    pub fn to_message(&self) -> Result<Message, RelayError> {
        let json = serde_json::to_string(self)?;
        Ok(Message::Text(json.into()))
    }
}
