//!
//! This module defines the envelopes published to connected clients.
//!
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::error::ClientError;

/// Envelope schema version understood by connected clients.
pub const MESSAGE_VERSION: u32 = 1;

/// Correlation identifier attached to every outbound envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Mint a random (version 4) identifier from the operating system's CSPRNG.
    ///
    /// # Errors
    /// Raise ClientError::MessageId if the OS random source is unavailable.
    pub fn generate() -> Result<Self, ClientError> {
        let mut bytes = [0u8; 16];
        OsRng.try_fill_bytes(&mut bytes)?;
        Ok(MessageId(uuid::Builder::from_random_bytes(bytes).into_uuid()))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Command,
    Data,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Ping,
    Disconnect,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Ping => f.write_str("ping"),
            Command::Disconnect => f.write_str("disconnect"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CommandMessageContent {
    pub command: Command,
}

/// Envelope carrying an operational command such as `ping` or `disconnect`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ControlMessage {
    pub message_type: MessageType,
    pub message_id: MessageId,
    pub version: u32,

    // Construction time, not transmission time
    pub sent: DateTime<Utc>,

    pub content: CommandMessageContent,
}

impl ControlMessage {
    pub fn new(command: Command) -> Result<Self, ClientError> {
        Ok(ControlMessage {
            message_type: MessageType::Command,
            message_id: MessageId::generate()?,
            version: MESSAGE_VERSION,
            sent: Utc::now(),
            content: CommandMessageContent { command },
        })
    }
}

/// Envelope carrying a directive and an application payload.
///
/// `metadata` and `content` are opaque to the proxy: they are forwarded exactly as supplied.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DataMessage {
    pub message_type: MessageType,
    pub message_id: MessageId,
    pub version: u32,
    pub sent: DateTime<Utc>,
    pub metadata: Value,
    pub directive: String,
    pub content: Value,
}

impl DataMessage {
    pub fn new(directive: &str, metadata: Value, content: Value) -> Result<Self, ClientError> {
        Ok(DataMessage {
            message_type: MessageType::Data,
            message_id: MessageId::generate()?,
            version: MESSAGE_VERSION,
            sent: Utc::now(),
            metadata,
            directive: directive.to_owned(),
            content,
        })
    }
}
