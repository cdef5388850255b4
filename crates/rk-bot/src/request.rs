//! Who sent a command, and what it refers to.

use serde::{Deserialize, Serialize};

/// The sender of a command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Platform user id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Whether the user may manage this channel.
    #[serde(default)]
    pub is_manager: bool,
}

impl UserInfo {
    /// A regular user.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_manager: false,
        }
    }

    /// Mark the user as a channel manager.
    pub fn manager(mut self) -> Self {
        self.is_manager = true;
        self
    }
}

/// Everything about a command except its text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollRequest {
    /// The sender.
    pub user: UserInfo,
    /// User ids mentioned by the message, in order.
    pub mentions: Vec<String>,
    /// Id of the message this one replies to.
    pub reply_to: Option<String>,
}

impl RollRequest {
    /// A request from `user` with no mentions and no reply.
    pub fn new(user: UserInfo) -> Self {
        Self {
            user,
            mentions: Vec::new(),
            reply_to: None,
        }
    }

    /// Add a mentioned user id.
    pub fn with_mention(mut self, id: impl Into<String>) -> Self {
        self.mentions.push(id.into());
        self
    }

    /// Set the message this request replies to.
    pub fn replying_to(mut self, message_id: impl Into<String>) -> Self {
        self.reply_to = Some(message_id.into());
        self
    }
}
