//! Contract with the chat platform the bot runs on.

use std::fmt;

use async_trait::async_trait;
use crate::error::MessagingError;

pub type ChannelId = String;
pub type UserId = String;
pub type MessageId = String;

/// A posted message the bot can later edit or react to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

/// A file sent alongside a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn png(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Operations the game needs from the messaging platform. Every call is a
/// suspension point; implementations map platform permission failures to
/// [`MessagingError::PermissionDenied`].
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(
        &self,
        channel_id: &ChannelId,
        content: &str,
        attachment: Option<Attachment>,
    ) -> Result<MessageHandle, MessagingError>;

    async fn edit(
        &self,
        message: &MessageHandle,
        content: &str,
        attachment: Option<Attachment>,
    ) -> Result<(), MessagingError>;

    async fn add_reaction(&self, message: &MessageHandle, emoji: &str) -> Result<(), MessagingError>;

    async fn remove_reaction(
        &self,
        message: &MessageHandle,
        emoji: &str,
        user_id: &UserId,
    ) -> Result<(), MessagingError>;

    /// The bot's own user id, used to revoke its reactions and to ignore the
    /// echo of reactions it adds.
    fn bot_user(&self) -> UserId;
}

/// Reactions the game understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReactionEmoji {
    /// Selects the n-th move of the current page.
    Digit(u8),
    Prev,
    Next,
}

const KEYCAPS: [&str; 10] = [
    "0\u{FE0F}\u{20E3}",
    "1\u{FE0F}\u{20E3}",
    "2\u{FE0F}\u{20E3}",
    "3\u{FE0F}\u{20E3}",
    "4\u{FE0F}\u{20E3}",
    "5\u{FE0F}\u{20E3}",
    "6\u{FE0F}\u{20E3}",
    "7\u{FE0F}\u{20E3}",
    "8\u{FE0F}\u{20E3}",
    "9\u{FE0F}\u{20E3}",
];
const PREV: &str = "\u{25C0}\u{FE0F}";
const NEXT: &str = "\u{25B6}\u{FE0F}";

impl ReactionEmoji {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Digit(d) => KEYCAPS[d as usize % KEYCAPS.len()],
            Self::Prev => PREV,
            Self::Next => NEXT,
        }
    }

    /// Platforms are inconsistent about the variation selector, so it is
    /// optional on input.
    pub fn parse(emoji: &str) -> Option<Self> {
        let bare: String = emoji.chars().filter(|&c| c != '\u{FE0F}').collect();
        match bare.as_str() {
            "\u{25C0}" => Some(Self::Prev),
            "\u{25B6}" => Some(Self::Next),
            _ => {
                let mut chars = bare.chars();
                let digit = chars.next()?.to_digit(10)?;
                (chars.next() == Some('\u{20E3}') && chars.next().is_none())
                    .then_some(Self::Digit(digit as u8))
            }
        }
    }
}

impl fmt::Display for ReactionEmoji {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
