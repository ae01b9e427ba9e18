//! Terminal stand-in for a chat platform: messages go to stdout and every
//! attached board image is written to disk.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::{debug, info};

use reversi_bot::error::MessagingError;
use reversi_bot::messaging::{Attachment, ChannelId, MessageHandle, Messenger, UserId};

pub const BOT_USER: &str = "reversi-bot";

pub struct ConsoleMessenger {
    out_dir: PathBuf,
    next_message: AtomicUsize,
    next_frame: AtomicUsize,
}

impl ConsoleMessenger {
    pub fn new(out_dir: PathBuf) -> Self {
        Self {
            out_dir,
            next_message: AtomicUsize::new(1),
            next_frame: AtomicUsize::new(0),
        }
    }

    fn save(&self, attachment: Attachment) -> Result<PathBuf, MessagingError> {
        let frame = self.next_frame.fetch_add(1, Ordering::Relaxed);
        let path = self
            .out_dir
            .join(format!("{frame:03}-{}", attachment.file_name));
        std::fs::write(&path, &attachment.bytes)
            .map_err(|e| MessagingError::other(format!("writing {}: {e}", path.display())))?;
        debug!(path = %path.display(), bytes = attachment.bytes.len(), "frame written");
        Ok(path)
    }

    fn print(&self, header: &str, content: &str, attachment: Option<Attachment>) -> Result<(), MessagingError> {
        println!("--- {header} ---");
        println!("{content}");
        if let Some(attachment) = attachment {
            let path = self.save(attachment)?;
            println!("[image: {}]", path.display());
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for ConsoleMessenger {
    async fn send(
        &self,
        channel_id: &ChannelId,
        content: &str,
        attachment: Option<Attachment>,
    ) -> Result<MessageHandle, MessagingError> {
        let id = self.next_message.fetch_add(1, Ordering::Relaxed);
        let handle = MessageHandle {
            channel_id: channel_id.clone(),
            message_id: format!("msg-{id}"),
        };
        self.print(&format!("#{channel_id} {}", handle.message_id), content, attachment)?;
        Ok(handle)
    }

    async fn edit(
        &self,
        message: &MessageHandle,
        content: &str,
        attachment: Option<Attachment>,
    ) -> Result<(), MessagingError> {
        self.print(&format!("#{} {} (edited)", message.channel_id, message.message_id), content, attachment)
    }

    async fn add_reaction(&self, message: &MessageHandle, emoji: &str) -> Result<(), MessagingError> {
        info!(message_id = %message.message_id, emoji, "reaction added");
        Ok(())
    }

    async fn remove_reaction(
        &self,
        message: &MessageHandle,
        emoji: &str,
        user_id: &UserId,
    ) -> Result<(), MessagingError> {
        info!(message_id = %message.message_id, emoji, user_id = %user_id, "reaction removed");
        Ok(())
    }

    fn bot_user(&self) -> UserId {
        BOT_USER.to_string()
    }
}
