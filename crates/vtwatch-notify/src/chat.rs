//! Chat-platform seam. The deployment supplies the real transport; this
//! crate only needs the operations below, each independently fallible.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;
use vtwatch_core::{ChannelRef, MessageRef};

use crate::render::LiveEmbed;
use crate::schedule::ScheduleEmbed;

#[derive(Debug, Error)]
pub enum ChatError {
    /// The target message no longer exists; deletes treat this as satisfied.
    #[error("message {message} in channel {channel} is gone")]
    MessageGone {
        channel: ChannelRef,
        message: MessageRef,
    },
    #[error("chat operation {op} failed: {reason}")]
    Op { op: &'static str, reason: String },
}

/// One message seen while scanning channel history at startup.
#[derive(Debug, Clone)]
pub struct HistoryMessage {
    pub id: MessageRef,
    pub author_is_self: bool,
    /// Embed footer text, which the live renderer sets to the notification key.
    pub footer_key: Option<String>,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn post_notification(
        &self,
        channel: ChannelRef,
        embed: &LiveEmbed,
    ) -> Result<MessageRef, ChatError>;

    async fn delete_message(
        &self,
        channel: ChannelRef,
        message: MessageRef,
    ) -> Result<(), ChatError>;

    /// Post a fresh schedule message (the init flow's placeholder).
    async fn post_schedule(
        &self,
        channel: ChannelRef,
        embed: &ScheduleEmbed,
    ) -> Result<MessageRef, ChatError>;

    async fn edit_message(
        &self,
        channel: ChannelRef,
        message: MessageRef,
        embed: &ScheduleEmbed,
    ) -> Result<(), ChatError>;

    async fn rename_channel(&self, channel: ChannelRef, label: &str) -> Result<(), ChatError>;

    async fn fetch_history(&self, channel: ChannelRef) -> Result<Vec<HistoryMessage>, ChatError>;
}

/// Logging-only transport for config validation runs. Every operation
/// succeeds; posts hand out synthetic message ids.
#[derive(Debug, Default)]
pub struct DryRunChat {
    next_message_id: AtomicU64,
}

#[async_trait]
impl ChatClient for DryRunChat {
    async fn post_notification(
        &self,
        channel: ChannelRef,
        embed: &LiveEmbed,
    ) -> Result<MessageRef, ChatError> {
        let id = MessageRef(self.next_message_id.fetch_add(1, Ordering::Relaxed) + 1);
        info!(%channel, message = %id, title = %embed.title, key = %embed.footer_text, "dry-run: post notification");
        Ok(id)
    }

    async fn delete_message(
        &self,
        channel: ChannelRef,
        message: MessageRef,
    ) -> Result<(), ChatError> {
        info!(%channel, %message, "dry-run: delete message");
        Ok(())
    }

    async fn post_schedule(
        &self,
        channel: ChannelRef,
        embed: &ScheduleEmbed,
    ) -> Result<MessageRef, ChatError> {
        let id = MessageRef(self.next_message_id.fetch_add(1, Ordering::Relaxed) + 1);
        info!(%channel, message = %id, body_len = embed.body.len(), "dry-run: post schedule message");
        Ok(id)
    }

    async fn edit_message(
        &self,
        channel: ChannelRef,
        message: MessageRef,
        embed: &ScheduleEmbed,
    ) -> Result<(), ChatError> {
        info!(%channel, %message, body_len = embed.body.len(), "dry-run: edit schedule message");
        Ok(())
    }

    async fn rename_channel(&self, channel: ChannelRef, label: &str) -> Result<(), ChatError> {
        info!(%channel, label, "dry-run: rename channel");
        Ok(())
    }

    async fn fetch_history(&self, channel: ChannelRef) -> Result<Vec<HistoryMessage>, ChatError> {
        info!(%channel, "dry-run: fetch history (empty)");
        Ok(Vec::new())
    }
}
