//! Per-group association between notification keys and posted messages.

use std::collections::BTreeMap;

use tracing::info;
use vtwatch_core::{ChannelRef, MessageRef, NotificationKey};

use crate::chat::{ChatClient, ChatError};

/// Tracks which message currently represents each notification key, plus the
/// last visible count used for channel-label decisions.
///
/// Seeded once from channel history; afterwards mutated only by applied plan
/// actions. If an external actor deletes a tracked message out-of-band the
/// store never learns of it until the process restarts.
#[derive(Debug, Default)]
pub struct NotificationStore {
    messages: BTreeMap<NotificationKey, MessageRef>,
    last_count: Option<usize>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracked(&self) -> &BTreeMap<NotificationKey, MessageRef> {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// One-time startup scan: keep only messages this bot authored, skip the
    /// group's schedule tracking message, and read each embed footer as the
    /// notification key.
    pub async fn seed_from_history(
        &mut self,
        chat: &dyn ChatClient,
        channel: ChannelRef,
        tracking_message: Option<MessageRef>,
    ) -> Result<(), ChatError> {
        let history = chat.fetch_history(channel).await?;
        for message in history {
            if !message.author_is_self {
                continue;
            }
            if tracking_message == Some(message.id) {
                continue;
            }
            let Some(footer) = message.footer_key else {
                continue;
            };
            self.messages.insert(NotificationKey::from(footer), message.id);
        }
        self.last_count = Some(self.messages.len());
        info!(%channel, tracked = self.messages.len(), "seeded notification store from history");
        Ok(())
    }

    pub fn record_post(&mut self, key: NotificationKey, message: MessageRef) {
        self.messages.insert(key, message);
    }

    /// Called after a delete action, whether or not the remote op succeeded:
    /// a missing message is already the desired outcome.
    pub fn record_delete(&mut self, key: &NotificationKey) {
        self.messages.remove(key);
    }

    /// Compare the fresh visible count against the last known one, adopting
    /// it either way. The first observation never reports a change so a
    /// restart does not rename the channel spuriously.
    pub fn observe_count(&mut self, count: usize) -> bool {
        let changed = match self.last_count {
            None => false,
            Some(previous) => previous != count,
        };
        self.last_count = Some(count);
        changed
    }
}
