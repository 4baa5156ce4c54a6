//! The two watch cycles: live-watch (one message per stream) and
//! upcoming-watch (one evolving schedule message per group).

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info, warn};
use vtwatch_core::{classify, ChannelRef, GroupBucket, Platform, StreamRecord};

use crate::chat::ChatClient;
use crate::config::{PerGroup, WatchConfig};
use crate::reconcile::reconcile;
use crate::render::render_live;
use crate::schedule::{build_schedule, ScheduleEmbed};
use crate::source::StreamSource;
use crate::store::NotificationStore;

/// One periodic cycle the scheduler drives to completion per tick.
#[async_trait]
pub trait WatchCycle: Send {
    fn name(&self) -> &'static str;
    async fn run_cycle(&mut self) -> Result<()>;
}

/// Channel label for a group's destination: live count when anything is on,
/// a quiet label otherwise.
pub fn group_label(bucket: GroupBucket, count: usize) -> String {
    let prefix = bucket.label_prefix();
    if count > 0 {
        format!("🔴-{prefix}{count}-live-now")
    } else {
        format!("{prefix}live")
    }
}

pub struct LiveWatcher {
    chat: Arc<dyn ChatClient>,
    source: Arc<dyn StreamSource>,
    config: WatchConfig,
    stores: PerGroup<NotificationStore>,
    seeded: bool,
}

impl LiveWatcher {
    pub fn new(
        chat: Arc<dyn ChatClient>,
        source: Arc<dyn StreamSource>,
        config: WatchConfig,
    ) -> Self {
        Self {
            chat,
            source,
            config,
            stores: PerGroup::default(),
            seeded: false,
        }
    }

    pub fn store(&self, bucket: GroupBucket) -> &NotificationStore {
        self.stores.get(bucket)
    }

    /// One-time history scan per configured group. A failure leaves `seeded`
    /// unset so the next cycle retries before touching anything.
    async fn seed_stores(&mut self) -> Result<()> {
        for bucket in GroupBucket::ALL {
            if let Some(channel) = *self.config.channels.get(bucket) {
                let tracking = *self.config.tracking_messages.get(bucket);
                self.stores
                    .get_mut(bucket)
                    .seed_from_history(self.chat.as_ref(), channel, tracking)
                    .await
                    .with_context(|| format!("scanning history for {bucket}"))?;
            }
        }
        self.seeded = true;
        Ok(())
    }

    async fn process_group(
        &mut self,
        bucket: GroupBucket,
        channel: ChannelRef,
        records: &[StreamRecord],
    ) {
        let store = self.stores.get_mut(bucket);
        let plan = reconcile(store.tracked(), records);
        if !plan.is_empty() {
            info!(
                group = %bucket,
                deletes = plan.deletes.len(),
                posts = plan.posts.len(),
                "applying reconciliation plan"
            );
        }

        // Every delete is issued and observed before any post begins, so a
        // replaced entry never shows up twice.
        for (key, message) in &plan.deletes {
            warn!(group = %bucket, %key, "deleting stale notification");
            if let Err(err) = self.chat.delete_message(channel, *message).await {
                error!(group = %bucket, %key, "failed to delete, possibly gone: {err}");
            }
            store.record_delete(key);
        }

        for record in &plan.posts {
            let key = record.key();
            let embed = match render_live(record) {
                Ok(embed) => embed,
                Err(err) => {
                    warn!(group = %bucket, %key, "skipping unrenderable stream: {err}");
                    continue;
                }
            };
            warn!(group = %bucket, %key, "posting new notification");
            match self.chat.post_notification(channel, &embed).await {
                Ok(message) => store.record_post(key, message),
                Err(err) => error!(group = %bucket, %key, "failed to post: {err}"),
            }
        }

        if store.observe_count(plan.live_count) {
            let label = group_label(bucket, plan.live_count);
            info!(group = %bucket, label, "live count changed, renaming channel");
            if let Err(err) = self.chat.rename_channel(channel, &label).await {
                error!(group = %bucket, "failed to rename channel: {err}");
            }
        }
    }
}

#[async_trait]
impl WatchCycle for LiveWatcher {
    fn name(&self) -> &'static str {
        "live"
    }

    async fn run_cycle(&mut self) -> Result<()> {
        if !self.config.any_live_channel() {
            warn!("no destination channel configured, skipping live cycle");
            return Ok(());
        }
        if !self.seeded {
            self.seed_stores().await.context("seeding notification stores")?;
        }

        let lives = self
            .source
            .fetch_lives()
            .await
            .context("fetching live streams")?;
        info!(total = lives.len(), "fetched live streams");

        let grouped = classify(lives, &self.config.ignore_groups, self.config.platforms);
        for bucket in GroupBucket::ALL {
            if let Some(channel) = *self.config.channels.get(bucket) {
                self.process_group(bucket, channel, grouped.get(bucket)).await;
            }
        }
        Ok(())
    }
}

pub struct UpcomingWatcher {
    chat: Arc<dyn ChatClient>,
    source: Arc<dyn StreamSource>,
    config: WatchConfig,
}

impl UpcomingWatcher {
    pub fn new(
        chat: Arc<dyn ChatClient>,
        source: Arc<dyn StreamSource>,
        config: WatchConfig,
    ) -> Self {
        Self { chat, source, config }
    }

    /// The schedule covers YouTube everywhere and bilibili only for the
    /// dedicated affiliate groups.
    fn schedulable(bucket: GroupBucket, platform: Platform) -> bool {
        match platform {
            Platform::Youtube => true,
            Platform::Bilibili => bucket != GroupBucket::Other,
            Platform::Twitch | Platform::Twitcasting => false,
        }
    }
}

#[async_trait]
impl WatchCycle for UpcomingWatcher {
    fn name(&self) -> &'static str {
        "upcoming"
    }

    async fn run_cycle(&mut self) -> Result<()> {
        if !self.config.any_tracking_message() {
            warn!("no tracking message configured, skipping upcoming cycle");
            return Ok(());
        }

        let upcoming = self
            .source
            .fetch_upcoming()
            .await
            .context("fetching upcoming streams")?;
        info!(total = upcoming.len(), "fetched upcoming streams");

        let grouped = classify(upcoming, &self.config.ignore_groups, self.config.platforms);
        let now = Utc::now().timestamp();

        for bucket in GroupBucket::ALL {
            let (Some(channel), Some(tracking)) = (
                *self.config.channels.get(bucket),
                *self.config.tracking_messages.get(bucket),
            ) else {
                continue;
            };

            let records: Vec<StreamRecord> = grouped
                .get(bucket)
                .iter()
                .filter(|r| Self::schedulable(bucket, r.platform))
                .cloned()
                .collect();
            let body = build_schedule(&records, now);
            let embed = ScheduleEmbed::new(bucket, body, now);

            info!(group = %bucket, entries = records.len(), "updating schedule message");
            if let Err(err) = self.chat.edit_message(channel, tracking, &embed).await {
                error!(group = %bucket, "failed to update schedule message: {err}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use vtwatch_api::FetchError;
    use vtwatch_core::{ChannelInfo, MessageRef, NotificationKey};

    use crate::chat::{ChatError, HistoryMessage};
    use crate::render::LiveEmbed;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Delete(MessageRef),
        Post(String),
        Rename(String),
        Edit(MessageRef, String),
    }

    #[derive(Default)]
    struct RecordingChat {
        history: Vec<HistoryMessage>,
        fail_deletes: bool,
        ops: Mutex<Vec<Op>>,
    }

    impl RecordingChat {
        fn ops(&self) -> Vec<Op> {
            self.ops.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatClient for RecordingChat {
        async fn post_notification(
            &self,
            _channel: ChannelRef,
            embed: &LiveEmbed,
        ) -> Result<MessageRef, ChatError> {
            let mut ops = self.ops.lock().unwrap();
            ops.push(Op::Post(embed.footer_text.clone()));
            Ok(MessageRef(100 + ops.len() as u64))
        }

        async fn delete_message(
            &self,
            channel: ChannelRef,
            message: MessageRef,
        ) -> Result<(), ChatError> {
            self.ops.lock().unwrap().push(Op::Delete(message));
            if self.fail_deletes {
                return Err(ChatError::MessageGone { channel, message });
            }
            Ok(())
        }

        async fn post_schedule(
            &self,
            _channel: ChannelRef,
            _embed: &ScheduleEmbed,
        ) -> Result<MessageRef, ChatError> {
            Ok(MessageRef(999))
        }

        async fn edit_message(
            &self,
            _channel: ChannelRef,
            message: MessageRef,
            embed: &ScheduleEmbed,
        ) -> Result<(), ChatError> {
            self.ops
                .lock()
                .unwrap()
                .push(Op::Edit(message, embed.body.clone()));
            Ok(())
        }

        async fn rename_channel(
            &self,
            _channel: ChannelRef,
            label: &str,
        ) -> Result<(), ChatError> {
            self.ops.lock().unwrap().push(Op::Rename(label.to_string()));
            Ok(())
        }

        async fn fetch_history(
            &self,
            _channel: ChannelRef,
        ) -> Result<Vec<HistoryMessage>, ChatError> {
            Ok(self.history.clone())
        }
    }

    struct StaticSource {
        lives: Vec<StreamRecord>,
        upcoming: Vec<StreamRecord>,
        fail: bool,
    }

    #[async_trait]
    impl StreamSource for StaticSource {
        async fn fetch_lives(&self) -> Result<Vec<StreamRecord>, FetchError> {
            if self.fail {
                return Err(FetchError::Timeout);
            }
            Ok(self.lives.clone())
        }

        async fn fetch_upcoming(&self) -> Result<Vec<StreamRecord>, FetchError> {
            if self.fail {
                return Err(FetchError::Timeout);
            }
            Ok(self.upcoming.clone())
        }
    }

    fn mk_record(id: &str, group: &str) -> StreamRecord {
        StreamRecord {
            id: id.to_string(),
            room_id: None,
            title: format!("stream {id}"),
            thumbnail: Some("https://thumb".into()),
            start_time: 1_700_000_000,
            group: group.to_string(),
            channel: ChannelInfo {
                id: format!("ch-{id}"),
                name: format!("Channel {id}"),
                en_name: None,
                image: None,
            },
            platform: Platform::Youtube,
            is_member: false,
            is_premiere: false,
        }
    }

    fn history_msg(id: u64, footer: &str) -> HistoryMessage {
        HistoryMessage {
            id: MessageRef(id),
            author_is_self: true,
            footer_key: Some(footer.to_string()),
        }
    }

    fn holo_config() -> WatchConfig {
        let mut config = WatchConfig::default();
        config.channels.hololive = Some(ChannelRef(10));
        config
    }

    #[tokio::test]
    async fn deletes_run_before_posts_and_store_follows() {
        let chat = Arc::new(RecordingChat {
            history: vec![history_msg(1, "A"), history_msg(2, "B")],
            ..Default::default()
        });
        let source = Arc::new(StaticSource {
            lives: vec![mk_record("B", "hololive"), mk_record("C", "hololive")],
            upcoming: vec![],
            fail: false,
        });
        let mut watcher = LiveWatcher::new(chat.clone(), source, holo_config());
        watcher.run_cycle().await.unwrap();

        let ops = chat.ops();
        let delete_pos = ops.iter().position(|op| *op == Op::Delete(MessageRef(1)));
        let post_pos = ops.iter().position(|op| *op == Op::Post("C".into()));
        assert!(delete_pos.unwrap() < post_pos.unwrap());

        let store = watcher.store(GroupBucket::Hololive);
        assert_eq!(store.len(), 2);
        let tracked = store.tracked();
        assert!(tracked.contains_key(&NotificationKey::derive(Platform::Youtube, "B")));
        assert!(tracked.contains_key(&NotificationKey::derive(Platform::Youtube, "C")));
    }

    #[tokio::test]
    async fn failed_delete_does_not_stop_sibling_actions() {
        let chat = Arc::new(RecordingChat {
            history: vec![history_msg(1, "A")],
            fail_deletes: true,
            ..Default::default()
        });
        let source = Arc::new(StaticSource {
            lives: vec![mk_record("C", "hololive")],
            upcoming: vec![],
            fail: false,
        });
        let mut watcher = LiveWatcher::new(chat.clone(), source, holo_config());
        watcher.run_cycle().await.unwrap();

        let ops = chat.ops();
        assert!(ops.contains(&Op::Delete(MessageRef(1))));
        assert!(ops.contains(&Op::Post("C".into())));
        // The gone message counts as deleted.
        let store = watcher.store(GroupBucket::Hololive);
        assert!(!store
            .tracked()
            .contains_key(&NotificationKey::derive(Platform::Youtube, "A")));
    }

    #[tokio::test]
    async fn fetch_failure_aborts_the_cycle_and_leaves_state_untouched() {
        let chat = Arc::new(RecordingChat {
            history: vec![history_msg(1, "A")],
            ..Default::default()
        });
        let source = Arc::new(StaticSource {
            lives: vec![],
            upcoming: vec![],
            fail: true,
        });
        let mut watcher = LiveWatcher::new(chat.clone(), source, holo_config());
        assert!(watcher.run_cycle().await.is_err());

        // Seeded state survives; no message operations were attempted.
        assert_eq!(watcher.store(GroupBucket::Hololive).len(), 1);
        assert!(chat.ops().is_empty());
    }

    #[tokio::test]
    async fn count_change_renames_with_the_group_label() {
        let chat = Arc::new(RecordingChat::default());
        let source = Arc::new(StaticSource {
            lives: vec![mk_record("A", "hololive")],
            upcoming: vec![],
            fail: false,
        });
        let mut watcher = LiveWatcher::new(chat.clone(), source, holo_config());
        watcher.run_cycle().await.unwrap();

        assert!(chat.ops().contains(&Op::Rename("🔴-holo-1-live-now".into())));
    }

    #[tokio::test]
    async fn unconfigured_groups_are_skipped_entirely() {
        let chat = Arc::new(RecordingChat::default());
        let source = Arc::new(StaticSource {
            lives: vec![mk_record("N", "nijisanji")],
            upcoming: vec![],
            fail: false,
        });
        // Only the hololive destination is configured; the nijisanji stream
        // must not produce any operation.
        let mut watcher = LiveWatcher::new(chat.clone(), source, holo_config());
        watcher.run_cycle().await.unwrap();

        assert!(!chat.ops().iter().any(|op| matches!(op, Op::Post(_))));
    }

    #[tokio::test]
    async fn upcoming_cycle_replaces_the_tracking_message_body() {
        let chat = Arc::new(RecordingChat::default());
        let now = Utc::now().timestamp();
        let mut future = mk_record("U", "hololive");
        future.start_time = now + 3600;
        let source = Arc::new(StaticSource {
            lives: vec![],
            upcoming: vec![future],
            fail: false,
        });
        let mut config = holo_config();
        config.tracking_messages.hololive = Some(MessageRef(42));

        let mut watcher = UpcomingWatcher::new(chat.clone(), source, config);
        watcher.run_cycle().await.unwrap();

        let ops = chat.ops();
        let edit = ops.iter().find_map(|op| match op {
            Op::Edit(msg, body) => Some((msg, body)),
            _ => None,
        });
        let (msg, body) = edit.expect("schedule message edited");
        assert_eq!(*msg, MessageRef(42));
        assert!(body.contains("https://youtu.be/U"));
        assert!(body.len() <= crate::schedule::MAX_BODY_LEN);
    }

    #[test]
    fn quiet_label_when_nothing_is_live() {
        assert_eq!(group_label(GroupBucket::Hololive, 0), "holo-live");
        assert_eq!(group_label(GroupBucket::Other, 3), "🔴-others-3-live-now");
    }
}
