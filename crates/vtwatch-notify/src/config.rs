//! Persisted watcher configuration, loaded once at boot and written back
//! only by the explicit init flow.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use vtwatch_core::{ChannelRef, GroupBucket, MessageRef, PlatformToggles};

/// One value per destination group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerGroup<T> {
    pub hololive: T,
    pub nijisanji: T,
    pub other: T,
}

impl<T> PerGroup<T> {
    pub fn get(&self, bucket: GroupBucket) -> &T {
        match bucket {
            GroupBucket::Hololive => &self.hololive,
            GroupBucket::Nijisanji => &self.nijisanji,
            GroupBucket::Other => &self.other,
        }
    }

    pub fn get_mut(&mut self, bucket: GroupBucket) -> &mut T {
        match bucket {
            GroupBucket::Hololive => &mut self.hololive,
            GroupBucket::Nijisanji => &mut self.nijisanji,
            GroupBucket::Other => &mut self.other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Destination channel per group; a group without one is skipped.
    pub channels: PerGroup<Option<ChannelRef>>,
    /// The single evolving schedule message per group (upcoming-watch).
    #[serde(default)]
    pub tracking_messages: PerGroup<Option<MessageRef>>,
    /// Talent affiliations dropped before bucketing.
    #[serde(default)]
    pub ignore_groups: Vec<String>,
    #[serde(default)]
    pub platforms: PlatformToggles,
    #[serde(default = "default_live_interval")]
    pub live_interval_secs: u64,
    #[serde(default = "default_upcoming_interval")]
    pub upcoming_interval_secs: u64,
}

fn default_live_interval() -> u64 {
    60
}

fn default_upcoming_interval() -> u64 {
    180
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            channels: PerGroup::default(),
            tracking_messages: PerGroup::default(),
            ignore_groups: Vec::new(),
            platforms: PlatformToggles::default(),
            live_interval_secs: default_live_interval(),
            upcoming_interval_secs: default_upcoming_interval(),
        }
    }
}

impl WatchConfig {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self).context("serializing watch config")?;
        fs::write(path, text)
            .await
            .with_context(|| format!("writing {}", path.display()))
    }

    pub fn any_live_channel(&self) -> bool {
        GroupBucket::ALL
            .iter()
            .any(|bucket| self.channels.get(*bucket).is_some())
    }

    pub fn any_tracking_message(&self) -> bool {
        GroupBucket::ALL
            .iter()
            .any(|bucket| self.tracking_messages.get(*bucket).is_some())
    }
}
