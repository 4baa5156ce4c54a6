//! Grouping classifier: partitions fetched streams into destination buckets.

use serde::{Deserialize, Serialize};

use crate::{Platform, StreamRecord};

/// Talent affiliations routed to the Nijisanji destination.
const NIJISANJI_GROUPS: &[&str] = &[
    "nijisanji",
    "nijisanjijp",
    "nijisanjikr",
    "nijisanjiid",
    "nijisanjien",
    "nijisanjiin",
    "virtuareal",
];

/// Talent affiliations routed to the Hololive destination.
const HOLOPRO_GROUPS: &[&str] = &[
    "hololive",
    "hololiveid",
    "hololivecn",
    "hololiveen",
    "hololivejp",
    "holostars",
];

/// Bilibili coverage is intentionally partial: anything outside this
/// allow-list is dropped before bucketing.
const BILIBILI_ALLOWED_GROUPS: &[&str] = &["hololive", "nijisanji", "hololivecn", "virtuareal"];

/// One of the fixed destination groupings, each bound to at most one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBucket {
    Hololive,
    Nijisanji,
    Other,
}

impl GroupBucket {
    pub const ALL: [GroupBucket; 3] = [GroupBucket::Hololive, GroupBucket::Nijisanji, GroupBucket::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupBucket::Hololive => "hololive",
            GroupBucket::Nijisanji => "nijisanji",
            GroupBucket::Other => "other",
        }
    }

    /// Channel-label prefix used when renaming the destination channel.
    pub fn label_prefix(&self) -> &'static str {
        match self {
            GroupBucket::Hololive => "holo-",
            GroupBucket::Nijisanji => "nijisanji-",
            GroupBucket::Other => "others-",
        }
    }
}

impl std::fmt::Display for GroupBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Administrative per-platform enable switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformToggles {
    pub twitch: bool,
    pub twitcasting: bool,
}

impl Default for PlatformToggles {
    fn default() -> Self {
        Self {
            twitch: true,
            twitcasting: true,
        }
    }
}

impl PlatformToggles {
    fn allows(&self, platform: Platform) -> bool {
        match platform {
            Platform::Twitch => self.twitch,
            Platform::Twitcasting => self.twitcasting,
            Platform::Youtube | Platform::Bilibili => true,
        }
    }
}

/// Classifier output: one record list per destination bucket.
#[derive(Debug, Clone, Default)]
pub struct GroupedStreams {
    pub hololive: Vec<StreamRecord>,
    pub nijisanji: Vec<StreamRecord>,
    pub other: Vec<StreamRecord>,
}

impl GroupedStreams {
    pub fn get(&self, bucket: GroupBucket) -> &[StreamRecord] {
        match bucket {
            GroupBucket::Hololive => &self.hololive,
            GroupBucket::Nijisanji => &self.nijisanji,
            GroupBucket::Other => &self.other,
        }
    }

    fn bucket_mut(&mut self, bucket: GroupBucket) -> &mut Vec<StreamRecord> {
        match bucket {
            GroupBucket::Hololive => &mut self.hololive,
            GroupBucket::Nijisanji => &mut self.nijisanji,
            GroupBucket::Other => &mut self.other,
        }
    }

    pub fn total(&self) -> usize {
        self.hololive.len() + self.nijisanji.len() + self.other.len()
    }
}

pub fn is_nijisanji(group: &str) -> bool {
    NIJISANJI_GROUPS.contains(&group)
}

pub fn is_holopro(group: &str) -> bool {
    HOLOPRO_GROUPS.contains(&group)
}

/// Assign every record to exactly one bucket or drop it. Rules apply in
/// order, first match wins:
/// 1. affiliation is on the ignore list;
/// 2. bilibili record outside the bilibili allow-list;
/// 3. platform disabled by toggle;
/// 4. affiliation sets decide the bucket, unknown affiliations go to Other.
pub fn classify(
    records: Vec<StreamRecord>,
    ignore_groups: &[String],
    toggles: PlatformToggles,
) -> GroupedStreams {
    let mut grouped = GroupedStreams::default();
    for record in records {
        if ignore_groups.iter().any(|g| g == &record.group) {
            continue;
        }
        if record.platform == Platform::Bilibili
            && !BILIBILI_ALLOWED_GROUPS.contains(&record.group.as_str())
        {
            continue;
        }
        if !toggles.allows(record.platform) {
            continue;
        }
        let bucket = if is_nijisanji(&record.group) {
            GroupBucket::Nijisanji
        } else if is_holopro(&record.group) {
            GroupBucket::Hololive
        } else {
            GroupBucket::Other
        };
        grouped.bucket_mut(bucket).push(record);
    }
    grouped
}
