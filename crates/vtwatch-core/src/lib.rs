//! Core domain model for vtwatch: stream records, notification keys, grouping.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod classify;

pub use classify::{classify, GroupBucket, GroupedStreams, PlatformToggles};

pub const CRATE_NAME: &str = "vtwatch-core";

/// Platforms covered by the upstream stream-data API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Bilibili,
    Twitch,
    Twitcasting,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Bilibili => "bilibili",
            Platform::Twitch => "twitch",
            Platform::Twitcasting => "twitcasting",
        }
    }

    /// Embed accent color used by the live renderer.
    pub fn embed_color(&self) -> u32 {
        match self {
            Platform::Youtube => 0xFF0000,
            Platform::Bilibili => 0x23ADE5,
            Platform::Twitch => 0x9147FF,
            Platform::Twitcasting => 0x280FC,
        }
    }

    /// Base URL a stream link is built from.
    pub fn watch_base(&self) -> &'static str {
        match self {
            Platform::Youtube => "https://youtube.com/watch?v=",
            Platform::Bilibili => "https://live.bilibili.com/",
            Platform::Twitch => "https://www.twitch.tv/",
            Platform::Twitcasting => "https://twitcasting.tv/",
        }
    }

    /// Base URL a channel link is built from.
    pub fn channel_base(&self) -> &'static str {
        match self {
            Platform::Youtube => "https://youtube.com/channel/",
            Platform::Bilibili => "https://space.bilibili.com/",
            Platform::Twitch => "https://twitch.tv/",
            Platform::Twitcasting => "https://twitcasting.tv/",
        }
    }

    pub fn icon_url(&self) -> &'static str {
        match self {
            Platform::Youtube => "https://s.ytimg.com/yts/img/favicon_144-vfliLAfaB.png",
            Platform::Bilibili => "https://logodix.com/logo/1224389.png",
            Platform::Twitch => "https://p.n4o.xyz/i/twitchlogo.png",
            Platform::Twitcasting => "https://twitcasting.tv/img/icon192.png",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel metadata nested inside a stream record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub en_name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl ChannelInfo {
    /// Preferred display name: localized English name when present.
    pub fn display_name(&self) -> &str {
        self.en_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.name)
    }
}

/// One observed live or upcoming stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRecord {
    pub id: String,
    /// Bilibili live-room disambiguator; absent on other platforms.
    #[serde(default)]
    pub room_id: Option<u64>,
    pub title: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Unix seconds; for upcoming streams this is the scheduled time.
    pub start_time: i64,
    pub group: String,
    pub channel: ChannelInfo,
    pub platform: Platform,
    #[serde(default)]
    pub is_member: bool,
    #[serde(default)]
    pub is_premiere: bool,
}

impl StreamRecord {
    pub fn key(&self) -> NotificationKey {
        NotificationKey::derive(self.platform, &self.id)
    }
}

/// Platform-disambiguated identifier for one stream; the join key between
/// what is live now and what has already been posted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationKey(String);

impl NotificationKey {
    /// YouTube is the primary platform and keeps its raw id; every other
    /// platform gets a tag prefix so keys never collide across platforms
    /// sharing an id space.
    pub fn derive(platform: Platform, id: &str) -> Self {
        match platform {
            Platform::Youtube => Self(id.to_string()),
            Platform::Bilibili => Self(format!("bili{id}")),
            Platform::Twitch => Self(format!("twitch{id}")),
            Platform::Twitcasting => Self(format!("twcast{id}")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for NotificationKey {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for NotificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one posted chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageRef(pub u64);

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of one destination chat channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelRef(pub u64);

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_deterministic_per_platform_and_id() {
        let a = NotificationKey::derive(Platform::Twitch, "korone");
        let b = NotificationKey::derive(Platform::Twitch, "korone");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "twitchkorone");
    }

    #[test]
    fn identical_raw_ids_never_collide_across_platforms() {
        let id = "12345";
        let keys = [
            NotificationKey::derive(Platform::Youtube, id),
            NotificationKey::derive(Platform::Bilibili, id),
            NotificationKey::derive(Platform::Twitch, id),
            NotificationKey::derive(Platform::Twitcasting, id),
        ];
        for (i, a) in keys.iter().enumerate() {
            for b in keys.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn youtube_keeps_its_raw_id() {
        let key = NotificationKey::derive(Platform::Youtube, "nvTQ4TEPnsk");
        assert_eq!(key.as_str(), "nvTQ4TEPnsk");
    }

    #[test]
    fn en_name_preferred_when_present() {
        let chan = ChannelInfo {
            id: "UC123".into(),
            name: "戌神ころね".into(),
            en_name: Some("Inugami Korone".into()),
            image: None,
        };
        assert_eq!(chan.display_name(), "Inugami Korone");

        let no_en = ChannelInfo {
            id: "UC123".into(),
            name: "戌神ころね".into(),
            en_name: Some(String::new()),
            image: None,
        };
        assert_eq!(no_en.display_name(), "戌神ころね");
    }
}
