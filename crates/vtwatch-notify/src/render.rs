//! Live-notification renderer: one embed per stream, keyed by its
//! notification key in the footer.

use thiserror::Error;
use vtwatch_core::{Platform, StreamRecord};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("bilibili stream {0} has no room id")]
    MissingRoomId(String),
    #[error("stream {0} has an empty title")]
    MissingTitle(String),
    /// YouTube rebroadcast variants arrive without a live thumbnail and are
    /// not announced.
    #[error("stream {0} looks like a rebroadcast")]
    Rebroadcast(String),
}

/// Display content for one live notification. The footer text carries the
/// notification key so history scans can rebuild the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveEmbed {
    pub title: String,
    pub url: String,
    pub description: String,
    pub color: u32,
    /// Stream start, unix seconds.
    pub timestamp: i64,
    pub image: Option<String>,
    pub thumbnail: Option<String>,
    pub author_name: String,
    pub author_url: String,
    pub author_icon: Option<String>,
    pub footer_text: String,
    pub footer_icon: String,
}

pub fn render_live(record: &StreamRecord) -> Result<LiveEmbed, RenderError> {
    if record.title.is_empty() {
        return Err(RenderError::MissingTitle(record.id.clone()));
    }

    let url = stream_url(record)?;
    if record.platform == Platform::Youtube && record.thumbnail.is_none() {
        return Err(RenderError::Rebroadcast(record.id.clone()));
    }

    let mut description = format!("[Watch Here!]({url})\n");
    description.push_str(&capitalize(record.platform.as_str()));
    if record.is_premiere {
        description.push_str(" Premiere");
        description = format!("▶ {description}");
    } else {
        description.push_str(" Stream");
    }
    if record.is_member {
        description.push_str(" **(Member-Only)**");
    }

    let channel_url = format!("{}{}", record.platform.channel_base(), record.channel.id);

    Ok(LiveEmbed {
        title: record.title.clone(),
        url,
        description,
        color: record.platform.embed_color(),
        timestamp: record.start_time,
        image: record.thumbnail.clone(),
        thumbnail: record.channel.image.clone(),
        author_name: record.channel.name.clone(),
        author_url: channel_url,
        author_icon: record.channel.image.clone(),
        footer_text: record.key().as_str().to_string(),
        footer_icon: record.platform.icon_url().to_string(),
    })
}

fn stream_url(record: &StreamRecord) -> Result<String, RenderError> {
    let base = record.platform.watch_base();
    Ok(match record.platform {
        Platform::Youtube => format!("{base}{}", record.id),
        Platform::Bilibili => {
            let room = record
                .room_id
                .ok_or_else(|| RenderError::MissingRoomId(record.id.clone()))?;
            format!("{base}{room}")
        }
        Platform::Twitch | Platform::Twitcasting => format!("{base}{}", record.channel.id),
    })
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
