//! Stream-data client: cursor-paginated GraphQL fetch of live and upcoming
//! streams, with malformed records rejected at this boundary.

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{info_span, warn, Instrument};
use vtwatch_core::{ChannelInfo, Platform, StreamRecord};

pub const CRATE_NAME: &str = "vtwatch-api";

const DEFAULT_BASE_URL: &str = "https://api.ihateani.me/v2";

const LIVE_QUERY: &str = r#"query($cursor:String) {
    vtuber {
        live(cursor:$cursor,limit:100) {
            _total
            items {
                id
                room_id
                title
                thumbnail
                timeData {
                    startTime
                }
                group
                channel {
                    id
                    name
                    image
                }
                platform
                is_premiere
                is_member
            }
            pageInfo {
                nextCursor
                hasNextPage
            }
        }
    }
}"#;

const UPCOMING_QUERY: &str = r#"query($cursor:String) {
    vtuber {
        upcoming(cursor:$cursor,limit:100) {
            _total
            items {
                id
                room_id
                title
                group
                timeData {
                    startTime
                }
                channel {
                    id
                    name
                    en_name
                }
                is_member
                is_premiere
                platform
            }
            pageInfo {
                nextCursor
                hasNextPage
            }
        }
    }
}"#;

/// Fetch-boundary failures. Any of these aborts the caller's whole cycle;
/// the client never hands back a partial result set as success.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetch timed out")]
    Timeout,
    #[error("http status {status} from {url}")]
    Http { status: u16, url: String },
    #[error("pagination broke mid-stream: expected {expected} items, got {got}")]
    Incomplete { expected: i64, got: usize },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct StreamApiConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for StreamApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(20),
            user_agent: format!("vtwatch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedKind {
    Live,
    Upcoming,
}

impl FeedKind {
    fn query(self) -> &'static str {
        match self {
            FeedKind::Live => LIVE_QUERY,
            FeedKind::Upcoming => UPCOMING_QUERY,
        }
    }

    fn field(self) -> &'static str {
        match self {
            FeedKind::Live => "live",
            FeedKind::Upcoming => "upcoming",
        }
    }
}

/// GraphQL client for the upstream VTuber stream-data API.
#[derive(Debug)]
pub struct StreamApi {
    client: reqwest::Client,
    base_url: String,
}

impl StreamApi {
    pub fn new(config: StreamApiConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .context("building reqwest client")?;
        Ok(Self {
            client,
            base_url: config.base_url,
        })
    }

    /// All streams currently running, sorted by start time.
    pub async fn fetch_lives(&self) -> Result<Vec<StreamRecord>, FetchError> {
        let span = info_span!("stream_fetch", feed = FeedKind::Live.field());
        self.paginate_through(FeedKind::Live).instrument(span).await
    }

    /// All scheduled streams, sorted by scheduled start time.
    pub async fn fetch_upcoming(&self) -> Result<Vec<StreamRecord>, FetchError> {
        let span = info_span!("stream_fetch", feed = FeedKind::Upcoming.field());
        self.paginate_through(FeedKind::Upcoming).instrument(span).await
    }

    async fn paginate_through(&self, kind: FeedKind) -> Result<Vec<StreamRecord>, FetchError> {
        let mut collected: Vec<StreamRecord> = Vec::new();
        let mut expected_total: i64 = -1;
        let mut cursor = String::new();

        loop {
            let page = self.fetch_page(kind, &cursor).await.map_err(|err| {
                if expected_total >= 0 {
                    warn!(
                        expected = expected_total,
                        got = collected.len(),
                        "pagination stopped early: {err}"
                    );
                    FetchError::Incomplete {
                        expected: expected_total,
                        got: collected.len(),
                    }
                } else {
                    err
                }
            })?;

            if expected_total < 0 {
                expected_total = page.total;
            }
            for item in page.items {
                match item.into_record() {
                    Some(record) => collected.push(record),
                    None => warn!(feed = kind.field(), "dropping malformed stream record"),
                }
            }

            match (page.page_info.has_next_page, page.page_info.next_cursor) {
                (true, Some(next)) if !next.is_empty() => cursor = next,
                _ => break,
            }
        }

        collected.sort_by_key(|r| r.start_time);
        Ok(collected)
    }

    async fn fetch_page(&self, kind: FeedKind, cursor: &str) -> Result<PagedStreams, FetchError> {
        let url = format!("{}/graphql", self.base_url);
        let payload = serde_json::json!({
            "query": kind.query(),
            "variables": { "cursor": cursor },
        });

        let resp = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Request(err)
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                url: resp.url().to_string(),
            });
        }

        let envelope: GqlEnvelope = resp.json().await.map_err(|err| {
            if err.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Malformed(err.to_string())
            }
        })?;

        if let Some(errors) = envelope.errors {
            if !errors.is_empty() {
                return Err(FetchError::Malformed(format!(
                    "graphql reported {} error(s)",
                    errors.len()
                )));
            }
        }
        let data = envelope
            .data
            .ok_or_else(|| FetchError::Malformed("response carried no data".to_string()))?;
        let paged = match kind {
            FeedKind::Live => data.vtuber.live,
            FeedKind::Upcoming => data.vtuber.upcoming,
        };
        paged.ok_or_else(|| FetchError::Malformed(format!("missing {} field", kind.field())))
    }
}

#[derive(Debug, Deserialize)]
struct GqlEnvelope {
    data: Option<GqlData>,
    #[serde(default)]
    errors: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct GqlData {
    vtuber: VtuberNode,
}

#[derive(Debug, Deserialize)]
struct VtuberNode {
    #[serde(default)]
    live: Option<PagedStreams>,
    #[serde(default)]
    upcoming: Option<PagedStreams>,
}

#[derive(Debug, Deserialize)]
struct PagedStreams {
    #[serde(rename = "_total")]
    total: i64,
    items: Vec<RawStream>,
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    #[serde(rename = "nextCursor")]
    next_cursor: Option<String>,
    #[serde(rename = "hasNextPage")]
    has_next_page: bool,
}

/// Wire shape of one stream item. Everything optional so a single bad item
/// is dropped instead of poisoning the whole page.
#[derive(Debug, Deserialize)]
struct RawStream {
    id: Option<String>,
    #[serde(default, deserialize_with = "flexible_opt_u64")]
    room_id: Option<u64>,
    title: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(rename = "timeData")]
    time_data: Option<RawTimeData>,
    group: Option<String>,
    channel: Option<RawChannel>,
    #[serde(default, deserialize_with = "lenient_platform")]
    platform: Option<Platform>,
    #[serde(default)]
    is_member: Option<bool>,
    #[serde(default)]
    is_premiere: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawTimeData {
    #[serde(rename = "startTime", deserialize_with = "flexible_i64")]
    start_time: i64,
}

#[derive(Debug, Deserialize)]
struct RawChannel {
    id: Option<String>,
    name: Option<String>,
    #[serde(default)]
    en_name: Option<String>,
    #[serde(default)]
    image: Option<String>,
}

impl RawStream {
    fn into_record(self) -> Option<StreamRecord> {
        let id = self.id.filter(|v| !v.is_empty())?;
        let title = self.title?;
        let group = self.group.filter(|v| !v.is_empty())?;
        let platform = self.platform?;
        let start_time = self.time_data?.start_time;
        let channel = self.channel?;
        let channel = ChannelInfo {
            id: channel.id.filter(|v| !v.is_empty())?,
            name: channel.name.unwrap_or_else(|| "Unknown".to_string()),
            en_name: channel.en_name,
            image: channel.image,
        };
        Some(StreamRecord {
            id,
            room_id: self.room_id,
            title,
            thumbnail: self.thumbnail,
            start_time,
            group,
            channel,
            platform,
            is_member: self.is_member.unwrap_or(false),
            is_premiere: self.is_premiere.unwrap_or(false),
        })
    }
}

/// Platforms this system does not cover drop the record rather than
/// poisoning the whole page.
fn lenient_platform<'de, D>(deserializer: D) -> Result<Option<Platform>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| match s.as_str() {
        "youtube" => Some(Platform::Youtube),
        "bilibili" => Some(Platform::Bilibili),
        "twitch" => Some(Platform::Twitch),
        "twitcasting" => Some(Platform::Twitcasting),
        _ => None,
    }))
}

/// The upstream sometimes serializes timestamps as strings.
fn flexible_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        String(String),
    }
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

fn flexible_opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MaybeNumber {
        Number(u64),
        String(String),
        Null,
    }
    match Option::<MaybeNumber>::deserialize(deserializer)? {
        Some(MaybeNumber::Number(n)) => Ok(Some(n)),
        Some(MaybeNumber::String(s)) => Ok(s.parse().ok()),
        _ => Ok(None),
    }
}
