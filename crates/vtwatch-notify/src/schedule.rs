//! Upcoming-schedule renderer: one regenerated text block per group, no
//! per-stream identity tracking.

use chrono::{DateTime, FixedOffset, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use vtwatch_core::{GroupBucket, Platform, StreamRecord};

/// A stream more than five minutes past its scheduled start is probably
/// delayed and gets the question glyph.
pub const LATE_SECS: i64 = 5 * 60;
/// A stream this far past its scheduled start is stale and no longer worth
/// announcing at all.
pub const LATE_TOLERANCE_SECS: i64 = 12 * 60;
/// Hard ceiling on the rendered block; lines are never cut mid-way.
pub const MAX_BODY_LEN: usize = 2048;

pub const GLYPH_LEGEND: &str = "▶ Premiere\n🔒 Member-only\n❓ Late (5 minutes threshold)";

/// Tolerates repeated vowels ("freee chat") and a missing space.
static FREE_CHAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)fre+\s?chat").expect("free-chat pattern is valid")
});

/// Replacement content for one group's tracking message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEmbed {
    pub body: String,
    pub legend: &'static str,
    pub icon_url: &'static str,
    /// Render time, unix seconds.
    pub updated_at: i64,
}

impl ScheduleEmbed {
    pub fn new(bucket: GroupBucket, body: String, updated_at: i64) -> Self {
        Self {
            body,
            legend: GLYPH_LEGEND,
            icon_url: group_logo(bucket),
            updated_at,
        }
    }
}

pub fn group_logo(bucket: GroupBucket) -> &'static str {
    match bucket {
        GroupBucket::Hololive => "https://user-images.strikinglycdn.com/res/hrscywv4p/image/upload/h_192,w_192,q_auto/1369026/logo_square_qn4ncy.png",
        GroupBucket::Nijisanji => "https://nijisanji.ichikara.co.jp/wp-content/uploads/2018/12/cropped-Nijisanji_Rogo_icon_eye_RGB-192x192.png",
        GroupBucket::Other => "https://s.ytimg.com/yts/img/favicon_144-vfliLAfaB.png",
    }
}

fn platform_glyph(platform: Platform) -> &'static str {
    match platform {
        Platform::Youtube => "📺",
        Platform::Bilibili => "📡",
        Platform::Twitch | Platform::Twitcasting => "🎥",
    }
}

fn format_jst(ts: i64) -> Option<String> {
    let jst = FixedOffset::east_opt(9 * 3600)?;
    let dt = DateTime::<Utc>::from_timestamp(ts, 0)?;
    Some(dt.with_timezone(&jst).format("%m/%d %H:%M JST").to_string())
}

/// One schedule line: glyphs, platform icon, bolded channel name, link.
/// Returns `None` when the record cannot be linked (no bilibili room id).
pub fn render_schedule_line(record: &StreamRecord, now: i64) -> Option<String> {
    let url = match record.platform {
        Platform::Youtube => format!("https://youtu.be/{}", record.id),
        Platform::Bilibili => format!("https://live.bilibili.com/{}", record.room_id?),
        Platform::Twitch | Platform::Twitcasting => {
            format!("{}{}", record.platform.watch_base(), record.channel.id)
        }
    };

    let mut line = String::new();
    if record.is_member {
        line.push_str("🔒 ");
    }
    if record.is_premiere {
        line.push_str("▶ ");
    }
    if now > record.start_time + LATE_SECS {
        line.push_str("❓ ");
    }
    line.push_str(platform_glyph(record.platform));
    line.push(' ');
    line.push_str(&format!(
        "[**{}**]({url})",
        record.channel.display_name()
    ));
    Some(line)
}

/// Build the whole schedule block for one group. Records must already be
/// sorted by start time; time groups stay chronological and lines keep
/// encounter order within a group. The result never exceeds
/// [`MAX_BODY_LEN`] and never contains a partially-written line.
pub fn build_schedule(records: &[StreamRecord], now: i64) -> String {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for record in records {
        if FREE_CHAT_RE.is_match(&record.title) {
            continue;
        }
        if record.start_time < now - LATE_TOLERANCE_SECS {
            continue;
        }
        let Some(header) = format_jst(record.start_time) else {
            continue;
        };
        let Some(line) = render_schedule_line(record, now) else {
            continue;
        };
        match groups.last_mut() {
            Some((current, lines)) if *current == header => lines.push(line),
            _ => groups.push((header, vec![line])),
        }
    }

    let mut out = String::new();
    'assemble: for (header, lines) in &groups {
        let mut wrote_header = false;
        for line in lines {
            let mut pending = String::new();
            if !wrote_header {
                if !out.is_empty() {
                    pending.push('\n');
                }
                pending.push_str("**`");
                pending.push_str(header);
                pending.push_str("`**\n");
            }
            pending.push_str(line);
            pending.push('\n');
            if out.len() + pending.len() > MAX_BODY_LEN {
                break 'assemble;
            }
            out.push_str(&pending);
            wrote_header = true;
        }
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtwatch_core::ChannelInfo;

    const NOW: i64 = 1_700_000_000;

    fn mk_upcoming(id: &str, title: &str, start_time: i64) -> StreamRecord {
        StreamRecord {
            id: id.to_string(),
            room_id: None,
            title: title.to_string(),
            thumbnail: None,
            start_time,
            group: "hololive".into(),
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

    #[test]
    fn free_chat_titles_are_dropped_case_and_vowel_tolerant() {
        for title in ["Freeee Chat with fans", "FREECHAT", "free chat", "Freechat room"] {
            let records = vec![mk_upcoming("a", title, NOW + 600)];
            assert_eq!(build_schedule(&records, NOW), "", "title: {title}");
        }
        let kept = vec![mk_upcoming("a", "Chatting stream", NOW + 600)];
        assert!(!build_schedule(&kept, NOW).is_empty());
    }

    #[test]
    fn stale_records_past_the_tolerance_are_dropped() {
        let records = vec![
            mk_upcoming("old", "morning stream", NOW - 800),
            mk_upcoming("ok", "evening stream", NOW + 600),
        ];
        let body = build_schedule(&records, NOW);
        assert!(!body.contains("youtu.be/old"));
        assert!(body.contains("youtu.be/ok"));
    }

    #[test]
    fn late_glyph_appears_past_five_minutes_only() {
        let late = mk_upcoming("a", "stream", NOW - 800);
        let line = render_schedule_line(&late, NOW).unwrap();
        assert!(line.starts_with("❓ "));

        let on_time = mk_upcoming("a", "stream", NOW - 200);
        let line = render_schedule_line(&on_time, NOW).unwrap();
        assert!(!line.contains('❓'));
    }

    #[test]
    fn member_and_premiere_glyphs_precede_the_link() {
        let mut record = mk_upcoming("a", "stream", NOW + 600);
        record.is_member = true;
        record.is_premiere = true;
        let line = render_schedule_line(&record, NOW).unwrap();
        assert!(line.starts_with("🔒 ▶ "));
        assert!(line.ends_with("](https://youtu.be/a)"));
    }

    #[test]
    fn bilibili_lines_use_the_room_id_or_are_skipped() {
        let mut record = mk_upcoming("b", "stream", NOW + 600);
        record.platform = Platform::Bilibili;
        assert!(render_schedule_line(&record, NOW).is_none());

        record.room_id = Some(21908196);
        let line = render_schedule_line(&record, NOW).unwrap();
        assert!(line.ends_with("](https://live.bilibili.com/21908196)"));
    }

    #[test]
    fn records_sharing_a_minute_share_one_time_header() {
        let records = vec![
            mk_upcoming("a", "first", NOW + 600),
            mk_upcoming("b", "second", NOW + 630),
            mk_upcoming("c", "third", NOW + 3600),
        ];
        let body = build_schedule(&records, NOW);
        let headers = body.matches("**`").count();
        assert_eq!(headers, 2);
        // Encounter order within the shared group.
        let a_pos = body.find("youtu.be/a").unwrap();
        let b_pos = body.find("youtu.be/b").unwrap();
        let c_pos = body.find("youtu.be/c").unwrap();
        assert!(a_pos < b_pos && b_pos < c_pos);
    }

    #[test]
    fn body_never_exceeds_the_ceiling_and_lines_stay_whole() {
        let records: Vec<_> = (0..120)
            .map(|i| {
                let mut r = mk_upcoming(
                    &format!("video-{i:03}"),
                    "stream",
                    NOW + 600 + (i as i64) * 60,
                );
                r.channel.name = format!("A Very Long Channel Name For Padding {i:03}");
                r
            })
            .collect();

        let body = build_schedule(&records, NOW);
        assert!(body.len() <= MAX_BODY_LEN);
        assert!(!body.is_empty());

        let expected_lines: Vec<String> = records
            .iter()
            .filter_map(|r| render_schedule_line(r, NOW))
            .collect();
        for line in body.lines().filter(|l| !l.is_empty()) {
            let complete = line.starts_with("**`") && line.ends_with("`**")
                || expected_lines.iter().any(|full| full == line);
            assert!(complete, "partial line emitted: {line:?}");
        }
    }

    #[test]
    fn empty_input_renders_an_empty_block() {
        assert_eq!(build_schedule(&[], NOW), "");
    }
}
