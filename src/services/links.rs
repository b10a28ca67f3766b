use reqwest::Url;
use serde::Serialize;

/// How the watch view should play a link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "url", rename_all = "snake_case")]
pub enum PlaybackTarget {
    /// Playable inline in an iframe
    Embed(String),
    /// Opened in a new tab
    External(String),
}

impl PlaybackTarget {
    pub fn for_url(url: &str) -> Self {
        if url.contains("drive.google.com") {
            if let Some(embed) = google_drive_embed_url(url) {
                return PlaybackTarget::Embed(embed);
            }
        }

        match youtube_video_id(url) {
            Some(id) => PlaybackTarget::Embed(format!(
                "https://www.youtube.com/embed/{}?autoplay=1&rel=0",
                id
            )),
            None => PlaybackTarget::External(url.to_string()),
        }
    }
}

/// Extracts the video id from the usual YouTube link shapes
///
/// Handles `watch?v=`, `youtu.be/`, `/embed/`, `/shorts/` and `/live/`.
pub fn youtube_video_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.trim_start_matches("www.").trim_start_matches("m.");

    let id = match host {
        "youtu.be" => parsed.path_segments()?.next().map(str::to_string),
        "youtube.com" | "youtube-nocookie.com" | "music.youtube.com" => {
            let mut segments = parsed.path_segments()?;
            match segments.next() {
                Some("watch") => parsed
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned()),
                Some("embed") | Some("shorts") | Some("live") | Some("v") => {
                    segments.next().map(str::to_string)
                }
                _ => None,
            }
        }
        _ => None,
    }?;

    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then_some(id)
}

/// Rewrites a Drive sharing link to its embeddable preview
pub fn google_drive_embed_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    if parsed.host_str()? != "drive.google.com" {
        return None;
    }

    let segments: Vec<&str> = parsed.path_segments()?.collect();
    let file_id = match segments.as_slice() {
        ["file", "d", id, ..] => Some(id.to_string()),
        _ => parsed
            .query_pairs()
            .find(|(k, _)| k == "id")
            .map(|(_, v)| v.into_owned()),
    }?;

    Some(format!("https://drive.google.com/file/d/{}/preview", file_id))
}

/// Parses an ISO 8601 duration such as `PT1H2M3S` or `P1DT2H` into seconds
///
/// Returns `None` for anything that is not a day/time duration.
pub fn parse_iso8601_duration(value: &str) -> Option<u64> {
    let rest = value.strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((d, t)) => (d, Some(t)),
        None => (rest, None),
    };

    let mut total = 0u64;
    let mut seen_any = false;

    for (part, units) in [(Some(date_part), "D"), (time_part, "HMS")] {
        let Some(part) = part else { continue };
        let mut number = String::new();
        for c in part.chars() {
            if c.is_ascii_digit() {
                number.push(c);
                continue;
            }
            if !units.contains(c) || number.is_empty() {
                return None;
            }
            let n: u64 = number.parse().ok()?;
            number.clear();
            seen_any = true;
            let unit_secs: u64 = match c {
                'D' => 86_400,
                'H' => 3_600,
                'M' => 60,
                _ => 1,
            };
            total = n.checked_mul(unit_secs)?.checked_add(total)?;
        }
        if !number.is_empty() {
            return None;
        }
    }

    seen_any.then_some(total)
}
