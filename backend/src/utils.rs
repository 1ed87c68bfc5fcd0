use crate::models::{PlaylistId, VideoId};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

lazy_static! {
    // Tried in order; the first capture wins.
    static ref VIDEO_ID_PATTERNS: [Regex; 3] = [
        Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11})").expect("video id pattern"),
        Regex::new(r"(?:embed/)([0-9A-Za-z_-]{11})").expect("embed pattern"),
        Regex::new(r"(?:watch\?v=|/)([0-9A-Za-z_-]{11})").expect("watch pattern"),
    ];
    static ref BARE_VIDEO_ID: Regex = Regex::new(r"^[0-9A-Za-z_-]{11}$").expect("bare id pattern");
    static ref PLAYLIST_PARAM: Regex = Regex::new(r"list=([^&]+)").expect("playlist pattern");
}

/// Extracts the video id from watch, short, embed URLs or a bare 11-character id.
pub fn resolve_video_id(url: &str) -> Option<VideoId> {
    for pattern in VIDEO_ID_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(url) {
            return captures
                .get(1)
                .map(|m| VideoId::new_unchecked(m.as_str()));
        }
    }

    if BARE_VIDEO_ID.is_match(url) {
        return Some(VideoId::new_unchecked(url));
    }

    None
}

/// Extracts the `list=` token of a playlist URL.
///
/// The URL must mention both `playlist` and `list=`. A proper query string is
/// decoded first; otherwise the raw text is searched, which also covers ids
/// that ended up in a fragment.
pub fn resolve_playlist_id(url: &str) -> Option<PlaylistId> {
    if !url.contains("playlist") || !url.contains("list=") {
        return None;
    }

    let query = url
        .split_once('?')
        .map(|(_, rest)| rest.split('#').next().unwrap_or_default())
        .unwrap_or_default();

    if query.contains("list=") {
        let id = url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, value)| key == "list" && !value.is_empty())
            .map(|(_, value)| PlaylistId::new_unchecked(value.into_owned()));
        if id.is_none() {
            debug!("Query of {url} has no usable list parameter");
        }
        return id;
    }

    PLAYLIST_PARAM
        .captures(url)
        .and_then(|captures| captures.get(1))
        .map(|m| PlaylistId::new_unchecked(m.as_str()))
}

/// Parse ISO8601 duration string (PT1H2M3S) to total seconds
pub fn parse_iso8601_duration_to_seconds(duration_str: &str) -> Option<u64> {
    let duration_part = duration_str.strip_prefix("PT")?;
    let mut total_seconds = 0.0;
    let mut current_number = String::new();

    for ch in duration_part.chars() {
        if ch.is_ascii_digit() || ch == '.' {
            current_number.push(ch);
        } else {
            if let Ok(num) = current_number.parse::<f64>() {
                match ch {
                    'H' => total_seconds += num * 3600.0, // Hours
                    'M' => total_seconds += num * 60.0,   // Minutes
                    'S' => total_seconds += num,          // Seconds
                    _ => {}
                }
            }
            current_number.clear();
        }
    }

    Some(total_seconds as u64)
}

/// Prefixes `https://` when the input carries no scheme.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// Lower-cased host of `url`, or the authority text when the URL does not parse.
pub fn extract_domain(url: &str) -> String {
    if let Some(host) = url::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_lowercase))
    {
        return host;
    }

    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Cuts `text` to `max_chars` characters and appends `...` when something was cut.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}

/// Capitalizes the first letter of every alphabetic run: `example.com` -> `Example.Com`.
pub fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut previous_is_letter = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if previous_is_letter {
                result.extend(ch.to_lowercase());
            } else {
                result.extend(ch.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            result.push(ch);
            previous_is_letter = false;
        }
    }
    result
}
