//! Plain-text renderings of a transcript and the markdown export document.

use crate::models::{Count, TranscriptLine, VideoMetadata};

/// `(MM:SS)` below one hour, `(HH:MM:SS)` from one hour on.
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);

    if hours > 0 {
        format!("({hours:02}:{minutes:02}:{secs:02})")
    } else {
        format!("({minutes:02}:{secs:02})")
    }
}

pub fn format_transcript(lines: &[TranscriptLine]) -> String {
    lines
        .iter()
        .map(|line| format!("{} {}", format_timestamp(line.start), line.text.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `1234567` -> `1,234,567`.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

pub fn format_markdown(
    metadata: &VideoMetadata,
    lines: &[TranscriptLine],
    include_description: bool,
) -> String {
    let views = match metadata.views {
        Count::Known(n) => group_thousands(n),
        Count::Unavailable => "N/A".to_string(),
    };
    let length = metadata
        .duration
        .map_or_else(|| "Unknown".to_string(), |d| format!("{d}s"));
    let published = metadata.publish_date.as_deref().unwrap_or("Unknown");

    let mut markdown = format!("[({}) - YouTube]({})\n\n", metadata.title, metadata.url);
    markdown.push_str(&format!("Channel: {}\n", metadata.channel));
    markdown.push_str(&format!("Views: {views} | Length: {length}\n"));
    markdown.push_str(&format!("Published: {published}\n\n"));

    if include_description && !metadata.description.is_empty() {
        markdown.push_str(&format!("Description:\n{}\n\n", metadata.description));
    }

    markdown.push_str("Transcript:\n");
    markdown.push_str(&format_transcript(lines));
    markdown
}
