use super::Platform;
use crate::models::{OgData, UrlMetadata};
use crate::utils::{extract_domain, title_case};

pub const TWITTER_FAVICON: &str = "https://abs.twimg.com/favicons/twitter.3.ico";
const REDDIT_FAVICON: &str = "https://www.redditstatic.com/favicon.ico";
const YOUTUBE_FAVICON: &str = "https://www.youtube.com/favicon.ico";
const GITHUB_FAVICON: &str = "https://github.com/favicon.ico";

/// Best-effort result synthesized from the URL alone, carrying `error` for diagnostics.
pub fn build(url: &str, error: &str) -> UrlMetadata {
    let domain = extract_domain(url);

    let (title, description, thumbnail) = match Platform::detect(&domain) {
        Platform::Twitter => (
            "X/Twitter Post".to_string(),
            "Twitter/X content (access limited)".to_string(),
            TWITTER_FAVICON.to_string(),
        ),
        Platform::Reddit => (
            "Reddit Post".to_string(),
            "Reddit content (access limited)".to_string(),
            REDDIT_FAVICON.to_string(),
        ),
        Platform::YouTube => (
            "YouTube Video".to_string(),
            "YouTube content (access limited)".to_string(),
            YOUTUBE_FAVICON.to_string(),
        ),
        Platform::GitHub => (
            "GitHub Repository".to_string(),
            "GitHub content (access limited)".to_string(),
            GITHUB_FAVICON.to_string(),
        ),
        Platform::Generic => {
            let bare = domain.strip_prefix("www.").unwrap_or(&domain);
            let title = if bare.is_empty() {
                url.to_string()
            } else {
                title_case(bare)
            };
            (
                title,
                format!("Content from {domain}"),
                format!("https://www.google.com/s2/favicons?domain={domain}&sz=128"),
            )
        }
    };

    UrlMetadata {
        title,
        description,
        thumbnail: Some(thumbnail),
        domain: if domain.is_empty() { url.to_string() } else { domain },
        og_data: OgData::new(),
        error: Some(error.to_string()),
    }
}
