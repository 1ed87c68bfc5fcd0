//! Twitter/X: the same page requested under several client identities, since the
//! site serves a JavaScript wall to most of them.

use super::html::{meta_content, og_data, page_description, page_title};
use super::placeholder::TWITTER_FAVICON;
use crate::models::{OgData, UrlMetadata};
use crate::services::fallback::{FallbackChain, StageResult};
use crate::services::fetcher::{FetchError, PageFetcher, RequestProfile, Timeout};
use crate::utils::extract_domain;
use scraper::Html;
use serde_json::{json, Value};

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const BLOCK_MARKERS: [&str; 2] = ["JavaScript is not available", "Enable JavaScript"];

pub static PROFILES: [RequestProfile; 4] = [
    RequestProfile::new(
        "twitter-mobile",
        &[
            (
                "User-Agent",
                "Mozilla/5.0 (iPhone; CPU iPhone OS 16_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1",
            ),
            ("Accept", HTML_ACCEPT),
        ],
        Timeout::Api,
    ),
    RequestProfile::new(
        "twitterbot",
        &[("User-Agent", "Twitterbot/1.0"), ("Accept", HTML_ACCEPT)],
        Timeout::Api,
    ),
    RequestProfile::new(
        "facebook-crawler",
        &[
            (
                "User-Agent",
                "facebookexternalhit/1.1 (+http://www.facebook.com/externalhit_uatext.php)",
            ),
            ("Accept", HTML_ACCEPT),
        ],
        Timeout::Api,
    ),
    RequestProfile::new(
        "curl",
        &[("User-Agent", "curl/7.64.1"), ("Accept", "*/*")],
        Timeout::Api,
    ),
];

/// Never falls through: when every identity is blocked the result is the limited-access card.
pub async fn extract(fetcher: &dyn PageFetcher, url: &str) -> StageResult<UrlMetadata> {
    let mut chain = FallbackChain::new("twitter");
    for profile in PROFILES.iter() {
        chain = chain.stage(profile.name, move || attempt(fetcher, url, profile));
    }
    let metadata = chain.run().await.unwrap_or_else(|_| limited_access(url));
    Ok(Some(metadata))
}

async fn attempt(
    fetcher: &dyn PageFetcher,
    url: &str,
    profile: &RequestProfile,
) -> StageResult<UrlMetadata> {
    let page = fetcher.get(url, profile).await?;
    if !page.is_ok() {
        return Err(FetchError::Status(page.status).into());
    }
    Ok(read_post(&page.body, url))
}

fn post_domain(url: &str) -> &'static str {
    if url.contains("x.com") {
        "x.com"
    } else {
        "twitter.com"
    }
}

fn read_post(body: &str, url: &str) -> Option<UrlMetadata> {
    if BLOCK_MARKERS.iter().any(|marker| body.contains(marker)) {
        return None;
    }

    let document = Html::parse_document(body);
    let scraped_title = page_title(&document, &extract_domain(url));
    if scraped_title.contains(BLOCK_MARKERS[0]) || scraped_title.chars().count() < 5 {
        return None;
    }

    let og_data = og_data(&document);
    let title = meta_content(&document, "name", "twitter:title").unwrap_or(scraped_title);
    let description = meta_content(&document, "name", "twitter:description")
        .unwrap_or_else(|| page_description(&document));
    let thumbnail = meta_content(&document, "name", "twitter:image").or_else(|| {
        og_data
            .get("image")
            .and_then(Value::as_str)
            .map(String::from)
    });

    if title.chars().count() <= 5 || title.contains("JavaScript") {
        return None;
    }

    Some(UrlMetadata {
        title,
        description,
        thumbnail,
        domain: post_domain(url).to_string(),
        og_data,
        error: None,
    })
}

fn limited_access(url: &str) -> UrlMetadata {
    UrlMetadata {
        title: "X/Twitter Post (Limited Access)".to_string(),
        description: "Content not accessible due to platform restrictions".to_string(),
        thumbnail: Some(TWITTER_FAVICON.to_string()),
        domain: post_domain(url).to_string(),
        og_data: OgData::from([
            ("platform".to_string(), json!("twitter")),
            ("access_limited".to_string(), json!(true)),
        ]),
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn javascript_wall_is_rejected() {
        let body = "<html><head><title>X</title></head><body>JavaScript is not available.</body></html>";
        assert_eq!(read_post(body, "https://x.com/a/status/1"), None);
    }

    #[test]
    fn card_tags_override_page_values() {
        let body = r#"<html><head>
            <title>Post on X</title>
            <meta property="og:image" content="https://pbs.twimg.com/media/og.jpg">
            <meta name="twitter:title" content="Ferris on X: hello world">
            <meta name="twitter:description" content="hello world">
        </head></html>"#;
        let metadata = read_post(body, "https://x.com/ferris/status/1").unwrap();
        assert_eq!(metadata.title, "Ferris on X: hello world");
        assert_eq!(metadata.description, "hello world");
        assert_eq!(
            metadata.thumbnail.as_deref(),
            Some("https://pbs.twimg.com/media/og.jpg")
        );
        assert_eq!(metadata.domain, "x.com");
    }

    #[test]
    fn short_titles_are_not_content() {
        let body = "<html><head><title>Post</title></head></html>";
        assert_eq!(read_post(body, "https://twitter.com/a/status/1"), None);
    }
}
