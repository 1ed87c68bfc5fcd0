//! Reddit posts: the public `.json` listing, then the legacy HTML front end.

use super::html::{element_text, selector};
use crate::models::{OgData, UrlMetadata};
use crate::services::fallback::{FallbackChain, StageResult};
use crate::services::fetcher::{PageFetcher, RequestProfile, Timeout};
use crate::utils::truncate_with_ellipsis;
use anyhow::anyhow;
use scraper::Html;
use serde_json::{json, Value};
use url::Url;

const REDDIT_JSON: RequestProfile = RequestProfile::new(
    "reddit-json",
    &[("User-Agent", "URLMetadataBot/1.0")],
    Timeout::Api,
);
const OLD_REDDIT_HOST: &str = "old.reddit.com";
const THUMBNAIL_SENTINELS: [&str; 4] = ["self", "default", "nsfw", ""];
const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".png", ".gif", ".jpeg"];

pub async fn extract(fetcher: &dyn PageFetcher, url: &str) -> StageResult<UrlMetadata> {
    let metadata = FallbackChain::new("reddit")
        .stage("json listing", || from_json(fetcher, url))
        .stage("old reddit", || from_old_reddit(fetcher, url))
        .run()
        .await
        .map_err(|e| anyhow!(e.reason()))?;
    Ok(Some(metadata))
}

pub fn json_url(url: &str) -> String {
    format!("{}.json", url.trim_end_matches('/'))
}

pub fn old_reddit_url(url: &str) -> anyhow::Result<String> {
    let mut parsed = Url::parse(url)?;
    parsed.set_host(Some(OLD_REDDIT_HOST))?;
    Ok(parsed.to_string())
}

async fn from_json(fetcher: &dyn PageFetcher, url: &str) -> StageResult<UrlMetadata> {
    let listing = fetcher
        .get(&json_url(url), &REDDIT_JSON)
        .await?
        .ensure_success()?
        .json()?;

    let post = &listing[0]["data"]["children"][0]["data"];
    if !post.is_object() {
        return Ok(None);
    }
    Ok(Some(post_metadata(post)))
}

fn post_metadata(post: &Value) -> UrlMetadata {
    let subreddit = post["subreddit"].as_str().unwrap_or("unknown");
    let raw_title = post["title"].as_str().unwrap_or("Reddit Post");
    let selftext = post["selftext"].as_str().unwrap_or_default().trim();

    let description = if selftext.chars().count() > 10 {
        truncate_with_ellipsis(selftext, 200)
    } else {
        format!(
            "r/{subreddit} • {} upvotes • {} comments",
            post["score"].as_i64().unwrap_or(0),
            post["num_comments"].as_i64().unwrap_or(0)
        )
    };

    let mut og_data = OgData::new();
    for key in ["subreddit", "score", "num_comments", "author", "created_utc"] {
        og_data.insert(key.to_string(), post[key].clone());
    }

    UrlMetadata {
        title: format!("{raw_title} : r/{subreddit}"),
        description,
        thumbnail: post_thumbnail(post),
        domain: "reddit.com".to_string(),
        og_data,
        error: None,
    }
}

fn post_thumbnail(post: &Value) -> Option<String> {
    if let Some(thumbnail) = post["thumbnail"].as_str() {
        if !THUMBNAIL_SENTINELS.contains(&thumbnail) {
            return Some(thumbnail.to_string());
        }
    }

    let link = post["url"].as_str()?;
    let path = Url::parse(link).ok()?.path().to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| path.ends_with(ext))
        .then(|| link.to_string())
}

async fn from_old_reddit(fetcher: &dyn PageFetcher, url: &str) -> StageResult<UrlMetadata> {
    let old_url = old_reddit_url(url)?;
    let page = fetcher
        .get(&old_url, &RequestProfile::browser_api())
        .await?;
    if !page.is_ok() {
        return Ok(None);
    }
    Ok(read_old_reddit(&page.body))
}

fn read_old_reddit(body: &str) -> Option<UrlMetadata> {
    let document = Html::parse_document(body);

    let title = ["a.title", "h1"]
        .iter()
        .filter_map(|css| selector(css))
        .find_map(|sel| document.select(&sel).next().map(element_text))
        .filter(|title| !title.is_empty())?;

    let subreddit = selector(r#"a[href*="/r/"]"#)
        .and_then(|sel| {
            document.select(&sel).find_map(|link| {
                let text = element_text(link);
                let name = text.strip_prefix("/r/").or_else(|| text.strip_prefix("r/"))?;
                (!name.is_empty()).then(|| name.to_string())
            })
        })
        .unwrap_or_else(|| "unknown".to_string());

    Some(UrlMetadata {
        title: format!("{title} : r/{subreddit}"),
        description: format!("Reddit post from r/{subreddit}"),
        thumbnail: None,
        domain: "reddit.com".to_string(),
        og_data: OgData::from([("subreddit".to_string(), json!(subreddit))]),
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_url_drops_trailing_slash() {
        assert_eq!(
            json_url("https://www.reddit.com/r/rust/comments/abc/post/"),
            "https://www.reddit.com/r/rust/comments/abc/post.json"
        );
    }

    #[test]
    fn old_reddit_replaces_host_once() {
        assert_eq!(
            old_reddit_url("https://www.reddit.com/r/reddit.com/comments/x/").unwrap(),
            "https://old.reddit.com/r/reddit.com/comments/x/"
        );
    }

    #[test]
    fn link_posts_without_thumbnail_use_image_url() {
        let post = json!({"thumbnail": "default", "url": "https://i.redd.it/cat.JPG"});
        assert_eq!(post_thumbnail(&post).as_deref(), Some("https://i.redd.it/cat.JPG"));

        let text_post = json!({"thumbnail": "self", "url": "https://www.reddit.com/r/rust/comments/x/"});
        assert_eq!(post_thumbnail(&text_post), None);
    }

    #[test]
    fn short_selftext_gets_summary_description() {
        let post = json!({
            "title": "Hello", "subreddit": "rust", "selftext": "tiny",
            "score": 42, "num_comments": 7, "author": "ferris", "created_utc": 1700000000.0
        });
        let metadata = post_metadata(&post);
        assert_eq!(metadata.title, "Hello : r/rust");
        assert_eq!(metadata.description, "r/rust • 42 upvotes • 7 comments");
        assert_eq!(metadata.og_data.get("author"), Some(&json!("ferris")));
    }

    #[test]
    fn old_reddit_markup_is_read() {
        let metadata = read_old_reddit(
            r#"<html><body>
                <a class="title" href="/r/rust/comments/x/">Borrow checker tips</a>
                <a href="/r/rust/">r/rust</a>
            </body></html>"#,
        )
        .unwrap();
        assert_eq!(metadata.title, "Borrow checker tips : r/rust");
        assert_eq!(metadata.description, "Reddit post from r/rust");
    }
}
