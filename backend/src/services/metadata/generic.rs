use super::html::{og_data, page_description, page_title};
use crate::models::UrlMetadata;
use crate::services::fallback::StageResult;
use crate::services::fetcher::{PageFetcher, RequestProfile};
use crate::services::thumbnail::{select_thumbnail, ImagePolicy};
use crate::utils::extract_domain;
use scraper::Html;

/// Fetches the page with browser headers and reads its HTML metadata.
pub async fn extract(
    fetcher: &dyn PageFetcher,
    url: &str,
    policy: &ImagePolicy,
) -> StageResult<UrlMetadata> {
    let page = fetcher
        .get(url, &RequestProfile::browser_page())
        .await?
        .ensure_success()?;
    Ok(Some(read_page(&page.body, url, policy)))
}

pub fn read_page(body: &str, url: &str, policy: &ImagePolicy) -> UrlMetadata {
    let document = Html::parse_document(body);
    let domain = extract_domain(url);
    let og_data = og_data(&document);
    let thumbnail = select_thumbnail(&document, url, &og_data, policy);

    UrlMetadata {
        title: page_title(&document, &domain),
        description: page_description(&document),
        thumbnail,
        domain,
        og_data,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_metadata_is_collected() {
        let html = r#"<html><head>
            <title>Fallback title</title>
            <meta property="og:title" content="Launch notes">
            <meta property="og:description" content="What shipped this week">
            <meta property="og:image" content="/images/launch.png">
            <meta property="og:site_name" content="Example Blog">
        </head><body><p>Body text</p></body></html>"#;

        let metadata = read_page(html, "https://Blog.Example.com/posts/1", &ImagePolicy::default());
        assert_eq!(metadata.title, "Launch notes");
        assert_eq!(metadata.description, "What shipped this week");
        assert_eq!(metadata.domain, "blog.example.com");
        assert_eq!(
            metadata.thumbnail.as_deref(),
            Some("https://blog.example.com/images/launch.png?w=1200&h=630")
        );
        assert_eq!(metadata.og_data.get("site_name"), Some(&json!("Example Blog")));
        assert!(!metadata.is_fallback());
    }
}
