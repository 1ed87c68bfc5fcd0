//! Picks the best preview image a page offers, from Open Graph tags down to the favicon.

use crate::models::OgData;
use crate::services::fallback::SyncFallbackChain;
use crate::services::metadata::html::{meta_content, meta_contents, selector};
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::cmp::Reverse;
use url::Url;

lazy_static! {
    static ref ICON_SIZE: Regex = Regex::new(r"(\d+)x\d+").expect("icon size pattern");
    static ref JSON_LD: Selector =
        Selector::parse(r#"script[type="application/ld+json"]"#).expect("json-ld selector");
    static ref ANY_IMAGE: Selector = Selector::parse("img[src]").expect("img selector");
    static ref LINK_WITH_REL: Selector = Selector::parse("link[rel]").expect("link selector");
}

/// Tunable keyword tables behind the image heuristics.
#[derive(Debug, Clone, Copy)]
pub struct ImagePolicy {
    /// A URL containing any of these is not considered high quality.
    pub low_quality_markers: &'static [&'static str],
    /// Substring weights summed to rank content images.
    pub quality_weights: &'static [(&'static str, i32)],
    /// Word tokens in src, alt or class that mark page chrome rather than content.
    pub ui_chrome_keywords: &'static [&'static str],
    pub min_dimension: u32,
    pub max_aspect_ratio: f64,
    /// Substring rewrites tried in order; the first one that changes the URL wins.
    pub upscale_rules: &'static [(&'static str, &'static str)],
    /// Appended to an og:image without a query string when no rule applies.
    pub upscale_query: &'static str,
    pub content_selectors: &'static [&'static str],
    pub per_selector_limit: usize,
    pub any_image_limit: usize,
}

impl Default for ImagePolicy {
    fn default() -> Self {
        ImagePolicy {
            low_quality_markers: &[
                "thumb", "small", "mini", "icon", "favicon", "32x32", "16x16", "64x64", "128x128",
            ],
            quality_weights: &[
                ("large", 2),
                ("full", 2),
                ("original", 2),
                ("hd", 2),
                ("1200", 2),
                ("1920", 2),
                ("maxres", 2),
                ("medium", 1),
                ("600", 1),
                ("800", 1),
                ("1000", 1),
                ("thumb", -1),
                ("small", -1),
                ("mini", -1),
                ("150", -1),
                ("200", -1),
                ("300", -1),
            ],
            ui_chrome_keywords: &[
                "logo", "icon", "button", "arrow", "nav", "menu", "banner", "ad", "ads", "sidebar",
                "footer", "header", "pixel", "spacer", "tracking", "analytics",
            ],
            min_dimension: 100,
            max_aspect_ratio: 5.0,
            upscale_rules: &[
                ("_normal", "_400x400"),
                ("_normal", "_bigger"),
                ("small", "large"),
                ("thumb", "full"),
                ("150x150", "1200x1200"),
                ("300x300", "1200x1200"),
            ],
            upscale_query: "?w=1200&h=630",
            content_selectors: &[
                "main img",
                "article img",
                ".content img",
                ".post img",
                ".entry img",
                "#content img",
            ],
            per_selector_limit: 3,
            any_image_limit: 5,
        }
    }
}

impl ImagePolicy {
    pub fn is_high_quality(&self, url: &str) -> bool {
        let url = url.to_lowercase();
        !self.low_quality_markers.iter().any(|marker| url.contains(marker))
    }

    pub fn score(&self, url: &str) -> i32 {
        let url = url.to_lowercase();
        self.quality_weights
            .iter()
            .filter(|(marker, _)| url.contains(marker))
            .map(|(_, weight)| weight)
            .sum()
    }

    pub fn upscale(&self, url: &str) -> String {
        for (from, to) in self.upscale_rules {
            if url.contains(from) {
                let rewritten = url.replace(from, to);
                if rewritten != url {
                    return rewritten;
                }
            }
        }
        if url.contains('?') {
            url.to_string()
        } else {
            format!("{url}{}", self.upscale_query)
        }
    }

    fn mentions_chrome(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        text.split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|token| !token.is_empty())
            .any(|token| {
                self.ui_chrome_keywords.iter().any(|keyword| {
                    token == *keyword || (keyword.len() >= 4 && token.contains(keyword))
                })
            })
    }

    /// Rejects page chrome, tiny images and extreme aspect ratios.
    fn is_content_image(&self, image: ElementRef<'_>, src: &str) -> bool {
        let element = image.value();
        let alt = element.attr("alt").unwrap_or_default();
        let class = element.attr("class").unwrap_or_default();
        if [src, alt, class].iter().any(|text| self.mentions_chrome(text)) {
            return false;
        }

        let width = dimension(element.attr("width"));
        let height = dimension(element.attr("height"));
        if let Some(w) = width {
            if w < self.min_dimension {
                return false;
            }
        }
        if let Some(h) = height {
            if h < self.min_dimension {
                return false;
            }
        }
        if let (Some(w), Some(h)) = (width, height) {
            if w > 0 && h > 0 {
                let ratio = f64::from(w.max(h)) / f64::from(w.min(h));
                if ratio > self.max_aspect_ratio {
                    return false;
                }
            }
        }
        true
    }
}

fn dimension(value: Option<&str>) -> Option<u32> {
    value.and_then(|v| v.trim().trim_end_matches("px").parse().ok())
}

/// Resolves `candidate` against the page URL.
pub fn resolve_url(candidate: &str, base_url: &str) -> Option<String> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }
    if candidate.starts_with("//") {
        return Some(format!("https:{candidate}"));
    }
    if candidate.starts_with("http") {
        return Some(candidate.to_string());
    }
    let base = Url::parse(base_url).ok()?;
    base.join(candidate).ok().map(String::from)
}

/// Runs the selection cascade over a parsed page. Returns `None` when the page has no usable image.
pub fn select_thumbnail(
    document: &Html,
    base_url: &str,
    og_data: &OgData,
    policy: &ImagePolicy,
) -> Option<String> {
    SyncFallbackChain::new("thumbnail")
        .stage("og:image", || {
            Ok(og_data
                .get("image")
                .and_then(Value::as_str)
                .and_then(|image| resolve_url(image, base_url))
                .map(|image| policy.upscale(&image)))
        })
        .stage("og:image candidates", || {
            let candidates = meta_contents(document, "property", "og:image");
            if candidates.len() < 2 {
                return Ok(None);
            }
            Ok(candidates
                .iter()
                .find(|image| policy.is_high_quality(image))
                .and_then(|image| resolve_url(image, base_url)))
        })
        .stage("twitter:image", || {
            let lookups = [
                ("name", "twitter:image"),
                ("name", "twitter:image:src"),
                ("property", "twitter:image"),
            ];
            Ok(lookups
                .iter()
                .filter_map(|(attribute, key)| meta_content(document, attribute, key))
                .filter_map(|image| resolve_url(&image, base_url))
                .find(|image| policy.is_high_quality(image)))
        })
        .stage("json-ld", || Ok(json_ld_image(document, base_url)))
        .stage("content images", || {
            Ok(content_image(document, base_url, policy))
        })
        .stage("apple-touch-icon", || {
            Ok(largest_icon(document, base_url, "apple-touch-icon"))
        })
        .stage("favicon", || Ok(largest_icon(document, base_url, "icon")))
        .run()
        .ok()
}

fn json_ld_image(document: &Html, base_url: &str) -> Option<String> {
    let mut images = Vec::new();
    for script in document.select(&JSON_LD) {
        let raw = script.text().collect::<String>();
        if let Ok(data) = serde_json::from_str::<Value>(&raw) {
            collect_schema_images(&data, &mut images);
        }
    }
    images
        .iter()
        .find_map(|image| resolve_url(image, base_url))
}

fn collect_schema_images(value: &Value, images: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            match map.get("image") {
                Some(Value::String(image)) => images.push(image.clone()),
                Some(Value::Array(items)) => images.extend(items.iter().filter_map(image_url)),
                Some(image @ Value::Object(_)) => images.extend(image_url(image)),
                _ => {}
            }
            for nested in map.values() {
                collect_schema_images(nested, images);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_schema_images(item, images);
            }
        }
        _ => {}
    }
}

fn image_url(value: &Value) -> Option<String> {
    match value {
        Value::String(url) => Some(url.clone()),
        Value::Object(map) => map.get("url").and_then(Value::as_str).map(String::from),
        _ => None,
    }
}

fn content_image(document: &Html, base_url: &str, policy: &ImagePolicy) -> Option<String> {
    let mut images: Vec<String> = Vec::new();
    let consider = |image: ElementRef<'_>, images: &mut Vec<String>| {
        let element = image.value();
        let Some(src) = ["src", "data-src", "data-lazy-src"]
            .iter()
            .find_map(|attr| element.attr(attr).filter(|v| !v.trim().is_empty()))
        else {
            return;
        };
        if !policy.is_content_image(image, src) {
            return;
        }
        if let Some(resolved) = resolve_url(src, base_url) {
            if !images.contains(&resolved) {
                images.push(resolved);
            }
        }
    };

    for css in policy.content_selectors {
        if let Some(content) = selector(css) {
            for image in document.select(&content).take(policy.per_selector_limit) {
                consider(image, &mut images);
            }
        }
    }
    for image in document.select(&ANY_IMAGE).take(policy.any_image_limit) {
        consider(image, &mut images);
    }

    images.sort_by_key(|image| Reverse(policy.score(image)));
    images.into_iter().next()
}

/// The `<link>` whose rel contains `rel_marker` with the largest declared size; undeclared sizes count as 0.
fn largest_icon(document: &Html, base_url: &str, rel_marker: &str) -> Option<String> {
    let mut best: Option<(u32, &str)> = None;
    for link in document.select(&LINK_WITH_REL) {
        let element = link.value();
        let rel = element.attr("rel").unwrap_or_default().to_lowercase();
        if !rel.contains(rel_marker) {
            continue;
        }
        let Some(href) = element.attr("href").filter(|h| !h.trim().is_empty()) else {
            continue;
        };
        let size = element
            .attr("sizes")
            .and_then(|sizes| ICON_SIZE.captures(sizes))
            .and_then(|caps| caps[1].parse().ok())
            .unwrap_or(0);
        if best.map_or(true, |(best_size, _)| size > best_size) {
            best = Some((size, href));
        }
    }
    best.and_then(|(_, href)| resolve_url(href, base_url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::metadata::html::og_data;

    const BASE: &str = "https://news.example.com/articles/story";

    fn pick(html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        let og = og_data(&document);
        select_thumbnail(&document, BASE, &og, &ImagePolicy::default())
    }

    #[test]
    fn og_image_is_upscaled() {
        let picked = pick(
            r#"<html><head><meta property="og:image" content="https://pbs.twimg.com/profile_images/1/me_normal.jpg"></head></html>"#,
        );
        assert_eq!(
            picked.as_deref(),
            Some("https://pbs.twimg.com/profile_images/1/me_400x400.jpg")
        );
    }

    #[test]
    fn og_image_gets_size_query_only_without_one() {
        assert_eq!(
            pick(r#"<meta property="og:image" content="/img/cover.jpg">"#).as_deref(),
            Some("https://news.example.com/img/cover.jpg?w=1200&h=630")
        );
        assert_eq!(
            pick(r#"<meta property="og:image" content="https://cdn.example.com/cover.jpg?v=3">"#)
                .as_deref(),
            Some("https://cdn.example.com/cover.jpg?v=3")
        );
    }

    #[test]
    fn og_image_beats_favicon() {
        let picked = pick(
            r#"<html><head>
                <link rel="icon" href="/favicon.ico">
                <meta property="og:image" content="https://cdn.example.com/hero.jpg?x=1">
            </head></html>"#,
        );
        assert_eq!(picked.as_deref(), Some("https://cdn.example.com/hero.jpg?x=1"));
    }

    #[test]
    fn twitter_image_skips_low_quality() {
        let picked = pick(
            r#"<html><head>
                <meta name="twitter:image" content="https://cdn.example.com/thumb.jpg">
                <meta name="twitter:image:src" content="https://cdn.example.com/card.jpg">
            </head></html>"#,
        );
        assert_eq!(picked.as_deref(), Some("https://cdn.example.com/card.jpg"));
    }

    #[test]
    fn json_ld_image_objects_are_searched() {
        let picked = pick(
            r#"<html><head><script type="application/ld+json">
                {"@graph": [{"@type": "NewsArticle", "image": {"url": "https://cdn.example.com/ld.jpg"}}]}
            </script></head></html>"#,
        );
        assert_eq!(picked.as_deref(), Some("https://cdn.example.com/ld.jpg"));
    }

    #[test]
    fn content_images_skip_chrome_and_rank_by_quality() {
        let picked = pick(
            r#"<html><body>
                <header><img src="/static/site-logo.png" width="300" height="80"></header>
                <article>
                    <img src="/media/photo-small.jpg" width="400" height="300">
                    <img src="/media/spacer.gif" width="1" height="1">
                    <img src="/media/photo-large.jpg" width="1200" height="800">
                </article>
            </body></html>"#,
        );
        assert_eq!(
            picked.as_deref(),
            Some("https://news.example.com/media/photo-large.jpg")
        );
    }

    #[test]
    fn wide_strips_are_rejected() {
        let picked = pick(
            r#"<html><body><main><img src="/media/strip.jpg" width="1200" height="100"></main></body></html>"#,
        );
        assert_eq!(picked, None);
    }

    #[test]
    fn largest_apple_touch_icon_wins() {
        let picked = pick(
            r#"<html><head>
                <link rel="icon" href="/favicon.ico">
                <link rel="apple-touch-icon" sizes="120x120" href="/touch-120.png">
                <link rel="apple-touch-icon" sizes="180x180" href="/touch-180.png">
            </head></html>"#,
        );
        assert_eq!(picked.as_deref(), Some("https://news.example.com/touch-180.png"));
    }

    #[test]
    fn favicon_without_sizes_is_eligible() {
        let picked = pick(r#"<html><head><link rel="Shortcut Icon" href="//static.example.com/f.ico"></head></html>"#);
        assert_eq!(picked.as_deref(), Some("https://static.example.com/f.ico"));
    }

    #[test]
    fn empty_page_has_no_thumbnail() {
        assert_eq!(pick("<html><body><p>text only</p></body></html>"), None);
    }

    #[test]
    fn chrome_keywords_match_whole_tokens() {
        let policy = ImagePolicy::default();
        assert!(policy.mentions_chrome("/img/nav-arrow.png"));
        assert!(policy.mentions_chrome("top-banner1.jpg"));
        assert!(!policy.mentions_chrome("/uploads/adventure-road.jpg"));
    }

    #[test]
    fn relative_urls_resolve_against_page() {
        assert_eq!(
            resolve_url("img/a.png", BASE).as_deref(),
            Some("https://news.example.com/articles/img/a.png")
        );
        assert_eq!(
            resolve_url("/a.png", BASE).as_deref(),
            Some("https://news.example.com/a.png")
        );
        assert_eq!(resolve_url("  ", BASE), None);
    }
}
