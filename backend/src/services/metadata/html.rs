//! Lookups over a parsed HTML document shared by the scraping strategies.

use crate::models::OgData;
use crate::utils::truncate_with_ellipsis;
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};

lazy_static! {
    static ref TITLE: Selector = Selector::parse("title").expect("title selector");
    static ref H1: Selector = Selector::parse("h1").expect("h1 selector");
    static ref PARAGRAPH: Selector = Selector::parse("p").expect("p selector");
    static ref OG_META: Selector = Selector::parse(r#"meta[property^="og:"]"#).expect("og selector");
}

/// Parses `css` on demand; callers pass literals, so a parse failure means "no match".
pub fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Trimmed text content of an element.
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}

/// All non-empty `content` values of `<meta {attribute}="{key}">` tags, in document order.
pub fn meta_contents(document: &Html, attribute: &str, key: &str) -> Vec<String> {
    let Some(selector) = selector(&format!(r#"meta[{attribute}="{key}"]"#)) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|element| element.value().attr("content"))
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .map(String::from)
        .collect()
}

pub fn meta_content(document: &Html, attribute: &str, key: &str) -> Option<String> {
    meta_contents(document, attribute, key).into_iter().next()
}

/// og:title, twitter:title, `<title>`, first `<h1>`, then the bare domain.
pub fn page_title(document: &Html, domain: &str) -> String {
    meta_content(document, "property", "og:title")
        .or_else(|| meta_content(document, "name", "twitter:title"))
        .or_else(|| first_text(document, &TITLE))
        .or_else(|| first_text(document, &H1))
        .unwrap_or_else(|| domain.to_string())
}

/// og:description, twitter:description, meta description, the first paragraph, or "".
pub fn page_description(document: &Html) -> String {
    meta_content(document, "property", "og:description")
        .or_else(|| meta_content(document, "name", "twitter:description"))
        .or_else(|| meta_content(document, "name", "description"))
        .or_else(|| first_text(document, &PARAGRAPH).map(|text| truncate_with_ellipsis(&text, 200)))
        .unwrap_or_default()
}

/// Every `og:*` property without its prefix. The first occurrence of a property wins.
pub fn og_data(document: &Html) -> OgData {
    let mut og_data = OgData::new();
    for element in document.select(&OG_META) {
        let property = element
            .value()
            .attr("property")
            .and_then(|p| p.strip_prefix("og:"))
            .unwrap_or_default();
        let content = element.value().attr("content").unwrap_or_default().trim();
        if !property.is_empty() && !content.is_empty() {
            og_data
                .entry(property.to_string())
                .or_insert_with(|| serde_json::Value::String(content.to_string()));
        }
    }
    og_data
}
