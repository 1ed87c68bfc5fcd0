use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::time::Duration;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const BROWSER_HEADERS: &[(&str, &str)] = &[
    ("User-Agent", BROWSER_USER_AGENT),
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
    ),
    ("Accept-Language", "en-US,en;q=0.9"),
    ("DNT", "1"),
    ("Upgrade-Insecure-Requests", "1"),
    ("Sec-Fetch-Dest", "document"),
    ("Sec-Fetch-Mode", "navigate"),
    ("Sec-Fetch-Site", "none"),
    ("Sec-Fetch-User", "?1"),
    ("Cache-Control", "max-age=0"),
];

/// Header overrides and timeout for one request; the client's browser headers fill the rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestProfile {
    pub name: &'static str,
    pub headers: &'static [(&'static str, &'static str)],
    pub timeout: Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Platform APIs and scrapes.
    Api,
    /// Full page fetches of the generic strategy.
    Page,
}

impl RequestProfile {
    pub const fn new(
        name: &'static str,
        headers: &'static [(&'static str, &'static str)],
        timeout: Timeout,
    ) -> Self {
        RequestProfile {
            name,
            headers,
            timeout,
        }
    }

    pub const fn browser_api() -> Self {
        Self::new("browser", &[], Timeout::Api)
    }

    pub const fn browser_page() -> Self {
        Self::new("browser", &[], Timeout::Page)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Fails with [`FetchError::Status`] unless the status is 2xx.
    pub fn ensure_success(self) -> Result<Self, FetchError> {
        if (200..300).contains(&self.status) {
            Ok(self)
        } else {
            Err(FetchError::Status(self.status))
        }
    }

    pub fn json(&self) -> Result<serde_json::Value, FetchError> {
        serde_json::from_str(&self.body).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("Request timeout ({0}s)")]
    Timeout(u64),
    #[error("HTTP error: {0}")]
    Status(u16),
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Parsing error: {0}")]
    Parse(String),
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn get(&self, url: &str, profile: &RequestProfile) -> Result<FetchedPage, FetchError>;
}

/// Pooled `reqwest` client shared by every strategy for the lifetime of the process.
pub struct ReqwestFetcher {
    client: Client,
    api_timeout: Duration,
    page_timeout: Duration,
}

impl ReqwestFetcher {
    pub fn new(api_timeout: Duration, page_timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in BROWSER_HEADERS {
            headers.insert(
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_str(value)?,
            );
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(page_timeout)
            .build()?;

        Ok(ReqwestFetcher {
            client,
            api_timeout,
            page_timeout,
        })
    }

    fn timeout_for(&self, profile: &RequestProfile) -> Duration {
        match profile.timeout {
            Timeout::Api => self.api_timeout,
            Timeout::Page => self.page_timeout,
        }
    }
}

#[async_trait]
impl PageFetcher for ReqwestFetcher {
    async fn get(&self, url: &str, profile: &RequestProfile) -> Result<FetchedPage, FetchError> {
        let timeout = self.timeout_for(profile);
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout(timeout.as_secs())
            } else {
                FetchError::Request(e.to_string())
            }
        };

        let mut request = self.client.get(url).timeout(timeout);
        for (name, value) in profile.headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;

        Ok(FetchedPage { status, body })
    }
}
