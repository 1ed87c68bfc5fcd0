//! URL metadata: platform detection, the per-platform strategies and the
//! generic HTML reader they all fall back to.

pub mod generic;
pub mod github;
pub mod html;
pub mod placeholder;
pub mod reddit;
pub mod twitter;
pub mod youtube;

use crate::models::UrlMetadata;
use crate::services::fallback::FallbackChain;
use crate::services::fetcher::PageFetcher;
use crate::services::thumbnail::ImagePolicy;
use crate::services::youtube::YouTubeClient;
use crate::utils::{extract_domain, normalize_url};
use log::{info, warn};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Reddit,
    Twitter,
    YouTube,
    GitHub,
    Generic,
}

impl Platform {
    /// Checked in precedence order against whole host labels.
    pub fn detect(domain: &str) -> Self {
        let matches = |base: &str| {
            domain == base
                || domain
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        };

        if matches("reddit.com") || matches("redd.it") {
            Platform::Reddit
        } else if matches("twitter.com") || matches("x.com") {
            Platform::Twitter
        } else if matches("youtube.com") || matches("youtu.be") {
            Platform::YouTube
        } else if matches("github.com") {
            Platform::GitHub
        } else {
            Platform::Generic
        }
    }

    fn label(self) -> &'static str {
        match self {
            Platform::Reddit => "reddit",
            Platform::Twitter => "twitter",
            Platform::YouTube => "youtube",
            Platform::GitHub => "github",
            Platform::Generic => "generic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataOptions {
    pub include_description: bool,
    pub include_og_data: bool,
}

impl Default for MetadataOptions {
    fn default() -> Self {
        MetadataOptions {
            include_description: true,
            include_og_data: true,
        }
    }
}

#[derive(Clone)]
pub struct MetadataResolver {
    fetcher: Arc<dyn PageFetcher>,
    youtube: YouTubeClient,
    policy: ImagePolicy,
}

impl MetadataResolver {
    pub fn new(fetcher: Arc<dyn PageFetcher>, youtube: YouTubeClient, policy: ImagePolicy) -> Self {
        MetadataResolver {
            fetcher,
            youtube,
            policy,
        }
    }

    /// Never fails: when every strategy comes up empty the result is a placeholder
    /// with `error` set.
    pub async fn resolve(&self, raw_url: &str, options: MetadataOptions) -> UrlMetadata {
        let url = normalize_url(raw_url);
        let platform = Platform::detect(&extract_domain(&url));
        let fetcher = self.fetcher.as_ref();
        info!("Extracting metadata for {url} via {}", platform.label());

        let chain = FallbackChain::new("url metadata");
        let chain = match platform {
            Platform::Reddit => chain.stage("reddit", || reddit::extract(fetcher, &url)),
            Platform::Twitter => chain.stage("twitter", || twitter::extract(fetcher, &url)),
            Platform::YouTube => chain.stage("youtube", || youtube::extract(&self.youtube, &url)),
            Platform::GitHub => chain.stage("github", || github::extract(fetcher, &url)),
            Platform::Generic => chain,
        };

        let metadata = chain
            .stage("generic", || generic::extract(fetcher, &url, &self.policy))
            .run()
            .await
            .unwrap_or_else(|exhausted| {
                warn!("Metadata extraction had issues for {url}: {exhausted}");
                placeholder::build(&url, &exhausted.reason())
            });

        apply_options(metadata, options)
    }
}

fn apply_options(mut metadata: UrlMetadata, options: MetadataOptions) -> UrlMetadata {
    if metadata.is_fallback() {
        return metadata;
    }
    if !options.include_description {
        metadata.description.clear();
    }
    if !options.include_og_data {
        metadata.og_data.clear();
    }
    metadata
}
