use crate::services::fetcher::{PageFetcher, ReqwestFetcher};
use crate::services::metadata::MetadataResolver;
use crate::services::thumbnail::ImagePolicy;
use crate::services::transcript::{TranscriptResolver, YtTranscriptSource};
use crate::services::youtube::YouTubeClient;
use crate::AppState;
use anyhow::Result;
use env_logger::Builder;
use log::{info, LevelFilter};
use rocket::http::Method;
use rocket_cors::{AllowedHeaders, AllowedOrigins, CorsOptions};
use std::env;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:8000,https://*.github.io,https://*.netlify.app,https://*.vercel.app";
const DEFAULT_YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Process configuration, read once at startup and handed to every service.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub youtube_api_key: Option<String>,
    pub youtube_api_base: String,
    pub cors_origins: Vec<String>,
    pub port: u16,
    pub transcript_languages: Vec<String>,
    pub api_timeout: Duration,
    pub page_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Unparseable numbers fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let seconds = |key: &str, default: u64| {
            Duration::from_secs(
                non_empty(key)
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(default),
            )
        };

        AppConfig {
            youtube_api_key: non_empty("YOUTUBE_API_KEY"),
            youtube_api_base: non_empty("YOUTUBE_API_BASE")
                .unwrap_or_else(|| DEFAULT_YOUTUBE_API_BASE.to_string()),
            cors_origins: split_list(
                &non_empty("CORS_ORIGINS").unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string()),
            ),
            port: non_empty("PORT")
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(5002),
            transcript_languages: split_list(
                &non_empty("TRANSCRIPT_LANGUAGES").unwrap_or_else(|| "en".to_string()),
            ),
            api_timeout: seconds("API_TIMEOUT_SECS", 10),
            page_timeout: seconds("PAGE_TIMEOUT_SECS", 15),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

pub fn init_logger() {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();
    info!("Starting Rocket backend...");
}

pub fn load_environment() {
    dotenv::dotenv().ok();
}

pub fn create_app_state(config: &AppConfig) -> Result<AppState> {
    let fetcher: Arc<dyn PageFetcher> =
        Arc::new(ReqwestFetcher::new(config.api_timeout, config.page_timeout)?);

    if config.youtube_api_key.is_none() {
        info!("YOUTUBE_API_KEY not set: video metadata uses oEmbed and playlists are unavailable");
    }
    let youtube = YouTubeClient::new(
        fetcher.clone(),
        config.youtube_api_key.clone(),
        config.youtube_api_base.clone(),
    );
    let captions = Arc::new(YtTranscriptSource::new(config.api_timeout)?);

    Ok(AppState {
        config: config.clone(),
        youtube: youtube.clone(),
        transcripts: TranscriptResolver::new(captions, config.transcript_languages.clone()),
        metadata: MetadataResolver::new(fetcher, youtube, ImagePolicy::default()),
    })
}

/// `https://*.github.io` -> `^https://[^/]+\.github\.io$`
fn origin_pattern(origin: &str) -> String {
    let escaped = regex::escape(origin).replace(r"\*", "[^/]+");
    format!("^{escaped}$")
}

pub fn create_cors(config: &AppConfig) -> Result<rocket_cors::Cors> {
    let (wildcards, exact): (Vec<&String>, Vec<&String>) =
        config.cors_origins.iter().partition(|origin| origin.contains('*'));
    let patterns: Vec<String> = wildcards.iter().map(|origin| origin_pattern(origin)).collect();

    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::some(&exact, &patterns))
        .allowed_methods(
            vec![Method::Get, Method::Post, Method::Options]
                .into_iter()
                .map(From::from)
                .collect(),
        )
        .allowed_headers(AllowedHeaders::some(&["Accept", "Content-Type"]))
        .to_cors()
        .map_err(|e| anyhow::anyhow!("Failed to create CORS options: {}", e))?;

    Ok(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = config_from(&[]);
        assert_eq!(config.youtube_api_key, None);
        assert_eq!(config.port, 5002);
        assert_eq!(config.transcript_languages, vec!["en".to_string()]);
        assert_eq!(config.api_timeout, Duration::from_secs(10));
        assert_eq!(config.page_timeout, Duration::from_secs(15));
        assert_eq!(config.cors_origins.len(), 4);
    }

    #[test]
    fn lists_and_numbers_are_parsed() {
        let config = config_from(&[
            ("YOUTUBE_API_KEY", "  "),
            ("TRANSCRIPT_LANGUAGES", "de, en ,"),
            ("PORT", "8080"),
            ("PAGE_TIMEOUT_SECS", "soon"),
        ]);
        assert_eq!(config.youtube_api_key, None);
        assert_eq!(config.transcript_languages, vec!["de".to_string(), "en".to_string()]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.page_timeout, Duration::from_secs(15));
    }

    #[test]
    fn wildcard_origins_become_anchored_patterns() {
        let pattern = regex::Regex::new(&origin_pattern("https://*.github.io")).unwrap();
        assert!(pattern.is_match("https://ferris.github.io"));
        assert!(!pattern.is_match("https://evil.com/.github.io"));
        assert!(!pattern.is_match("https://ferris.github.io.evil.com"));
    }

    #[test]
    fn cors_builds_from_default_origins() {
        assert!(create_cors(&config_from(&[])).is_ok());
    }
}
