pub mod health;
pub mod metadata;
pub mod transcript;

use rocket::{Catcher, Route};

pub fn routes() -> Vec<Route> {
    routes![
        transcript::extract,
        transcript::extract_markdown,
        transcript::extract_playlist,
        transcript::test_extract,
        metadata::extract_url_metadata,
        health::health,
    ]
}

pub fn catchers() -> Vec<Catcher> {
    catchers![
        health::bad_request,
        health::not_found,
        health::unprocessable,
        health::internal_error,
    ]
}

#[cfg(test)]
pub mod tests {
    use crate::config::AppConfig;
    use crate::services::metadata::MetadataResolver;
    use crate::services::testing::{FakeCaptionSource, FakeFetcher};
    use crate::services::thumbnail::ImagePolicy;
    use crate::services::transcript::TranscriptResolver;
    use crate::services::youtube::YouTubeClient;
    use crate::{build_rocket, AppState};
    use rocket::local::asynchronous::Client;
    use std::sync::Arc;

    /// Application state wired to recording fakes instead of the network.
    pub struct ApiFixture {
        fetcher: FakeFetcher,
        captions: FakeCaptionSource,
        api_key: Option<String>,
    }

    impl ApiFixture {
        pub fn new(fetcher: FakeFetcher, captions: FakeCaptionSource) -> Self {
            ApiFixture {
                fetcher,
                captions,
                api_key: None,
            }
        }

        pub fn with_api_key(mut self, key: &str) -> Self {
            self.api_key = Some(key.to_string());
            self
        }

        fn into_state(self) -> AppState {
            let api_key = self.api_key;
            let config = AppConfig::from_lookup(|key| match key {
                "YOUTUBE_API_KEY" => api_key.clone(),
                "YOUTUBE_API_BASE" => Some("https://api.test/youtube/v3".to_string()),
                _ => None,
            });
            let fetcher = Arc::new(self.fetcher);
            let youtube = YouTubeClient::new(
                fetcher.clone(),
                config.youtube_api_key.clone(),
                config.youtube_api_base.clone(),
            );

            AppState {
                transcripts: TranscriptResolver::new(
                    Arc::new(self.captions),
                    config.transcript_languages.clone(),
                ),
                metadata: MetadataResolver::new(fetcher, youtube.clone(), ImagePolicy::default()),
                youtube,
                config,
            }
        }
    }

    pub async fn client(fixture: ApiFixture) -> Client {
        let rocket = build_rocket(fixture.into_state()).expect("rocket builds");
        Client::tracked(rocket).await.expect("valid rocket instance")
    }
}
