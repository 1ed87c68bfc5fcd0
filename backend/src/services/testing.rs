//! Recording fakes for the external collaborators.

use crate::models::{TranscriptLine, VideoId};
use crate::services::fetcher::{FetchError, FetchedPage, PageFetcher, RequestProfile};
use crate::services::transcript::{CaptionSource, CaptionTrack, TranscriptError};
use async_trait::async_trait;
use std::sync::Mutex;

pub fn line(start: f64, text: &str) -> TranscriptLine {
    TranscriptLine {
        start,
        text: text.to_string(),
    }
}

pub fn track(code: &str, is_generated: bool) -> CaptionTrack {
    CaptionTrack {
        language_code: code.to_string(),
        language: code.to_uppercase(),
        is_generated,
    }
}

pub struct FakeCaptionSource {
    tracks: Result<Vec<CaptionTrack>, TranscriptError>,
    served: Vec<(String, bool, Vec<TranscriptLine>)>,
    attempts: Mutex<Vec<String>>,
}

impl FakeCaptionSource {
    pub fn with_tracks(tracks: Vec<CaptionTrack>) -> Self {
        FakeCaptionSource {
            tracks: Ok(tracks),
            served: Vec::new(),
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: TranscriptError) -> Self {
        FakeCaptionSource {
            tracks: Err(error),
            served: Vec::new(),
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Makes the track `(code, is_generated)` fetchable; every other track fails.
    pub fn serving(mut self, code: &str, is_generated: bool, lines: Vec<TranscriptLine>) -> Self {
        self.served.push((code.to_string(), is_generated, lines));
        self
    }

    pub fn fetch_attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CaptionSource for FakeCaptionSource {
    async fn list_tracks(&self, _video_id: &VideoId) -> Result<Vec<CaptionTrack>, TranscriptError> {
        self.tracks.clone()
    }

    async fn fetch_track(
        &self,
        _video_id: &VideoId,
        track: &CaptionTrack,
    ) -> Result<Vec<TranscriptLine>, TranscriptError> {
        self.attempts.lock().unwrap().push(track.language_code.clone());
        self.served
            .iter()
            .find(|(code, generated, _)| *code == track.language_code && *generated == track.is_generated)
            .map(|(_, _, lines)| lines.clone())
            .ok_or_else(|| TranscriptError::Upstream(format!("{} not served", track.language_code)))
    }
}

struct Route {
    url: String,
    profile: Option<&'static str>,
    response: Result<FetchedPage, FetchError>,
}

/// Answers exact URLs from a route table and records every request in order.
#[derive(Default)]
pub struct FakeFetcher {
    routes: Vec<Route>,
    requests: Mutex<Vec<(String, &'static str)>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, status: u16, body: &str) -> Self {
        self.routes.push(Route {
            url: url.to_string(),
            profile: None,
            response: Ok(FetchedPage {
                status,
                body: body.to_string(),
            }),
        });
        self
    }

    pub fn json(self, url: &str, value: serde_json::Value) -> Self {
        self.page(url, 200, &value.to_string())
    }

    pub fn page_for_profile(mut self, url: &str, profile: &'static str, status: u16, body: &str) -> Self {
        self.routes.push(Route {
            url: url.to_string(),
            profile: Some(profile),
            response: Ok(FetchedPage {
                status,
                body: body.to_string(),
            }),
        });
        self
    }

    pub fn failure(mut self, url: &str, error: FetchError) -> Self {
        self.routes.push(Route {
            url: url.to_string(),
            profile: None,
            response: Err(error),
        });
        self
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    pub fn requested_profiles(&self) -> Vec<&'static str> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, profile)| *profile)
            .collect()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn get(&self, url: &str, profile: &RequestProfile) -> Result<FetchedPage, FetchError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), profile.name));

        self.routes
            .iter()
            .find(|route| route.url == url && route.profile.map_or(true, |p| p == profile.name))
            .map(|route| route.response.clone())
            .unwrap_or_else(|| Err(FetchError::Request(format!("connection refused: {url}"))))
    }
}
