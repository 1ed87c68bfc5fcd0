use crate::models::{ResolvedTranscript, TranscriptLine, VideoId};
use crate::services::fallback::{FallbackChain, StageResult};
use crate::services::fetcher::BROWSER_USER_AGENT;
use async_trait::async_trait;
use log::{debug, info, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use yt_transcript_rs::api::YouTubeTranscriptApi;
use yt_transcript_rs::errors::CouldNotRetrieveTranscript;
use yt_transcript_rs::{Transcript, TranscriptList};

/// One caption track advertised for a video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTrack {
    pub language_code: String,
    pub language: String,
    pub is_generated: bool,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TranscriptError {
    #[error("transcripts are disabled for video {0}")]
    Disabled(String),
    #[error("video {0} is unavailable")]
    VideoUnavailable(String),
    #[error("no transcript found for video {0}")]
    NotFound(String),
    #[error("caption service failed: {0}")]
    Upstream(String),
}

impl TranscriptError {
    /// Terminal errors end the search without trying another track.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TranscriptError::Disabled(_) | TranscriptError::VideoUnavailable(_)
        )
    }
}

/// The caption service, normalized to [`CaptionTrack`] and [`TranscriptLine`].
#[async_trait]
pub trait CaptionSource: Send + Sync {
    async fn list_tracks(&self, video_id: &VideoId) -> Result<Vec<CaptionTrack>, TranscriptError>;

    async fn fetch_track(
        &self,
        video_id: &VideoId,
        track: &CaptionTrack,
    ) -> Result<Vec<TranscriptLine>, TranscriptError>;
}

/// [`CaptionSource`] backed by `yt-transcript-rs`.
pub struct YtTranscriptSource {
    api: YouTubeTranscriptApi,
    client: reqwest::Client,
    timeout: Duration,
}

impl YtTranscriptSource {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("en-US"),
        );
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build caption HTTP client: {e}"))?;
        let api = YouTubeTranscriptApi::new(None, None, Some(client.clone()))
            .map_err(|e| anyhow::anyhow!("Failed to create YouTubeTranscriptApi: {e}"))?;
        Ok(YtTranscriptSource {
            api,
            client,
            timeout,
        })
    }

    async fn bounded<T, E: std::fmt::Debug + std::fmt::Display>(
        &self,
        video_id: &VideoId,
        call: impl Future<Output = Result<T, E>>,
    ) -> Result<T, TranscriptError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(|e| classify_error(video_id, &e)),
            Err(_) => Err(TranscriptError::Upstream(format!(
                "timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

/// Looks the track up only among tracks of the same origin, so a generated
/// track is never answered by a manual one sharing its language code.
fn pick_track(
    list: &TranscriptList,
    track: &CaptionTrack,
) -> Result<Transcript, CouldNotRetrieveTranscript> {
    let codes = [track.language_code.as_str()];
    if track.is_generated {
        list.find_generated_transcript(&codes)
    } else {
        list.find_manually_created_transcript(&codes)
    }
}

/// Maps the library's error onto the service taxonomy by its variant name or message.
fn classify_error<E: std::fmt::Debug + std::fmt::Display>(video_id: &VideoId, error: &E) -> TranscriptError {
    let debug = format!("{error:?}");
    let message = error.to_string();
    let lowered = message.to_lowercase();

    if debug.contains("TranscriptsDisabled") || lowered.contains("subtitles are disabled") {
        TranscriptError::Disabled(video_id.to_string())
    } else if debug.contains("VideoUnavailable") || lowered.contains("no longer available") {
        TranscriptError::VideoUnavailable(video_id.to_string())
    } else if debug.contains("NoTranscriptFound") {
        TranscriptError::NotFound(video_id.to_string())
    } else {
        TranscriptError::Upstream(message)
    }
}

#[async_trait]
impl CaptionSource for YtTranscriptSource {
    async fn list_tracks(&self, video_id: &VideoId) -> Result<Vec<CaptionTrack>, TranscriptError> {
        let list = self
            .bounded(video_id, self.api.list_transcripts(video_id.as_str()))
            .await?;

        let mut manual: Vec<CaptionTrack> = list
            .manually_created_transcripts
            .iter()
            .map(|(code, transcript)| CaptionTrack {
                language_code: code.clone(),
                language: transcript.language.clone(),
                is_generated: false,
            })
            .collect();
        let mut generated: Vec<CaptionTrack> = list
            .generated_transcripts
            .iter()
            .map(|(code, transcript)| CaptionTrack {
                language_code: code.clone(),
                language: transcript.language.clone(),
                is_generated: true,
            })
            .collect();

        manual.sort_by(|a, b| a.language_code.cmp(&b.language_code));
        generated.sort_by(|a, b| a.language_code.cmp(&b.language_code));
        manual.extend(generated);
        Ok(manual)
    }

    async fn fetch_track(
        &self,
        video_id: &VideoId,
        track: &CaptionTrack,
    ) -> Result<Vec<TranscriptLine>, TranscriptError> {
        let list = self
            .bounded(video_id, self.api.list_transcripts(video_id.as_str()))
            .await?;
        let selected = pick_track(&list, track)
            .map_err(|_| TranscriptError::NotFound(video_id.to_string()))?;
        let transcript = self
            .bounded(video_id, selected.fetch(&self.client, false))
            .await?;

        Ok(transcript
            .into_iter()
            .map(|entry| TranscriptLine {
                start: entry.start,
                text: entry.text,
            })
            .collect())
    }
}

/// Trims text, clamps negative starts and orders lines by start time.
pub fn normalize_lines(lines: Vec<TranscriptLine>) -> Vec<TranscriptLine> {
    let mut lines: Vec<TranscriptLine> = lines
        .into_iter()
        .map(|line| TranscriptLine {
            start: if line.start.is_finite() { line.start.max(0.0) } else { 0.0 },
            text: line.text.trim().to_string(),
        })
        .collect();
    lines.sort_by(|a, b| a.start.total_cmp(&b.start));
    lines
}

/// Picks the best caption track for a video across language preference and track origin.
#[derive(Clone)]
pub struct TranscriptResolver {
    source: Arc<dyn CaptionSource>,
    default_languages: Vec<String>,
}

impl TranscriptResolver {
    pub fn new(source: Arc<dyn CaptionSource>, default_languages: Vec<String>) -> Self {
        TranscriptResolver {
            source,
            default_languages,
        }
    }

    pub fn default_languages(&self) -> &[String] {
        &self.default_languages
    }

    /// Returns `None` when the video has no fetchable track.
    ///
    /// Order: each preferred language, then any manual track, then any
    /// generated track, then any track at all. A failed fetch only skips that
    /// track; disabled transcripts or an unavailable video stop immediately.
    pub async fn resolve(
        &self,
        video_id: &VideoId,
        preferred_languages: &[String],
    ) -> Option<ResolvedTranscript> {
        info!("Attempting to extract transcript for video: {video_id}");

        let tracks = match self.source.list_tracks(video_id).await {
            Ok(tracks) => tracks,
            Err(e) if e.is_terminal() => {
                info!("No transcript for {video_id}: {e}");
                return None;
            }
            Err(e) => {
                warn!("Failed to list transcripts for {video_id}: {e}");
                return None;
            }
        };
        debug!(
            "Available transcripts for {video_id}: {:?}",
            tracks.iter().map(|t| t.language_code.as_str()).collect::<Vec<_>>()
        );

        let tracks = &tracks;
        let mut chain = FallbackChain::new("transcript");
        for language in preferred_languages {
            chain = chain.stage(format!("language {language}"), move || async move {
                let mut matching: Vec<&CaptionTrack> = tracks
                    .iter()
                    .filter(|t| &t.language_code == language)
                    .collect();
                matching.sort_by_key(|t| t.is_generated);
                self.first_fetchable(video_id, matching).await
            });
        }

        let result = chain
            .stage("manual", move || {
                self.first_fetchable(video_id, tracks.iter().filter(|t| !t.is_generated).collect())
            })
            .stage("generated", move || {
                self.first_fetchable(video_id, tracks.iter().filter(|t| t.is_generated).collect())
            })
            .stage("any", move || self.first_fetchable(video_id, tracks.iter().collect()))
            .run()
            .await;

        match result {
            Ok(transcript) => {
                info!(
                    "Found transcript in language: {}, lines: {}",
                    transcript.language,
                    transcript.lines.len()
                );
                Some(transcript)
            }
            Err(e) => {
                info!("No transcripts could be fetched for {video_id}: {}", e.reason());
                None
            }
        }
    }

    async fn first_fetchable(
        &self,
        video_id: &VideoId,
        candidates: Vec<&CaptionTrack>,
    ) -> StageResult<ResolvedTranscript> {
        for track in candidates {
            match self.source.fetch_track(video_id, track).await {
                Ok(lines) => {
                    return Ok(Some(ResolvedTranscript {
                        language: track.language_code.clone(),
                        lines: normalize_lines(lines),
                    }))
                }
                Err(e) => {
                    warn!(
                        "Fetching {} [{}] transcript ({}) for {video_id} failed: {e}",
                        track.language,
                        track.language_code,
                        if track.is_generated { "generated" } else { "manual" }
                    );
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{line, track, FakeCaptionSource};

    fn resolver(source: FakeCaptionSource) -> (TranscriptResolver, Arc<FakeCaptionSource>) {
        let source = Arc::new(source);
        (
            TranscriptResolver::new(source.clone(), vec!["en".to_string()]),
            source,
        )
    }

    fn video() -> VideoId {
        VideoId::new_unchecked("dQw4w9WgXcQ")
    }

    #[rocket::async_test]
    async fn preferred_language_wins() {
        let (resolver, _) = resolver(
            FakeCaptionSource::with_tracks(vec![track("fr", false), track("en", true)])
                .serving("fr", false, vec![line(0.0, "bonjour")])
                .serving("en", true, vec![line(0.0, "hello")]),
        );

        let transcript = resolver.resolve(&video(), &["en".to_string()]).await.unwrap();
        assert_eq!(transcript.language, "en");
        assert_eq!(transcript.lines[0].text, "hello");
    }

    #[rocket::async_test]
    async fn manual_track_beats_generated_without_language_match() {
        let (resolver, _) = resolver(
            FakeCaptionSource::with_tracks(vec![track("es", true), track("fr", false)])
                .serving("es", true, vec![line(0.0, "hola")])
                .serving("fr", false, vec![line(0.0, "bonjour")]),
        );

        let transcript = resolver.resolve(&video(), &["en".to_string()]).await.unwrap();
        assert_eq!(transcript.language, "fr");
    }

    #[rocket::async_test]
    async fn disabled_transcripts_stop_before_any_fetch() {
        let (resolver, source) = resolver(FakeCaptionSource::failing(TranscriptError::Disabled(
            "dQw4w9WgXcQ".to_string(),
        )));

        assert!(resolver.resolve(&video(), &["en".to_string()]).await.is_none());
        assert!(source.fetch_attempts().is_empty());
    }

    #[rocket::async_test]
    async fn unavailable_video_stops_before_any_fetch() {
        let (resolver, source) = resolver(FakeCaptionSource::failing(
            TranscriptError::VideoUnavailable("dQw4w9WgXcQ".to_string()),
        ));

        assert!(resolver.resolve(&video(), &["en".to_string()]).await.is_none());
        assert!(source.fetch_attempts().is_empty());
    }

    fn library_track(code: &str, is_generated: bool) -> Transcript {
        Transcript::new(
            "dQw4w9WgXcQ".to_string(),
            format!("https://www.youtube.com/api/timedtext?lang={code}"),
            "English".to_string(),
            code.to_string(),
            is_generated,
            Vec::new(),
        )
    }

    #[test]
    fn generated_track_is_picked_even_when_manual_shares_its_code() {
        let manual = [("en".to_string(), library_track("en", false))].into_iter().collect();
        let generated = [("en".to_string(), library_track("en", true))].into_iter().collect();
        let list = TranscriptList::new("dQw4w9WgXcQ".to_string(), manual, generated, Vec::new());

        assert!(pick_track(&list, &track("en", true)).unwrap().is_generated);
        assert!(!pick_track(&list, &track("en", false)).unwrap().is_generated);
    }

    #[test]
    fn picking_a_missing_origin_fails() {
        let manual = [("en".to_string(), library_track("en", false))].into_iter().collect();
        let list = TranscriptList::new(
            "dQw4w9WgXcQ".to_string(),
            manual,
            std::collections::HashMap::new(),
            Vec::new(),
        );

        assert!(pick_track(&list, &track("en", true)).is_err());
    }

    #[rocket::async_test]
    async fn failed_fetch_moves_on_to_the_next_candidate() {
        let (resolver, source) = resolver(
            FakeCaptionSource::with_tracks(vec![track("de", false), track("fr", false)])
                .serving("fr", false, vec![line(1.0, "salut")]),
        );

        let transcript = resolver.resolve(&video(), &["en".to_string()]).await.unwrap();
        assert_eq!(transcript.language, "fr");
        assert_eq!(source.fetch_attempts(), vec!["de".to_string(), "fr".to_string()]);
    }

    #[rocket::async_test]
    async fn every_fetch_failing_yields_none() {
        let (resolver, _) = resolver(FakeCaptionSource::with_tracks(vec![
            track("en", true),
            track("fr", false),
        ]));

        assert!(resolver.resolve(&video(), &["en".to_string()]).await.is_none());
    }

    #[rocket::async_test]
    async fn lines_are_trimmed_and_sorted() {
        let (resolver, _) = resolver(
            FakeCaptionSource::with_tracks(vec![track("en", false)]).serving(
                "en",
                false,
                vec![line(5.0, "  second "), line(-1.0, "first\n")],
            ),
        );

        let transcript = resolver.resolve(&video(), &["en".to_string()]).await.unwrap();
        assert_eq!(
            transcript.lines,
            vec![line(0.0, "first"), line(5.0, "second")]
        );
    }

    #[test]
    fn library_errors_are_classified_by_variant() {
        #[derive(Debug)]
        enum Reason {
            TranscriptsDisabled,
        }
        struct LibError(Reason);
        impl std::fmt::Debug for LibError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "CouldNotRetrieveTranscript {{ reason: {:?} }}", self.0)
            }
        }
        impl std::fmt::Display for LibError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("Could not retrieve a transcript")
            }
        }

        let error = classify_error(&video(), &LibError(Reason::TranscriptsDisabled));
        assert!(error.is_terminal());
        assert_eq!(
            classify_error(&video(), &"connection reset".to_string()),
            TranscriptError::Upstream("connection reset".to_string())
        );
    }
}
