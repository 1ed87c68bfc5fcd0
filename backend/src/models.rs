use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::Responder;
use rocket::{response, Response};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Cursor;

/// Platform-specific key/value pairs attached to a metadata result.
pub type OgData = BTreeMap<String, serde_json::Value>;

/// 11-character YouTube video token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Wraps an already validated token. Use `utils::resolve_video_id` for untrusted input.
    pub(crate) fn new_unchecked(id: impl Into<String>) -> Self {
        VideoId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PlaylistId(String);

impl PlaylistId {
    pub(crate) fn new_unchecked(id: impl Into<String>) -> Self {
        PlaylistId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A statistic the upstream API may refuse to reveal.
///
/// Serializes as a number when known and as `"N/A"` otherwise, so a hidden
/// like count never renders as `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    Known(u64),
    Unavailable,
}

impl Count {
    pub fn from_api(value: &serde_json::Value) -> Self {
        let parsed = match value {
            serde_json::Value::String(s) => s.parse::<u64>().ok(),
            serde_json::Value::Number(n) => n.as_u64(),
            _ => None,
        };
        parsed.map(Count::Known).unwrap_or(Count::Unavailable)
    }
}

impl Serialize for Count {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Count::Known(n) => serializer.serialize_u64(*n),
            Count::Unavailable => serializer.serialize_str("N/A"),
        }
    }
}

fn number_or_unknown<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(n) => serializer.serialize_u64(*n),
        None => serializer.serialize_str("Unknown"),
    }
}

fn text_or_unknown<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.as_deref().unwrap_or("Unknown"))
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub title: String,
    pub channel: String,
    pub thumbnail: Option<String>,
    pub views: Count,
    pub likes: Count,
    pub comments: Count,
    #[serde(serialize_with = "number_or_unknown")]
    pub duration: Option<u64>, // in seconds
    #[serde(serialize_with = "text_or_unknown")]
    pub publish_date: Option<String>,
    pub description: String,
    pub url: String,
}

impl VideoMetadata {
    /// Placeholder used when neither the Data API nor oEmbed answered.
    pub fn unavailable(video_id: &VideoId) -> Self {
        VideoMetadata {
            title: "Video Title (Unable to fetch)".to_string(),
            channel: "Channel Name (Unable to fetch)".to_string(),
            thumbnail: Some(format!(
                "https://img.youtube.com/vi/{video_id}/maxresdefault.jpg"
            )),
            views: Count::Unavailable,
            likes: Count::Unavailable,
            comments: Count::Unavailable,
            duration: None,
            publish_date: None,
            description: "Metadata not available".to_string(),
            url: video_id.watch_url(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptLine {
    pub start: f64,
    pub text: String,
}

/// The caption track chosen for a video, already normalized and ordered by start time.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTranscript {
    pub language: String,
    pub lines: Vec<TranscriptLine>,
}

/// Result of the metadata resolver. `error` is set when the values are a best-effort guess.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlMetadata {
    pub title: String,
    pub description: String,
    pub thumbnail: Option<String>,
    pub domain: String,
    pub og_data: OgData,
    pub error: Option<String>,
}

impl UrlMetadata {
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    #[serde(default)]
    pub url: String,
    pub languages: Option<Vec<String>>,
    pub include_description: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    pub success: bool,
    pub video_id: VideoId,
    pub metadata: VideoMetadata,
    pub transcript: Vec<TranscriptLine>,
    pub transcript_language: String,
    pub extracted_at: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistRequest {
    #[serde(default)]
    pub url: String,
    pub max_videos: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PlaylistItem {
    #[serde(rename_all = "camelCase")]
    Extracted {
        success: bool,
        video_id: VideoId,
        metadata: VideoMetadata,
        transcript: Vec<TranscriptLine>,
        transcript_language: String,
    },
    #[serde(rename_all = "camelCase")]
    Failed {
        success: bool,
        video_id: VideoId,
        metadata: VideoMetadata,
        error: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistResponse {
    pub success: bool,
    pub playlist_id: PlaylistId,
    pub total_videos: usize,
    pub processed_videos: usize,
    pub results: Vec<PlaylistItem>,
    pub extracted_at: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRequest {
    #[serde(default)]
    pub url: String,
    pub include_description: Option<bool>,
    pub include_og_data: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataResponse {
    pub success: bool,
    pub url: String,
    pub title: String,
    pub description: String,
    pub domain: String,
    pub thumbnail: Option<String>,
    pub og_data: OgData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub extracted_at: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum TestExtractResponse {
    #[serde(rename_all = "camelCase")]
    Found {
        success: bool,
        video_id: String,
        transcript_language: String,
        line_count: usize,
        first_line: Option<TranscriptLine>,
    },
    #[serde(rename_all = "camelCase")]
    Missing {
        success: bool,
        video_id: String,
        error: String,
    },
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(skip)]
    pub status: Status,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(status: Status, error: impl Into<String>) -> Self {
        ErrorResponse {
            status,
            error: error.into(),
        }
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(Status::BadRequest, error)
    }

    pub fn not_found(error: impl Into<String>) -> Self {
        Self::new(Status::NotFound, error)
    }

    pub fn server_error(error: impl fmt::Display) -> Self {
        Self::new(Status::InternalServerError, format!("Server error: {error}"))
    }
}

impl<'r> Responder<'r, 'static> for ErrorResponse {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let json = serde_json::to_string(&self).unwrap_or_else(|_| "{}".to_string());
        Response::build()
            .status(self.status)
            .header(ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json))
            .ok()
    }
}
