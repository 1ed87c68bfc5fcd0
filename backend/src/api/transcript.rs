use crate::models::{
    ErrorResponse, ExtractRequest, ExtractResponse, PlaylistItem, PlaylistRequest,
    PlaylistResponse, ResolvedTranscript, TestExtractResponse, VideoId, VideoMetadata,
};
use crate::services::formatting::format_markdown;
use crate::utils::{resolve_playlist_id, resolve_video_id};
use crate::AppState;
use chrono::Utc;
use log::{info, warn};
use rocket::http::{ContentType, Status};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{get, post, State};

const DEFAULT_PLAYLIST_VIDEOS: i64 = 25;
const MAX_PLAYLIST_VIDEOS: i64 = 100;

fn required_url(url: &str) -> Result<&str, ErrorResponse> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ErrorResponse::bad_request("URL is required"));
    }
    Ok(url)
}

async fn video_with_transcript(
    state: &AppState,
    request: &ExtractRequest,
) -> Result<(VideoId, VideoMetadata, ResolvedTranscript), ErrorResponse> {
    let url = required_url(&request.url)?;
    let video_id =
        resolve_video_id(url).ok_or_else(|| ErrorResponse::bad_request("Invalid YouTube URL"))?;

    let languages = request
        .languages
        .clone()
        .filter(|languages| !languages.is_empty())
        .unwrap_or_else(|| state.transcripts.default_languages().to_vec());

    let metadata = state.youtube.video_metadata(&video_id).await;
    let transcript = state
        .transcripts
        .resolve(&video_id, &languages)
        .await
        .ok_or_else(|| ErrorResponse::not_found("No transcript available for this video"))?;

    Ok((video_id, metadata, transcript))
}

#[post("/extract", data = "<request>")]
pub async fn extract(
    state: &State<AppState>,
    request: Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, ErrorResponse> {
    let (video_id, metadata, transcript) = video_with_transcript(state, &request).await?;

    Ok(Json(ExtractResponse {
        success: true,
        video_id,
        metadata,
        transcript: transcript.lines,
        transcript_language: transcript.language,
        extracted_at: Utc::now().to_rfc3339(),
    }))
}

#[post("/extract-markdown", data = "<request>")]
pub async fn extract_markdown(
    state: &State<AppState>,
    request: Json<ExtractRequest>,
) -> Result<(ContentType, String), ErrorResponse> {
    let (_, metadata, transcript) = video_with_transcript(state, &request).await?;
    let include_description = request.include_description.unwrap_or(true);

    Ok((
        ContentType::Markdown,
        format_markdown(&metadata, &transcript.lines, include_description),
    ))
}

#[post("/extract-playlist", data = "<request>")]
pub async fn extract_playlist(
    state: &State<AppState>,
    request: Json<PlaylistRequest>,
) -> Result<Json<PlaylistResponse>, ErrorResponse> {
    let url = required_url(&request.url)?;
    let playlist_id = resolve_playlist_id(url)
        .ok_or_else(|| ErrorResponse::bad_request("Invalid YouTube playlist URL"))?;
    let max_videos = request
        .max_videos
        .unwrap_or(DEFAULT_PLAYLIST_VIDEOS)
        .clamp(1, MAX_PLAYLIST_VIDEOS) as usize;

    let video_ids = state
        .youtube
        .playlist_videos(&playlist_id, max_videos)
        .await
        .unwrap_or_else(|e| {
            warn!("Failed to list playlist {playlist_id}: {e}");
            Vec::new()
        });
    if video_ids.is_empty() {
        return Err(ErrorResponse::not_found(
            "Could not retrieve videos from playlist",
        ));
    }

    let languages = state.transcripts.default_languages();
    let mut results = Vec::with_capacity(video_ids.len());
    for (i, video_id) in video_ids.iter().enumerate() {
        info!("Processing video {}/{}: {video_id}", i + 1, video_ids.len());

        let metadata = state.youtube.video_metadata(video_id).await;
        let item = match state.transcripts.resolve(video_id, languages).await {
            Some(transcript) => PlaylistItem::Extracted {
                success: true,
                video_id: video_id.clone(),
                metadata,
                transcript: transcript.lines,
                transcript_language: transcript.language,
            },
            None => PlaylistItem::Failed {
                success: false,
                video_id: video_id.clone(),
                metadata,
                error: "No transcript available".to_string(),
            },
        };
        results.push(item);
    }

    Ok(Json(PlaylistResponse {
        success: true,
        playlist_id,
        total_videos: video_ids.len(),
        processed_videos: results.len(),
        results,
        extracted_at: Utc::now().to_rfc3339(),
    }))
}

/// Runs only the transcript search, for checking caption availability by hand.
#[get("/test-extract/<video_id>")]
pub async fn test_extract(
    state: &State<AppState>,
    video_id: &str,
) -> Custom<Json<TestExtractResponse>> {
    let missing = || {
        Custom(
            Status::NotFound,
            Json(TestExtractResponse::Missing {
                success: false,
                video_id: video_id.to_string(),
                error: "No transcript found".to_string(),
            }),
        )
    };

    let Some(id) = resolve_video_id(video_id) else {
        return missing();
    };
    match state
        .transcripts
        .resolve(&id, state.transcripts.default_languages())
        .await
    {
        Some(transcript) => Custom(
            Status::Ok,
            Json(TestExtractResponse::Found {
                success: true,
                video_id: video_id.to_string(),
                transcript_language: transcript.language,
                line_count: transcript.lines.len(),
                first_line: transcript.lines.into_iter().next(),
            }),
        ),
        None => missing(),
    }
}
