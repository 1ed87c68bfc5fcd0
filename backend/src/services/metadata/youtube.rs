use crate::models::{OgData, UrlMetadata};
use crate::services::fallback::StageResult;
use crate::services::youtube::YouTubeClient;
use crate::utils::{resolve_video_id, truncate_with_ellipsis};
use serde_json::json;

pub async fn extract(youtube: &YouTubeClient, url: &str) -> StageResult<UrlMetadata> {
    let Some(video_id) = resolve_video_id(url) else {
        return Ok(None);
    };
    let video = youtube.try_video_metadata(&video_id).await?;

    let og_data = OgData::from([
        ("channel".to_string(), json!(video.channel)),
        ("views".to_string(), json!(video.views)),
        (
            "duration".to_string(),
            video.duration.map_or_else(|| json!("Unknown"), |d| json!(d)),
        ),
        (
            "publishDate".to_string(),
            json!(video.publish_date.as_deref().unwrap_or("Unknown")),
        ),
    ]);

    Ok(Some(UrlMetadata {
        title: video.title,
        description: truncate_with_ellipsis(&video.description, 300),
        thumbnail: video.thumbnail,
        domain: "youtube.com".to_string(),
        og_data,
        error: None,
    }))
}
