use crate::models::{Count, PlaylistId, VideoId, VideoMetadata};
use crate::services::fallback::{FallbackChain, StageResult};
use crate::services::fetcher::{PageFetcher, RequestProfile};
use crate::utils::parse_iso8601_duration_to_seconds;
use anyhow::{anyhow, Result};
use log::{info, warn};
use serde_json::Value;
use std::sync::Arc;
use url::Url;

const OEMBED_ENDPOINT: &str = "https://www.youtube.com/oembed";
const PLAYLIST_PAGE_SIZE: usize = 50;

/// YouTube Data API v3 with the public oEmbed endpoint as a keyless fallback.
#[derive(Clone)]
pub struct YouTubeClient {
    fetcher: Arc<dyn PageFetcher>,
    api_key: Option<String>,
    api_base: String,
}

impl YouTubeClient {
    pub fn new(fetcher: Arc<dyn PageFetcher>, api_key: Option<String>, api_base: String) -> Self {
        YouTubeClient {
            fetcher,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Metadata for `video_id`, degrading to a placeholder record instead of failing.
    pub async fn video_metadata(&self, video_id: &VideoId) -> VideoMetadata {
        match self.try_video_metadata(video_id).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Metadata extraction failed for {video_id}: {e}");
                VideoMetadata::unavailable(video_id)
            }
        }
    }

    /// Data API first, then oEmbed.
    pub async fn try_video_metadata(&self, video_id: &VideoId) -> Result<VideoMetadata> {
        FallbackChain::new("video metadata")
            .stage("data api", || self.from_data_api(video_id))
            .stage("oembed", || self.from_oembed(video_id))
            .run()
            .await
            .map_err(|e| anyhow!(e.reason()))
    }

    async fn from_data_api(&self, video_id: &VideoId) -> StageResult<VideoMetadata> {
        let Some(api_key) = &self.api_key else {
            return Ok(None);
        };

        // Documentation: https://developers.google.com/youtube/v3/docs/videos
        let url = format!(
            "{}/videos?part=snippet,statistics,contentDetails&id={video_id}&key={api_key}",
            self.api_base
        );
        let page = self
            .fetcher
            .get(&url, &RequestProfile::browser_api())
            .await?
            .ensure_success()?;
        let response = page.json()?;

        let item = &response["items"][0];
        if item.is_null() {
            return Ok(None);
        }
        let snippet = &item["snippet"];
        let statistics = &item["statistics"];
        let thumbnails = &snippet["thumbnails"];

        let thumbnail = ["maxres", "high", "default"]
            .iter()
            .find_map(|size| thumbnails[*size]["url"].as_str())
            .map(String::from);

        Ok(Some(VideoMetadata {
            title: snippet["title"].as_str().unwrap_or("").to_string(),
            channel: snippet["channelTitle"].as_str().unwrap_or("").to_string(),
            thumbnail,
            views: Count::from_api(&statistics["viewCount"]),
            likes: Count::from_api(&statistics["likeCount"]),
            comments: Count::from_api(&statistics["commentCount"]),
            duration: item["contentDetails"]["duration"]
                .as_str()
                .and_then(parse_iso8601_duration_to_seconds),
            publish_date: snippet["publishedAt"].as_str().map(String::from),
            description: snippet["description"].as_str().unwrap_or("").to_string(),
            url: video_id.watch_url(),
        }))
    }

    async fn from_oembed(&self, video_id: &VideoId) -> StageResult<VideoMetadata> {
        let url = format!(
            "{OEMBED_ENDPOINT}?url={}&format=json",
            video_id.watch_url()
        );
        let page = self
            .fetcher
            .get(&url, &RequestProfile::browser_api())
            .await?
            .ensure_success()?;
        let data = page.json()?;

        let title = data["title"]
            .as_str()
            .ok_or_else(|| anyhow!("oEmbed response without title"))?;

        Ok(Some(VideoMetadata {
            title: title.to_string(),
            channel: data["author_name"].as_str().unwrap_or("").to_string(),
            thumbnail: data["thumbnail_url"].as_str().map(String::from),
            views: Count::Unavailable,
            likes: Count::Unavailable,
            comments: Count::Unavailable,
            duration: None,
            publish_date: None,
            description: "Description not available".to_string(),
            url: video_id.watch_url(),
        }))
    }

    /// Lists up to `max_results` video ids of a playlist, page by page.
    pub async fn playlist_videos(
        &self,
        playlist_id: &PlaylistId,
        max_results: usize,
    ) -> Result<Vec<VideoId>> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("YOUTUBE_API_KEY is not configured"))?;
        let mut all_video_ids = Vec::new();
        let mut next_page_token: Option<String> = None;

        while all_video_ids.len() < max_results {
            let url = self.playlist_page_url(playlist_id, api_key, next_page_token.as_deref())?;

            let page = match self.fetcher.get(&url, &RequestProfile::browser_api()).await {
                Ok(page) if page.is_ok() => page,
                Ok(page) => {
                    warn!("Playlist {playlist_id} page returned HTTP {}", page.status);
                    break;
                }
                Err(e) if all_video_ids.is_empty() => return Err(e.into()),
                Err(e) => {
                    warn!("Playlist {playlist_id} pagination stopped: {e}");
                    break;
                }
            };
            let response: Value = page.json()?;

            if let Some(items) = response["items"].as_array() {
                for item in items {
                    if all_video_ids.len() >= max_results {
                        break;
                    }
                    if let Some(video_id) = item["snippet"]["resourceId"]["videoId"].as_str() {
                        all_video_ids.push(VideoId::new_unchecked(video_id));
                    }
                }
            }

            // Check for next page
            match response["nextPageToken"].as_str() {
                Some(token) => next_page_token = Some(token.to_string()),
                None => break,
            }
        }

        info!(
            "Found {} videos in playlist {playlist_id}",
            all_video_ids.len()
        );
        Ok(all_video_ids)
    }

    /// Query values are percent-encoded; playlist ids arrive already decoded from user URLs.
    fn playlist_page_url(
        &self,
        playlist_id: &PlaylistId,
        api_key: &str,
        page_token: Option<&str>,
    ) -> Result<String> {
        // https://developers.google.com/youtube/v3/docs/playlistItems
        let mut url = Url::parse(&format!("{}/playlistItems", self.api_base))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("part", "snippet")
                .append_pair("playlistId", playlist_id.as_str())
                .append_pair("maxResults", &PLAYLIST_PAGE_SIZE.to_string())
                .append_pair("key", api_key);
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }
        Ok(url.into())
    }
}
