use crate::models::{ErrorResponse, MetadataRequest, MetadataResponse};
use crate::services::metadata::MetadataOptions;
use crate::utils::normalize_url;
use crate::AppState;
use chrono::Utc;
use log::{info, warn};
use rocket::serde::json::Json;
use rocket::{post, State};

/// Degraded results are still answered with 200 and `success: false`.
#[post("/extract-url-metadata", data = "<request>")]
pub async fn extract_url_metadata(
    state: &State<AppState>,
    request: Json<MetadataRequest>,
) -> Result<Json<MetadataResponse>, ErrorResponse> {
    let raw_url = request.url.trim();
    if raw_url.is_empty() {
        return Err(ErrorResponse::bad_request("URL is required"));
    }
    let url = normalize_url(raw_url);
    let options = MetadataOptions {
        include_description: request.include_description.unwrap_or(true),
        include_og_data: request.include_og_data.unwrap_or(true),
    };

    let metadata = state.metadata.resolve(&url, options).await;
    match &metadata.error {
        Some(error) => warn!("Metadata extraction had issues for {url}: {error}"),
        None => info!("Successfully extracted metadata for: {url}"),
    }

    Ok(Json(MetadataResponse {
        success: !metadata.is_fallback(),
        url,
        title: metadata.title,
        description: metadata.description,
        domain: metadata.domain,
        thumbnail: metadata.thumbnail,
        og_data: metadata.og_data,
        error: metadata.error,
        extracted_at: Utc::now().to_rfc3339(),
    }))
}
