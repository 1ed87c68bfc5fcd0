use crate::models::{OgData, UrlMetadata};
use crate::services::fallback::StageResult;
use crate::services::fetcher::{PageFetcher, RequestProfile, Timeout};
use anyhow::anyhow;
use serde_json::Value;
use url::Url;

const GITHUB_API: &str = "https://api.github.com";
const GITHUB_API_PROFILE: RequestProfile = RequestProfile::new(
    "github-api",
    &[
        ("Accept", "application/vnd.github.v3+json"),
        ("User-Agent", "URLMetadataExtractor/1.0"),
    ],
    Timeout::Api,
);

/// `owner`, `repo` and whatever path follows them (empty for the repository root).
#[derive(Debug, PartialEq)]
pub struct RepoPath {
    pub owner: String,
    pub repo: String,
    pub rest: String,
}

pub fn repo_path(url: &str) -> Option<RepoPath> {
    let parsed = Url::parse(url).ok()?;
    let segments: Vec<&str> = parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .collect();
    match segments.as_slice() {
        [owner, repo, rest @ ..] => Some(RepoPath {
            owner: owner.to_string(),
            repo: repo.trim_end_matches(".git").to_string(),
            rest: rest.join("/"),
        }),
        _ => None,
    }
}

pub async fn extract(fetcher: &dyn PageFetcher, url: &str) -> StageResult<UrlMetadata> {
    let Some(path) = repo_path(url) else {
        return Ok(None);
    };

    // https://docs.github.com/en/rest/repos/repos#get-a-repository
    let api_url = format!("{GITHUB_API}/repos/{}/{}", path.owner, path.repo);
    let repository = fetcher
        .get(&api_url, &GITHUB_API_PROFILE)
        .await?
        .ensure_success()?
        .json()?;

    let name = required(&repository, "name")?;
    let full_name = required(&repository, "full_name")?;
    let owner = &repository["owner"];

    let title = if path.rest.is_empty() {
        format!("GitHub - {full_name}")
    } else {
        format!("{name} - {}", path.rest)
    };

    let og_data = OgData::from([
        ("stars".to_string(), repository["stargazers_count"].clone()),
        ("forks".to_string(), repository["forks_count"].clone()),
        ("language".to_string(), repository["language"].clone()),
        ("owner".to_string(), owner["login"].clone()),
        ("updated_at".to_string(), repository["updated_at"].clone()),
    ]);

    Ok(Some(UrlMetadata {
        title,
        description: repository["description"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        thumbnail: owner["avatar_url"].as_str().map(String::from),
        domain: "github.com".to_string(),
        og_data,
        error: None,
    }))
}

fn required<'v>(repository: &'v Value, field: &str) -> anyhow::Result<&'v str> {
    repository[field]
        .as_str()
        .ok_or_else(|| anyhow!("repository response without {field}"))
}
