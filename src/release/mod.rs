use crate::error::Result;
use crate::version::normalize_tag;
use async_trait::async_trait;
use jiff::civil::DateTime;
use serde::Deserialize;

pub mod github;
pub use github::GitHubReleaseClient;

/// Source of the latest published release.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    async fn fetch_latest(&self) -> Result<Release>;
}

/// Release payload served by `/repos/{owner}/{repo}/releases/latest`
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    pub published_at: String,
    pub assets: Vec<ReleaseAsset>,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub browser_download_url: String,
    pub name: String,
    pub size: u64,
    #[serde(default)]
    pub download_count: u64,
}

/// The parts of a release the coordinator applies to its state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSummary {
    pub version: String,
    pub notes: String,
    pub publish_date: String,
    /// Empty when no asset carries the package extension
    pub download_url: String,
}

impl ReleaseSummary {
    pub fn from_release(release: &Release, extension: &str) -> Self {
        let download_url = select_asset(&release.assets, extension)
            .map(|asset| asset.browser_download_url.clone())
            .unwrap_or_default();

        Self {
            version: normalize_tag(&release.tag_name).to_string(),
            notes: release.body.clone().unwrap_or_default(),
            publish_date: format_publish_date(&release.published_at),
            download_url,
        }
    }
}

/// First asset whose file name ends with `extension`.
pub fn select_asset<'a>(assets: &'a [ReleaseAsset], extension: &str) -> Option<&'a ReleaseAsset> {
    assets.iter().find(|asset| asset.name.ends_with(extension))
}

/// Render a `yyyy-MM-ddTHH:mm:ssZ` timestamp as e.g. `May 27, 2025`.
///
/// Anything else, including offsets and fractional seconds, is returned
/// unchanged.
pub fn format_publish_date(raw: &str) -> String {
    match DateTime::strptime("%Y-%m-%dT%H:%M:%SZ", raw) {
        Ok(dt) => dt.strftime("%B %-d, %Y").to_string(),
        Err(_) => raw.to_string(),
    }
}
