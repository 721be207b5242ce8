use super::{Release, ReleaseSource};
use crate::config::UpdaterConfig;
use crate::error::{Result, UpdateError};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;
use std::time::Duration;
use url::Url;

const MAX_RELEASE_BYTES: usize = 10 * 1024 * 1024;

/// GitHub releases API client
pub struct GitHubReleaseClient {
    client: Client,
    latest_url: Url,
}

impl GitHubReleaseClient {
    pub fn new(config: &UpdaterConfig) -> Result<Self> {
        let latest_url = Url::parse(&config.latest_release_url())?;
        let client = Self::build_client(config.check_timeout)?;

        Ok(Self { client, latest_url })
    }

    fn build_client(timeout: Duration) -> Result<Client> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("apkup/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(client)
    }
}

#[async_trait]
impl ReleaseSource for GitHubReleaseClient {
    async fn fetch_latest(&self) -> Result<Release> {
        log::debug!("Fetching: {}", self.latest_url);

        let response = self
            .client
            .get(self.latest_url.clone())
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            log::debug!("HTTP {}: {}", status, self.latest_url);
            return Err(UpdateError::ReleaseService(format!(
                "HTTP {} from {}",
                status, self.latest_url
            )));
        }

        let bytes = response.bytes().await?;
        if bytes.len() > MAX_RELEASE_BYTES {
            return Err(UpdateError::ReleaseService(
                "release metadata exceeded 10MB limit".to_string(),
            ));
        }

        let release: Release = serde_json::from_slice(&bytes)?;
        log::debug!(
            "Latest release {} with {} assets",
            release.tag_name,
            release.assets.len()
        );
        Ok(release)
    }
}
