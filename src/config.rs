use std::path::PathBuf;
use std::time::Duration;

pub const GITHUB_API: &str = "https://api.github.com";
pub const REPO_OWNER: &str = "cromaguy";
pub const REPO_NAME: &str = "Feel-Android-App";
pub const APP_NAME: &str = "Feel";

pub const PACKAGE_EXTENSION: &str = ".apk";
pub const PACKAGE_MIME_TYPE: &str = "application/vnd.android.package-archive";
pub const CONTENT_AUTHORITY: &str = "apkup.provider";

pub const MIN_PACKAGE_BYTES: u64 = 1024 * 1024;
pub const MAX_PACKAGE_BYTES: u64 = 100 * 1024 * 1024;

/// Compiled-in settings for the update workflow.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    pub api_base: String,
    pub owner: String,
    pub repo: String,
    pub app_name: String,
    pub current_version: String,
    pub package_extension: String,
    pub mime_type: String,
    pub download_dir: PathBuf,
    pub content_authority: String,
    pub installer_program: String,
    pub installer_args: Vec<String>,
    pub min_package_bytes: u64,
    pub max_package_bytes: u64,
    /// Poll interval while the transfer is running or pending
    pub poll_interval: Duration,
    /// Poll interval while the transfer is paused
    pub paused_poll_interval: Duration,
    pub check_timeout: Duration,
    pub download_timeout: Duration,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            api_base: GITHUB_API.to_string(),
            owner: REPO_OWNER.to_string(),
            repo: REPO_NAME.to_string(),
            app_name: APP_NAME.to_string(),
            current_version: crate::version::CURRENT_VERSION.to_string(),
            package_extension: PACKAGE_EXTENSION.to_string(),
            mime_type: PACKAGE_MIME_TYPE.to_string(),
            download_dir: default_download_dir(),
            content_authority: CONTENT_AUTHORITY.to_string(),
            installer_program: "adb".to_string(),
            installer_args: vec!["install".to_string(), "-r".to_string()],
            min_package_bytes: MIN_PACKAGE_BYTES,
            max_package_bytes: MAX_PACKAGE_BYTES,
            poll_interval: Duration::from_millis(100),
            paused_poll_interval: Duration::from_secs(1),
            check_timeout: Duration::from_secs(15),
            download_timeout: Duration::from_secs(30 * 60),
        }
    }
}

impl UpdaterConfig {
    /// File name the package is stored under, e.g. `Feel-1.6.0.apk`.
    pub fn package_file_name(&self, version: &str) -> String {
        let extension = self.package_extension.trim_start_matches('.');
        format!("{}-{}.{}", self.app_name, version, extension)
    }

    pub fn latest_release_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_base.trim_end_matches('/'),
            self.owner,
            self.repo
        )
    }
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("apkup")
}
