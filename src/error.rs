use thiserror::Error;

/// Failures surfaced on `UpdateState::error`.
///
/// The `Display` text of each variant is exactly what observers see, so
/// keep the wording stable.
#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("failed to check for updates: {0}")]
    Check(String),

    #[error("release service error: {0}")]
    ReleaseService(String),

    #[error("no download URL available")]
    NoDownloadUrl,

    #[error("failed to start download: {0}")]
    DownloadStart(String),

    #[error("download paused: {0}")]
    DownloadPaused(String),

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("download verification failed")]
    VerificationFailed,

    #[error("installation file not found")]
    InstallFileNotFound,

    #[error("invalid update file")]
    InvalidUpdateFile,

    #[error("failed to access update file: {0}")]
    FileAccess(String),

    #[error("no app found to install the update")]
    NoInstaller,

    #[error("failed to start installation: {0}")]
    InstallRejected(String),

    #[error("installation error: {0}")]
    Install(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, UpdateError>;
