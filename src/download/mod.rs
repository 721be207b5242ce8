use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;

pub mod http;
pub use http::HttpDownloadManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DownloadId(pub u64);

impl fmt::Display for DownloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A transfer submitted to a [`DownloadManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub title: String,
    pub description: String,
    pub destination_file_name: String,
    pub mime_type: String,
}

/// Returned by [`DownloadManager::enqueue`]: where the finished file will be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadHandle {
    pub id: DownloadId,
    pub destination: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    Pending,
    Running,
    Paused,
    Successful,
    Failed,
}

impl DownloadStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, DownloadStatus::Successful | DownloadStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSnapshot {
    pub status: DownloadStatus,
    pub bytes_downloaded: u64,
    pub total_bytes: u64,
    /// Set for `Paused` and `Failed`
    pub reason: Option<ReasonCode>,
}

impl DownloadSnapshot {
    pub fn pending() -> Self {
        Self {
            status: DownloadStatus::Pending,
            bytes_downloaded: 0,
            total_bytes: 0,
            reason: None,
        }
    }
}

/// Why a transfer is paused or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReasonCode {
    CannotResume,
    DeviceNotFound,
    FileAlreadyExists,
    FileError,
    HttpDataError,
    InsufficientSpace,
    TooManyRedirects,
    UnhandledHttpCode,
    Unknown,
    QueuedForWifi,
    PausedUnknown,
    WaitingForNetwork,
    WaitingToRetry,
    /// A code outside the known table
    Other(i32),
}

/// code, reason, message
const REASON_TABLE: &[(i32, ReasonCode, &str)] = &[
    (1008, ReasonCode::CannotResume, "Cannot resume download"),
    (1007, ReasonCode::DeviceNotFound, "Storage device not found"),
    (1009, ReasonCode::FileAlreadyExists, "File already exists"),
    (1001, ReasonCode::FileError, "File error"),
    (1004, ReasonCode::HttpDataError, "Network data error"),
    (1006, ReasonCode::InsufficientSpace, "Insufficient storage space"),
    (1005, ReasonCode::TooManyRedirects, "Too many redirects"),
    (1002, ReasonCode::UnhandledHttpCode, "Unhandled HTTP code"),
    (1000, ReasonCode::Unknown, "Unknown error"),
    (3, ReasonCode::QueuedForWifi, "Waiting for Wi-Fi"),
    (4, ReasonCode::PausedUnknown, "Paused for unknown reason"),
    (2, ReasonCode::WaitingForNetwork, "Waiting for network"),
    (1, ReasonCode::WaitingToRetry, "Waiting to retry"),
];

impl ReasonCode {
    pub fn from_code(code: i32) -> Self {
        REASON_TABLE
            .iter()
            .find(|(c, _, _)| *c == code)
            .map(|(_, reason, _)| *reason)
            .unwrap_or(ReasonCode::Other(code))
    }

    pub fn code(self) -> i32 {
        match self {
            ReasonCode::Other(code) => code,
            known => REASON_TABLE
                .iter()
                .find(|(_, reason, _)| *reason == known)
                .map(|(code, _, _)| *code)
                .unwrap_or_default(),
        }
    }

    fn table_message(self) -> Option<&'static str> {
        REASON_TABLE
            .iter()
            .find(|(_, reason, _)| *reason == self)
            .map(|(_, _, message)| *message)
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.table_message() {
            Some(message) => f.write_str(message),
            None => write!(f, "Error code: {}", self.code()),
        }
    }
}

/// Background transfer service.
#[async_trait]
pub trait DownloadManager: Send + Sync {
    async fn enqueue(&self, request: DownloadRequest) -> Result<DownloadHandle>;

    /// `None` once the manager no longer knows the id.
    async fn query(&self, id: DownloadId) -> Result<Option<DownloadSnapshot>>;

    /// Cancel the transfer if it is still running and delete its file.
    async fn remove(&self, id: DownloadId) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KNOWN: [ReasonCode; 13] = [
        ReasonCode::CannotResume,
        ReasonCode::DeviceNotFound,
        ReasonCode::FileAlreadyExists,
        ReasonCode::FileError,
        ReasonCode::HttpDataError,
        ReasonCode::InsufficientSpace,
        ReasonCode::TooManyRedirects,
        ReasonCode::UnhandledHttpCode,
        ReasonCode::Unknown,
        ReasonCode::QueuedForWifi,
        ReasonCode::PausedUnknown,
        ReasonCode::WaitingForNetwork,
        ReasonCode::WaitingToRetry,
    ];

    #[test]
    fn every_known_reason_has_a_message_and_code() {
        for reason in ALL_KNOWN {
            assert!(reason.table_message().is_some(), "{reason:?} has no message");
            assert_eq!(ReasonCode::from_code(reason.code()), reason);
        }
        assert_eq!(REASON_TABLE.len(), ALL_KNOWN.len());
    }

    #[test]
    fn reason_messages_are_readable() {
        assert_eq!(ReasonCode::InsufficientSpace.to_string(), "Insufficient storage space");
        assert_eq!(ReasonCode::QueuedForWifi.to_string(), "Waiting for Wi-Fi");
        assert_eq!(ReasonCode::from_code(1004).to_string(), "Network data error");
    }

    #[test]
    fn unknown_codes_fall_through_to_other() {
        let reason = ReasonCode::from_code(4242);
        assert_eq!(reason, ReasonCode::Other(4242));
        assert_eq!(reason.to_string(), "Error code: 4242");
    }

    #[test]
    fn only_successful_and_failed_are_terminal() {
        assert!(DownloadStatus::Successful.is_terminal());
        assert!(DownloadStatus::Failed.is_terminal());
        assert!(!DownloadStatus::Running.is_terminal());
        assert!(!DownloadStatus::Paused.is_terminal());
        assert!(!DownloadStatus::Pending.is_terminal());
    }
}
