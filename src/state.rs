/// Everything an observer needs to render the update flow.
///
/// Lives in memory only; the coordinator is its single writer.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateState {
    pub current_version: String,
    pub latest_version: String,
    pub is_update_available: bool,
    pub release_notes: String,
    pub publish_date: String,
    pub download_url: String,
    pub is_checking: bool,
    pub is_downloading: bool,
    pub is_download_complete: bool,
    /// In `[0, 1]`, non-decreasing within one attempt
    pub download_progress: f32,
    pub downloaded_bytes: u64,
    pub total_bytes: u64,
    /// Set only once the download passed verification
    pub downloaded_file_path: String,
    pub install_launched: bool,
    pub error: Option<String>,
}

impl UpdateState {
    pub fn new(current_version: impl Into<String>) -> Self {
        Self {
            current_version: current_version.into(),
            latest_version: String::new(),
            is_update_available: false,
            release_notes: String::new(),
            publish_date: String::new(),
            download_url: String::new(),
            is_checking: false,
            is_downloading: false,
            is_download_complete: false,
            download_progress: 0.0,
            downloaded_bytes: 0,
            total_bytes: 0,
            downloaded_file_path: String::new(),
            install_launched: false,
            error: None,
        }
    }

    pub fn phase(&self) -> UpdatePhase {
        if self.is_checking {
            UpdatePhase::Checking
        } else if self.is_downloading {
            UpdatePhase::Downloading
        } else if self.install_launched {
            UpdatePhase::Installing
        } else if self.error.is_some() {
            UpdatePhase::Error
        } else if self.is_download_complete {
            UpdatePhase::DownloadComplete
        } else if self.is_update_available {
            UpdatePhase::UpdateAvailable
        } else if !self.latest_version.is_empty() {
            UpdatePhase::UpToDate
        } else {
            UpdatePhase::Idle
        }
    }

    pub(crate) fn reset_progress(&mut self) {
        self.download_progress = 0.0;
        self.downloaded_bytes = 0;
        self.total_bytes = 0;
        self.downloaded_file_path.clear();
        self.is_download_complete = false;
        self.install_launched = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePhase {
    Idle,
    Checking,
    UpToDate,
    UpdateAvailable,
    Downloading,
    DownloadComplete,
    Installing,
    Error,
}

/// Human-readable byte count, e.g. `12.3 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
