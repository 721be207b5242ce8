use crate::config::UpdaterConfig;
use crate::download::{
    DownloadHandle, DownloadManager, DownloadRequest, DownloadSnapshot, DownloadStatus,
    HttpDownloadManager, ReasonCode,
};
use crate::error::{Result, UpdateError};
use crate::install::{CommandLauncher, InstallerLauncher, LaunchOutcome};
use crate::release::{GitHubReleaseClient, ReleaseSource, ReleaseSummary};
use crate::state::UpdateState;
use crate::store::{FileStore, LocalFileStore, PackagePolicy};
use crate::version::is_newer_version;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Drives check -> download -> verify -> install and publishes every
/// change of [`UpdateState`] to subscribers.
///
/// The coordinator is the only writer of the state. Dropping it stops the
/// progress monitor.
pub struct UpdateCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    config: UpdaterConfig,
    policy: PackagePolicy,
    releases: Arc<dyn ReleaseSource>,
    downloads: Arc<dyn DownloadManager>,
    store: Arc<dyn FileStore>,
    installer: Arc<dyn InstallerLauncher>,
    state: watch::Sender<UpdateState>,
    active: Mutex<Option<ActiveDownload>>,
    /// Held for the whole of `download_update` so supersession is atomic.
    download_lock: tokio::sync::Mutex<()>,
}

struct ActiveDownload {
    handle: DownloadHandle,
    cancel: CancellationToken,
    monitor: JoinHandle<()>,
}

impl UpdateCoordinator {
    pub fn new(
        config: UpdaterConfig,
        releases: Arc<dyn ReleaseSource>,
        downloads: Arc<dyn DownloadManager>,
        store: Arc<dyn FileStore>,
        installer: Arc<dyn InstallerLauncher>,
    ) -> Self {
        let (state, _) = watch::channel(UpdateState::new(config.current_version.clone()));
        let policy = PackagePolicy::from_config(&config);

        Self {
            inner: Arc::new(Inner {
                config,
                policy,
                releases,
                downloads,
                store,
                installer,
                state,
                active: Mutex::new(None),
                download_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Wire the coordinator to GitHub, HTTP downloads, local disk and the
    /// configured installer program.
    pub fn from_config(config: UpdaterConfig) -> Result<Self> {
        let releases = Arc::new(GitHubReleaseClient::new(&config)?);
        let downloads = Arc::new(HttpDownloadManager::new(&config.download_dir)?);
        let store = LocalFileStore::new(&config.download_dir, &config.content_authority);
        let installer = Arc::new(CommandLauncher::from_config(&config, store.clone()));

        Ok(Self::new(
            config,
            releases,
            downloads,
            Arc::new(store),
            installer,
        ))
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.inner.config
    }

    pub fn state(&self) -> UpdateState {
        self.inner.state.borrow().clone()
    }

    /// Receive every published state, starting with the current one.
    pub fn subscribe(&self) -> watch::Receiver<UpdateState> {
        self.inner.state.subscribe()
    }

    /// Query the release service and compare its version with ours.
    ///
    /// A call made while another check is in flight is ignored.
    pub async fn check_for_updates(&self) -> UpdateState {
        let inner = &self.inner;
        let started = inner.state.send_if_modified(|s| {
            if s.is_checking {
                return false;
            }
            s.is_checking = true;
            s.is_update_available = false;
            s.error = None;
            true
        });

        if !started {
            log::debug!("Update check already in flight, ignoring");
            return self.state();
        }

        log::info!("Checking for updates...");
        match inner.fetch_summary().await {
            Ok(summary) => {
                inner.state.send_modify(|s| {
                    let has_update = is_newer_version(&summary.version, &s.current_version);
                    if summary.version != s.latest_version && !s.is_downloading {
                        s.reset_progress();
                    }
                    s.is_update_available = has_update;
                    s.latest_version = summary.version;
                    s.release_notes = summary.notes;
                    s.download_url = summary.download_url;
                    s.publish_date = summary.publish_date;
                    s.is_checking = false;
                    s.error = None;

                    if has_update {
                        log::info!(
                            "Update available: {} -> {}",
                            s.current_version,
                            s.latest_version
                        );
                    } else {
                        log::info!("No update available (current: {})", s.current_version);
                    }
                    if s.download_url.is_empty() {
                        log::warn!(
                            "Release {} has no {} asset",
                            s.latest_version,
                            inner.config.package_extension
                        );
                    }
                });
            }
            Err(e) => {
                let error = UpdateError::Check(e.to_string());
                log::warn!("{error}");
                inner.state.send_modify(|s| {
                    s.is_checking = false;
                    s.is_update_available = false;
                    s.error = Some(error.to_string());
                });
            }
        }

        self.state()
    }

    /// Start downloading the package of the last successful check.
    ///
    /// Supersedes any download this coordinator started before.
    pub async fn download_update(&self) -> UpdateState {
        let inner = &self.inner;
        let _guard = inner.download_lock.lock().await;
        let (url, version) = {
            let s = inner.state.borrow();
            (s.download_url.clone(), s.latest_version.clone())
        };

        if url.is_empty() {
            inner.fail(UpdateError::NoDownloadUrl);
            return self.state();
        }

        inner.stop_active(true).await;

        let request = DownloadRequest {
            url,
            title: format!("{} App Update", inner.config.app_name),
            description: format!("Downloading version {version}"),
            destination_file_name: inner.config.package_file_name(&version),
            mime_type: inner.config.mime_type.clone(),
        };

        let handle = match inner.downloads.enqueue(request).await {
            Ok(handle) => handle,
            Err(e) => {
                let error = match e {
                    UpdateError::DownloadStart(_) => e,
                    other => UpdateError::DownloadStart(other.to_string()),
                };
                inner.state.send_modify(|s| s.is_downloading = false);
                inner.fail(error);
                return self.state();
            }
        };

        log::info!("Downloading {version} as download {}", handle.id);
        inner.state.send_modify(|s| {
            s.reset_progress();
            s.is_downloading = true;
            s.error = None;
        });

        let cancel = CancellationToken::new();
        let monitor = tokio::spawn(monitor(
            Arc::clone(inner),
            handle.clone(),
            cancel.clone(),
        ));
        *inner.active.lock() = Some(ActiveDownload {
            handle,
            cancel,
            monitor,
        });

        self.state()
    }

    /// Resolve once no download is running.
    pub async fn wait_until_settled(&self) -> UpdateState {
        let mut rx = self.subscribe();
        let settled = rx.wait_for(|s| !s.is_downloading).await;
        match settled {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    /// Hand the verified package to the installer.
    pub async fn install_update(&self) -> UpdateState {
        let inner = &self.inner;
        let path = inner.state.borrow().downloaded_file_path.clone();
        inner.state.send_modify(|s| s.error = None);

        match inner.install(Path::new(&path)).await {
            Ok(()) => {
                log::info!("Installer launched for {path}");
                inner.state.send_modify(|s| {
                    s.install_launched = true;
                    s.error = None;
                });
            }
            Err(e) => inner.fail(e),
        }

        self.state()
    }

    /// Stop the progress monitor. The transfer itself is left alone.
    pub fn dispose(&self) {
        if let Some(active) = self.inner.active.lock().take() {
            log::debug!("Stopping monitor for download {}", active.handle.id);
            active.cancel.cancel();
        }
    }
}

impl Drop for UpdateCoordinator {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl Inner {
    fn fail(&self, error: UpdateError) {
        log::warn!("{error}");
        self.state.send_modify(|s| s.error = Some(error.to_string()));
    }

    /// Apply `f` unless the monitor that owns `cancel` was superseded.
    fn publish_live(&self, cancel: &CancellationToken, f: impl FnOnce(&mut UpdateState)) {
        self.state.send_if_modified(|s| {
            if cancel.is_cancelled() {
                return false;
            }
            f(s);
            true
        });
    }

    async fn fetch_summary(&self) -> Result<ReleaseSummary> {
        let timeout = self.config.check_timeout;
        let release = tokio::time::timeout(timeout, self.releases.fetch_latest())
            .await
            .map_err(|_| {
                UpdateError::ReleaseService(format!(
                    "request timed out after {}s",
                    timeout.as_secs_f32()
                ))
            })??;

        let summary = ReleaseSummary::from_release(&release, &self.config.package_extension);
        if summary.version.is_empty() {
            return Err(UpdateError::ReleaseService(
                "release has no version tag".to_string(),
            ));
        }
        Ok(summary)
    }

    /// Cancel the running monitor and, if asked, drop its transfer.
    async fn stop_active(&self, remove_download: bool) {
        let active = self.active.lock().take();
        let Some(active) = active else {
            return;
        };

        active.cancel.cancel();
        let _ = active.monitor.await;

        if remove_download {
            if let Err(e) = self.downloads.remove(active.handle.id).await {
                log::warn!("Failed to remove download {}: {e}", active.handle.id);
            }
        }
    }

    async fn install(&self, path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() || !self.store.exists(path).await {
            return Err(UpdateError::InstallFileNotFound);
        }

        if !self.policy.verify_for_install(self.store.as_ref(), path).await {
            return Err(UpdateError::InvalidUpdateFile);
        }

        let uri = self.store.shareable_uri(path).await.map_err(|e| match e {
            UpdateError::FileAccess(_) => e,
            other => UpdateError::FileAccess(other.to_string()),
        })?;

        match self
            .installer
            .launch_install(&uri, &self.config.mime_type)
            .await
        {
            Ok(LaunchOutcome::Launched) => Ok(()),
            Ok(LaunchOutcome::NotFound) => Err(UpdateError::NoInstaller),
            Ok(LaunchOutcome::Rejected(message)) => Err(UpdateError::InstallRejected(message)),
            Err(e @ UpdateError::Install(_)) => Err(e),
            Err(e) => Err(UpdateError::Install(e.to_string())),
        }
    }

    fn on_running(&self, cancel: &CancellationToken, snapshot: &DownloadSnapshot, resumed: bool) {
        self.publish_live(cancel, |s| {
            if resumed {
                s.error = None;
            }
            if snapshot.total_bytes == 0 {
                return;
            }
            s.downloaded_bytes = s.downloaded_bytes.max(snapshot.bytes_downloaded);
            s.total_bytes = snapshot.total_bytes;
            let progress = (s.downloaded_bytes as f64 / s.total_bytes as f64).min(1.0) as f32;
            s.download_progress = s.download_progress.max(progress);
        });
    }

    async fn on_successful(
        &self,
        cancel: &CancellationToken,
        handle: &DownloadHandle,
        snapshot: &DownloadSnapshot,
    ) {
        let path = &handle.destination;

        if self.policy.verify_download(self.store.as_ref(), path).await {
            log::info!("Download {} verified at {}", handle.id, path.display());
            let total = snapshot.total_bytes.max(snapshot.bytes_downloaded);
            self.publish_live(cancel, |s| {
                s.is_downloading = false;
                s.is_download_complete = true;
                s.download_progress = 1.0;
                s.downloaded_bytes = total;
                s.total_bytes = total;
                s.downloaded_file_path = path.display().to_string();
                s.error = None;
            });
            return;
        }

        if cancel.is_cancelled() {
            return;
        }

        log::warn!("Download {} failed verification", handle.id);
        if let Err(e) = self.store.delete(path).await {
            log::warn!("Failed to delete {}: {e}", path.display());
        }
        self.publish_live(cancel, |s| {
            s.is_downloading = false;
            s.is_download_complete = false;
            s.download_progress = 0.0;
            s.error = Some(UpdateError::VerificationFailed.to_string());
        });
    }

    fn on_failed(&self, cancel: &CancellationToken, error: UpdateError) {
        log::warn!("{error}");
        self.publish_live(cancel, |s| {
            s.is_downloading = false;
            s.download_progress = 0.0;
            s.error = Some(error.to_string());
        });
    }
}

async fn monitor(inner: Arc<Inner>, handle: DownloadHandle, cancel: CancellationToken) {
    let deadline = Instant::now() + inner.config.download_timeout;
    let mut paused = false;

    loop {
        if cancel.is_cancelled() {
            return;
        }

        if Instant::now() >= deadline {
            if let Err(e) = inner.downloads.remove(handle.id).await {
                log::warn!("Failed to remove download {}: {e}", handle.id);
            }
            inner.on_failed(&cancel, UpdateError::DownloadFailed("timed out".to_string()));
            return;
        }

        let snapshot = match inner.downloads.query(handle.id).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                inner.on_failed(
                    &cancel,
                    UpdateError::DownloadFailed("download is no longer tracked".to_string()),
                );
                return;
            }
            Err(e) => {
                inner.on_failed(&cancel, UpdateError::DownloadFailed(e.to_string()));
                return;
            }
        };

        let delay = match snapshot.status {
            DownloadStatus::Pending => inner.config.poll_interval,
            DownloadStatus::Running => {
                inner.on_running(&cancel, &snapshot, paused);
                paused = false;
                inner.config.poll_interval
            }
            DownloadStatus::Paused => {
                paused = true;
                let reason = snapshot.reason.unwrap_or(ReasonCode::PausedUnknown);
                let error = UpdateError::DownloadPaused(reason.to_string());
                log::info!("Download {} {error}", handle.id);
                inner.publish_live(&cancel, |s| s.error = Some(error.to_string()));
                inner.config.paused_poll_interval
            }
            DownloadStatus::Successful => {
                inner.on_successful(&cancel, &handle, &snapshot).await;
                return;
            }
            DownloadStatus::Failed => {
                let reason = snapshot.reason.unwrap_or(ReasonCode::Unknown);
                inner.on_failed(&cancel, UpdateError::DownloadFailed(reason.to_string()));
                return;
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
