use super::{
    DownloadHandle, DownloadId, DownloadManager, DownloadRequest, DownloadSnapshot,
    DownloadStatus, ReasonCode,
};
use crate::error::{Result, UpdateError};
use crate::utils::path_validator::PathValidator;
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use reqwest::Client;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct Job {
    snapshot: Arc<Mutex<DownloadSnapshot>>,
    destination: PathBuf,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Streams transfers into a single directory on background tasks.
///
/// Must be used from inside a Tokio runtime.
pub struct HttpDownloadManager {
    client: Client,
    download_dir: PathBuf,
    next_id: AtomicU64,
    jobs: Mutex<HashMap<DownloadId, Job>>,
}

impl HttpDownloadManager {
    pub fn new(download_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("apkup/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            client,
            download_dir: download_dir.into(),
            next_id: AtomicU64::new(1),
            jobs: Mutex::new(HashMap::new()),
        })
    }

    /// Drop bookkeeping for transfers that already ended. Their files stay.
    fn forget_finished(&self) {
        self.jobs
            .lock()
            .retain(|_, job| !job.snapshot.lock().status.is_terminal());
    }
}

#[async_trait]
impl DownloadManager for HttpDownloadManager {
    async fn enqueue(&self, request: DownloadRequest) -> Result<DownloadHandle> {
        PathValidator::validate_file_name(&request.destination_file_name)
            .map_err(|e| UpdateError::DownloadStart(e.to_string()))?;
        let url = reqwest::Url::parse(&request.url)?;

        self.forget_finished();

        let id = DownloadId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let destination = self.download_dir.join(&request.destination_file_name);
        let snapshot = Arc::new(Mutex::new(DownloadSnapshot::pending()));
        let cancel = CancellationToken::new();

        log::info!(
            "Enqueued download {id} ({}): {} -> {}",
            request.title,
            url,
            destination.display()
        );

        let task = tokio::spawn(transfer(
            self.client.clone(),
            url,
            self.download_dir.clone(),
            destination.clone(),
            snapshot.clone(),
            cancel.clone(),
        ));

        self.jobs.lock().insert(
            id,
            Job {
                snapshot,
                destination: destination.clone(),
                cancel,
                task,
            },
        );

        Ok(DownloadHandle { id, destination })
    }

    async fn query(&self, id: DownloadId) -> Result<Option<DownloadSnapshot>> {
        Ok(self
            .jobs
            .lock()
            .get(&id)
            .map(|job| job.snapshot.lock().clone()))
    }

    async fn remove(&self, id: DownloadId) -> Result<()> {
        let job = self.jobs.lock().remove(&id);
        let Some(job) = job else {
            return Ok(());
        };

        job.cancel.cancel();
        // The task must be gone before the file is, or it could recreate it.
        let _ = job.task.await;
        log::debug!("Removed download {id}");

        match tokio::fs::remove_file(&job.destination).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

async fn transfer(
    client: Client,
    url: reqwest::Url,
    download_dir: PathBuf,
    destination: PathBuf,
    snapshot: Arc<Mutex<DownloadSnapshot>>,
    cancel: CancellationToken,
) {
    let outcome = tokio::select! {
        _ = cancel.cancelled() => None,
        result = stream_to_file(&client, url, &download_dir, &destination, &snapshot) => Some(result),
    };

    match outcome {
        None => log::debug!("Download of {} cancelled", destination.display()),
        Some(Ok(())) => {
            let mut snap = snapshot.lock();
            snap.status = DownloadStatus::Successful;
            snap.reason = None;
        }
        Some(Err(reason)) => {
            log::warn!("Download of {} failed: {reason}", destination.display());
            let mut snap = snapshot.lock();
            snap.status = DownloadStatus::Failed;
            snap.reason = Some(reason);
        }
    }
}

async fn stream_to_file(
    client: &Client,
    url: reqwest::Url,
    download_dir: &Path,
    destination: &Path,
    snapshot: &Mutex<DownloadSnapshot>,
) -> std::result::Result<(), ReasonCode> {
    tokio::fs::create_dir_all(download_dir)
        .await
        .map_err(|e| reason_for_io(&e))?;

    let response = client.get(url).send().await.map_err(|e| reason_for_http(&e))?;

    if !response.status().is_success() {
        log::debug!("HTTP {} for {}", response.status(), destination.display());
        return Err(ReasonCode::UnhandledHttpCode);
    }

    {
        let mut snap = snapshot.lock();
        snap.status = DownloadStatus::Running;
        snap.total_bytes = response.content_length().unwrap_or(0);
    }

    let mut file = File::create(destination)
        .await
        .map_err(|e| reason_for_io(&e))?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| reason_for_http(&e))?;
        file.write_all(&chunk).await.map_err(|e| reason_for_io(&e))?;
        written += chunk.len() as u64;
        snapshot.lock().bytes_downloaded = written;
    }

    file.flush().await.map_err(|e| reason_for_io(&e))?;

    let mut snap = snapshot.lock();
    if snap.total_bytes == 0 {
        snap.total_bytes = written;
    }
    Ok(())
}

fn reason_for_http(error: &reqwest::Error) -> ReasonCode {
    if error.is_redirect() {
        ReasonCode::TooManyRedirects
    } else if error.is_status() {
        ReasonCode::UnhandledHttpCode
    } else if error.is_body() || error.is_decode() || error.is_connect() || error.is_timeout() {
        ReasonCode::HttpDataError
    } else {
        ReasonCode::Unknown
    }
}

fn reason_for_io(error: &io::Error) -> ReasonCode {
    match error.kind() {
        io::ErrorKind::StorageFull => ReasonCode::InsufficientSpace,
        io::ErrorKind::NotFound => ReasonCode::DeviceNotFound,
        io::ErrorKind::AlreadyExists => ReasonCode::FileAlreadyExists,
        _ => ReasonCode::FileError,
    }
}
