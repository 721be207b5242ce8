//! Self-update workflow: ask a release service for the latest version,
//! download its installer package, sanity-check the file and hand it to
//! the system installer.
//!
//! [`coordinator::UpdateCoordinator`] owns the whole flow and publishes an
//! [`state::UpdateState`] on every change. The collaborators it talks to
//! ([`release::ReleaseSource`], [`download::DownloadManager`],
//! [`store::FileStore`], [`install::InstallerLauncher`]) are traits so a UI
//! can swap in platform implementations.

pub mod config;
pub mod coordinator;
pub mod download;
pub mod error;
pub mod install;
pub mod release;
pub mod state;
pub mod store;
pub mod utils;
pub mod version;

pub use coordinator::UpdateCoordinator;
pub use error::{Result, UpdateError};
pub use state::{UpdatePhase, UpdateState};
