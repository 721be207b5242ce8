use crate::error::{Result, UpdateError};
use crate::utils::path_validator::PathValidator;
use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use std::io;
use std::path::{Path, PathBuf};
use url::Url;

/// File system operations the update flow needs.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn exists(&self, path: &Path) -> bool;

    async fn size(&self, path: &Path) -> Result<u64>;

    /// Deleting a missing file is not an error.
    async fn delete(&self, path: &Path) -> Result<()>;

    /// A URI that can cross the install boundary without exposing `path`.
    async fn shareable_uri(&self, path: &Path) -> Result<Url>;
}

/// Local disk, with shareable URIs of the form `content://<authority>/<file>`.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
    authority: String,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>, authority: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            authority: authority.into(),
        }
    }

    /// Map a URI produced by [`FileStore::shareable_uri`] back to its file.
    pub fn resolve(&self, uri: &Url) -> Result<PathBuf> {
        if uri.scheme() != "content" || uri.host_str() != Some(self.authority.as_str()) {
            return Err(UpdateError::FileAccess(format!(
                "URI '{uri}' does not belong to this store"
            )));
        }

        let mut segments = uri
            .path_segments()
            .ok_or_else(|| UpdateError::FileAccess(format!("URI '{uri}' has no path")))?;

        let name = match (segments.next(), segments.next()) {
            (Some(name), None) => percent_decode_str(name)
                .decode_utf8()
                .map_err(|e| UpdateError::FileAccess(e.to_string()))?,
            _ => {
                return Err(UpdateError::FileAccess(format!(
                    "URI '{uri}' does not name a single file"
                )));
            }
        };

        let name = PathValidator::validate_file_name(&name)?;
        PathValidator::validate_file_path(self.root.join(name), &self.root)
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn size(&self, path: &Path) -> Result<u64> {
        Ok(tokio::fs::metadata(path).await?.len())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn shareable_uri(&self, path: &Path) -> Result<Url> {
        let canonical = PathValidator::validate_file_path(path, &self.root)?;
        let name = canonical
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                UpdateError::FileAccess(format!("'{}' has no usable file name", path.display()))
            })?;

        let mut uri = Url::parse(&format!("content://{}/", self.authority))?;
        uri.path_segments_mut()
            .map_err(|_| UpdateError::FileAccess("content URI cannot carry a path".to_string()))?
            .pop_if_empty()
            .push(name);
        Ok(uri)
    }
}

/// Size and extension sanity checks for a downloaded package.
///
/// Neither check is cryptographic.
#[derive(Debug, Clone)]
pub struct PackagePolicy {
    pub min_bytes: u64,
    pub max_bytes: u64,
    pub extension: String,
}

impl PackagePolicy {
    pub fn from_config(config: &crate::config::UpdaterConfig) -> Self {
        Self {
            min_bytes: config.min_package_bytes,
            max_bytes: config.max_package_bytes,
            extension: config.package_extension.clone(),
        }
    }

    /// Post-download check: the file exists and is not suspiciously small.
    pub async fn verify_download(&self, store: &dyn FileStore, path: &Path) -> bool {
        if !store.exists(path).await {
            return false;
        }
        matches!(store.size(path).await, Ok(size) if size >= self.min_bytes)
    }

    /// Pre-install check: size within bounds and the package extension.
    pub async fn verify_for_install(&self, store: &dyn FileStore, path: &Path) -> bool {
        let size_ok = matches!(
            store.size(path).await,
            Ok(size) if (self.min_bytes..=self.max_bytes).contains(&size)
        );
        size_ok && self.has_extension(path)
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|n| {
                n.to_ascii_lowercase()
                    .ends_with(&self.extension.to_ascii_lowercase())
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const MIB: u64 = 1024 * 1024;

    fn policy() -> PackagePolicy {
        PackagePolicy {
            min_bytes: MIB,
            max_bytes: 100 * MIB,
            extension: ".apk".to_string(),
        }
    }

    fn sized_file(dir: &Path, name: &str, len: u64) -> PathBuf {
        let path = dir.join(name);
        let file = fs::File::create(&path).unwrap();
        file.set_len(len).unwrap();
        path
    }

    #[tokio::test]
    async fn shareable_uri_hides_the_path() {
        let dir = tempdir().unwrap();
        let path = sized_file(dir.path(), "Feel-1.6.0.apk", 10);
        let store = LocalFileStore::new(dir.path(), "apkup.provider");

        let uri = store.shareable_uri(&path).await.unwrap();

        assert_eq!(uri.as_str(), "content://apkup.provider/Feel-1.6.0.apk");
        assert!(!uri.as_str().contains(&dir.path().display().to_string()));
        assert_eq!(store.resolve(&uri).unwrap(), path.canonicalize().unwrap());
    }

    #[tokio::test]
    async fn shareable_uri_refuses_files_outside_root() {
        let root = tempdir().unwrap();
        let other = tempdir().unwrap();
        let path = sized_file(other.path(), "Feel.apk", 10);
        let store = LocalFileStore::new(root.path(), "apkup.provider");

        let err = store.shareable_uri(&path).await.unwrap_err();
        assert!(matches!(err, UpdateError::FileAccess(_)));
    }

    #[test]
    fn resolve_rejects_foreign_uris() {
        let dir = tempdir().unwrap();
        let store = LocalFileStore::new(dir.path(), "apkup.provider");

        let foreign = Url::parse("content://other.provider/Feel.apk").unwrap();
        let file = Url::parse("file:///etc/passwd").unwrap();
        let nested = Url::parse("content://apkup.provider/a/b.apk").unwrap();

        assert!(store.resolve(&foreign).is_err());
        assert!(store.resolve(&file).is_err());
        assert!(store.resolve(&nested).is_err());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = sized_file(dir.path(), "Feel.apk", 10);
        let store = LocalFileStore::new(dir.path(), "apkup.provider");

        store.delete(&path).await.unwrap();
        assert!(!store.exists(&path).await);
        store.delete(&path).await.unwrap();
    }

    #[tokio::test]
    async fn verify_download_requires_one_mebibyte() {
        let dir = tempdir().unwrap();
        let store = LocalFileStore::new(dir.path(), "apkup.provider");
        let small = sized_file(dir.path(), "small.apk", MIB - 1);
        let exact = sized_file(dir.path(), "exact.apk", MIB);

        assert!(!policy().verify_download(&store, &small).await);
        assert!(policy().verify_download(&store, &exact).await);
        assert!(!policy().verify_download(&store, &dir.path().join("missing.apk")).await);
    }

    #[tokio::test]
    async fn verify_for_install_checks_bounds_and_extension() {
        let dir = tempdir().unwrap();
        let store = LocalFileStore::new(dir.path(), "apkup.provider");
        let ok = sized_file(dir.path(), "Feel.APK", 5 * MIB);
        let huge = sized_file(dir.path(), "huge.apk", 100 * MIB + 1);
        let wrong_ext = sized_file(dir.path(), "Feel.zip", 5 * MIB);

        assert!(policy().verify_for_install(&store, &ok).await);
        assert!(!policy().verify_for_install(&store, &huge).await);
        assert!(!policy().verify_for_install(&store, &wrong_ext).await);
    }
}
