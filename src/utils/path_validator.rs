use crate::error::{Result, UpdateError};
use std::path::{Path, PathBuf};

/// Keeps file access confined to a base directory.
pub struct PathValidator;

impl PathValidator {
    /// Ensures the file path resides inside the provided base directory.
    pub fn validate_file_path(
        file_path: impl AsRef<Path>,
        base_dir: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        let file_path = file_path.as_ref();
        let base_dir = base_dir.as_ref();

        let canonical_file = file_path.canonicalize().map_err(|e| {
            UpdateError::FileAccess(format!("invalid file path '{}': {e}", file_path.display()))
        })?;

        let canonical_base = base_dir.canonicalize().map_err(|e| {
            UpdateError::FileAccess(format!(
                "invalid base directory '{}': {e}",
                base_dir.display()
            ))
        })?;

        if !canonical_file.starts_with(&canonical_base) {
            return Err(UpdateError::FileAccess(
                "file path is outside the download directory".to_string(),
            ));
        }

        Ok(canonical_file)
    }

    /// Accepts a bare file name only: no separators, no parent references.
    pub fn validate_file_name(name: &str) -> Result<&str> {
        let invalid = name.is_empty()
            || name == "."
            || name.contains("..")
            || name.contains('/')
            || name.contains('\\');

        if invalid {
            return Err(UpdateError::FileAccess(format!(
                "invalid file name '{name}'"
            )));
        }
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn validate_file_path_accepts_child() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("Feel-1.6.0.apk");
        fs::write(&file, "apk").unwrap();
        let resolved = PathValidator::validate_file_path(&file, dir.path()).unwrap();
        assert!(resolved.ends_with("Feel-1.6.0.apk"));
    }

    #[test]
    fn validate_file_path_rejects_traversal() {
        let base = tempdir().unwrap();
        let other = tempdir().unwrap();
        let outside = other.path().join("evil.apk");
        fs::write(&outside, "apk").unwrap();
        let err = PathValidator::validate_file_path(&outside, base.path()).unwrap_err();
        assert!(matches!(err, UpdateError::FileAccess(_)));
    }

    #[test]
    fn validate_file_path_rejects_missing_file() {
        let dir = tempdir().unwrap();
        assert!(PathValidator::validate_file_path(dir.path().join("nope.apk"), dir.path()).is_err());
    }

    #[test]
    fn validate_file_name_rejects_separators() {
        assert!(PathValidator::validate_file_name("Feel-1.6.0.apk").is_ok());
        assert!(PathValidator::validate_file_name("../Feel.apk").is_err());
        assert!(PathValidator::validate_file_name("a/b.apk").is_err());
        assert!(PathValidator::validate_file_name("").is_err());
    }
}
