//! Platform-aware data storage directory management
//!
//! ## Platform Paths
//!
//! | Type | Windows | macOS | Linux |
//! |------|---------|-------|-------|
//! | Data | `%APPDATA%\PromptBench\` | `~/Library/Application Support/PromptBench/` | `$XDG_DATA_HOME/promptbench/` |

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;

use super::constants::{APP_DOT_FOLDER, APP_NAME};
use crate::utils::file::expand_path;

/// Data subdirectories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSubdir {
    Sqlite,
}

impl DataSubdir {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DataSubdir::Sqlite => "sqlite",
        }
    }

    /// Subdirectories created on startup
    pub const fn all() -> &'static [DataSubdir] {
        &[DataSubdir::Sqlite]
    }
}

/// Application storage manager
#[derive(Debug, Clone)]
pub struct AppStorage {
    data_dir: PathBuf,
}

impl AppStorage {
    /// Initialize storage under `data_dir`, or the platform default when unset
    pub async fn init(data_dir: Option<&str>) -> Result<Self> {
        let data_dir = Self::resolve_data_dir(data_dir);

        Self::ensure_directories(&data_dir).await?;

        // canonicalize requires the path to exist
        let data_dir = data_dir.canonicalize().unwrap_or(data_dir);

        tracing::debug!(data_dir = %data_dir.display(), "Storage initialized");

        Ok(Self { data_dir })
    }

    /// Resolve data directory from the CLI/env override or platform default
    pub fn resolve_data_dir(data_dir: Option<&str>) -> PathBuf {
        if let Some(dir) = data_dir.filter(|d| !d.trim().is_empty()) {
            return expand_path(dir);
        }

        if let Some(proj_dirs) = ProjectDirs::from("", "", APP_NAME) {
            return proj_dirs.data_dir().to_path_buf();
        }

        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        cwd.join(APP_DOT_FOLDER)
    }

    pub(crate) async fn ensure_directories(data_dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        for subdir in DataSubdir::all() {
            let path = data_dir.join(subdir.as_str());
            tokio::fs::create_dir_all(&path).await.with_context(|| {
                format!(
                    "Failed to create {} directory: {}",
                    subdir.as_str(),
                    path.display()
                )
            })?;
        }

        Ok(())
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get path to a subdirectory (canonicalized)
    pub fn subdir(&self, subdir: DataSubdir) -> PathBuf {
        let path = self.data_dir.join(subdir.as_str());
        path.canonicalize().unwrap_or(path)
    }

    /// Create AppStorage for testing with a specific data directory
    #[cfg(test)]
    pub fn init_for_test(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_subdir_as_str() {
        assert_eq!(DataSubdir::Sqlite.as_str(), "sqlite");
        assert_eq!(DataSubdir::all(), &[DataSubdir::Sqlite]);
    }

    #[test]
    fn test_resolve_data_dir_override() {
        assert_eq!(
            AppStorage::resolve_data_dir(Some("/srv/promptbench")),
            PathBuf::from("/srv/promptbench")
        );
        assert!(AppStorage::resolve_data_dir(Some("  ")).is_absolute());
    }

    #[tokio::test]
    async fn test_ensure_directories_creates_subdirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("data");
        AppStorage::ensure_directories(&root).await.unwrap();
        assert!(root.join("sqlite").is_dir());

        let storage = AppStorage::init_for_test(root.clone());
        assert_eq!(storage.data_dir(), root.as_path());
        assert!(storage.subdir(DataSubdir::Sqlite).ends_with("sqlite"));
    }
}
