//! Recursive file replication.
//!
//! Copies a file or a whole directory tree to a destination, preserving names
//! and nesting. Used for the parts of a post that are not compiled: component
//! code and static assets.

use std::{
    ops::AddAssign,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

/// Replication errors.
#[derive(Debug, Error)]
pub enum ReplicateError {
    /// Reading an entry's metadata failed.
    #[error("failed to inspect {path}: {source}")]
    Inspect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Creating a destination directory failed.
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Listing a source directory failed.
    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Copying a file failed.
    #[error("failed to copy {src} to {dest}: {source}")]
    Copy {
        src: PathBuf,
        dest: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for replication.
pub type Result<T> = std::result::Result<T, ReplicateError>;

/// Counts of what a replication touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplicateStats {
    /// Files copied.
    pub files: usize,

    /// Directories created or reused, the destination root included.
    pub dirs: usize,

    /// Entries skipped because they were neither file nor directory.
    pub skipped: usize,
}

impl AddAssign for ReplicateStats {
    fn add_assign(&mut self, rhs: Self) {
        self.files += rhs.files;
        self.dirs += rhs.dirs;
        self.skipped += rhs.skipped;
    }
}

/// Recursive copier for files and directory trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct Replicator {
    /// Log every copied file at INFO instead of DEBUG.
    verbose: bool,
}

impl Replicator {
    /// Create a replicator.
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Whether per-file copy lines are logged.
    #[must_use]
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Replicate `src` to `dest`.
    ///
    /// Directories are created as needed (existing ones are reused) and filled
    /// entry by entry in listing order; files overwrite their destination.
    /// Symlinks and other special entries are skipped with a warning and never
    /// followed. Any I/O failure aborts the replication.
    pub async fn replicate(&self, src: &Path, dest: &Path) -> Result<ReplicateStats> {
        let mut stats = ReplicateStats::default();
        let mut pending = vec![(src.to_path_buf(), dest.to_path_buf())];
        let mut is_root = true;

        while let Some((src, dest)) = pending.pop() {
            let file_type = fs::symlink_metadata(&src)
                .await
                .map_err(|e| ReplicateError::Inspect {
                    path: src.clone(),
                    source: e,
                })?
                .file_type();

            if file_type.is_dir() {
                fs::create_dir_all(&dest)
                    .await
                    .map_err(|e| ReplicateError::CreateDir {
                        path: dest.clone(),
                        source: e,
                    })?;
                stats.dirs += 1;

                // Pushed in reverse so entries pop in listing order.
                let children = list_children(&src, &dest).await?;
                pending.extend(children.into_iter().rev());
            } else if file_type.is_file() {
                if is_root {
                    ensure_parent(&dest).await?;
                }
                self.copy_file(&src, &dest).await?;
                stats.files += 1;
            } else {
                warn!("Skipped: {} is not a file or directory", src.display());
                stats.skipped += 1;
            }

            is_root = false;
        }

        Ok(stats)
    }

    /// Copy a single file, overwriting the destination.
    async fn copy_file(&self, src: &Path, dest: &Path) -> Result<()> {
        fs::copy(src, dest)
            .await
            .map_err(|e| ReplicateError::Copy {
                src: src.to_path_buf(),
                dest: dest.to_path_buf(),
                source: e,
            })?;

        if self.verbose {
            info!("Copied file: {} -> {}", src.display(), dest.display());
        } else {
            debug!(src = %src.display(), dest = %dest.display(), "copied file");
        }

        Ok(())
    }
}

/// Source/destination pairs for every entry of `src`, in listing order.
async fn list_children(src: &Path, dest: &Path) -> Result<Vec<(PathBuf, PathBuf)>> {
    let read_err = |e| ReplicateError::ReadDir {
        path: src.to_path_buf(),
        source: e,
    };

    let mut entries = fs::read_dir(src).await.map_err(read_err)?;
    let mut children = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
        let name = entry.file_name();
        children.push((src.join(&name), dest.join(&name)));
    }

    Ok(children)
}

async fn ensure_parent(dest: &Path) -> Result<()> {
    match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .await
            .map_err(|e| ReplicateError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            }),
        _ => Ok(()),
    }
}
