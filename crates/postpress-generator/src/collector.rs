//! Post discovery.
//!
//! Walks the posts root and collects every directory holding a content file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use postpress_core::{BoxError, CoreError, PostDiscovery, PostId};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

/// Post discovery errors.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// The posts root is missing or not a directory.
    #[error("posts directory not found: {0}")]
    RootMissing(PathBuf),

    /// Walking the tree failed.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// A directory name could not be used as an identifier.
    #[error("invalid post directory {path}: {source}")]
    InvalidPath {
        path: PathBuf,
        #[source]
        source: CoreError,
    },

    /// The blocking walk task failed.
    #[error("discovery task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type for collector operations.
pub type Result<T> = std::result::Result<T, CollectorError>;

/// Discovers posts as the directories that directly contain a content file.
///
/// Directories are visited in file-name order. A post directory is not
/// searched further, and hidden directories are ignored.
#[derive(Debug, Clone)]
pub struct DirectoryDiscovery {
    content_file: String,
}

impl DirectoryDiscovery {
    /// Create a discovery looking for `content_file` in each directory.
    #[must_use]
    pub fn new(content_file: impl Into<String>) -> Self {
        Self {
            content_file: content_file.into(),
        }
    }

    /// Find all posts below `root`, blocking the current thread.
    pub fn find_posts(&self, root: &Path) -> Result<Vec<PostId>> {
        info!(dir = %root.display(), "discovering posts");

        if !root.is_dir() {
            return Err(CollectorError::RootMissing(root.to_path_buf()));
        }

        let mut posts = Vec::new();
        let mut walker = WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = entry?;
            if !entry.file_type().is_dir() {
                continue;
            }
            if is_hidden(&entry) {
                walker.skip_current_dir();
                continue;
            }
            if !entry.path().join(&self.content_file).is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            let id = PostId::from_relative_path(relative).map_err(|e| {
                CollectorError::InvalidPath {
                    path: entry.path().to_path_buf(),
                    source: e,
                }
            })?;
            debug!(post = %id, "found post");
            posts.push(id);
            walker.skip_current_dir();
        }

        info!(count = posts.len(), "found posts");
        Ok(posts)
    }
}

impl Default for DirectoryDiscovery {
    fn default() -> Self {
        Self::new("README.mdx")
    }
}

#[async_trait]
impl PostDiscovery for DirectoryDiscovery {
    async fn discover(&self, root: &Path) -> std::result::Result<Vec<PostId>, BoxError> {
        let discovery = self.clone();
        let root = root.to_path_buf();
        let posts = tokio::task::spawn_blocking(move || discovery.find_posts(&root))
            .await
            .map_err(CollectorError::from)??;
        Ok(posts)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}
