//! The post manifest: every compiled post, in discovery order, written once.

use std::path::{Path, PathBuf};

use postpress_core::PostRecord;
use thiserror::Error;
use tokio::fs;
use tracing::info;

/// Manifest errors.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Serialization failed.
    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Writing the manifest failed.
    #[error("failed to write manifest {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for manifest operations.
pub type Result<T> = std::result::Result<T, ManifestError>;

/// Append-only, ordered collection of post records.
#[derive(Debug, Clone, Default)]
pub struct PostManifest {
    records: Vec<PostRecord>,
}

impl PostManifest {
    /// Create a new empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record after all records added so far.
    pub fn push(&mut self, record: PostRecord) {
        self.records.push(record);
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in insertion order.
    #[must_use]
    pub fn records(&self) -> &[PostRecord] {
        &self.records
    }

    /// Serialize the records as a JSON array.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(&self.records)?
        } else {
            serde_json::to_string(&self.records)?
        };
        Ok(json)
    }

    /// Serialize and write the manifest, consuming it.
    ///
    /// Missing parent directories are created.
    pub async fn write(self, path: &Path, pretty: bool) -> Result<()> {
        let json = self.to_json(pretty)?;
        let write_err = |e| ManifestError::Write {
            path: path.to_path_buf(),
            source: e,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        fs::write(path, json).await.map_err(write_err)?;

        info!(path = %path.display(), posts = self.records.len(), "wrote manifest");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use postpress_core::{PostAttributes, PostId};
    use serde_json::{Map, json};
    use tempfile::TempDir;

    use super::*;

    fn record(slug: &str) -> PostRecord {
        let mut attrs = Map::new();
        attrs.insert("title".into(), json!(slug.to_uppercase()));
        PostRecord {
            path: format!("posts/{slug}/page.js"),
            attributes: PostAttributes::new(attrs, format!("about {slug}")),
            slug: PostId::new(slug).unwrap(),
            toc_items: Vec::new(),
        }
    }

    #[test]
    fn test_empty_manifest_serializes_to_empty_array() {
        let manifest = PostManifest::new();
        assert!(manifest.is_empty());
        assert_eq!(manifest.to_json(false).unwrap(), "[]");
    }

    #[test]
    fn test_records_keep_insertion_order() {
        let mut manifest = PostManifest::new();
        for slug in ["zeta", "alpha", "mid"] {
            manifest.push(record(slug));
        }

        let slugs: Vec<_> = manifest.records().iter().map(|r| r.slug.as_str()).collect();
        assert_eq!(slugs, vec!["zeta", "alpha", "mid"]);

        let value: serde_json::Value = serde_json::from_str(&manifest.to_json(false).unwrap()).unwrap();
        assert_eq!(value[0]["slug"], json!("zeta"));
        assert_eq!(value[2]["path"], json!("posts/mid/page.js"));
        assert_eq!(value[1]["attributes"]["excerpt"], json!("about alpha"));
        assert_eq!(value[1]["tocItems"], json!([]));
    }

    #[test]
    fn test_compact_json_matches_field_order() {
        let mut manifest = PostManifest::new();
        manifest.push(record("p1"));

        assert_eq!(
            manifest.to_json(false).unwrap(),
            r#"[{"path":"posts/p1/page.js","attributes":{"excerpt":"about p1","title":"P1"},"slug":"p1","tocItems":[]}]"#
        );
    }

    #[tokio::test]
    async fn test_write_creates_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/index.json");
        let mut manifest = PostManifest::new();
        manifest.push(record("p1"));

        manifest.write(&path, true).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<PostRecord> = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, vec![record("p1")]);
        assert!(written.contains('\n'));
    }
}
