//! Post identifiers and the records persisted into the manifest.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};

/// Identifier of one post: its source directory relative to the posts root.
///
/// Always `/`-separated and never escapes the root, so it can be joined onto
/// any of the source or output roots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PostId(String);

impl PostId {
    /// Validate and wrap a relative post path.
    ///
    /// Backslashes are normalised to `/`. Empty identifiers, absolute paths and
    /// `.`/`..` segments are rejected.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into().replace('\\', "/");
        let invalid = |message: &str| CoreError::InvalidPostId {
            id: id.clone(),
            message: message.to_string(),
        };

        if id.is_empty() {
            return Err(invalid("identifier is empty"));
        }
        if id.starts_with('/') {
            return Err(invalid("identifier must be relative"));
        }
        if id
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(invalid("identifier contains an empty, `.` or `..` segment"));
        }

        Ok(Self(id))
    }

    /// Build an identifier from a path relative to the posts root.
    pub fn from_relative_path(path: &Path) -> Result<Self> {
        let segments: Vec<_> = path
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Self::new(segments.join("/"))
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments of the identifier.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Join the identifier onto a base directory.
    #[must_use]
    pub fn join_to(&self, base: &Path) -> PathBuf {
        self.segments().fold(base.to_path_buf(), |acc, s| acc.join(s))
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PostId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<PostId> for String {
    fn from(id: PostId) -> Self {
        id.0
    }
}

/// Attributes of a post as stored in the manifest.
///
/// Everything the metadata block contained is kept as-is in `extra`; only
/// `excerpt` is guaranteed to exist and to be a string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostAttributes {
    /// Short summary of the post.
    pub excerpt: String,

    /// All other attributes, in the order they were authored.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PostAttributes {
    /// Combine extracted attributes with the resolved excerpt.
    ///
    /// Any `excerpt` key in `attributes` is replaced by `excerpt`.
    #[must_use]
    pub fn new(mut attributes: Map<String, Value>, excerpt: impl Into<String>) -> Self {
        attributes.shift_remove("excerpt");
        Self {
            excerpt: excerpt.into(),
            extra: attributes,
        }
    }

    /// Look up an authored attribute by key. `excerpt` is kept in its own field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

/// One entry of the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    /// Artifact path relative to the output root, `/`-separated.
    pub path: String,

    /// Metadata attributes including `excerpt`.
    pub attributes: PostAttributes,

    /// The post identifier, used for routing.
    pub slug: PostId,

    /// Table of contents as produced by the compiler.
    pub toc_items: Vec<Value>,
}
