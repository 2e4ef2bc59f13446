//! Collaborator interfaces consumed by the build orchestrator.
//!
//! Discovery, compilation and attribute extraction are external to the
//! orchestrator. They are expressed as object-safe traits so a build can mix
//! the built-in implementations with custom ones (or test fakes).

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::post::PostId;

/// Error type returned by collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Output of a compile call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledPost {
    /// Content handed to attribute extraction. Never written by the orchestrator.
    pub content: String,

    /// Table of contents entries, opaque to the orchestrator.
    #[serde(default)]
    pub toc_items: Vec<Value>,
}

/// Output of attribute extraction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedAttributes {
    /// Key/value attributes from the metadata block.
    pub attributes: Map<String, Value>,

    /// Content with the metadata block removed.
    pub body: String,
}

/// Finds the posts below a root directory.
#[async_trait]
pub trait PostDiscovery: Send + Sync {
    /// Return the post identifiers in display order.
    async fn discover(&self, root: &Path) -> Result<Vec<PostId>, BoxError>;
}

/// Compiles one post's content file into its output artifact.
#[async_trait]
pub trait PostCompiler: Send + Sync {
    /// Compile `source` and write the artifact to `output`.
    async fn compile(&self, source: &Path, output: &Path) -> Result<CompiledPost, BoxError>;
}

/// Extracts the embedded metadata block from content.
pub trait AttributeExtractor: Send + Sync {
    /// Parse the attributes of `content`.
    fn extract(&self, content: &str) -> Result<ExtractedAttributes, BoxError>;
}
