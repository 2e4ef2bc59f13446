//! Postpress Core Library
//!
//! Core types, collaborator traits, configuration and error handling shared by
//! the postpress build pipeline.

pub mod config;
pub mod error;
pub mod frontmatter;
pub mod pipeline;
pub mod post;

pub use config::Config;
pub use error::{CoreError, Result};
pub use frontmatter::FrontmatterExtractor;
pub use pipeline::{
    AttributeExtractor, BoxError, CompiledPost, ExtractedAttributes, PostCompiler, PostDiscovery,
};
pub use post::{PostAttributes, PostId, PostRecord};
