//! Postpress Generator Library
//!
//! Build pipeline for postpress.
//!
//! # Modules
//!
//! - [`collector`] - Post discovery from the posts directory
//! - [`replicate`] - Recursive copying of components and static assets
//! - [`manifest`] - Ordered manifest of compiled posts
//! - [`build`] - Build orchestration

pub mod build;
pub mod collector;
pub mod manifest;
pub mod replicate;

pub use build::{BuildError, BuildStats, Builder};
pub use collector::DirectoryDiscovery;
pub use manifest::PostManifest;
pub use replicate::{ReplicateStats, Replicator};
