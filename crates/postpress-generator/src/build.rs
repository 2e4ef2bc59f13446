//! Build orchestration.
//!
//! Discovers posts, then for each one in order: replicates its components and
//! static assets, compiles it, extracts its attributes and appends a record to
//! the manifest. The manifest is written once, after every post succeeded.

use std::{
    fmt,
    path::{Path, PathBuf},
    time::Instant,
};

use postpress_core::{
    AttributeExtractor, BoxError, Config, CoreError, ExtractedAttributes, FrontmatterExtractor,
    PostAttributes, PostCompiler, PostDiscovery, PostId, PostRecord,
};
use postpress_parser::{CompileError, MarkdownCompiler, compiler_from_config, derive_excerpt};
use serde_json::Value;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::{
    collector::DirectoryDiscovery,
    manifest::{ManifestError, PostManifest},
    replicate::{ReplicateError, ReplicateStats, Replicator},
};

/// Build errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Posts could not be discovered.
    #[error("post discovery failed: {0}")]
    Discovery(#[source] BoxError),

    /// Copying components or static assets failed.
    #[error("failed to replicate assets of {slug}: {source}")]
    Replicate {
        slug: PostId,
        #[source]
        source: ReplicateError,
    },

    /// The compiler failed.
    #[error("failed to compile {slug}: {source}")]
    Compile {
        slug: PostId,
        #[source]
        source: BoxError,
    },

    /// Attribute extraction failed.
    #[error("failed to extract attributes of {slug}: {source}")]
    Extract {
        slug: PostId,
        #[source]
        source: BoxError,
    },

    /// Writing the manifest failed.
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// IO error.
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] CoreError),

    /// The configured compiler is unusable.
    #[error("compiler error: {0}")]
    Compiler(#[from] CompileError),
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Build statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Number of posts compiled.
    pub posts: usize,

    /// Number of component files copied.
    pub component_files: usize,

    /// Number of static files copied.
    pub static_files: usize,

    /// Number of entries skipped during replication.
    pub skipped: usize,

    /// Build duration in milliseconds.
    pub duration_ms: u64,
}

/// Post builder that orchestrates the build process.
pub struct Builder {
    config: Config,
    replicator: Replicator,
    discovery: Box<dyn PostDiscovery>,
    compiler: Box<dyn PostCompiler>,
    extractor: Box<dyn AttributeExtractor>,
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("config", &self.config)
            .field("replicator", &self.replicator)
            .finish_non_exhaustive()
    }
}

impl Builder {
    /// Create a builder with the built-in collaborators: directory discovery,
    /// the markdown compiler and frontmatter extraction.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            replicator: Replicator::new(config.build.verbose),
            discovery: Box::new(DirectoryDiscovery::new(config.post.content_file.clone())),
            compiler: Box::new(MarkdownCompiler::new()),
            extractor: Box::new(FrontmatterExtractor),
            config,
        }
    }

    /// Create a builder honouring the configured compiler command.
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        let compiler = compiler_from_config(&config.compiler)?;
        let mut builder = Self::new(config);
        builder.compiler = compiler;
        Ok(builder)
    }

    /// Override per-file copy logging.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.replicator = Replicator::new(verbose);
        self
    }

    /// Replace the discovery collaborator.
    #[must_use]
    pub fn with_discovery(mut self, discovery: impl PostDiscovery + 'static) -> Self {
        self.discovery = Box::new(discovery);
        self
    }

    /// Replace the compile collaborator.
    #[must_use]
    pub fn with_compiler(mut self, compiler: impl PostCompiler + 'static) -> Self {
        self.compiler = Box::new(compiler);
        self
    }

    /// Replace the attribute-extraction collaborator.
    #[must_use]
    pub fn with_extractor(mut self, extractor: impl AttributeExtractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    /// The configuration this builder runs with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute the full build process.
    ///
    /// Any failure aborts the build before the manifest is written.
    pub async fn build(&self) -> Result<BuildStats> {
        let start = Instant::now();
        let mut stats = BuildStats::default();

        info!(
            source = %self.config.paths.source.display(),
            output = %self.config.paths.output.display(),
            verbose_copies = self.replicator.verbose(),
            "starting build"
        );

        // 1. Clean output directory
        if self.config.build.clean {
            self.clean_output().await?;
        }

        // 2. Discover posts
        let posts = self
            .discovery
            .discover(&self.config.paths.source)
            .await
            .map_err(BuildError::Discovery)?;

        // 3. Build each post in order
        let total = posts.len();
        let mut manifest = PostManifest::new();
        let mut components = ReplicateStats::default();
        let mut statics = ReplicateStats::default();
        for (i, id) in posts.iter().enumerate() {
            info!("({}/{}) compiling {}", i + 1, total, id);
            let record = self.build_post(id, &mut components, &mut statics).await?;
            manifest.push(record);
        }
        stats.posts = manifest.len();
        stats.component_files = components.files;
        stats.static_files = statics.files;
        stats.skipped = components.skipped + statics.skipped;
        info!("done.");

        // 4. Write the manifest
        manifest
            .write(&self.config.manifest_path(), self.config.build.pretty)
            .await?;

        stats.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            posts = stats.posts,
            component_files = stats.component_files,
            static_files = stats.static_files,
            skipped = stats.skipped,
            duration_ms = stats.duration_ms,
            "build complete"
        );

        Ok(stats)
    }

    /// Replicate, compile and describe one post.
    async fn build_post(
        &self,
        id: &PostId,
        components: &mut ReplicateStats,
        statics: &mut ReplicateStats,
    ) -> Result<PostRecord> {
        let (components_src, components_dest) = self.config.components_paths(id);
        if exists(&components_src).await? {
            *components += self.replicate(id, &components_src, &components_dest).await?;
        }

        let (static_src, static_dest) = self.config.static_paths(id);
        if exists(&static_src).await? {
            *statics += self.replicate(id, &static_src, &static_dest).await?;
        }

        let source = self.config.content_path(id);
        let output = self.config.artifact_path(id);
        let compiled = self
            .compiler
            .compile(&source, &output)
            .await
            .map_err(|e| BuildError::Compile {
                slug: id.clone(),
                source: e,
            })?;

        let extracted = self
            .extractor
            .extract(&compiled.content)
            .map_err(|e| BuildError::Extract {
                slug: id.clone(),
                source: e,
            })?;

        let excerpt = self.resolve_excerpt(id, &extracted);

        Ok(PostRecord {
            path: self.config.record_path(id),
            attributes: PostAttributes::new(extracted.attributes, excerpt),
            slug: id.clone(),
            toc_items: compiled.toc_items,
        })
    }

    async fn replicate(
        &self,
        id: &PostId,
        src: &Path,
        dest: &Path,
    ) -> Result<ReplicateStats> {
        debug!(post = %id, src = %src.display(), dest = %dest.display(), "replicating");
        self.replicator
            .replicate(src, dest)
            .await
            .map_err(|e| BuildError::Replicate {
                slug: id.clone(),
                source: e,
            })
    }

    /// Use the authored excerpt when it is a string, otherwise derive one.
    fn resolve_excerpt(&self, id: &PostId, extracted: &ExtractedAttributes) -> String {
        match extracted.attributes.get("excerpt") {
            Some(Value::String(excerpt)) => excerpt.clone(),
            Some(_) => {
                warn!(post = %id, "excerpt attribute is not a string, deriving it from the body");
                derive_excerpt(&extracted.body, self.config.build.excerpt_length)
            }
            None => derive_excerpt(&extracted.body, self.config.build.excerpt_length),
        }
    }

    /// Clean the output directory.
    async fn clean_output(&self) -> Result<()> {
        let output = &self.config.paths.output;
        if self.config.source_in_output() {
            return Err(BuildError::Config(CoreError::config(
                "build.clean would remove paths.source, which lies inside paths.output",
            )));
        }
        if exists(output).await? {
            debug!(dir = %output.display(), "cleaning output directory");
            fs::remove_dir_all(output)
                .await
                .map_err(|e| io_error(output, e))?;
        }
        fs::create_dir_all(output)
            .await
            .map_err(|e| io_error(output, e))?;
        Ok(())
    }
}

async fn exists(path: &Path) -> Result<bool> {
    fs::try_exists(path).await.map_err(|e| io_error(path, e))
}

fn io_error(path: &Path, source: std::io::Error) -> BuildError {
    BuildError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use postpress_core::CompiledPost;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    /// Discovery returning a fixed list.
    struct FixedDiscovery(Vec<&'static str>);

    #[async_trait]
    impl PostDiscovery for FixedDiscovery {
        async fn discover(&self, _root: &Path) -> std::result::Result<Vec<PostId>, BoxError> {
            Ok(self
                .0
                .iter()
                .map(|s| PostId::new(*s))
                .collect::<postpress_core::Result<Vec<_>>>()?)
        }
    }

    /// Compiler writing a stub artifact and echoing the source.
    #[derive(Default, Clone)]
    struct StubCompiler {
        calls: Arc<Mutex<Vec<PathBuf>>>,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl PostCompiler for StubCompiler {
        async fn compile(
            &self,
            source: &Path,
            output: &Path,
        ) -> std::result::Result<CompiledPost, BoxError> {
            self.calls.lock().unwrap().push(source.to_path_buf());
            if let Some(needle) = self.fail_on {
                if source.to_string_lossy().contains(needle) {
                    return Err("malformed content".into());
                }
            }
            let content = std::fs::read_to_string(source)?;
            std::fs::create_dir_all(output.parent().unwrap())?;
            std::fs::write(output, "export default null;")?;
            Ok(CompiledPost {
                content,
                toc_items: vec![json!({"level": 2, "text": "Intro", "id": "intro"})],
            })
        }
    }

    struct FailingExtractor;

    impl AttributeExtractor for FailingExtractor {
        fn extract(&self, _content: &str) -> std::result::Result<ExtractedAttributes, BoxError> {
            Err("bad metadata".into())
        }
    }

    fn site(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.paths.source = dir.path().join("src/posts");
        config.paths.output = dir.path().join("out");
        config
    }

    fn write_post(config: &Config, slug: &str, content: &str) {
        let id = PostId::new(slug).unwrap();
        let path = config.content_path(&id);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn read_manifest(config: &Config) -> Vec<serde_json::Value> {
        serde_json::from_str(&std::fs::read_to_string(config.manifest_path()).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_manifest_follows_discovery_order() {
        let dir = TempDir::new().unwrap();
        let config = site(&dir);
        for slug in ["c", "a", "b"] {
            write_post(&config, slug, "---\ntitle: T\n---\nbody");
        }

        let builder = Builder::new(config.clone())
            .with_discovery(FixedDiscovery(vec!["c", "a", "b"]))
            .with_compiler(StubCompiler::default());
        let stats = builder.build().await.unwrap();

        assert_eq!(stats.posts, 3);
        let slugs: Vec<_> = read_manifest(&config)
            .iter()
            .map(|r| r["slug"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(slugs, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_empty_discovery_writes_empty_manifest() {
        let dir = TempDir::new().unwrap();
        let config = site(&dir);

        let stats = Builder::new(config.clone())
            .with_discovery(FixedDiscovery(vec![]))
            .build()
            .await
            .unwrap();

        assert_eq!(stats.posts, 0);
        assert_eq!(
            std::fs::read_to_string(config.manifest_path()).unwrap(),
            "[]"
        );
    }

    #[tokio::test]
    async fn test_record_merges_attributes_and_excerpt() {
        let dir = TempDir::new().unwrap();
        let config = site(&dir);
        write_post(
            &config,
            "p1",
            "---\ntitle: A\n---\n\n# Heading\n\nFirst paragraph of the post.",
        );

        let compiler = StubCompiler::default();
        Builder::new(config.clone())
            .with_discovery(FixedDiscovery(vec!["p1"]))
            .with_compiler(compiler.clone())
            .build()
            .await
            .unwrap();

        let manifest = read_manifest(&config);
        assert_eq!(
            manifest,
            vec![json!({
                "path": "posts/p1/page.js",
                "attributes": {"excerpt": "First paragraph of the post.", "title": "A"},
                "slug": "p1",
                "tocItems": [{"level": 2, "text": "Intro", "id": "intro"}]
            })]
        );
        assert_eq!(
            compiler.calls.lock().unwrap().as_slice(),
            &[config.content_path(&PostId::new("p1").unwrap())]
        );
    }

    #[tokio::test]
    async fn test_authored_excerpt_wins() {
        let dir = TempDir::new().unwrap();
        let config = site(&dir);
        write_post(&config, "p1", "---\nexcerpt: Hand written\n---\nBody text.");

        Builder::new(config.clone())
            .with_discovery(FixedDiscovery(vec!["p1"]))
            .with_compiler(StubCompiler::default())
            .build()
            .await
            .unwrap();

        assert_eq!(
            read_manifest(&config)[0]["attributes"]["excerpt"],
            json!("Hand written")
        );
    }

    #[tokio::test]
    async fn test_non_string_excerpt_is_derived() {
        let dir = TempDir::new().unwrap();
        let config = site(&dir);
        write_post(&config, "p1", "---\nexcerpt: 12\n---\nBody text.");

        Builder::new(config.clone())
            .with_discovery(FixedDiscovery(vec!["p1"]))
            .with_compiler(StubCompiler::default())
            .build()
            .await
            .unwrap();

        assert_eq!(
            read_manifest(&config)[0]["attributes"]["excerpt"],
            json!("Body text.")
        );
    }

    #[tokio::test]
    async fn test_assets_replicated_to_separate_roots() {
        let dir = TempDir::new().unwrap();
        let config = site(&dir);
        write_post(&config, "p1", "body");
        write_post(&config, "p2", "body");
        let p2 = PostId::new("p2").unwrap();
        let p2_src = config.post_source_dir(&p2);
        std::fs::create_dir_all(p2_src.join("components")).unwrap();
        std::fs::write(p2_src.join("components/Chart.js"), "chart").unwrap();
        std::fs::create_dir_all(p2_src.join("static")).unwrap();
        std::fs::write(p2_src.join("static/img.png"), [1u8, 2, 3]).unwrap();

        let stats = Builder::new(config.clone())
            .with_discovery(FixedDiscovery(vec!["p1", "p2"]))
            .with_compiler(StubCompiler::default())
            .build()
            .await
            .unwrap();

        assert_eq!(stats.component_files, 1);
        assert_eq!(stats.static_files, 1);

        let out = &config.paths.output;
        assert!(out.join("posts/p2/components/Chart.js").is_file());
        assert_eq!(
            std::fs::read(out.join("public/p2/static/img.png")).unwrap(),
            vec![1u8, 2, 3]
        );
        assert!(!out.join("posts/p2/static").exists());
        assert!(!out.join("posts/p1/components").exists());
        assert!(!out.join("public/p1").exists());
    }

    #[tokio::test]
    async fn test_compile_failure_aborts_without_manifest() {
        let dir = TempDir::new().unwrap();
        let config = site(&dir);
        for slug in ["p1", "p2", "p3"] {
            write_post(&config, slug, "body");
        }

        let compiler = StubCompiler {
            fail_on: Some("p2"),
            ..StubCompiler::default()
        };
        let err = Builder::new(config.clone())
            .with_discovery(FixedDiscovery(vec!["p1", "p2", "p3"]))
            .with_compiler(compiler.clone())
            .build()
            .await
            .unwrap_err();

        assert!(matches!(err, BuildError::Compile { ref slug, .. } if slug.as_str() == "p2"));
        assert_eq!(compiler.calls.lock().unwrap().len(), 2);
        assert!(!config.manifest_path().exists());
    }

    #[tokio::test]
    async fn test_clean_refuses_to_remove_source() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.output = dir.path().join("site");
        config.paths.source = dir.path().join("site/src/posts");
        config.build.clean = true;
        write_post(&config, "p1", "body");

        let err = Builder::from_config(config.clone()).unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));

        let err = Builder::new(config.clone())
            .with_compiler(StubCompiler::default())
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
        assert!(config.content_path(&PostId::new("p1").unwrap()).is_file());
    }

    #[tokio::test]
    async fn test_stats_sum_replicated_entries() {
        let dir = TempDir::new().unwrap();
        let config = site(&dir);
        for slug in ["p1", "p2"] {
            write_post(&config, slug, "body");
            let src = config.post_source_dir(&PostId::new(slug).unwrap());
            std::fs::create_dir_all(src.join("components/nested")).unwrap();
            std::fs::write(src.join("components/A.js"), "a").unwrap();
            std::fs::write(src.join("components/nested/B.js"), "b").unwrap();
            std::fs::create_dir_all(src.join("static")).unwrap();
            std::fs::write(src.join("static/logo.svg"), "<svg/>").unwrap();
        }

        let stats = Builder::new(config.clone())
            .with_discovery(FixedDiscovery(vec!["p1", "p2"]))
            .with_compiler(StubCompiler::default())
            .build()
            .await
            .unwrap();

        assert_eq!(stats.posts, 2);
        assert_eq!(stats.component_files, 4);
        assert_eq!(stats.static_files, 2);
        assert_eq!(stats.skipped, 0);
    }

    #[tokio::test]
    async fn test_extract_failure_aborts_without_manifest() {
        let dir = TempDir::new().unwrap();
        let config = site(&dir);
        write_post(&config, "p1", "body");

        let err = Builder::new(config.clone())
            .with_discovery(FixedDiscovery(vec!["p1"]))
            .with_compiler(StubCompiler::default())
            .with_extractor(FailingExtractor)
            .build()
            .await
            .unwrap_err();

        assert!(matches!(err, BuildError::Extract { .. }));
        assert!(err.to_string().contains("bad metadata"));
        assert!(!config.manifest_path().exists());
    }

    #[tokio::test]
    async fn test_missing_posts_root_is_discovery_error() {
        let dir = TempDir::new().unwrap();
        let config = site(&dir);

        let err = Builder::new(config.clone()).build().await.unwrap_err();

        assert!(matches!(err, BuildError::Discovery(_)));
        assert!(!config.manifest_path().exists());
    }

    #[tokio::test]
    async fn test_clean_removes_stale_output() {
        let dir = TempDir::new().unwrap();
        let mut config = site(&dir);
        config.build.clean = true;
        std::fs::create_dir_all(config.paths.output.join("posts/gone")).unwrap();
        std::fs::write(config.paths.output.join("posts/gone/page.js"), "old").unwrap();

        Builder::new(config.clone())
            .with_discovery(FixedDiscovery(vec![]))
            .build()
            .await
            .unwrap();

        assert!(!config.paths.output.join("posts/gone").exists());
        assert!(config.manifest_path().exists());
    }

    #[test]
    fn test_from_config_selects_command_compiler() {
        let mut config = Config::default();
        config.compiler.command = vec![String::new()];
        assert!(matches!(
            Builder::from_config(config),
            Err(BuildError::Compiler(CompileError::EmptyCommand))
        ));

        let mut config = Config::default();
        config.paths.public = "posts".to_string();
        assert!(matches!(
            Builder::from_config(config),
            Err(BuildError::Config(_))
        ));
    }

    #[test]
    fn test_build_stats() {
        let stats = BuildStats::default();
        assert_eq!(stats.posts, 0);
        assert_eq!(stats.duration_ms, 0);
    }
}
