//! Build configuration management.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    error::{CoreError, Result},
    post::PostId,
};

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "POSTPRESS";

/// Main configuration structure for postpress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Source and output locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Layout of a single post directory.
    #[serde(default)]
    pub post: PostConfig,

    /// Build settings.
    #[serde(default)]
    pub build: BuildConfig,

    /// Compiler selection.
    #[serde(default)]
    pub compiler: CompilerConfig,
}

/// Source and output locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root directory of the posts.
    #[serde(default = "default_source")]
    pub source: PathBuf,

    /// Root of all build output.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Directory under `output` receiving artifacts and components.
    #[serde(default = "default_compiled")]
    pub compiled: String,

    /// Directory under `output` receiving static assets.
    #[serde(default = "default_public")]
    pub public: String,

    /// Manifest file name under `output`.
    #[serde(default = "default_manifest")]
    pub manifest: String,
}

/// File and directory names inside one post directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostConfig {
    /// Primary content file.
    #[serde(default = "default_content_file")]
    pub content_file: String,

    /// Compiled artifact file name.
    #[serde(default = "default_artifact_file")]
    pub artifact_file: String,

    /// Component code directory, copied next to the artifact.
    #[serde(default = "default_components_dir")]
    pub components_dir: String,

    /// Static asset directory, copied under the public root.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

/// Build settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Log every copied file.
    #[serde(default)]
    pub verbose: bool,

    /// Maximum length of a derived excerpt, in characters.
    #[serde(default = "default_excerpt_length")]
    pub excerpt_length: usize,

    /// Pretty-print the manifest.
    #[serde(default)]
    pub pretty: bool,

    /// Remove the output root before building.
    #[serde(default)]
    pub clean: bool,
}

/// Compiler selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// External compiler program and leading arguments. Empty selects the
    /// built-in markdown compiler.
    #[serde(default)]
    pub command: Vec<String>,
}

// Default value functions
fn default_source() -> PathBuf {
    PathBuf::from("src/posts")
}

fn default_output() -> PathBuf {
    PathBuf::from("out")
}

fn default_compiled() -> String {
    "posts".to_string()
}

fn default_public() -> String {
    "public".to_string()
}

fn default_manifest() -> String {
    "index.json".to_string()
}

fn default_content_file() -> String {
    "README.mdx".to_string()
}

fn default_artifact_file() -> String {
    "page.js".to_string()
}

fn default_components_dir() -> String {
    "components".to_string()
}

fn default_static_dir() -> String {
    "static".to_string()
}

fn default_excerpt_length() -> usize {
    160
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            output: default_output(),
            compiled: default_compiled(),
            public: default_public(),
            manifest: default_manifest(),
        }
    }
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            content_file: default_content_file(),
            artifact_file: default_artifact_file(),
            components_dir: default_components_dir(),
            static_dir: default_static_dir(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            excerpt_length: default_excerpt_length(),
            pretty: false,
            clean: false,
        }
    }
}

impl Config {
    /// Load configuration layered with `POSTPRESS__*` environment variables.
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let names = [
            ("paths.compiled", &self.paths.compiled),
            ("paths.public", &self.paths.public),
            ("paths.manifest", &self.paths.manifest),
            ("post.content_file", &self.post.content_file),
            ("post.artifact_file", &self.post.artifact_file),
            ("post.components_dir", &self.post.components_dir),
            ("post.static_dir", &self.post.static_dir),
        ];
        for (key, value) in names {
            if value.trim().is_empty() {
                return Err(CoreError::config(format!("{key} cannot be empty")));
            }
        }

        if self.paths.source.as_os_str().is_empty() {
            return Err(CoreError::config("paths.source cannot be empty"));
        }
        if self.paths.output.as_os_str().is_empty() {
            return Err(CoreError::config("paths.output cannot be empty"));
        }

        if self.paths.compiled == self.paths.public {
            return Err(CoreError::config(
                "paths.compiled and paths.public must be different directories",
            ));
        }

        if self.build.excerpt_length == 0 {
            return Err(CoreError::config("build.excerpt_length must be positive"));
        }

        if self.source_in_output() {
            if self.build.clean {
                return Err(CoreError::config(
                    "build.clean would remove paths.source, which lies inside paths.output",
                ));
            }
            tracing::warn!("paths.source lies inside paths.output and may be removed by a clean build");
        }

        Ok(())
    }

    /// Whether the posts root is the output root or lies below it.
    #[must_use]
    pub fn source_in_output(&self) -> bool {
        self.paths.source.starts_with(&self.paths.output)
    }

    /// Directory receiving compiled artifacts and components.
    #[must_use]
    pub fn compiled_dir(&self) -> PathBuf {
        self.paths.output.join(&self.paths.compiled)
    }

    /// Directory receiving static assets.
    #[must_use]
    pub fn public_dir(&self) -> PathBuf {
        self.paths.output.join(&self.paths.public)
    }

    /// Location of the manifest document.
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.paths.output.join(&self.paths.manifest)
    }

    /// Source directory of a post.
    #[must_use]
    pub fn post_source_dir(&self, id: &PostId) -> PathBuf {
        id.join_to(&self.paths.source)
    }

    /// Content file of a post.
    #[must_use]
    pub fn content_path(&self, id: &PostId) -> PathBuf {
        self.post_source_dir(id).join(&self.post.content_file)
    }

    /// Compiled artifact of a post.
    #[must_use]
    pub fn artifact_path(&self, id: &PostId) -> PathBuf {
        id.join_to(&self.compiled_dir())
            .join(&self.post.artifact_file)
    }

    /// Artifact path as recorded in the manifest: relative to the output root
    /// and `/`-separated on every platform.
    #[must_use]
    pub fn record_path(&self, id: &PostId) -> String {
        format!(
            "{}/{}/{}",
            self.paths.compiled.trim_matches('/'),
            id,
            self.post.artifact_file
        )
    }

    /// Source and destination of a post's components.
    #[must_use]
    pub fn components_paths(&self, id: &PostId) -> (PathBuf, PathBuf) {
        (
            self.post_source_dir(id).join(&self.post.components_dir),
            id.join_to(&self.compiled_dir())
                .join(&self.post.components_dir),
        )
    }

    /// Source and destination of a post's static assets.
    #[must_use]
    pub fn static_paths(&self, id: &PostId) -> (PathBuf, PathBuf) {
        (
            self.post_source_dir(id).join(&self.post.static_dir),
            id.join_to(&self.public_dir()).join(&self.post.static_dir),
        )
    }
}
