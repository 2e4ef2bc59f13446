//! Post compilers.
//!
//! [`MarkdownCompiler`] renders CommonMark into an ES module artifact.
//! [`CommandCompiler`] delegates to an external program, which is how a full
//! MDX toolchain is plugged in.

use std::{
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
};

use async_trait::async_trait;
use postpress_core::{
    frontmatter::split_frontmatter,
    pipeline::{BoxError, CompiledPost, PostCompiler},
};
use serde_json::Value;
use thiserror::Error;
use tokio::{fs, process::Command};
use tracing::debug;

use crate::{excerpt::strip_esm, markdown::MarkdownParser};

/// Compilation errors.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Reading the source failed.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the artifact failed.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serializing the table of contents failed.
    #[error("failed to serialize table of contents: {0}")]
    Serialize(#[from] serde_json::Error),

    /// No program configured.
    #[error("compiler command is empty")]
    EmptyCommand,

    /// The external compiler could not be started.
    #[error("failed to run compiler `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The external compiler exited unsuccessfully.
    #[error("compiler `{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    /// The external compiler printed something other than the expected JSON.
    #[error("compiler `{program}` produced invalid output: {source}")]
    InvalidOutput {
        program: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for compile operations.
pub type Result<T> = std::result::Result<T, CompileError>;

/// Built-in compiler rendering markdown to an ES module.
///
/// The artifact exports the rendered HTML as `html` (also the default export)
/// and the table of contents as `tocItems`.
#[derive(Debug, Clone, Default)]
pub struct MarkdownCompiler {
    parser: MarkdownParser,
}

impl MarkdownCompiler {
    /// Create a new markdown compiler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `source` into `output`.
    pub async fn compile_file(&self, source: &Path, output: &Path) -> Result<CompiledPost> {
        let content = fs::read_to_string(source)
            .await
            .map_err(|e| CompileError::Read {
                path: source.to_path_buf(),
                source: e,
            })?;

        let body = split_frontmatter(&content).map_or(content.as_str(), |(_, _, body)| body);
        let (html, toc) = self.parser.render(&strip_esm(body));

        let toc_items = toc
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let module = render_module(&html, &toc_items);
        write_artifact(output, &module).await?;

        debug!(
            src = %source.display(),
            dest = %output.display(),
            headings = toc_items.len(),
            "compiled markdown"
        );

        Ok(CompiledPost { content, toc_items })
    }
}

#[async_trait]
impl PostCompiler for MarkdownCompiler {
    async fn compile(
        &self,
        source: &Path,
        output: &Path,
    ) -> std::result::Result<CompiledPost, BoxError> {
        Ok(self.compile_file(source, output).await?)
    }
}

/// Render the ES module text of an artifact.
fn render_module(html: &str, toc_items: &[Value]) -> String {
    format!(
        "export const html = {};\nexport const tocItems = {};\nexport default html;\n",
        Value::String(html.to_string()),
        Value::Array(toc_items.to_vec())
    )
}

async fn write_artifact(output: &Path, module: &str) -> Result<()> {
    let write_err = |e| CompileError::Write {
        path: output.to_path_buf(),
        source: e,
    };

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    fs::write(output, module).await.map_err(write_err)
}

/// Compiler delegating to an external program.
///
/// The program is invoked as `<program> <args...> <source> <output>`. It must
/// write the artifact itself and print `{"content": ..., "tocItems": [...]}`
/// on stdout.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    program: String,
    args: Vec<String>,
}

impl CommandCompiler {
    /// Build from a command line: program followed by leading arguments.
    pub fn from_command(command: &[String]) -> Result<Self> {
        let (program, args) = command.split_first().ok_or(CompileError::EmptyCommand)?;
        if program.trim().is_empty() {
            return Err(CompileError::EmptyCommand);
        }
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// Program name.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run the program for one post.
    pub async fn compile_file(&self, source: &Path, output: &Path) -> Result<CompiledPost> {
        let result = Command::new(&self.program)
            .args(&self.args)
            .arg(source)
            .arg(output)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| CompileError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();

        if !result.status.success() {
            return Err(CompileError::Failed {
                program: self.program.clone(),
                status: result.status,
                stderr,
            });
        }

        if !stderr.is_empty() {
            debug!(program = %self.program, %stderr, "compiler stderr");
        }

        serde_json::from_slice(&result.stdout).map_err(|e| CompileError::InvalidOutput {
            program: self.program.clone(),
            source: e,
        })
    }
}

#[async_trait]
impl PostCompiler for CommandCompiler {
    async fn compile(
        &self,
        source: &Path,
        output: &Path,
    ) -> std::result::Result<CompiledPost, BoxError> {
        Ok(self.compile_file(source, output).await?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_markdown_compiler_writes_module() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("README.mdx");
        let output = dir.path().join("out/posts/p1/page.js");
        std::fs::write(
            &source,
            "---\ntitle: A\n---\n\nimport X from './components/X'\n\n# Intro\n\nHello \"there\".\n",
        )
        .unwrap();

        let compiled = MarkdownCompiler::new()
            .compile_file(&source, &output)
            .await
            .unwrap();

        assert!(compiled.content.starts_with("---\ntitle: A"));
        assert_eq!(
            compiled.toc_items,
            vec![json!({"level": 1, "text": "Intro", "id": "intro"})]
        );

        let module = std::fs::read_to_string(&output).unwrap();
        assert!(module.starts_with("export const html = \"<h1 id=\\\"intro\\\">Intro</h1>"));
        assert!(module.contains("Hello &quot;there&quot;."));
        assert!(!module.contains("import X"));
        assert!(!module.contains("title: A"));
        assert!(module.ends_with("export default html;\n"));
    }

    #[tokio::test]
    async fn test_markdown_compiler_keeps_code_sample_imports() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("README.mdx");
        let output = dir.path().join("page.js");
        std::fs::write(
            &source,
            "import Chart from './components/Chart'\n\n```js\nimport React from 'react'\nexport default App\n```\n",
        )
        .unwrap();

        MarkdownCompiler::new()
            .compile_file(&source, &output)
            .await
            .unwrap();

        let module = std::fs::read_to_string(&output).unwrap();
        assert!(module.contains("<pre><code class=\\\"language-js\\\">import React from 'react'"));
        assert!(module.contains("export default App\\n</code></pre>"));
        assert!(!module.contains("import Chart"));
    }

    #[tokio::test]
    async fn test_markdown_compiler_missing_source() {
        let dir = TempDir::new().unwrap();
        let result = MarkdownCompiler::new()
            .compile_file(&dir.path().join("nope.mdx"), &dir.path().join("page.js"))
            .await;

        assert!(matches!(result, Err(CompileError::Read { .. })));
    }

    #[test]
    fn test_command_compiler_rejects_empty_command() {
        assert!(matches!(
            CommandCompiler::from_command(&[]),
            Err(CompileError::EmptyCommand)
        ));
        let compiler =
            CommandCompiler::from_command(&["node".to_string(), "compile.mjs".to_string()])
                .unwrap();
        assert_eq!(compiler.program(), "node");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_compiler_parses_stdout() {
        let dir = TempDir::new().unwrap();
        let command = vec![
            "sh".to_string(),
            "-c".to_string(),
            r#"printf '%s' '{"content":"---\ntitle: A\n---\n","tocItems":[{"depth":2}]}'"#
                .to_string(),
            "compile".to_string(),
        ];
        let compiler = CommandCompiler::from_command(&command).unwrap();

        let compiled = compiler
            .compile_file(&dir.path().join("in.mdx"), &dir.path().join("page.js"))
            .await
            .unwrap();

        assert_eq!(compiled.content, "---\ntitle: A\n---\n");
        assert_eq!(compiled.toc_items, vec![json!({"depth": 2})]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_compiler_failure_carries_stderr() {
        let dir = TempDir::new().unwrap();
        let command = vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo 'syntax error in mdx' >&2; exit 3".to_string(),
            "compile".to_string(),
        ];
        let compiler = CommandCompiler::from_command(&command).unwrap();

        let err = compiler
            .compile_file(&dir.path().join("in.mdx"), &dir.path().join("page.js"))
            .await
            .unwrap_err();

        assert!(matches!(err, CompileError::Failed { .. }));
        assert!(err.to_string().contains("syntax error in mdx"));
    }
}
