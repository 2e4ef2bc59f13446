//! Postpress Parser Library
//!
//! Built-in post compilers and excerpt derivation.

pub mod compiler;
pub mod excerpt;
pub mod markdown;

pub use compiler::{CommandCompiler, CompileError, MarkdownCompiler};
pub use excerpt::derive_excerpt;
pub use markdown::{MarkdownParser, TocEntry};
use postpress_core::{PostCompiler, config::CompilerConfig};

/// Select the compiler described by the configuration.
pub fn compiler_from_config(config: &CompilerConfig) -> compiler::Result<Box<dyn PostCompiler>> {
    if config.command.is_empty() {
        Ok(Box::new(MarkdownCompiler::new()))
    } else {
        Ok(Box::new(CommandCompiler::from_command(&config.command)?))
    }
}
