//! Build command - compiles every post and writes the manifest

use std::{path::PathBuf, time::Instant};

use color_eyre::eyre::{Result, WrapErr};
use postpress_core::Config;
use postpress_generator::{BuildStats, Builder};

/// Command-line overrides for a build.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Output root override.
    pub output: Option<PathBuf>,
    /// Remove the output root first.
    pub clean: bool,
    /// Pretty-print the manifest.
    pub pretty: bool,
    /// Log every copied file.
    pub verbose_copies: bool,
}

/// Apply command-line overrides on top of the loaded configuration.
pub fn apply_options(mut config: Config, options: &BuildOptions) -> Config {
    if let Some(output) = &options.output {
        tracing::info!(output = %output.display(), "Overriding output directory from CLI");
        config.paths.output = output.clone();
    }
    config.build.clean |= options.clean;
    config.build.pretty |= options.pretty;
    config.build.verbose |= options.verbose_copies;
    config
}

/// Run the build command.
pub async fn run(config: Config, options: &BuildOptions) -> Result<BuildStats> {
    let start = Instant::now();
    let config = apply_options(config, options);

    let builder = Builder::from_config(config).wrap_err("Invalid build configuration")?;
    let manifest_path = builder.config().manifest_path();
    let stats = builder.build().await.wrap_err("Build failed")?;

    let duration = start.elapsed();

    // Print build statistics
    println!();
    println!("  Build completed successfully!");
    println!();
    println!("  Posts:       {}", stats.posts);
    println!("  Components:  {}", stats.component_files);
    println!("  Static:      {}", stats.static_files);
    if stats.skipped > 0 {
        println!("  Skipped:     {}", stats.skipped);
    }
    println!();
    println!("  Duration:    {:.2}s", duration.as_secs_f64());
    println!("  Manifest:    {}", manifest_path.display());
    println!();

    tracing::debug!(?stats, ?duration, "Build completed successfully");

    Ok(stats)
}
