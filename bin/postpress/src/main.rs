//! Postpress CLI
//!
//! Compiles a tree of authored posts into page artifacts and a JSON manifest.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;
use postpress::cmd::build::BuildOptions;

/// Command-line interface for Postpress.
#[derive(Parser)]
#[command(
    name = "postpress",
    version,
    about = "Compile authored posts into page artifacts and a manifest"
)]
struct Cli {
    /// Path to configuration file (defaults to postpress.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Build every post and write the manifest
    Build {
        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Remove the output directory before building
        #[arg(long)]
        clean: bool,
        /// Pretty-print the manifest
        #[arg(long)]
        pretty: bool,
        /// Log every copied component and static file
        #[arg(
            long = "verbose-copies",
            env = "VERBOSE",
            value_parser = clap::builder::FalseyValueParser::new()
        )]
        verbose_copies: bool,
    },
    /// List discovered posts in build order
    List,
    /// Create a new post
    New {
        /// Post identifier (e.g., 2024/my-article)
        id: String,
        /// Post title
        #[arg(short, long)]
        title: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    postpress::init_tracing(cli.verbose);

    let config = postpress::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Build {
            output,
            clean,
            pretty,
            verbose_copies,
        } => {
            let options = BuildOptions {
                output,
                clean,
                pretty,
                verbose_copies,
            };
            postpress::cmd::build::run(config, &options).await?;
        }
        Commands::List => {
            postpress::cmd::list::run(&config).await?;
        }
        Commands::New { id, title } => {
            postpress::cmd::new::run(&config, &id, title.as_deref())?;
        }
    }

    Ok(())
}
