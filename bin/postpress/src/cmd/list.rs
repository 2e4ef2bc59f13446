//! List command - prints the discovered posts in build order

use color_eyre::eyre::{Result, WrapErr};
use postpress_core::{Config, PostDiscovery, PostId};
use postpress_generator::DirectoryDiscovery;

/// Run the list command.
pub async fn run(config: &Config) -> Result<Vec<PostId>> {
    let discovery = DirectoryDiscovery::new(config.post.content_file.clone());
    let posts = discovery
        .discover(&config.paths.source)
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e))
        .wrap_err("Post discovery failed")?;

    for (i, id) in posts.iter().enumerate() {
        println!("{:>4}  {id}", i + 1);
    }
    if posts.is_empty() {
        println!("No posts found in {}", config.paths.source.display());
    }

    Ok(posts)
}
