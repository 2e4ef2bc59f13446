//! New command - scaffold a post directory

use std::{fs, path::PathBuf};

use chrono::Local;
use color_eyre::eyre::{Result, WrapErr, bail};
use postpress_core::{Config, PostId};

/// Run the new command.
///
/// Creates `<source>/<id>/<content_file>` with a frontmatter block.
pub fn run(config: &Config, id: &str, title: Option<&str>) -> Result<PathBuf> {
    let id = PostId::new(id).wrap_err("Invalid post identifier")?;
    tracing::info!(post = %id, "Creating new post");

    let file_path = config.content_path(&id);
    if file_path.exists() {
        bail!("Post already exists: {}", file_path.display());
    }

    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).wrap_err("Failed to create directories")?;
    }

    let title = title.map_or_else(|| default_title(&id), str::to_string);
    fs::write(&file_path, generate_frontmatter(&title)).wrap_err("Failed to write file")?;

    tracing::info!(path = %file_path.display(), "Created new post");
    println!("Created: {}", file_path.display());

    Ok(file_path)
}

/// Title derived from the last identifier segment.
fn default_title(id: &PostId) -> String {
    id.segments()
        .last()
        .unwrap_or("Untitled")
        .replace(['-', '_'], " ")
}

fn generate_frontmatter(title: &str) -> String {
    let date = Local::now().format("%Y-%m-%d");
    let title = title.replace('"', "\\\"");

    format!(
        r#"---
title: "{title}"
date: {date}
---

Write your post here.
"#
    )
}
