// src/commands/fetch.rs

//! Fetch command - download and verify a recipe's source

use anyhow::{Context, Result};
use cookbook::recipe::{parse_recipe_file, Kitchen, KitchenConfig};
use std::path::{Path, PathBuf};

/// Fetch and verify the source for a recipe without building
pub fn cmd_fetch(recipe_path: &str, source_cache: Option<&str>) -> Result<()> {
    let recipe_path = Path::new(recipe_path);
    let recipe = parse_recipe_file(recipe_path)
        .with_context(|| format!("Failed to parse recipe: {}", recipe_path.display()))?;

    let mut config = KitchenConfig::default();
    if let Some(cache) = source_cache {
        config.source_cache = PathBuf::from(cache);
    }
    let kitchen = Kitchen::new(config);

    println!("Fetching source for {}...", recipe.artifact_stem());
    let path = kitchen
        .fetch(&recipe)
        .with_context(|| format!("Failed to fetch source for {}", recipe.package.name))?;

    println!("\n[COMPLETE] Fetched: {}", path.display());
    println!("  {}", recipe.source.sha256.to_prefixed_string());

    Ok(())
}
