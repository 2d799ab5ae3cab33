// src/commands/bump.rs

//! Bump command - start the next build of the same version

use anyhow::{bail, Context, Result};
use cookbook::recipe::bump_build_number;
use std::fs;
use std::path::Path;

/// Increment `build.number` in a TOML recipe, in place
pub fn cmd_bump(recipe_path: &str) -> Result<()> {
    let recipe_path = Path::new(recipe_path);

    if matches!(
        recipe_path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    ) {
        bail!("bump only edits TOML recipes: {}", recipe_path.display());
    }

    let content = fs::read_to_string(recipe_path)
        .with_context(|| format!("Failed to read recipe: {}", recipe_path.display()))?;
    let (edited, next) = bump_build_number(&content)
        .with_context(|| format!("Failed to bump {}", recipe_path.display()))?;

    fs::write(recipe_path, edited)
        .with_context(|| format!("Failed to write recipe: {}", recipe_path.display()))?;

    println!("[OK] {}: build.number = {}", recipe_path.display(), next);
    Ok(())
}
