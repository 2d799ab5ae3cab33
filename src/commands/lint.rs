// src/commands/lint.rs

//! Lint command - parse and validate a recipe

use anyhow::{Context, Result};
use cookbook::recipe::{parse_recipe_file, validate_recipe};
use std::path::Path;

/// Validate a recipe and print its warnings
pub fn cmd_lint(recipe_path: &str) -> Result<()> {
    let recipe_path = Path::new(recipe_path);
    let recipe = parse_recipe_file(recipe_path)
        .with_context(|| format!("Failed to parse recipe: {}", recipe_path.display()))?;

    let warnings = validate_recipe(&recipe).with_context(|| "Recipe validation failed")?;

    for warning in &warnings {
        println!("Warning: {}", warning);
    }

    if warnings.is_empty() {
        println!("[OK] {}: no issues found", recipe.artifact_stem());
    } else {
        println!("[OK] {}: {} warning(s)", recipe.artifact_stem(), warnings.len());
    }

    Ok(())
}
