// src/commands/cook.rs

//! Cook command - validate, fetch, build, test, and publish a recipe

use anyhow::{Context, Result};
use cookbook::recipe::{parse_recipe_file, Kitchen, KitchenConfig, PathResolver};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Options for `cookbook cook`, overriding the `KitchenConfig` defaults
pub struct CookOptions {
    pub output_dir: String,
    pub source_cache: Option<String>,
    pub jobs: Option<u32>,
    pub timeout: Option<u64>,
    pub keep_builddir: bool,
    pub check_requirements: bool,
}

impl CookOptions {
    fn kitchen_config(&self) -> KitchenConfig {
        let mut config = KitchenConfig {
            keep_builddir: self.keep_builddir,
            ..Default::default()
        };

        if let Some(cache) = &self.source_cache {
            config.source_cache = PathBuf::from(cache);
        }
        if let Some(j) = self.jobs {
            config.jobs = j;
        }
        if let Some(secs) = self.timeout {
            config.timeout = Duration::from_secs(secs);
        }

        config
    }
}

/// Cook a package from a recipe
pub fn cmd_cook(recipe_path: &str, opts: &CookOptions) -> Result<()> {
    let recipe_path = Path::new(recipe_path);
    let output_dir = Path::new(&opts.output_dir);

    println!("Reading recipe: {}", recipe_path.display());
    let recipe = parse_recipe_file(recipe_path)
        .with_context(|| format!("Failed to parse recipe: {}", recipe_path.display()))?;

    println!(
        "Recipe: {} version {} (build {})",
        recipe.package.name, recipe.package.version, recipe.build.number
    );

    let config = opts.kitchen_config();
    let jobs = config.jobs;
    let mut kitchen = Kitchen::new(config);
    if opts.check_requirements {
        kitchen.set_resolver(Arc::new(PathResolver));
    }

    println!("Cooking with {} parallel jobs...", jobs);
    if kitchen.sources_cached(&recipe) {
        println!("  - Source already cached (offline build possible)");
    }

    let result = kitchen
        .cook(&recipe, output_dir)
        .with_context(|| format!("Failed to cook {}", recipe.artifact_stem()))?;

    println!("\n[COMPLETE] Cooked: {}", result.artifact_path.display());
    println!("  Metadata: {}", result.metadata_path.display());
    println!("  Recipe fingerprint: {}", result.fingerprint.to_prefixed_string());
    if let Some(dir) = &result.build_dir {
        println!("  Build directory: {}", dir.display());
    }

    if !result.warnings.is_empty() {
        println!("\nBuild warnings:");
        for warning in &result.warnings {
            println!("  - {}", warning);
        }
    }

    info!(
        "Successfully cooked {} to {} ({})",
        recipe.package.name,
        result.artifact_path.display(),
        result
            .phases
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(" -> ")
    );

    Ok(())
}
