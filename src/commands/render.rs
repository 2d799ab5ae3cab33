// src/commands/render.rs

//! Render command - print the resolved recipe record

use anyhow::{Context, Result};
use cookbook::recipe::parse_recipe_file;
use std::path::Path;

pub fn cmd_render(recipe_path: &str, json: bool) -> Result<()> {
    let recipe_path = Path::new(recipe_path);
    let recipe = parse_recipe_file(recipe_path)
        .with_context(|| format!("Failed to parse recipe: {}", recipe_path.display()))?;
    let fingerprint = recipe.fingerprint()?;

    if json {
        let rendered = serde_json::json!({
            "recipe": recipe,
            "source_url": recipe.source_url(),
            "artifact": recipe.artifact_filename(),
            "fingerprint": fingerprint,
        });
        println!("{}", serde_json::to_string_pretty(&rendered)?);
        return Ok(());
    }

    println!("Package:     {} {}", recipe.package.name, recipe.package.version);
    println!("Build:       {}", recipe.build.number);
    println!("Source:      {}", recipe.source_url());
    println!("Checksum:    {}", recipe.source.sha256.to_prefixed_string());
    println!("Artifact:    {}", recipe.artifact_filename());
    println!("Fingerprint: {}", fingerprint.to_prefixed_string());

    let sections = [
        ("build", &recipe.requirements.build),
        ("host", &recipe.requirements.host),
        ("run", &recipe.requirements.run),
        ("test", &recipe.test.requires),
    ];
    for (section, refs) in sections {
        if refs.is_empty() {
            continue;
        }
        println!("Requires ({}):", section);
        for r in refs {
            println!("  - {}", r);
        }
    }

    if let Some(summary) = &recipe.about.summary {
        println!("Summary:     {}", summary);
    }
    if let Some(license) = &recipe.about.license {
        println!("License:     {}", license);
    }

    Ok(())
}
