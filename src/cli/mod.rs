// src/cli/mod.rs
//! CLI definitions for cookbook
//!
//! This module contains the command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.
//!
//! - `cook` - Validate, fetch, build, test, and publish a recipe
//! - `fetch` - Download and verify the source only
//! - `lint` - Parse and validate a recipe
//! - `render` - Print the resolved recipe record
//! - `bump` - Increment the build number of a TOML recipe
//! - `completions` - Generate shell completions

use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "cookbook")]
#[command(version)]
#[command(about = "Build, test, and publish third-party libraries from recipes", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cook a recipe: validate, fetch, build, test, publish
    Cook {
        /// Path to the recipe file (TOML or YAML)
        recipe: String,

        /// Directory the artifact and its metadata are published to
        #[arg(short, long, default_value = ".")]
        output_dir: String,

        /// Source cache directory (default: user cache dir)
        #[arg(long)]
        source_cache: Option<String>,

        /// Number of parallel build jobs
        #[arg(short, long)]
        jobs: Option<u32>,

        /// Timeout in seconds for the build script and the test script
        #[arg(long)]
        timeout: Option<u64>,

        /// Keep the build directory after completion
        #[arg(long)]
        keep_builddir: bool,

        /// Require every build and test requirement to be an executable on PATH
        #[arg(long)]
        check_requirements: bool,
    },

    /// Fetch and verify the source without building
    Fetch {
        /// Path to the recipe file
        recipe: String,

        /// Source cache directory (default: user cache dir)
        #[arg(long)]
        source_cache: Option<String>,
    },

    /// Parse and validate a recipe, printing warnings
    Lint {
        /// Path to the recipe file
        recipe: String,
    },

    /// Print the resolved recipe record
    Render {
        /// Path to the recipe file
        recipe: String,

        /// Print the full record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Increment build.number in a TOML recipe
    Bump {
        /// Path to the recipe file
        recipe: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_cook_flags() {
        let cli = Cli::parse_from([
            "cookbook",
            "cook",
            "recipe.toml",
            "--output-dir",
            "dist",
            "--jobs",
            "2",
            "--timeout",
            "60",
            "--check-requirements",
        ]);

        match cli.command {
            Some(Commands::Cook {
                recipe,
                output_dir,
                jobs,
                timeout,
                keep_builddir,
                check_requirements,
                ..
            }) => {
                assert_eq!(recipe, "recipe.toml");
                assert_eq!(output_dir, "dist");
                assert_eq!(jobs, Some(2));
                assert_eq!(timeout, Some(60));
                assert!(!keep_builddir);
                assert!(check_requirements);
            }
            _ => panic!("expected cook command"),
        }
    }
}
