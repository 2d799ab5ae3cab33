// src/main.rs

use anyhow::Result;
use clap::{CommandFactory, Parser};

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Cook {
            recipe,
            output_dir,
            source_cache,
            jobs,
            timeout,
            keep_builddir,
            check_requirements,
        }) => commands::cmd_cook(
            &recipe,
            &commands::CookOptions {
                output_dir,
                source_cache,
                jobs,
                timeout,
                keep_builddir,
                check_requirements,
            },
        ),

        Some(Commands::Fetch {
            recipe,
            source_cache,
        }) => commands::cmd_fetch(&recipe, source_cache.as_deref()),

        Some(Commands::Lint { recipe }) => commands::cmd_lint(&recipe),

        Some(Commands::Render { recipe, json }) => commands::cmd_render(&recipe, json),

        Some(Commands::Bump { recipe }) => commands::cmd_bump(&recipe),

        Some(Commands::Completions { shell }) => commands::cmd_completions(shell),

        None => {
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}
