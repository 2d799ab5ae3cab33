// src/commands/mod.rs
//! Command handlers for the cookbook CLI

mod bump;
mod cook;
mod fetch;
mod lint;
mod render;

pub use bump::cmd_bump;
pub use cook::{cmd_cook, CookOptions};
pub use fetch::cmd_fetch;
pub use lint::cmd_lint;
pub use render::cmd_render;

use crate::cli::Cli;
use anyhow::Result;
use clap::CommandFactory;
use clap_complete::Shell;

/// Write a completion script for `shell` to stdout
pub fn cmd_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "cookbook", &mut std::io::stdout());
    Ok(())
}
