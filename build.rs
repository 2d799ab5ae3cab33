// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: recipe file
fn recipe_arg() -> Arg {
    Arg::new("recipe")
        .required(true)
        .value_name("RECIPE")
        .help("Path to the recipe file (TOML or YAML)")
}

/// Common argument: source cache directory
fn source_cache_arg() -> Arg {
    Arg::new("source_cache")
        .long("source-cache")
        .value_name("DIR")
        .help("Source cache directory (default: user cache dir)")
}

fn build_cli() -> Command {
    Command::new("cookbook")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Build, test, and publish third-party libraries from recipes")
        .subcommand_required(false)
        .subcommand(
            Command::new("cook")
                .about("Cook a recipe: validate, fetch, build, test, publish")
                .arg(recipe_arg())
                .arg(
                    Arg::new("output_dir")
                        .short('o')
                        .long("output-dir")
                        .default_value(".")
                        .help("Directory the artifact and its metadata are published to"),
                )
                .arg(source_cache_arg())
                .arg(
                    Arg::new("jobs")
                        .short('j')
                        .long("jobs")
                        .help("Number of parallel build jobs"),
                )
                .arg(
                    Arg::new("timeout")
                        .long("timeout")
                        .help("Timeout in seconds for the build script and the test script"),
                )
                .arg(
                    Arg::new("keep_builddir")
                        .long("keep-builddir")
                        .action(ArgAction::SetTrue)
                        .help("Keep the build directory after completion"),
                )
                .arg(
                    Arg::new("check_requirements")
                        .long("check-requirements")
                        .action(ArgAction::SetTrue)
                        .help("Require every build and test requirement to be an executable on PATH"),
                ),
        )
        .subcommand(
            Command::new("fetch")
                .about("Fetch and verify the source without building")
                .arg(recipe_arg())
                .arg(source_cache_arg()),
        )
        .subcommand(
            Command::new("lint")
                .about("Parse and validate a recipe, printing warnings")
                .arg(recipe_arg()),
        )
        .subcommand(
            Command::new("render")
                .about("Print the resolved recipe record")
                .arg(recipe_arg())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the full record as JSON"),
                ),
        )
        .subcommand(
            Command::new("bump")
                .about("Increment build.number in a TOML recipe")
                .arg(recipe_arg()),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completions")
                .arg(Arg::new("shell").required(true).help("Shell to generate completions for")),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("cookbook.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
