// src/recipe/mod.rs

//! Recipe system for building third-party libraries from source
//!
//! A recipe declares one version of one library:
//! - Package identity (name and version) and a build number
//! - The source archive URL and its SHA-256 digest
//! - Build, host, and run requirements
//! - A build script, a test script, and descriptive `about` metadata
//!
//! # Culinary Terminology
//!
//! - **Recipe**: The build record (like a recipe card)
//! - **Cook**: Take a recipe through the whole pipeline
//! - **Kitchen**: The sandboxed build environment
//! - **Prep**: Fetch and verify the source
//! - **Simmer**: Run the build script
//! - **Plate**: Package the install prefix as an artifact
//! - **Taste**: Test the packaged artifact
//! - **Serve**: Publish the artifact and its metadata
//!
//! # Example Recipe
//!
//! ```toml
//! [package]
//! name = "mpi4py"
//! version = "3.0.1"
//!
//! [source]
//! url = "https://bitbucket.org/mpi4py/mpi4py/downloads/mpi4py-%(version)s.tar.gz"
//! sha256 = "6549a5b81931303baf6600fa2e3bc04d8bd1d5c82f3c21379d0d64a9abcca851"
//!
//! [build]
//! number = 2
//! script = "python setup.py install --prefix=$PREFIX"
//!
//! [requirements]
//! build = ["gcc", "mpich"]
//! host = ["python 3.7", "cython"]
//! run = ["python 3.7", "mpich"]
//!
//! [test]
//! files = ["test_mpi.py"]
//! script = "python test_mpi.py"
//!
//! [about]
//! home = "https://bitbucket.org/mpi4py/mpi4py"
//! license = "BSD-2-Clause"
//! license_file = "LICENSE.rst"
//! summary = "Python bindings for MPI"
//! ```

mod format;
mod kitchen;
pub mod parser;
mod requirement;

pub use format::{
    AboutSection, BuildSection, PackageSection, Recipe, RequirementsSection, SourceSection,
    TestSection,
};
pub use kitchen::{
    download_file, extract_archive, extract_artifact, read_index, ArchiveKind, ArtifactMetadata,
    CookResult, IndexRecord, Kitchen, KitchenConfig, NoopResolver, PathResolver, Phase,
    RequirementResolver, ResolutionResult, INFO_DIR,
};
pub use parser::{
    bump_build_number, parse_recipe, parse_recipe_file, parse_recipe_yaml, validate_recipe,
};
pub use requirement::{is_valid_package_name, PackageRef};
