// src/recipe/kitchen/config.rs

//! Configuration types for the Kitchen build system

use crate::hash::Sha256Hash;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use super::resolver::ResolutionResult;

/// Pipeline phases, in the order they run
///
/// Each phase is terminal on failure: a failed phase stops the pipeline and
/// nothing after it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// Parse-time and semantic checks of the recipe record
    Validate,
    /// Download the source and verify its digest
    Fetch,
    /// Resolve requirements, unpack, run the build script, package
    Build,
    /// Run the test script against the packaged artifact
    Test,
    /// Move the artifact and its metadata into the output directory
    Publish,
}

impl Phase {
    /// All phases in pipeline order
    pub const ALL: [Phase; 5] = [
        Phase::Validate,
        Phase::Fetch,
        Phase::Build,
        Phase::Test,
        Phase::Publish,
    ];

    /// Get the phase name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Validate => "validate",
            Phase::Fetch => "fetch",
            Phase::Build => "build",
            Phase::Test => "test",
            Phase::Publish => "publish",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for the Kitchen
#[derive(Debug, Clone)]
pub struct KitchenConfig {
    /// Directory for downloaded sources, keyed by digest
    pub source_cache: PathBuf,
    /// Parent directory for build sandboxes (system temp dir when unset)
    pub build_root: Option<PathBuf>,
    /// Timeout for the build script and the test script, each
    pub timeout: Duration,
    /// Timeout for a single source download
    pub download_timeout: Duration,
    /// Number of parallel jobs exported to build scripts
    pub jobs: u32,
    /// Keep build directory after completion (for debugging)
    pub keep_builddir: bool,
}

impl Default for KitchenConfig {
    fn default() -> Self {
        let jobs = std::thread::available_parallelism()
            .map(|p| p.get() as u32)
            .unwrap_or(4);

        let source_cache = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("cookbook")
            .join("sources");

        Self {
            source_cache,
            build_root: None,
            timeout: Duration::from_secs(3600), // 1 hour
            download_timeout: Duration::from_secs(300),
            jobs,
            keep_builddir: false,
        }
    }
}

/// Result of cooking a recipe
#[derive(Debug)]
pub struct CookResult {
    /// Path to the published artifact
    pub artifact_path: PathBuf,
    /// Path to the metadata sidecar next to the artifact
    pub metadata_path: PathBuf,
    /// Fingerprint of the recipe record that produced the artifact
    pub fingerprint: Sha256Hash,
    /// Build log
    pub log: String,
    /// Warnings generated during validation and build
    pub warnings: Vec<String>,
    /// Requirement resolution result (if a resolver was configured)
    pub requirements: Option<ResolutionResult>,
    /// Phases that completed, in order
    pub phases: Vec<Phase>,
    /// Build directory, if it was kept
    pub build_dir: Option<PathBuf>,
}
