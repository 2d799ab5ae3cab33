// src/lib.rs

//! Cookbook
//!
//! Recipe-driven builds of third-party source libraries. A recipe names a
//! source archive and its SHA-256 digest, the requirements needed to build
//! and run it, and the scripts that build and test it. The kitchen takes a
//! recipe through validate, fetch, build, test, and publish, and produces a
//! versioned artifact with a metadata sidecar.
//!
//! # Architecture
//!
//! - Recipes are plain records: the same record always fingerprints the same
//! - Sources are verified against their digest before anything is extracted
//! - Every phase is fail-fast: nothing is published after a failure
//! - Build and test scripts run with a cleared environment in a private
//!   build directory

mod error;
pub mod hash;
pub mod recipe;

pub use error::{Error, Result};
pub use hash::Sha256Hash;
pub use recipe::{Kitchen, KitchenConfig, PackageRef, Recipe};
