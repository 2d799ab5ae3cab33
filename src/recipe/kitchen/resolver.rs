// src/recipe/kitchen/resolver.rs

//! Requirement resolution for recipe builds

use crate::error::Result;
use crate::recipe::PackageRef;
use std::path::Path;

/// Trait for making build, host, and test requirements available
///
/// This allows the Kitchen to remain decoupled from any package installation
/// logic while still being able to ensure requirements are present before a
/// script runs.
pub trait RequirementResolver: Send + Sync {
    /// Check which requirements are missing
    ///
    /// Returns the references that are not currently available.
    fn check_missing(&self, reqs: &[&PackageRef]) -> Result<Vec<PackageRef>>;

    /// Install the specified requirements into the build environment prefix
    ///
    /// Should return the requirements that were actually installed (for
    /// later cleanup).
    fn install(&self, reqs: &[PackageRef], env_prefix: &Path) -> Result<Vec<PackageRef>>;

    /// Remove requirements that were installed for this build
    ///
    /// Called after the pipeline finishes, whether or not it succeeded.
    fn cleanup(&self, installed: &[PackageRef]) -> Result<()>;
}

/// A no-op resolver that assumes all requirements are satisfied
///
/// Use this when the build host is already provisioned (e.g., a
/// pre-configured build container).
pub struct NoopResolver;

impl RequirementResolver for NoopResolver {
    fn check_missing(&self, _reqs: &[&PackageRef]) -> Result<Vec<PackageRef>> {
        Ok(Vec::new())
    }

    fn install(&self, _reqs: &[PackageRef], _env_prefix: &Path) -> Result<Vec<PackageRef>> {
        Ok(Vec::new())
    }

    fn cleanup(&self, _installed: &[PackageRef]) -> Result<()> {
        Ok(())
    }
}

/// A resolver that requires every requirement to be an executable on `PATH`
///
/// Nothing is installed; anything missing stays unresolved and fails the
/// build before the script runs. Suited to tool-only recipes (compilers,
/// `make`, `cmake`).
pub struct PathResolver;

impl RequirementResolver for PathResolver {
    fn check_missing(&self, reqs: &[&PackageRef]) -> Result<Vec<PackageRef>> {
        Ok(reqs
            .iter()
            .filter(|r| which::which(&r.name).is_err())
            .map(|r| (*r).clone())
            .collect())
    }

    fn install(&self, _reqs: &[PackageRef], _env_prefix: &Path) -> Result<Vec<PackageRef>> {
        Ok(Vec::new())
    }

    fn cleanup(&self, _installed: &[PackageRef]) -> Result<()> {
        Ok(())
    }
}

/// Result of requirement resolution
#[derive(Debug, Default, Clone)]
pub struct ResolutionResult {
    /// Requirements that were already available
    pub already_present: Vec<PackageRef>,
    /// Requirements that were installed for this build
    pub newly_installed: Vec<PackageRef>,
    /// Requirements that could not be resolved
    pub unresolved: Vec<PackageRef>,
}

impl ResolutionResult {
    /// Fold another resolution (e.g., test requirements) into this one
    pub fn merge(&mut self, other: ResolutionResult) {
        self.already_present.extend(other.already_present);
        self.newly_installed.extend(other.newly_installed);
        self.unresolved.extend(other.unresolved);
    }
}
