// src/recipe/kitchen/mod.rs

//! Kitchen: the sandboxed pipeline that cooks recipes into artifacts
//!
//! The Kitchen takes a parsed recipe through five phases, each terminal on
//! failure:
//! - **Validate**: semantic checks, fingerprint of the recipe record
//! - **Fetch**: download the source and verify its SHA-256 digest
//! - **Build**: resolve requirements, unpack, run the build script, package
//! - **Test**: run the test script against the packaged artifact
//! - **Publish**: move the artifact and its metadata into the output directory
//!
//! Sources are cached by digest, so a recipe whose source is already cached
//! cooks without network access.

mod archive;
mod artifact;
mod config;
mod cook;
mod resolver;
mod script;

pub use archive::{download_file, extract_archive, ArchiveKind};
pub use artifact::{extract_artifact, read_index, ArtifactMetadata, IndexRecord, INFO_DIR};
pub use config::{CookResult, KitchenConfig, Phase};
use cook::Cook;
pub use resolver::{NoopResolver, PathResolver, RequirementResolver, ResolutionResult};

use crate::error::Result;
use crate::hash::{verify_file, Sha256Hash};
use crate::recipe::format::Recipe;
use crate::recipe::PackageRef;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The Kitchen: where recipes are cooked
pub struct Kitchen {
    pub(crate) config: KitchenConfig,
    /// Optional resolver for build, host, and test requirements
    resolver: Option<Arc<dyn RequirementResolver>>,
}

impl Kitchen {
    /// Create a new Kitchen with the given configuration
    pub fn new(config: KitchenConfig) -> Self {
        Self {
            config,
            resolver: None,
        }
    }

    /// Create a new Kitchen with a requirement resolver
    pub fn with_resolver(config: KitchenConfig, resolver: Arc<dyn RequirementResolver>) -> Self {
        Self {
            config,
            resolver: Some(resolver),
        }
    }

    /// Create a Kitchen with default configuration
    pub fn with_defaults() -> Self {
        Self::new(KitchenConfig::default())
    }

    /// Set the requirement resolver
    pub fn set_resolver(&mut self, resolver: Arc<dyn RequirementResolver>) {
        self.resolver = Some(resolver);
    }

    /// The active configuration
    pub fn config(&self) -> &KitchenConfig {
        &self.config
    }

    /// Make requirements available in `env_prefix`
    ///
    /// Without a resolver every requirement is assumed present; the caller
    /// is expected to have provisioned the build host.
    pub fn resolve_requirements(
        &self,
        reqs: &[&PackageRef],
        env_prefix: &Path,
    ) -> Result<ResolutionResult> {
        if reqs.is_empty() {
            debug!("No requirements to resolve");
            return Ok(ResolutionResult::default());
        }

        let all: Vec<PackageRef> = reqs.iter().map(|r| (*r).clone()).collect();

        let resolver = match &self.resolver {
            Some(r) => r,
            None => {
                debug!("No requirement resolver configured, assuming all are available");
                return Ok(ResolutionResult {
                    already_present: all,
                    ..Default::default()
                });
            }
        };

        let missing = resolver.check_missing(reqs)?;
        if missing.is_empty() {
            info!("All requirements are available");
            return Ok(ResolutionResult {
                already_present: all,
                ..Default::default()
            });
        }

        let missing_names: HashSet<&str> = missing.iter().map(|r| r.name.as_str()).collect();
        let already_present: Vec<PackageRef> = all
            .iter()
            .filter(|r| !missing_names.contains(r.name.as_str()))
            .cloned()
            .collect();

        info!(
            "Installing missing requirements: {}",
            missing
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        let installed = resolver.install(&missing, env_prefix)?;

        let installed_names: HashSet<&str> = installed.iter().map(|r| r.name.as_str()).collect();
        let unresolved: Vec<PackageRef> = missing
            .iter()
            .filter(|r| !installed_names.contains(r.name.as_str()))
            .cloned()
            .collect();

        if !unresolved.is_empty() {
            warn!(
                "Could not resolve requirements: {}",
                unresolved
                    .iter()
                    .map(|r| r.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        Ok(ResolutionResult {
            already_present,
            newly_installed: installed,
            unresolved,
        })
    }

    /// Remove requirements that were installed for a build
    fn cleanup_requirements(&self, result: &ResolutionResult) -> Result<()> {
        if result.newly_installed.is_empty() {
            return Ok(());
        }

        let Some(resolver) = &self.resolver else {
            return Ok(());
        };

        info!(
            "Cleaning up {} installed requirement(s)",
            result.newly_installed.len()
        );
        resolver.cleanup(&result.newly_installed)
    }

    /// Cook a recipe and publish the artifact into `output_dir`
    ///
    /// ## Phases
    /// 1. **Validate**: reject malformed records before any network access
    /// 2. **Fetch** (prep): download or reuse the cached source, verify digest
    /// 3. **Build**: resolve requirements, unpack, simmer (build script),
    ///    plate (package the install prefix)
    /// 4. **Test** (taste): extract the artifact into a fresh prefix and run
    ///    the test script against it
    /// 5. **Publish** (serve): copy the artifact and its metadata sidecar into
    ///    `output_dir`, refusing to overwrite an existing release
    ///
    /// Requirements installed by the resolver are cleaned up whether or not
    /// the pipeline succeeds. Nothing is published unless every earlier phase
    /// passed.
    pub fn cook(&self, recipe: &Recipe, output_dir: &Path) -> Result<CookResult> {
        info!(
            "Cooking {} version {} (build {})",
            recipe.package.name, recipe.package.version, recipe.build.number
        );

        let mut cook = Cook::new(self, recipe)?;

        let outcome = (|| {
            cook.run_phase(Phase::Validate, |c| c.validate())?;
            cook.run_phase(Phase::Fetch, |c| c.prep())?;
            cook.run_phase(Phase::Build, |c| {
                c.resolve_build()?;
                c.unpack()?;
                c.simmer()?;
                c.plate()
            })?;
            cook.run_phase(Phase::Test, |c| c.taste())?;
            cook.run_phase(Phase::Publish, |c| c.serve(output_dir))
        })();

        if let Some(resolution) = &cook.resolution
            && let Err(e) = self.cleanup_requirements(resolution)
        {
            warn!("Failed to clean up requirements: {}", e);
        }

        let (artifact_path, metadata_path) = outcome?;

        let build_dir = if self.config.keep_builddir {
            info!("Build directory kept at {}", cook.build_dir.path().display());
            Some(cook.build_dir.path().to_path_buf())
        } else {
            None
        };

        Ok(CookResult {
            artifact_path,
            metadata_path,
            fingerprint: cook.fingerprint()?,
            log: cook.log,
            warnings: cook.warnings,
            requirements: cook.resolution,
            phases: cook.completed,
            build_dir,
        })
    }

    /// Fetch the source for a recipe without building
    ///
    /// Validates the recipe first, then downloads and verifies the source
    /// into the cache. Useful for warming a cache before offline builds.
    pub fn fetch(&self, recipe: &Recipe) -> Result<PathBuf> {
        for warning in crate::recipe::validate_recipe(recipe)? {
            debug!("Recipe warning: {}", warning);
        }

        let url = recipe.source_url();
        info!("Fetching: {}", url);
        self.fetch_source(&url, &recipe.source.sha256)
    }

    /// Check whether the source for a recipe is already cached
    pub fn sources_cached(&self, recipe: &Recipe) -> bool {
        let cached = self.cache_path(&recipe.source.sha256);
        cached.exists() && verify_file(&cached, &recipe.source.sha256).is_ok()
    }

    fn cache_path(&self, checksum: &Sha256Hash) -> PathBuf {
        self.config.source_cache.join(checksum.cache_key())
    }

    /// Fetch a source file (with caching)
    ///
    /// The cache is keyed by digest. A cached file that no longer matches is
    /// discarded and downloaded again; a download that does not match is
    /// deleted and reported as a checksum mismatch.
    pub(crate) fn fetch_source(&self, url: &str, checksum: &Sha256Hash) -> Result<PathBuf> {
        fs::create_dir_all(&self.config.source_cache)?;

        let cached_path = self.cache_path(checksum);

        if cached_path.exists() {
            debug!("Using cached source: {}", cached_path.display());
            if verify_file(&cached_path, checksum).is_ok() {
                return Ok(cached_path);
            }
            warn!("Cached file checksum mismatch, re-downloading");
            fs::remove_file(&cached_path)?;
        }

        info!("Downloading: {}", url);
        let temp_path = self
            .config
            .source_cache
            .join(format!("{}.tmp", checksum.cache_key()));

        if let Err(e) = archive::download_file(url, &temp_path, self.config.download_timeout) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        if let Err(e) = verify_file(&temp_path, checksum) {
            fs::remove_file(&temp_path)?;
            return Err(e);
        }

        fs::rename(&temp_path, &cached_path)?;
        Ok(cached_path)
    }
}

impl Default for Kitchen {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::resolver::tests::MockResolver;
    use super::*;
    use crate::error::Error;
    use crate::hash::hash_bytes;
    use crate::recipe::parse_recipe;
    use tempfile::TempDir;
    use url::Url;

    fn kitchen_in(dir: &Path) -> Kitchen {
        Kitchen::new(KitchenConfig {
            source_cache: dir.join("cache"),
            build_root: Some(dir.join("builds")),
            ..Default::default()
        })
    }

    fn recipe_with_requirements(build: &[&str]) -> Recipe {
        let reqs = build
            .iter()
            .map(|r| format!("\"{}\"", r))
            .collect::<Vec<_>>()
            .join(", ");
        parse_recipe(&format!(
            r#"
[package]
name = "test"
version = "1.0"

[source]
url = "https://example.com/test.tar.gz"
sha256 = "{}"

[build]
script = "true"

[requirements]
build = [{}]
"#,
            "0".repeat(64),
            reqs
        ))
        .unwrap()
    }

    #[test]
    fn test_resolve_requirements_empty() {
        let kitchen = Kitchen::with_defaults();
        let result = kitchen
            .resolve_requirements(&[], Path::new("/tmp"))
            .unwrap();
        assert!(result.already_present.is_empty());
        assert!(result.newly_installed.is_empty());
        assert!(result.unresolved.is_empty());
    }

    #[test]
    fn test_resolve_requirements_no_resolver() {
        let kitchen = Kitchen::with_defaults();
        let recipe = recipe_with_requirements(&["gcc", "make"]);
        let result = kitchen
            .resolve_requirements(&recipe.build_requirements(), Path::new("/tmp"))
            .unwrap();
        // Without a resolver, all requirements are assumed available
        assert_eq!(result.already_present.len(), 2);
        assert!(result.newly_installed.is_empty());
        assert!(result.unresolved.is_empty());
    }

    #[test]
    fn test_resolve_requirements_with_resolver() {
        let resolver = Arc::new(MockResolver::new(&["gcc"], &["cython"]));
        let kitchen = Kitchen::with_resolver(KitchenConfig::default(), resolver.clone());
        let recipe = recipe_with_requirements(&["gcc", "cython", "mpich >=3"]);

        let result = kitchen
            .resolve_requirements(&recipe.build_requirements(), Path::new("/tmp"))
            .unwrap();

        assert_eq!(result.already_present, vec![PackageRef::new("gcc")]);
        assert_eq!(result.newly_installed, vec![PackageRef::new("cython")]);
        assert_eq!(
            result.unresolved,
            vec![PackageRef::with_constraint("mpich", ">=3")]
        );

        kitchen.cleanup_requirements(&result).unwrap();
        assert_eq!(
            *resolver.cleanup_calls.lock().unwrap(),
            vec![vec!["cython".to_string()]]
        );
    }

    #[test]
    fn test_fetch_source_caches_by_digest() {
        let dir = TempDir::new().unwrap();
        let kitchen = kitchen_in(dir.path());

        let payload = b"source bytes";
        let src = dir.path().join("src.tar.gz");
        fs::write(&src, payload).unwrap();
        let url = Url::from_file_path(&src).unwrap();
        let digest = hash_bytes(payload);

        let cached = kitchen.fetch_source(url.as_str(), &digest).unwrap();
        assert_eq!(cached, dir.path().join("cache").join(digest.cache_key()));
        assert_eq!(fs::read(&cached).unwrap(), payload);

        // Second fetch is served from the cache even if the origin is gone
        fs::remove_file(&src).unwrap();
        let again = kitchen.fetch_source(url.as_str(), &digest).unwrap();
        assert_eq!(again, cached);
    }

    #[test]
    fn test_fetch_source_checksum_mismatch() {
        let dir = TempDir::new().unwrap();
        let kitchen = kitchen_in(dir.path());

        let src = dir.path().join("src.tar.gz");
        fs::write(&src, b"tampered").unwrap();
        let url = Url::from_file_path(&src).unwrap();
        let digest = hash_bytes(b"original");

        let result = kitchen.fetch_source(url.as_str(), &digest);
        assert!(matches!(result, Err(Error::ChecksumMismatch { .. })));

        // Nothing is left behind in the cache
        let leftovers: Vec<_> = fs::read_dir(dir.path().join("cache")).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_fetch_source_replaces_corrupt_cache_entry() {
        let dir = TempDir::new().unwrap();
        let kitchen = kitchen_in(dir.path());

        let payload = b"good source";
        let src = dir.path().join("src.tar.gz");
        fs::write(&src, payload).unwrap();
        let url = Url::from_file_path(&src).unwrap();
        let digest = hash_bytes(payload);

        fs::create_dir_all(dir.path().join("cache")).unwrap();
        fs::write(dir.path().join("cache").join(digest.cache_key()), b"bit rot").unwrap();

        let cached = kitchen.fetch_source(url.as_str(), &digest).unwrap();
        assert_eq!(fs::read(cached).unwrap(), payload);
    }

    const INSTALL_HELLO: &str = r#"mkdir -p "$PREFIX/bin"
cp hello.sh "$PREFIX/bin/hello"
chmod +x "$PREFIX/bin/hello"
"#;

    fn mock_kitchen(dir: &Path, resolver: Arc<MockResolver>) -> Kitchen {
        Kitchen::with_resolver(
            KitchenConfig {
                source_cache: dir.join("cache"),
                build_root: Some(dir.join("builds")),
                ..Default::default()
            },
            resolver,
        )
    }

    /// A recipe over a local, non-archive source file `hello.sh`
    fn local_recipe(dir: &Path, script: &str, build: &[&str], test: &[&str]) -> Recipe {
        let payload = b"#!/bin/sh\necho hello\n";
        let src = dir.join("hello.sh");
        fs::write(&src, payload).unwrap();
        let quote = |reqs: &[&str]| {
            reqs.iter()
                .map(|r| format!("{:?}", r))
                .collect::<Vec<_>>()
                .join(", ")
        };

        parse_recipe(&format!(
            r#"
[package]
name = "hello"
version = "1.0"

[source]
url = "{}"
sha256 = "{}"

[build]
script = '''
{}'''

[requirements]
build = [{}]

[test]
requires = [{}]
script = 'test -x "$PREFIX/bin/hello"'
"#,
            Url::from_file_path(&src).unwrap(),
            hash_bytes(payload),
            script,
            quote(build),
            quote(test)
        ))
        .unwrap()
    }

    #[test]
    fn test_cook_cleans_up_requirements_after_failure() {
        let dir = TempDir::new().unwrap();
        let resolver = Arc::new(MockResolver::new(&[], &["cython"]));
        let kitchen = mock_kitchen(dir.path(), resolver.clone());
        let recipe = local_recipe(dir.path(), "exit 1\n", &["cython"], &[]);

        let err = kitchen.cook(&recipe, &dir.path().join("out")).unwrap_err();

        assert!(matches!(err, Error::BuildFailed(_)), "{err:?}");
        assert_eq!(
            *resolver.cleanup_calls.lock().unwrap(),
            vec![vec!["cython".to_string()]]
        );
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_cook_resolves_test_requirements() {
        let dir = TempDir::new().unwrap();
        let resolver = Arc::new(MockResolver::new(&["gcc"], &["pytest"]));
        let kitchen = mock_kitchen(dir.path(), resolver.clone());
        let recipe = local_recipe(dir.path(), INSTALL_HELLO, &["gcc"], &["pytest"]);

        let result = kitchen.cook(&recipe, &dir.path().join("out")).unwrap();

        let requirements = result.requirements.unwrap();
        assert_eq!(requirements.already_present, vec![PackageRef::new("gcc")]);
        assert_eq!(requirements.newly_installed, vec![PackageRef::new("pytest")]);
        assert_eq!(
            *resolver.cleanup_calls.lock().unwrap(),
            vec![vec!["pytest".to_string()]]
        );
    }

    #[test]
    fn test_cook_unresolved_test_requirement_blocks_publish() {
        let dir = TempDir::new().unwrap();
        let resolver = Arc::new(MockResolver::new(&[], &["cython"]));
        let kitchen = mock_kitchen(dir.path(), resolver.clone());
        let recipe = local_recipe(dir.path(), INSTALL_HELLO, &["cython"], &["pytest"]);

        let err = kitchen.cook(&recipe, &dir.path().join("out")).unwrap_err();

        match err {
            Error::ResolutionError(msg) => {
                assert!(msg.contains("test requirements: pytest"), "{msg}")
            }
            other => panic!("expected resolution error, got {other:?}"),
        }
        assert!(!dir.path().join("out").exists());
        // Build requirements installed before the failure are still removed
        assert_eq!(
            *resolver.cleanup_calls.lock().unwrap(),
            vec![vec!["cython".to_string()]]
        );
    }

    #[test]
    fn test_sources_cached() {
        let dir = TempDir::new().unwrap();
        let kitchen = kitchen_in(dir.path());
        let recipe = recipe_with_requirements(&[]);
        assert!(!kitchen.sources_cached(&recipe));
    }
}
