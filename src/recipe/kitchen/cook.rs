// src/recipe/kitchen/cook.rs

//! Cook: the actual pipeline execution for a single recipe

use crate::error::{Error, Result};
use crate::hash::{hash_file, Sha256Hash};
use crate::recipe::format::Recipe;
use crate::recipe::parser::validate_recipe;
use crate::recipe::PackageRef;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

use super::archive::extract_archive;
use super::artifact::{extract_artifact, package_prefix, read_index, ArtifactMetadata};
use super::config::Phase;
use super::resolver::ResolutionResult;
use super::script::{run_script, tail, ScriptOutput};
use super::Kitchen;

/// Lines of stderr quoted in script failure errors
const STDERR_TAIL_LINES: usize = 20;

/// A single cook operation
///
/// Owns the sandbox directory for one run of the pipeline:
///
/// ```text
/// <build_dir>/
///   download/     verified copy of the source archive
///   source/       unpacked source tree
///   env/          build environment prefix (requirements)
///   prefix/       install prefix ($PREFIX during build)
///   home/ tmp/    $HOME and $TMPDIR for scripts
///   logs/         script stdout/stderr
///   staged/       packaged artifact awaiting test
///   test/         test prefix and working directory
/// ```
pub struct Cook<'a> {
    pub(super) kitchen: &'a Kitchen,
    pub(super) recipe: &'a Recipe,
    /// Temporary build directory
    pub(super) build_dir: TempDir,
    /// Source directory within build_dir
    pub(super) source_dir: PathBuf,
    /// Install prefix
    pub(super) prefix_dir: PathBuf,
    /// Build environment prefix (where requirements are installed)
    pub(super) env_dir: PathBuf,
    /// Fingerprint of the recipe record
    pub(super) fingerprint: Option<Sha256Hash>,
    /// Packaged artifact awaiting test and publish
    pub(super) staged: Option<PathBuf>,
    /// Requirement resolution across build and test
    pub(super) resolution: Option<ResolutionResult>,
    /// Phases completed so far
    pub(super) completed: Vec<Phase>,
    /// Build log accumulator
    pub(super) log: String,
    /// Warnings
    pub(super) warnings: Vec<String>,
}

impl<'a> Cook<'a> {
    pub(super) fn new(kitchen: &'a Kitchen, recipe: &'a Recipe) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("cookbook-").keep(kitchen.config.keep_builddir);

        let build_dir = match &kitchen.config.build_root {
            Some(root) => {
                fs::create_dir_all(root)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .map_err(|e| Error::IoError(format!("Failed to create build directory: {}", e)))?;

        let source_dir = build_dir.path().join("source");
        let prefix_dir = build_dir.path().join("prefix");
        let env_dir = build_dir.path().join("env");

        for dir in [&source_dir, &prefix_dir, &env_dir] {
            fs::create_dir_all(dir)?;
        }
        for name in ["download", "home", "tmp", "logs", "staged"] {
            fs::create_dir_all(build_dir.path().join(name))?;
        }

        Ok(Self {
            kitchen,
            recipe,
            build_dir,
            source_dir,
            prefix_dir,
            env_dir,
            fingerprint: None,
            staged: None,
            resolution: None,
            completed: Vec::new(),
            log: String::new(),
            warnings: Vec::new(),
        })
    }

    /// Run one phase, recording it as completed on success
    pub(super) fn run_phase<T>(
        &mut self,
        phase: Phase,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        info!("{}: {}", phase, self.recipe.artifact_stem());
        self.log_line(&format!("=== {} ===", phase));

        match f(self) {
            Ok(value) => {
                self.completed.push(phase);
                Ok(value)
            }
            Err(e) => {
                warn!("{} phase failed: {}", phase, e);
                self.log_line(&format!("{} phase failed: {}", phase, e));
                Err(e)
            }
        }
    }

    /// Phase 0: Validate - check the record before touching the network
    pub(super) fn validate(&mut self) -> Result<()> {
        let warnings = validate_recipe(self.recipe)?;
        for warning in &warnings {
            debug!("Recipe warning: {}", warning);
        }
        self.warnings.extend(warnings);
        self.fingerprint = Some(self.recipe.fingerprint()?);
        Ok(())
    }

    /// Phase 1: Prep - fetch and verify the source
    pub(super) fn prep(&mut self) -> Result<()> {
        let url = self.recipe.source_url();
        let cached = self.kitchen.fetch_source(&url, &self.recipe.source.sha256)?;

        let local = self.archive_path();
        fs::copy(&cached, &local)?;

        self.log_line(&format!(
            "Fetched source: {} ({})",
            url,
            self.recipe.source.sha256.to_prefixed_string()
        ));
        Ok(())
    }

    /// Resolve build requirements into the environment prefix
    pub(super) fn resolve_build(&mut self) -> Result<()> {
        let reqs = self.recipe.build_requirements();
        self.resolve(&reqs, "build")
    }

    fn resolve(&mut self, reqs: &[&PackageRef], what: &str) -> Result<()> {
        let result = self.kitchen.resolve_requirements(reqs, &self.env_dir)?;

        let unresolved = result.unresolved.clone();
        if !result.newly_installed.is_empty() {
            self.log_line(&format!(
                "Installed {} requirements: {}",
                what,
                join_refs(&result.newly_installed)
            ));
        }
        self.resolution
            .get_or_insert_with(ResolutionResult::default)
            .merge(result);

        if !unresolved.is_empty() {
            return Err(Error::ResolutionError(format!(
                "Unresolved {} requirements: {}",
                what,
                join_refs(&unresolved)
            )));
        }

        Ok(())
    }

    /// Phase 2a: Unpack the verified source
    pub(super) fn unpack(&mut self) -> Result<()> {
        let archive = self.archive_path();
        extract_archive(&archive, &self.source_dir)?;
        self.log_line(&format!("Extracted source to {}", self.source_dir.display()));

        // Find the actual source directory (often archives have a top-level dir)
        let entries: Vec<_> = fs::read_dir(&self.source_dir)?
            .filter_map(|e| e.ok())
            .collect();

        if entries.len() == 1 && entries[0].file_type().map(|t| t.is_dir()).unwrap_or(false) {
            self.source_dir = entries[0].path();
            debug!("Source directory: {}", self.source_dir.display());
        }

        // Override with explicit extract_dir if specified
        if let Some(extract_dir) = &self.recipe.source.extract_dir {
            let dir = self.build_dir.path().join("source").join(extract_dir);
            if !dir.is_dir() {
                return Err(Error::NotFound(format!(
                    "extract_dir '{}' not found in source archive",
                    extract_dir
                )));
            }
            self.source_dir = dir;
        }

        Ok(())
    }

    /// Phase 2b: Simmer - run the build script
    pub(super) fn simmer(&mut self) -> Result<()> {
        let prefix = self.prefix_dir.clone();
        let script = self
            .recipe
            .substitute(&self.recipe.build.script, &prefix.to_string_lossy());
        let env = self.script_env(&prefix);
        let workdir = self.source_dir.clone();

        let output = self.run_step("build", &script, &workdir, &env)?;
        if output.timed_out() {
            return Err(Error::BuildFailed(format!(
                "build script timed out after {} seconds",
                self.kitchen.config.timeout.as_secs()
            )));
        }
        if !output.success() {
            return Err(Error::BuildFailed(format!(
                "build script failed with exit code {:?}\nstderr: {}",
                output.code(),
                tail(&output.stderr, STDERR_TAIL_LINES)
            )));
        }

        if fs::read_dir(&prefix)?.next().is_none() {
            return Err(Error::BuildFailed(
                "No files installed to $PREFIX - build script may not install anything"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Phase 2c: Plate - package the install prefix
    pub(super) fn plate(&mut self) -> Result<()> {
        let fingerprint = self.fingerprint()?;
        let staged = self
            .build_dir
            .path()
            .join("staged")
            .join(self.recipe.artifact_filename());

        let packaged = package_prefix(
            self.recipe,
            &fingerprint,
            &self.prefix_dir,
            &self.source_dir,
            &staged,
        )?;

        if let Some(license_file) = &self.recipe.about.license_file
            && packaged.license.is_none()
        {
            self.warnings.push(format!(
                "License file {} not found in source; artifact has no license attached",
                license_file
            ));
        }

        self.log_line(&format!(
            "Packaged {} ({} files)",
            staged.display(),
            packaged.files.len()
        ));
        self.staged = Some(packaged.path);
        Ok(())
    }

    /// Phase 3: Taste - run the test script against the packaged artifact
    pub(super) fn taste(&mut self) -> Result<()> {
        let script = match &self.recipe.test.script {
            Some(s) if !s.trim().is_empty() => s.clone(),
            _ => {
                self.warnings
                    .push("No test script; artifact published untested".to_string());
                return Ok(());
            }
        };

        let test_reqs: Vec<&PackageRef> = self.recipe.test.requires.iter().collect();
        if !test_reqs.is_empty() {
            self.resolve(&test_reqs, "test")?;
        }

        let staged = self
            .staged
            .clone()
            .ok_or_else(|| Error::TestFailed("No packaged artifact to test".to_string()))?;

        let test_root = self.build_dir.path().join("test");
        let test_prefix = test_root.join("prefix");
        let workdir = test_root.join("work");
        fs::create_dir_all(&test_prefix)?;
        fs::create_dir_all(&workdir)?;

        extract_artifact(&staged, &test_prefix)
            .map_err(|e| Error::TestFailed(format!("Artifact is unusable: {}", e)))?;

        self.stage_test_files(&workdir)?;

        let script = self.recipe.substitute(&script, &test_prefix.to_string_lossy());
        let env = self.script_env(&test_prefix);
        let output = self.run_step("test", &script, &workdir, &env)?;

        if output.timed_out() {
            return Err(Error::TestFailed(format!(
                "test script timed out after {} seconds",
                self.kitchen.config.timeout.as_secs()
            )));
        }
        if !output.success() {
            return Err(Error::TestFailed(format!(
                "test script failed with exit code {:?}\nstderr: {}",
                output.code(),
                tail(&output.stderr, STDERR_TAIL_LINES)
            )));
        }

        Ok(())
    }

    fn stage_test_files(&self, workdir: &Path) -> Result<()> {
        let recipe_dir = self.recipe.recipe_dir();

        for file in &self.recipe.test.files {
            let src = recipe_dir.join(file);
            let dest = workdir.join(file);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&src, &dest).map_err(|e| {
                Error::NotFound(format!("Test file {}: {}", src.display(), e))
            })?;
            debug!("Staged test file {}", file);
        }

        Ok(())
    }

    /// Phase 4: Serve - publish the tested artifact and its metadata
    pub(super) fn serve(&mut self, output_dir: &Path) -> Result<(PathBuf, PathBuf)> {
        let staged = self
            .staged
            .clone()
            .ok_or_else(|| Error::NotFound("No packaged artifact to publish".to_string()))?;

        fs::create_dir_all(output_dir)?;
        let artifact_path = output_dir.join(self.recipe.artifact_filename());
        let metadata_path = output_dir.join(format!("{}.json", self.recipe.artifact_stem()));

        if artifact_path.exists() || metadata_path.exists() {
            return Err(Error::AlreadyPublished(format!(
                "{} already exists in {}",
                self.recipe.artifact_stem(),
                output_dir.display()
            )));
        }

        let metadata = ArtifactMetadata {
            filename: self.recipe.artifact_filename(),
            sha256: hash_file(&staged)?,
            size: fs::metadata(&staged)?.len(),
            index: read_index(&staged)?,
            about: self.recipe.about.clone(),
        };
        let json = serde_json::to_string_pretty(&metadata)
            .map_err(|e| Error::IoError(format!("Failed to serialize metadata: {}", e)))?;

        // Stage both files inside the output directory, then rename into place
        let artifact_part = output_dir.join(format!("{}.part", self.recipe.artifact_filename()));
        let metadata_part = output_dir.join(format!("{}.json.part", self.recipe.artifact_stem()));
        fs::copy(&staged, &artifact_part)?;
        fs::write(&metadata_part, json)?;
        fs::rename(&artifact_part, &artifact_path)?;
        fs::rename(&metadata_part, &metadata_path)?;

        self.log_line(&format!("Published {}", artifact_path.display()));
        info!("Published: {}", artifact_path.display());

        Ok((artifact_path, metadata_path))
    }

    pub(super) fn fingerprint(&self) -> Result<Sha256Hash> {
        match &self.fingerprint {
            Some(fp) => Ok(fp.clone()),
            None => self.recipe.fingerprint(),
        }
    }

    fn archive_path(&self) -> PathBuf {
        self.build_dir
            .path()
            .join("download")
            .join(self.recipe.archive_filename())
    }

    /// Environment for build and test scripts
    ///
    /// Everything else from the calling environment is dropped; only `PATH`
    /// is carried over, behind the build environment's own `bin/`. `DESTDIR`
    /// is never set; `$PREFIX` is the staging location.
    fn script_env(&self, prefix: &Path) -> Vec<(String, String)> {
        let recipe = self.recipe;
        let build = &recipe.build;
        let jobs = build.jobs.unwrap_or(self.kitchen.config.jobs);
        let prefix_str = prefix.to_string_lossy().into_owned();

        let host_path = std::env::var("PATH").unwrap_or_else(|_| "/usr/bin:/bin".to_string());
        let recipe_dir = fs::canonicalize(recipe.recipe_dir())
            .unwrap_or_else(|_| recipe.recipe_dir().to_path_buf());

        let mut env = vec![
            (
                "PATH".to_string(),
                format!("{}:{}", self.env_dir.join("bin").display(), host_path),
            ),
            (
                "HOME".to_string(),
                self.build_dir.path().join("home").to_string_lossy().into_owned(),
            ),
            (
                "TMPDIR".to_string(),
                self.build_dir.path().join("tmp").to_string_lossy().into_owned(),
            ),
            ("PREFIX".to_string(), prefix_str.clone()),
            (
                "BUILD_PREFIX".to_string(),
                self.env_dir.to_string_lossy().into_owned(),
            ),
            (
                "SRC_DIR".to_string(),
                self.source_dir.to_string_lossy().into_owned(),
            ),
            (
                "RECIPE_DIR".to_string(),
                recipe_dir.to_string_lossy().into_owned(),
            ),
            ("PKG_NAME".to_string(), recipe.package.name.clone()),
            ("PKG_VERSION".to_string(), recipe.package.version.clone()),
            ("PKG_BUILDNUM".to_string(), build.number.to_string()),
            ("CPU_COUNT".to_string(), jobs.to_string()),
            ("MAKEFLAGS".to_string(), format!("-j{}", jobs)),
        ];

        for (key, value) in &build.environment {
            env.push((key.clone(), recipe.substitute(value, &prefix_str)));
        }

        env
    }

    fn run_step(
        &mut self,
        label: &str,
        script: &str,
        workdir: &Path,
        env: &[(String, String)],
    ) -> Result<ScriptOutput> {
        info!("Running {} script", label);
        debug!("Command: {}", script);

        let log_dir = self.build_dir.path().join("logs");
        let output = run_script(
            label,
            script,
            workdir,
            env,
            self.kitchen.config.timeout,
            &log_dir,
        )?;

        self.log_script_output(label, &output);
        Ok(output)
    }

    fn log_line(&mut self, line: &str) {
        self.log.push_str(line);
        self.log.push('\n');
    }

    /// Log script output (stdout/stderr) with a step header
    fn log_script_output(&mut self, label: &str, output: &ScriptOutput) {
        self.log_line(&format!("--- {} (exit {:?}) ---", label, output.code()));
        if !output.stdout.is_empty() {
            self.log.push_str(&output.stdout);
            self.log.push('\n');
        }
        if !output.stderr.is_empty() {
            self.log.push_str(&output.stderr);
            self.log.push('\n');
        }
    }
}

fn join_refs(refs: &[PackageRef]) -> String {
    refs.iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
