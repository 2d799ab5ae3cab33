// src/recipe/format.rs

//! Recipe file format definitions
//!
//! A recipe is a single record describing how to fetch, build, test, and
//! publish one version of a third-party library. Recipes are usually TOML;
//! YAML files deserialize into the same structures.

use crate::error::{Error, Result};
use crate::hash::{hash_bytes, Sha256Hash};
use crate::recipe::requirement::{merge_refs, PackageRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A complete recipe for building a package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Package identity
    pub package: PackageSection,

    /// Source archive location and digest
    pub source: SourceSection,

    /// Build revision and instructions
    pub build: BuildSection,

    /// Build, host, and run requirements
    #[serde(default)]
    pub requirements: RequirementsSection,

    /// Test files and invocation
    #[serde(default)]
    pub test: TestSection,

    /// Descriptive metadata attached to the published artifact
    #[serde(default)]
    pub about: AboutSection,

    /// Variables for substitution (optional)
    #[serde(default)]
    pub variables: BTreeMap<String, String>,

    /// Directory the recipe was loaded from
    #[serde(skip)]
    pub recipe_dir: Option<PathBuf>,
}

impl Recipe {
    /// Substitute variables in a string
    ///
    /// Replaces `%(name)s` patterns with their values from:
    /// 1. Built-in variables (name, version, build_number, prefix)
    /// 2. Custom variables from the [variables] section
    pub fn substitute(&self, template: &str, prefix: &str) -> String {
        let mut result = template.to_string();

        result = result.replace("%(name)s", &self.package.name);
        result = result.replace("%(version)s", &self.package.version);
        result = result.replace("%(build_number)s", &self.build.number.to_string());
        result = result.replace("%(prefix)s", prefix);

        for (key, value) in &self.variables {
            result = result.replace(&format!("%({})s", key), value);
        }

        result
    }

    /// Get the source URL with variables substituted
    pub fn source_url(&self) -> String {
        self.substitute(&self.source.url, "")
    }

    /// Get the source file name
    ///
    /// Uses `source.filename` when set, otherwise the last path segment of
    /// the substituted URL.
    pub fn archive_filename(&self) -> String {
        if let Some(name) = &self.source.filename {
            return name.clone();
        }

        let url = self.source_url();
        let path = url.split(['?', '#']).next().unwrap_or("");
        path.split('/')
            .rfind(|s| !s.is_empty())
            .filter(|s| !s.contains(':'))
            .unwrap_or("source.tar.gz")
            .to_string()
    }

    /// `{name}-{version}-{build_number}`, the identity of one published build
    pub fn artifact_stem(&self) -> String {
        format!(
            "{}-{}-{}",
            self.package.name, self.package.version, self.build.number
        )
    }

    /// File name of the packaged artifact
    pub fn artifact_filename(&self) -> String {
        format!("{}.tar.gz", self.artifact_stem())
    }

    /// Requirements that must be present while building (build ∪ host)
    pub fn build_requirements(&self) -> Vec<&PackageRef> {
        merge_refs(&[&self.requirements.build, &self.requirements.host])
    }

    /// Directory holding the recipe file (test files are relative to it)
    pub fn recipe_dir(&self) -> &Path {
        self.recipe_dir.as_deref().unwrap_or(Path::new("."))
    }

    /// The successor record for a rebuild of the same version
    pub fn with_build_number(&self, number: u32) -> Recipe {
        let mut next = self.clone();
        next.build.number = number;
        next
    }

    /// SHA-256 over the canonical JSON form of the record
    ///
    /// Two recipes with identical fields have identical fingerprints
    /// regardless of file format or formatting.
    pub fn fingerprint(&self) -> Result<Sha256Hash> {
        let canonical = serde_json::to_vec(self)
            .map_err(|e| Error::ParseError(format!("Failed to serialize recipe: {}", e)))?;
        Ok(hash_bytes(&canonical))
    }
}

/// Package identity section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageSection {
    /// Package name
    pub name: String,

    /// Package version, in the wrapped library's own scheme
    pub version: String,
}

/// Source archive section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSection {
    /// Source archive URL
    ///
    /// Supports `%(version)s` substitution.
    /// Example: `https://example.org/mpi4py-%(version)s.tar.gz`
    pub url: String,

    /// SHA-256 digest of the archive
    pub sha256: Sha256Hash,

    /// Local file name for the download (defaults to the URL's last segment)
    #[serde(default)]
    pub filename: Option<String>,

    /// Directory inside the archive to use as the source root
    #[serde(default)]
    pub extract_dir: Option<String>,
}

/// Build section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildSection {
    /// Build revision for a fixed (name, version)
    #[serde(default)]
    pub number: u32,

    /// Build command, run with `sh -c` from the source directory
    ///
    /// Must install into `$PREFIX` (also available as `%(prefix)s`).
    pub script: String,

    /// Environment variables to set during build
    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    /// Number of parallel jobs (default: kitchen setting)
    #[serde(default)]
    pub jobs: Option<u32>,
}

/// Requirements section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementsSection {
    /// Tools needed only to compile
    #[serde(default)]
    pub build: Vec<PackageRef>,

    /// Libraries compiled against
    #[serde(default)]
    pub host: Vec<PackageRef>,

    /// Requirements of the installed package
    #[serde(default)]
    pub run: Vec<PackageRef>,
}

/// Test section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestSection {
    /// Files staged into the test working directory, relative to the recipe
    #[serde(default)]
    pub files: Vec<String>,

    /// Test command; exit code 0 means pass
    #[serde(default)]
    pub script: Option<String>,

    /// Extra requirements needed only while testing
    #[serde(default)]
    pub requires: Vec<PackageRef>,
}

/// Descriptive metadata section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AboutSection {
    /// Homepage URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,

    /// License identifier (SPDX)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    /// License file inside the source archive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_file: Option<String>,

    /// Short description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Full description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Documentation URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_url: Option<String>,

    /// Development (repository) URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_url: Option<String>,

    /// Recipe maintainers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<String>,
}
