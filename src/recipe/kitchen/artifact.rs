// src/recipe/kitchen/artifact.rs

//! Artifact packaging and metadata
//!
//! An artifact is a gzip-compressed tarball of the install prefix plus an
//! `info/` directory:
//!
//! | Path | Content |
//! |------|---------|
//! | `info/index.json` | name, version, build number, run requirements, fingerprint |
//! | `info/about.json` | the recipe's `about` section |
//! | `info/recipe.json` | the full recipe record |
//! | `info/files` | installed paths, one per line |
//! | `info/licenses/*` | license file from the source tree, when declared |

use crate::error::{Error, Result};
use crate::hash::Sha256Hash;
use crate::recipe::format::{AboutSection, Recipe};
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::archive::unpack_tar;

/// Directory inside the artifact that holds metadata
pub const INFO_DIR: &str = "info";

/// Index record: what a package index needs to know about an artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub name: String,
    pub version: String,
    pub build_number: u32,
    /// Run requirements, verbatim
    pub depends: Vec<String>,
    /// Fingerprint of the recipe record
    pub recipe_sha256: Sha256Hash,
    pub source_url: String,
    pub source_sha256: Sha256Hash,
    pub timestamp: DateTime<Utc>,
}

impl IndexRecord {
    /// Build the index record for a recipe
    pub fn from_recipe(recipe: &Recipe, fingerprint: &Sha256Hash) -> Self {
        Self {
            name: recipe.package.name.clone(),
            version: recipe.package.version.clone(),
            build_number: recipe.build.number,
            depends: recipe.requirements.run.iter().map(|r| r.to_string()).collect(),
            recipe_sha256: fingerprint.clone(),
            source_url: recipe.source_url(),
            source_sha256: recipe.source.sha256.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// Sidecar written next to a published artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Artifact file name
    pub filename: String,
    /// Digest of the artifact file itself
    pub sha256: Sha256Hash,
    /// Artifact size in bytes
    pub size: u64,
    pub index: IndexRecord,
    pub about: AboutSection,
}

/// Summary of a packaged artifact
#[derive(Debug)]
pub struct PackagedArtifact {
    pub path: PathBuf,
    pub index: IndexRecord,
    /// Installed paths relative to the prefix
    pub files: Vec<String>,
    /// License file included under `info/licenses/`, if any
    pub license: Option<String>,
}

/// Package an install prefix into an artifact tarball
///
/// `source_dir` is searched for `about.license_file`; a missing license file
/// is not an error, the caller decides how to report it.
pub fn package_prefix(
    recipe: &Recipe,
    fingerprint: &Sha256Hash,
    prefix: &Path,
    source_dir: &Path,
    dest: &Path,
) -> Result<PackagedArtifact> {
    if prefix.join(INFO_DIR).exists() {
        return Err(Error::BuildFailed(format!(
            "Install prefix must not contain a top-level {}/ directory",
            INFO_DIR
        )));
    }

    let index = IndexRecord::from_recipe(recipe, fingerprint);

    let file = File::create(dest)
        .map_err(|e| Error::IoError(format!("Failed to create {}: {}", dest.display(), e)))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder.follow_symlinks(false);

    let mut files = Vec::new();
    for entry in WalkDir::new(prefix).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::IoError(format!("Failed to walk prefix: {}", e)))?;
        let rel = entry
            .path()
            .strip_prefix(prefix)
            .map_err(|e| Error::IoError(e.to_string()))?;

        if entry.file_type().is_dir() {
            builder.append_dir(rel, entry.path())?;
        } else {
            builder.append_path_with_name(entry.path(), rel)?;
            files.push(rel.to_string_lossy().into_owned());
        }
    }

    let license = match &recipe.about.license_file {
        Some(name) => {
            let path = source_dir.join(name);
            if path.is_file() {
                let base = Path::new(name)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| name.clone());
                builder.append_path_with_name(&path, format!("{}/licenses/{}", INFO_DIR, base))?;
                Some(base)
            } else {
                None
            }
        }
        None => None,
    };

    append_json(&mut builder, "index.json", &index)?;
    append_json(&mut builder, "about.json", &recipe.about)?;
    append_json(&mut builder, "recipe.json", recipe)?;

    let mut listing = files.join("\n");
    listing.push('\n');
    append_bytes(&mut builder, "files", listing.as_bytes())?;

    builder.into_inner()?.finish()?;

    Ok(PackagedArtifact {
        path: dest.to_path_buf(),
        index,
        files,
        license,
    })
}

fn append_json<W: std::io::Write, T: Serialize>(
    builder: &mut tar::Builder<W>,
    name: &str,
    value: &T,
) -> Result<()> {
    let data = serde_json::to_vec_pretty(value)
        .map_err(|e| Error::IoError(format!("Failed to serialize {}: {}", name, e)))?;
    append_bytes(builder, name, &data)
}

fn append_bytes<W: std::io::Write>(
    builder: &mut tar::Builder<W>,
    name: &str,
    data: &[u8],
) -> Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_cksum();
    builder.append_data(&mut header, format!("{}/{}", INFO_DIR, name), data)?;
    Ok(())
}

/// Extract an artifact into `dest`
pub fn extract_artifact(artifact: &Path, dest: &Path) -> Result<()> {
    let file = File::open(artifact)
        .map_err(|e| Error::NotFound(format!("Artifact {}: {}", artifact.display(), e)))?;
    unpack_tar(GzDecoder::new(file), dest)
        .map_err(|e| Error::IoError(format!("Failed to extract {}: {}", artifact.display(), e)))
}

/// Read `info/index.json` out of an artifact without extracting it
pub fn read_index(artifact: &Path) -> Result<IndexRecord> {
    let file = File::open(artifact)
        .map_err(|e| Error::NotFound(format!("Artifact {}: {}", artifact.display(), e)))?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let wanted = Path::new(INFO_DIR).join("index.json");

    for entry in archive.entries()? {
        let mut entry = entry?;
        let is_index = &*entry.path()? == wanted.as_path();
        if is_index {
            let mut content = String::new();
            entry.read_to_string(&mut content)?;
            return serde_json::from_str(&content)
                .map_err(|e| Error::ParseError(format!("Invalid index.json: {}", e)));
        }
    }

    Err(Error::NotFound(format!(
        "{} has no {}",
        artifact.display(),
        wanted.display()
    )))
}
