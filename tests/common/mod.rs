// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.
//!
//! Every pipeline test builds a tiny "hello" library from a local `file://`
//! tarball with `sh` scripts, so nothing here needs the network.

#![allow(dead_code)]

use cookbook::hash::{hash_file, Sha256Hash};
use cookbook::recipe::{parse_recipe_file, Kitchen, KitchenConfig, Recipe};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use url::Url;

pub const NAME: &str = "hello";
pub const VERSION: &str = "1.0";

/// Build script used by most tests: installs `bin/hello` and drops a marker
/// in the recipe directory so tests can tell whether it ever ran.
pub const BUILD_SCRIPT: &str = r#"touch "$RECIPE_DIR/build.marker"
mkdir -p "$PREFIX/bin"
cp hello.sh "$PREFIX/bin/hello"
chmod +x "$PREFIX/bin/hello"
"#;

/// Test script used by most tests: runs the packaged tool from the test prefix
pub const TEST_SCRIPT: &str = r#""$PREFIX/bin/hello" | grep -q "hello from cookbook"
test -f expected.txt
"#;

/// A scratch workspace: recipe dir, source dir, cache, build root, output
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["recipe", "upstream", "cache", "builds", "out"] {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        fs::write(dir.path().join("recipe/expected.txt"), "hello from cookbook\n").unwrap();
        Self { dir }
    }

    pub fn recipe_dir(&self) -> PathBuf {
        self.dir.path().join("recipe")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    pub fn marker(&self) -> PathBuf {
        self.recipe_dir().join("build.marker")
    }

    /// Path of the upstream tarball (what the recipe url points at)
    pub fn source_path(&self) -> PathBuf {
        self.dir
            .path()
            .join("upstream")
            .join(format!("{}-{}.tar.gz", NAME, VERSION))
    }

    /// `file://` url of the upstream directory, with `%(version)s` left in
    pub fn source_url_template(&self) -> String {
        let base = Url::from_directory_path(self.dir.path().join("upstream")).unwrap();
        format!("{}{}-%(version)s.tar.gz", base, NAME)
    }

    /// Write an upstream file under `name` and return its `file://` url
    /// and digest
    pub fn write_upstream(&self, name: &str, entries: &[(&str, &[u8])]) -> (String, Sha256Hash) {
        let path = self.dir.path().join("upstream").join(name);
        write_tar_gz(&path, entries);
        let url = Url::from_file_path(&path).unwrap().to_string();
        (url, hash_file(&path).unwrap())
    }

    /// Write the upstream tarball and return its digest
    pub fn write_source(&self) -> Sha256Hash {
        let top = format!("{}-{}", NAME, VERSION);
        write_tar_gz(
            &self.source_path(),
            &[
                (
                    format!("{}/hello.sh", top).as_str(),
                    b"#!/bin/sh\necho \"hello from cookbook\"\n".as_slice(),
                ),
                (format!("{}/LICENSE", top).as_str(), b"MIT License\n".as_slice()),
            ],
        );
        hash_file(&self.source_path()).unwrap()
    }

    /// Kitchen confined to this fixture's cache and build root
    pub fn kitchen(&self) -> Kitchen {
        Kitchen::new(self.config())
    }

    pub fn config(&self) -> KitchenConfig {
        KitchenConfig {
            source_cache: self.cache_dir(),
            build_root: Some(self.dir.path().join("builds")),
            timeout: Duration::from_secs(30),
            jobs: 2,
            ..Default::default()
        }
    }

    /// Write `recipe.toml` into the recipe dir and load it back
    pub fn write_recipe(&self, content: &str) -> Recipe {
        let path = self.recipe_path();
        fs::write(&path, content).unwrap();
        parse_recipe_file(&path).unwrap()
    }

    pub fn recipe_path(&self) -> PathBuf {
        self.recipe_dir().join("recipe.toml")
    }
}

/// Options for [`recipe_toml`]
pub struct RecipeParams<'a> {
    pub url: String,
    pub sha256: String,
    pub build_number: u32,
    pub build_script: &'a str,
    pub test_script: Option<&'a str>,
    pub build_requires: &'a [&'a str],
    /// Extra lines for the `[source]` table
    pub source_extra: &'a str,
}

impl<'a> RecipeParams<'a> {
    pub fn new(fixture: &Fixture, sha256: &Sha256Hash) -> Self {
        Self {
            url: fixture.source_url_template(),
            sha256: sha256.to_string(),
            build_number: 0,
            build_script: BUILD_SCRIPT,
            test_script: Some(TEST_SCRIPT),
            build_requires: &[],
            source_extra: "",
        }
    }
}

/// Render a complete TOML recipe for the hello library
pub fn recipe_toml(params: &RecipeParams<'_>) -> String {
    let build_requires = params
        .build_requires
        .iter()
        .map(|r| format!("{:?}", r))
        .collect::<Vec<_>>()
        .join(", ");

    let mut out = format!(
        r#"[package]
name = "{name}"
version = "{version}"

[source]
url = "{url}"
sha256 = "{sha}"
{source_extra}

[build]
number = {number}
script = '''
{build}'''

[build.environment]
GREETING = "hi from %(name)s"

[requirements]
build = [{build_requires}]
run = ["libc >=2.17", "zlib"]

[about]
home = "https://example.com/hello"
license = "MIT"
license_file = "LICENSE"
summary = "Prints a greeting"
"#,
        name = NAME,
        version = VERSION,
        url = params.url,
        sha = params.sha256,
        number = params.build_number,
        build = params.build_script,
        build_requires = build_requires,
        source_extra = params.source_extra,
    );

    if let Some(test) = params.test_script {
        out.push_str(&format!(
            "\n[test]\nfiles = [\"expected.txt\"]\nscript = '''\n{}'''\n",
            test
        ));
    }

    out
}

/// Write a gzip tarball with the given (path, content) entries
pub fn write_tar_gz(path: &Path, entries: &[(&str, &[u8])]) {
    let file = File::create(path).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, *data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

/// Names of the entries in a directory
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
