// src/recipe/parser.rs

//! Recipe file parsing and validation

use crate::error::{Error, Result};
use crate::recipe::format::Recipe;
use crate::recipe::requirement::{
    conflicting_constraints, duplicate_names, is_valid_package_name,
};
use std::path::{Component, Path};
use url::Url;

/// Parse a recipe from a TOML string
pub fn parse_recipe(content: &str) -> Result<Recipe> {
    toml::from_str(content).map_err(|e| Error::ParseError(format!("Invalid recipe: {}", e)))
}

/// Parse a recipe from a YAML string
pub fn parse_recipe_yaml(content: &str) -> Result<Recipe> {
    serde_yaml::from_str(content)
        .map_err(|e| Error::ParseError(format!("Invalid recipe: {}", e)))
}

/// Parse a recipe from a file
///
/// `.yaml` and `.yml` files are read as YAML, everything else as TOML.
/// The returned recipe remembers the directory it was loaded from.
pub fn parse_recipe_file(path: &Path) -> Result<Recipe> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::IoError(format!("Failed to read recipe file: {}", e)))?;

    let mut recipe = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => parse_recipe_yaml(&content)?,
        _ => parse_recipe(&content)?,
    };

    let dir = path.parent().unwrap_or(Path::new("."));
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    recipe.recipe_dir = Some(dir.to_path_buf());

    Ok(recipe)
}

/// Validate a recipe for completeness and correctness
///
/// Hard errors are returned as `Err`; soft problems come back as warnings.
/// Nothing here touches the network.
pub fn validate_recipe(recipe: &Recipe) -> Result<Vec<String>> {
    let mut warnings = Vec::new();

    let name = &recipe.package.name;
    if name.is_empty() {
        return Err(Error::InvalidRecipe("Recipe package name cannot be empty".to_string()));
    }
    if !is_valid_package_name(name) {
        return Err(Error::InvalidRecipe(format!(
            "Invalid package name '{}': use lowercase letters, digits, '-', '_' or '.'",
            name
        )));
    }

    let version = &recipe.package.version;
    if version.is_empty() {
        return Err(Error::InvalidRecipe("Recipe package version cannot be empty".to_string()));
    }
    if version.contains('-') || version.chars().any(char::is_whitespace) {
        return Err(Error::InvalidRecipe(format!(
            "Invalid version '{}': whitespace and '-' are not allowed",
            version
        )));
    }

    validate_source_url(recipe)?;
    validate_source_paths(recipe)?;

    if recipe.build.script.trim().is_empty() {
        return Err(Error::InvalidRecipe("Build script cannot be empty".to_string()));
    }

    for key in recipe.build.environment.keys() {
        if key.is_empty() || key.contains('=') {
            return Err(Error::InvalidRecipe(format!(
                "Invalid environment variable name '{}'",
                key
            )));
        }
    }

    validate_test_files(recipe)?;

    // Warn about missing metadata
    if recipe.about.summary.is_none() {
        warnings.push("Missing about.summary".to_string());
    }
    if recipe.about.license.is_none() {
        warnings.push("Missing about.license".to_string());
    }
    if recipe.about.license_file.is_none() {
        warnings.push("Missing about.license_file".to_string());
    }
    if recipe.about.home.is_none() {
        warnings.push("Missing about.home".to_string());
    }

    let sections = [
        ("build", &recipe.requirements.build),
        ("host", &recipe.requirements.host),
        ("run", &recipe.requirements.run),
        ("test", &recipe.test.requires),
    ];
    for (section, refs) in sections {
        for dup in duplicate_names(refs) {
            warnings.push(format!("Duplicate requirement '{}' in {} requirements", dup, section));
        }
    }
    for name in conflicting_constraints(&[&recipe.requirements.build, &recipe.requirements.host]) {
        warnings.push(format!(
            "Requirement '{}' has conflicting build and host constraints; the first one is used",
            name
        ));
    }

    match &recipe.test.script {
        Some(script) if script.trim().is_empty() => {
            warnings.push("Empty test script; the artifact will be published untested".to_string());
        }
        Some(_) => {}
        None => {
            warnings.push("No test script; the artifact will be published untested".to_string());
            if !recipe.test.files.is_empty() {
                warnings.push("Test files are listed but no test script uses them".to_string());
            }
        }
    }

    Ok(warnings)
}

fn validate_source_url(recipe: &Recipe) -> Result<()> {
    let url = recipe.source_url();

    if url.contains("%(") {
        return Err(Error::InvalidRecipe(format!(
            "Unresolved variable in source url: {}",
            url
        )));
    }

    let parsed = Url::parse(&url)
        .map_err(|e| Error::InvalidRecipe(format!("Invalid source url '{}': {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" | "file" => Ok(()),
        other => Err(Error::InvalidRecipe(format!(
            "Unsupported source url scheme '{}' (supported: http, https, file)",
            other
        ))),
    }
}

/// True if `path` could resolve outside the directory it is joined onto
fn escapes_dir(path: &Path) -> bool {
    path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
}

fn validate_source_paths(recipe: &Recipe) -> Result<()> {
    let filename = recipe.archive_filename();
    let path = Path::new(&filename);
    if filename.is_empty()
        || filename.contains(['/', '\\'])
        || escapes_dir(path)
        || matches!(filename.as_str(), "." | "..")
    {
        return Err(Error::InvalidRecipe(format!(
            "Source file name '{}' must be a plain file name",
            filename
        )));
    }

    if let Some(extract_dir) = &recipe.source.extract_dir
        && (extract_dir.is_empty() || escapes_dir(Path::new(extract_dir)))
    {
        return Err(Error::InvalidRecipe(format!(
            "extract_dir '{}' must be a relative path inside the source archive",
            extract_dir
        )));
    }

    Ok(())
}

fn validate_test_files(recipe: &Recipe) -> Result<()> {
    let dir = recipe.recipe_dir();

    for file in &recipe.test.files {
        let path = Path::new(file);
        if escapes_dir(path) {
            return Err(Error::InvalidRecipe(format!(
                "Test file '{}' must be a relative path inside the recipe directory",
                file
            )));
        }

        if !dir.join(path).is_file() {
            return Err(Error::InvalidRecipe(format!(
                "Test file '{}' not found in {}",
                file,
                dir.display()
            )));
        }
    }

    Ok(())
}

/// Increment `build.number` in a TOML recipe
///
/// Only the number changes; comments, ordering and formatting of the rest
/// of the document are preserved. Returns the edited document and the new
/// build number.
pub fn bump_build_number(content: &str) -> Result<(String, u32)> {
    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| Error::ParseError(format!("Invalid recipe: {}", e)))?;

    if !doc.get("build").is_some_and(|b| b.is_table_like()) {
        return Err(Error::InvalidRecipe("Recipe has no [build] table".to_string()));
    }

    let current = match doc["build"].get("number") {
        None => 0,
        Some(item) => item
            .as_integer()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| {
                Error::InvalidRecipe("build.number must be a non-negative integer".to_string())
            })?,
    };
    let next = current
        .checked_add(1)
        .ok_or_else(|| Error::InvalidRecipe("build.number overflow".to_string()))?;

    doc["build"]["number"] = toml_edit::value(i64::from(next));
    let edited = doc.to_string();

    // The successor must still be a valid recipe
    parse_recipe(&edited)?;

    Ok((edited, next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const VALID: &str = r#"
[package]
name = "test"
version = "1.0"

[source]
url = "https://example.com/test-%(version)s.tar.gz"
sha256 = "0000000000000000000000000000000000000000000000000000000000000000"

[build]
script = "make install PREFIX=$PREFIX"
"#;

    #[test]
    fn test_parse_valid_recipe() {
        let recipe = parse_recipe(VALID).unwrap();
        assert_eq!(recipe.package.name, "test");
    }

    #[test]
    fn test_parse_invalid_recipe() {
        let content = "this is not valid toml at all {}";
        assert!(matches!(parse_recipe(content), Err(Error::ParseError(_))));
    }

    #[test]
    fn test_parse_missing_build_script() {
        let content = VALID.replace("script = \"make install PREFIX=$PREFIX\"", "");
        assert!(parse_recipe(&content).is_err());
    }

    #[test]
    fn test_parse_yaml_recipe() {
        let yaml = r#"
package:
  name: mpi4py
  version: "3.0.1"
source:
  url: https://example.com/mpi4py-%(version)s.tar.gz
  sha256: "0000000000000000000000000000000000000000000000000000000000000000"
build:
  number: 1
  script: python setup.py install
requirements:
  host:
    - python
    - mpich 3.2.*
  run:
    - python
about:
  license: BSD-2-Clause
"#;
        let recipe = parse_recipe_yaml(yaml).unwrap();
        assert_eq!(recipe.package.version, "3.0.1");
        assert_eq!(recipe.build.number, 1);
        assert_eq!(recipe.requirements.host[1].to_string(), "mpich 3.2.*");
    }

    #[test]
    fn test_parse_recipe_file_sets_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("recipe.toml");
        fs::write(&path, VALID).unwrap();

        let recipe = parse_recipe_file(&path).unwrap();
        assert_eq!(recipe.recipe_dir(), dir.path());
    }

    #[test]
    fn test_parse_recipe_file_missing() {
        let result = parse_recipe_file(Path::new("/nonexistent/recipe.toml"));
        assert!(matches!(result, Err(Error::IoError(_))));
    }

    #[test]
    fn test_validate_empty_name() {
        let content = VALID.replace("name = \"test\"", "name = \"\"");
        let recipe = parse_recipe(&content).unwrap();
        assert!(matches!(validate_recipe(&recipe), Err(Error::InvalidRecipe(_))));
    }

    #[test]
    fn test_validate_bad_name() {
        let content = VALID.replace("name = \"test\"", "name = \"My Package\"");
        let recipe = parse_recipe(&content).unwrap();
        assert!(validate_recipe(&recipe).is_err());
    }

    #[test]
    fn test_validate_bad_version() {
        for bad in ["", "1.0-rc1", "1.0 beta"] {
            let content = VALID.replace("version = \"1.0\"", &format!("version = \"{}\"", bad));
            let recipe = parse_recipe(&content).unwrap();
            assert!(validate_recipe(&recipe).is_err(), "version {:?} accepted", bad);
        }
    }

    #[test]
    fn test_validate_bad_url() {
        let content = VALID.replace("https://example.com", "ftp://example.com");
        let recipe = parse_recipe(&content).unwrap();
        assert!(validate_recipe(&recipe).is_err());

        let content = VALID.replace("%(version)s", "%(missing)s");
        let recipe = parse_recipe(&content).unwrap();
        let err = validate_recipe(&recipe).unwrap_err();
        assert!(err.to_string().contains("Unresolved variable"));

        let content = VALID.replace("https://example.com/", "not a url ");
        let recipe = parse_recipe(&content).unwrap();
        assert!(validate_recipe(&recipe).is_err());
    }

    #[test]
    fn test_validate_blank_script() {
        let content = VALID.replace("make install PREFIX=$PREFIX", "   ");
        let recipe = parse_recipe(&content).unwrap();
        assert!(validate_recipe(&recipe).is_err());
    }

    #[test]
    fn test_validate_warnings() {
        let recipe = parse_recipe(VALID).unwrap();
        let warnings = validate_recipe(&recipe).unwrap();
        assert!(warnings.iter().any(|w| w.contains("summary")));
        assert!(warnings.iter().any(|w| w.contains("license")));
        assert!(warnings.iter().any(|w| w.contains("home")));
        assert!(warnings.iter().any(|w| w.contains("No test script")));
    }

    #[test]
    fn test_validate_duplicate_requirements() {
        let content = format!("{}\n[requirements]\nrun = [\"python\", \"python >=3\"]\n", VALID);
        let recipe = parse_recipe(&content).unwrap();
        let warnings = validate_recipe(&recipe).unwrap();
        assert!(warnings
            .iter()
            .any(|w| w.contains("Duplicate requirement 'python' in run")));
    }

    #[test]
    fn test_validate_test_files() {
        let dir = TempDir::new().unwrap();
        let content = format!(
            "{}\n[test]\nfiles = [\"run_test.sh\"]\nscript = \"sh run_test.sh\"\n",
            VALID
        );
        let path = dir.path().join("recipe.toml");
        fs::write(&path, &content).unwrap();

        // Missing test file is a hard error
        let recipe = parse_recipe_file(&path).unwrap();
        let err = validate_recipe(&recipe).unwrap_err();
        assert!(err.to_string().contains("run_test.sh"));

        // Present test file passes
        fs::write(dir.path().join("run_test.sh"), "exit 0\n").unwrap();
        let warnings = validate_recipe(&recipe).unwrap();
        assert!(!warnings.iter().any(|w| w.contains("test script")));
    }

    #[test]
    fn test_validate_test_file_escape() {
        let content = format!("{}\n[test]\nfiles = [\"../secret\"]\n", VALID);
        let recipe = parse_recipe(&content).unwrap();
        let err = validate_recipe(&recipe).unwrap_err();
        assert!(err.to_string().contains("relative path"));
    }

    #[test]
    fn test_validate_source_filename_escape() {
        for bad in ["../../escaped.tar.gz", "/tmp/escaped.tar.gz", "sub/dir.tar.gz", ".."] {
            let content = VALID.replace(
                "sha256 = ",
                &format!("filename = \"{}\"\nsha256 = ", bad),
            );
            let recipe = parse_recipe(&content).unwrap();
            let err = validate_recipe(&recipe).unwrap_err();
            assert!(err.to_string().contains("plain file name"), "{bad}: {err}");
        }

        let content = VALID.replace("sha256 = ", "filename = \"test.tar.gz\"\nsha256 = ");
        let recipe = parse_recipe(&content).unwrap();
        assert!(validate_recipe(&recipe).is_ok());
    }

    #[test]
    fn test_validate_extract_dir_escape() {
        for bad in ["../outside", "/abs/dir", "pkg/../../up", ""] {
            let content = VALID.replace(
                "sha256 = ",
                &format!("extract_dir = \"{}\"\nsha256 = ", bad),
            );
            let recipe = parse_recipe(&content).unwrap();
            let err = validate_recipe(&recipe).unwrap_err();
            assert!(err.to_string().contains("extract_dir"), "{bad}: {err}");
        }

        let content = VALID.replace("sha256 = ", "extract_dir = \"pkg/python\"\nsha256 = ");
        let recipe = parse_recipe(&content).unwrap();
        assert!(validate_recipe(&recipe).is_ok());
    }

    #[test]
    fn test_validate_conflicting_constraints() {
        let content = format!(
            "{}\n[requirements]\nbuild = [\"cmake >=3.20\"]\nhost = [\"cmake <3.25\"]\n",
            VALID
        );
        let recipe = parse_recipe(&content).unwrap();
        let warnings = validate_recipe(&recipe).unwrap();
        assert!(warnings
            .iter()
            .any(|w| w.contains("'cmake' has conflicting build and host constraints")));
    }

    #[test]
    fn test_bump_build_number_preserves_formatting() {
        let content = format!(
            "# pinned upstream release\n{}\n[requirements]\nrun = [\"zlib\"]  # runtime only\n",
            VALID.replace("[build]\n", "[build]\nnumber = 2\n")
        );

        let (edited, next) = bump_build_number(&content).unwrap();
        assert_eq!(next, 3);
        assert!(edited.contains("number = 3"));
        assert!(edited.contains("# pinned upstream release"));
        assert!(edited.contains("# runtime only"));

        let before = parse_recipe(&content).unwrap();
        let after = parse_recipe(&edited).unwrap();
        assert_eq!(after.build.number, 3);
        assert_eq!(after.requirements.run, before.requirements.run);
        assert_eq!(after, before.with_build_number(3));
    }

    #[test]
    fn test_bump_build_number_defaults_to_zero() {
        let (edited, next) = bump_build_number(VALID).unwrap();
        assert_eq!(next, 1);
        assert_eq!(parse_recipe(&edited).unwrap().build.number, 1);
    }

    #[test]
    fn test_bump_build_number_rejects_bad_number() {
        let content = VALID.replace("[build]\n", "[build]\nnumber = -1\n");
        assert!(matches!(
            bump_build_number(&content),
            Err(Error::InvalidRecipe(_))
        ));
    }
}
