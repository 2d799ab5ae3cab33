// src/recipe/requirement.rs

//! Package references used in requirement lists
//!
//! A reference is written as `name [constraint...]`, for example `python >=3.6`
//! or `mpich 3.2.*`. Only the name is interpreted; the constraint is an opaque
//! string handed through to the artifact metadata unchanged.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// A reference to another package
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageRef {
    /// Package name
    pub name: String,
    /// Version constraint, verbatim
    pub constraint: Option<String>,
}

impl PackageRef {
    /// Create a reference without a constraint
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: None,
        }
    }

    /// Create a reference with a constraint
    pub fn with_constraint(name: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: Some(constraint.into()),
        }
    }
}

/// Check a package name: lowercase ASCII alphanumerics plus `-`, `_` and `.`
pub fn is_valid_package_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.')
        })
}

impl FromStr for PackageRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let name = parts
            .next()
            .ok_or_else(|| "empty package reference".to_string())?;

        if !is_valid_package_name(name) {
            return Err(format!("invalid package name '{}' in '{}'", name, s));
        }

        let rest: Vec<&str> = parts.collect();
        let constraint = if rest.is_empty() {
            None
        } else {
            Some(rest.join(" "))
        };

        Ok(Self {
            name: name.to_string(),
            constraint,
        })
    }
}

impl TryFrom<String> for PackageRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PackageRef> for String {
    fn from(r: PackageRef) -> Self {
        r.to_string()
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            Some(c) => write!(f, "{} {}", self.name, c),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Names that appear more than once in a requirement list
pub fn duplicate_names(refs: &[PackageRef]) -> Vec<&str> {
    let mut seen = HashSet::new();
    let mut dups = Vec::new();
    for r in refs {
        if !seen.insert(r.name.as_str()) && !dups.contains(&r.name.as_str()) {
            dups.push(r.name.as_str());
        }
    }
    dups
}

/// Union of requirement lists in first-seen order
///
/// A name listed more than once keeps its first constrained entry, so a bare
/// `make` in one list never hides `make >=4` in another.
pub fn merge_refs<'a>(lists: &[&'a [PackageRef]]) -> Vec<&'a PackageRef> {
    let mut merged: Vec<&'a PackageRef> = Vec::new();
    for r in lists.iter().flat_map(|list| list.iter()) {
        match merged.iter_mut().find(|m| m.name == r.name) {
            Some(existing) => {
                if existing.constraint.is_none() && r.constraint.is_some() {
                    *existing = r;
                }
            }
            None => merged.push(r),
        }
    }
    merged
}

/// Names given two different constraints across requirement lists
pub fn conflicting_constraints<'a>(lists: &[&'a [PackageRef]]) -> Vec<&'a str> {
    let mut conflicts = Vec::new();
    let all: Vec<&'a PackageRef> = lists.iter().flat_map(|list| list.iter()).collect();
    for (i, &a) in all.iter().enumerate() {
        let clash = all[i + 1..].iter().any(|b| {
            a.name == b.name
                && a.constraint.is_some()
                && b.constraint.is_some()
                && a.constraint != b.constraint
        });
        if clash && !conflicts.contains(&a.name.as_str()) {
            conflicts.push(a.name.as_str());
        }
    }
    conflicts
}
