//! Version constraints using PEP 440.
//!
//! Parsing and matching of individual specifiers is done by `pep440_rs`.
//! [`VersionConstraint`] keeps the declared clauses in order, collapses
//! equivalent ones and applies the default pre-release policy.

use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tracing::error;

pub use pep440_rs::{Operator, Version, VersionSpecifier};

/// A conjunction of specifiers, e.g. `>=3.11.4,<4.0.0`.
///
/// The empty constraint accepts every version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionConstraint {
    specifiers: Vec<VersionSpecifier>,
}

impl VersionConstraint {
    /// The constraint that accepts any version.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Parse a comma-separated constraint.
    ///
    /// Whitespace is ignored, empty clauses are skipped and equivalent
    /// clauses (`>=1.0` and `>=1.0.0`) are collapsed, keeping the first in
    /// declaration order.
    ///
    /// # Errors
    /// Returns `InvalidSpecifier` if any clause is invalid.
    pub fn parse(input: &str) -> Result<Self> {
        let mut specifiers: Vec<VersionSpecifier> = Vec::new();

        for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let spec = VersionSpecifier::from_str(part)
                .map_err(|e| Error::invalid_specifier(input, e.to_string()))?;
            if !specifiers.iter().any(|s| equivalent(s, &spec)) {
                specifiers.push(spec);
            }
        }

        Ok(Self { specifiers })
    }

    #[must_use]
    pub fn is_any(&self) -> bool {
        self.specifiers.is_empty()
    }

    #[must_use]
    pub fn specifiers(&self) -> &[VersionSpecifier] {
        &self.specifiers
    }

    /// True when some clause names a pre-release or dev release.
    #[must_use]
    pub fn allows_prereleases(&self) -> bool {
        self.specifiers
            .iter()
            .any(|s| is_prerelease(s.version()))
    }

    /// Test a parsed version against every clause.
    ///
    /// Pre-releases are rejected unless some clause names a pre-release.
    #[must_use]
    pub fn contains(&self, version: &Version) -> bool {
        if self.is_any() {
            return true;
        }
        if is_prerelease(version) && !self.allows_prereleases() {
            return false;
        }
        self.specifiers.iter().all(|s| s.contains(version))
    }

    /// Test a version string. An unparsable version is logged and never
    /// satisfies a non-empty constraint.
    #[must_use]
    pub fn satisfies(&self, version: &str) -> bool {
        if self.is_any() {
            return true;
        }
        match Version::from_str(version.trim()) {
            Ok(v) => self.contains(&v),
            Err(_) => {
                error!("Invalid version: {version}");
                false
            }
        }
    }
}

fn equivalent(a: &VersionSpecifier, b: &VersionSpecifier) -> bool {
    a.operator() == b.operator() && a.version().cmp(b.version()) == Ordering::Equal
}

fn is_prerelease(version: &Version) -> bool {
    version.pre().is_some() || version.dev().is_some()
}

impl FromStr for VersionConstraint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.specifiers.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(","))
    }
}

impl Serialize for VersionConstraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(s: &str) -> VersionConstraint {
        VersionConstraint::parse(s).unwrap()
    }

    #[test]
    fn test_normalized_form() {
        assert_eq!(c(">=3.11.4, <4.0.0").to_string(), ">=3.11.4,<4.0.0");
        assert_eq!(c(" >= 1.1 ").to_string(), ">=1.1");
        assert_eq!(c("==2.7.2").to_string(), "==2.7.2");
        assert_eq!(c("==1.4.*").to_string(), "==1.4.*");
        assert_eq!(c("").to_string(), "");
    }

    #[test]
    fn test_declaration_order_kept_and_duplicates_collapsed() {
        assert_eq!(c(">=1.1,<2.0,>=1.1").to_string(), ">=1.1,<2.0");
        assert_eq!(c("<2.0,,>=1.1,").to_string(), "<2.0,>=1.1");
    }

    #[test]
    fn test_equivalent_clauses_collapsed() {
        assert_eq!(c(">=1.0, >=1.0.0").to_string(), ">=1.0");
        assert_eq!(c("==2.7.2.0,==2.7.2").to_string(), "==2.7.2.0");
        // same version, different operator
        assert_eq!(c(">=1.0,!=1.0.0").specifiers().len(), 2);
    }

    #[test]
    fn test_empty_constraint_accepts_everything() {
        let any = c("");
        assert!(any.is_any());
        for version in ["1.0", "0.0.1a1", "2!3.0+local", "not a version", ""] {
            assert!(any.satisfies(version), "{version}");
        }
    }

    #[test]
    fn test_exact_match_only() {
        let exact = c("==2.7.2");
        assert!(exact.satisfies("2.7.2"));
        assert!(exact.satisfies("2.7.2.0"));
        assert!(!exact.satisfies("2.7.3"));
        assert!(!exact.satisfies("2.7.1"));
        assert!(!exact.satisfies("2.7.2.post1"));
        assert!(!exact.satisfies("2.7.2rc1"));
    }

    #[test]
    fn test_range() {
        let range = c(">=3.11.4, <4.0.0");
        assert!(range.satisfies("3.11.4"));
        assert!(range.satisfies("3.12"));
        assert!(!range.satisfies("1.0.0"));
        assert!(!range.satisfies("4.0.0"));
    }

    #[test]
    fn test_greater_or_equal() {
        let ge = c(">=1.1");
        assert!(ge.satisfies("1.1"));
        assert!(ge.satisfies("1.1.0"));
        assert!(ge.satisfies("2.0"));
        assert!(!ge.satisfies("1.0.9"));
    }

    #[test]
    fn test_not_equal() {
        let ne = c("!=1.5");
        assert!(ne.satisfies("1.4"));
        assert!(!ne.satisfies("1.5.0"));
    }

    #[test]
    fn test_wildcards() {
        let eq = c("==1.4.*");
        assert!(eq.satisfies("1.4"));
        assert!(eq.satisfies("1.4.9"));
        assert!(!eq.satisfies("1.5"));

        let ne = c("!=1.*");
        assert!(ne.satisfies("2.0"));
        assert!(!ne.satisfies("1.9"));
    }

    #[test]
    fn test_compatible_release() {
        let compat = c("~=2.2");
        assert!(compat.satisfies("2.2"));
        assert!(compat.satisfies("2.9"));
        assert!(!compat.satisfies("3.0"));
        assert!(!compat.satisfies("2.1"));

        let compat = c("~=1.4.5");
        assert!(compat.satisfies("1.4.7"));
        assert!(!compat.satisfies("1.5.0"));
    }

    #[test]
    fn test_exclusive_bounds() {
        let lt = c("<2.0");
        assert!(lt.satisfies("1.9"));
        assert!(!lt.satisfies("2.0"));

        let gt = c(">1.7");
        assert!(gt.satisfies("1.7.1"));
        assert!(!gt.satisfies("1.7"));
    }

    #[test]
    fn test_prereleases_need_opt_in() {
        assert!(!c(">=1.0").satisfies("2.0b1"));
        assert!(!c(">=1.0").satisfies("2.0.dev3"));
        assert!(c(">=1.0b1").satisfies("2.0b1"));
        assert!(c("==2.0rc1").satisfies("2.0rc1"));
        assert!(!c("<2.0").satisfies("2.0rc1"));
    }

    #[test]
    fn test_local_versions() {
        assert!(c("==1.0").satisfies("1.0+ubuntu1"));
        assert!(!c("==1.0+ubuntu2").satisfies("1.0+ubuntu1"));
    }

    #[test]
    fn test_invalid_installed_version_never_satisfies() {
        assert!(!c(">=1.0").satisfies("not-a-version"));
        assert!(!c("!=1.0").satisfies("garbage"));
    }

    #[test]
    fn test_invalid_specifiers() {
        for input in ["1.0", ">=", ">=abc", "~=1", ">=1.0.*", "=>1.0", ">=1.1, <"] {
            let err = VersionConstraint::parse(input).unwrap_err();
            assert!(
                matches!(err, Error::InvalidSpecifier { input: ref i, .. } if i == input),
                "{input}: {err}"
            );
        }
    }

    #[test]
    fn test_specifier_accessors() {
        let constraint = c(">=1.1,<2.0");
        let specs = constraint.specifiers();
        assert_eq!(specs.len(), 2);
        assert_eq!(*specs[0].operator(), Operator::GreaterThanEqual);
        assert_eq!(specs[0].version().to_string(), "1.1");
        assert_eq!(*specs[1].operator(), Operator::LessThan);
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&c(">= 1.1, < 2.0")).unwrap();
        assert_eq!(json, "\">=1.1,<2.0\"");
    }
}
