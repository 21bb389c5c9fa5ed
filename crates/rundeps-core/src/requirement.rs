//! Declared requirements and the imports they provide.

use crate::error::{Error, Result};
use crate::pep440::VersionConstraint;
use serde::Serialize;
use std::fmt;

/// How a symbol is brought into the namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    /// `import target`
    Direct,
    /// `from source import target`
    From,
}

/// A single requested symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSpec {
    kind: ImportKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    alias: Option<String>,
}

impl ImportSpec {
    #[must_use]
    pub fn direct(target: impl Into<String>) -> Self {
        Self {
            kind: ImportKind::Direct,
            source: None,
            target: target.into(),
            alias: None,
        }
    }

    #[must_use]
    pub fn from_import(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: ImportKind::From,
            source: Some(source.into()),
            target: target.into(),
            alias: None,
        }
    }

    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    #[must_use]
    pub fn kind(&self) -> ImportKind {
        self.kind
    }

    /// Module a From-import reads from.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Name the symbol is registered under.
    #[must_use]
    pub fn binding_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.target)
    }
}

impl fmt::Display for ImportSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.source) {
            (ImportKind::From, Some(source)) => write!(f, "from {source} import {}", self.target)?,
            _ => write!(f, "import {}", self.target)?,
        }
        if let Some(alias) = &self.alias {
            write!(f, " as {alias}")?;
        }
        Ok(())
    }
}

/// A named package, its version constraint and the imports it provides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageRequirement {
    name: String,
    version_spec: VersionConstraint,
    optional: bool,
    imports: Vec<ImportSpec>,
}

impl PackageRequirement {
    /// Create a requirement with no imports.
    ///
    /// # Errors
    /// `InvalidRequirement` for a blank or malformed name, `InvalidSpecifier`
    /// for a bad constraint.
    pub fn new(name: &str, constraint: &str, optional: bool) -> Result<Self> {
        let name = name.trim();
        validate_name(name)?;

        Ok(Self {
            name: name.to_string(),
            version_spec: VersionConstraint::parse(constraint)?,
            optional,
            imports: Vec::new(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn version_spec(&self) -> &VersionConstraint {
        &self.version_spec
    }

    #[must_use]
    pub fn optional(&self) -> bool {
        self.optional
    }

    #[must_use]
    pub fn imports(&self) -> &[ImportSpec] {
        &self.imports
    }

    /// Name plus normalized constraint, e.g. `foo>=1.1,<2.0`.
    #[must_use]
    pub fn requirement_string(&self) -> String {
        format!("{}{}", self.name, self.version_spec)
    }

    /// Append a direct import.
    pub fn import_module(&mut self, name: impl Into<String>) -> &mut Self {
        self.imports.push(ImportSpec::direct(name));
        self
    }

    /// Append several direct imports in order.
    pub fn import_modules<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.imports.extend(names.into_iter().map(ImportSpec::direct));
        self
    }

    /// Begin a `from <source> import ...` clause.
    pub fn from_module(&mut self, source: impl Into<String>) -> FromImport<'_> {
        FromImport {
            requirement: self,
            source: source.into(),
        }
    }

    /// Alias the most recently appended import. No-op without imports.
    pub fn as_module(&mut self, alias: impl Into<String>) -> &mut Self {
        if let Some(last) = self.imports.last_mut() {
            last.alias = Some(alias.into());
        }
        self
    }

    pub(crate) fn push_import(&mut self, spec: ImportSpec) {
        self.imports.push(spec);
    }
}

impl fmt::Display for PackageRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.requirement_string())
    }
}

/// Pending `from <source> import` clause borrowed from a requirement.
#[must_use = "a from-clause does nothing until a name is imported"]
pub struct FromImport<'a> {
    requirement: &'a mut PackageRequirement,
    source: String,
}

impl<'a> FromImport<'a> {
    pub fn import_module(self, name: impl Into<String>) -> &'a mut PackageRequirement {
        self.requirement
            .push_import(ImportSpec::from_import(self.source, name));
        self.requirement
    }

    pub fn import_modules<I, S>(self, names: I) -> &'a mut PackageRequirement
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.requirement
                .push_import(ImportSpec::from_import(self.source.clone(), name));
        }
        self.requirement
    }
}

/// Distribution names: ASCII letters and digits, with `.`, `_` and `-`
/// allowed between them.
fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidRequirement {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("package name cannot be empty"));
    }

    let bytes = name.as_bytes();
    if !bytes[0].is_ascii_alphanumeric() || !bytes[bytes.len() - 1].is_ascii_alphanumeric() {
        return Err(invalid("package name must start and end with a letter or digit"));
    }

    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(invalid(&format!("invalid character '{c}' in package name")));
    }

    Ok(())
}
