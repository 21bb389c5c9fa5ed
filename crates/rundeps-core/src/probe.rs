//! Availability probing.
//!
//! Probing only reads through [`ModuleResolver`]; it never sees a
//! [`SymbolRegistry`](crate::host::SymbolRegistry), so it cannot bind anything.

use crate::error::Result;
use crate::host::{ModuleResolver, ResolveError};
use crate::requirement::{ImportKind, ImportSpec, PackageRequirement};
use tracing::{debug, warn};

/// Requirements found unavailable by [`find_missing`], as indices into the
/// probed slice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissingSet {
    /// Non-optional requirements that must be installed.
    pub required: Vec<usize>,
    /// Optional requirements that were skipped.
    pub optional: Vec<usize>,
}

impl MissingSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
    }
}

/// Whether every import of `requirement` currently resolves.
///
/// A requirement with no imports is probed as `import <name>`.
///
/// # Errors
/// Host failures other than "module/attribute not found" propagate.
pub fn is_available<R: ModuleResolver + ?Sized>(
    resolver: &R,
    requirement: &PackageRequirement,
) -> Result<bool> {
    if requirement.imports().is_empty() {
        return probe_one(resolver, &ImportSpec::direct(requirement.name()));
    }

    for spec in requirement.imports() {
        if !probe_one(resolver, spec)? {
            debug!(package = %requirement.name(), import = %spec, "import not resolvable");
            return Ok(false);
        }
    }

    Ok(true)
}

/// Probe every requirement in declaration order.
///
/// Unavailable optional requirements are reported in a single warning and
/// kept out of the required set.
pub fn find_missing<R: ModuleResolver + ?Sized>(
    resolver: &R,
    requirements: &[PackageRequirement],
) -> Result<MissingSet> {
    let mut missing = MissingSet::default();

    for (idx, requirement) in requirements.iter().enumerate() {
        if is_available(resolver, requirement)? {
            continue;
        }
        if requirement.optional() {
            missing.optional.push(idx);
        } else {
            missing.required.push(idx);
        }
    }

    if !missing.optional.is_empty() {
        let names: Vec<&str> = missing
            .optional
            .iter()
            .map(|&i| requirements[i].name())
            .collect();
        warn!("Optional module not found: {}", names.join(", "));
    }

    Ok(missing)
}

/// Resolve the value an import refers to: the module for a direct import,
/// the attribute on the source module for a from-import.
pub(crate) fn resolve_import<R: ModuleResolver + ?Sized>(
    resolver: &R,
    spec: &ImportSpec,
) -> std::result::Result<R::Value, ResolveError> {
    match (spec.kind(), spec.source()) {
        (ImportKind::From, Some(source)) => resolver
            .resolve_module(source)
            .and_then(|module| resolver.resolve_attr(&module, spec.target())),
        _ => resolver.resolve_module(spec.target()),
    }
}

fn probe_one<R: ModuleResolver + ?Sized>(resolver: &R, spec: &ImportSpec) -> Result<bool> {
    match resolve_import(resolver, spec) {
        Ok(_) => Ok(true),
        Err(e) if e.is_unresolvable() => Ok(false),
        Err(e) => Err(e.into()),
    }
}
