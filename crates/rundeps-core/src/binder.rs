//! Binding resolved imports into a caller namespace.

use crate::host::{ModuleResolver, ResolveError, SymbolRegistry};
use crate::probe::resolve_import;
use crate::requirement::{ImportSpec, PackageRequirement};
use serde::Serialize;
use tracing::{debug, error};

/// A symbol written into the namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundSymbol {
    pub package: String,
    /// Name it was registered under.
    pub name: String,
    /// The import statement, e.g. `from bson import ObjectId`.
    pub statement: String,
}

/// An import that could not be bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindFailure {
    pub package: String,
    pub statement: String,
    pub reason: String,
}

/// Outcome of binding one or more requirements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BindReport {
    pub bound: Vec<BoundSymbol>,
    pub failures: Vec<BindFailure>,
}

impl BindReport {
    /// True when every import was bound.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn merge(&mut self, other: BindReport) {
        self.bound.extend(other.bound);
        self.failures.extend(other.failures);
    }
}

/// Resolve each import of `requirement` in order and register it.
///
/// Failures are logged and recorded; binding carries on with the next import.
pub fn bind<R, N>(resolver: &R, requirement: &PackageRequirement, namespace: &mut N) -> BindReport
where
    R: ModuleResolver + ?Sized,
    N: SymbolRegistry<R::Value> + ?Sized,
{
    let mut report = BindReport::default();

    for spec in requirement.imports() {
        match resolve_import(resolver, spec) {
            Ok(value) => {
                namespace.register(spec.binding_name(), value);
                debug!(package = %requirement.name(), import = %spec, "bound");
                report.bound.push(BoundSymbol {
                    package: requirement.name().to_string(),
                    name: spec.binding_name().to_string(),
                    statement: spec.to_string(),
                });
            }
            Err(e) => {
                log_failure(requirement, spec, &e);
                report.failures.push(BindFailure {
                    package: requirement.name().to_string(),
                    statement: spec.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    report
}

fn log_failure(requirement: &PackageRequirement, spec: &ImportSpec, e: &ResolveError) {
    match spec.source() {
        Some(source) => error!(
            package = %requirement.name(),
            module = %source,
            attribute = %spec.target(),
            "Cannot import {} from {source}: {e}",
            spec.target()
        ),
        None => error!(
            package = %requirement.name(),
            module = %spec.target(),
            "Cannot import module {}: {e}",
            spec.target()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{StaticRegistry, StaticValue};
    use std::collections::BTreeMap;

    fn host() -> StaticRegistry<u32> {
        let mut host = StaticRegistry::new();
        host.add_module("numpy", 1)
            .add_module("bson", 2)
            .add_attr("bson", "ObjectId", 3);
        host
    }

    #[test]
    fn test_binds_under_alias_or_name() {
        let mut req = PackageRequirement::new("numpy", "", false).unwrap();
        req.import_module("numpy")
            .as_module("np")
            .from_module("bson")
            .import_module("ObjectId");

        let mut ns: BTreeMap<String, StaticValue<u32>> = BTreeMap::new();
        let report = bind(&host(), &req, &mut ns);

        assert!(report.is_complete());
        assert_eq!(ns.keys().collect::<Vec<_>>(), ["ObjectId", "np"]);
        assert_eq!(*ns["np"].value(), 1);
        assert_eq!(*ns["ObjectId"].value(), 3);
        assert_eq!(report.bound[0].statement, "import numpy as np");
        assert_eq!(report.bound[1].name, "ObjectId");
    }

    #[test]
    fn test_missing_attribute_does_not_stop_binding() {
        let mut req = PackageRequirement::new("pymongo", "", false).unwrap();
        req.from_module("bson")
            .import_modules(["Binary", "ObjectId"])
            .import_module("numpy");

        let mut ns: BTreeMap<String, StaticValue<u32>> = BTreeMap::new();
        let report = bind(&host(), &req, &mut ns);

        assert!(!report.is_complete());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].statement, "from bson import Binary");
        assert!(report.failures[0].reason.contains("Binary"));
        assert!(ns.contains_key("ObjectId"));
        assert!(ns.contains_key("numpy"));
        assert!(!ns.contains_key("Binary"));
    }

    #[test]
    fn test_direct_import_resolves_target_not_alias() {
        let mut req = PackageRequirement::new("numpy", "", false).unwrap();
        req.import_module("numpy").as_module("bson");

        let mut ns: BTreeMap<String, StaticValue<u32>> = BTreeMap::new();
        bind(&host(), &req, &mut ns);
        assert_eq!(ns["bson"].module(), "numpy");
    }

    #[test]
    fn test_merge() {
        let mut a = BindReport::default();
        a.bound.push(BoundSymbol {
            package: "a".to_string(),
            name: "a".to_string(),
            statement: "import a".to_string(),
        });
        let mut b = BindReport::default();
        b.failures.push(BindFailure {
            package: "b".to_string(),
            statement: "import b".to_string(),
            reason: "No module named 'b'".to_string(),
        });
        a.merge(b);
        assert_eq!(a.bound.len(), 1);
        assert_eq!(a.failures.len(), 1);
    }
}
