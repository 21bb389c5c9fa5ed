//! Seams between the engine and the runtime that hosts the imports.
//!
//! The engine never loads anything itself. It asks a [`ModuleResolver`] to
//! look names up, a [`VersionQuery`] for installed distribution versions, and
//! writes bound values into a caller-chosen [`SymbolRegistry`].

use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Why a module or attribute lookup failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("No module named '{module}'")]
    ModuleNotFound { module: String },

    #[error("Module '{module}' has no attribute '{attr}'")]
    AttributeNotFound { module: String, attr: String },

    /// The host itself failed (interpreter crashed, protocol broke, ...).
    #[error("{0}")]
    Host(String),
}

impl ResolveError {
    /// Whether this error means "not there" rather than "could not ask".
    #[must_use]
    pub fn is_unresolvable(&self) -> bool {
        matches!(
            self,
            Self::ModuleNotFound { .. } | Self::AttributeNotFound { .. }
        )
    }
}

/// Read-only name resolution against the host runtime.
pub trait ModuleResolver {
    /// Handle to a loaded module or attribute.
    type Value;

    /// Resolve a (possibly dotted) module path.
    fn resolve_module(&self, path: &str) -> Result<Self::Value, ResolveError>;

    /// Resolve `attr` on a module previously returned by [`resolve_module`].
    ///
    /// [`resolve_module`]: ModuleResolver::resolve_module
    fn resolve_attr(&self, module: &Self::Value, attr: &str) -> Result<Self::Value, ResolveError>;

    /// Forget any cached lookups so newly installed packages become visible.
    fn invalidate_caches(&self);
}

/// Installed-distribution metadata.
pub trait VersionQuery {
    /// Version string of the installed distribution `name`, or `None` if it
    /// is not installed.
    fn installed_version(&self, name: &str) -> crate::Result<Option<String>>;
}

/// Destination namespace for bound symbols.
pub trait SymbolRegistry<V> {
    fn register(&mut self, name: &str, value: V);
}

impl<V> SymbolRegistry<V> for HashMap<String, V> {
    fn register(&mut self, name: &str, value: V) {
        self.insert(name.to_string(), value);
    }
}

impl<V> SymbolRegistry<V> for BTreeMap<String, V> {
    fn register(&mut self, name: &str, value: V) {
        self.insert(name.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolvable_classification() {
        assert!(ResolveError::ModuleNotFound {
            module: "IPy".to_string()
        }
        .is_unresolvable());
        assert!(ResolveError::AttributeNotFound {
            module: "bson".to_string(),
            attr: "ObjectId".to_string()
        }
        .is_unresolvable());
        assert!(!ResolveError::Host("interpreter exited".to_string()).is_unresolvable());
    }

    #[test]
    fn test_registry_overwrites() {
        let mut ns: HashMap<String, u32> = HashMap::new();
        ns.register("x", 1);
        ns.register("x", 2);
        assert_eq!(ns.get("x"), Some(&2));

        let mut ordered: BTreeMap<String, &str> = BTreeMap::new();
        ordered.register("b", "2");
        ordered.register("a", "1");
        assert_eq!(ordered.keys().collect::<Vec<_>>(), ["a", "b"]);
    }
}
